use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use tokio::fs;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Blocked host patterns: `host.suffix` optionally followed by a path
    /// prefix, e.g. `facebook.com/tr`.
    #[serde(default = "default_blocked_hosts")]
    pub blocked_hosts: Vec<String>,

    /// Hostname suffixes exempt from destructive processing.
    #[serde(default = "default_protected_sites")]
    pub protected_sites: Vec<String>,

    #[serde(default)]
    pub sanitizer: SanitizerConfig,

    #[serde(default)]
    pub adblock: AdblockConfig,

    #[serde(default)]
    pub restricted: RestrictedConfig,

    #[serde(default)]
    pub watcher: WatcherConfig,

    #[serde(default)]
    pub telemetry: TelemetryConfig,

    #[serde(default)]
    pub gate: GateConfig,

    #[serde(default)]
    pub console: ConsoleConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SanitizerConfig {
    #[serde(default = "default_removal_selectors")]
    pub selectors: Vec<String>,
    /// `id` substrings marking structurally essential elements.
    #[serde(default = "default_essential_id_markers")]
    pub essential_id_markers: Vec<String>,
    #[serde(default = "default_overlay_z_threshold")]
    pub overlay_z_threshold: i32,
    /// Fraction of the viewport height above which a fixed/absolute
    /// high-z element counts as a blocking overlay.
    #[serde(default = "default_overlay_height_ratio")]
    pub overlay_height_ratio: f32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AdblockConfig {
    #[serde(default = "default_dialog_selectors")]
    pub dialog_selectors: Vec<String>,
    /// Case-insensitive solicitation phrases ("disable your ad blocker").
    #[serde(default = "default_adblock_phrases")]
    pub phrases: Vec<String>,
    #[serde(default = "default_min_dialog_width")]
    pub min_dialog_width: f32,
    #[serde(default = "default_min_dialog_height")]
    pub min_dialog_height: f32,
    #[serde(default = "default_overlay_z_threshold")]
    pub z_threshold: i32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RestrictedConfig {
    #[serde(default = "default_restricted_selectors")]
    pub selectors: Vec<String>,
    #[serde(default = "default_restricted_phrases")]
    pub phrases: Vec<String>,
    #[serde(default = "default_notice_text")]
    pub notice_text: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WatcherConfig {
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TelemetryConfig {
    #[serde(default = "default_telemetry_capacity")]
    pub capacity: usize,
    #[serde(default = "default_telemetry_trim_to")]
    pub trim_to: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GateConfig {
    #[serde(default = "default_gate_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ConsoleConfig {
    #[serde(default = "default_noise_patterns")]
    pub noise_patterns: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub debug: bool,
}

fn default_blocked_hosts() -> Vec<String> {
    [
        "doubleclick.net",
        "googlesyndication.com",
        "googleadservices.com",
        "googletagmanager.com",
        "google-analytics.com",
        "analytics.google.com",
        "adservice.google.com",
        "amazon-adsystem.com",
        "facebook.com/tr",
        "connect.facebook.net",
        "adnxs.com",
        "criteo.com",
        "taboola.com",
        "outbrain.com",
        "scorecardresearch.com",
        "quantserve.com",
        "hotjar.com",
        "mixpanel.com",
        "moatads.com",
        "adsafeprotected.com",
        "rubiconproject.com",
        "pubmatic.com",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_protected_sites() -> Vec<String> {
    [
        "github.com",
        "gitlab.com",
        "stackoverflow.com",
        "wikipedia.org",
        "mozilla.org",
        "paypal.com",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_removal_selectors() -> Vec<String> {
    [
        ".ad",
        ".ads",
        ".advert",
        ".advertisement",
        ".ad-banner",
        ".ad-container",
        ".ad-wrapper",
        ".ad-slot",
        ".adsbygoogle",
        "[id*=\"google_ads\"]",
        "[id*=\"ad-slot\"]",
        "[data-ad-slot]",
        ".sponsored",
        ".promoted",
        ".taboola",
        ".outbrain",
        ".cookie-banner",
        ".cookie-consent",
        ".gdpr-banner",
        ".newsletter-popup",
        ".subscribe-modal",
        ".popup-overlay",
        ".modal-backdrop",
        ".paywall",
        ".paywall-overlay",
        "#paywall",
        ".tp-modal",
        ".tp-backdrop",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_essential_id_markers() -> Vec<String> {
    // Kept narrow: a broad token like "content" would shield ad-content
    // wrappers from removal.
    ["main-content", "page-content", "app-root"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_dialog_selectors() -> Vec<String> {
    [
        "#adblock-modal",
        ".adblock-overlay",
        ".adblock-notice",
        ".adblock-wall",
        "[id*=\"adblock\"]",
        "[class*=\"adblock\"]",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_adblock_phrases() -> Vec<String> {
    [
        r"disable your ad ?blocker",
        r"turn off your ad ?blocker",
        r"ad ?blocker detected",
        r"please disable ad ?block",
        r"whitelist (us|this site)",
        r"allow ads (on|for) this site",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_restricted_selectors() -> Vec<String> {
    [
        ".login-wall",
        ".regwall",
        ".subscription-required",
        "#subscribe-wall",
        ".metered-content",
        "[class*=\"paywall-login\"]",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_restricted_phrases() -> Vec<String> {
    [
        r"log ?in to continue",
        r"sign ?in to continue",
        r"subscribe to (read|continue)",
        r"premium members? only",
        r"create a free account to",
        r"subscription required",
        r"already a subscriber\?",
        r"to continue reading",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_notice_text() -> String {
    "This content appears to be restricted. An archived copy may be \
     available through a web archive service."
        .to_string()
}

fn default_noise_patterns() -> Vec<String> {
    [
        r"net::ERR_BLOCKED_BY_CLIENT",
        r"net::ERR_FAILED",
        r"Failed to load resource",
        r"blocked by client",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_overlay_z_threshold() -> i32 {
    9000
}
fn default_overlay_height_ratio() -> f32 {
    0.3
}
fn default_min_dialog_width() -> f32 {
    280.0
}
fn default_min_dialog_height() -> f32 {
    180.0
}
fn default_debounce_ms() -> u64 {
    100
}
fn default_telemetry_capacity() -> usize {
    100
}
fn default_telemetry_trim_to() -> usize {
    50
}
fn default_gate_timeout_ms() -> u64 {
    1500
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            blocked_hosts: default_blocked_hosts(),
            protected_sites: default_protected_sites(),
            sanitizer: SanitizerConfig::default(),
            adblock: AdblockConfig::default(),
            restricted: RestrictedConfig::default(),
            watcher: WatcherConfig::default(),
            telemetry: TelemetryConfig::default(),
            gate: GateConfig::default(),
            console: ConsoleConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for SanitizerConfig {
    fn default() -> Self {
        Self {
            selectors: default_removal_selectors(),
            essential_id_markers: default_essential_id_markers(),
            overlay_z_threshold: default_overlay_z_threshold(),
            overlay_height_ratio: default_overlay_height_ratio(),
        }
    }
}

impl Default for AdblockConfig {
    fn default() -> Self {
        Self {
            dialog_selectors: default_dialog_selectors(),
            phrases: default_adblock_phrases(),
            min_dialog_width: default_min_dialog_width(),
            min_dialog_height: default_min_dialog_height(),
            z_threshold: default_overlay_z_threshold(),
        }
    }
}

impl Default for RestrictedConfig {
    fn default() -> Self {
        Self {
            selectors: default_restricted_selectors(),
            phrases: default_restricted_phrases(),
            notice_text: default_notice_text(),
        }
    }
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            capacity: default_telemetry_capacity(),
            trim_to: default_telemetry_trim_to(),
        }
    }
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_gate_timeout_ms(),
        }
    }
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            noise_patterns: default_noise_patterns(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            debug: false,
        }
    }
}

impl Config {
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .await
            .context("Failed to read config file")?;
        let config: Config = toml::from_str(&contents).context("Failed to parse config TOML")?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = Config::default();
        assert!(config
            .blocked_hosts
            .iter()
            .any(|h| h == "analytics.google.com"));
        assert_eq!(config.sanitizer.overlay_z_threshold, 9000);
        assert_eq!(config.watcher.debounce_ms, 100);
        assert!(config.telemetry.trim_to < config.telemetry.capacity);
    }

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let config: Config = toml::from_str(
            r#"
            blocked_hosts = ["tracker.example"]

            [watcher]
            debounce_ms = 250
            "#,
        )
        .unwrap();
        assert_eq!(config.blocked_hosts, vec!["tracker.example".to_string()]);
        assert_eq!(config.watcher.debounce_ms, 250);
        assert_eq!(config.telemetry.capacity, 100);
    }
}

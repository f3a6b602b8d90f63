//! Compiled matchers for blocked hosts and protected sites.
//!
//! Both sets are immutable after construction. Host matching is anchored to
//! the URL authority: a blocked token appearing in an unrelated path never
//! causes a match.

use rustc_hash::FxHashMap;
use tracing::debug;
use url::Url;

#[derive(Debug, Clone)]
struct HostPattern {
    /// Optional lowercase path prefix, e.g. `/tr` for `facebook.com/tr`.
    path_prefix: Option<Box<str>>,
}

/// Set of blocked-host patterns, matched by iterative label stripping so a
/// pattern covers the host and every subdomain of it.
#[derive(Debug, Default)]
pub struct HostPatternSet {
    hosts: FxHashMap<Box<str>, Vec<HostPattern>>,
}

impl HostPatternSet {
    pub fn compile(patterns: &[String]) -> Self {
        let mut hosts: FxHashMap<Box<str>, Vec<HostPattern>> = FxHashMap::default();
        for raw in patterns {
            let raw = raw.trim().to_ascii_lowercase();
            if raw.is_empty() {
                continue;
            }
            let (host, path) = match raw.find('/') {
                Some(idx) => (&raw[..idx], Some(&raw[idx..])),
                None => (raw.as_str(), None),
            };
            if host.is_empty() || !host.contains('.') {
                debug!(pattern = %raw, "skipping malformed host pattern");
                continue;
            }
            hosts.entry(host.into()).or_default().push(HostPattern {
                path_prefix: path.map(Into::into),
            });
        }
        Self { hosts }
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    /// True when the URL's authority (and, for path-constrained patterns,
    /// its path) matches any compiled pattern. Malformed or non-URL input
    /// never matches and never panics.
    pub fn matches(&self, url: &str) -> bool {
        let url = url.trim();
        if url.is_empty() {
            return false;
        }
        let parsed = match Url::parse(url) {
            Ok(parsed) => parsed,
            Err(_) => return false,
        };
        if !matches!(parsed.scheme(), "http" | "https" | "ws" | "wss") {
            return false;
        }
        let host = match parsed.host_str() {
            Some(host) => host.to_ascii_lowercase(),
            None => return false,
        };
        let path = parsed.path().to_ascii_lowercase();

        // Walk the host suffixes: ads.tracker.com, tracker.com, com.
        let mut part = host.as_str();
        loop {
            if let Some(patterns) = self.hosts.get(part) {
                for pattern in patterns {
                    match &pattern.path_prefix {
                        None => return true,
                        Some(prefix) => {
                            if path.starts_with(&**prefix) {
                                return true;
                            }
                        }
                    }
                }
            }
            match part.find('.') {
                Some(idx) => {
                    part = &part[idx + 1..];
                    if part.is_empty() {
                        break;
                    }
                }
                None => break,
            }
        }
        false
    }
}

/// Immutable suffix set of hostnames exempt from destructive processing.
#[derive(Debug, Default)]
pub struct ProtectedSites {
    suffixes: FxHashMap<Box<str>, ()>,
}

impl ProtectedSites {
    pub fn new(sites: &[String]) -> Self {
        let mut suffixes = FxHashMap::default();
        for site in sites {
            let site = site.trim().to_ascii_lowercase();
            if !site.is_empty() {
                suffixes.insert(site.into_boxed_str(), ());
            }
        }
        Self { suffixes }
    }

    pub fn contains(&self, hostname: &str) -> bool {
        let hostname = hostname.to_ascii_lowercase();
        let mut part = hostname.as_str();
        loop {
            if self.suffixes.contains_key(part) {
                return true;
            }
            match part.find('.') {
                Some(idx) => {
                    part = &part[idx + 1..];
                    if part.is_empty() {
                        break;
                    }
                }
                None => break,
            }
        }
        false
    }
}

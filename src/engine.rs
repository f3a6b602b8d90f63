//! One-time initialization, component wiring, and teardown.
//!
//! The controller is the single writer of [`EngineState`]. `init` runs the
//! whole activation sequence behind a top-level catch: any failure is
//! logged and abandons the remaining steps, never propagates to the page,
//! and never rolls back steps that already applied (each is independently
//! safe to leave in place).

mod state;

pub use state::EngineState;

use crate::adblock::{AdblockSuppressor, Mode};
use crate::config::Config;
use crate::console::{ConsoleSink, NoiseFilter};
use crate::dom::Page;
use crate::gate::SiteGate;
use crate::messaging::PolicyCollaborator;
use crate::net::{self, FetchTransport, XhrBackend, XhrProxy};
use crate::registry::{HostPatternSet, ProtectedSites};
use crate::restricted::{RestrictedContentHandler, NOTICE_ID};
use crate::sanitizer::{Sanitizer, Scope};
use crate::stats::RemovalStats;
use crate::telemetry::{self, TelemetrySink};
use crate::watcher::MutationWatcher;
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

pub struct Engine {
    config: Config,
    page: Page,
    collaborator: Arc<dyn PolicyCollaborator>,
    raw_console: Arc<dyn ConsoleSink>,
    raw_transport: Arc<dyn FetchTransport>,
    registry: Arc<HostPatternSet>,
    protected: ProtectedSites,
    telemetry: Arc<TelemetrySink>,
    stats: Arc<RemovalStats>,
    sanitizer: Arc<Sanitizer>,
    adblock: Arc<AdblockSuppressor>,
    restricted: RestrictedContentHandler,
    intercepted: Option<Arc<dyn FetchTransport>>,
    filtered_console: Option<Arc<dyn ConsoleSink>>,
    state: EngineState,
}

impl Engine {
    /// Wire the components against the injected page primitives. Must run
    /// inside a tokio runtime (the telemetry forwarder is spawned here).
    pub fn new(
        config: Config,
        page: Page,
        transport: Arc<dyn FetchTransport>,
        collaborator: Arc<dyn PolicyCollaborator>,
        console: Arc<dyn ConsoleSink>,
    ) -> Self {
        let registry = Arc::new(HostPatternSet::compile(&config.blocked_hosts));
        let protected = ProtectedSites::new(&config.protected_sites);
        let telemetry = TelemetrySink::new(
            collaborator.clone(),
            config.telemetry.capacity,
            config.telemetry.trim_to,
        );
        let stats = Arc::new(RemovalStats::default());
        let sanitizer = Arc::new(Sanitizer::new(
            page.clone(),
            registry.clone(),
            telemetry.clone(),
            stats.clone(),
            &config.sanitizer,
        ));
        let adblock = Arc::new(AdblockSuppressor::new(
            page.clone(),
            telemetry.clone(),
            stats.clone(),
            &config.adblock,
            &config.sanitizer.essential_id_markers,
        ));
        let restricted = RestrictedContentHandler::new(page.clone(), &config.restricted);
        let state = EngineState::new(config.logging.debug);

        Self {
            config,
            page,
            collaborator,
            raw_console: console,
            raw_transport: transport,
            registry,
            protected,
            telemetry,
            stats,
            sanitizer,
            adblock,
            restricted,
            intercepted: None,
            filtered_console: None,
            state,
        }
    }

    /// Run the activation sequence once. Returns whether the engine is
    /// active on this page. Idempotent, and never propagates an error.
    pub async fn init(&mut self) -> bool {
        if self.state.initialized {
            debug!("engine already initialized; ignoring");
            return true;
        }
        match self.try_init().await {
            Ok(active) => active,
            Err(e) => {
                warn!("engine initialization abandoned: {e:#}");
                false
            }
        }
    }

    async fn try_init(&mut self) -> Result<bool> {
        let url = self.page.url();
        let parsed = Url::parse(&url).context("page url is not parseable")?;
        if !matches!(parsed.scheme(), "http" | "https") {
            debug!(scheme = parsed.scheme(), "non-content page; engine stays idle");
            return Ok(false);
        }
        let hostname = parsed
            .host_str()
            .context("page url has no host")?
            .to_ascii_lowercase();

        let gate = SiteGate::new(
            self.collaborator.clone(),
            Duration::from_millis(self.config.gate.timeout_ms),
        );
        if !gate.is_enabled(&hostname).await {
            info!(%hostname, "filtering disabled for this site");
            return Ok(false);
        }

        if self.protected.contains(&hostname) {
            // Protected sites: conservative dialog removal only. No
            // interception, no broad sweeps, no console suppression.
            info!(%hostname, "protected site; conservative dialog pass only");
            self.state.initialized = true;
            let dialogs = self.adblock.remove_dialogs(Mode::Conservative);
            if dialogs > 0 {
                debug!(dialogs, "dialogs removed on protected site");
            }
            self.notify_activation(&url).await;
            return Ok(true);
        }

        self.state.initialized = true;

        self.filtered_console = Some(Arc::new(NoiseFilter::new(
            self.raw_console.clone(),
            &self.config.console.noise_patterns,
        )) as Arc<dyn ConsoleSink>);

        self.intercepted = Some(net::install(
            self.raw_transport.clone(),
            self.registry.clone(),
            self.telemetry.clone(),
            self.stats.clone(),
        ));

        let removed = self.sanitizer.clean(Scope::Document);
        if self.state.debug_enabled {
            debug!(removed, "initial sanitizer pass");
        }

        self.restricted.scan(&mut self.state.restricted_content);

        self.adblock.remove_dialogs(Mode::Full);

        self.state.watcher = MutationWatcher::new(
            self.page.clone(),
            self.sanitizer.clone(),
            self.adblock.clone(),
            Mode::Full,
            Duration::from_millis(self.config.watcher.debounce_ms),
        )
        .start();

        self.notify_activation(&url).await;
        info!(%hostname, "engine active");
        Ok(true)
    }

    /// Fire-and-forget; a missing collaborator never fails activation.
    async fn notify_activation(&self, url: &str) {
        if let Err(e) = self
            .collaborator
            .notify_bypass(url, telemetry::now_ms())
            .await
        {
            debug!("activation notice failed: {e:#}");
        }
    }

    /// Disconnect the watcher, drop the pending debounce, remove the
    /// injected notice, restore the console, and reset the state record.
    pub fn destroy(&mut self) {
        if let Some(handle) = self.state.watcher.take() {
            handle.stop();
        }
        if let Some(notice) = self.page.find_by_id(NOTICE_ID) {
            let _ = self.page.remove(notice);
        }
        self.filtered_console = None;
        self.intercepted = None;
        self.state.reset();
        debug!("engine destroyed");
    }

    /// The transport page code should issue requests through: intercepted
    /// once the engine is active, the raw primitive otherwise.
    pub fn transport(&self) -> Arc<dyn FetchTransport> {
        self.intercepted
            .clone()
            .unwrap_or_else(|| self.raw_transport.clone())
    }

    /// The console sink page code should write through.
    pub fn console(&self) -> Arc<dyn ConsoleSink> {
        self.filtered_console
            .clone()
            .unwrap_or_else(|| self.raw_console.clone())
    }

    /// Wrap an XHR-style request object. Blocking applies only while
    /// interception is active.
    pub fn xhr(&self, backend: Box<dyn XhrBackend>) -> XhrProxy {
        let registry = if self.intercepted.is_some() {
            self.registry.clone()
        } else {
            Arc::new(HostPatternSet::default())
        };
        XhrProxy::new(backend, registry, self.telemetry.clone(), self.stats.clone())
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    pub fn telemetry(&self) -> &Arc<TelemetrySink> {
        &self.telemetry
    }

    pub fn stats(&self) -> &Arc<RemovalStats> {
        &self.stats
    }
}

//! Decorators over the page's network primitives.
//!
//! Interception is an explicit wrapper rather than runtime monkey-patching:
//! [`install`] decorates an injected [`FetchTransport`], and the
//! `is_intercepted` marker makes the install-once contract checkable.

use crate::registry::HostPatternSet;
use crate::stats::RemovalStats;
use crate::telemetry::{BlockedElementLogEntry, BlockedKind, TelemetrySink};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum NetError {
    /// The request matched the blocked-host registry and never left the
    /// page context.
    #[error("request blocked: {0}")]
    Blocked(String),
    #[error("transport failure: {0}")]
    Transport(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: String,
    pub url: String,
}

impl Request {
    pub fn get(url: &str) -> Self {
        Self {
            method: "GET".to_string(),
            url: url.to_string(),
        }
    }
}

// Fetch accepts either a bare URL or a request object.
impl From<&str> for Request {
    fn from(url: &str) -> Self {
        Request::get(url)
    }
}

impl From<String> for Request {
    fn from(url: String) -> Self {
        Request::get(&url)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub body: Vec<u8>,
}

#[async_trait]
pub trait FetchTransport: Send + Sync {
    async fn fetch(&self, request: Request) -> Result<Response, NetError>;

    /// Marker for the install-once contract.
    fn is_intercepted(&self) -> bool {
        false
    }
}

struct InterceptedTransport {
    inner: Arc<dyn FetchTransport>,
    registry: Arc<HostPatternSet>,
    telemetry: Arc<TelemetrySink>,
    stats: Arc<RemovalStats>,
}

/// Wrap a transport with registry-based blocking. Idempotent: an already
/// intercepted transport is returned unchanged, so installing twice leaves
/// exactly one wrapper layer.
pub fn install(
    inner: Arc<dyn FetchTransport>,
    registry: Arc<HostPatternSet>,
    telemetry: Arc<TelemetrySink>,
    stats: Arc<RemovalStats>,
) -> Arc<dyn FetchTransport> {
    if inner.is_intercepted() {
        debug!("network interceptor already installed; skipping");
        return inner;
    }
    Arc::new(InterceptedTransport {
        inner,
        registry,
        telemetry,
        stats,
    })
}

#[async_trait]
impl FetchTransport for InterceptedTransport {
    async fn fetch(&self, request: Request) -> Result<Response, NetError> {
        if self.registry.matches(&request.url) {
            self.stats.inc_fetch_blocked();
            self.telemetry.record(BlockedElementLogEntry::for_request(
                BlockedKind::FetchRequest,
                &request.url,
            ));
            debug!(url = %request.url, "fetch blocked");
            return Err(NetError::Blocked(request.url));
        }
        self.inner.fetch(request).await
    }

    fn is_intercepted(&self) -> bool {
        true
    }
}

/// Backend seam for XHR-style request objects.
pub trait XhrBackend: Send {
    fn open(&mut self, method: &str, url: &str);
    fn send(&mut self, body: Option<&[u8]>);
}

/// Per-instance XHR wrapper: `open` records the blocked flag for the target
/// URL, and `send` becomes a no-op when set.
pub struct XhrProxy {
    inner: Box<dyn XhrBackend>,
    registry: Arc<HostPatternSet>,
    telemetry: Arc<TelemetrySink>,
    stats: Arc<RemovalStats>,
    url: Option<String>,
    blocked: bool,
}

impl XhrProxy {
    pub fn new(
        inner: Box<dyn XhrBackend>,
        registry: Arc<HostPatternSet>,
        telemetry: Arc<TelemetrySink>,
        stats: Arc<RemovalStats>,
    ) -> Self {
        Self {
            inner,
            registry,
            telemetry,
            stats,
            url: None,
            blocked: false,
        }
    }

    pub fn open(&mut self, method: &str, url: &str) {
        self.blocked = self.registry.matches(url);
        self.url = Some(url.to_string());
        self.inner.open(method, url);
    }

    pub fn send(&mut self, body: Option<&[u8]>) {
        if self.blocked {
            self.stats.inc_xhr_blocked();
            if let Some(url) = &self.url {
                self.telemetry
                    .record(BlockedElementLogEntry::for_request(BlockedKind::XhrRequest, url));
                debug!(%url, "xhr send suppressed");
            }
            return;
        }
        self.inner.send(body);
    }

    pub fn is_blocked(&self) -> bool {
        self.blocked
    }
}

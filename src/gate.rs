//! Per-page-load enablement check against the background process.

use crate::messaging::PolicyCollaborator;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub struct SiteGate {
    collaborator: Arc<dyn PolicyCollaborator>,
    timeout: Duration,
}

impl SiteGate {
    pub fn new(collaborator: Arc<dyn PolicyCollaborator>, timeout: Duration) -> Self {
        Self {
            collaborator,
            timeout,
        }
    }

    /// One round-trip to the collaborator. Failure or timeout fails open:
    /// an unreachable background process must not silently disable
    /// filtering for the rest of the page's lifetime.
    pub async fn is_enabled(&self, hostname: &str) -> bool {
        match tokio::time::timeout(self.timeout, self.collaborator.site_status(hostname)).await {
            Ok(Ok(enabled)) => enabled,
            Ok(Err(e)) => {
                debug!(%hostname, "site status check failed, failing open: {e:#}");
                true
            }
            Err(_) => {
                debug!(%hostname, "site status check timed out, failing open");
                true
            }
        }
    }
}

//! The message-passing seam to the background process.
//!
//! The engine only ever talks through [`PolicyCollaborator`];
//! [`JsonChannelCollaborator`] is the production shape, speaking the wire
//! protocol over an in-process request/response channel.

use crate::telemetry::BlockedElementLogEntry;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};

/// Requests the engine sends to the background process.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action")]
pub enum CollaboratorRequest {
    #[serde(rename = "getSiteStatus")]
    GetSiteStatus { hostname: String },
    #[serde(rename = "bypassStatus")]
    BypassStatus { url: String, timestamp: u64 },
    #[serde(rename = "logBlockedElement")]
    LogBlockedElement { data: BlockedElementLogEntry },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteStatusResponse {
    pub enabled: bool,
}

#[async_trait]
pub trait PolicyCollaborator: Send + Sync {
    /// Whether filtering is enabled for the hostname.
    async fn site_status(&self, hostname: &str) -> Result<bool>;

    /// Fire-and-forget activation notice.
    async fn notify_bypass(&self, url: &str, timestamp_ms: u64) -> Result<()>;

    /// Fire-and-forget blocked-element report.
    async fn log_blocked_element(&self, entry: &BlockedElementLogEntry) -> Result<()>;
}

/// One outgoing message plus a slot for the (optional) reply.
pub type ChannelMessage = (serde_json::Value, oneshot::Sender<serde_json::Value>);

/// Collaborator speaking JSON over a request/response channel pair. The
/// receiving half belongs to the host's message router.
pub struct JsonChannelCollaborator {
    tx: mpsc::Sender<ChannelMessage>,
}

impl JsonChannelCollaborator {
    pub fn new(tx: mpsc::Sender<ChannelMessage>) -> Self {
        Self { tx }
    }

    async fn send(&self, request: CollaboratorRequest) -> Result<oneshot::Receiver<serde_json::Value>> {
        let value = serde_json::to_value(&request).context("encode collaborator request")?;
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send((value, reply_tx))
            .await
            .map_err(|_| anyhow!("collaborator channel closed"))?;
        Ok(reply_rx)
    }
}

#[async_trait]
impl PolicyCollaborator for JsonChannelCollaborator {
    async fn site_status(&self, hostname: &str) -> Result<bool> {
        let reply = self
            .send(CollaboratorRequest::GetSiteStatus {
                hostname: hostname.to_string(),
            })
            .await?;
        let value = reply.await.context("collaborator dropped the reply")?;
        let response: SiteStatusResponse =
            serde_json::from_value(value).context("decode site status response")?;
        Ok(response.enabled)
    }

    async fn notify_bypass(&self, url: &str, timestamp_ms: u64) -> Result<()> {
        // Acknowledgment intentionally ignored.
        let _ = self
            .send(CollaboratorRequest::BypassStatus {
                url: url.to_string(),
                timestamp: timestamp_ms,
            })
            .await?;
        Ok(())
    }

    async fn log_blocked_element(&self, entry: &BlockedElementLogEntry) -> Result<()> {
        let _ = self
            .send(CollaboratorRequest::LogBlockedElement {
                data: entry.clone(),
            })
            .await?;
        Ok(())
    }
}

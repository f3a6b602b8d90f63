//! Bounded in-memory log of blocking decisions, with fire-and-forget
//! forwarding to the background collaborator. Recording never blocks the
//! caller: the forwarding channel drops entries when full.

use crate::dom::Element;
use crate::messaging::PolicyCollaborator;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::mpsc;
use tracing::debug;

/// Milliseconds since the epoch; 0 if the clock is unusable.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockedKind {
    Selector,
    SourceAttribute,
    Overlay,
    AdblockDialog,
    FetchRequest,
    XhrRequest,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockedElementLogEntry {
    #[serde(rename = "type")]
    pub kind: BlockedKind,
    pub selector: Option<String>,
    pub tag_name: String,
    pub class_name: String,
    pub id: String,
    pub url: Option<String>,
    pub timestamp_ms: u64,
}

impl BlockedElementLogEntry {
    pub fn for_element(
        kind: BlockedKind,
        element: &Element,
        selector: Option<&str>,
        url: Option<&str>,
    ) -> Self {
        Self {
            kind,
            selector: selector.map(String::from),
            tag_name: element.tag.clone(),
            class_name: element.class_name.clone(),
            id: element.id.clone(),
            url: url.map(String::from),
            timestamp_ms: now_ms(),
        }
    }

    pub fn for_request(kind: BlockedKind, url: &str) -> Self {
        Self {
            kind,
            selector: None,
            tag_name: String::new(),
            class_name: String::new(),
            id: String::new(),
            url: Some(url.to_string()),
            timestamp_ms: now_ms(),
        }
    }
}

pub struct TelemetrySink {
    buffer: Mutex<VecDeque<BlockedElementLogEntry>>,
    capacity: usize,
    trim_to: usize,
    tx: mpsc::Sender<BlockedElementLogEntry>,
}

impl TelemetrySink {
    /// Build the sink and spawn its forwarding task. Must run inside a
    /// tokio runtime.
    pub fn new(
        collaborator: Arc<dyn PolicyCollaborator>,
        capacity: usize,
        trim_to: usize,
    ) -> Arc<Self> {
        let (sink, mut rx) = Self::channelled(capacity, trim_to);
        tokio::spawn(async move {
            while let Some(entry) = rx.recv().await {
                if let Err(e) = collaborator.log_blocked_element(&entry).await {
                    debug!("telemetry forward failed: {e:#}");
                }
            }
        });
        sink
    }

    /// A sink with no forwarding task, for synchronous tests.
    pub fn detached(capacity: usize, trim_to: usize) -> Arc<Self> {
        Self::channelled(capacity, trim_to).0
    }

    fn channelled(
        capacity: usize,
        trim_to: usize,
    ) -> (Arc<Self>, mpsc::Receiver<BlockedElementLogEntry>) {
        let (tx, rx) = mpsc::channel(256);
        let trim_to = trim_to.min(capacity);
        (
            Arc::new(Self {
                buffer: Mutex::new(VecDeque::with_capacity(capacity)),
                capacity,
                trim_to,
                tx,
            }),
            rx,
        )
    }

    /// Append to the bounded buffer and forward without blocking. On
    /// overflow the buffer keeps only the most recent `trim_to` entries.
    pub fn record(&self, entry: BlockedElementLogEntry) {
        {
            let mut buffer = self.buffer.lock().unwrap();
            buffer.push_back(entry.clone());
            if buffer.len() > self.capacity {
                let excess = buffer.len() - self.trim_to;
                buffer.drain(..excess);
            }
        }
        let _ = self.tx.try_send(entry);
    }

    pub fn recent(&self) -> Vec<BlockedElementLogEntry> {
        self.buffer.lock().unwrap().iter().cloned().collect()
    }
}

//! Shared page-primitive stubs for the integration tests.

use anyhow::Result;
use async_trait::async_trait;
use page_sweeper::console::{ConsoleLevel, ConsoleSink};
use page_sweeper::messaging::PolicyCollaborator;
use page_sweeper::net::{FetchTransport, NetError, Request, Response};
use page_sweeper::telemetry::BlockedElementLogEntry;
use std::sync::Mutex;

#[allow(dead_code)]
pub struct StubCollaborator {
    pub enabled: bool,
    pub fail_status: bool,
    pub bypass_notices: Mutex<Vec<String>>,
    pub blocked_reports: Mutex<Vec<BlockedElementLogEntry>>,
}

#[allow(dead_code)]
impl StubCollaborator {
    pub fn with_enabled(enabled: bool) -> Self {
        Self {
            enabled,
            fail_status: false,
            bypass_notices: Mutex::new(Vec::new()),
            blocked_reports: Mutex::new(Vec::new()),
        }
    }

    pub fn unreachable() -> Self {
        Self {
            fail_status: true,
            ..Self::with_enabled(false)
        }
    }
}

#[async_trait]
impl PolicyCollaborator for StubCollaborator {
    async fn site_status(&self, _hostname: &str) -> Result<bool> {
        if self.fail_status {
            anyhow::bail!("background process unavailable");
        }
        Ok(self.enabled)
    }

    async fn notify_bypass(&self, url: &str, _timestamp_ms: u64) -> Result<()> {
        self.bypass_notices.lock().unwrap().push(url.to_string());
        Ok(())
    }

    async fn log_blocked_element(&self, entry: &BlockedElementLogEntry) -> Result<()> {
        if self.fail_status {
            anyhow::bail!("background process unavailable");
        }
        self.blocked_reports.lock().unwrap().push(entry.clone());
        Ok(())
    }
}

pub struct StubTransport {
    pub fetched: Mutex<Vec<String>>,
}

#[allow(dead_code)]
impl StubTransport {
    pub fn new() -> Self {
        Self {
            fetched: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl FetchTransport for StubTransport {
    async fn fetch(&self, request: Request) -> Result<Response, NetError> {
        self.fetched.lock().unwrap().push(request.url);
        Ok(Response {
            status: 200,
            body: Vec::new(),
        })
    }
}

pub struct StubConsole {
    pub lines: Mutex<Vec<String>>,
}

#[allow(dead_code)]
impl StubConsole {
    pub fn new() -> Self {
        Self {
            lines: Mutex::new(Vec::new()),
        }
    }
}

impl ConsoleSink for StubConsole {
    fn write(&self, _level: ConsoleLevel, message: &str) {
        self.lines.lock().unwrap().push(message.to_string());
    }
}

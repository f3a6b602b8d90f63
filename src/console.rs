//! Console noise suppression.
//!
//! Blocking requests makes the page's console fill with resource-load
//! errors the user cannot act on. The filter drops those and passes
//! everything else through unchanged.

use regex::RegexSet;
use std::sync::Arc;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleLevel {
    Log,
    Warn,
    Error,
}

/// The page's logging sink.
pub trait ConsoleSink: Send + Sync {
    fn write(&self, level: ConsoleLevel, message: &str);
}

pub struct NoiseFilter {
    inner: Arc<dyn ConsoleSink>,
    noise: RegexSet,
}

impl NoiseFilter {
    pub fn new(inner: Arc<dyn ConsoleSink>, patterns: &[String]) -> Self {
        let noise = RegexSet::new(patterns).unwrap_or_else(|e| {
            warn!("invalid console noise pattern, suppression disabled: {e}");
            RegexSet::empty()
        });
        Self { inner, noise }
    }
}

impl ConsoleSink for NoiseFilter {
    fn write(&self, level: ConsoleLevel, message: &str) {
        if self.noise.is_match(message) {
            return;
        }
        self.inner.write(level, message);
    }
}

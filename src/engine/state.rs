use crate::watcher::WatcherHandle;

/// The engine's mutable record. Owned and written exclusively by the
/// controller; everything else only reads it.
pub struct EngineState {
    /// Flips to true exactly once per page load.
    pub initialized: bool,
    pub debug_enabled: bool,
    /// Terminal restriction verdict, `None` until the first scan.
    pub restricted_content: Option<bool>,
    pub watcher: Option<WatcherHandle>,
}

impl EngineState {
    pub fn new(debug_enabled: bool) -> Self {
        Self {
            initialized: false,
            debug_enabled,
            restricted_content: None,
            watcher: None,
        }
    }

    /// Back to the pristine record; any held watcher handle must already
    /// have been stopped by the caller.
    pub fn reset(&mut self) {
        self.initialized = false;
        self.restricted_content = None;
        self.watcher = None;
    }
}

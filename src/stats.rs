use std::sync::atomic::{AtomicU64, Ordering};

/// Lock-free counters for blocking activity on the current page.
#[derive(Debug, Default)]
pub struct RemovalStats {
    selector_removed: AtomicU64,
    source_removed: AtomicU64,
    overlay_removed: AtomicU64,
    dialogs_removed: AtomicU64,
    fetch_blocked: AtomicU64,
    xhr_blocked: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    pub selector_removed: u64,
    pub source_removed: u64,
    pub overlay_removed: u64,
    pub dialogs_removed: u64,
    pub fetch_blocked: u64,
    pub xhr_blocked: u64,
}

impl StatsSnapshot {
    pub fn total_removed(&self) -> u64 {
        self.selector_removed + self.source_removed + self.overlay_removed + self.dialogs_removed
    }

    pub fn total_blocked(&self) -> u64 {
        self.fetch_blocked + self.xhr_blocked
    }
}

impl RemovalStats {
    pub fn inc_selector_removed(&self) {
        self.selector_removed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_source_removed(&self) {
        self.source_removed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_overlay_removed(&self) {
        self.overlay_removed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_dialogs_removed(&self) {
        self.dialogs_removed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_fetch_blocked(&self) {
        self.fetch_blocked.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_xhr_blocked(&self) {
        self.xhr_blocked.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            selector_removed: self.selector_removed.load(Ordering::Relaxed),
            source_removed: self.source_removed.load(Ordering::Relaxed),
            overlay_removed: self.overlay_removed.load(Ordering::Relaxed),
            dialogs_removed: self.dialogs_removed.load(Ordering::Relaxed),
            fetch_blocked: self.fetch_blocked.load(Ordering::Relaxed),
            xhr_blocked: self.xhr_blocked.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate_into_the_snapshot() {
        let stats = RemovalStats::default();
        stats.inc_selector_removed();
        stats.inc_selector_removed();
        stats.inc_fetch_blocked();
        let snap = stats.snapshot();
        assert_eq!(snap.selector_removed, 2);
        assert_eq!(snap.total_removed(), 2);
        assert_eq!(snap.total_blocked(), 1);
    }
}

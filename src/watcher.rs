//! Debounced reactive cleaning of DOM insertions.
//!
//! Pages that keep re-inserting ads are cleaned repeatedly without
//! full-document sweeps: each mutation batch re-arms a single debounce
//! timer, and when it fires one sanitizer pass runs over exactly the
//! accumulated nodes. A new batch always replaces the pending timer, never
//! races it.

use crate::adblock::{AdblockSuppressor, Mode};
use crate::dom::{NodeId, Page};
use crate::sanitizer::{Sanitizer, Scope};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Handle to the running watcher task. Dropping it leaves the task running;
/// `stop` aborts it along with any pending debounce timer.
pub struct WatcherHandle {
    task: JoinHandle<()>,
}

impl WatcherHandle {
    pub fn stop(self) {
        self.task.abort();
    }
}

pub struct MutationWatcher {
    page: Page,
    sanitizer: Arc<Sanitizer>,
    adblock: Arc<AdblockSuppressor>,
    mode: Mode,
    debounce: Duration,
}

impl MutationWatcher {
    pub fn new(
        page: Page,
        sanitizer: Arc<Sanitizer>,
        adblock: Arc<AdblockSuppressor>,
        mode: Mode,
        debounce: Duration,
    ) -> Self {
        Self {
            page,
            sanitizer,
            adblock,
            mode,
            debounce,
        }
    }

    /// Subscribe to the insertion feed and spawn the debounce loop.
    /// Returns `None` when the host has no observation primitive, in which
    /// case the engine degrades to one-shot cleaning.
    pub fn start(self) -> Option<WatcherHandle> {
        let Some(mut rx) = self.page.subscribe() else {
            warn!("mutation observation unavailable; one-shot cleaning only");
            return None;
        };

        let sanitizer = self.sanitizer;
        let adblock = self.adblock;
        let mode = self.mode;
        let debounce = self.debounce;

        let task = tokio::spawn(async move {
            let mut pending: Vec<NodeId> = Vec::new();
            let timer = tokio::time::sleep(debounce);
            tokio::pin!(timer);
            let mut armed = false;

            loop {
                tokio::select! {
                    record = rx.recv() => {
                        match record {
                            Some(record) if !record.added.is_empty() => {
                                pending.extend(record.added);
                                // Replace any pending timer.
                                timer.as_mut().reset(tokio::time::Instant::now() + debounce);
                                armed = true;
                            }
                            Some(_) => {}
                            None => break,
                        }
                    }
                    () = &mut timer, if armed => {
                        armed = false;
                        let scope = std::mem::take(&mut pending);
                        let removed = sanitizer.clean(Scope::Nodes(scope));
                        let dialogs = adblock.remove_dialogs(mode);
                        if removed + dialogs > 0 {
                            debug!(removed, dialogs, "debounced mutation sweep");
                        }
                    }
                }
            }
        });

        Some(WatcherHandle { task })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::dom::Element;
    use crate::registry::HostPatternSet;
    use crate::stats::RemovalStats;
    use crate::telemetry::TelemetrySink;

    fn watcher_for(page: &Page) -> MutationWatcher {
        let config = Config::default();
        let telemetry = TelemetrySink::detached(100, 50);
        let stats = Arc::new(RemovalStats::default());
        let sanitizer = Arc::new(Sanitizer::new(
            page.clone(),
            Arc::new(HostPatternSet::compile(&config.blocked_hosts)),
            telemetry.clone(),
            stats.clone(),
            &config.sanitizer,
        ));
        let adblock = Arc::new(AdblockSuppressor::new(
            page.clone(),
            telemetry,
            stats,
            &config.adblock,
            &config.sanitizer.essential_id_markers,
        ));
        MutationWatcher::new(
            page.clone(),
            sanitizer,
            adblock,
            Mode::Full,
            Duration::from_millis(20),
        )
    }

    #[tokio::test]
    async fn reinserted_ads_are_cleaned_after_the_debounce_window() {
        let page = Page::new("https://example.com/", (1024.0, 600.0));
        let handle = watcher_for(&page).start().expect("observable page");

        let first = page
            .append(page.body(), Element::new("div").with_class("ad-banner"))
            .unwrap();
        let second = page
            .append(page.body(), Element::new("div").with_class("sponsored"))
            .unwrap();
        let content = page
            .append(page.body(), Element::new("p").with_text("article"))
            .unwrap();

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(!page.contains(first));
        assert!(!page.contains(second));
        assert!(page.contains(content));
        handle.stop();
    }

    #[tokio::test]
    async fn unobservable_page_degrades_to_no_watcher() {
        let page = Page::with_observability("https://example.com/", (1024.0, 600.0), false);
        assert!(watcher_for(&page).start().is_none());
    }

    #[tokio::test]
    async fn stopped_watcher_leaves_later_insertions_alone() {
        let page = Page::new("https://example.com/", (1024.0, 600.0));
        let handle = watcher_for(&page).start().expect("observable page");
        handle.stop();

        let ad = page
            .append(page.body(), Element::new("div").with_class("ad-banner"))
            .unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(page.contains(ad));
    }
}

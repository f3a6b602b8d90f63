//! Detection and removal of "disable your ad blocker" interstitials.
//!
//! Two independent signals, either of which is enough: dialog-shaped
//! geometry (full mode only) or explicit solicitation text on the element
//! itself. Protected sites run the conservative subset, which never removes
//! on geometry alone.

use crate::dom::selector::Selector;
use crate::dom::{Element, Page, Position};
use crate::sanitizer::{compile_selectors, is_essential};
use crate::stats::RemovalStats;
use crate::telemetry::{BlockedElementLogEntry, BlockedKind, TelemetrySink};
use regex::RegexSet;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// All signals, including pure geometry.
    Full,
    /// Dialog selectors and explicit text only; used on protected sites.
    Conservative,
}

pub struct AdblockSuppressor {
    page: Page,
    telemetry: Arc<TelemetrySink>,
    stats: Arc<RemovalStats>,
    dialog_selectors: Vec<Selector>,
    phrases: RegexSet,
    essential_markers: Vec<String>,
    min_width: f32,
    min_height: f32,
    z_threshold: i32,
}

impl AdblockSuppressor {
    pub fn new(
        page: Page,
        telemetry: Arc<TelemetrySink>,
        stats: Arc<RemovalStats>,
        config: &crate::config::AdblockConfig,
        essential_markers: &[String],
    ) -> Self {
        let patterns: Vec<String> = config.phrases.iter().map(|p| format!("(?i){p}")).collect();
        let phrases = RegexSet::new(&patterns).unwrap_or_else(|e| {
            warn!("invalid adblock phrase pattern, text signal disabled: {e}");
            RegexSet::empty()
        });
        Self {
            page,
            telemetry,
            stats,
            dialog_selectors: compile_selectors(&config.dialog_selectors),
            phrases,
            essential_markers: essential_markers.to_vec(),
            min_width: config.min_dialog_width,
            min_height: config.min_dialog_height,
            z_threshold: config.z_threshold,
        }
    }

    /// Sweep the document for adblock dialogs. Returns the removal count.
    pub fn remove_dialogs(&self, mode: Mode) -> usize {
        let candidates = match self.page.subtree(self.page.root()) {
            Ok(nodes) => nodes,
            Err(_) => return 0,
        };
        let mut removed = 0;
        for id in candidates {
            let element = match self.page.element(id) {
                Ok(element) => element,
                Err(_) => continue,
            };
            if !self.is_dialog(&element, mode) {
                continue;
            }
            if is_essential(&self.page, id, &element, &self.essential_markers) {
                continue;
            }
            if self.page.remove(id).is_err() {
                continue;
            }
            debug!(tag = %element.tag, id = %element.id, "adblock dialog removed");
            self.stats.inc_dialogs_removed();
            self.telemetry.record(BlockedElementLogEntry::for_element(
                BlockedKind::AdblockDialog,
                &element,
                None,
                None,
            ));
            removed += 1;
        }
        removed
    }

    fn is_dialog(&self, element: &Element, mode: Mode) -> bool {
        if self.dialog_selectors.iter().any(|sel| sel.matches(element)) {
            return true;
        }
        // Text is matched against the element's own text so the deepest
        // matching element is removed, never an ancestor wrapper.
        if !element.text.is_empty() && self.phrases.is_match(&element.text) {
            return true;
        }
        match mode {
            Mode::Full => self.looks_like_dialog(element),
            Mode::Conservative => false,
        }
    }

    fn looks_like_dialog(&self, element: &Element) -> bool {
        let style = &element.style;
        matches!(style.position, Position::Fixed | Position::Absolute)
            && style.z_index > self.z_threshold
            && style.width >= self.min_width
            && style.height >= self.min_height
            && style.is_visible()
    }
}

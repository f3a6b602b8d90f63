//! Login/subscription wall detection.
//!
//! Policy is inform, don't circumvent: a confirmed restriction injects one
//! fallback notice and leaves the gate itself alone. The verdict is
//! terminal per page load and cached by the caller, so repeated scans are
//! free.

use crate::dom::selector::Selector;
use crate::dom::{DomError, Element, Page};
use crate::sanitizer::compile_selectors;
use regex::RegexSet;
use tracing::{debug, info, warn};

/// Stable id of the injected fallback notice.
pub const NOTICE_ID: &str = "alt-access-notice";

pub struct RestrictedContentHandler {
    page: Page,
    selectors: Vec<Selector>,
    phrases: RegexSet,
    notice_text: String,
}

impl RestrictedContentHandler {
    pub fn new(page: Page, config: &crate::config::RestrictedConfig) -> Self {
        let patterns: Vec<String> = config.phrases.iter().map(|p| format!("(?i){p}")).collect();
        let phrases = RegexSet::new(&patterns).unwrap_or_else(|e| {
            warn!("invalid restriction phrase pattern, text signal disabled: {e}");
            RegexSet::empty()
        });
        Self {
            page,
            selectors: compile_selectors(&config.selectors),
            phrases,
            notice_text: config.notice_text.clone(),
        }
    }

    /// Resolve the page's restriction state, caching the verdict in the
    /// engine-owned slot. Detection failure resolves to unrestricted.
    pub fn scan(&self, cache: &mut Option<bool>) -> bool {
        if let Some(verdict) = *cache {
            return verdict;
        }
        let restricted = self.detect().unwrap_or_else(|e| {
            debug!("restriction detection failed, treating as unrestricted: {e}");
            false
        });
        *cache = Some(restricted);
        if restricted {
            info!("restricted content detected");
            self.inject_notice();
        }
        restricted
    }

    fn detect(&self) -> Result<bool, DomError> {
        for id in self.page.subtree(self.page.root())? {
            let element = match self.page.element(id) {
                Ok(element) => element,
                Err(_) => continue,
            };
            if self.selectors.iter().any(|sel| sel.matches(&element)) {
                return Ok(true);
            }
        }
        let text = self.page.visible_body_text();
        Ok(!text.is_empty() && self.phrases.is_match(&text))
    }

    /// Idempotent: the stable id is checked before creating a duplicate.
    fn inject_notice(&self) {
        if self.page.find_by_id(NOTICE_ID).is_some() {
            return;
        }
        let notice = Element::new("div")
            .with_id(NOTICE_ID)
            .with_class("restricted-content-notice")
            .with_text(&self.notice_text);
        if let Err(e) = self.page.append(self.page.body(), notice) {
            debug!("failed to inject fallback notice: {e}");
        }
    }
}

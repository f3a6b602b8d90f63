//! Selector, source-attribute, and overlay-geometry removal passes.
//!
//! The sanitizer is the only component that detaches DOM subtrees. Every
//! removal path goes through the essential-element guard, and a failure on
//! one candidate never aborts the sweep.

use crate::dom::selector::{self, Selector};
use crate::dom::{Element, NodeId, Page, Position};
use crate::registry::HostPatternSet;
use crate::stats::RemovalStats;
use crate::telemetry::{BlockedElementLogEntry, BlockedKind, TelemetrySink};
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

/// What a sweep covers: the whole document, or exactly the given subtrees.
#[derive(Debug, Clone)]
pub enum Scope {
    Document,
    Nodes(Vec<NodeId>),
}

pub struct Sanitizer {
    page: Page,
    registry: Arc<HostPatternSet>,
    telemetry: Arc<TelemetrySink>,
    stats: Arc<RemovalStats>,
    selectors: Vec<Selector>,
    essential_markers: Vec<String>,
    overlay_z_threshold: i32,
    overlay_height_ratio: f32,
}

/// Compile a selector catalog, skipping entries the subset cannot express.
pub fn compile_selectors(catalog: &[String]) -> Vec<Selector> {
    catalog
        .iter()
        .filter_map(|raw| {
            let parsed = selector::parse(raw);
            if parsed.is_none() {
                warn!(selector = %raw, "unsupported selector skipped");
            }
            parsed
        })
        .collect()
}

/// The essential-element guard. Never the root or body, never an element
/// whose id carries an essential marker, never an element with a registered
/// interaction handler.
pub(crate) fn is_essential(page: &Page, id: NodeId, element: &Element, markers: &[String]) -> bool {
    if id == page.root() || id == page.body() {
        return true;
    }
    if !element.id.is_empty() && markers.iter().any(|m| element.id.contains(m.as_str())) {
        return true;
    }
    element.has_click_handler
}

impl Sanitizer {
    pub fn new(
        page: Page,
        registry: Arc<HostPatternSet>,
        telemetry: Arc<TelemetrySink>,
        stats: Arc<RemovalStats>,
        config: &crate::config::SanitizerConfig,
    ) -> Self {
        Self {
            page,
            registry,
            telemetry,
            stats,
            selectors: compile_selectors(&config.selectors),
            essential_markers: config.essential_id_markers.clone(),
            overlay_z_threshold: config.overlay_z_threshold,
            overlay_height_ratio: config.overlay_height_ratio,
        }
    }

    /// Run the three passes over the scope in fixed order. Returns the
    /// number of subtrees removed.
    pub fn clean(&self, scope: Scope) -> usize {
        let roots = match scope {
            Scope::Document => vec![self.page.root()],
            Scope::Nodes(nodes) => nodes,
        };

        let mut removed = 0;
        removed += self.selector_pass(&roots);
        removed += self.source_pass(&roots);
        removed += self.overlay_pass(&roots);
        if removed > 0 {
            debug!(removed, "sanitizer sweep complete");
        }
        removed
    }

    /// Candidates for one pass: each scope root plus its descendants,
    /// preorder. Roots already detached by an earlier pass are skipped.
    fn candidates(&self, roots: &[NodeId]) -> Vec<NodeId> {
        let mut out = Vec::new();
        for &root in roots {
            match self.page.subtree(root) {
                Ok(nodes) => out.extend(nodes),
                Err(_) => continue,
            }
        }
        out
    }

    fn selector_pass(&self, roots: &[NodeId]) -> usize {
        let mut removed = 0;
        for id in self.candidates(roots) {
            // A failed candidate (detached mid-sweep, hostile accessor)
            // is skipped; the pass continues.
            let element = match self.page.element(id) {
                Ok(element) => element,
                Err(_) => continue,
            };
            let matched = self.selectors.iter().find(|sel| sel.matches(&element));
            if let Some(sel) = matched {
                if self.remove_guarded(id, &element, BlockedKind::Selector, Some(sel.source()), None)
                {
                    self.stats.inc_selector_removed();
                    removed += 1;
                }
            }
        }
        removed
    }

    fn source_pass(&self, roots: &[NodeId]) -> usize {
        let page_url = self.page.url();
        let base = Url::parse(&page_url).ok();
        let mut removed = 0;
        for id in self.candidates(roots) {
            let element = match self.page.element(id) {
                Ok(element) => element,
                Err(_) => continue,
            };
            let source = match element.tag.as_str() {
                "script" | "iframe" | "img" | "embed" => element.attributes.get("src"),
                "object" => element.attributes.get("data"),
                _ => None,
            };
            let Some(source) = source else { continue };
            let Some(resolved) = resolve_url(base.as_ref(), source) else {
                continue;
            };
            if self.registry.matches(&resolved)
                && self.remove_guarded(
                    id,
                    &element,
                    BlockedKind::SourceAttribute,
                    None,
                    Some(&resolved),
                )
            {
                self.stats.inc_source_removed();
                removed += 1;
            }
        }
        removed
    }

    fn overlay_pass(&self, roots: &[NodeId]) -> usize {
        let (_, viewport_h) = self.page.viewport();
        let mut removed = 0;
        for id in self.candidates(roots) {
            let element = match self.page.element(id) {
                Ok(element) => element,
                Err(_) => continue,
            };
            if self.is_blocking_overlay(&element, viewport_h)
                && self.remove_guarded(id, &element, BlockedKind::Overlay, None, None)
            {
                self.stats.inc_overlay_removed();
                removed += 1;
            }
        }
        removed
    }

    /// Full-screen blocking overlay: out-of-flow, stacked above everything,
    /// and tall enough to cover a meaningful share of the viewport.
    fn is_blocking_overlay(&self, element: &Element, viewport_h: f32) -> bool {
        let style = &element.style;
        matches!(style.position, Position::Fixed | Position::Absolute)
            && style.z_index > self.overlay_z_threshold
            && style.height > viewport_h * self.overlay_height_ratio
    }

    fn remove_guarded(
        &self,
        id: NodeId,
        element: &Element,
        kind: BlockedKind,
        selector: Option<&str>,
        url: Option<&str>,
    ) -> bool {
        if is_essential(&self.page, id, element, &self.essential_markers) {
            return false;
        }
        if self.page.remove(id).is_err() {
            return false;
        }
        debug!(
            tag = %element.tag,
            id = %element.id,
            ?kind,
            "element removed"
        );
        self.telemetry
            .record(BlockedElementLogEntry::for_element(kind, element, selector, url));
        true
    }
}

fn resolve_url(base: Option<&Url>, source: &str) -> Option<String> {
    if source.starts_with("http://") || source.starts_with("https://") {
        return Some(source.to_string());
    }
    base.and_then(|b| b.join(source).ok())
        .map(|u| u.to_string())
}

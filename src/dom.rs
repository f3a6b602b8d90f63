//! Arena-backed model of the live page DOM.
//!
//! The engine never talks to a real browser document; it operates on this
//! model, which the surrounding host (or a test) mutates concurrently. A
//! [`Page`] is a cheap cloneable handle over shared interior state, and every
//! insertion is broadcast to mutation subscribers so the watcher can react
//! the way a `MutationObserver` callback would.

pub mod selector;

use rustc_hash::FxHashMap;
use std::sync::{Arc, RwLock};
use thiserror::Error;
use tokio::sync::mpsc;

use self::selector::Selector;

#[derive(Debug, Error)]
pub enum DomError {
    /// The node was removed from the document after its id was handed out.
    #[error("node is detached from the document")]
    Detached,
    #[error("cannot remove the document root")]
    RootRemoval,
}

/// Opaque handle to a node in the arena. Stale after the node is removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Position {
    #[default]
    Static,
    Relative,
    Absolute,
    Fixed,
}

/// The slice of computed style the heuristics care about.
#[derive(Debug, Clone, PartialEq)]
pub struct ComputedStyle {
    pub position: Position,
    pub z_index: i32,
    pub width: f32,
    pub height: f32,
    pub display_none: bool,
    pub hidden: bool,
}

impl Default for ComputedStyle {
    fn default() -> Self {
        Self {
            position: Position::Static,
            z_index: 0,
            width: 0.0,
            height: 0.0,
            display_none: false,
            hidden: false,
        }
    }
}

impl ComputedStyle {
    pub fn is_visible(&self) -> bool {
        !self.display_none && !self.hidden
    }
}

/// One element's own data (not including its children).
#[derive(Debug, Clone)]
pub struct Element {
    pub tag: String,
    pub id: String,
    pub class_name: String,
    pub attributes: FxHashMap<String, String>,
    /// The element's own text, not the subtree's.
    pub text: String,
    pub style: ComputedStyle,
    pub has_click_handler: bool,
}

impl Element {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            id: String::new(),
            class_name: String::new(),
            attributes: FxHashMap::default(),
            text: String::new(),
            style: ComputedStyle::default(),
            has_click_handler: false,
        }
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.id = id.to_string();
        self
    }

    pub fn with_class(mut self, class_name: &str) -> Self {
        self.class_name = class_name.to_string();
        self
    }

    pub fn with_attr(mut self, name: &str, value: &str) -> Self {
        self.attributes.insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn with_style(mut self, style: ComputedStyle) -> Self {
        self.style = style;
        self
    }

    pub fn with_click_handler(mut self) -> Self {
        self.has_click_handler = true;
        self
    }
}

/// A batch of nodes inserted by page code.
#[derive(Debug, Clone)]
pub struct MutationRecord {
    pub added: Vec<NodeId>,
}

#[derive(Debug)]
struct NodeData {
    element: Element,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

struct Arena {
    nodes: Vec<Option<NodeData>>,
    root: NodeId,
    body: NodeId,
    url: String,
    viewport: (f32, f32),
    observable: bool,
    observers: Vec<mpsc::UnboundedSender<MutationRecord>>,
}

/// Cloneable handle to the shared document.
#[derive(Clone)]
pub struct Page {
    inner: Arc<RwLock<Arena>>,
}

impl Page {
    pub fn new(url: &str, viewport: (f32, f32)) -> Self {
        Self::with_observability(url, viewport, true)
    }

    /// Build a page whose mutation feed may be unavailable, for hosts that
    /// lack an observation primitive.
    pub fn with_observability(url: &str, viewport: (f32, f32), observable: bool) -> Self {
        let root_data = NodeData {
            element: Element::new("html"),
            parent: None,
            children: vec![NodeId(1)],
        };
        let body_data = NodeData {
            element: Element::new("body"),
            parent: Some(NodeId(0)),
            children: Vec::new(),
        };
        Self {
            inner: Arc::new(RwLock::new(Arena {
                nodes: vec![Some(root_data), Some(body_data)],
                root: NodeId(0),
                body: NodeId(1),
                url: url.to_string(),
                viewport,
                observable,
                observers: Vec::new(),
            })),
        }
    }

    pub fn url(&self) -> String {
        self.inner.read().unwrap().url.clone()
    }

    pub fn viewport(&self) -> (f32, f32) {
        self.inner.read().unwrap().viewport
    }

    pub fn root(&self) -> NodeId {
        self.inner.read().unwrap().root
    }

    pub fn body(&self) -> NodeId {
        self.inner.read().unwrap().body
    }

    /// Insert an element under `parent` and notify mutation subscribers.
    pub fn append(&self, parent: NodeId, element: Element) -> Result<NodeId, DomError> {
        let mut arena = self.inner.write().unwrap();
        if arena.node(parent).is_none() {
            return Err(DomError::Detached);
        }
        let id = NodeId(arena.nodes.len());
        arena.nodes.push(Some(NodeData {
            element,
            parent: Some(parent),
            children: Vec::new(),
        }));
        if let Some(data) = arena.node_mut(parent) {
            data.children.push(id);
        }
        let record = MutationRecord { added: vec![id] };
        arena.observers.retain(|tx| tx.send(record.clone()).is_ok());
        Ok(id)
    }

    /// Detach a subtree. The root itself can never be removed.
    pub fn remove(&self, id: NodeId) -> Result<(), DomError> {
        let mut arena = self.inner.write().unwrap();
        if id == arena.root {
            return Err(DomError::RootRemoval);
        }
        let parent = match arena.node(id) {
            Some(data) => data.parent,
            None => return Err(DomError::Detached),
        };
        if let Some(parent) = parent {
            if let Some(data) = arena.node_mut(parent) {
                data.children.retain(|&c| c != id);
            }
        }
        // Drop the whole subtree from the arena.
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            if let Some(data) = arena.nodes.get_mut(next.0).and_then(Option::take) {
                stack.extend(data.children);
            }
        }
        Ok(())
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.inner.read().unwrap().node(id).is_some()
    }

    pub fn element(&self, id: NodeId) -> Result<Element, DomError> {
        let arena = self.inner.read().unwrap();
        arena
            .node(id)
            .map(|data| data.element.clone())
            .ok_or(DomError::Detached)
    }

    pub fn set_click_handler(&self, id: NodeId, registered: bool) -> Result<(), DomError> {
        let mut arena = self.inner.write().unwrap();
        match arena.node_mut(id) {
            Some(data) => {
                data.element.has_click_handler = registered;
                Ok(())
            }
            None => Err(DomError::Detached),
        }
    }

    /// Preorder listing of a subtree, the given node included.
    pub fn subtree(&self, id: NodeId) -> Result<Vec<NodeId>, DomError> {
        let arena = self.inner.read().unwrap();
        if arena.node(id).is_none() {
            return Err(DomError::Detached);
        }
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            if let Some(data) = arena.node(next) {
                out.push(next);
                // Push in reverse so preorder comes out in insertion order.
                stack.extend(data.children.iter().rev());
            }
        }
        Ok(out)
    }

    pub fn matches(&self, id: NodeId, sel: &Selector) -> Result<bool, DomError> {
        Ok(sel.matches(&self.element(id)?))
    }

    pub fn query_all(&self, sel: &Selector) -> Vec<NodeId> {
        let arena = self.inner.read().unwrap();
        arena
            .nodes
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| {
                let data = slot.as_ref()?;
                sel.matches(&data.element).then_some(NodeId(i))
            })
            .collect()
    }

    pub fn find_by_id(&self, id_attr: &str) -> Option<NodeId> {
        let arena = self.inner.read().unwrap();
        arena.nodes.iter().enumerate().find_map(|(i, slot)| {
            let data = slot.as_ref()?;
            (data.element.id == id_attr).then_some(NodeId(i))
        })
    }

    /// Subtree text content, visibility ignored.
    pub fn text_content(&self, id: NodeId) -> Result<String, DomError> {
        let nodes = self.subtree(id)?;
        let arena = self.inner.read().unwrap();
        let mut parts = Vec::new();
        for node in nodes {
            if let Some(data) = arena.node(node) {
                if !data.element.text.is_empty() {
                    parts.push(data.element.text.clone());
                }
            }
        }
        Ok(parts.join(" "))
    }

    /// The page's visible body text: skips hidden subtrees and non-rendered
    /// tags, which is what restriction-language scanning must look at.
    pub fn visible_body_text(&self) -> String {
        let arena = self.inner.read().unwrap();
        let mut parts = Vec::new();
        let mut stack = vec![arena.body];
        while let Some(next) = stack.pop() {
            if let Some(data) = arena.node(next) {
                let el = &data.element;
                if !el.style.is_visible() {
                    continue;
                }
                if matches!(el.tag.as_str(), "script" | "style" | "noscript") {
                    continue;
                }
                if !el.text.is_empty() {
                    parts.push(el.text.clone());
                }
                stack.extend(data.children.iter().rev());
            }
        }
        parts.join(" ")
    }

    /// Subscribe to the insertion feed. `None` when the host has no
    /// observation primitive.
    pub fn subscribe(&self) -> Option<mpsc::UnboundedReceiver<MutationRecord>> {
        let mut arena = self.inner.write().unwrap();
        if !arena.observable {
            return None;
        }
        let (tx, rx) = mpsc::unbounded_channel();
        arena.observers.push(tx);
        Some(rx)
    }
}

impl Arena {
    fn node(&self, id: NodeId) -> Option<&NodeData> {
        self.nodes.get(id.0).and_then(Option::as_ref)
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut NodeData> {
        self.nodes.get_mut(id.0).and_then(Option::as_mut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_and_remove_subtree() {
        let page = Page::new("https://example.com/", (1024.0, 768.0));
        let outer = page
            .append(page.body(), Element::new("div").with_id("outer"))
            .unwrap();
        let inner = page.append(outer, Element::new("span")).unwrap();

        assert!(page.contains(inner));
        page.remove(outer).unwrap();
        assert!(!page.contains(outer));
        assert!(!page.contains(inner));
        assert!(matches!(page.element(inner), Err(DomError::Detached)));
    }

    #[test]
    fn root_is_never_removable() {
        let page = Page::new("https://example.com/", (1024.0, 768.0));
        assert!(matches!(page.remove(page.root()), Err(DomError::RootRemoval)));
    }

    #[test]
    fn visible_text_skips_hidden_subtrees() {
        let page = Page::new("https://example.com/", (1024.0, 768.0));
        page.append(page.body(), Element::new("p").with_text("shown"))
            .unwrap();
        let hidden = page
            .append(
                page.body(),
                Element::new("div").with_style(ComputedStyle {
                    display_none: true,
                    ..Default::default()
                }),
            )
            .unwrap();
        page.append(hidden, Element::new("p").with_text("hidden"))
            .unwrap();
        page.append(
            page.body(),
            Element::new("script").with_text("var x = 1;"),
        )
        .unwrap();

        let text = page.visible_body_text();
        assert!(text.contains("shown"));
        assert!(!text.contains("hidden"));
        assert!(!text.contains("var x"));
    }

    #[tokio::test]
    async fn insertions_reach_subscribers() {
        let page = Page::new("https://example.com/", (1024.0, 768.0));
        let mut rx = page.subscribe().expect("observable page");
        let id = page.append(page.body(), Element::new("div")).unwrap();
        let record = rx.recv().await.unwrap();
        assert_eq!(record.added, vec![id]);
    }

    #[test]
    fn unobservable_page_has_no_feed() {
        let page = Page::with_observability("https://example.com/", (1024.0, 768.0), false);
        assert!(page.subscribe().is_none());
    }
}

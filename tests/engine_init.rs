mod common;

use common::{StubCollaborator, StubConsole, StubTransport};
use page_sweeper::config::Config;
use page_sweeper::dom::{ComputedStyle, Element, Page, Position};
use page_sweeper::engine::Engine;
use page_sweeper::net::NetError;
use page_sweeper::restricted::NOTICE_ID;
use std::sync::Arc;

fn engine_for(page: &Page, collaborator: Arc<StubCollaborator>) -> Engine {
    Engine::new(
        Config::default(),
        page.clone(),
        Arc::new(StubTransport::new()),
        collaborator,
        Arc::new(StubConsole::new()),
    )
}

fn overlay_style() -> ComputedStyle {
    ComputedStyle {
        position: Position::Fixed,
        z_index: 9999,
        width: 1024.0,
        height: 500.0,
        ..Default::default()
    }
}

#[tokio::test]
async fn disabled_site_leaves_the_page_untouched() {
    let page = Page::new("https://news.example/story", (1024.0, 600.0));
    let ad = page
        .append(page.body(), Element::new("div").with_class("ad-banner"))
        .unwrap();

    let mut engine = engine_for(&page, Arc::new(StubCollaborator::with_enabled(false)));
    assert!(!engine.init().await);

    assert!(!engine.state().initialized);
    assert!(engine.state().watcher.is_none());
    assert!(!engine.transport().is_intercepted());
    assert!(page.contains(ad));
    assert_eq!(engine.stats().snapshot().total_removed(), 0);
}

#[tokio::test]
async fn init_activates_cleans_and_blocks() {
    let page = Page::new("https://news.example/story", (1024.0, 600.0));
    let ad = page
        .append(page.body(), Element::new("div").with_class("ad-banner"))
        .unwrap();
    let tracker = page
        .append(
            page.body(),
            Element::new("script")
                .with_attr("src", "https://www.googletagmanager.com/gtag.js"),
        )
        .unwrap();
    let overlay = page
        .append(page.body(), Element::new("div").with_style(overlay_style()))
        .unwrap();
    let content = page
        .append(page.body(), Element::new("p").with_text("the article"))
        .unwrap();

    let collaborator = Arc::new(StubCollaborator::with_enabled(true));
    let mut engine = engine_for(&page, collaborator.clone());
    assert!(engine.init().await);

    assert!(engine.state().initialized);
    assert!(engine.state().watcher.is_some());
    assert_eq!(engine.state().restricted_content, Some(false));
    assert!(!page.contains(ad));
    assert!(!page.contains(tracker));
    assert!(!page.contains(overlay));
    assert!(page.contains(content));

    // Network interception is live.
    let transport = engine.transport();
    assert!(transport.is_intercepted());
    let err = transport
        .fetch("https://analytics.google.com/track".into())
        .await
        .unwrap_err();
    assert!(matches!(err, NetError::Blocked(_)));
    transport
        .fetch("https://news.example/api/comments".into())
        .await
        .unwrap();

    let snapshot = engine.stats().snapshot();
    assert_eq!(snapshot.selector_removed, 1);
    assert_eq!(snapshot.source_removed, 1);
    assert_eq!(snapshot.overlay_removed, 1);
    assert_eq!(snapshot.fetch_blocked, 1);

    // Activation was announced to the background process.
    assert_eq!(
        collaborator.bypass_notices.lock().unwrap().as_slice(),
        ["https://news.example/story"]
    );
}

#[tokio::test]
async fn init_is_idempotent() {
    let page = Page::new("https://news.example/story", (1024.0, 600.0));
    let collaborator = Arc::new(StubCollaborator::with_enabled(true));
    let mut engine = engine_for(&page, collaborator.clone());

    assert!(engine.init().await);
    assert!(engine.init().await);

    // The activation sequence ran once.
    assert_eq!(collaborator.bypass_notices.lock().unwrap().len(), 1);
    assert!(engine.transport().is_intercepted());
}

#[tokio::test]
async fn unreachable_collaborator_fails_open() {
    let page = Page::new("https://news.example/story", (1024.0, 600.0));
    let ad = page
        .append(page.body(), Element::new("div").with_class("ad-banner"))
        .unwrap();

    let mut engine = engine_for(&page, Arc::new(StubCollaborator::unreachable()));
    assert!(engine.init().await);
    assert!(engine.state().initialized);
    assert!(!page.contains(ad));
}

#[tokio::test]
async fn protected_site_gets_only_the_conservative_dialog_pass() {
    let page = Page::new("https://gist.github.com/someone/snippet", (1024.0, 600.0));
    let ad = page
        .append(page.body(), Element::new("div").with_class("ad-banner"))
        .unwrap();
    let dialog = page
        .append(
            page.body(),
            Element::new("div").with_text("Please disable your ad blocker to continue."),
        )
        .unwrap();

    let mut engine = engine_for(&page, Arc::new(StubCollaborator::with_enabled(true)));
    assert!(engine.init().await);

    assert!(engine.state().initialized);
    assert!(!page.contains(dialog));
    // Protected sites never get broad sweeps or interception.
    assert!(page.contains(ad));
    assert!(!engine.transport().is_intercepted());
    assert!(engine.state().watcher.is_none());
}

#[tokio::test]
async fn restricted_page_gets_one_notice_and_destroy_removes_it() {
    let page = Page::new("https://news.example/story", (1024.0, 600.0));
    page.append(
        page.body(),
        Element::new("p").with_text("Please log in to continue reading this article."),
    )
    .unwrap();

    let mut engine = engine_for(&page, Arc::new(StubCollaborator::with_enabled(true)));
    assert!(engine.init().await);

    assert_eq!(engine.state().restricted_content, Some(true));
    assert!(page.find_by_id(NOTICE_ID).is_some());

    engine.destroy();
    assert!(page.find_by_id(NOTICE_ID).is_none());
    assert!(!engine.state().initialized);
    assert!(engine.state().watcher.is_none());
    assert!(!engine.transport().is_intercepted());
}

#[tokio::test]
async fn non_content_urls_keep_the_engine_idle() {
    for url in ["about:blank", "chrome://settings", "file:///tmp/page.html"] {
        let page = Page::new(url, (1024.0, 600.0));
        let mut engine = engine_for(&page, Arc::new(StubCollaborator::with_enabled(true)));
        assert!(!engine.init().await, "engine should stay idle on {url}");
        assert!(!engine.state().initialized);
    }
}

#[tokio::test]
async fn xhr_blocking_tracks_interception_state() {
    struct NullXhr;
    impl page_sweeper::net::XhrBackend for NullXhr {
        fn open(&mut self, _method: &str, _url: &str) {}
        fn send(&mut self, _body: Option<&[u8]>) {}
    }

    let page = Page::new("https://news.example/story", (1024.0, 600.0));
    let mut engine = engine_for(&page, Arc::new(StubCollaborator::with_enabled(true)));

    // Before init: nothing blocked.
    let mut xhr = engine.xhr(Box::new(NullXhr));
    xhr.open("GET", "https://stats.doubleclick.net/pixel");
    assert!(!xhr.is_blocked());

    assert!(engine.init().await);
    let mut xhr = engine.xhr(Box::new(NullXhr));
    xhr.open("GET", "https://stats.doubleclick.net/pixel");
    assert!(xhr.is_blocked());
    xhr.send(None);
    assert_eq!(engine.stats().snapshot().xhr_blocked, 1);
}

mod common;

use common::{StubCollaborator, StubConsole, StubTransport};
use page_sweeper::config::Config;
use page_sweeper::dom::{Element, Page};
use page_sweeper::engine::Engine;
use std::sync::Arc;
use std::time::Duration;

fn engine_for(page: &Page) -> Engine {
    Engine::new(
        Config::default(),
        page.clone(),
        Arc::new(StubTransport::new()),
        Arc::new(StubCollaborator::with_enabled(true)),
        Arc::new(StubConsole::new()),
    )
}

#[tokio::test]
async fn reinserted_ads_are_cleaned_reactively() {
    let page = Page::new("https://news.example/story", (1024.0, 600.0));
    let mut engine = engine_for(&page);
    assert!(engine.init().await);

    // Page scripts fight back after the initial sweep.
    let ad = page
        .append(page.body(), Element::new("div").with_class("ad-banner"))
        .unwrap();
    let another = page
        .append(page.body(), Element::new("div").with_class("sponsored"))
        .unwrap();
    let content = page
        .append(page.body(), Element::new("p").with_text("fresh comment"))
        .unwrap();

    tokio::time::sleep(Duration::from_millis(300)).await;

    assert!(!page.contains(ad));
    assert!(!page.contains(another));
    assert!(page.contains(content));
}

#[tokio::test]
async fn reinserted_adblock_dialogs_are_also_cleaned() {
    let page = Page::new("https://news.example/story", (1024.0, 600.0));
    let mut engine = engine_for(&page);
    assert!(engine.init().await);

    let dialog = page
        .append(
            page.body(),
            Element::new("div").with_text("Ad blocker detected! Whitelist us to continue."),
        )
        .unwrap();

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(!page.contains(dialog));
}

#[tokio::test]
async fn unobservable_host_degrades_to_one_shot_cleaning() {
    let page = Page::with_observability("https://news.example/story", (1024.0, 600.0), false);
    let initial_ad = page
        .append(page.body(), Element::new("div").with_class("ad-banner"))
        .unwrap();

    let mut engine = engine_for(&page);
    assert!(engine.init().await);

    // The initial pass still ran.
    assert!(!page.contains(initial_ad));
    assert!(engine.state().watcher.is_none());

    // But later insertions go unnoticed.
    let late_ad = page
        .append(page.body(), Element::new("div").with_class("ad-banner"))
        .unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(page.contains(late_ad));
}

#[tokio::test]
async fn destroy_stops_reactive_cleaning() {
    let page = Page::new("https://news.example/story", (1024.0, 600.0));
    let mut engine = engine_for(&page);
    assert!(engine.init().await);
    engine.destroy();

    let ad = page
        .append(page.body(), Element::new("div").with_class("ad-banner"))
        .unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(page.contains(ad));
}

//! In-page content filtering engine.
//!
//! Injected into a loaded page, the engine suppresses tracker/ad network
//! requests, removes advertising and overlay DOM subtrees, neutralizes
//! anti-adblock dialogs, and flags login/subscription walls — all while the
//! page's own scripts keep mutating the document. The host environment
//! (DOM, network primitives, console, background message channel) is
//! injected through the trait seams in [`dom`], [`net`], [`console`], and
//! [`messaging`].
//!
//! Typical wiring:
//!
//! ```no_run
//! use page_sweeper::config::Config;
//! use page_sweeper::dom::Page;
//! use page_sweeper::engine::Engine;
//! # use std::sync::Arc;
//! # async fn run(
//! #     transport: Arc<dyn page_sweeper::net::FetchTransport>,
//! #     collaborator: Arc<dyn page_sweeper::messaging::PolicyCollaborator>,
//! #     console: Arc<dyn page_sweeper::console::ConsoleSink>,
//! # ) {
//! let page = Page::new("https://news.example/story", (1280.0, 800.0));
//! let mut engine = Engine::new(Config::default(), page, transport, collaborator, console);
//! engine.init().await;
//! # }
//! ```

pub mod adblock;
pub mod config;
pub mod console;
pub mod dom;
pub mod engine;
pub mod gate;
pub mod init;
pub mod messaging;
pub mod net;
pub mod registry;
pub mod restricted;
pub mod sanitizer;
pub mod stats;
pub mod telemetry;
pub mod watcher;

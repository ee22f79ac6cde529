//! ScanWatch Injection Runtime
//!
//! This crate applies the patterns compiled by `sw-core` to a browser: it
//! caches the content script and stylesheet, answers content script requests
//! from bootstrapped pages, injects into already open pages and keeps a
//! load-completion listener armed for future navigations.
//!
//! The browser is reached only through the [`Browser`] trait. Everything runs
//! on a single cooperative event loop, so the traits are `?Send` and shared
//! state uses `Rc`/`RefCell`.
//!
//! # Modules
//!
//! - `host`: Browser abstraction and listener traits
//! - `resources`: Write-once content script and stylesheet cache
//! - `responder`: Background responder for `get-cs` requests
//! - `injector`: Injection into already open pages
//! - `watcher`: Load-completion subscription and handler
//! - `state`: Shared state read by listeners
//! - `context`: Initialization sequence
//! - `memory`: In-memory browser used by tests and dry runs

pub mod context;
pub mod error;
pub mod host;
pub mod injector;
pub mod memory;
pub mod resources;
pub mod responder;
pub mod state;
pub mod watcher;

// Re-export commonly used types
pub use context::{InitReport, InjectionContext};
pub use error::InjectError;
pub use host::{Browser, CompletedListener, HostError, ListenerId, MessageListener, ScriptSource};
pub use injector::{inject_open_tabs, InjectionReport, TabOutcome};
pub use memory::MemoryBrowser;
pub use resources::ResourceCache;
pub use watcher::{CompletedHandler, FrameOutcome, NavigationWatcher};

//! Browser abstraction
//!
//! The background page talks to the browser through these traits: asset
//! loading, tab enumeration, script and stylesheet injection, and listener
//! registration for load completions and runtime messages.

use std::rc::Rc;

use async_trait::async_trait;
use serde_json::Value;
use sw_core::types::{FrameScope, LoadCompletedEvent, RequestFilter, Tab};

/// Error type for a single browser call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HostError {
    #[error("Asset not found: {0}")]
    AssetNotFound(String),
    #[error("No tab with id {0}")]
    NoSuchTab(i32),
    #[error("Missing host permission for tab {0}")]
    PermissionDenied(i32),
    #[error("Frame {frame_id} of tab {tab_id} is gone")]
    FrameGone { tab_id: i32, frame_id: i32 },
    #[error("{0}")]
    Other(String),
}

/// Script handed to `execute_script`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptSource {
    /// Inline script text
    Code(String),
    /// Extension-relative script file
    File(String),
}

/// Handle of a registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub u32);

/// Receives load completions matching the subscription filter.
#[async_trait(?Send)]
pub trait CompletedListener {
    async fn on_completed(&self, event: LoadCompletedEvent);
}

/// Receives runtime messages from page contexts.
///
/// Returns the synchronous reply, or `None` when the message is not handled
/// by this listener.
pub trait MessageListener {
    fn on_message(&self, message: &Value) -> Option<Value>;
}

/// The browser as seen from the background page.
#[async_trait(?Send)]
pub trait Browser {
    /// Load a bundled extension asset as text.
    async fn load_asset(&self, path: &str) -> Result<String, HostError>;

    /// Absolute URL of an extension resource (`""` yields the base URL).
    fn extension_url(&self, path: &str) -> String;

    /// Open top-level pages whose URL matches any of the match patterns.
    async fn query_tabs(&self, url_patterns: &[String]) -> Result<Vec<Tab>, HostError>;

    async fn execute_script(
        &self,
        tab_id: i32,
        script: &ScriptSource,
        scope: FrameScope,
    ) -> Result<(), HostError>;

    async fn insert_css(&self, tab_id: i32, css: &str, scope: FrameScope) -> Result<(), HostError>;

    fn add_completed_listener(
        &self,
        filter: RequestFilter,
        listener: Rc<dyn CompletedListener>,
    ) -> ListenerId;

    /// Returns `false` when no listener with this id is registered.
    fn remove_completed_listener(&self, id: ListenerId) -> bool;

    fn add_message_listener(&self, listener: Rc<dyn MessageListener>) -> ListenerId;
}

//! Message protocol between injected bootstrap scripts and the background
//!
//! The only request is `{"event": "get-cs"}`; it is answered with
//! `{"code": "<content script source>"}`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Event name of the content script request.
pub const GET_CONTENT_SCRIPT: &str = "get-cs";

/// Requests a page context can send to the background.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum ContentRequest {
    #[serde(rename = "get-cs")]
    GetContentScript,
}

/// Reply to `ContentRequest::GetContentScript`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentResponse {
    pub code: String,
}

impl ContentRequest {
    /// Interpret an arbitrary runtime message. Messages of any other shape
    /// belong to other listeners and yield `None`.
    pub fn from_message(message: &Value) -> Option<Self> {
        Self::deserialize(message).ok()
    }
}

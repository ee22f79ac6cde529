//! Background responder for content script requests
//!
//! Bootstrapped pages that passed their host check send `{"event": "get-cs"}`
//! and receive `{"code": ...}` with the cached content script.

use std::rc::Rc;

use log::debug;
use serde_json::Value;
use sw_core::message::{ContentRequest, ContentResponse};

use crate::host::MessageListener;
use crate::state::InjectionState;

pub struct ContentScriptResponder {
    state: Rc<InjectionState>,
}

impl ContentScriptResponder {
    pub fn new(state: Rc<InjectionState>) -> Self {
        Self { state }
    }
}

impl MessageListener for ContentScriptResponder {
    fn on_message(&self, message: &Value) -> Option<Value> {
        match ContentRequest::from_message(message)? {
            ContentRequest::GetContentScript => {
                let code = self.state.resources.script()?;
                debug!("Delivering content script ({} bytes)", code.len());
                serde_json::to_value(ContentResponse { code: code.to_string() }).ok()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryBrowser;
    use serde_json::json;
    use sw_core::config::InjectionConfig;

    async fn loaded_state() -> Rc<InjectionState> {
        let browser = MemoryBrowser::new("ext://id/")
            .with_asset("content-scripts/cs-main.js", "main();")
            .with_asset("content-scripts/framestyles.css", "");
        let state = Rc::new(InjectionState::new());
        state.resources.ensure_loaded(&browser, &InjectionConfig::default()).await.unwrap();
        state
    }

    #[tokio::test]
    async fn test_answers_get_cs() {
        let responder = ContentScriptResponder::new(loaded_state().await);
        let reply = responder.on_message(&json!({"event": "get-cs"}));
        assert_eq!(reply, Some(json!({"code": "main();"})));
    }

    #[tokio::test]
    async fn test_ignores_other_requests() {
        let responder = ContentScriptResponder::new(loaded_state().await);
        assert_eq!(responder.on_message(&json!({"event": "open-popup"})), None);
        assert_eq!(responder.on_message(&json!(42)), None);
    }

    #[test]
    fn test_nothing_to_deliver_before_load() {
        let responder = ContentScriptResponder::new(Rc::new(InjectionState::new()));
        assert_eq!(responder.on_message(&json!({"event": "get-cs"})), None);
    }
}

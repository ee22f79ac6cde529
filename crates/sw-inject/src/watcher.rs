//! Load-completion subscription and handler
//!
//! The watcher is either unarmed or armed with exactly one subscription.
//! Re-arming always removes the previous subscription first, and only
//! subscribes again when there is something to watch.

use std::cell::Cell;
use std::rc::Rc;

use async_trait::async_trait;
use log::{debug, info};
use sw_core::types::{FrameScope, LoadCompletedEvent, RequestFilter};
use sw_core::url::extract_host;

use crate::host::{Browser, CompletedListener, HostError, ListenerId, ScriptSource};
use crate::state::InjectionState;

// =============================================================================
// Subscription
// =============================================================================

/// Owner of the single load-completion subscription.
#[derive(Debug, Default)]
pub struct NavigationWatcher {
    subscription: Cell<Option<ListenerId>>,
}

impl NavigationWatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_armed(&self) -> bool {
        self.subscription.get().is_some()
    }

    /// Replace the subscription. Returns whether the watcher is armed afterwards.
    pub fn rearm<B: Browser + ?Sized>(
        &self,
        browser: &B,
        filter: Option<RequestFilter>,
        listener: Rc<dyn CompletedListener>,
    ) -> bool {
        self.disarm(browser);

        let filter = match filter {
            Some(filter) if !filter.urls.is_empty() => filter,
            _ => return false,
        };

        info!("Watching {} URL patterns for load completions", filter.urls.len());
        let id = browser.add_completed_listener(filter, listener);
        self.subscription.set(Some(id));
        true
    }

    /// Remove the subscription, if any.
    pub fn disarm<B: Browser + ?Sized>(&self, browser: &B) {
        if let Some(id) = self.subscription.take() {
            browser.remove_completed_listener(id);
        }
    }
}

// =============================================================================
// Handler
// =============================================================================

/// What the handler did with one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Request not related to a tab
    NoTab,
    /// Host not matched by the current patterns
    NotWatched,
    Injected {
        script: Result<(), HostError>,
        stylesheet: Result<(), HostError>,
    },
}

/// Injects the content script file and the stylesheet into frames whose
/// host matches the current patterns.
pub struct CompletedHandler<B: Browser + ?Sized> {
    browser: Rc<B>,
    state: Rc<InjectionState>,
    content_script: ScriptSource,
}

impl<B: Browser + ?Sized> CompletedHandler<B> {
    /// `content_script` is the extension path injected by reference.
    pub fn new(browser: Rc<B>, state: Rc<InjectionState>, content_script: &str) -> Self {
        Self {
            browser,
            state,
            content_script: ScriptSource::File(content_script.to_string()),
        }
    }

    pub async fn handle(&self, event: &LoadCompletedEvent) -> FrameOutcome {
        if !event.has_tab() {
            return FrameOutcome::NoTab;
        }

        let host = extract_host(&event.url).unwrap_or("");
        if !self.state.patterns().matches_host(host) {
            return FrameOutcome::NotWatched;
        }

        let scope = FrameScope::Frame(event.frame_id);
        let css = self.state.resources.stylesheet().unwrap_or_default();
        let (script, stylesheet) = futures::join!(
            self.browser.execute_script(event.tab_id, &self.content_script, scope),
            self.browser.insert_css(event.tab_id, css, scope)
        );

        if let Err(e) = &script {
            debug!("Script injection into tab {} frame {} failed: {}", event.tab_id, event.frame_id, e);
        }
        if let Err(e) = &stylesheet {
            debug!("Stylesheet injection into tab {} frame {} failed: {}", event.tab_id, event.frame_id, e);
        }

        FrameOutcome::Injected { script, stylesheet }
    }
}

#[async_trait(?Send)]
impl<B: Browser + ?Sized> CompletedListener for CompletedHandler<B> {
    async fn on_completed(&self, event: LoadCompletedEvent) {
        self.handle(&event).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{InjectionKind, MemoryBrowser};
    use sw_core::hosts::HostSet;
    use sw_core::patterns::CompiledPatterns;
    use sw_core::types::{RequestType, TAB_ID_NONE};

    fn state_for(hosts: &[&str]) -> Rc<InjectionState> {
        let state = Rc::new(InjectionState::new());
        state.publish(Rc::new(CompiledPatterns::compile(&HostSet::from_hosts(hosts.iter().copied()))));
        state
    }

    fn event(url: &str, tab_id: i32, frame_id: i32) -> LoadCompletedEvent {
        LoadCompletedEvent {
            url: url.to_string(),
            tab_id,
            frame_id,
            request_type: RequestType::SUB_FRAME,
        }
    }

    #[tokio::test]
    async fn test_tabless_event_ignored() {
        let browser = Rc::new(MemoryBrowser::new("ext://id/"));
        let handler = CompletedHandler::new(browser.clone(), state_for(&["example.com"]), "cs.js");

        let outcome = handler.handle(&event("https://mail.example.com/", TAB_ID_NONE, 0)).await;
        assert_eq!(outcome, FrameOutcome::NoTab);
        assert!(browser.injections().is_empty());
    }

    #[tokio::test]
    async fn test_injects_file_into_event_frame() {
        let browser = Rc::new(MemoryBrowser::new("ext://id/"));
        let tab = browser.open_tab("https://mail.example.com/");
        let handler = CompletedHandler::new(browser.clone(), state_for(&["example.com"]), "cs.js");

        let outcome = handler.handle(&event("https://frame.example.com/x", tab, 7)).await;
        assert_eq!(outcome, FrameOutcome::Injected { script: Ok(()), stylesheet: Ok(()) });

        let injected = browser.injections_for(tab);
        assert_eq!(injected.len(), 2);
        assert!(injected.iter().all(|i| i.scope == FrameScope::Frame(7)));
        assert!(injected
            .iter()
            .any(|i| i.kind == InjectionKind::Script(ScriptSource::File("cs.js".into()))));
    }

    #[tokio::test]
    async fn test_unwatched_host_ignored() {
        let browser = Rc::new(MemoryBrowser::new("ext://id/"));
        let tab = browser.open_tab("https://example.org/");
        let handler = CompletedHandler::new(browser.clone(), state_for(&["example.com"]), "cs.js");

        let outcome = handler.handle(&event("https://example.org/", tab, 0)).await;
        assert_eq!(outcome, FrameOutcome::NotWatched);
        assert!(browser.injections().is_empty());
    }

    #[tokio::test]
    async fn test_at_sign_after_host_does_not_spoof_watched_host() {
        let browser = Rc::new(MemoryBrowser::new("ext://id/"));
        let tab = browser.open_tab("https://evil.example.net/");
        let handler = CompletedHandler::new(browser.clone(), state_for(&["mail.example.com"]), "cs.js");

        for url in [
            "https://evil.example.net#@mail.example.com",
            "https://evil.example.net?@mail.example.com/",
        ] {
            assert_eq!(handler.handle(&event(url, tab, 0)).await, FrameOutcome::NotWatched);
        }
        assert!(browser.injections().is_empty());
    }

    #[tokio::test]
    async fn test_handler_reads_latest_patterns() {
        let browser = Rc::new(MemoryBrowser::new("ext://id/"));
        let tab = browser.open_tab("https://example.org/");
        let state = state_for(&["example.com"]);
        let handler = CompletedHandler::new(browser.clone(), state.clone(), "cs.js");

        state.publish(Rc::new(CompiledPatterns::compile(&HostSet::from_hosts(["example.org"]))));

        assert_eq!(
            handler.handle(&event("https://mail.example.com/", tab, 0)).await,
            FrameOutcome::NotWatched
        );
        assert!(matches!(
            handler.handle(&event("https://example.org/", tab, 0)).await,
            FrameOutcome::Injected { .. }
        ));
    }

    #[tokio::test]
    async fn test_injection_failure_swallowed() {
        let browser = Rc::new(MemoryBrowser::new("ext://id/"));
        let tab = browser.open_tab("https://example.com/");
        browser.fail_tab(tab);
        let handler = CompletedHandler::new(browser.clone(), state_for(&["example.com"]), "cs.js");

        let outcome = handler.handle(&event("https://example.com/", tab, 0)).await;
        assert_eq!(
            outcome,
            FrameOutcome::Injected {
                script: Err(HostError::PermissionDenied(tab)),
                stylesheet: Err(HostError::PermissionDenied(tab)),
            }
        );
    }

    #[tokio::test]
    async fn test_frame_gone_swallowed() {
        let browser = Rc::new(MemoryBrowser::new("ext://id/"));
        let tab = browser.open_tab("https://example.com/");
        browser.close_frame(tab, 4);
        let handler = CompletedHandler::new(browser.clone(), state_for(&["example.com"]), "cs.js");

        let gone = HostError::FrameGone { tab_id: tab, frame_id: 4 };
        assert_eq!(
            handler.handle(&event("https://ads.example.com/", tab, 4)).await,
            FrameOutcome::Injected { script: Err(gone.clone()), stylesheet: Err(gone) }
        );
        assert!(browser.injections().is_empty());
    }

    #[test]
    fn test_rearm_replaces_subscription() {
        let browser = Rc::new(MemoryBrowser::new("ext://id/"));
        let watcher = NavigationWatcher::new();
        let state = state_for(&["example.com"]);
        let listener = || -> Rc<dyn CompletedListener> {
            Rc::new(CompletedHandler::new(browser.clone(), state.clone(), "cs.js"))
        };

        assert!(watcher.rearm(&*browser, state.patterns().request_filter(), listener()));
        assert!(watcher.rearm(&*browser, state.patterns().request_filter(), listener()));
        assert_eq!(browser.completed_listener_count(), 1);

        assert!(!watcher.rearm(&*browser, None, listener()));
        assert!(!watcher.is_armed());
        assert_eq!(browser.completed_listener_count(), 0);

        // Disarming an unarmed watcher is a no-op.
        watcher.disarm(&*browser);
        assert_eq!(browser.completed_listener_count(), 0);
    }
}

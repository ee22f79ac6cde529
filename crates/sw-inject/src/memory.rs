//! In-memory browser
//!
//! Holds assets, open tabs and registered listeners, and records every
//! injection. Tabs can be marked as failing and frames as closed to exercise
//! best-effort paths. Used by the test-suite and by `sw-cli simulate`.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};

use async_trait::async_trait;
use serde_json::Value;
use sw_core::types::{FrameScope, LoadCompletedEvent, RequestFilter, Tab};
use sw_core::url::matches_any;

use crate::host::{Browser, CompletedListener, HostError, ListenerId, MessageListener, ScriptSource};

/// What was injected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InjectionKind {
    Script(ScriptSource),
    Stylesheet(String),
}

/// One successful injection call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Injection {
    pub tab_id: i32,
    pub scope: FrameScope,
    pub kind: InjectionKind,
}

type CompletedEntry = (RequestFilter, Rc<dyn CompletedListener>);

/// Browser backed by in-memory tables.
pub struct MemoryBrowser {
    base_url: String,
    assets: RefCell<HashMap<String, String>>,
    asset_loads: RefCell<Vec<String>>,
    tabs: RefCell<Vec<Tab>>,
    failing_tabs: RefCell<HashSet<i32>>,
    closed_frames: RefCell<HashSet<(i32, i32)>>,
    yield_on_load: Cell<bool>,
    injections: RefCell<Vec<Injection>>,
    completed_listeners: RefCell<BTreeMap<ListenerId, CompletedEntry>>,
    message_listeners: RefCell<BTreeMap<ListenerId, Rc<dyn MessageListener>>>,
    next_listener: Cell<u32>,
    next_tab: Cell<i32>,
    tab_queries: Cell<usize>,
}

impl MemoryBrowser {
    /// Create a browser whose extension resources live under `base_url`.
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            assets: RefCell::new(HashMap::new()),
            asset_loads: RefCell::new(Vec::new()),
            tabs: RefCell::new(Vec::new()),
            failing_tabs: RefCell::new(HashSet::new()),
            closed_frames: RefCell::new(HashSet::new()),
            yield_on_load: Cell::new(false),
            injections: RefCell::new(Vec::new()),
            completed_listeners: RefCell::new(BTreeMap::new()),
            message_listeners: RefCell::new(BTreeMap::new()),
            next_listener: Cell::new(1),
            next_tab: Cell::new(1),
            tab_queries: Cell::new(0),
        }
    }

    pub fn with_asset(self, path: &str, text: &str) -> Self {
        self.add_asset(path, text);
        self
    }

    pub fn add_asset(&self, path: &str, text: &str) {
        self.assets.borrow_mut().insert(path.to_string(), text.to_string());
    }

    /// Open a tab and return its id.
    pub fn open_tab(&self, url: &str) -> i32 {
        let id = self.next_tab.get();
        self.next_tab.set(id + 1);
        self.tabs.borrow_mut().push(Tab { id, url: url.to_string() });
        id
    }

    /// Make every injection into `tab_id` fail.
    pub fn fail_tab(&self, tab_id: i32) {
        self.failing_tabs.borrow_mut().insert(tab_id);
    }

    /// Make injections into one frame of `tab_id` fail as if it navigated away.
    pub fn close_frame(&self, tab_id: i32, frame_id: i32) {
        self.closed_frames.borrow_mut().insert((tab_id, frame_id));
    }

    /// Suspend once inside every `load_asset` call before answering.
    pub fn yield_on_load(&self, enabled: bool) {
        self.yield_on_load.set(enabled);
    }

    pub fn injections(&self) -> Vec<Injection> {
        self.injections.borrow().clone()
    }

    pub fn injections_for(&self, tab_id: i32) -> Vec<Injection> {
        self.injections
            .borrow()
            .iter()
            .filter(|i| i.tab_id == tab_id)
            .cloned()
            .collect()
    }

    /// Paths passed to `load_asset`, in call order.
    pub fn asset_loads(&self) -> Vec<String> {
        self.asset_loads.borrow().clone()
    }

    pub fn tab_queries(&self) -> usize {
        self.tab_queries.get()
    }

    pub fn completed_listener_count(&self) -> usize {
        self.completed_listeners.borrow().len()
    }

    pub fn message_listener_count(&self) -> usize {
        self.message_listeners.borrow().len()
    }

    /// Filters of the registered load-completion listeners.
    pub fn completed_filters(&self) -> Vec<RequestFilter> {
        self.completed_listeners
            .borrow()
            .values()
            .map(|(filter, _)| filter.clone())
            .collect()
    }

    /// Deliver a load completion to every listener whose filter accepts it.
    /// Returns the number of listeners invoked.
    pub async fn dispatch_completed(&self, event: LoadCompletedEvent) -> usize {
        let listeners: Vec<Rc<dyn CompletedListener>> = self
            .completed_listeners
            .borrow()
            .values()
            .filter(|(filter, _)| {
                filter.types.intersects(event.request_type) && matches_any(&filter.urls, &event.url)
            })
            .map(|(_, listener)| Rc::clone(listener))
            .collect();

        for listener in &listeners {
            listener.on_completed(event.clone()).await;
        }
        listeners.len()
    }

    /// Send a runtime message; returns the first reply.
    pub fn send_message(&self, message: &Value) -> Option<Value> {
        let listeners: Vec<Rc<dyn MessageListener>> =
            self.message_listeners.borrow().values().cloned().collect();
        listeners.iter().find_map(|l| l.on_message(message))
    }

    fn next_listener_id(&self) -> ListenerId {
        let id = self.next_listener.get();
        self.next_listener.set(id + 1);
        ListenerId(id)
    }

    fn check_target(&self, tab_id: i32, scope: FrameScope) -> Result<(), HostError> {
        if !self.tabs.borrow().iter().any(|t| t.id == tab_id) {
            return Err(HostError::NoSuchTab(tab_id));
        }
        if self.failing_tabs.borrow().contains(&tab_id) {
            return Err(HostError::PermissionDenied(tab_id));
        }
        if let FrameScope::Frame(frame_id) = scope {
            if self.closed_frames.borrow().contains(&(tab_id, frame_id)) {
                return Err(HostError::FrameGone { tab_id, frame_id });
            }
        }
        Ok(())
    }
}

/// Future that is pending exactly once.
#[derive(Default)]
struct YieldNow {
    yielded: bool,
}

impl Future for YieldNow {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.yielded {
            return Poll::Ready(());
        }
        self.yielded = true;
        cx.waker().wake_by_ref();
        Poll::Pending
    }
}

#[async_trait(?Send)]
impl Browser for MemoryBrowser {
    async fn load_asset(&self, path: &str) -> Result<String, HostError> {
        self.asset_loads.borrow_mut().push(path.to_string());
        if self.yield_on_load.get() {
            YieldNow::default().await;
        }
        self.assets
            .borrow()
            .get(path)
            .cloned()
            .ok_or_else(|| HostError::AssetNotFound(path.to_string()))
    }

    fn extension_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn query_tabs(&self, url_patterns: &[String]) -> Result<Vec<Tab>, HostError> {
        self.tab_queries.set(self.tab_queries.get() + 1);
        Ok(self
            .tabs
            .borrow()
            .iter()
            .filter(|t| matches_any(url_patterns, &t.url))
            .cloned()
            .collect())
    }

    async fn execute_script(
        &self,
        tab_id: i32,
        script: &ScriptSource,
        scope: FrameScope,
    ) -> Result<(), HostError> {
        self.check_target(tab_id, scope)?;
        self.injections.borrow_mut().push(Injection {
            tab_id,
            scope,
            kind: InjectionKind::Script(script.clone()),
        });
        Ok(())
    }

    async fn insert_css(&self, tab_id: i32, css: &str, scope: FrameScope) -> Result<(), HostError> {
        self.check_target(tab_id, scope)?;
        self.injections.borrow_mut().push(Injection {
            tab_id,
            scope,
            kind: InjectionKind::Stylesheet(css.to_string()),
        });
        Ok(())
    }

    fn add_completed_listener(
        &self,
        filter: RequestFilter,
        listener: Rc<dyn CompletedListener>,
    ) -> ListenerId {
        let id = self.next_listener_id();
        self.completed_listeners.borrow_mut().insert(id, (filter, listener));
        id
    }

    fn remove_completed_listener(&self, id: ListenerId) -> bool {
        self.completed_listeners.borrow_mut().remove(&id).is_some()
    }

    fn add_message_listener(&self, listener: Rc<dyn MessageListener>) -> ListenerId {
        let id = self.next_listener_id();
        self.message_listeners.borrow_mut().insert(id, listener);
        id
    }
}

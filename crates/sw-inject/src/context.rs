//! Initialization sequence
//!
//! `init_script_injection` runs on startup and after every watchlist edit:
//!
//! 1. load the content script and stylesheet (once per process)
//! 2. arm the `get-cs` responder (once per context)
//! 3. build and compile the HostSet, then publish it
//! 4. inject the bootstrap into matching open pages
//! 5. re-arm the load-completion watcher with the new filter
//!
//! Each stage awaits the previous one. A resource loading error stops the
//! sequence before anything is injected.

use std::cell::Cell;
use std::rc::Rc;

use log::info;
use sw_core::bootstrap::build_bootstrap;
use sw_core::config::InjectionConfig;
use sw_core::hosts::HostSet;
use sw_core::patterns::CompiledPatterns;
use sw_core::types::WatchEntry;

use crate::error::InjectError;
use crate::host::{Browser, CompletedListener, ListenerId, ScriptSource};
use crate::injector::{inject_open_tabs, InjectionReport};
use crate::resources::ResourceCache;
use crate::responder::ContentScriptResponder;
use crate::state::InjectionState;
use crate::watcher::{CompletedHandler, NavigationWatcher};

/// Summary of one initialization run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitReport {
    /// Reduced host patterns now in effect
    pub hosts: Vec<String>,
    /// Open page injection results
    pub tabs: InjectionReport,
    /// Load-completion listener registered
    pub watching: bool,
}

/// Owner of everything the injection core keeps between runs.
pub struct InjectionContext<B: Browser + 'static> {
    browser: Rc<B>,
    config: InjectionConfig,
    state: Rc<InjectionState>,
    responder: Cell<Option<ListenerId>>,
    watcher: NavigationWatcher,
}

impl<B: Browser + 'static> InjectionContext<B> {
    pub fn new(browser: Rc<B>, config: InjectionConfig) -> Self {
        Self {
            browser,
            config,
            state: Rc::new(InjectionState::new()),
            responder: Cell::new(None),
            watcher: NavigationWatcher::new(),
        }
    }

    pub async fn init_script_injection(&self, watchlist: &[WatchEntry]) -> Result<InitReport, InjectError> {
        self.state.resources.ensure_loaded(&*self.browser, &self.config).await?;

        self.arm_responder();

        let host_set = HostSet::from_watchlist(watchlist, self.config.keyserver_host());
        let patterns = Rc::new(CompiledPatterns::compile(&host_set));
        self.state.publish(Rc::clone(&patterns));
        info!("Compiled {} host patterns", patterns.len());

        let bootstrap = ScriptSource::Code(build_bootstrap(&patterns.regex_sources()));
        let stylesheet = self.state.resources.stylesheet().unwrap_or_default();
        let tabs = inject_open_tabs(&*self.browser, patterns.url_patterns(), &bootstrap, stylesheet).await;

        let listener: Rc<dyn CompletedListener> = Rc::new(CompletedHandler::new(
            Rc::clone(&self.browser),
            Rc::clone(&self.state),
            &self.config.content_script,
        ));
        let watching = self.watcher.rearm(&*self.browser, patterns.request_filter(), listener);

        Ok(InitReport {
            hosts: patterns.hosts().to_vec(),
            tabs,
            watching,
        })
    }

    fn arm_responder(&self) {
        if self.responder.get().is_some() {
            return;
        }
        let responder = Rc::new(ContentScriptResponder::new(Rc::clone(&self.state)));
        self.responder.set(Some(self.browser.add_message_listener(responder)));
    }

    /// The compilation currently in effect.
    pub fn patterns(&self) -> Rc<CompiledPatterns> {
        self.state.patterns()
    }

    /// Bootstrap script for the compilation currently in effect.
    pub fn bootstrap(&self) -> String {
        build_bootstrap(&self.state.patterns().regex_sources())
    }

    /// Cached content script and stylesheet.
    pub fn resources(&self) -> &ResourceCache {
        &self.state.resources
    }

    pub fn config(&self) -> &InjectionConfig {
        &self.config
    }

    pub fn is_watching(&self) -> bool {
        self.watcher.is_armed()
    }
}

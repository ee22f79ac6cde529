//! WebAssembly bindings for ScanWatch

mod browser;

use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};

use js_sys::{Array, Promise, JSON};
use log::{Level, LevelFilter};
use serde::de::DeserializeOwned;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;

use sw_core::{
    bootstrap::build_bootstrap,
    config::InjectionConfig,
    hosts::{reduce_hosts, HostSet},
    patterns::CompiledPatterns,
    types::WatchEntry,
};
use sw_inject::{InitReport, InjectionContext};

pub use browser::JsBrowser;

/// Parse a JS value through JSON; `undefined`/`null` yield the default.
fn from_js<T: DeserializeOwned + Default>(value: &JsValue) -> Result<T, JsValue> {
    if value.is_undefined() || value.is_null() {
        return Ok(T::default());
    }
    let text: String = JSON::stringify(value)?.into();
    serde_json::from_str(&text).map_err(|e| JsValue::from_str(&format!("Invalid input: {}", e)))
}

fn string_array(values: &[String]) -> Array {
    values.iter().map(|v| JsValue::from_str(v)).collect()
}

fn patterns_to_js(patterns: &CompiledPatterns) -> JsValue {
    let result = js_sys::Object::new();
    let _ = js_sys::Reflect::set(&result, &"hosts".into(), &string_array(patterns.hosts()));
    let _ = js_sys::Reflect::set(&result, &"urlPatterns".into(), &string_array(patterns.url_patterns()));
    let _ = js_sys::Reflect::set(&result, &"regexSources".into(), &string_array(&patterns.regex_sources()));
    result.into()
}

fn report_to_js(report: &InitReport) -> JsValue {
    let result = js_sys::Object::new();
    let _ = js_sys::Reflect::set(&result, &"hosts".into(), &string_array(&report.hosts));
    let _ = js_sys::Reflect::set(&result, &"tabsInjected".into(), &JsValue::from(report.tabs.injected() as u32));
    let _ = js_sys::Reflect::set(&result, &"tabsFailed".into(), &JsValue::from(report.tabs.failed() as u32));
    let _ = js_sys::Reflect::set(&result, &"watching".into(), &JsValue::from(report.watching));
    result.into()
}

/// Injection core bound to a JavaScript host object.
#[wasm_bindgen]
pub struct ScriptInjector {
    context: Rc<InjectionContext<JsBrowser>>,
}

#[wasm_bindgen]
impl ScriptInjector {
    #[wasm_bindgen(constructor)]
    pub fn new(host: JsValue, config: JsValue) -> Result<ScriptInjector, JsValue> {
        let config: InjectionConfig = from_js(&config)?;
        let browser = Rc::new(JsBrowser::new(host)?);
        Ok(ScriptInjector {
            context: Rc::new(InjectionContext::new(browser, config)),
        })
    }

    /// Run the initialization sequence for `watchlist`.
    /// Resolves to `{hosts, tabsInjected, tabsFailed, watching}`.
    pub fn init(&self, watchlist: JsValue) -> Promise {
        let context = Rc::clone(&self.context);
        future_to_promise(async move {
            let watchlist: Vec<WatchEntry> = from_js(&watchlist)?;
            let report = context
                .init_script_injection(&watchlist)
                .await
                .map_err(|e| JsValue::from_str(&e.to_string()))?;
            Ok(report_to_js(&report))
        })
    }

    /// The compilation currently in effect.
    pub fn patterns(&self) -> JsValue {
        patterns_to_js(&self.context.patterns())
    }

    pub fn bootstrap(&self) -> String {
        self.context.bootstrap()
    }

    #[wasm_bindgen(js_name = isWatching)]
    pub fn is_watching(&self) -> bool {
        self.context.is_watching()
    }
}

static LOGGER_INSTALLED: AtomicBool = AtomicBool::new(false);

/// Route `log` output to the browser console. Later calls only change the level.
#[wasm_bindgen]
pub fn init_logging(level: &str) {
    if !LOGGER_INSTALLED.swap(true, Ordering::SeqCst) {
        console_error_panic_hook::set_once();
        wasm_logger::init(wasm_logger::Config::new(Level::Trace));
    }
    log::set_max_level(level.parse().unwrap_or(LevelFilter::Info));
}

#[wasm_bindgen]
pub fn compile_watchlist(watchlist: JsValue, keyserver_base_url: &str) -> Result<JsValue, JsValue> {
    let watchlist: Vec<WatchEntry> = from_js(&watchlist)?;
    let config = InjectionConfig {
        keyserver_base_url: keyserver_base_url.to_string(),
        ..InjectionConfig::default()
    };
    let host_set = HostSet::from_watchlist(&watchlist, config.keyserver_host());
    Ok(patterns_to_js(&CompiledPatterns::compile(&host_set)))
}

#[wasm_bindgen]
pub fn build_bootstrap_js(regex_sources: JsValue) -> Result<String, JsValue> {
    let sources: Vec<String> = from_js(&regex_sources)?;
    Ok(build_bootstrap(&sources))
}

#[wasm_bindgen]
pub fn reduce_hosts_js(hosts: JsValue) -> Result<JsValue, JsValue> {
    let hosts: Vec<String> = from_js(&hosts)?;
    let reduced = reduce_hosts(hosts.iter().map(String::as_str));
    Ok(string_array(&reduced).into())
}

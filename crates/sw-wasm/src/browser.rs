//! `Browser` implementation over a JavaScript host object
//!
//! The background script passes an object exposing the WebExtension calls
//! the runtime needs:
//!
//! ```text
//! loadAsset(path)                        -> Promise<string>
//! extensionUrl(path)                     -> string
//! queryTabs(urlPatterns)                 -> Promise<[{id, url}]>
//! executeScript(tabId, {code}|{file}, {allFrames}|{frameId}) -> Promise
//! insertCSS(tabId, css, {allFrames}|{frameId})               -> Promise
//! addCompletedListener(callback, {urls, types})
//! removeCompletedListener(callback)
//! addMessageListener(callback(request, sender, sendResponse))
//! ```

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use async_trait::async_trait;
use js_sys::{Array, Function, Object, Promise, Reflect, JSON};
use log::{debug, warn};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::{spawn_local, JsFuture};

use sw_core::types::{FrameScope, LoadCompletedEvent, RequestFilter, RequestType, Tab, TAB_ID_NONE};
use sw_inject::host::{Browser, CompletedListener, HostError, ListenerId, MessageListener, ScriptSource};

type CompletedCallback = Closure<dyn FnMut(JsValue)>;
type MessageCallback = Closure<dyn FnMut(JsValue, JsValue, JsValue) -> bool>;

pub struct JsBrowser {
    host: JsValue,
    completed: RefCell<HashMap<ListenerId, CompletedCallback>>,
    messages: RefCell<Vec<MessageCallback>>,
    next_listener: Cell<u32>,
}

impl JsBrowser {
    pub fn new(host: JsValue) -> Result<Self, JsValue> {
        if !host.is_object() {
            return Err(JsValue::from_str("Host must be an object"));
        }
        Ok(Self {
            host,
            completed: RefCell::new(HashMap::new()),
            messages: RefCell::new(Vec::new()),
            next_listener: Cell::new(1),
        })
    }

    fn call(&self, method: &str, args: &[JsValue]) -> Result<JsValue, JsValue> {
        let func = Reflect::get(&self.host, &JsValue::from_str(method))?
            .dyn_into::<Function>()
            .map_err(|_| JsValue::from_str(&format!("Host method '{}' is missing", method)))?;
        let js_args: Array = args.iter().collect();
        func.apply(&self.host, &js_args)
    }

    async fn call_async(&self, method: &str, args: &[JsValue]) -> Result<JsValue, HostError> {
        let value = self.call(method, args).map_err(host_error)?;
        JsFuture::from(Promise::resolve(&value)).await.map_err(host_error)
    }

    fn next_listener_id(&self) -> ListenerId {
        let id = self.next_listener.get();
        self.next_listener.set(id + 1);
        ListenerId(id)
    }
}

fn host_error(value: JsValue) -> HostError {
    let message = value
        .as_string()
        .or_else(|| value.dyn_ref::<js_sys::Error>().map(|e| String::from(e.message())))
        .unwrap_or_else(|| format!("{:?}", value));
    HostError::Other(message)
}

/// Chrome reports a frame that navigated away as "No frame with id <n>".
fn frame_error(err: HostError, tab_id: i32, scope: FrameScope) -> HostError {
    match (err, scope) {
        (HostError::Other(message), FrameScope::Frame(frame_id)) if message.contains("No frame with id") => {
            HostError::FrameGone { tab_id, frame_id }
        }
        (err, _) => err,
    }
}

fn set(target: &Object, key: &str, value: &JsValue) {
    let _ = Reflect::set(target, &JsValue::from_str(key), value);
}

fn get(source: &JsValue, key: &str) -> Option<JsValue> {
    Reflect::get(source, &JsValue::from_str(key))
        .ok()
        .filter(|v| !v.is_undefined() && !v.is_null())
}

fn scope_options(scope: FrameScope) -> JsValue {
    let options = Object::new();
    match scope {
        FrameScope::AllFrames => set(&options, "allFrames", &JsValue::from(true)),
        FrameScope::Frame(frame_id) => set(&options, "frameId", &JsValue::from(frame_id)),
    }
    options.into()
}

fn script_details(script: &ScriptSource) -> JsValue {
    let details = Object::new();
    match script {
        ScriptSource::Code(code) => set(&details, "code", &JsValue::from_str(code)),
        ScriptSource::File(file) => set(&details, "file", &JsValue::from_str(file)),
    }
    details.into()
}

fn event_from_details(details: &JsValue) -> LoadCompletedEvent {
    let int = |key: &str, default: i32| {
        get(details, key)
            .and_then(|v| v.as_f64())
            .map(|v| v as i32)
            .unwrap_or(default)
    };
    LoadCompletedEvent {
        url: get(details, "url").and_then(|v| v.as_string()).unwrap_or_default(),
        tab_id: int("tabId", TAB_ID_NONE),
        frame_id: int("frameId", 0),
        request_type: get(details, "type")
            .and_then(|v| v.as_string())
            .map(|t| RequestType::from_browser(&t))
            .unwrap_or(RequestType::OTHER),
    }
}

fn filter_to_js(filter: &RequestFilter) -> JsValue {
    let js_filter = Object::new();
    let urls: Array = filter.urls.iter().map(|u| JsValue::from_str(u)).collect();
    let types: Array = filter
        .types
        .browser_names()
        .into_iter()
        .map(JsValue::from_str)
        .collect();
    set(&js_filter, "urls", &urls);
    set(&js_filter, "types", &types);
    js_filter.into()
}

/// Convert a JS value to JSON via `JSON.stringify`.
fn to_json(value: &JsValue) -> Option<serde_json::Value> {
    let text: String = JSON::stringify(value).ok()?.into();
    serde_json::from_str(&text).ok()
}

/// Convert JSON to a JS value via `JSON.parse`.
fn from_json(value: &serde_json::Value) -> Option<JsValue> {
    let text = serde_json::to_string(value).ok()?;
    JSON::parse(&text).ok()
}

#[async_trait(?Send)]
impl Browser for JsBrowser {
    async fn load_asset(&self, path: &str) -> Result<String, HostError> {
        let value = self.call_async("loadAsset", &[JsValue::from_str(path)]).await?;
        value
            .as_string()
            .ok_or_else(|| HostError::AssetNotFound(path.to_string()))
    }

    fn extension_url(&self, path: &str) -> String {
        self.call("extensionUrl", &[JsValue::from_str(path)])
            .ok()
            .and_then(|v| v.as_string())
            .unwrap_or_default()
    }

    async fn query_tabs(&self, url_patterns: &[String]) -> Result<Vec<Tab>, HostError> {
        let patterns: Array = url_patterns.iter().map(|p| JsValue::from_str(p)).collect();
        let value = self.call_async("queryTabs", &[patterns.into()]).await?;

        let tabs = Array::from(&value)
            .iter()
            .filter_map(|tab| {
                let id = get(&tab, "id")?.as_f64()? as i32;
                let url = get(&tab, "url")?.as_string()?;
                Some(Tab { id, url })
            })
            .collect();
        Ok(tabs)
    }

    async fn execute_script(
        &self,
        tab_id: i32,
        script: &ScriptSource,
        scope: FrameScope,
    ) -> Result<(), HostError> {
        let args = [JsValue::from(tab_id), script_details(script), scope_options(scope)];
        self.call_async("executeScript", &args)
            .await
            .map(|_| ())
            .map_err(|e| frame_error(e, tab_id, scope))
    }

    async fn insert_css(&self, tab_id: i32, css: &str, scope: FrameScope) -> Result<(), HostError> {
        let args = [JsValue::from(tab_id), JsValue::from_str(css), scope_options(scope)];
        self.call_async("insertCSS", &args)
            .await
            .map(|_| ())
            .map_err(|e| frame_error(e, tab_id, scope))
    }

    fn add_completed_listener(
        &self,
        filter: RequestFilter,
        listener: Rc<dyn CompletedListener>,
    ) -> ListenerId {
        let id = self.next_listener_id();
        let callback = Closure::wrap(Box::new(move |details: JsValue| {
            let event = event_from_details(&details);
            let listener = Rc::clone(&listener);
            spawn_local(async move {
                listener.on_completed(event).await;
            });
        }) as Box<dyn FnMut(JsValue)>);

        if let Err(e) = self.call("addCompletedListener", &[callback.as_ref().clone(), filter_to_js(&filter)]) {
            warn!("addCompletedListener failed: {:?}", e);
        }
        self.completed.borrow_mut().insert(id, callback);
        id
    }

    fn remove_completed_listener(&self, id: ListenerId) -> bool {
        let callback = match self.completed.borrow_mut().remove(&id) {
            Some(callback) => callback,
            None => return false,
        };
        if let Err(e) = self.call("removeCompletedListener", &[callback.as_ref().clone()]) {
            warn!("removeCompletedListener failed: {:?}", e);
        }
        true
    }

    fn add_message_listener(&self, listener: Rc<dyn MessageListener>) -> ListenerId {
        let id = self.next_listener_id();
        let callback = Closure::wrap(Box::new(
            move |request: JsValue, _sender: JsValue, send_response: JsValue| -> bool {
                let reply = to_json(&request)
                    .and_then(|message| listener.on_message(&message))
                    .and_then(|reply| from_json(&reply));
                if let (Some(reply), Some(send)) = (reply, send_response.dyn_ref::<Function>()) {
                    if let Err(e) = send.call1(&JsValue::NULL, &reply) {
                        debug!("sendResponse failed: {:?}", e);
                    }
                }
                false
            },
        ) as Box<dyn FnMut(JsValue, JsValue, JsValue) -> bool>);

        if let Err(e) = self.call("addMessageListener", &[callback.as_ref().clone()]) {
            warn!("addMessageListener failed: {:?}", e);
        }
        self.messages.borrow_mut().push(callback);
        id
    }
}

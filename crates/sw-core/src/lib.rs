//! ScanWatch Core Library
//!
//! This crate decides *where* the extension may inject code: it turns the
//! user's watchlist into host patterns, URL match patterns and host regexes,
//! and generates the bootstrap script that re-verifies a page before the full
//! content script is delivered.
//!
//! # Architecture
//!
//! Everything here is pure and synchronous. The asynchronous side (asset
//! loading, tab enumeration, injection, event subscriptions) lives in
//! `sw-inject` and only consumes the values produced by this crate.
//!
//! # Modules
//!
//! - `types`: Watchlist entries, events and request type masks
//! - `url`: Host extraction and match-pattern evaluation
//! - `hosts`: Domain reduction and HostSet construction
//! - `patterns`: Compilation of a HostSet into URL patterns and regexes
//! - `bootstrap`: In-page bootstrap script generator
//! - `message`: Background/page message protocol
//! - `config`: Injection configuration

pub mod bootstrap;
pub mod config;
pub mod hosts;
pub mod message;
pub mod patterns;
pub mod types;
pub mod url;

// Re-export commonly used types
pub use bootstrap::build_bootstrap;
pub use config::{parse_watchlist, ConfigError, InjectionConfig};
pub use hosts::{collect_scan_hosts, reduce_host, reduce_hosts, HostSet};
pub use patterns::{host_pattern_to_regex, CompiledPatterns};
pub use types::{
    FrameEntry, FrameScope, LoadCompletedEvent, RequestFilter, RequestType, Tab, WatchEntry,
    TAB_ID_NONE,
};

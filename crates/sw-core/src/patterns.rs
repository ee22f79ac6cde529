//! Compilation of a HostSet into match structures
//!
//! Each reduced host pattern yields a URL match pattern (`*://host/*`) for
//! event filtering and tab queries, and an anchored regex for precise host
//! validation. The regex source text is also embedded into the bootstrap
//! script, so it is restricted to syntax JavaScript's `RegExp` accepts.

use log::warn;
use regex::Regex;

use crate::hosts::HostSet;
use crate::types::{RequestFilter, RequestType};

/// Regex fragment a leading `*.` expands to: any run of dotted labels.
const WILDCARD_LABELS: &str = r"(\w+(-\w+)*\.)*";

/// Regex source for a host pattern such as `*.example.com`.
pub fn host_pattern_source(pattern: &str) -> String {
    let (prefix, rest) = match pattern.strip_prefix("*.") {
        Some(rest) => (WILDCARD_LABELS, rest),
        None => ("", pattern),
    };
    format!("^{}{}$", prefix, rest.replace('.', r"\."))
}

/// Compile a host pattern into a regex tested against bare hostnames.
pub fn host_pattern_to_regex(pattern: &str) -> Result<Regex, regex::Error> {
    Regex::new(&host_pattern_source(pattern))
}

/// Patterns derived from one HostSet. Immutable once compiled.
#[derive(Debug, Clone, Default)]
pub struct CompiledPatterns {
    hosts: Vec<String>,
    url_patterns: Vec<String>,
    regexes: Vec<Regex>,
}

impl CompiledPatterns {
    /// Compile every host of the set. An empty set compiles to empty patterns.
    pub fn compile(host_set: &HostSet) -> Self {
        let mut compiled = Self::default();

        for host in host_set.iter() {
            let regex = match host_pattern_to_regex(host) {
                Ok(regex) => regex,
                Err(e) => {
                    warn!("Skipping host pattern '{}': {}", host, e);
                    continue;
                }
            };
            compiled.hosts.push(host.to_string());
            compiled.url_patterns.push(format!("*://{}/*", host));
            compiled.regexes.push(regex);
        }

        compiled
    }

    /// Reduced host patterns, sorted.
    pub fn hosts(&self) -> &[String] {
        &self.hosts
    }

    /// URL match patterns for tab queries and event filters.
    pub fn url_patterns(&self) -> &[String] {
        &self.url_patterns
    }

    /// Source text of each host regex.
    pub fn regex_sources(&self) -> Vec<String> {
        self.regexes.iter().map(|r| r.as_str().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    /// Does any compiled regex match the bare hostname?
    pub fn matches_host(&self, host: &str) -> bool {
        if host.is_empty() {
            return false;
        }
        let host = host.to_ascii_lowercase();
        self.regexes.iter().any(|r| r.is_match(&host))
    }

    /// Load-completion filter for top-level and nested frames.
    /// `None` when there is nothing to watch.
    pub fn request_filter(&self) -> Option<RequestFilter> {
        if self.is_empty() {
            return None;
        }
        Some(RequestFilter {
            urls: self.url_patterns.clone(),
            types: RequestType::DOCUMENT,
        })
    }
}

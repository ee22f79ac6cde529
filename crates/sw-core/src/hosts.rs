//! Domain reduction and HostSet construction
//!
//! Watchlist hosts are generalized to wildcard host patterns before they are
//! compiled:
//!
//! ```
//! use sw_core::hosts::reduce_host;
//!
//! assert_eq!(reduce_host("www.example.com").as_deref(), Some("*.example.com"));
//! assert_eq!(reduce_host("example.com").as_deref(), Some("*.example.com"));
//! assert_eq!(reduce_host("a.b.example.com").as_deref(), Some("*.b.example.com"));
//! assert_eq!(reduce_host("localhost"), None);
//! ```

use std::collections::BTreeSet;

use log::warn;

use crate::types::WatchEntry;

/// Labels kept when collapsing long hostnames.
const MAX_KEPT_LABELS: usize = 3;

// =============================================================================
// Reduction
// =============================================================================

/// Reduce a hostname to a wildcard host pattern.
///
/// Returns `None` for malformed hosts and hosts with fewer than two labels.
pub fn reduce_host(host: &str) -> Option<String> {
    let host = normalize_host(host)?;

    let mut labels: Vec<&str> = host.split('.').collect();
    // An already reduced pattern is reduced again from its concrete part.
    if labels.first() == Some(&"*") {
        labels.remove(0);
    }

    if labels.len() < 2 {
        return None;
    }

    if labels.len() <= MAX_KEPT_LABELS {
        if labels[0].starts_with("www") {
            labels[0] = "*";
        } else {
            labels.insert(0, "*");
        }
        Some(labels.join("."))
    } else {
        Some(format!("*.{}", labels[labels.len() - MAX_KEPT_LABELS..].join(".")))
    }
}

/// Hosts of active entries with scanning enabled, in watchlist order.
pub fn collect_scan_hosts(watchlist: &[WatchEntry]) -> Vec<&str> {
    watchlist.iter().flat_map(|entry| entry.scan_hosts()).collect()
}

/// Reduce each host, then sort and deduplicate.
pub fn reduce_hosts<'a, I>(hosts: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    hosts
        .into_iter()
        .filter_map(|host| {
            let reduced = reduce_host(host);
            if reduced.is_none() && !host.is_empty() {
                warn!("Discarding watchlist host '{}'", host);
            }
            reduced
        })
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Lowercase and validate a hostname or host pattern.
///
/// A `*` is only accepted as the whole first label.
fn normalize_host(host: &str) -> Option<String> {
    let trimmed = host.trim().trim_matches('.');
    if trimmed.is_empty() {
        return None;
    }

    if !trimmed
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'-' | b'_' | b'*'))
    {
        return None;
    }

    for (idx, label) in trimmed.split('.').enumerate() {
        if label.is_empty() {
            return None;
        }
        if label.contains('*') && (idx != 0 || label != "*") {
            return None;
        }
    }

    Some(trimmed.to_ascii_lowercase())
}

// =============================================================================
// HostSet
// =============================================================================

/// Deduplicated, sorted set of reduced host patterns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostSet {
    hosts: Vec<String>,
}

impl HostSet {
    /// Build the HostSet from the eligible watchlist frames plus the
    /// keyserver host, which is always included.
    pub fn from_watchlist(watchlist: &[WatchEntry], keyserver_host: &str) -> Self {
        let hosts = collect_scan_hosts(watchlist)
            .into_iter()
            .chain(std::iter::once(keyserver_host));
        Self { hosts: reduce_hosts(hosts) }
    }

    /// Build a HostSet from arbitrary hosts.
    pub fn from_hosts<'a, I>(hosts: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        Self { hosts: reduce_hosts(hosts) }
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.hosts.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    pub fn contains(&self, host_pattern: &str) -> bool {
        self.hosts.binary_search_by(|h| h.as_str().cmp(host_pattern)).is_ok()
    }
}

//! URL utilities: host extraction and WebExtension match patterns
//!
//! Host extraction works directly on string slices. Match patterns follow the
//! `<scheme>://<host>/<path>` grammar the browser uses for `tabs.query` and
//! `webRequest` filters, so the in-memory host environment and the CLI can
//! evaluate them exactly as the browser would.

// =============================================================================
// Host Extraction
// =============================================================================

/// Get the position after "://".
#[inline]
pub fn get_scheme_end(url: &str) -> Option<usize> {
    let bytes = url.as_bytes();

    let colon_pos = bytes.iter().position(|&b| b == b':')?;

    if bytes.len() > colon_pos + 2 && bytes[colon_pos + 1] == b'/' && bytes[colon_pos + 2] == b'/' {
        return Some(colon_pos + 3);
    }

    None
}

/// Get the start and end positions of the hostname in a URL.
#[inline]
pub fn get_host_position(url: &str) -> Option<(usize, usize)> {
    let scheme_end = get_scheme_end(url)?;
    let bytes = url.as_bytes();

    // The authority ends at the first path, query or fragment delimiter.
    // Userinfo ends at the last '@' inside it.
    let authority_end = bytes[scheme_end..]
        .iter()
        .position(|&b| matches!(b, b'/' | b'\\' | b'?' | b'#'))
        .map_or(bytes.len(), |pos| scheme_end + pos);
    let host_start = bytes[scheme_end..authority_end]
        .iter()
        .rposition(|&b| b == b'@')
        .map_or(scheme_end, |pos| scheme_end + pos + 1);

    let mut host_end = bytes.len();
    for i in host_start..bytes.len() {
        let b = bytes[i];
        if b == b'/' || b == b'\\' || b == b'?' || b == b'#' || b == b':' {
            host_end = i;
            break;
        }
    }

    Some((host_start, host_end))
}

/// Fast host extraction without allocations.
/// Returns a slice into the original URL, without port.
#[inline]
pub fn extract_host(url: &str) -> Option<&str> {
    let (host_start, host_end) = get_host_position(url)?;
    Some(&url[host_start..host_end])
}

/// Hostname of a service base URL (e.g. the keyserver).
///
/// Returns an empty string when the URL has no authority; an empty host is
/// later discarded by domain reduction.
pub fn hostname_of(base_url: &str) -> &str {
    extract_host(base_url.trim()).unwrap_or("")
}

/// Extract the path portion of a URL (without query and fragment).
#[inline]
pub fn extract_path(url: &str) -> &str {
    let (_, host_end) = match get_host_position(url) {
        Some(pos) => pos,
        None => return "/",
    };
    let rest = &url[host_end..];
    let path_start = match rest.find('/') {
        Some(pos) if !rest[..pos].contains(['?', '#']) => pos,
        _ => return "/",
    };
    let path = &rest[path_start..];
    match path.find(['?', '#']) {
        Some(end) => &path[..end],
        None => path,
    }
}

// =============================================================================
// Match Patterns
// =============================================================================

/// Scheme part of a match pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
enum SchemePattern {
    /// `*` - http, https, ws, wss
    Web,
    Exact(String),
}

/// Host part of a match pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
enum HostPattern {
    /// `*`
    Any,
    /// `*.example.com` - the domain itself and any subdomain
    Subdomains(String),
    Exact(String),
}

/// A parsed WebExtension match pattern such as `*://*.example.com/*`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlPattern {
    scheme: SchemePattern,
    host: HostPattern,
    path: String,
}

impl UrlPattern {
    /// Parse a match pattern. Returns `None` for malformed patterns.
    pub fn parse(pattern: &str) -> Option<Self> {
        let scheme_end = get_scheme_end(pattern)?;
        let scheme = &pattern[..scheme_end - 3];
        let rest = &pattern[scheme_end..];
        let slash = rest.find('/')?;
        let (host, path) = rest.split_at(slash);

        let scheme = match scheme {
            "*" => SchemePattern::Web,
            s if !s.is_empty() && !s.contains('*') => SchemePattern::Exact(s.to_ascii_lowercase()),
            _ => return None,
        };

        let host = if host == "*" {
            HostPattern::Any
        } else if let Some(domain) = host.strip_prefix("*.") {
            if domain.is_empty() || domain.contains('*') {
                return None;
            }
            HostPattern::Subdomains(domain.to_ascii_lowercase())
        } else if host.is_empty() || host.contains('*') {
            return None;
        } else {
            HostPattern::Exact(host.to_ascii_lowercase())
        };

        Some(Self { scheme, host, path: path.to_string() })
    }

    /// Does `url` match this pattern?
    pub fn matches(&self, url: &str) -> bool {
        let scheme_end = match get_scheme_end(url) {
            Some(pos) => pos,
            None => return false,
        };
        let scheme = url[..scheme_end - 3].to_ascii_lowercase();
        let scheme_ok = match &self.scheme {
            SchemePattern::Web => matches!(scheme.as_str(), "http" | "https" | "ws" | "wss"),
            SchemePattern::Exact(s) => *s == scheme,
        };
        if !scheme_ok {
            return false;
        }

        let host = match extract_host(url) {
            Some(h) => h.to_ascii_lowercase(),
            None => return false,
        };
        let host_ok = match &self.host {
            HostPattern::Any => true,
            HostPattern::Exact(h) => *h == host,
            HostPattern::Subdomains(domain) => {
                host == *domain
                    || (host.len() > domain.len()
                        && host.ends_with(domain.as_str())
                        && host.as_bytes()[host.len() - domain.len() - 1] == b'.')
            }
        };

        host_ok && glob_match(&self.path, extract_path(url))
    }
}

/// Does any of the given match patterns match `url`?
pub fn matches_any(patterns: &[String], url: &str) -> bool {
    patterns
        .iter()
        .filter_map(|p| UrlPattern::parse(p))
        .any(|p| p.matches(url))
}

/// Glob match where `*` matches any run of characters.
fn glob_match(pattern: &str, text: &str) -> bool {
    let p = pattern.as_bytes();
    let t = text.as_bytes();
    let (mut pi, mut ti) = (0usize, 0usize);
    let mut star: Option<(usize, usize)> = None;

    while ti < t.len() {
        if pi < p.len() && p[pi] == b'*' {
            star = Some((pi, ti));
            pi += 1;
        } else if pi < p.len() && p[pi] == t[ti] {
            pi += 1;
            ti += 1;
        } else if let Some((sp, st)) = star {
            pi = sp + 1;
            ti = st + 1;
            star = Some((sp, st + 1));
        } else {
            return false;
        }
    }

    while pi < p.len() && p[pi] == b'*' {
        pi += 1;
    }
    pi == p.len()
}

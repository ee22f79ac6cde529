//! Injection configuration

use serde::{Deserialize, Serialize};

use crate::types::WatchEntry;
use crate::url::hostname_of;

pub const DEFAULT_CONTENT_SCRIPT: &str = "content-scripts/cs-main.js";
pub const DEFAULT_STYLESHEET: &str = "content-scripts/framestyles.css";
pub const DEFAULT_KEYSERVER_BASE_URL: &str = "https://keys.openpgp.org";

/// Error type for configuration and watchlist loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration JSON: {0}")]
    InvalidConfig(#[source] serde_json::Error),
    #[error("Invalid watchlist JSON: {0}")]
    InvalidWatchlist(#[source] serde_json::Error),
}

/// Paths of the bundled assets and the service endpoints the injector needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InjectionConfig {
    /// Extension-relative path of the content script
    pub content_script: String,
    /// Extension-relative path of the frame stylesheet
    pub stylesheet: String,
    /// HKP keyserver base URL; its host is always watched
    pub keyserver_base_url: String,
}

impl Default for InjectionConfig {
    fn default() -> Self {
        Self {
            content_script: DEFAULT_CONTENT_SCRIPT.to_string(),
            stylesheet: DEFAULT_STYLESHEET.to_string(),
            keyserver_base_url: DEFAULT_KEYSERVER_BASE_URL.to_string(),
        }
    }
}

impl InjectionConfig {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(text).map_err(ConfigError::InvalidConfig)
    }

    /// Hostname of the keyserver, empty when the base URL is unusable.
    pub fn keyserver_host(&self) -> &str {
        hostname_of(&self.keyserver_base_url)
    }
}

/// Parse a watchlist as stored by the extension.
pub fn parse_watchlist(text: &str) -> Result<Vec<WatchEntry>, ConfigError> {
    serde_json::from_str(text).map_err(ConfigError::InvalidWatchlist)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_missing_fields() {
        let config = InjectionConfig::from_json(r#"{"keyserverBaseUrl": "https://keys.example.com"}"#).unwrap();
        assert_eq!(config.content_script, DEFAULT_CONTENT_SCRIPT);
        assert_eq!(config.stylesheet, DEFAULT_STYLESHEET);
        assert_eq!(config.keyserver_host(), "keys.example.com");
    }

    #[test]
    fn test_unusable_keyserver_url() {
        let config = InjectionConfig {
            keyserver_base_url: String::new(),
            ..InjectionConfig::default()
        };
        assert_eq!(config.keyserver_host(), "");
    }

    #[test]
    fn test_parse_watchlist() {
        let watchlist = parse_watchlist(
            r#"[{"active": true, "frames": [{"frame": "mail.example.com", "scan": true}]}]"#,
        )
        .unwrap();
        assert_eq!(watchlist.len(), 1);
        assert_eq!(watchlist[0].frames[0].frame, "mail.example.com");
    }

    #[test]
    fn test_invalid_watchlist() {
        let err = parse_watchlist("{").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidWatchlist(_)));
    }
}

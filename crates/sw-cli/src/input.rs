use std::fs;
use std::path::Path;

use sw_core::config::{parse_watchlist, InjectionConfig};
use sw_core::hosts::HostSet;
use sw_core::patterns::CompiledPatterns;
use sw_core::types::WatchEntry;

/// Configuration from an optional JSON file, with the keyserver overridable.
pub fn load_config(path: Option<&str>, keyserver: Option<&str>) -> Result<InjectionConfig, String> {
    let mut config = match path {
        Some(path) => {
            let text = read_text(Path::new(path))?;
            InjectionConfig::from_json(&text).map_err(|e| format!("'{}': {}", path, e))?
        }
        None => InjectionConfig::default(),
    };
    if let Some(keyserver) = keyserver {
        config.keyserver_base_url = keyserver.to_string();
    }
    Ok(config)
}

/// Watchlist from an optional JSON file; no file means an empty watchlist.
pub fn load_watchlist(path: Option<&str>) -> Result<Vec<WatchEntry>, String> {
    match path {
        Some(path) => {
            let text = read_text(Path::new(path))?;
            parse_watchlist(&text).map_err(|e| format!("'{}': {}", path, e))
        }
        None => Ok(Vec::new()),
    }
}

pub fn compile(watchlist: &[WatchEntry], config: &InjectionConfig) -> CompiledPatterns {
    let host_set = HostSet::from_watchlist(watchlist, config.keyserver_host());
    CompiledPatterns::compile(&host_set)
}

pub fn read_text(path: &Path) -> Result<String, String> {
    fs::read_to_string(path).map_err(|e| format!("Failed to read '{}': {}", path.display(), e))
}

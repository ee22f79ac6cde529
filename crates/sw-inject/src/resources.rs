//! Write-once cache for the content script and the frame stylesheet
//!
//! Both assets are loaded at most once per process, even when initialization
//! runs are interleaved: a second caller waits for the load in flight instead
//! of starting its own. The stylesheet's root-relative `url('/...')`
//! references are rewritten to absolute extension URLs before it is cached.

use log::info;
use sw_core::config::InjectionConfig;
use tokio::sync::OnceCell;

use crate::error::InjectError;
use crate::host::Browser;

/// Rewrite every `url('/` in `css` to `url('<base_url>`.
pub fn rewrite_root_urls(css: &str, base_url: &str) -> String {
    css.replace("url('/", &format!("url('{}", base_url))
}

/// Lazily populated content script and stylesheet.
#[derive(Debug, Default)]
pub struct ResourceCache {
    script: OnceCell<String>,
    stylesheet: OnceCell<String>,
}

impl ResourceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load whatever is not cached yet. Loading errors are fatal and leave
    /// the failed asset uncached.
    pub async fn ensure_loaded<B: Browser + ?Sized>(
        &self,
        browser: &B,
        config: &InjectionConfig,
    ) -> Result<(), InjectError> {
        self.script
            .get_or_try_init(|| async {
                let source = load(browser, &config.content_script).await?;
                info!("Loaded content script '{}' ({} bytes)", config.content_script, source.len());
                Ok::<_, InjectError>(source)
            })
            .await?;

        self.stylesheet
            .get_or_try_init(|| async {
                let css = load(browser, &config.stylesheet).await?;
                let css = rewrite_root_urls(&css, &browser.extension_url(""));
                info!("Loaded stylesheet '{}' ({} bytes)", config.stylesheet, css.len());
                Ok::<_, InjectError>(css)
            })
            .await?;

        Ok(())
    }

    pub fn is_loaded(&self) -> bool {
        self.script.initialized() && self.stylesheet.initialized()
    }

    /// Content script source, once loaded.
    pub fn script(&self) -> Option<&str> {
        self.script.get().map(String::as_str)
    }

    /// Rewritten stylesheet text, once loaded.
    pub fn stylesheet(&self) -> Option<&str> {
        self.stylesheet.get().map(String::as_str)
    }
}

async fn load<B: Browser + ?Sized>(browser: &B, path: &str) -> Result<String, InjectError> {
    browser
        .load_asset(path)
        .await
        .map_err(|source| InjectError::Resource { path: path.to_string(), source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::HostError;
    use crate::memory::MemoryBrowser;

    fn browser() -> MemoryBrowser {
        MemoryBrowser::new("chrome-extension://abc/")
            .with_asset("content-scripts/cs-main.js", "main();")
            .with_asset(
                "content-scripts/framestyles.css",
                ".icon { background: url('/img/lock.svg'); } .x { background: url(\"/keep.png\"); }",
            )
    }

    #[test]
    fn test_rewrite_root_urls() {
        assert_eq!(
            rewrite_root_urls("a{b:url('/x.png')} c{d:url('/y/z.svg')}", "ext://id/"),
            "a{b:url('ext://id/x.png')} c{d:url('ext://id/y/z.svg')}"
        );
        assert_eq!(rewrite_root_urls("a{b:url('rel.png')}", "ext://id/"), "a{b:url('rel.png')}");
    }

    #[tokio::test]
    async fn test_loads_and_rewrites_once() {
        let browser = browser();
        let cache = ResourceCache::new();
        let config = InjectionConfig::default();

        cache.ensure_loaded(&browser, &config).await.unwrap();
        assert!(cache.is_loaded());
        assert_eq!(cache.script(), Some("main();"));
        let css = cache.stylesheet().unwrap().to_string();
        assert!(css.contains("url('chrome-extension://abc/img/lock.svg')"));
        assert!(css.contains("url(\"/keep.png\")"));

        cache.ensure_loaded(&browser, &config).await.unwrap();
        assert_eq!(browser.asset_loads().len(), 2);
        assert_eq!(cache.stylesheet(), Some(css.as_str()));
    }

    #[tokio::test]
    async fn test_interleaved_loads_fetch_once() {
        let browser = browser();
        browser.yield_on_load(true);
        let cache = ResourceCache::new();
        let config = InjectionConfig::default();

        let (first, second) = futures::join!(
            cache.ensure_loaded(&browser, &config),
            cache.ensure_loaded(&browser, &config)
        );
        first.unwrap();
        second.unwrap();

        assert_eq!(
            browser.asset_loads(),
            vec!["content-scripts/cs-main.js", "content-scripts/framestyles.css"]
        );
        assert!(cache.is_loaded());
    }

    #[tokio::test]
    async fn test_failed_load_is_retried() {
        let browser = MemoryBrowser::new("ext://id/");
        let cache = ResourceCache::new();
        let config = InjectionConfig::default();

        assert!(cache.ensure_loaded(&browser, &config).await.is_err());

        browser.add_asset("content-scripts/cs-main.js", "main();");
        browser.add_asset("content-scripts/framestyles.css", "body{}");
        cache.ensure_loaded(&browser, &config).await.unwrap();
        assert_eq!(cache.script(), Some("main();"));
        assert_eq!(browser.asset_loads().len(), 3);
    }

    #[tokio::test]
    async fn test_missing_script_is_fatal() {
        let browser = MemoryBrowser::new("ext://id/");
        let cache = ResourceCache::new();

        let err = cache.ensure_loaded(&browser, &InjectionConfig::default()).await.unwrap_err();
        match err {
            InjectError::Resource { path, source } => {
                assert_eq!(path, "content-scripts/cs-main.js");
                assert_eq!(source, HostError::AssetNotFound(path.clone()));
            }
        }
        assert!(!cache.is_loaded());
        // The stylesheet is not attempted after the script failed.
        assert_eq!(browser.asset_loads(), vec!["content-scripts/cs-main.js"]);
    }
}

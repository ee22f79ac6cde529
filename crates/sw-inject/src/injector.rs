//! Injection into already open pages
//!
//! Every open page matching the URL patterns receives the bootstrap script
//! and the stylesheet in all of its frames. Pages are handled concurrently
//! and independently; one page failing does not affect the others.

use futures::future::join_all;
use log::{debug, info, warn};
use sw_core::types::{FrameScope, Tab};

use crate::host::{Browser, HostError, ScriptSource};

/// Result of injecting into one open page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabOutcome {
    pub tab_id: i32,
    pub script: Result<(), HostError>,
    pub stylesheet: Result<(), HostError>,
}

impl TabOutcome {
    pub fn is_ok(&self) -> bool {
        self.script.is_ok() && self.stylesheet.is_ok()
    }
}

/// Per-page results of one `inject_open_tabs` run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InjectionReport {
    pub tabs: Vec<TabOutcome>,
}

impl InjectionReport {
    pub fn injected(&self) -> usize {
        self.tabs.iter().filter(|t| t.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.tabs.len() - self.injected()
    }
}

/// Inject `script` and `stylesheet` into every open page matching any of
/// `url_patterns`. Returns once all pages have settled.
pub async fn inject_open_tabs<B: Browser + ?Sized>(
    browser: &B,
    url_patterns: &[String],
    script: &ScriptSource,
    stylesheet: &str,
) -> InjectionReport {
    if url_patterns.is_empty() {
        return InjectionReport::default();
    }

    let tabs = match browser.query_tabs(url_patterns).await {
        Ok(tabs) => tabs,
        Err(e) => {
            warn!("Failed to enumerate open tabs: {}", e);
            return InjectionReport::default();
        }
    };

    let outcomes = join_all(tabs.iter().map(|tab| inject_tab(browser, tab, script, stylesheet))).await;
    let report = InjectionReport { tabs: outcomes };

    info!(
        "Injected into {} open tabs ({} failed)",
        report.injected(),
        report.failed()
    );
    report
}

async fn inject_tab<B: Browser + ?Sized>(
    browser: &B,
    tab: &Tab,
    script: &ScriptSource,
    stylesheet: &str,
) -> TabOutcome {
    let (script_result, css_result) = futures::join!(
        browser.execute_script(tab.id, script, FrameScope::AllFrames),
        browser.insert_css(tab.id, stylesheet, FrameScope::AllFrames)
    );

    if let Err(e) = &script_result {
        debug!("Script injection into tab {} ({}) failed: {}", tab.id, tab.url, e);
    }
    if let Err(e) = &css_result {
        debug!("Stylesheet injection into tab {} ({}) failed: {}", tab.id, tab.url, e);
    }

    TabOutcome {
        tab_id: tab.id,
        script: script_result,
        stylesheet: css_result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{InjectionKind, MemoryBrowser};

    fn patterns() -> Vec<String> {
        vec!["*://*.example.com/*".to_string()]
    }

    #[tokio::test]
    async fn test_empty_patterns_is_noop() {
        let browser = MemoryBrowser::new("ext://id/");
        browser.open_tab("https://example.com/");

        let report = inject_open_tabs(&browser, &[], &ScriptSource::Code("boot".into()), "css").await;
        assert!(report.tabs.is_empty());
        assert_eq!(browser.tab_queries(), 0);
        assert!(browser.injections().is_empty());
    }

    #[tokio::test]
    async fn test_injects_matching_tabs_in_all_frames() {
        let browser = MemoryBrowser::new("ext://id/");
        let mail = browser.open_tab("https://mail.example.com/");
        let other = browser.open_tab("https://example.org/");

        let script = ScriptSource::Code("boot".into());
        let report = inject_open_tabs(&browser, &patterns(), &script, "css").await;

        assert_eq!(report.injected(), 1);
        assert!(browser.injections_for(other).is_empty());

        let injected = browser.injections_for(mail);
        assert_eq!(injected.len(), 2);
        assert!(injected.iter().all(|i| i.scope == FrameScope::AllFrames));
        assert!(injected.iter().any(|i| i.kind == InjectionKind::Script(script.clone())));
        assert!(injected.iter().any(|i| i.kind == InjectionKind::Stylesheet("css".into())));
    }

    #[tokio::test]
    async fn test_failed_tab_does_not_block_others() {
        let browser = MemoryBrowser::new("ext://id/");
        let broken = browser.open_tab("https://a.example.com/");
        let fine = browser.open_tab("https://b.example.com/");
        browser.fail_tab(broken);

        let report = inject_open_tabs(&browser, &patterns(), &ScriptSource::Code("boot".into()), "css").await;

        assert_eq!(report.tabs.len(), 2);
        assert_eq!(report.injected(), 1);
        assert_eq!(report.failed(), 1);
        let failed = report.tabs.iter().find(|t| t.tab_id == broken).unwrap();
        assert_eq!(failed.script, Err(HostError::PermissionDenied(broken)));
        assert_eq!(browser.injections_for(fine).len(), 2);
    }
}

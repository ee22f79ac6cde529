use std::path::Path;
use std::rc::Rc;

use sw_core::types::{LoadCompletedEvent, RequestType};
use sw_inject::{InjectionContext, MemoryBrowser};

use crate::input::{load_config, load_watchlist, read_text};

pub struct SimulateOptions {
    pub watchlist: Option<String>,
    pub config: Option<String>,
    pub keyserver: Option<String>,
    pub assets: String,
    pub base_url: String,
    pub tabs: Vec<String>,
    pub events: Vec<String>,
}

/// Run the initialization sequence against an in-memory browser and report
/// which pages would receive code.
pub fn run_simulate(opts: SimulateOptions) -> Result<(), String> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("Failed to start tokio runtime: {}", e))?;
    runtime.block_on(run_simulate_async(opts))
}

async fn run_simulate_async(opts: SimulateOptions) -> Result<(), String> {
    let config = load_config(opts.config.as_deref(), opts.keyserver.as_deref())?;
    let watchlist = load_watchlist(opts.watchlist.as_deref())?;

    let browser = Rc::new(MemoryBrowser::new(&opts.base_url));
    for asset in [&config.content_script, &config.stylesheet] {
        let path = Path::new(&opts.assets).join(asset);
        // Missing assets are left out so the run reports the resource error.
        if let Ok(text) = read_text(&path) {
            browser.add_asset(asset, &text);
        }
    }

    let tab_ids: Vec<i32> = opts.tabs.iter().map(|url| browser.open_tab(url)).collect();

    let context = InjectionContext::new(Rc::clone(&browser), config);
    let report = context
        .init_script_injection(&watchlist)
        .await
        .map_err(|e| e.to_string())?;

    let resources = context.resources();
    println!(
        "Resources:   {} ({} bytes), {} ({} bytes)",
        context.config().content_script,
        resources.script().map_or(0, str::len),
        context.config().stylesheet,
        resources.stylesheet().map_or(0, str::len)
    );
    println!("Hosts:");
    for host in &report.hosts {
        println!("  {}", host);
    }
    println!("Watching:    {}", if report.watching { "yes" } else { "no" });
    println!("Bootstrap:   {} bytes", context.bootstrap().len());
    println!();

    println!("Open tabs:");
    for (tab_id, url) in tab_ids.iter().zip(&opts.tabs) {
        let status = match report.tabs.tabs.iter().find(|t| t.tab_id == *tab_id) {
            Some(outcome) if outcome.is_ok() => "bootstrap injected".to_string(),
            Some(outcome) => format!(
                "failed ({})",
                outcome
                    .script
                    .as_ref()
                    .err()
                    .or(outcome.stylesheet.as_ref().err())
                    .map(|e| e.to_string())
                    .unwrap_or_default()
            ),
            None => "skipped".to_string(),
        };
        println!("  [{}] {} - {}", tab_id, url, status);
    }

    if !opts.events.is_empty() {
        println!();
        println!("Navigations:");
    }
    for url in &opts.events {
        let tab_id = browser.open_tab(url);
        let event = LoadCompletedEvent {
            url: url.clone(),
            tab_id,
            frame_id: 0,
            request_type: RequestType::MAIN_FRAME,
        };
        browser.dispatch_completed(event).await;
        let injected = !browser.injections_for(tab_id).is_empty();
        println!(
            "  [{}] {} - {}",
            tab_id,
            url,
            if injected { "content script injected" } else { "skipped" }
        );
    }

    Ok(())
}

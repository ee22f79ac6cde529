//! ScanWatch CLI
//!
//! CLI tool for compiling watchlists, inspecting the generated bootstrap and
//! dry-running the injection sequence.

mod input;
mod simulate;

use clap::{Args, Parser, Subcommand};

use sw_core::bootstrap::build_bootstrap;
use sw_core::url::{extract_host, matches_any};

use crate::input::{compile, load_config, load_watchlist};
use crate::simulate::{run_simulate, SimulateOptions};

#[derive(Parser)]
#[command(name = "sw-cli")]
#[command(about = "ScanWatch watchlist compiler and tools")]
struct Cli {
    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct WatchInput {
    /// Watchlist JSON file
    #[arg(short, long)]
    watchlist: Option<String>,

    /// Injection config JSON file
    #[arg(short, long)]
    config: Option<String>,

    /// Keyserver base URL (overrides the config)
    #[arg(short, long)]
    keyserver: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a watchlist into host patterns, URL patterns and regexes
    Compile {
        #[command(flatten)]
        input: WatchInput,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Print the bootstrap script for a watchlist
    Bootstrap {
        #[command(flatten)]
        input: WatchInput,
    },

    /// Check whether a URL would receive the content script
    Check {
        #[command(flatten)]
        input: WatchInput,

        /// URL to check
        #[arg(short, long)]
        url: String,
    },

    /// Dry-run the injection sequence against in-memory tabs
    Simulate {
        #[command(flatten)]
        input: WatchInput,

        /// Directory holding the extension assets
        #[arg(short, long)]
        assets: String,

        /// Extension base URL used for stylesheet rewriting
        #[arg(long, default_value = "chrome-extension://scanwatch/")]
        base_url: String,

        /// URL of an already open tab (repeatable)
        #[arg(long = "tab")]
        tabs: Vec<String>,

        /// URL of a page load completing after initialization (repeatable)
        #[arg(long = "event")]
        events: Vec<String>,
    },
}

fn main() {
    let cli = Cli::parse();
    env_logger::Builder::new()
        .filter_level(log_level(cli.verbose))
        .parse_default_env()
        .format_timestamp(None)
        .init();

    let result = match cli.command {
        Commands::Compile { input, json } => cmd_compile(&input, json),
        Commands::Bootstrap { input } => cmd_bootstrap(&input),
        Commands::Check { input, url } => cmd_check(&input, &url),
        Commands::Simulate {
            input,
            assets,
            base_url,
            tabs,
            events,
        } => run_simulate(SimulateOptions {
            watchlist: input.watchlist,
            config: input.config,
            keyserver: input.keyserver,
            assets,
            base_url,
            tabs,
            events,
        }),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

/// `RUST_LOG` still overrides this level.
fn log_level(verbose: bool) -> log::LevelFilter {
    if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Warn
    }
}

fn cmd_compile(input: &WatchInput, json: bool) -> Result<(), String> {
    let config = load_config(input.config.as_deref(), input.keyserver.as_deref())?;
    let watchlist = load_watchlist(input.watchlist.as_deref())?;
    let patterns = compile(&watchlist, &config);

    if json {
        let value = serde_json::json!({
            "hosts": patterns.hosts(),
            "urlPatterns": patterns.url_patterns(),
            "regexSources": patterns.regex_sources(),
        });
        let text = serde_json::to_string_pretty(&value)
            .map_err(|e| format!("Failed to serialize JSON: {}", e))?;
        println!("{}", text);
        return Ok(());
    }

    println!("Compiled {} watchlist entries", watchlist.len());
    println!("  Keyserver:   {}", config.keyserver_host());
    println!("  Hosts:       {}", patterns.len());
    for (pattern, regex) in patterns.url_patterns().iter().zip(patterns.regex_sources()) {
        println!("    {:<40} {}", pattern, regex);
    }

    Ok(())
}

fn cmd_bootstrap(input: &WatchInput) -> Result<(), String> {
    let config = load_config(input.config.as_deref(), input.keyserver.as_deref())?;
    let watchlist = load_watchlist(input.watchlist.as_deref())?;
    let patterns = compile(&watchlist, &config);

    print!("{}", build_bootstrap(&patterns.regex_sources()));
    Ok(())
}

fn cmd_check(input: &WatchInput, url: &str) -> Result<(), String> {
    let config = load_config(input.config.as_deref(), input.keyserver.as_deref())?;
    let watchlist = load_watchlist(input.watchlist.as_deref())?;
    let patterns = compile(&watchlist, &config);

    let host = extract_host(url).ok_or_else(|| format!("No host in '{}'", url))?;
    let filtered = matches_any(patterns.url_patterns(), url);
    let verified = patterns.matches_host(host);

    println!("URL:         {}", url);
    println!("  Host:        {}", host);
    println!("  URL filter:  {}", if filtered { "match" } else { "no match" });
    println!("  Host regex:  {}", if verified { "match" } else { "no match" });
    println!("  Decision:    {}", if filtered && verified { "inject" } else { "skip" });

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbose_flag_selects_log_level() {
        assert_eq!(log_level(false), log::LevelFilter::Warn);
        assert_eq!(log_level(true), log::LevelFilter::Debug);

        let cli = Cli::try_parse_from(["sw-cli", "check", "--url", "https://example.com/", "-v"]).unwrap();
        assert!(cli.verbose);
    }
}

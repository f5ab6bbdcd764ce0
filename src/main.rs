// src/main.rs
// =============================================================================
// This is the entry point of our CLI application.
//
// What happens here:
// 1. Parse command-line arguments using clap
// 2. Set up logging (stderr, controlled by -v or RUST_LOG)
// 3. Crawl the site, stopping early on Ctrl+C
// 4. Write the page text (or JSON) to stdout or a file
// 5. Print a summary and exit with a proper code
//    (0 = pages crawled, 1 = nothing crawled or interrupted, 2 = error)
//
// stdout only ever receives the crawl output, so it can be piped into
// other tools. Everything meant for humans goes to stderr.
// =============================================================================

mod cli; // src/cli.rs - command-line parsing

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use cli::Cli;
use web_spider::{crawl_website_with, ClassifierConfig, CrawlResult, HttpFetcher, StopReason};

#[tokio::main]
async fn main() {
    let exit_code = match run().await {
        Ok(code) => code,
        Err(e) => {
            // {:#} prints the whole context chain on one line
            eprintln!("Error: {:#}", e);
            2
        }
    };

    std::process::exit(exit_code);
}

// Returns:
//   Ok(0) = at least one page was crawled
//   Ok(1) = no page could be crawled, or the crawl was interrupted
//   Err   = bad input or an I/O problem (exit code 2)
async fn run() -> Result<i32> {
    let cli = Cli::parse();
    init_logging(&cli);

    let classifier = match &cli.classifier_config {
        Some(path) => ClassifierConfig::from_json_file(path)?,
        None => ClassifierConfig::default(),
    };
    let config = cli.spider_config(classifier);

    let cancel = CancellationToken::new();
    spawn_ctrl_c_handler(cancel.clone());

    eprintln!("🕷️  Crawling: {}", cli.url);
    eprintln!(
        "📊 Max pages: {}, max depth: {}, concurrency: {}",
        config.max_pages, config.max_depth, config.concurrency
    );

    let fetcher = Arc::new(HttpFetcher::new().context("failed to set up the HTTP client")?);
    let result = crawl_website_with(&cli.url, config, fetcher, cancel).await?;

    print_summary(&result);

    let output = if cli.json {
        serde_json::to_string_pretty(&result)?
    } else {
        result.content.trim_start().to_string()
    };
    write_output(cli.output.as_deref(), &output)?;

    print_details(&result);

    if result.stop_reason == StopReason::Cancelled || result.successful_pages == 0 {
        Ok(1)
    } else {
        Ok(0)
    }
}

// Logs go to stderr. RUST_LOG wins over the -v flags when it is set.
fn init_logging(cli: &Cli) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_filter()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

// The first Ctrl+C asks the crawl to stop; pages already being fetched
// still finish so the partial result can be written out
fn spawn_ctrl_c_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, finishing pages in progress");
            cancel.cancel();
        }
    });
}

fn write_output(path: Option<&Path>, output: &str) -> Result<()> {
    match path {
        Some(path) => {
            std::fs::write(path, output)
                .with_context(|| format!("failed to write output to {}", path.display()))?;
            eprintln!("💾 Output written to {}", path.display());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{}", output).context("failed to write to stdout")?;
        }
    }
    Ok(())
}

fn print_summary(result: &CrawlResult) {
    eprintln!();
    eprintln!("📊 Summary:");
    eprintln!("   ⏱️  Duration: {:.2?}", result.processing_time);
    eprintln!("   ✅ Crawled: {}", result.successful_pages);
    eprintln!("   ❌ Failed: {}", result.failed_pages.len());
    eprintln!("   📎 Files found: {}", result.detected_file_urls.len());
    if result.dropped_links > 0 {
        eprintln!("   🗑️  Links dropped (queue full): {}", result.dropped_links);
    }
    eprintln!("   🏁 Stopped: {}", describe_stop(result.stop_reason));
    eprintln!();
}

fn print_details(result: &CrawlResult) {
    if !result.failed_pages.is_empty() {
        eprintln!("\n❌ Failed pages:");
        for (url, reason) in &result.failed_pages {
            eprintln!("   {} ({})", url, reason);
        }
    }

    if !result.detected_file_urls.is_empty() {
        eprintln!("\n📎 Detected files (not crawled):");
        for url in &result.detected_file_urls {
            eprintln!("   {}", url);
        }
    }
}

fn describe_stop(reason: StopReason) -> &'static str {
    match reason {
        StopReason::FrontierExhausted => "no more pages to crawl",
        StopReason::PageLimit => "reached the page limit",
        StopReason::Cancelled => "interrupted",
    }
}

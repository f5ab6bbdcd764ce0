// src/crawl/mod.rs
// =============================================================================
// This module is the crawl engine.
//
// Features:
// - Concurrent crawling from a seed URL with a bounded worker pool
// - Same-site restriction (optionally including subdomains)
// - Depth and page-count limits that are never exceeded
// - Each URL visited at most once
// - Detection of file links (pdf, images, downloads) that are reported
//   instead of crawled
// - Polite crawling with a per-worker delay before each request
//
// Submodules (leaves first):
// - links: link resolution, scoping and file detection
// - queue: the bounded frontier of pending jobs
// - session: admission control and the shared crawl result
// - completion: knowing when no more work can arrive
// - scheduler: the main loop and the worker tasks
// =============================================================================

mod completion;
mod links;
mod queue;
mod scheduler;
mod session;

use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;
use url::Url;

use crate::config::SpiderConfig;
use crate::error::SpiderError;
use crate::fetch::{Fetcher, HttpFetcher};

pub use completion::StopReason;
pub use links::{classify_links, ClassifiedLinks, CrawlScope};
pub use queue::CrawlJob;
pub use session::CrawlResult;

/// Crawls a website with the default HTTP fetcher.
///
/// Only an unusable seed URL (or an HTTP client that cannot be built) makes
/// this fail. Pages that cannot be fetched end up in
/// `CrawlResult::failed_pages`.
pub async fn crawl_website(seed_url: &str, config: SpiderConfig) -> Result<CrawlResult, SpiderError> {
    // Validate before building anything
    parse_seed(seed_url)?;

    let fetcher = Arc::new(HttpFetcher::new()?);
    crawl_website_with(seed_url, config, fetcher, CancellationToken::new()).await
}

/// Crawls a website with any fetcher, stopping early if `cancel` fires.
///
/// On cancellation no new pages are admitted, pages already being fetched
/// are allowed to finish and the partial result is returned.
pub async fn crawl_website_with(
    seed_url: &str,
    config: SpiderConfig,
    fetcher: Arc<dyn Fetcher>,
    cancel: CancellationToken,
) -> Result<CrawlResult, SpiderError> {
    let seed = parse_seed(seed_url)?;
    let config = config.normalized();

    let scope = CrawlScope::from_seed(&seed, config.crawl_subdomains).ok_or_else(|| {
        SpiderError::SeedInvalid {
            url: seed_url.to_string(),
            reason: "URL has no host".to_string(),
        }
    })?;

    info!(
        seed = %seed,
        max_pages = config.max_pages,
        max_depth = config.max_depth,
        concurrency = config.concurrency,
        crawl_subdomains = config.crawl_subdomains,
        "starting crawl"
    );

    let result = scheduler::run(seed, scope, config, fetcher, cancel).await;

    info!(
        total_pages = result.total_pages,
        successful_pages = result.successful_pages,
        failed_pages = result.failed_pages.len(),
        detected_files = result.detected_file_urls.len(),
        dropped_links = result.dropped_links,
        stop_reason = ?result.stop_reason,
        elapsed_ms = result.processing_time.as_millis() as u64,
        "crawl finished"
    );

    Ok(result)
}

// Parses and checks the seed. It must be an http(s) URL with a host.
fn parse_seed(seed_url: &str) -> Result<Url, SpiderError> {
    let invalid = |reason: String| SpiderError::SeedInvalid {
        url: seed_url.to_string(),
        reason,
    };

    let mut seed = Url::parse(seed_url.trim()).map_err(|e| invalid(e.to_string()))?;

    if seed.scheme() != "http" && seed.scheme() != "https" {
        return Err(invalid(format!("unsupported scheme '{}'", seed.scheme())));
    }
    if seed.host_str().is_none() {
        return Err(invalid("URL has no host".to_string()));
    }

    // Discovered links are compared without fragments, so the seed is too
    seed.set_fragment(None);
    Ok(seed)
}

// src/lib.rs
// =============================================================================
// web-spider: crawl a site from a seed URL and collect the text of every page
// reachable within the configured depth, page and scope limits.
//
// Modules:
// - config: crawl and link classifier settings
// - crawl: the crawl engine (frontier, admission, workers, completion)
// - fetch: the Fetcher interface and the default HTTP/HTML implementation
// - error: error types
// =============================================================================

pub mod config;
pub mod crawl;
pub mod error;
pub mod fetch;

pub use config::{ClassifierConfig, OverflowPolicy, SpiderConfig};
pub use crawl::{crawl_website, crawl_website_with, CrawlResult, StopReason};
pub use error::{FetchError, SpiderError};
pub use fetch::{CleanupOptions, Fetcher, HttpFetcher, LinkRecord, PageContent};

// src/config.rs
// =============================================================================
// Settings for one crawl.
//
// SpiderConfig holds the limits the crawl engine enforces (pages, depth,
// concurrency, timeouts) and how the frontier behaves when it fills up.
// ClassifierConfig holds the lists used to tell downloadable files apart
// from crawlable pages. It can be loaded from JSON so the lists can be tuned
// per site without rebuilding.
// =============================================================================

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};

/// What the frontier does when a discovered link arrives and it is full
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Drop the link and count it in `CrawlResult::dropped_links`
    #[default]
    Drop,
    /// Make the producing worker wait until there is room
    Block,
}

/// Limits and behaviour for one crawl invocation.
///
/// The values are read once at crawl start and never change while the
/// crawl runs.
#[derive(Debug, Clone)]
pub struct SpiderConfig {
    /// Upper bound on admitted pages (successful or failed)
    pub max_pages: usize,
    /// The seed is depth 0; pages at `max_depth` are fetched but not expanded
    pub max_depth: usize,
    /// Treat `sub.example.com` and `example.com` as the same site
    pub crawl_subdomains: bool,
    /// Timeout for a single page fetch
    pub page_timeout: Duration,
    /// How many pages may be fetched at the same time
    pub concurrency: usize,
    /// Pause each worker takes before its fetch
    pub delay_between: Duration,
    /// How long the scheduler waits without events before re-checking
    /// whether the crawl has run out of work
    pub idle_timeout: Duration,
    /// Frontier size; `None` means twice `max_pages`
    pub frontier_capacity: Option<usize>,
    pub overflow_policy: OverflowPolicy,
    pub classifier: ClassifierConfig,
}

// Shortest idle window the scheduler will re-arm
pub const MIN_IDLE_TIMEOUT: Duration = Duration::from_millis(10);

impl Default for SpiderConfig {
    fn default() -> Self {
        Self {
            max_pages: 100,
            max_depth: 3,
            crawl_subdomains: true,
            page_timeout: Duration::from_secs(30),
            concurrency: 5,
            delay_between: Duration::from_secs(1),
            idle_timeout: Duration::from_secs(2),
            frontier_capacity: None,
            overflow_policy: OverflowPolicy::Drop,
            classifier: ClassifierConfig::default(),
        }
    }
}

impl SpiderConfig {
    // Applies the coercions the engine relies on:
    //   max_pages == 0         -> 1
    //   concurrency == 0       -> 1
    //   frontier_capacity == 0 -> 1
    //   idle_timeout < 10ms    -> 10ms (a zero window would spin the scheduler)
    pub fn normalized(mut self) -> Self {
        self.max_pages = self.max_pages.max(1);
        self.concurrency = self.concurrency.max(1);
        self.idle_timeout = self.idle_timeout.max(MIN_IDLE_TIMEOUT);
        self.frontier_capacity = self.frontier_capacity.map(|c| c.max(1));
        self
    }

    /// Capacity of the frontier channel after defaults are applied
    pub fn effective_frontier_capacity(&self) -> usize {
        self.frontier_capacity
            .unwrap_or_else(|| self.max_pages.saturating_mul(2))
            .max(1)
    }
}

/// Lists that decide whether an in-scope link is a file or a page.
///
/// All matching is done on the lowercased path and query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Path suffixes that mark a file, including the dot (".pdf")
    pub file_extensions: Vec<String>,
    /// Query parameters (name, value) that mark a direct download
    pub download_params: Vec<(String, String)>,
    /// Substrings of the path that mark a file resource
    pub path_markers: Vec<String>,
    /// Substrings of the raw query that mark a file resource
    pub query_markers: Vec<String>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        let extensions = [
            ".pdf", ".doc", ".docx", ".xls", ".xlsx", ".ppt", ".pptx", ".zip", ".rar", ".gz",
            ".tar", ".svg", ".png", ".jpg", ".jpeg", ".gif",
        ];

        Self {
            file_extensions: extensions.iter().map(|e| e.to_string()).collect(),
            download_params: vec![("download".to_string(), "1".to_string())],
            path_markers: vec!["/resource/".to_string()],
            query_markers: vec!["item=form".to_string(), "item=statute".to_string()],
        }
    }
}

impl ClassifierConfig {
    /// Reads a classifier config from a JSON file.
    ///
    /// Missing fields fall back to the defaults, so a file containing only
    /// `{"path_markers": []}` disables the path heuristic and keeps the rest.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read classifier config {}", path.display()))?;
        Self::from_json_str(&raw)
            .with_context(|| format!("invalid classifier config {}", path.display()))
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        let mut config: ClassifierConfig = serde_json::from_str(raw)?;
        for ext in &mut config.file_extensions {
            *ext = ext.to_lowercase();
        }
        for marker in config.path_markers.iter_mut().chain(config.query_markers.iter_mut()) {
            *marker = marker.to_lowercase();
        }
        Ok(config)
    }
}

// src/cli.rs
// =============================================================================
// This file defines our command-line interface using the `clap` crate.
//
// We use clap's "derive" API: the CLI is a plain struct and the attributes
// on each field describe the flag. Every flag can also come from a SPIDER_*
// environment variable, which is handy in CI jobs and containers.
//
// Example:
//   web-spider https://example.com --max-pages 50 --max-depth 2 -v
// =============================================================================

use clap::{ArgAction, Parser};
use std::path::PathBuf;
use std::time::Duration;

use web_spider::{ClassifierConfig, OverflowPolicy, SpiderConfig};

#[derive(Parser, Debug)]
#[command(
    name = "web-spider",
    version,
    about = "Crawl a website and collect the text of its pages",
    long_about = "web-spider starts from a seed URL, follows links that stay on the same site \
                  and collects the cleaned text of every page it reaches. Links to files \
                  (PDFs, images, downloads) are reported instead of crawled."
)]
pub struct Cli {
    /// Seed URL to start crawling from (e.g., https://example.com)
    #[arg(env = "SPIDER_URL")]
    pub url: String,

    /// Maximum number of pages to crawl, failed pages included
    #[arg(long, env = "SPIDER_MAX_PAGES", default_value_t = 100)]
    pub max_pages: usize,

    /// Maximum link depth (the seed page is depth 0)
    #[arg(long, env = "SPIDER_MAX_DEPTH", default_value_t = 3)]
    pub max_depth: usize,

    /// Timeout for each page request, in seconds
    #[arg(long, env = "SPIDER_TIMEOUT", default_value_t = 30)]
    pub timeout: u64,

    /// Number of pages fetched at the same time
    #[arg(long, env = "SPIDER_CONCURRENCY", default_value_t = 5)]
    pub concurrency: usize,

    /// Delay each worker waits before a request, in milliseconds
    #[arg(long, env = "SPIDER_DELAY_MS", default_value_t = 1000)]
    pub delay_ms: u64,

    /// How long the crawler waits without activity before checking whether
    /// it has run out of work, in milliseconds
    #[arg(long, env = "SPIDER_IDLE_TIMEOUT_MS", default_value_t = 2000)]
    pub idle_timeout_ms: u64,

    /// Size of the queue of pages waiting to be crawled (default: 2 x max-pages)
    #[arg(long, env = "SPIDER_QUEUE_CAPACITY")]
    pub queue_capacity: Option<usize>,

    /// Wait for room when the queue is full instead of dropping new links
    #[arg(long, env = "SPIDER_BLOCK_WHEN_FULL")]
    pub block_when_full: bool,

    /// Only crawl the exact host of the seed URL, not its subdomains
    #[arg(long, env = "SPIDER_NO_SUBDOMAINS")]
    pub no_subdomains: bool,

    /// JSON file with file-detection rules (extensions, markers)
    #[arg(long, env = "SPIDER_CLASSIFIER_CONFIG", value_name = "FILE")]
    pub classifier_config: Option<PathBuf>,

    /// Write the output to this file instead of stdout
    #[arg(short, long, env = "SPIDER_OUTPUT", value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output the full crawl result as JSON instead of the page text
    #[arg(long, env = "SPIDER_JSON")]
    pub json: bool,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    // Turns the flags into the settings the crawl engine understands
    pub fn spider_config(&self, classifier: ClassifierConfig) -> SpiderConfig {
        SpiderConfig {
            max_pages: self.max_pages,
            max_depth: self.max_depth,
            crawl_subdomains: !self.no_subdomains,
            page_timeout: Duration::from_secs(self.timeout),
            concurrency: self.concurrency,
            delay_between: Duration::from_millis(self.delay_ms),
            idle_timeout: Duration::from_millis(self.idle_timeout_ms),
            frontier_capacity: self.queue_capacity,
            overflow_policy: if self.block_when_full {
                OverflowPolicy::Block
            } else {
                OverflowPolicy::Drop
            },
            classifier,
        }
    }

    // Default log filter when RUST_LOG is not set
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. What does env = "SPIDER_MAX_PAGES" do?
//    - If --max-pages is not given, clap looks at that environment variable
//    - A flag on the command line always wins over the environment
//
// 2. Why Option<usize> for queue_capacity?
//    - None means "not given", so the crawl engine picks its own default
//    - A plain usize would force us to invent a magic value for "unset"
//
// 3. What is ArgAction::Count?
//    - It counts how many times a flag appears: -vvv gives verbose = 3
// -----------------------------------------------------------------------------

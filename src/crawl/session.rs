// src/crawl/session.rs
// =============================================================================
// The crawl session: all shared bookkeeping for one crawl, behind one lock.
//
// It owns:
// - the visited set (every URL ever admitted)
// - the page counter used for the max_pages limit
// - the CrawlResult that workers fill in as pages complete
//
// Admission control lives here too. Checking the limits, checking the
// visited set, marking the URL and bumping the counter happen in one
// critical section, so two workers can never both admit the same URL and
// the page counter can never pass max_pages.
//
// Critical sections only touch memory. Anything slow (cleaning page text,
// classifying links) is done by the caller before taking the lock.
// =============================================================================

use regex::Regex;
use serde::{Serialize, Serializer};
use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};
use std::time::{Duration, Instant};

use super::completion::StopReason;
use super::queue::CrawlJob;

/// Everything a crawl produced.
///
/// `crawled_urls` is in completion order, which varies between runs when
/// more than one worker is used.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CrawlResult {
    /// Text of every crawled page, each preceded by a `# URL: ...` heading
    pub content: String,
    pub crawled_urls: Vec<String>,
    /// In-scope links that point at files; reported, never fetched
    pub detected_file_urls: Vec<String>,
    /// Pages admitted, successful or not
    pub total_pages: usize,
    pub successful_pages: usize,
    /// URL -> reason for every page whose fetch failed
    pub failed_pages: BTreeMap<String, String>,
    #[serde(rename = "processing_time_ms", serialize_with = "as_millis")]
    pub processing_time: Duration,
    /// Links discarded because the frontier was full
    pub dropped_links: usize,
    pub stop_reason: StopReason,
}

fn as_millis<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    PageLimit,
    TooDeep,
    AlreadyVisited,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Accepted { limit_reached: bool },
    Rejected(RejectReason),
}

#[derive(Debug, Default)]
struct SessionState {
    visited: HashSet<String>,
    result: CrawlResult,
}

#[derive(Debug)]
pub struct CrawlSession {
    max_pages: usize,
    max_depth: usize,
    started: Instant,
    state: Mutex<SessionState>,
}

impl CrawlSession {
    pub fn new(max_pages: usize, max_depth: usize) -> Self {
        Self {
            max_pages,
            max_depth,
            started: Instant::now(),
            state: Mutex::new(SessionState::default()),
        }
    }

    // A worker that panicked while holding the lock leaves plain data behind;
    // keep going with it rather than failing the whole crawl
    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // Check limits, check visited, mark and count: all in one step
    pub fn admit(&self, job: &CrawlJob) -> Admission {
        let mut state = self.lock();

        if state.result.total_pages >= self.max_pages {
            return Admission::Rejected(RejectReason::PageLimit);
        }
        if job.depth > self.max_depth {
            return Admission::Rejected(RejectReason::TooDeep);
        }
        if !state.visited.insert(job.url.clone()) {
            return Admission::Rejected(RejectReason::AlreadyVisited);
        }

        state.result.total_pages += 1;
        Admission::Accepted {
            limit_reached: state.result.total_pages >= self.max_pages,
        }
    }

    pub fn total_pages(&self) -> usize {
        self.lock().result.total_pages
    }

    // Records a fetched page; markdown links are flattened outside the lock
    pub fn record_success(&self, url: &str, text: &str) {
        let section = format!("\n\n# URL: {}\n\n{}", url, strip_markdown_links(text));

        let mut state = self.lock();
        state.result.content.push_str(&section);
        state.result.crawled_urls.push(url.to_string());
        state.result.successful_pages += 1;
    }

    pub fn record_failure(&self, url: &str, reason: String) {
        self.lock().result.failed_pages.insert(url.to_string(), reason);
    }

    pub fn record_files<I>(&self, files: I)
    where
        I: IntoIterator<Item = String>,
    {
        let files: Vec<String> = files.into_iter().collect();
        if files.is_empty() {
            return;
        }
        self.lock().result.detected_file_urls.extend(files);
    }

    // Produces the final result once every worker has joined
    pub fn finalize(&self, dropped_links: usize, stop_reason: StopReason) -> CrawlResult {
        let mut result = std::mem::take(&mut self.lock().result);

        let mut seen = HashSet::new();
        result.detected_file_urls.retain(|url| seen.insert(url.clone()));

        result.processing_time = self.started.elapsed();
        result.dropped_links = dropped_links;
        result.stop_reason = stop_reason;
        result
    }
}

// "[Docs](https://x/docs)" -> "Docs"
fn strip_markdown_links(content: &str) -> String {
    static MARKDOWN_LINK: OnceLock<Regex> = OnceLock::new();
    let pattern = MARKDOWN_LINK
        .get_or_init(|| Regex::new(r"\[([^\]]*)\]\([^)]*\)").expect("static regex"));
    pattern.replace_all(content, "$1").into_owned()
}

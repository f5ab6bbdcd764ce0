// src/crawl/completion.rs
// =============================================================================
// Completion detection: knowing when a crawl is finished.
//
// This is harder than it sounds. Workers are also producers: a worker that
// is still fetching a page may push ten new jobs a moment after the queue
// looked empty. So "queue is empty" proves nothing on its own.
//
// We track every admitted job until its worker is completely done, link
// expansion included. When that in-flight count drops to zero AND the
// frontier is empty, nobody is left who could create more work.
//
// The crawl moves through three phases:
//   Running  -> jobs are admitted and workers spawned
//   Draining -> no more admissions; wait for in-flight workers
//   Done     -> every worker has joined; the result can be finalized
// =============================================================================

use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

// Why the scheduler stopped admitting new jobs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// No job in flight and nothing left in the frontier
    #[default]
    FrontierExhausted,
    /// `max_pages` pages were admitted
    PageLimit,
    /// The caller's cancellation token fired
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlPhase {
    Running,
    Draining(StopReason),
    Done(StopReason),
}

impl CrawlPhase {
    // Running -> Draining; a crawl only starts draining once
    pub fn begin_draining(&mut self, reason: StopReason) {
        if let CrawlPhase::Running = self {
            *self = CrawlPhase::Draining(reason);
        }
    }

    // Draining -> Done
    pub fn finish(&mut self) {
        if let CrawlPhase::Draining(reason) = *self {
            *self = CrawlPhase::Done(reason);
        }
    }

    pub fn stop_reason(&self) -> Option<StopReason> {
        match self {
            CrawlPhase::Running => None,
            CrawlPhase::Draining(reason) | CrawlPhase::Done(reason) => Some(*reason),
        }
    }
}

// Counts jobs that were admitted but whose worker has not finished yet
#[derive(Debug, Default)]
pub struct CompletionDetector {
    in_flight: AtomicUsize,
    idle: Notify,
}

impl CompletionDetector {
    pub fn new() -> Self {
        Self::default()
    }

    // Called by the scheduler right after a job passes admission. The job
    // counts as in flight until the returned guard is dropped, which also
    // happens if the worker panics.
    pub fn job_admitted(self: &Arc<Self>) -> InFlightGuard {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        InFlightGuard {
            detector: Arc::clone(self),
        }
    }

    // Runs when a worker is completely done, after its links were queued
    fn job_finished(&self) {
        let previous = self.in_flight.fetch_sub(1, Ordering::SeqCst);
        if previous == 1 {
            // notify_one stores a permit if the scheduler isn't waiting yet
            self.idle.notify_one();
        }
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    // Resolves after the in-flight count has reached zero at least once
    // since the last wakeup. Callers must re-check the state themselves.
    pub async fn wait_idle(&self) {
        self.idle.notified().await;
    }

    // Finished work can't produce more jobs once nothing is in flight and the
    // frontier is empty. Only the scheduler consumes the frontier, so this
    // can't race with a job being taken out between the two reads.
    pub fn is_exhausted(&self, pending_jobs: usize) -> bool {
        self.in_flight() == 0 && pending_jobs == 0
    }
}

pub struct InFlightGuard {
    detector: Arc<CompletionDetector>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.detector.job_finished();
    }
}

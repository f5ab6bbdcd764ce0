// src/crawl/queue.rs
// =============================================================================
// The frontier: a bounded queue of pages waiting to be crawled.
//
// How it works:
// - Workers push (url, depth) jobs for every crawlable link they discover
// - The scheduler is the only consumer; it pulls jobs one at a time and
//   passes them through admission control
// - The queue has a fixed capacity (twice max_pages unless configured)
//
// When the queue is full:
// - OverflowPolicy::Drop (default): the job is thrown away and counted, so
//   a page with thousands of links can never stall the crawl
// - OverflowPolicy::Block: the worker waits for room
//
// Once the scheduler stops admitting work it closes the queue. Pushes after
// that fail quietly, and blocked workers are released.
// =============================================================================

use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::debug;

use crate::config::OverflowPolicy;

// Represents a page waiting in the frontier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlJob {
    pub url: String,
    pub depth: usize, // How many link hops from the seed (seed = 0)
}

impl CrawlJob {
    pub fn new(url: impl Into<String>, depth: usize) -> Self {
        Self {
            url: url.into(),
            depth,
        }
    }
}

// What happened to a job offered to the frontier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Offer {
    Queued,
    Dropped,
    Closed,
}

// The producer side, shared by all workers
#[derive(Debug)]
pub struct Frontier {
    tx: mpsc::Sender<CrawlJob>,
    policy: OverflowPolicy,
    dropped: AtomicUsize,
}

// The consumer side, owned by the scheduler
#[derive(Debug)]
pub struct FrontierReceiver {
    rx: mpsc::Receiver<CrawlJob>,
}

impl Frontier {
    // Creates a frontier with room for `capacity` jobs (at least one)
    pub fn new(capacity: usize, policy: OverflowPolicy) -> (Self, FrontierReceiver) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let frontier = Self {
            tx,
            policy,
            dropped: AtomicUsize::new(0),
        };
        (frontier, FrontierReceiver { rx })
    }

    // Adds a job according to the overflow policy
    pub async fn offer(&self, job: CrawlJob) -> Offer {
        match self.policy {
            OverflowPolicy::Drop => self.try_offer(job),
            OverflowPolicy::Block => match self.tx.send(job).await {
                Ok(()) => Offer::Queued,
                Err(_) => Offer::Closed,
            },
        }
    }

    // Adds a job without waiting; a full queue drops it
    pub fn try_offer(&self, job: CrawlJob) -> Offer {
        match self.tx.try_send(job) {
            Ok(()) => Offer::Queued,
            Err(TrySendError::Full(job)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                debug!(url = %job.url, depth = job.depth, "frontier full, dropping link");
                Offer::Dropped
            }
            Err(TrySendError::Closed(_)) => Offer::Closed,
        }
    }

    // Number of jobs waiting to be picked up
    pub fn pending(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }

    pub fn capacity(&self) -> usize {
        self.tx.max_capacity()
    }

    // How many jobs were thrown away because the queue was full
    pub fn dropped(&self) -> usize {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl FrontierReceiver {
    // Waits for the next job. Never returns None while a Frontier exists.
    pub async fn next_job(&mut self) -> Option<CrawlJob> {
        self.rx.recv().await
    }

    // Stops accepting jobs; anything still queued is discarded
    pub fn close(&mut self) {
        self.rx.close();
        while self.rx.try_recv().is_ok() {}
    }
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why a bounded channel instead of a VecDeque?
//    - Many workers push at once while the scheduler pulls
//    - tokio's mpsc channel is safe to share between tasks without a lock
//    - The bound keeps memory in check on pages with huge link lists
//
// 2. try_send vs send:
//    - try_send returns immediately with Full if there is no room
//    - send().await parks the task until there is room (or the channel closes)
//
// 3. How does pending() work?
//    - capacity() is the number of free slots right now
//    - max_capacity() is the size the channel was created with
//    - The difference is the number of queued jobs
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_jobs_come_out_in_order() {
        let (frontier, mut rx) = Frontier::new(4, OverflowPolicy::Drop);
        frontier.try_offer(CrawlJob::new("https://a.test/1", 1));
        frontier.try_offer(CrawlJob::new("https://a.test/2", 1));

        assert_eq!(frontier.pending(), 2);
        assert_eq!(rx.next_job().await.unwrap().url, "https://a.test/1");
        assert_eq!(rx.next_job().await.unwrap().url, "https://a.test/2");
        assert_eq!(frontier.pending(), 0);
    }

    #[tokio::test]
    async fn test_full_queue_drops_and_counts() {
        let (frontier, _rx) = Frontier::new(2, OverflowPolicy::Drop);

        assert_eq!(frontier.offer(CrawlJob::new("https://a.test/1", 1)).await, Offer::Queued);
        assert_eq!(frontier.offer(CrawlJob::new("https://a.test/2", 1)).await, Offer::Queued);
        assert_eq!(frontier.offer(CrawlJob::new("https://a.test/3", 1)).await, Offer::Dropped);

        assert_eq!(frontier.dropped(), 1);
        assert_eq!(frontier.pending(), 2);
    }

    #[tokio::test]
    async fn test_closed_queue_rejects_without_counting_drops() {
        let (frontier, mut rx) = Frontier::new(2, OverflowPolicy::Drop);
        frontier.try_offer(CrawlJob::new("https://a.test/1", 1));
        rx.close();

        assert_eq!(frontier.try_offer(CrawlJob::new("https://a.test/2", 1)), Offer::Closed);
        assert_eq!(frontier.dropped(), 0);
    }

    #[tokio::test]
    async fn test_blocking_offer_is_released_by_close() {
        let (frontier, mut rx) = Frontier::new(1, OverflowPolicy::Block);
        let frontier = std::sync::Arc::new(frontier);
        frontier.try_offer(CrawlJob::new("https://a.test/1", 1));

        let producer = {
            let frontier = frontier.clone();
            tokio::spawn(async move { frontier.offer(CrawlJob::new("https://a.test/2", 1)).await })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!producer.is_finished());

        rx.close();
        let outcome = tokio::time::timeout(Duration::from_secs(1), producer)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(outcome, Offer::Closed);
    }

    #[test]
    fn test_zero_capacity_is_raised_to_one() {
        let (frontier, _rx) = Frontier::new(0, OverflowPolicy::Drop);
        assert_eq!(frontier.capacity(), 1);
    }
}

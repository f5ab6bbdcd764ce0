// src/crawl/scheduler.rs
// =============================================================================
// The scheduler loop and the worker tasks it spawns.
//
// The loop first reserves a worker slot (a semaphore permit), then pulls the
// next job from the frontier and runs it through admission control. Every
// admitted job becomes its own tokio task holding that permit, so at most
// `concurrency` pages are being processed at once. Under the Block policy a
// worker gives its permit back before pushing the links it discovered, since
// that push may wait on the scheduler.
// The loop keeps going until one of these happens:
// - max_pages jobs were admitted
// - nothing is in flight and the frontier is empty
// - the caller cancels
//
// After that the frontier is closed, every running worker is awaited, and
// the session is turned into the final CrawlResult.
// =============================================================================

use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinSet;
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, trace, warn};
use url::Url;

use super::completion::{CompletionDetector, CrawlPhase, InFlightGuard, StopReason};
use super::links::{classify_links, CrawlScope};
use super::queue::{CrawlJob, Frontier, FrontierReceiver, Offer};
use super::session::{Admission, CrawlResult, CrawlSession};
use crate::config::{OverflowPolicy, SpiderConfig};
use crate::error::FetchError;
use crate::fetch::Fetcher;

// State shared by the scheduler and every worker of one crawl
struct WorkerContext {
    config: SpiderConfig,
    scope: CrawlScope,
    session: CrawlSession,
    frontier: Frontier,
    detector: Arc<CompletionDetector>,
    permits: Arc<Semaphore>,
    fetcher: Arc<dyn Fetcher>,
}

// Runs one crawl from an already validated seed until it is done
pub(crate) async fn run(
    seed: Url,
    scope: CrawlScope,
    config: SpiderConfig,
    fetcher: Arc<dyn Fetcher>,
    cancel: CancellationToken,
) -> CrawlResult {
    let (frontier, mut jobs) =
        Frontier::new(config.effective_frontier_capacity(), config.overflow_policy);

    let ctx = Arc::new(WorkerContext {
        session: CrawlSession::new(config.max_pages, config.max_depth),
        permits: Arc::new(Semaphore::new(config.concurrency)),
        detector: Arc::new(CompletionDetector::new()),
        frontier,
        scope,
        fetcher,
        config,
    });

    debug!(
        capacity = ctx.frontier.capacity(),
        policy = ?ctx.config.overflow_policy,
        "frontier ready"
    );
    ctx.frontier.try_offer(CrawlJob::new(seed.as_str(), 0));

    let mut workers = JoinSet::new();
    let mut phase = CrawlPhase::Running;

    while let CrawlPhase::Running = phase {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                phase.begin_draining(StopReason::Cancelled);
            }

            next = next_slot_and_job(&ctx, &mut jobs) => {
                let Some((permit, job)) = next else {
                    phase.begin_draining(StopReason::FrontierExhausted);
                    continue;
                };
                if let Some(reason) = dispatch(&ctx, &mut workers, permit, job) {
                    phase.begin_draining(reason);
                }
            }

            _ = ctx.detector.wait_idle() => {
                if ctx.detector.is_exhausted(ctx.frontier.pending()) {
                    phase.begin_draining(StopReason::FrontierExhausted);
                }
            }

            _ = sleep(ctx.config.idle_timeout) => {
                trace!(
                    in_flight = ctx.detector.in_flight(),
                    pending = ctx.frontier.pending(),
                    "idle window elapsed"
                );
                if ctx.detector.is_exhausted(ctx.frontier.pending()) {
                    phase.begin_draining(StopReason::FrontierExhausted);
                }
            }
        }
    }

    let reason = phase.stop_reason().unwrap_or_default();
    drain(&ctx, &mut jobs, &mut workers, reason).await;
    phase.finish();

    ctx.session.finalize(ctx.frontier.dropped(), reason)
}

// Waits for a free worker slot, then for the next job. Both waits are
// cancel safe: if another select branch wins, the permit goes back and no
// job has been taken out of the frontier.
async fn next_slot_and_job(
    ctx: &WorkerContext,
    jobs: &mut FrontierReceiver,
) -> Option<(OwnedSemaphorePermit, CrawlJob)> {
    let permit = Arc::clone(&ctx.permits).acquire_owned().await.ok()?;
    let job = jobs.next_job().await?;
    Some((permit, job))
}

// Admits a job and spawns its worker. Returns a stop reason when this
// admission used up the page budget. A rejected job just returns its permit.
fn dispatch(
    ctx: &Arc<WorkerContext>,
    workers: &mut JoinSet<()>,
    permit: OwnedSemaphorePermit,
    job: CrawlJob,
) -> Option<StopReason> {
    match ctx.session.admit(&job) {
        Admission::Accepted { limit_reached } => {
            let guard = ctx.detector.job_admitted();
            workers.spawn(process_job(Arc::clone(ctx), job, permit, guard));

            if limit_reached {
                debug!(max_pages = ctx.config.max_pages, "reached maximum pages limit");
                return Some(StopReason::PageLimit);
            }
            None
        }
        Admission::Rejected(reason) => {
            trace!(url = %job.url, depth = job.depth, ?reason, "job not admitted");
            None
        }
    }
}

async fn drain(
    ctx: &WorkerContext,
    jobs: &mut FrontierReceiver,
    workers: &mut JoinSet<()>,
    reason: StopReason,
) {
    debug!(
        ?reason,
        admitted = ctx.session.total_pages(),
        in_flight = ctx.detector.in_flight(),
        "draining in-flight workers"
    );
    jobs.close();

    while let Some(joined) = workers.join_next().await {
        if let Err(error) = joined {
            warn!(%error, "crawl worker did not finish cleanly");
        }
    }
}

// One unit of work: be polite, fetch, record, expand.
// The permit is held until the links are queued (only until they are
// classified under Block); the in-flight guard covers everything.
#[instrument(skip_all, fields(url = %job.url, depth = job.depth))]
async fn process_job(
    ctx: Arc<WorkerContext>,
    job: CrawlJob,
    permit: OwnedSemaphorePermit,
    _in_flight: InFlightGuard,
) {
    // A local, so every return releases it before the in-flight guard
    let mut permit = Some(permit);

    if !ctx.config.delay_between.is_zero() {
        sleep(ctx.config.delay_between).await;
    }

    let page_timeout = ctx.config.page_timeout;
    let fetched = match timeout(page_timeout, ctx.fetcher.fetch(&job.url, page_timeout)).await {
        Ok(fetched) => fetched,
        Err(_) => Err(FetchError::Timeout(page_timeout)),
    };

    let page = match fetched {
        Ok(page) => page,
        Err(error) => {
            debug!(%error, "failed to crawl page");
            ctx.session.record_failure(&job.url, error.to_string());
            return;
        }
    };

    ctx.session.record_success(&job.url, &page.text);
    debug!("crawled page");

    if job.depth >= ctx.config.max_depth {
        return;
    }

    let Ok(page_url) = Url::parse(&job.url) else {
        return;
    };
    let links = classify_links(
        &page.internal_links,
        &page_url,
        &ctx.scope,
        &ctx.config.classifier,
    );
    debug!(
        crawlable_links = links.crawlable.len(),
        file_links = links.files.len(),
        "extracted links"
    );

    ctx.session.record_files(links.files);

    // A blocking offer must not sit on a slot the scheduler needs in order
    // to pull the next job out of a full frontier. Dropping offers never
    // wait, so under Drop the permit is kept until the links are queued.
    if ctx.config.overflow_policy == OverflowPolicy::Block {
        permit.take();
    }

    for url in links.crawlable {
        match ctx.frontier.offer(CrawlJob::new(url, job.depth + 1)).await {
            Offer::Queued | Offer::Dropped => {}
            // The scheduler stopped admitting; the rest would be thrown away too
            Offer::Closed => break,
        }
    }

    drop(permit);
}

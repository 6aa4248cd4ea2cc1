//! Periodic crawl scheduling.
//!
//! One iteration: build the stale-mode queue, split it into batches, dispatch
//! each batch to the worker pool, pace batches with a fixed delay, refresh the
//! heartbeat. The tick interval equals the cache TTL, and the first tick fires
//! immediately at startup.

use crate::config::Config;
use crate::crawler::heartbeat::Heartbeat;
use crate::crawler::worker::{Crawler, CrawlTarget};
use crate::error::Result;
use crate::queue::{QueueBuilder, QueueMode};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// How often the heartbeat is refreshed while the scheduler is idle.
const IDLE_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(60);

/// How long shutdown waits for an in-flight cycle before abandoning it.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Periodically builds the crawl queue and dispatches it in paced batches.
pub struct Scheduler {
    crawler: Arc<Crawler>,
    queue_builder: Arc<QueueBuilder>,
    heartbeat: Arc<Heartbeat>,
    config: Config,
}

impl Scheduler {
    pub fn new(crawler: Arc<Crawler>, queue_builder: Arc<QueueBuilder>, config: Config) -> Self {
        let heartbeat = Arc::new(Heartbeat::new(config.heartbeat_path.clone()));
        Self {
            crawler,
            queue_builder,
            heartbeat,
            config,
        }
    }

    /// Runs the scheduler's main loop with graceful shutdown support.
    ///
    /// A tick that fires while the previous cycle is still dispatching is
    /// skipped with a warning; a scheduled crawl never runs concurrently with
    /// itself. On shutdown the current cycle is cancelled: its in-flight
    /// workers are awaited up to [`SHUTDOWN_GRACE`], further batches are not
    /// dispatched.
    pub async fn run(&self, mut shutdown_rx: broadcast::Receiver<()>) {
        info!(
            interval_hours = self.config.crawl_interval_hours,
            batch_size = self.config.batch_size,
            batch_delay = format!("{:.0?}", self.config.batch_delay),
            "Scheduler service started"
        );

        self.heartbeat.touch().await;

        let tick_interval = self.config.crawl_interval();
        // First tick fires immediately at startup
        let mut next_run = time::Instant::now();
        let mut idle_beat = time::interval(IDLE_HEARTBEAT_INTERVAL);
        let mut current_work: Option<(tokio::task::JoinHandle<()>, CancellationToken)> = None;

        loop {
            tokio::select! {
                _ = time::sleep_until(next_run) => {
                    let busy = current_work
                        .as_ref()
                        .is_some_and(|(handle, _)| !handle.is_finished());

                    if busy {
                        warn!("Crawl cycle already in progress, skipping tick");
                    } else {
                        let cancel_token = CancellationToken::new();
                        let handle = tokio::spawn({
                            let crawler = self.crawler.clone();
                            let queue_builder = self.queue_builder.clone();
                            let heartbeat = self.heartbeat.clone();
                            let batch_size = self.config.batch_size;
                            let batch_delay = self.config.batch_delay;
                            let cancel_token = cancel_token.clone();

                            async move {
                                if let Err(e) = Self::run_cycle(
                                    &crawler,
                                    &queue_builder,
                                    &heartbeat,
                                    batch_size,
                                    batch_delay,
                                    &cancel_token,
                                )
                                .await
                                {
                                    error!(error = ?e, "Crawl cycle failed");
                                }
                            }
                        });
                        current_work = Some((handle, cancel_token));
                    }

                    next_run = time::Instant::now() + tick_interval;
                }
                _ = idle_beat.tick() => {
                    self.heartbeat.touch().await;
                }
                _ = shutdown_rx.recv() => {
                    info!("Scheduler received shutdown signal");

                    if let Some((handle, cancel_token)) = current_work.take() {
                        cancel_token.cancel();
                        if time::timeout(SHUTDOWN_GRACE, handle).await.is_err() {
                            warn!(
                                grace = format!("{SHUTDOWN_GRACE:.0?}"),
                                "Crawl cycle did not complete in time, abandoning"
                            );
                        } else {
                            debug!("Crawl cycle completed gracefully");
                        }
                    }

                    info!("Scheduler exiting gracefully");
                    break;
                }
            }
        }
    }

    /// One scheduled crawl cycle.
    ///
    /// Static so the loop can run it from a spawned task, matching the
    /// cancellation shape above.
    async fn run_cycle(
        crawler: &Crawler,
        queue_builder: &QueueBuilder,
        heartbeat: &Heartbeat,
        batch_size: usize,
        batch_delay: Duration,
        cancel_token: &CancellationToken,
    ) -> Result<()> {
        info!("Starting scheduled crawl cycle");
        let cycle_start = std::time::Instant::now();

        let (queue, stats) = queue_builder.build(QueueMode::Stale).await?;
        if queue.is_empty() {
            info!("No companies need updating");
            return Ok(());
        }

        info!(
            unique = stats.unique_companies,
            by_priority = ?stats.by_priority,
            estimated_minutes = format!("{:.1}", stats.estimated_duration_minutes),
            "Queue built"
        );

        let targets: Vec<CrawlTarget> = queue.iter().map(CrawlTarget::from).collect();
        let batches: Vec<&[CrawlTarget]> = targets.chunks(batch_size.max(1)).collect();
        let total_batches = batches.len();
        info!(
            companies = targets.len(),
            total_batches, "Processing companies in batches"
        );

        let mut successful = 0usize;
        let mut failed = 0usize;
        let mut total_jobs = 0usize;

        for (i, batch) in batches.into_iter().enumerate() {
            if cancel_token.is_cancelled() {
                warn!(
                    remaining = total_batches - i,
                    "Cycle cancelled, skipping remaining batches"
                );
                break;
            }

            info!(
                batch = i + 1,
                total_batches,
                size = batch.len(),
                "Processing batch"
            );

            let results = crawler.crawl_companies(batch, false).await;
            successful += results.iter().filter(|r| r.success).count();
            failed += results.iter().filter(|r| !r.success).count();
            total_jobs += results.iter().map(|r| r.jobs_inserted).sum::<usize>();

            heartbeat.touch().await;

            // Pause between batches (not after the last), staying responsive
            // to cancellation
            if i + 1 < total_batches {
                debug!(delay = format!("{batch_delay:.0?}"), "Waiting before next batch");
                tokio::select! {
                    _ = time::sleep(batch_delay) => {}
                    _ = cancel_token.cancelled() => {}
                }
            }
        }

        info!(
            duration = format!("{:.1?}", cycle_start.elapsed()),
            successful,
            failed,
            total_jobs,
            subscribers_served = stats.total_subscribers,
            "Scheduled crawl cycle complete"
        );
        Ok(())
    }
}

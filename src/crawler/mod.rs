//! Crawl execution: the worker pool, the scheduler loop, and the service
//! wrapper that ties their lifecycle to the application's shutdown handling.

pub mod heartbeat;
pub mod scheduler;
pub mod worker;

pub use worker::{CrawlOutcome, CrawlTarget, Crawler};

use crate::config::Config;
use crate::net::CrawlSession;
use crate::queue::QueueBuilder;
use crate::services::Service;
use sqlx::PgPool;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use self::scheduler::Scheduler;

/// The scheduled-crawl service managed by the application's `ServiceManager`.
pub struct CrawlerService {
    db_pool: PgPool,
    session: Arc<CrawlSession>,
    config: Config,
    scheduler_handle: Option<JoinHandle<()>>,
    shutdown_tx: Option<broadcast::Sender<()>>,
}

impl CrawlerService {
    pub fn new(db_pool: PgPool, session: Arc<CrawlSession>, config: Config) -> Self {
        Self {
            db_pool,
            session,
            config,
            scheduler_handle: None,
            shutdown_tx: None,
        }
    }

    fn start(&mut self) {
        info!("CrawlerService starting");

        let (shutdown_tx, _) = broadcast::channel(1);
        self.shutdown_tx = Some(shutdown_tx.clone());

        let crawler = Arc::new(Crawler::new(
            self.db_pool.clone(),
            self.session.clone(),
            self.config.crawl_interval(),
            self.config.max_concurrent_tasks,
        ));
        let queue_builder = Arc::new(QueueBuilder::new(
            self.db_pool.clone(),
            self.config.crawl_interval(),
        ));

        let scheduler = Scheduler::new(crawler, queue_builder, self.config.clone());
        let shutdown_rx = shutdown_tx.subscribe();
        let handle = tokio::spawn(async move {
            scheduler.run(shutdown_rx).await;
        });
        self.scheduler_handle = Some(handle);
        info!("Scheduler task spawned");
    }
}

#[async_trait::async_trait]
impl Service for CrawlerService {
    fn name(&self) -> &'static str {
        "crawler"
    }

    async fn run(&mut self) -> Result<(), anyhow::Error> {
        self.start();
        std::future::pending::<()>().await;
        Ok(())
    }

    async fn shutdown(&mut self) -> Result<(), anyhow::Error> {
        info!("Shutting down crawler service");

        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(());
        } else {
            warn!("No shutdown channel found for crawler service");
            return Err(anyhow::anyhow!("No shutdown channel available"));
        }

        if let Some(handle) = self.scheduler_handle.take() {
            if handle.await.is_err() {
                warn!("Scheduler task panicked during shutdown");
                return Err(anyhow::anyhow!("Scheduler task panicked"));
            }
        }

        info!("Crawler service shutdown complete");
        Ok(())
    }
}

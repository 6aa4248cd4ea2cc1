//! Application state shared across the web surface and crawl services.

use crate::crawler::Crawler;
use crate::net::CrawlSession;
use crate::web::CrawlJobTracker;
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub session: Arc<CrawlSession>,
    pub crawler: Arc<Crawler>,
    pub crawl_jobs: Arc<CrawlJobTracker>,
}

impl AppState {
    pub fn new(db_pool: PgPool, session: Arc<CrawlSession>, crawler: Arc<Crawler>) -> Self {
        Self {
            db_pool,
            session,
            crawler,
            crawl_jobs: Arc::new(CrawlJobTracker::new()),
        }
    }
}

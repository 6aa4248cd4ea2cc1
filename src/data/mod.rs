//! Database access layer: companies, jobs, the TTL job cache, and crawl logs.

pub mod cache;
pub mod companies;
pub mod crawl_logs;
pub mod jobs;
pub mod models;

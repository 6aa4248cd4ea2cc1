//! Append-only crawl log.

use crate::data::models::CrawlLogEntry;
use crate::error::Result;
use serde::Serialize;
use sqlx::PgPool;
use tracing::error;

/// Insert a crawl log row. Failures are swallowed after logging; accounting
/// must never break a crawl.
pub async fn insert(
    pool: &PgPool,
    url: &str,
    status: &str,
    error_message: Option<&str>,
    response_time_ms: Option<i32>,
) {
    let result = sqlx::query(
        "INSERT INTO crawl_logs (url, status, error_message, response_time_ms)
         VALUES ($1, $2, $3, $4)",
    )
    .bind(url)
    .bind(status)
    .bind(error_message)
    .bind(response_time_ms)
    .execute(pool)
    .await;

    if let Err(e) = result {
        error!(url, status, error = %e, "failed to insert crawl log");
    }
}

/// Most recent log entries, newest first.
pub async fn recent(pool: &PgPool, limit: i64) -> Result<Vec<CrawlLogEntry>> {
    let rows = sqlx::query_as::<_, CrawlLogEntry>(
        "SELECT log_id, url, status, error_message, response_time_ms, logged_at
         FROM crawl_logs ORDER BY logged_at DESC LIMIT $1",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Aggregate over the trailing 24 hours, backing the stats endpoint.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct CrawlLogStats {
    pub total_crawls: i64,
    pub successful_crawls: i64,
    pub failed_crawls: i64,
    pub avg_response_time_ms: Option<f64>,
}

pub async fn stats_last_day(pool: &PgPool) -> Result<CrawlLogStats> {
    let stats = sqlx::query_as::<_, CrawlLogStats>(
        r#"
        SELECT
            COUNT(*) AS total_crawls,
            COUNT(*) FILTER (WHERE status = 'success') AS successful_crawls,
            COUNT(*) FILTER (WHERE status != 'success') AS failed_crawls,
            AVG(response_time_ms)::FLOAT8 AS avg_response_time_ms
        FROM crawl_logs
        WHERE logged_at > NOW() - INTERVAL '24 hours'
        "#,
    )
    .fetch_one(pool)
    .await?;
    Ok(stats)
}

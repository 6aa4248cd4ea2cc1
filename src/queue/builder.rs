//! Priority queue builder.
//!
//! Joins companies, subscriber counts, last-crawl and cache-expiry state into
//! a deduplicated, prioritised work list. Popular companies crawl first;
//! subscription aggregation happens here and nowhere else.

use crate::ats;
use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tracing::info;

/// Priority levels, evaluated top-to-bottom; lower value crawls first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum CrawlPriority {
    /// Cache expired and heavily subscribed
    Critical = 1,
    /// Heavily subscribed
    High = 2,
    /// At least one subscriber
    Normal = 3,
    /// No subscribers, cache expired
    Low = 4,
    /// Maintenance crawl
    Background = 5,
}

impl CrawlPriority {
    pub fn label(&self) -> &'static str {
        match self {
            CrawlPriority::Critical => "critical",
            CrawlPriority::High => "high",
            CrawlPriority::Normal => "normal",
            CrawlPriority::Low => "low",
            CrawlPriority::Background => "background",
        }
    }
}

/// Subscriber count at which a company is considered heavily subscribed.
const HIGH_SUBSCRIBER_THRESHOLD: i64 = 5;

/// A company queued for crawling.
#[derive(Debug, Clone)]
pub struct QueueEntry {
    pub company_id: i32,
    pub name: String,
    pub career_url: String,
    pub ats_provider: Option<String>,
    pub subscriber_count: i64,
    pub last_crawled: Option<DateTime<Utc>>,
    pub cache_expires_at: Option<DateTime<Utc>>,
    pub priority: CrawlPriority,
}

/// Statistics about a built queue.
#[derive(Debug, Default, Serialize)]
pub struct QueueStats {
    pub total_companies: usize,
    pub unique_companies: usize,
    pub total_subscribers: i64,
    pub by_priority: HashMap<&'static str, usize>,
    pub by_provider: HashMap<String, usize>,
    pub estimated_duration_minutes: f64,
}

/// Which aggregation feeds the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueMode {
    /// Every company with at least one subscriber.
    AllSubscribed,
    /// Companies whose cache has expired or whose last crawl is older than
    /// the TTL. Zero-subscriber companies participate at low priority. This
    /// is the scheduled loop's default.
    Stale,
}

#[derive(Debug, sqlx::FromRow)]
struct CandidateRow {
    company_id: i32,
    name: String,
    career_page_url: String,
    ats_provider: Option<String>,
    last_crawled: Option<DateTime<Utc>>,
    cache_expires_at: Option<DateTime<Utc>>,
    subscriber_count: i64,
}

/// Builds optimized crawl queues from user subscriptions.
pub struct QueueBuilder {
    pool: PgPool,
    cache_ttl: Duration,
}

impl QueueBuilder {
    pub fn new(pool: PgPool, cache_ttl: Duration) -> Self {
        Self { pool, cache_ttl }
    }

    /// Build the crawl queue for the given mode.
    pub async fn build(&self, mode: QueueMode) -> Result<(Vec<QueueEntry>, QueueStats)> {
        let rows = match mode {
            QueueMode::AllSubscribed => self.subscribed_companies().await?,
            QueueMode::Stale => self.stale_companies().await?,
        };

        let now = Utc::now();
        let mut entries: Vec<QueueEntry> = rows
            .into_iter()
            .map(|row| {
                let priority = calculate_priority(row.subscriber_count, row.cache_expires_at, now);
                QueueEntry {
                    company_id: row.company_id,
                    name: row.name,
                    career_url: row.career_page_url,
                    ats_provider: row.ats_provider,
                    subscriber_count: row.subscriber_count,
                    last_crawled: row.last_crawled,
                    cache_expires_at: row.cache_expires_at,
                    priority,
                }
            })
            .collect();

        let total_companies = entries.len();
        dedupe_by_company(&mut entries);
        sort_queue(&mut entries);

        let stats = build_stats(&entries, total_companies);
        info!(
            unique = stats.unique_companies,
            subscribers = stats.total_subscribers,
            estimated_minutes = format!("{:.1}", stats.estimated_duration_minutes),
            "queue built"
        );

        Ok((entries, stats))
    }

    /// Companies with at least one subscriber, ordered by subscriber count
    /// then oldest-crawled first.
    async fn subscribed_companies(&self) -> Result<Vec<CandidateRow>> {
        let rows = sqlx::query_as::<_, CandidateRow>(
            r#"
            SELECT
                c.company_id,
                c.name,
                c.career_page_url,
                c.ats_provider,
                c.last_crawled,
                jc.expires_at AS cache_expires_at,
                COUNT(DISTINCT cs.user_id) AS subscriber_count
            FROM companies c
            LEFT JOIN company_subscriptions cs ON c.company_id = cs.company_id
            LEFT JOIN job_cache jc ON c.company_id = jc.company_id
            GROUP BY c.company_id, c.name, c.career_page_url, c.ats_provider, c.last_crawled, jc.expires_at
            HAVING COUNT(DISTINCT cs.user_id) > 0
            ORDER BY subscriber_count DESC, c.last_crawled ASC NULLS FIRST
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        info!(count = rows.len(), "companies with subscriptions");
        Ok(rows)
    }

    /// Companies needing refresh: cache expired or last crawl older than the
    /// TTL. Zero-subscriber companies are included.
    async fn stale_companies(&self) -> Result<Vec<CandidateRow>> {
        let cutoff = Utc::now() - chrono::Duration::from_std(self.cache_ttl)?;

        let rows = sqlx::query_as::<_, CandidateRow>(
            r#"
            SELECT
                c.company_id,
                c.name,
                c.career_page_url,
                c.ats_provider,
                c.last_crawled,
                jc.expires_at AS cache_expires_at,
                COALESCE(sub.subscriber_count, 0) AS subscriber_count
            FROM companies c
            LEFT JOIN job_cache jc ON c.company_id = jc.company_id
            LEFT JOIN (
                SELECT company_id, COUNT(DISTINCT user_id) AS subscriber_count
                FROM company_subscriptions
                GROUP BY company_id
            ) sub ON c.company_id = sub.company_id
            WHERE
                jc.expires_at IS NULL
                OR jc.expires_at < NOW()
                OR c.last_crawled IS NULL
                OR c.last_crawled < $1
            ORDER BY subscriber_count DESC, c.last_crawled ASC NULLS FIRST
            "#,
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;

        info!(count = rows.len(), "stale companies needing refresh");
        Ok(rows)
    }
}

/// Priority table, first match wins.
pub fn calculate_priority(
    subscriber_count: i64,
    cache_expires_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> CrawlPriority {
    let cache_expired = cache_expires_at.is_none_or(|expires| expires < now);

    if cache_expired && subscriber_count >= HIGH_SUBSCRIBER_THRESHOLD {
        CrawlPriority::Critical
    } else if subscriber_count >= HIGH_SUBSCRIBER_THRESHOLD {
        CrawlPriority::High
    } else if subscriber_count >= 1 {
        CrawlPriority::Normal
    } else if cache_expired {
        CrawlPriority::Low
    } else {
        CrawlPriority::Background
    }
}

/// Keep the first occurrence of each company id.
fn dedupe_by_company(entries: &mut Vec<QueueEntry>) {
    let mut seen = HashSet::new();
    entries.retain(|entry| seen.insert(entry.company_id));
}

/// Priority ascending, ties broken by subscriber count descending. The sort
/// is stable, so within a tie the aggregation's oldest-first order survives.
fn sort_queue(entries: &mut [QueueEntry]) {
    entries.sort_by_key(|entry| (entry.priority, std::cmp::Reverse(entry.subscriber_count)));
}

/// A provider-tagged or provider-hosted company crawls via the API in a few
/// seconds; everything else pays the HTML scraping cost.
fn is_api_capable(entry: &QueueEntry) -> bool {
    match entry.ats_provider.as_deref() {
        Some(tag) => matches!(tag, "greenhouse" | "lever" | "ashby" | "workable"),
        None => ats::detect_from_url(&entry.career_url).is_some(),
    }
}

const API_CRAWL_SECS: f64 = 3.0;
const HTML_CRAWL_SECS: f64 = 20.0;

fn estimate_duration_minutes(entries: &[QueueEntry]) -> f64 {
    let total_seconds: f64 = entries
        .iter()
        .map(|entry| {
            if is_api_capable(entry) {
                API_CRAWL_SECS
            } else {
                HTML_CRAWL_SECS
            }
        })
        .sum();
    total_seconds / 60.0
}

fn build_stats(entries: &[QueueEntry], total_companies: usize) -> QueueStats {
    let mut stats = QueueStats {
        total_companies,
        unique_companies: entries.len(),
        total_subscribers: entries.iter().map(|e| e.subscriber_count).sum(),
        estimated_duration_minutes: estimate_duration_minutes(entries),
        ..QueueStats::default()
    };

    for entry in entries {
        *stats.by_priority.entry(entry.priority.label()).or_insert(0) += 1;
        let provider = entry
            .ats_provider
            .clone()
            .unwrap_or_else(|| "unknown".to_string());
        *stats.by_provider.entry(provider).or_insert(0) += 1;
    }

    stats
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(
        company_id: i32,
        subscribers: i64,
        expires_at: Option<DateTime<Utc>>,
        provider: Option<&str>,
    ) -> QueueEntry {
        let now = Utc::now();
        QueueEntry {
            company_id,
            name: format!("company-{company_id}"),
            career_url: format!("https://company-{company_id}.example/careers"),
            ats_provider: provider.map(str::to_string),
            subscriber_count: subscribers,
            last_crawled: None,
            cache_expires_at: expires_at,
            priority: calculate_priority(subscribers, expires_at, now),
        }
    }

    fn fresh() -> Option<DateTime<Utc>> {
        Some(Utc::now() + chrono::Duration::hours(1))
    }

    fn expired() -> Option<DateTime<Utc>> {
        Some(Utc::now() - chrono::Duration::hours(1))
    }

    // -- calculate_priority tests --

    #[test]
    fn expired_and_popular_is_critical() {
        let now = Utc::now();
        assert_eq!(
            calculate_priority(6, expired(), now),
            CrawlPriority::Critical
        );
        assert_eq!(calculate_priority(5, None, now), CrawlPriority::Critical);
    }

    #[test]
    fn popular_with_fresh_cache_is_high() {
        assert_eq!(
            calculate_priority(6, fresh(), Utc::now()),
            CrawlPriority::High
        );
    }

    #[test]
    fn any_subscriber_is_normal() {
        assert_eq!(
            calculate_priority(2, expired(), Utc::now()),
            CrawlPriority::Normal
        );
        assert_eq!(
            calculate_priority(1, fresh(), Utc::now()),
            CrawlPriority::Normal
        );
    }

    #[test]
    fn unsubscribed_expired_is_low_otherwise_background() {
        assert_eq!(
            calculate_priority(0, expired(), Utc::now()),
            CrawlPriority::Low
        );
        assert_eq!(calculate_priority(0, None, Utc::now()), CrawlPriority::Low);
        assert_eq!(
            calculate_priority(0, fresh(), Utc::now()),
            CrawlPriority::Background
        );
    }

    // -- ordering tests --

    #[test]
    fn queue_orders_by_priority_then_subscribers() {
        // A: 6 subs expired, B: 6 subs fresh, C: 2 subs expired, D: 0 subs expired
        let mut entries = vec![
            entry(4, 0, expired(), None),
            entry(2, 6, fresh(), None),
            entry(3, 2, expired(), None),
            entry(1, 6, expired(), None),
        ];
        sort_queue(&mut entries);
        let order: Vec<i32> = entries.iter().map(|e| e.company_id).collect();
        assert_eq!(order, vec![1, 2, 3, 4]);
    }

    #[test]
    fn critical_precedes_high_regardless_of_subscribers() {
        let mut entries = vec![entry(1, 50, fresh(), None), entry(2, 5, expired(), None)];
        sort_queue(&mut entries);
        assert_eq!(entries[0].company_id, 2);
    }

    #[test]
    fn dedupe_keeps_first_occurrence() {
        let mut entries = vec![
            entry(1, 3, expired(), None),
            entry(2, 1, expired(), None),
            entry(1, 9, expired(), None),
        ];
        dedupe_by_company(&mut entries);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].subscriber_count, 3);
    }

    // -- stats tests --

    #[test]
    fn duration_estimate_splits_api_and_html() {
        let entries = vec![
            entry(1, 1, fresh(), Some("greenhouse")),
            entry(2, 1, fresh(), None),
        ];
        // 3s API + 20s HTML = 23s
        let minutes = estimate_duration_minutes(&entries);
        assert!((minutes - 23.0 / 60.0).abs() < 1e-9);
    }

    #[test]
    fn url_detection_counts_as_api_capable() {
        let mut candidate = entry(1, 1, fresh(), None);
        candidate.career_url = "https://boards.greenhouse.io/acme".to_string();
        assert!(is_api_capable(&candidate));
    }

    #[test]
    fn stats_histogram_by_priority() {
        let entries = vec![
            entry(1, 6, expired(), None),
            entry(2, 6, expired(), None),
            entry(3, 1, fresh(), None),
        ];
        let stats = build_stats(&entries, 3);
        assert_eq!(stats.by_priority.get("critical"), Some(&2));
        assert_eq!(stats.by_priority.get("normal"), Some(&1));
        assert_eq!(stats.total_subscribers, 13);
    }
}

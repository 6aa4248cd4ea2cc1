#[allow(dead_code)]
mod helpers;

use chrono::{TimeZone, Utc};
use jobwatch::data::cache;
use sqlx::PgPool;
use std::time::Duration;

const TTL: Duration = Duration::from_secs(24 * 3600);

// ── freshness ───────────────────────────────────────────────────────

#[sqlx::test]
async fn missing_entry_is_a_miss(pool: PgPool) {
    let company_id = helpers::insert_company(&pool, "Acme", "https://acme.example/careers").await;
    assert!(cache::get_cached(&pool, company_id).await.unwrap().is_none());
}

#[sqlx::test]
async fn expired_entry_is_a_miss(pool: PgPool) {
    let company_id = helpers::insert_company(&pool, "Acme", "https://acme.example/careers").await;
    helpers::insert_cache_entry(&pool, company_id, 12, -3600.0).await;

    assert!(cache::get_cached(&pool, company_id).await.unwrap().is_none());
}

#[sqlx::test]
async fn fresh_entry_is_returned_with_valid_expiry(pool: PgPool) {
    let company_id = helpers::insert_company(&pool, "Acme", "https://acme.example/careers").await;
    helpers::insert_cache_entry(&pool, company_id, 12, 3600.0).await;

    let entry = cache::get_cached(&pool, company_id)
        .await
        .unwrap()
        .expect("entry should be fresh");
    assert_eq!(entry.job_count, 12);
    assert!(entry.expires_at > entry.crawled_at);
}

// ── write-through ───────────────────────────────────────────────────

#[sqlx::test]
async fn update_roundtrips_job_fields(pool: PgPool) {
    let company_id = helpers::insert_company(&pool, "Acme", "https://acme.example/careers").await;

    let mut posting = helpers::make_posting("Staff Engineer", "New York, NY");
    posting.posted_date = Some(Utc.with_ymd_and_hms(2025, 5, 21, 16, 0, 0).unwrap());

    cache::update(&pool, company_id, &[posting.clone()], "greenhouse", 2400, TTL)
        .await
        .unwrap();

    let entry = cache::get_cached(&pool, company_id)
        .await
        .unwrap()
        .expect("entry should exist");
    assert_eq!(entry.job_count, 1);
    assert_eq!(entry.ats_provider.as_deref(), Some("greenhouse"));
    assert_eq!(entry.crawl_duration_ms, Some(2400));

    let jobs = cache::decode_jobs(&entry).unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].title, posting.title);
    assert_eq!(jobs[0].location, posting.location);
    assert_eq!(jobs[0].application_url, posting.application_url);
    assert_eq!(jobs[0].posted_date, posting.posted_date);
}

#[sqlx::test]
async fn update_advances_expiry_by_ttl(pool: PgPool) {
    let company_id = helpers::insert_company(&pool, "Acme", "https://acme.example/careers").await;

    cache::update(&pool, company_id, &[], "html", 100, TTL)
        .await
        .unwrap();

    let entry = cache::get_cached(&pool, company_id)
        .await
        .unwrap()
        .expect("empty job lists still refresh the cache");
    assert_eq!(entry.job_count, 0);

    let ttl = entry.expires_at - entry.crawled_at;
    let expected = chrono::Duration::from_std(TTL).unwrap();
    assert!((ttl - expected).num_seconds().abs() <= 1);
}

#[sqlx::test]
async fn second_update_replaces_the_entry(pool: PgPool) {
    let company_id = helpers::insert_company(&pool, "Acme", "https://acme.example/careers").await;

    cache::update(
        &pool,
        company_id,
        &[helpers::make_posting("Engineer", "Berlin")],
        "html",
        100,
        TTL,
    )
    .await
    .unwrap();

    let refreshed = vec![
        helpers::make_posting("Engineer", "Berlin"),
        helpers::make_posting("Designer", "Lisbon"),
    ];
    cache::update(&pool, company_id, &refreshed, "greenhouse", 200, TTL)
        .await
        .unwrap();

    let entry = cache::get_cached(&pool, company_id).await.unwrap().unwrap();
    assert_eq!(entry.job_count, 2);
    assert_eq!(entry.ats_provider.as_deref(), Some("greenhouse"));
    assert_eq!(entry.crawl_duration_ms, Some(200));
}

// ── crawl logs ──────────────────────────────────────────────────────

#[sqlx::test]
async fn crawl_logs_append_and_aggregate(pool: PgPool) {
    use jobwatch::data::crawl_logs;

    crawl_logs::insert(&pool, "https://a.example", "success", None, Some(120)).await;
    crawl_logs::insert(
        &pool,
        "https://a.example",
        "rate_limited",
        Some("Rate limited (429)"),
        Some(80),
    )
    .await;
    crawl_logs::insert(&pool, "https://b.example", "timeout", Some("Timeout"), None).await;

    let recent = crawl_logs::recent(&pool, 10).await.unwrap();
    assert_eq!(recent.len(), 3);

    let stats = crawl_logs::stats_last_day(&pool).await.unwrap();
    assert_eq!(stats.total_crawls, 3);
    assert_eq!(stats.successful_crawls, 1);
    assert_eq!(stats.failed_crawls, 2);
    assert_eq!(stats.avg_response_time_ms, Some(100.0));
}

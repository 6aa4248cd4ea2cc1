//! Crawl-request HTTP surface.
//!
//! A thin layer over the worker pool: trigger a crawl of an explicit company
//! list, poll the resulting job by id, and read service statistics. Crawl
//! jobs live in an in-memory tracker; the durable state is whatever the
//! workers wrote to the database.

mod tracker;

pub use tracker::{CrawlJobRecord, CrawlJobStatus, CrawlJobTracker, CrawlSummary};

use crate::crawler::CrawlTarget;
use crate::data::crawl_logs;
use crate::services::Service;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::{error, info, trace, warn};

/// Creates the web server router.
pub fn create_router(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/stats", get(stats))
        .route("/logs", get(recent_logs))
        .route("/crawl", post(trigger_crawl))
        .route("/crawl/{job_id}", get(crawl_status))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(app_state)
}

struct ApiError(StatusCode, String);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.0, Json(json!({ "error": self.1 }))).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        error!(error = ?e, "request failed");
        ApiError(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal error".to_string(),
        )
    }
}

#[derive(Deserialize)]
struct CrawlRequest {
    companies: Vec<CompanyRequest>,
    #[serde(default)]
    force_refresh: bool,
    #[serde(default)]
    job_filter: Option<FilterRequest>,
}

#[derive(Deserialize)]
struct CompanyRequest {
    name: String,
    career_url: String,
}

/// Keyword filter applied to HTML-scraped records for this request.
#[derive(Deserialize)]
struct FilterRequest {
    #[serde(default)]
    keywords: Vec<String>,
    #[serde(default)]
    required_keywords: Vec<String>,
    #[serde(default)]
    excluded_keywords: Vec<String>,
    #[serde(default)]
    title_keywords: Vec<String>,
    #[serde(default = "default_min_matches")]
    min_keyword_matches: usize,
}

fn default_min_matches() -> usize {
    1
}

impl FilterRequest {
    fn into_filter(self) -> crate::html::JobFilter {
        crate::html::JobFilter::new(
            self.keywords,
            self.required_keywords,
            self.excluded_keywords,
            self.title_keywords,
            self.min_keyword_matches,
        )
    }
}

#[derive(Serialize)]
struct CrawlAccepted {
    job_id: String,
    status: CrawlJobStatus,
    companies: usize,
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn stats(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    let log_stats = crawl_logs::stats_last_day(&state.db_pool).await?;
    let gate_stats = state.session.gate.stats().await;
    Ok(Json(json!({
        "crawl_logs": log_stats,
        "rate_gate": gate_stats,
    })))
}

async fn recent_logs(
    State(state): State<AppState>,
) -> Result<Json<Vec<crate::data::models::CrawlLogEntry>>, ApiError> {
    let logs = crawl_logs::recent(&state.db_pool, 100).await?;
    Ok(Json(logs))
}

/// Accept a crawl of an explicit company list and run it in the background.
async fn trigger_crawl(
    State(state): State<AppState>,
    Json(request): Json<CrawlRequest>,
) -> Result<(StatusCode, Json<CrawlAccepted>), ApiError> {
    if request.companies.is_empty() {
        return Err(ApiError(
            StatusCode::BAD_REQUEST,
            "companies list is empty".to_string(),
        ));
    }

    let targets: Vec<CrawlTarget> = request
        .companies
        .iter()
        .map(|c| CrawlTarget {
            company_id: None,
            name: c.name.clone(),
            career_url: c.career_url.clone(),
        })
        .collect();

    let job_id = state.crawl_jobs.create(targets.len());
    info!(job_id = %job_id, companies = targets.len(), "crawl job accepted");

    let tracker = state.crawl_jobs.clone();
    let crawler = match request.job_filter {
        Some(filter) => std::sync::Arc::new((*state.crawler).clone().with_filter(filter.into_filter())),
        None => state.crawler.clone(),
    };
    let spawned_id = job_id.clone();
    let force_refresh = request.force_refresh;
    tokio::spawn(async move {
        tracker.set_running(&spawned_id);
        let crawl = tokio::spawn(async move { crawler.crawl_companies(&targets, force_refresh).await });
        match crawl.await {
            Ok(results) => {
                tracker.complete(&spawned_id, CrawlSummary::from_outcomes(&results));
            }
            Err(e) => {
                error!(job_id = %spawned_id, error = %e, "crawl task panicked");
                tracker.fail(&spawned_id, format!("crawl task failed: {e}"));
            }
        }
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(CrawlAccepted {
            job_id,
            status: CrawlJobStatus::Queued,
            companies: request.companies.len(),
        }),
    ))
}

async fn crawl_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<CrawlJobRecord>, ApiError> {
    state
        .crawl_jobs
        .get(&job_id)
        .map(Json)
        .ok_or_else(|| ApiError(StatusCode::NOT_FOUND, format!("no crawl job {job_id}")))
}

/// Web server service implementation.
pub struct WebService {
    port: u16,
    app_state: AppState,
    shutdown_tx: Option<broadcast::Sender<()>>,
}

impl WebService {
    pub fn new(port: u16, app_state: AppState) -> Self {
        Self {
            port,
            app_state,
            shutdown_tx: None,
        }
    }
}

#[async_trait::async_trait]
impl Service for WebService {
    fn name(&self) -> &'static str {
        "web"
    }

    async fn run(&mut self) -> Result<(), anyhow::Error> {
        let app = create_router(self.app_state.clone());
        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        let listener = TcpListener::bind(addr).await?;
        info!(service = "web", address = %addr, "web server listening");

        let (shutdown_tx, mut shutdown_rx) = broadcast::channel(1);
        self.shutdown_tx = Some(shutdown_tx);

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
                trace!(service = "web", "starting graceful shutdown");
            })
            .await?;

        info!(service = "web", "web server stopped");
        Ok(())
    }

    async fn shutdown(&mut self) -> Result<(), anyhow::Error> {
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(());
        } else {
            warn!(service = "web", "no shutdown channel found");
        }
        Ok(())
    }
}

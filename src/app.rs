//! Application assembly: configuration, database pool, shared session, and
//! service registration.

use crate::cli::ServiceName;
use crate::config::Config;
use crate::crawler::{Crawler, CrawlerService};
use crate::net::CrawlSession;
use crate::services::manager::ServiceManager;
use crate::signals::handle_shutdown_signals;
use crate::state::AppState;
use crate::web::WebService;
use anyhow::Context;
use figment::{Figment, providers::Env};
use sqlx::postgres::PgPoolOptions;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

/// Load configuration from the environment.
pub fn load_config() -> Result<Config, anyhow::Error> {
    Figment::new()
        .merge(Env::raw())
        .extract()
        .context("Failed to load config")
}

/// Main application struct containing all long-lived components.
pub struct App {
    config: Config,
    db_pool: sqlx::PgPool,
    session: Arc<CrawlSession>,
    app_state: AppState,
    service_manager: ServiceManager,
}

impl App {
    /// Create an App with pool, migrations, and shared session initialized.
    pub async fn new(config: Config) -> Result<Self, anyhow::Error> {
        let db_pool = PgPoolOptions::new()
            .min_connections(5)
            .max_connections(20)
            .acquire_timeout(Duration::from_secs(5))
            .connect(&config.database_url())
            .await
            .context("Failed to create database pool")?;
        info!(
            host = config.db_host,
            database = config.db_name,
            "database pool established"
        );

        sqlx::migrate!("./migrations")
            .run(&db_pool)
            .await
            .context("Failed to run database migrations")?;
        info!("database migrations applied");

        let session = CrawlSession::new(&config, db_pool.clone())
            .context("Failed to create crawl session")?;

        let crawler = Arc::new(Crawler::new(
            db_pool.clone(),
            session.clone(),
            config.crawl_interval(),
            config.max_concurrent_tasks,
        ));
        let app_state = AppState::new(db_pool.clone(), session.clone(), crawler);

        Ok(App {
            config,
            db_pool,
            session,
            app_state,
            service_manager: ServiceManager::new(),
        })
    }

    /// Register the requested services with the manager.
    pub fn setup_services(&mut self, services: &[ServiceName]) -> Result<(), anyhow::Error> {
        if services.contains(&ServiceName::Crawler) {
            let crawler_service = Box::new(CrawlerService::new(
                self.db_pool.clone(),
                self.session.clone(),
                self.config.clone(),
            ));
            self.service_manager
                .register_service(ServiceName::Crawler.as_str(), crawler_service);
        }

        if services.contains(&ServiceName::Web) {
            let web_service = Box::new(WebService::new(self.config.port, self.app_state.clone()));
            self.service_manager
                .register_service(ServiceName::Web.as_str(), web_service);
        }

        if !self.service_manager.has_services() {
            error!("No services enabled. Cannot start application.");
            return Err(anyhow::anyhow!("No services enabled"));
        }

        Ok(())
    }

    /// Spawn services and block until a signal or a service exit.
    pub async fn run(mut self) -> ExitCode {
        info!(
            version = env!("CARGO_PKG_VERSION"),
            environment = if cfg!(debug_assertions) {
                "development"
            } else {
                "production"
            },
            port = self.config.port,
            crawl_interval_hours = self.config.crawl_interval_hours,
            shutdown_timeout = format!("{:.2?}", self.config.shutdown_timeout),
            "starting jobwatch"
        );

        self.service_manager.spawn_all();
        handle_shutdown_signals(self.service_manager, self.config.shutdown_timeout).await
    }
}

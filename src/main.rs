use clap::Parser;
use jobwatch::app::{App, load_config};
use jobwatch::cli::Args;
use jobwatch::logging::setup_logging;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    setup_logging(&config, args.formatter);

    let mut app = match App::new(config).await {
        Ok(app) => app,
        Err(e) => {
            tracing::error!(error = ?e, "failed to initialize application");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = app.setup_services(&args.services) {
        tracing::error!(error = ?e, "failed to set up services");
        return ExitCode::FAILURE;
    }

    app.run().await
}

//! Command-line interface definitions.

use clap::{Parser, ValueEnum};

/// Career-page crawl scheduler.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Log formatter to use
    #[arg(long, value_enum, default_value_t = TracingFormat::default())]
    pub formatter: TracingFormat,

    /// Services to run (defaults to all)
    #[arg(long, value_enum, value_delimiter = ',', default_values_t = vec![ServiceName::Crawler, ServiceName::Web])]
    pub services: Vec<ServiceName>,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum TracingFormat {
    /// Human-readable output (default in debug builds)
    Pretty,
    /// Newline-delimited JSON (default in release builds)
    Json,
}

impl Default for TracingFormat {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            TracingFormat::Pretty
        } else {
            TracingFormat::Json
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ServiceName {
    /// Scheduled crawl loop and worker pool
    Crawler,
    /// Crawl-request HTTP surface
    Web,
}

impl ServiceName {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceName::Crawler => "crawler",
            ServiceName::Web => "web",
        }
    }
}

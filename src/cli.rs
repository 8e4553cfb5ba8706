//! Command-line arguments and service selection.

use clap::{Parser, ValueEnum};

/// Log output format for the tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TracingFormat {
    /// Human-readable output for local development.
    Pretty,
    /// Newline-delimited JSON for log aggregation.
    Json,
}

/// Services hosted by this process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceName {
    Web,
    Scraper,
}

impl ServiceName {
    pub fn all() -> Vec<ServiceName> {
        vec![ServiceName::Web, ServiceName::Scraper]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceName::Web => "web",
            ServiceName::Scraper => "scraper",
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "fanscope", version, about = "Creator-profile scraper and lookup API")]
pub struct Args {
    /// Log output format.
    #[arg(long, value_enum, default_value = "pretty")]
    pub tracing: TracingFormat,
}

//! This server serves the scraped Forex Factory calendars as CSV files and scrapes on request.

use std::{net::SocketAddr, path::PathBuf, sync::Arc, time::Duration};

use anyhow::Result;
use clap::Parser;
use ffn_core::{
    config::{DEFAULT_BASE_URL, DEFAULT_OUTPUT_DIR},
    ScrapeConfig, Scraper,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod error;
mod route;

#[derive(Debug, Parser)]
#[command(version)]
pub struct Arguments {
    /// the socket address to listen on
    #[arg(long, env = "FFN_ADDRESS", default_value = "0.0.0.0:5000")]
    pub address: SocketAddr,
    /// the directory the CSV files are written to and served from
    #[arg(long, env = "FFN_OUTPUT_DIR", default_value = DEFAULT_OUTPUT_DIR)]
    pub output_dir: PathBuf,
    /// the calendar to scrape
    #[arg(long, env = "FFN_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,
    /// the timeout of a single request to the calendar in seconds
    #[arg(long, env = "FFN_TIMEOUT", default_value_t = 30)]
    pub timeout: u64,
    /// the number of attempts per month
    #[arg(long, env = "FFN_ATTEMPTS", default_value_t = 3)]
    pub attempts: u32,
    /// the delay before the first retry in milliseconds
    #[arg(long, env = "FFN_BACKOFF_MS", default_value_t = 500)]
    pub backoff_ms: u64,
    /// the budget of a single scrape request in seconds; months still running are reported as
    /// timed out
    #[arg(long, env = "FFN_DEADLINE", default_value_t = 300)]
    pub deadline: u64,
}

impl From<&Arguments> for ScrapeConfig {
    fn from(value: &Arguments) -> Self {
        ScrapeConfig {
            base_url: value.base_url.clone(),
            output_dir: value.output_dir.clone(),
            request_timeout: Duration::from_secs(value.timeout),
            max_attempts: value.attempts,
            initial_backoff: Duration::from_millis(value.backoff_ms),
            deadline: Some(Duration::from_secs(value.deadline)),
            ..ScrapeConfig::default()
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("ffn_core=info,ffn_server=info,tower_http=info")),
        )
        .init();

    let args = Arguments::parse();
    let state = route::AppState {
        scraper: Arc::new(Scraper::from_config(&ScrapeConfig::from(&args))?),
    };
    let app = route::router(state);
    info!(address = %args.address, output_dir = %args.output_dir.display(), "listening");
    axum::Server::bind(&args.address)
        .serve(app.into_make_service())
        .await?;
    Ok(())
}

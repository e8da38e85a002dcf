use std::{path::PathBuf, process::ExitCode, time::Duration};

use anyhow::Result;
use clap::{Parser, ValueEnum};
use ffn_core::{
    config::{DEFAULT_BASE_URL, DEFAULT_OUTPUT_DIR},
    scrape::Outcome,
    ScrapeConfig, ScrapeReport, Scraper, SuccessPolicy,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Scrape the Forex Factory calendar into one CSV file per month.
#[derive(Debug, Parser)]
#[command(version)]
pub struct Arguments {
    /// the months to scrape: `this`, `current`, `next`, `last` or a month name, optionally
    /// followed by a year [default: current month]
    #[arg(long, env = "FFN_MONTHS", num_args = 1.., value_delimiter = ',')]
    pub months: Vec<String>,
    /// the directory the CSV files are written to
    #[arg(long, env = "FFN_OUTPUT_DIR", default_value = DEFAULT_OUTPUT_DIR)]
    pub output_dir: PathBuf,
    /// the calendar to scrape
    #[arg(long, env = "FFN_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,
    /// the timeout of a single request in seconds
    #[arg(long, env = "FFN_TIMEOUT", default_value_t = 30)]
    pub timeout: u64,
    /// the number of attempts per month
    #[arg(long, env = "FFN_ATTEMPTS", default_value_t = 3)]
    pub attempts: u32,
    /// the delay before the first retry in milliseconds, doubled for every further retry
    #[arg(long, env = "FFN_BACKOFF_MS", default_value_t = 500)]
    pub backoff_ms: u64,
    /// stop starting new months after this many seconds
    #[arg(long, env = "FFN_DEADLINE")]
    pub deadline: Option<u64>,
    /// whether any or all months must succeed for a zero exit status
    #[arg(long, env = "FFN_POLICY", value_enum, default_value_t = Policy::All)]
    pub policy: Policy,
    /// print the report as JSON
    #[arg(long, env = "FFN_JSON")]
    pub json: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Policy {
    Any,
    All,
}

impl From<Policy> for SuccessPolicy {
    fn from(value: Policy) -> Self {
        match value {
            Policy::Any => SuccessPolicy::Any,
            Policy::All => SuccessPolicy::All,
        }
    }
}

impl From<&Arguments> for ScrapeConfig {
    fn from(value: &Arguments) -> Self {
        ScrapeConfig {
            base_url: value.base_url.clone(),
            output_dir: value.output_dir.clone(),
            request_timeout: Duration::from_secs(value.timeout),
            max_attempts: value.attempts,
            initial_backoff: Duration::from_millis(value.backoff_ms),
            deadline: value.deadline.map(Duration::from_secs),
            ..ScrapeConfig::default()
        }
    }
}

/// One line per requested month.
fn summary(report: &ScrapeReport) -> Vec<String> {
    report
        .entries
        .iter()
        .map(|entry| {
            let subject = entry
                .target
                .map(|target| target.to_string())
                .unwrap_or_else(|| String::from("-"));
            match &entry.outcome {
                Outcome::Succeeded {
                    path,
                    events,
                    skipped,
                } => format!(
                    "ok\t{subject}\t{}\t{events} events, {skipped} skipped",
                    path.display()
                ),
                Outcome::Failed { kind, message } => {
                    format!("failed\t{subject}\t{kind:?}\t{message}")
                }
            }
        })
        .collect()
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("ffn_core=info,ffn_cli=info")),
        )
        .init();

    let args = Arguments::parse();
    let scraper = Scraper::from_config(&ScrapeConfig::from(&args))?;
    let today = chrono::Local::now().date_naive();
    info!(months = ?args.months, %today, "scraping");
    let report = scraper.scrape(&args.months, today).await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for line in summary(&report) {
            println!("{line}");
        }
    }
    Ok(if report.is_success(args.policy.into()) {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

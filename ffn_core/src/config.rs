use std::{path::PathBuf, time::Duration};

pub static DEFAULT_BASE_URL: &str = "https://www.forexfactory.com";
pub static DEFAULT_OUTPUT_DIR: &str = "news";
pub static DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0";

/// Settings shared by every scrape run.
#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    /// scheme and host of the calendar source, without a trailing slash
    pub base_url: String,
    /// directory the CSV files are written to
    pub output_dir: PathBuf,
    pub user_agent: String,
    /// timeout of a single HTTP request
    pub request_timeout: Duration,
    /// total number of attempts per month, the first one included
    pub max_attempts: u32,
    /// delay before the first retry, doubled for every further retry
    pub initial_backoff: Duration,
    /// ceiling on the whole run; months not started in time are reported as failed
    pub deadline: Option<Duration>,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            base_url: String::from(DEFAULT_BASE_URL),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            user_agent: String::from(DEFAULT_USER_AGENT),
            request_timeout: Duration::from_secs(30),
            max_attempts: 3,
            initial_backoff: Duration::from_millis(500),
            deadline: None,
        }
    }
}

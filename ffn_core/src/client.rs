//! This client fetches the monthly calendar page from the remote source.

use std::{future::Future, time::Duration};

use tracing::{debug, warn};

use crate::{config::ScrapeConfig, error::ScrapeError, month::MonthTarget};

/// Something the raw calendar of a month can be fetched from.
pub trait CalendarSource {
    fn fetch(
        &self,
        target: &MonthTarget,
    ) -> impl Future<Output = Result<String, ScrapeError>> + Send;
}

/// How often and how patiently transient failures are retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
}

impl RetryPolicy {
    /// The delay after the failed attempt number `attempt`, counted from 1.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.initial_backoff.saturating_mul(1 << exponent)
    }

    /// Run `operation` until it succeeds, fails permanently or runs out of attempts.
    ///
    /// `operation` receives the number of the current attempt.
    pub async fn run<T, F, Fut>(&self, mut operation: F) -> Result<T, ScrapeError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, ScrapeError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match operation(attempt).await {
                Err(err) if err.is_transient() && attempt < max_attempts => {
                    let delay = self.backoff(attempt);
                    warn!(attempt, max_attempts, ?delay, error = %err, "retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                result => return result,
            }
        }
    }
}

impl From<&ScrapeConfig> for RetryPolicy {
    fn from(config: &ScrapeConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            initial_backoff: config.initial_backoff,
        }
    }
}

/// Fetches calendar pages over HTTP.
#[derive(Debug, Clone)]
pub struct CalendarClient {
    client: reqwest::Client,
    base_url: String,
    retry: RetryPolicy,
}

impl CalendarClient {
    pub fn new(config: &ScrapeConfig) -> Result<Self, ScrapeError> {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        let client = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.request_timeout)
            .build()
            .map_err(|source| ScrapeError::Network {
                url: base_url.clone(),
                source,
            })?;
        Ok(Self {
            client,
            base_url,
            retry: RetryPolicy::from(config),
        })
    }

    /// The URL of the calendar page of a month.
    pub fn url(&self, target: &MonthTarget) -> String {
        format!("{}/calendar?month={}", self.base_url, target.query_value())
    }

    /// Send a single request, without retrying.
    async fn get_page(&self, url: &str) -> Result<String, ScrapeError> {
        let network_error = |source| ScrapeError::Network {
            url: url.to_string(),
            source,
        };
        let response = self.client.get(url).send().await.map_err(network_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(ScrapeError::Remote {
                url: url.to_string(),
                status,
            });
        }
        response.text().await.map_err(network_error)
    }
}

impl CalendarSource for CalendarClient {
    async fn fetch(&self, target: &MonthTarget) -> Result<String, ScrapeError> {
        let url = self.url(target);
        self.retry
            .run(|attempt| {
                debug!(%url, attempt, "requesting calendar");
                self.get_page(&url)
            })
            .await
    }
}

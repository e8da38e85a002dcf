//! The scrape orchestrator: fetch, parse and export one month after another.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::Serialize;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::{
    client::{CalendarClient, CalendarSource},
    config::ScrapeConfig,
    error::{ErrorKind, ScrapeError},
    export,
    month::{self, MonthTarget},
    parse,
};

/// Whether a run counts as successful.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SuccessPolicy {
    /// at least one month was scraped
    Any,
    /// every month was scraped and every specifier was valid
    #[default]
    All,
}

/// The outcome of one month or one specifier.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Succeeded {
        path: PathBuf,
        events: usize,
        skipped: usize,
    },
    Failed {
        kind: ErrorKind,
        message: String,
    },
}

impl From<&ScrapeError> for Outcome {
    fn from(err: &ScrapeError) -> Self {
        Outcome::Failed {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportEntry {
    /// `None` for specifiers which could not be resolved to a month
    pub target: Option<MonthTarget>,
    #[serde(flatten)]
    pub outcome: Outcome,
}

/// The outcomes of a run, in the order the months were requested.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScrapeReport {
    pub entries: Vec<ReportEntry>,
}

impl ScrapeReport {
    /// The months which were scraped, with the paths of their files.
    pub fn succeeded(&self) -> impl Iterator<Item = (&MonthTarget, &Path)> {
        self.entries.iter().filter_map(|entry| match (&entry.target, &entry.outcome) {
            (Some(target), Outcome::Succeeded { path, .. }) => Some((target, path.as_path())),
            _ => None,
        })
    }

    pub fn failed(&self) -> impl Iterator<Item = &ReportEntry> {
        self.entries
            .iter()
            .filter(|entry| matches!(entry.outcome, Outcome::Failed { .. }))
    }

    pub fn is_success(&self, policy: SuccessPolicy) -> bool {
        match policy {
            SuccessPolicy::Any => self.succeeded().next().is_some(),
            SuccessPolicy::All => !self.entries.is_empty() && self.failed().next().is_none(),
        }
    }

    fn push(&mut self, target: Option<MonthTarget>, outcome: Outcome) {
        self.entries.push(ReportEntry { target, outcome });
    }
}

/// Scrapes months from a calendar source into CSV files.
pub struct Scraper<S> {
    source: S,
    output_dir: PathBuf,
    deadline: Option<std::time::Duration>,
}

impl Scraper<CalendarClient> {
    /// A scraper reading from the remote calendar.
    pub fn from_config(config: &ScrapeConfig) -> Result<Self, ScrapeError> {
        let client = CalendarClient::new(config)?;
        Ok(Self::new(client, config))
    }
}

impl<S: CalendarSource> Scraper<S> {
    pub fn new(source: S, config: &ScrapeConfig) -> Self {
        Self {
            source,
            output_dir: config.output_dir.clone(),
            deadline: config.deadline,
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// The budget of a single run, if any.
    pub fn deadline(&self) -> Option<std::time::Duration> {
        self.deadline
    }

    /// Resolve `specifiers` relative to `reference` and scrape the resulting months.
    ///
    /// Invalid specifiers are reported as failures in their place.
    pub async fn scrape<T: AsRef<str>>(&self, specifiers: &[T], reference: NaiveDate) -> ScrapeReport {
        let mut targets = vec![];
        let mut report = ScrapeReport::default();
        for resolved in month::resolve(specifiers, reference) {
            match resolved {
                Ok(target) => targets.push(target),
                Err(err) => {
                    warn!(error = %err, "ignoring month specifier");
                    report.push(None, Outcome::from(&err));
                }
            }
        }
        report.entries.extend(self.run(&targets).await.entries);
        report
    }

    /// Scrape every target, one after another.
    ///
    /// A failing month never stops the run; its failure is recorded in the report instead.
    ///
    /// With a deadline, the month in progress when it passes is abandoned and every month after
    /// it is not started; all of them are reported as [`ErrorKind::DeadlineExceeded`].
    pub async fn run(&self, targets: &[MonthTarget]) -> ScrapeReport {
        let deadline = self.deadline.map(|deadline| Instant::now() + deadline);
        let mut report = ScrapeReport::default();
        for target in targets {
            let result = match deadline {
                None => self.scrape_month(target).await,
                Some(deadline) if Instant::now() >= deadline => Err(ScrapeError::DeadlineExceeded),
                Some(deadline) => tokio::time::timeout_at(deadline, self.scrape_month(target))
                    .await
                    .unwrap_or(Err(ScrapeError::DeadlineExceeded)),
            };
            let outcome = match result {
                Ok(outcome) => outcome,
                Err(err) => {
                    warn!(%target, error = %err, "failed to scrape month");
                    Outcome::from(&err)
                }
            };
            report.push(Some(*target), outcome);
        }
        report
    }

    async fn scrape_month(&self, target: &MonthTarget) -> Result<Outcome, ScrapeError> {
        let html = self.source.fetch(target).await?;
        let parsed = parse::parse(&html, target)?;
        if parsed.skipped > 0 {
            info!(%target, skipped = parsed.skipped, "skipped incomplete calendar rows");
        }
        let path = export::write(&self.output_dir, target, &parsed.events)?;
        Ok(Outcome::Succeeded {
            path,
            events: parsed.events.len(),
            skipped: parsed.skipped,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::HashMap,
        sync::{
            atomic::{AtomicU32, Ordering},
            Mutex,
        },
        time::Duration,
    };

    use chrono::{Month, NaiveDate};
    use tempfile::TempDir;

    use crate::{
        client::{CalendarSource, RetryPolicy},
        config::ScrapeConfig,
        error::{ErrorKind, ScrapeError},
        export,
        month::MonthTarget,
        scrape::{Outcome, ScrapeReport, Scraper, SuccessPolicy},
    };

    static PAGE: &str = r#"<table class="calendar__table"><tbody>
        <tr class="calendar__row" data-event-id="1">
            <td class="calendar__cell calendar__date">Mon Dec 1</td>
            <td class="calendar__cell calendar__time">3:00pm</td>
            <td class="calendar__cell calendar__currency">USD</td>
            <td class="calendar__cell calendar__impact"><span title="High Impact Expected"></span></td>
            <td class="calendar__cell calendar__event"><span class="calendar__event-title">ISM Manufacturing PMI</span></td>
            <td class="calendar__cell calendar__actual"></td>
            <td class="calendar__cell calendar__forecast">48.6%</td>
            <td class="calendar__cell calendar__previous">48.7%</td>
        </tr>
    </tbody></table>"#;

    /// A calendar source serving canned pages, failing for months without one.
    struct FakeSource {
        pages: HashMap<MonthTarget, &'static str>,
        retry: RetryPolicy,
        requests: AtomicU32,
        requested: Mutex<Vec<MonthTarget>>,
    }

    impl FakeSource {
        fn new(pages: &[(MonthTarget, &'static str)]) -> Self {
            Self {
                pages: pages.iter().copied().collect(),
                retry: RetryPolicy {
                    max_attempts: 3,
                    initial_backoff: Duration::from_millis(1),
                },
                requests: AtomicU32::new(0),
                requested: Mutex::new(vec![]),
            }
        }
    }

    impl CalendarSource for FakeSource {
        async fn fetch(&self, target: &MonthTarget) -> Result<String, ScrapeError> {
            self.requested.lock().unwrap().push(*target);
            self.retry
                .run(move |_| async move {
                    self.requests.fetch_add(1, Ordering::SeqCst);
                    match self.pages.get(target) {
                        Some(page) => Ok(page.to_string()),
                        None => Err(ScrapeError::Network {
                            url: target.query_value(),
                            source: network_error().await,
                        }),
                    }
                })
                .await
        }
    }

    /// A genuine connection error, from a port nobody listens on.
    async fn network_error() -> reqwest::Error {
        let addr = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap()
        };
        reqwest::get(format!("http://{addr}")).await.unwrap_err()
    }

    /// Answers December at once and stalls on every other month.
    struct StallingSource;

    impl CalendarSource for StallingSource {
        async fn fetch(&self, target: &MonthTarget) -> Result<String, ScrapeError> {
            if *target != december() {
                tokio::time::sleep(Duration::from_secs(60)).await;
            }
            Ok(PAGE.to_string())
        }
    }

    fn config(dir: &TempDir) -> ScrapeConfig {
        ScrapeConfig {
            output_dir: dir.path().to_path_buf(),
            ..ScrapeConfig::default()
        }
    }

    fn december() -> MonthTarget {
        MonthTarget::new(Month::December, 2025)
    }

    fn january() -> MonthTarget {
        MonthTarget::new(Month::January, 2026)
    }

    #[tokio::test]
    async fn test_run_isolates_failures() {
        let dir = TempDir::new().unwrap();
        let source = FakeSource::new(&[(december(), PAGE)]);
        let scraper = Scraper::new(source, &config(&dir));
        let report = scraper.run(&[january(), december()]).await;

        assert_eq!(report.entries.len(), 2);
        let failed: Vec<_> = report.failed().collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].target, Some(january()));
        assert!(matches!(
            failed[0].outcome,
            Outcome::Failed { kind: ErrorKind::NetworkError, .. }
        ));
        assert_eq!(scraper.source.requests.load(Ordering::SeqCst), 4);

        let succeeded: Vec<_> = report.succeeded().collect();
        assert_eq!(succeeded.len(), 1);
        assert_eq!(succeeded[0].0, &december());
        let events = export::read(succeeded[0].1).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].date, NaiveDate::from_ymd_opt(2025, 12, 1).unwrap());
        assert_eq!(events[0].time, "15:00");

        assert!(report.is_success(SuccessPolicy::Any));
        assert!(!report.is_success(SuccessPolicy::All));
    }

    #[tokio::test]
    async fn test_parse_failure_keeps_previous_file() {
        let dir = TempDir::new().unwrap();
        let source = FakeSource::new(&[(december(), PAGE)]);
        let scraper = Scraper::new(source, &config(&dir));
        scraper.run(&[december()]).await;

        let source = FakeSource::new(&[(december(), "<html>maintenance</html>")]);
        let scraper = Scraper::new(source, &config(&dir));
        let report = scraper.run(&[december()]).await;
        assert!(matches!(
            report.entries[0].outcome,
            Outcome::Failed { kind: ErrorKind::ParseError, .. }
        ));
        assert_eq!(scraper.source.requests.load(Ordering::SeqCst), 1);
        let events = export::read(&dir.path().join("December_2025_news.csv")).unwrap();
        assert_eq!(events.len(), 1);
    }

    #[tokio::test]
    async fn test_scrape_reports_invalid_specifiers() {
        let dir = TempDir::new().unwrap();
        let scraper = Scraper::new(FakeSource::new(&[]), &config(&dir));
        let report = scraper
            .scrape(&["bogus"], NaiveDate::from_ymd_opt(2025, 12, 3).unwrap())
            .await;
        assert_eq!(report.succeeded().count(), 0);
        assert_eq!(report.entries.len(), 1);
        assert_eq!(report.entries[0].target, None);
        match &report.entries[0].outcome {
            Outcome::Failed { kind, message } => {
                assert_eq!(*kind, ErrorKind::InvalidMonthSpecifier);
                assert!(message.contains("bogus"));
            }
            outcome => panic!("unexpected outcome {outcome:?}"),
        }
        assert!(scraper.source.requested.lock().unwrap().is_empty());
        assert!(!report.is_success(SuccessPolicy::Any));
    }

    #[tokio::test]
    async fn test_scrape_resolves_in_order() {
        let dir = TempDir::new().unwrap();
        let source = FakeSource::new(&[(december(), PAGE), (january(), PAGE)]);
        let scraper = Scraper::new(source, &config(&dir));
        let report = scraper
            .scrape(&["this", "next"], NaiveDate::from_ymd_opt(2025, 12, 3).unwrap())
            .await;
        assert!(report.is_success(SuccessPolicy::All));
        assert_eq!(
            *scraper.source.requested.lock().unwrap(),
            vec![december(), january()]
        );
        assert!(dir.path().join("January_2026_news.csv").is_file());
    }

    #[tokio::test]
    async fn test_run_respects_deadline() {
        let dir = TempDir::new().unwrap();
        let config = ScrapeConfig {
            deadline: Some(Duration::ZERO),
            ..config(&dir)
        };
        let scraper = Scraper::new(FakeSource::new(&[(december(), PAGE)]), &config);
        let report = scraper.run(&[december()]).await;
        assert!(matches!(
            report.entries[0].outcome,
            Outcome::Failed { kind: ErrorKind::DeadlineExceeded, .. }
        ));
        assert!(scraper.source.requested.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_deadline_abandons_month_in_progress() {
        let dir = TempDir::new().unwrap();
        let config = ScrapeConfig {
            deadline: Some(Duration::from_millis(500)),
            ..config(&dir)
        };
        let scraper = Scraper::new(StallingSource, &config);
        let report = tokio::time::timeout(
            Duration::from_secs(10),
            scraper.run(&[december(), january(), december()]),
        )
        .await
        .unwrap();

        assert_eq!(report.entries.len(), 3);
        assert!(matches!(
            report.entries[0].outcome,
            Outcome::Succeeded { events: 1, .. }
        ));
        for entry in &report.entries[1..] {
            assert!(matches!(
                entry.outcome,
                Outcome::Failed { kind: ErrorKind::DeadlineExceeded, .. }
            ));
        }
        assert_eq!(report.entries[1].target, Some(january()));
        assert!(dir.path().join("December_2025_news.csv").is_file());
        assert!(!dir.path().join("January_2026_news.csv").exists());
    }

    #[test]
    fn test_report_serialization() {
        let mut report = ScrapeReport::default();
        report.push(
            Some(december()),
            Outcome::Succeeded {
                path: "news/December_2025_news.csv".into(),
                events: 3,
                skipped: 0,
            },
        );
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["entries"][0]["status"], "succeeded");
        assert_eq!(json["entries"][0]["target"]["month"], "December");
        assert_eq!(json["entries"][0]["events"], 3);
    }
}

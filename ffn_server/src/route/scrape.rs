use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use ffn_core::{scrape::Outcome, ErrorKind, ScrapeReport, SuccessPolicy};
use serde::Serialize;

use crate::route::AppState;

#[derive(Debug, Serialize)]
pub struct ScrapeResponse {
    success: bool,
    message: String,
    months: Vec<String>,
    /// the file of the first scraped month
    #[serde(skip_serializing_if = "Option::is_none")]
    filename: Option<String>,
    report: ScrapeReport,
}

/// Split free-form input on commas, slashes and whitespace.
pub fn split_months(months: &str) -> Vec<String> {
    months
        .split(|c: char| c == ',' || c == '/' || c.is_whitespace())
        .filter(|month| !month.is_empty())
        .map(String::from)
        .collect()
}

fn respond(
    state: &AppState,
    months: Vec<String>,
    report: ScrapeReport,
) -> (StatusCode, Json<ScrapeResponse>) {
    let success = report.is_success(SuccessPolicy::All);
    let filename = report
        .succeeded()
        .next()
        .map(|(target, _)| target.file_name());
    let requested = if months.is_empty() {
        String::from("current month")
    } else {
        months.join(", ")
    };
    let timed_out = report.failed().any(|entry| {
        matches!(
            entry.outcome,
            Outcome::Failed {
                kind: ErrorKind::DeadlineExceeded,
                ..
            }
        )
    });
    let (status, message) = match (success, state.scraper.deadline()) {
        (true, _) => (
            StatusCode::OK,
            format!("Scraper completed successfully for: {requested}"),
        ),
        (false, Some(deadline)) if timed_out => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!(
                "Scraper timed out ({} seconds) for: {requested}",
                deadline.as_secs()
            ),
        ),
        (false, _) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Scraper failed for: {requested}"),
        ),
    };
    (
        status,
        Json(ScrapeResponse {
            success,
            message,
            months,
            filename,
            report,
        }),
    )
}

/// Handle scrape requests for the current month.
pub async fn current(State(state): State<AppState>) -> (StatusCode, Json<ScrapeResponse>) {
    let report = state.scrape::<&str>(&[]).await;
    respond(&state, vec![], report)
}

/// Handle scrape requests for specific months, e.g. `/scrape/this/next` or `/scrape/November,2025`.
pub async fn months(
    State(state): State<AppState>,
    Path(months): Path<String>,
) -> (StatusCode, Json<ScrapeResponse>) {
    let months = split_months(&months);
    let report = state.scrape(&months).await;
    respond(&state, months, report)
}

#[cfg(test)]
mod tests {
    use crate::route::scrape::split_months;

    #[test]
    fn test_split_months() {
        assert_eq!(split_months("this/next"), vec!["this", "next"]);
        assert_eq!(
            split_months("/November,2025, december 2025"),
            vec!["November", "2025", "december", "2025"]
        );
        assert!(split_months("//,").is_empty());
    }
}

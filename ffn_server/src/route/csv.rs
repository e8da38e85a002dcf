use std::{io::ErrorKind, path::Path};

use axum::{
    extract::{Path as UrlPath, State},
    http::header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    response::{IntoResponse, Response},
    Json,
};
use ffn_core::{export, month::parse_month, MonthTarget};
use serde::Serialize;
use tracing::warn;

use crate::{error::AppError, route::AppState};

/// Answer with the CSV file `file_name` from `dir` as an attachment.
async fn serve_file(dir: &Path, file_name: &str) -> Result<Response, AppError> {
    match tokio::fs::read(dir.join(file_name)).await {
        Ok(content) => Ok((
            [
                (CONTENT_TYPE, String::from("text/csv")),
                (
                    CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{file_name}\""),
                ),
            ],
            content,
        )
            .into_response()),
        Err(err) if err.kind() == ErrorKind::NotFound => Err(AppError::NotFound(format!(
            "CSV file not found: {file_name}"
        ))),
        Err(err) => Err(err.into()),
    }
}

/// Handle requests for the file of a specific month.
///
/// The month may be given in any case or abbreviated, e.g. `/csv/dec/2025`.
pub async fn month(
    State(state): State<AppState>,
    UrlPath((month, year)): UrlPath<(String, String)>,
) -> Result<Response, AppError> {
    let target = parse_month(&month).and_then(|month| {
        let year = year.parse().ok().filter(|year| (1000..=9999).contains(year))?;
        Some(MonthTarget::new(month, year))
    });
    let Some(target) = target else {
        return Err(AppError::NotFound(format!(
            "CSV file not found: {month}_{year}_news.csv"
        )));
    };
    serve_file(state.scraper.output_dir(), &target.file_name()).await
}

/// Handle requests for the file of the current month, refreshing it first.
///
/// A failed refresh still serves the previous file if there is one.
pub async fn current(State(state): State<AppState>) -> Result<Response, AppError> {
    let today = chrono::Local::now().date_naive();
    let target = MonthTarget::of(today);
    let report = state.scrape::<&str>(&[]).await;
    for failure in report.failed() {
        warn!(outcome = ?failure.outcome, "could not refresh the current month");
    }
    serve_file(state.scraper.output_dir(), &target.file_name())
        .await
        .map_err(|err| match err {
            AppError::NotFound(_) => AppError::NotFound(format!(
                "CSV file not found for current month: {}",
                target.file_name()
            )),
            err => err,
        })
}

#[derive(Debug, Serialize)]
pub struct FileList {
    count: usize,
    csv_files: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'static str>,
}

/// List the available CSV files, newest name first.
pub async fn list(State(state): State<AppState>) -> Result<Json<FileList>, AppError> {
    let csv_files = export::list(state.scraper.output_dir())?;
    let message = csv_files.is_empty().then_some("No CSV files found");
    Ok(Json(FileList {
        count: csv_files.len(),
        csv_files,
        message,
    }))
}

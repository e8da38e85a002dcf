pub mod csv;
pub mod scrape;

use std::sync::Arc;

use axum::{
    http::Uri,
    routing::{get, post},
    Json, Router,
};
use ffn_core::{client::CalendarClient, ScrapeReport, Scraper};
use serde::Serialize;
use tower_http::trace::TraceLayer;

use crate::error::AppError;

/// Shared by all handlers.
#[derive(Clone)]
pub struct AppState {
    /// a scraper with a run deadline, which bounds every scrape request
    pub scraper: Arc<Scraper<CalendarClient>>,
}

impl AppState {
    /// Scrape `months` relative to today.
    ///
    /// Months still running at the scraper's deadline are reported as failed, next to the months
    /// which already succeeded.
    pub async fn scrape<S: AsRef<str>>(&self, months: &[S]) -> ScrapeReport {
        let today = chrono::Local::now().date_naive();
        self.scraper.scrape(months, today).await
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/csv/current", get(csv::current))
        .route("/csv/list", get(csv::list))
        .route("/csv/:month/:year", get(csv::month))
        .route("/scrape", post(scrape::current))
        .route("/scrape/*months", post(scrape::months))
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Serialize)]
pub struct Home {
    message: &'static str,
    endpoints: Vec<Endpoint>,
}

#[derive(Debug, Serialize)]
pub struct Endpoint {
    method: &'static str,
    path: &'static str,
    description: &'static str,
}

/// List the available endpoints.
pub async fn home() -> Json<Home> {
    let endpoint = |method, path, description| Endpoint {
        method,
        path,
        description,
    };
    Json(Home {
        message: "Forex Factory News Scraper API",
        endpoints: vec![
            endpoint(
                "GET",
                "/csv/<month>/<year>",
                "Get CSV for a specific month/year (e.g., /csv/December/2025)",
            ),
            endpoint("GET", "/csv/current", "Get CSV for current month"),
            endpoint("GET", "/csv/list", "List all available CSV files"),
            endpoint("POST", "/scrape", "Run scraper for current month"),
            endpoint(
                "POST",
                "/scrape/<months>",
                "Run scraper for specific months (e.g., /scrape/this/next)",
            ),
        ],
    })
}

async fn not_found(uri: Uri) -> AppError {
    AppError::NoRoute {
        path: uri.path().to_string(),
    }
}

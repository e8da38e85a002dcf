//! This crate scrapes the monthly Forex Factory economic calendar and exports its news events
//! as one CSV file per month.
//!
//! The events are read from <https://www.forexfactory.com/calendar>.
//! The files are named `{Month}_{Year}_news.csv`, e.g. `November_2025_news.csv`.

pub mod client;
pub mod config;
pub mod error;
pub mod event;
pub mod export;
pub mod month;
pub mod parse;
pub mod scrape;

pub use config::ScrapeConfig;
pub use error::{ErrorKind, ScrapeError};
pub use event::{CalendarEvent, Impact, OtherImpact};
pub use month::MonthTarget;
pub use scrape::{ScrapeReport, Scraper, SuccessPolicy};

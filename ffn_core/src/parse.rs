//! This parser turns a monthly calendar page into calendar events.

use chrono::{Month, NaiveDate};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use crate::{
    error::ScrapeError,
    event::{CalendarEvent, Impact},
    month::{parse_month, MonthTarget},
};

static CLASS_DAY_BREAKER: &str = "calendar__row--day-breaker";
static ATTR_EVENT_ID: &str = "data-event-id";
static ALL_DAY: &str = "all day";

/// The events found on a calendar page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCalendar {
    pub events: Vec<CalendarEvent>,
    /// event rows dropped for lacking a date, a currency or an event name
    pub skipped: usize,
}

struct Selectors {
    table: Selector,
    row: Selector,
    date: Selector,
    time: Selector,
    currency: Selector,
    impact: Selector,
    impact_icon: Selector,
    event: Selector,
    event_title: Selector,
    actual: Selector,
    forecast: Selector,
    previous: Selector,
}

impl Selectors {
    fn parse() -> Self {
        Self {
            table: Selector::parse("table.calendar__table").unwrap(),
            row: Selector::parse("tr.calendar__row").unwrap(),
            date: Selector::parse("td.calendar__date").unwrap(),
            time: Selector::parse("td.calendar__time").unwrap(),
            currency: Selector::parse("td.calendar__currency").unwrap(),
            impact: Selector::parse("td.calendar__impact").unwrap(),
            impact_icon: Selector::parse("span").unwrap(),
            event: Selector::parse("td.calendar__event").unwrap(),
            event_title: Selector::parse(".calendar__event-title").unwrap(),
            actual: Selector::parse("td.calendar__actual").unwrap(),
            forecast: Selector::parse("td.calendar__forecast").unwrap(),
            previous: Selector::parse("td.calendar__previous").unwrap(),
        }
    }
}

/// Parse the calendar page of `target`.
///
/// The page only shows day and month, so the year is taken from `target`.
pub fn parse(html: &str, target: &MonthTarget) -> Result<ParsedCalendar, ScrapeError> {
    let selectors = Selectors::parse();
    let dom = Html::parse_document(html);
    let Some(table) = dom.select(&selectors.table).next() else {
        return Err(ScrapeError::Parse(String::from(
            "page does not contain a calendar table",
        )));
    };
    let date_regex = Regex::new(
        r"(?xi)
            \b
            (?P<month>jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]* # the month
            \s+
            (?P<day>\d{1,2}) # the day of the month
            \b
        ",
    )
    .unwrap();
    let time_regex = Regex::new(
        r"(?xi)
            ^
            (?P<hour>\d{1,2})
            :
            (?P<minute>\d{2})
            \s*
            (?P<meridiem>am|pm)
            $
        ",
    )
    .unwrap();
    let find_date = |text: &str| -> Option<NaiveDate> {
        let captures = date_regex.captures(text)?;
        let month = parse_month(&captures["month"])?;
        let day: u32 = captures["day"].parse().ok()?;
        NaiveDate::from_ymd_opt(year_of(month, target), month.number_from_month(), day)
    };
    let normalize_time = |text: &str| -> String {
        if text.eq_ignore_ascii_case(ALL_DAY) {
            return String::new();
        }
        let Some(captures) = time_regex.captures(text) else {
            return String::from(text);
        };
        let (Ok(hour), Ok(minute)) = (
            captures["hour"].parse::<u32>(),
            captures["minute"].parse::<u32>(),
        ) else {
            return String::from(text);
        };
        if !(1..=12).contains(&hour) || minute > 59 {
            return String::from(text);
        }
        let offset = if captures["meridiem"].eq_ignore_ascii_case("pm") {
            12
        } else {
            0
        };
        format!("{:02}:{:02}", hour % 12 + offset, minute)
    };

    let mut events = vec![];
    let mut skipped = 0;
    let mut current_date: Option<NaiveDate> = None;
    let mut current_time = String::new();
    for row in table.select(&selectors.row) {
        if row.value().classes().any(|class| class == CLASS_DAY_BREAKER) {
            if let Some(date) = find_date(&text_of(row)) {
                if current_date != Some(date) {
                    current_time.clear();
                }
                current_date = Some(date);
            }
            continue;
        }
        let Some(event_id) = row.value().attr(ATTR_EVENT_ID) else {
            continue;
        };
        if let Some(date) = cell_text(row, &selectors.date).as_deref().and_then(find_date) {
            if current_date != Some(date) {
                current_time.clear();
            }
            current_date = Some(date);
        }
        if let Some(time) = cell_text(row, &selectors.time).filter(|time| !time.is_empty()) {
            current_time = normalize_time(&time);
        }
        let currency = cell_text(row, &selectors.currency).unwrap_or_default();
        let event_name = row
            .select(&selectors.event_title)
            .next()
            .map(text_of)
            .or_else(|| cell_text(row, &selectors.event))
            .unwrap_or_default();
        let (Some(date), false, false) = (current_date, currency.is_empty(), event_name.is_empty())
        else {
            debug!(event_id, "skipping incomplete calendar row");
            skipped += 1;
            continue;
        };
        let impact = row
            .select(&selectors.impact)
            .next()
            .map(|cell| impact_of(cell, &selectors.impact_icon))
            .unwrap_or_else(|| Impact::normalize(""));
        events.push(CalendarEvent {
            date,
            time: current_time.clone(),
            currency,
            impact,
            event_name,
            forecast: cell_text(row, &selectors.forecast).unwrap_or_default(),
            previous: cell_text(row, &selectors.previous).unwrap_or_default(),
            actual: cell_text(row, &selectors.actual).unwrap_or_default(),
        });
    }
    Ok(ParsedCalendar { events, skipped })
}

/// The year a date of `month` shown on the page of `target` falls into.
///
/// Pages may spill over into the neighbouring month, across a year boundary.
fn year_of(month: Month, target: &MonthTarget) -> i32 {
    match (target.month, month) {
        (Month::December, Month::January) => target.year + 1,
        (Month::January, Month::December) => target.year - 1,
        _ => target.year,
    }
}

/// The text of an element with all whitespace collapsed.
fn text_of(element: ElementRef) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<&str>>()
        .join(" ")
}

fn cell_text(row: ElementRef, selector: &Selector) -> Option<String> {
    row.select(selector).next().map(text_of)
}

fn impact_of(cell: ElementRef, icon_selector: &Selector) -> Impact {
    let Some(icon) = cell.select(icon_selector).next() else {
        return Impact::normalize(&text_of(cell));
    };
    match icon.value().attr("title").map(str::trim) {
        Some(title) if !title.is_empty() => Impact::normalize(title),
        _ => Impact::normalize(icon.value().attr("class").unwrap_or_default()),
    }
}

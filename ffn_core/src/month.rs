//! Resolution of month specifiers like `this`, `next` or `November 2025` into concrete months.

use std::fmt;

use chrono::{Datelike, Month, Months, NaiveDate};
use serde::{ser::SerializeStruct, Serialize, Serializer};

use crate::error::ScrapeError;

static MONTHS: [Month; 12] = [
    Month::January,
    Month::February,
    Month::March,
    Month::April,
    Month::May,
    Month::June,
    Month::July,
    Month::August,
    Month::September,
    Month::October,
    Month::November,
    Month::December,
];

/// A concrete month of a concrete year, the unit of one scrape and one CSV file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MonthTarget {
    pub year: i32,
    pub month: Month,
}

impl MonthTarget {
    pub fn new(month: Month, year: i32) -> Self {
        Self { year, month }
    }

    /// The month containing `date`.
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: MONTHS[date.month0() as usize],
        }
    }

    /// The first day of the month.
    ///
    /// `None` if the year is outside of the range chrono can represent.
    pub fn first_day(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month.number_from_month(), 1)
    }

    /// Shift by a number of months, rolling the year over as needed.
    ///
    /// `None` if either end lies outside of the range chrono can represent.
    pub fn offset(&self, months: i32) -> Option<Self> {
        let first_day = self.first_day()?;
        let shifted = if months >= 0 {
            first_day.checked_add_months(Months::new(months.unsigned_abs()))
        } else {
            first_day.checked_sub_months(Months::new(months.unsigned_abs()))
        };
        shifted.map(Self::of)
    }

    pub fn next(&self) -> Option<Self> {
        self.offset(1)
    }

    pub fn previous(&self) -> Option<Self> {
        self.offset(-1)
    }

    /// The full English month name, e.g. `December`.
    pub fn month_name(&self) -> &'static str {
        self.month.name()
    }

    /// The name of the CSV file holding this month's events.
    ///
    /// Changing this function is a breaking change for every consumer of the files!
    pub fn file_name(&self) -> String {
        format!("{}_{}_news.csv", self.month_name(), self.year)
    }

    /// The calendar's `month` query value, e.g. `nov.2025`.
    pub fn query_value(&self) -> String {
        format!(
            "{}.{}",
            self.month_name()[..3].to_ascii_lowercase(),
            self.year
        )
    }
}

impl fmt::Display for MonthTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.month_name(), self.year)
    }
}

impl Serialize for MonthTarget {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("MonthTarget", 2)?;
        state.serialize_field("month", self.month_name())?;
        state.serialize_field("year", &self.year)?;
        state.end()
    }
}

/// Look up a month by its full English name or its three-letter abbreviation, ignoring case.
pub fn parse_month(token: &str) -> Option<Month> {
    let token = token.trim().to_ascii_lowercase();
    if token.len() < 3 {
        return None;
    }
    MONTHS.into_iter().find(|month| {
        let name = month.name().to_ascii_lowercase();
        name == token || name[..3] == token
    })
}

fn parse_year(token: &str) -> Option<i32> {
    let token = token.trim();
    if token.len() != 4 || !token.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    token.parse().ok()
}

/// Resolve month specifiers relative to `reference`.
///
/// An empty list resolves to the month of `reference`. A month name directly followed by a
/// four digit year is resolved to that year. Every other token is resolved on its own, and an
/// unknown token yields an error in its place without affecting the others.
pub fn resolve<S: AsRef<str>>(
    specifiers: &[S],
    reference: NaiveDate,
) -> Vec<Result<MonthTarget, ScrapeError>> {
    let current = MonthTarget::of(reference);
    let tokens: Vec<&str> = specifiers
        .iter()
        .map(|specifier| specifier.as_ref().trim())
        .filter(|token| !token.is_empty())
        .collect();
    if tokens.is_empty() {
        return vec![Ok(current)];
    }
    let mut resolved = Vec::with_capacity(tokens.len());
    let mut tokens = tokens.into_iter().peekable();
    while let Some(token) = tokens.next() {
        let target = match token.to_ascii_lowercase().as_str() {
            "current" | "this" => Ok(current),
            "next" => current
                .next()
                .ok_or_else(|| ScrapeError::InvalidMonthSpecifier(token.to_string())),
            "last" | "previous" | "prev" => current
                .previous()
                .ok_or_else(|| ScrapeError::InvalidMonthSpecifier(token.to_string())),
            _ => match parse_month(token) {
                Some(month) => {
                    let year = match tokens.peek().and_then(|next| parse_year(next)) {
                        Some(year) => {
                            tokens.next();
                            year
                        }
                        None => current.year,
                    };
                    Ok(MonthTarget::new(month, year))
                }
                None => Err(ScrapeError::InvalidMonthSpecifier(token.to_string())),
            },
        };
        resolved.push(target);
    }
    resolved
}

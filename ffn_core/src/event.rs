use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// The expected market impact of an event.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Impact {
    Low,
    Medium,
    High,
    /// Impact text the calendar uses besides the three levels, kept as found.
    Other(OtherImpact),
}

/// Impact text which is none of `low`, `medium` and `high`.
///
/// Only built through [`Impact::from`], so the three levels always read back as themselves.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OtherImpact(String);

impl OtherImpact {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Impact {
    /// Map the calendar's impact wording to a level.
    ///
    /// Both the icon titles (`High Impact Expected`) and the icon colors (`red`, `ora`, `yel`)
    /// are understood. Anything else is preserved verbatim.
    pub fn normalize(text: &str) -> Self {
        let text = text.trim();
        let lowercase = text.to_ascii_lowercase();
        let words: Vec<&str> = lowercase
            .split(|c: char| !c.is_ascii_alphanumeric())
            .filter(|word| !word.is_empty())
            .collect();
        let has = |candidates: &[&str]| words.iter().any(|word| candidates.contains(word));
        match () {
            _ if has(&["high", "red"]) => Impact::High,
            _ if has(&["medium", "ora", "orange"]) => Impact::Medium,
            _ if has(&["low", "yel", "yellow"]) => Impact::Low,
            _ => Impact::from(text),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Impact::Low => "low",
            Impact::Medium => "medium",
            Impact::High => "high",
            Impact::Other(text) => text.as_str(),
        }
    }
}

impl From<String> for Impact {
    fn from(value: String) -> Self {
        match value.as_str() {
            "low" => Impact::Low,
            "medium" => Impact::Medium,
            "high" => Impact::High,
            _ => Impact::Other(OtherImpact(value)),
        }
    }
}

impl From<&str> for Impact {
    fn from(value: &str) -> Self {
        Impact::from(String::from(value))
    }
}

impl From<Impact> for String {
    fn from(value: Impact) -> Self {
        match value {
            Impact::Other(OtherImpact(text)) => text,
            level => String::from(level.as_str()),
        }
    }
}

impl fmt::Display for Impact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the economic calendar.
///
/// `currency` and `event_name` are never empty. The other text fields are empty when the
/// calendar leaves them blank; an empty `time` means the event lasts all day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub date: NaiveDate,
    pub time: String,
    pub currency: String,
    pub impact: Impact,
    pub event_name: String,
    pub forecast: String,
    pub previous: String,
    pub actual: String,
}

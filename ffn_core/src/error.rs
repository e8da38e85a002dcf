use std::{io, path::PathBuf};

use serde::Serialize;
use thiserror::Error;

/// Everything that can go wrong while scraping a single month.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("invalid month specifier `{0}`")]
    InvalidMonthSpecifier(String),

    #[error("network error while requesting {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("remote calendar answered {status} for {url}")]
    Remote {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("calendar could not be parsed: {0}")]
    Parse(String),

    #[error("could not write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("run deadline exceeded before this month was started")]
    DeadlineExceeded,
}

/// The category of a [`ScrapeError`], as reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidMonthSpecifier,
    NetworkError,
    RemoteError,
    ParseError,
    WriteError,
    DeadlineExceeded,
}

impl ScrapeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ScrapeError::InvalidMonthSpecifier(_) => ErrorKind::InvalidMonthSpecifier,
            ScrapeError::Network { .. } => ErrorKind::NetworkError,
            ScrapeError::Remote { .. } => ErrorKind::RemoteError,
            ScrapeError::Parse(_) => ErrorKind::ParseError,
            ScrapeError::Write { .. } => ErrorKind::WriteError,
            ScrapeError::DeadlineExceeded => ErrorKind::DeadlineExceeded,
        }
    }

    /// Whether retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, ScrapeError::Network { .. } | ScrapeError::Remote { .. })
    }

    pub(crate) fn write(path: impl Into<PathBuf>, source: impl Into<io::Error>) -> Self {
        ScrapeError::Write {
            path: path.into(),
            source: source.into(),
        }
    }
}

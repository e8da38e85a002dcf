//! Writing and reading the per month CSV files.

use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use tempfile::NamedTempFile;
use tracing::info;

use crate::{error::ScrapeError, event::CalendarEvent, month::MonthTarget};

/// The columns of every CSV file, in order.
pub static HEADER: [&str; 8] = [
    "date",
    "time",
    "currency",
    "impact",
    "event_name",
    "forecast",
    "previous",
    "actual",
];

/// The path of the CSV file of `target` inside `dir`.
pub fn path(dir: &Path, target: &MonthTarget) -> PathBuf {
    dir.join(target.file_name())
}

/// Write the events of `target` to its CSV file inside `dir` and return the file's path.
///
/// The events are written to a temporary file next to the destination, which then atomically
/// replaces any previous file. Readers see either the old or the new file, never a partial one.
pub fn write(
    dir: &Path,
    target: &MonthTarget,
    events: &[CalendarEvent],
) -> Result<PathBuf, ScrapeError> {
    let destination = path(dir, target);
    fs::create_dir_all(dir).map_err(|err| ScrapeError::write(dir, err))?;
    let temp_file = NamedTempFile::new_in(dir).map_err(|err| ScrapeError::write(dir, err))?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(temp_file);
    writer
        .write_record(HEADER)
        .map_err(|err| ScrapeError::write(&destination, err))?;
    for event in events {
        writer
            .serialize(event)
            .map_err(|err| ScrapeError::write(&destination, err))?;
    }
    let mut temp_file = writer
        .into_inner()
        .map_err(|err| ScrapeError::write(&destination, err.into_error()))?;
    temp_file
        .flush()
        .and_then(|()| temp_file.as_file().sync_all())
        .map_err(|err| ScrapeError::write(&destination, err))?;
    temp_file
        .persist(&destination)
        .map_err(|err| ScrapeError::write(&destination, err.error))?;
    info!(path = %destination.display(), events = events.len(), "wrote calendar");
    Ok(destination)
}

/// Read the events back from a CSV file written by [`write`].
pub fn read(path: &Path) -> Result<Vec<CalendarEvent>, csv::Error> {
    csv::Reader::from_path(path)?.deserialize().collect()
}

/// The names of all CSV files inside `dir`, newest name first.
///
/// A missing directory has no files.
pub fn list(dir: &Path) -> std::io::Result<Vec<String>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(vec![]),
        Err(err) => return Err(err),
    };
    let mut names = vec![];
    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str().filter(|name| name.ends_with(".csv")) {
            names.push(name.to_string());
        }
    }
    names.sort_unstable_by(|a, b| b.cmp(a));
    Ok(names)
}

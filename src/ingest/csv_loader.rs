// src/ingest/csv_loader.rs - CSV decoding of time-tracking exports

use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::io::{Read, Write};

use super::timestamp::parse_timestamp;
use crate::models::core::{RawTimeEntry, TimeEntry};

impl From<RawTimeEntry> for TimeEntry {
    fn from(raw: RawTimeEntry) -> Self {
        let timestamp = parse_timestamp(&raw.timestamp);
        if timestamp.is_none() && !raw.timestamp.trim().is_empty() {
            debug!("Unparseable timestamp '{}' left missing", raw.timestamp);
        }
        TimeEntry {
            user: raw.user.filter(|u| !u.trim().is_empty()),
            hours: raw.hours.unwrap_or(f64::NAN),
            project: raw.project,
            timestamp,
        }
    }
}

/// Decodes an export with a header row. Unknown columns are ignored.
pub fn load_csv_from_reader<R: Read>(reader: R) -> Result<Vec<TimeEntry>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .flexible(true)
        .from_reader(reader);

    let mut entries = Vec::new();
    for (line, record) in csv_reader.deserialize::<RawTimeEntry>().enumerate() {
        let raw = record.with_context(|| format!("Failed to decode CSV record {}", line + 1))?;
        entries.push(TimeEntry::from(raw));
    }

    let missing = entries.iter().filter(|e| e.timestamp.is_none()).count();
    if missing > 0 {
        warn!("{} of {} rows have no usable timestamp", missing, entries.len());
    }
    Ok(entries)
}

/// Downloads the export at `url` and decodes it.
pub async fn load_csv(url: &str) -> Result<Vec<TimeEntry>> {
    info!("Downloading time-tracking export from {}", url);
    let response = reqwest::get(url)
        .await
        .with_context(|| format!("Request to {} failed", url))?
        .error_for_status()
        .with_context(|| format!("Download from {} returned an error status", url))?;
    let body = response
        .bytes()
        .await
        .context("Failed to read export body")?;
    debug!("Downloaded {} bytes", body.len());
    load_csv_from_reader(body.as_ref())
}

/// Writes entries with a header row in `user,hours,project,timestamp` order.
pub fn write_csv<W: Write>(entries: &[TimeEntry], writer: W) -> Result<()> {
    let mut csv_writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Necessary)
        .from_writer(writer);
    for entry in entries {
        csv_writer
            .serialize(entry)
            .context("Failed to serialize time entry")?;
    }
    csv_writer.flush().context("Failed to flush CSV writer")?;
    Ok(())
}

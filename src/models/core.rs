// src/models/core.rs - Time entry rows and per-label records

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Column names of a time entry, in load order.
pub const TIME_ENTRY_COLUMNS: [&str; 4] = ["user", "hours", "project", "timestamp"];

/// Columns that can drive day partitioning on load.
pub const DATE_FIELDS: [&str; 1] = ["timestamp"];

/// One row of the time-tracking export as it appears in the CSV.
#[derive(Debug, Clone, Deserialize)]
pub struct RawTimeEntry {
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub user: Option<String>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub hours: Option<f64>,
    #[serde(default)]
    pub project: String,
    #[serde(default)]
    pub timestamp: String,
}

/// A time entry with its timestamp parsed. Used for both the raw and the cleaned dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeEntry {
    pub user: Option<String>,
    pub hours: f64,
    pub project: String,
    /// `None` when neither parse stage understood the source text.
    pub timestamp: Option<NaiveDateTime>,
}

impl TimeEntry {
    pub fn new(user: Option<&str>, hours: f64, project: &str, timestamp: Option<NaiveDateTime>) -> Self {
        Self {
            user: user.map(|u| u.to_string()),
            hours,
            project: project.to_string(),
            timestamp,
        }
    }

    /// Rows without a user or with a non-positive (or missing) duration are not billable.
    pub fn is_billable(&self) -> bool {
        self.user.is_some() && self.hours > 0.0
    }
}

/// A distinct project label after phonetic sorting and adjacency scoring.
///
/// `previous` is the label immediately before this one in the sorted order and
/// `similarity_to_prev` its score against it; both are `None` for the first record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelRecord {
    pub label: String,
    pub count: usize,
    pub phonetic_code: String,
    pub previous: Option<String>,
    pub similarity_to_prev: Option<u8>,
}

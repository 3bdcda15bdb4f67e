use chrono::NaiveDateTime;
use serde::Serialize;

/// Counters collected over one cleaning run.
#[derive(Debug, Clone, Serialize)]
pub struct CleaningStats {
    pub run_id: String,
    pub run_timestamp: NaiveDateTime,
    pub raw_rows: usize,
    pub cleaned_rows: usize,
    pub distinct_labels: usize,
    pub clusters: usize,
    pub corrected_labels: usize,
    pub dropped_missing_user: usize,
    pub dropped_non_positive_hours: usize,
    pub unparseable_timestamps: usize,
}

impl CleaningStats {
    pub fn new(run_id: &str, run_timestamp: NaiveDateTime) -> Self {
        Self {
            run_id: run_id.to_string(),
            run_timestamp,
            raw_rows: 0,
            cleaned_rows: 0,
            distinct_labels: 0,
            clusters: 0,
            corrected_labels: 0,
            dropped_missing_user: 0,
            dropped_non_positive_hours: 0,
            unparseable_timestamps: 0,
        }
    }
}

/// Result of a warehouse write. A rejected write is a value, not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WriteOutcome {
    pub success: bool,
    pub error: Option<String>,
}

impl WriteOutcome {
    pub fn succeeded() -> Self {
        Self { success: true, error: None }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(reason.into()),
        }
    }
}

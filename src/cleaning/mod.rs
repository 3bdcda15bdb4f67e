// src/cleaning/mod.rs - End-to-end cleaning run over a time-tracking export

pub mod correction;

use anyhow::{Context, Result};
use chrono::Utc;
use std::collections::HashSet;
use std::future::Future;
use uuid::Uuid;

use crate::clustering::{construct_projects_table, extract_clusters, generate_correction_map, CanonicalRule, CorrectionMap};
use crate::ingest::{generate_url, load_csv};
use crate::models::core::TimeEntry;
use crate::models::stats_models::CleaningStats;
use crate::utils::progress_bars::logging::CleaningLogger;

pub use correction::{apply_correction, clean_entries, correct_label, CleanReport, StaticOverrides};

#[derive(Debug, Clone, Default)]
pub struct CleaningOptions {
    pub canonical_rule: CanonicalRule,
    pub overrides: StaticOverrides,
}

#[derive(Debug, Clone)]
pub struct CleaningOutput {
    pub raw: Vec<TimeEntry>,
    pub cleaned: Vec<TimeEntry>,
    pub correction_map: CorrectionMap,
    pub stats: CleaningStats,
}

/// Builds the correction map from the raw project column and applies it.
pub fn clean_dataset(raw: Vec<TimeEntry>, options: &CleaningOptions, logger: &CleaningLogger) -> CleaningOutput {
    let run_id = Uuid::new_v4().to_string();
    let mut stats = CleaningStats::new(&run_id, Utc::now().naive_utc());
    logger.log_debug(&format!("Cleaning run ID: {}", run_id));
    stats.raw_rows = raw.len();
    stats.unparseable_timestamps = raw.iter().filter(|e| e.timestamp.is_none()).count();
    logger.log_unparseable_timestamps(stats.unparseable_timestamps);

    logger.log_phase("Building projects table", Some("ranking, phonetic sort, adjacency scores"));
    let projects_table = construct_projects_table(raw.iter().map(|e| e.project.as_str()));
    let phonetic_codes: HashSet<&str> = projects_table.iter().map(|r| r.phonetic_code.as_str()).collect();
    stats.distinct_labels = projects_table.len();
    logger.log_projects_table(projects_table.len(), phonetic_codes.len());

    logger.log_phase("Generating correction map", None);
    let clusters = extract_clusters(projects_table);
    let correction_map = generate_correction_map(&clusters, options.canonical_rule);
    stats.clusters = clusters.len();
    logger.log_corrections(clusters.len(), correction_map.len(), correction_map.corrections());
    for (label, canonical) in correction_map.iter().filter(|(k, v)| k != v) {
        logger.log_debug(&format!("'{}' -> '{}'", label, canonical));
    }

    logger.log_phase("Cleaning rows", None);
    let (cleaned, report) = clean_entries(&raw, &correction_map, &options.overrides);
    stats.cleaned_rows = cleaned.len();
    stats.corrected_labels = report.rewritten_labels;
    stats.dropped_missing_user = report.dropped_missing_user;
    stats.dropped_non_positive_hours = report.dropped_non_positive_hours;
    logger.log_filtering_results(raw.len(), cleaned.len(), report.dropped_missing_user, report.dropped_non_positive_hours);
    logger.log_completion(stats.cleaned_rows, stats.corrected_labels);

    CleaningOutput {
        raw,
        cleaned,
        correction_map,
        stats,
    }
}

/// Downloads the export behind a shared-drive link and cleans it.
pub async fn cleaning_process(link: &str, options: &CleaningOptions) -> Result<CleaningOutput> {
    cleaning_process_with(link, options, |url| async move { load_csv(&url).await }).await
}

/// Same as [`cleaning_process`] with the download step supplied by the caller.
pub async fn cleaning_process_with<F, Fut>(link: &str, options: &CleaningOptions, fetch: F) -> Result<CleaningOutput>
where
    F: FnOnce(String) -> Fut,
    Fut: Future<Output = Result<Vec<TimeEntry>>>,
{
    let logger = CleaningLogger::new();
    let url = generate_url(link).context("Failed to build download URL from link")?;

    logger.log_start(link);
    logger.log_phase("Loading data", Some(&url));
    let raw = fetch(url.clone())
        .await
        .with_context(|| format!("Failed to load CSV from {}", url))?;
    logger.log_data_loaded(raw.len(), "time entry");

    Ok(clean_dataset(raw, options, &logger))
}

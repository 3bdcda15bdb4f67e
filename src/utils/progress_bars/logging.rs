// src/utils/progress_bars/logging.rs - Phase logging helpers for the cleaning run
use log::{debug, info, warn};
use std::time::Instant;

#[derive(Clone)]
pub struct CleaningLogger {
    stage_name: &'static str,
    stage_emoji: &'static str,
    start_time: Instant,
}

impl CleaningLogger {
    pub fn new() -> Self {
        Self::for_stage("CLEAN", "🧹")
    }

    pub fn for_stage(stage_name: &'static str, stage_emoji: &'static str) -> Self {
        Self {
            stage_name,
            stage_emoji,
            start_time: Instant::now(),
        }
    }

    pub fn log_start(&self, source: &str) {
        info!(
            "[{}] {} 🚀 Starting {} run",
            self.stage_name,
            self.stage_emoji,
            self.stage_name.to_lowercase()
        );
        info!("[{}] {} ⚙️  Source: {}", self.stage_name, self.stage_emoji, source);
    }

    pub fn log_phase(&self, phase: &str, details: Option<&str>) {
        let elapsed = self.start_time.elapsed();
        let msg = if let Some(details) = details {
            format!(
                "[{}] {} 🔄 Phase: {} - {} [+{:.1}s]",
                self.stage_name, self.stage_emoji, phase, details, elapsed.as_secs_f32()
            )
        } else {
            format!(
                "[{}] {} 🔄 Phase: {} [+{:.1}s]",
                self.stage_name, self.stage_emoji, phase, elapsed.as_secs_f32()
            )
        };
        info!("{}", msg);
    }

    pub fn log_data_loaded(&self, count: usize, data_type: &str) {
        info!(
            "[{}] {} 📊 Loaded {} {} rows",
            self.stage_name, self.stage_emoji, count, data_type
        );
    }

    pub fn log_unparseable_timestamps(&self, count: usize) {
        if count > 0 {
            warn!(
                "[{}] {} ⚠️  {} timestamps could not be parsed and were left missing",
                self.stage_name, self.stage_emoji, count
            );
        }
    }

    pub fn log_projects_table(&self, distinct_labels: usize, phonetic_codes: usize) {
        info!(
            "[{}] {} 🔤 {} distinct project labels across {} phonetic codes",
            self.stage_name, self.stage_emoji, distinct_labels, phonetic_codes
        );
    }

    pub fn log_corrections(&self, clusters: usize, mapped: usize, rewritten: usize) {
        if clusters > 0 {
            info!(
                "[{}] {} 🔗 {} clusters → {} mapped labels ({} rewritten)",
                self.stage_name, self.stage_emoji, clusters, mapped, rewritten
            );
        } else {
            info!(
                "[{}] {} ✨ No near-duplicate project labels found",
                self.stage_name, self.stage_emoji
            );
        }
    }

    pub fn log_filtering_results(&self, raw: usize, kept: usize, missing_user: usize, non_positive_hours: usize) {
        let percent_kept = if raw > 0 {
            (kept as f64 / raw as f64) * 100.0
        } else {
            0.0
        };
        info!(
            "[{}] {} 🎯 Row filtering: {} total → {} kept ({:.1}% kept)",
            self.stage_name, self.stage_emoji, raw, kept, percent_kept
        );
        if missing_user + non_positive_hours > 0 {
            info!(
                "[{}] {} 🚫 Dropped: {} rows without user, {} rows with non-positive hours",
                self.stage_name, self.stage_emoji, missing_user, non_positive_hours
            );
        }
    }

    pub fn log_completion(&self, cleaned_rows: usize, corrected_labels: usize) {
        let elapsed = self.start_time.elapsed();
        info!(
            "[{}] {} ✅ Completed in {:.2?}: {} cleaned rows, {} label corrections",
            self.stage_name, self.stage_emoji, elapsed, cleaned_rows, corrected_labels
        );
    }

    pub fn log_debug(&self, message: &str) {
        debug!("[{}] {} 🔍 {}", self.stage_name, self.stage_emoji, message);
    }

    pub fn log_warning(&self, message: &str) {
        warn!("[{}] {} ⚠️  {}", self.stage_name, self.stage_emoji, message);
    }
}

impl Default for CleaningLogger {
    fn default() -> Self {
        Self::new()
    }
}

// src/utils/progress_bars/progress_config.rs

use indicatif::{ProgressBar, ProgressStyle};
use std::env;

const PHASE_TEMPLATE: &str = "{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}";

/// Phase bar settings for a cleaning or load run
#[derive(Debug, Clone)]
pub struct ProgressConfig {
    pub enabled: bool,
    /// Append process memory (MB) to phase messages
    pub show_memory: bool,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            show_memory: true,
        }
    }
}

/// Boolean env flag; unset or unparseable values fall back to `default`.
fn env_flag(name: &str, default: bool) -> bool {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<bool>().ok())
        .unwrap_or(default)
}

impl ProgressConfig {
    /// Reads `PROGRESS_ENABLED` and `PROGRESS_SHOW_MEMORY`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            enabled: env_flag("PROGRESS_ENABLED", defaults.enabled),
            show_memory: env_flag("PROGRESS_SHOW_MEMORY", defaults.show_memory),
        }
    }

    /// A bar with one step per phase, or None when progress is off
    pub fn create_phase_bar(&self, phases: u64) -> Option<ProgressBar> {
        if !self.enabled {
            return None;
        }
        let style = ProgressStyle::default_bar()
            .template(PHASE_TEMPLATE)
            .map(|s| s.progress_chars("█▉▊▋▌▍▎▏  "))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        let pb = ProgressBar::new(phases);
        pb.set_style(style);
        pb.set_message("Starting...");
        Some(pb)
    }

    pub fn should_show_memory(&self) -> bool {
        self.enabled && self.show_memory
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_from_env() {
        env::set_var("PROGRESS_ENABLED", "false");
        env::set_var("PROGRESS_SHOW_MEMORY", "not-a-bool");

        let from_env = ProgressConfig::from_env();
        assert!(!from_env.enabled);
        // garbage falls back to the default
        assert!(from_env.show_memory);
        assert!(!from_env.should_show_memory());

        env::remove_var("PROGRESS_ENABLED");
        env::remove_var("PROGRESS_SHOW_MEMORY");
    }

    #[test]
    fn test_phase_bar_follows_enabled() {
        let on = ProgressConfig::default();
        let bar = on.create_phase_bar(3).unwrap();
        assert_eq!(bar.length(), Some(3));

        let off = ProgressConfig {
            enabled: false,
            show_memory: true,
        };
        assert!(off.create_phase_bar(3).is_none());
    }
}

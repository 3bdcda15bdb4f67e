// src/cleaning/correction.rs - Correction applier and row filter

use log::debug;
use std::collections::{HashMap, HashSet};

use crate::clustering::CorrectionMap;
use crate::models::core::TimeEntry;

/// Known synonym corrections that phonetic and fuzzy matching cannot discover.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticOverrides {
    entries: HashMap<String, String>,
}

impl Default for StaticOverrides {
    fn default() -> Self {
        Self::from_pairs([("traffic", "transit"), ("misc", "miscellaneous")])
    }
}

impl StaticOverrides {
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    pub fn from_pairs<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        Self {
            entries: pairs
                .into_iter()
                .map(|(from, to)| (from.to_string(), to.to_string()))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn apply(&self, label: &str) -> String {
        self.entries
            .get(label)
            .map(String::as_str)
            .unwrap_or(label)
            .to_string()
    }
}

/// `correction_map[value]` when present, otherwise `value`.
pub fn apply_correction(correction_map: &CorrectionMap, value: &str) -> String {
    correction_map.apply(value)
}

/// Computed map first, then static overrides, repeated until the label stops
/// changing so a second pass over the output is a no-op. A cycle stops at the
/// first label seen twice.
pub fn correct_label(correction_map: &CorrectionMap, overrides: &StaticOverrides, value: &str) -> String {
    let mut current = value.to_string();
    let mut seen: HashSet<String> = HashSet::new();
    loop {
        let next = overrides.apply(&apply_correction(correction_map, &current));
        if next == current {
            return next;
        }
        if !seen.insert(current.clone()) {
            debug!("Correction cycle reached at '{}' while resolving '{}'", current, value);
            return current;
        }
        current = next;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanReport {
    pub dropped_missing_user: usize,
    pub dropped_non_positive_hours: usize,
    pub rewritten_labels: usize,
}

/// Drops rows without a user or with non-positive hours, corrects project
/// labels and keeps timestamps naive.
pub fn clean_entries(
    entries: &[TimeEntry],
    correction_map: &CorrectionMap,
    overrides: &StaticOverrides,
) -> (Vec<TimeEntry>, CleanReport) {
    let mut report = CleanReport::default();
    let mut resolved: HashMap<&str, String> = HashMap::new();
    let mut cleaned = Vec::with_capacity(entries.len());

    for entry in entries {
        if entry.user.is_none() {
            report.dropped_missing_user += 1;
            continue;
        }
        if !entry.is_billable() {
            report.dropped_non_positive_hours += 1;
            continue;
        }
        let project = resolved
            .entry(entry.project.as_str())
            .or_insert_with(|| correct_label(correction_map, overrides, &entry.project))
            .clone();
        if project != entry.project {
            report.rewritten_labels += 1;
        }
        cleaned.push(TimeEntry {
            user: entry.user.clone(),
            hours: entry.hours,
            project,
            timestamp: entry.timestamp,
        });
    }
    (cleaned, report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn entry(user: Option<&str>, hours: f64, project: &str) -> TimeEntry {
        let ts = NaiveDate::from_ymd_opt(2019, 9, 27)
            .unwrap()
            .and_hms_opt(0, 0, 0);
        TimeEntry::new(user, hours, project, ts)
    }

    fn ops_map() -> CorrectionMap {
        let mut map = CorrectionMap::new();
        map.insert("opdandadmin", "opsandadmin");
        map.insert("opsadadmin", "opsandadmin");
        map.insert("opsandadmin", "opsandadmin");
        map
    }

    #[test]
    fn test_apply_correction_lookup_or_identity() {
        let map = ops_map();
        assert_eq!(apply_correction(&map, "opdandadmin"), "opsandadmin");
        assert_eq!(apply_correction(&map, "hiring"), "hiring");
    }

    #[test]
    fn test_static_overrides_after_computed_map() {
        let mut map = CorrectionMap::new();
        map.insert("trafic", "traffic");
        let overrides = StaticOverrides::default();
        assert_eq!(correct_label(&map, &overrides, "trafic"), "transit");
        assert_eq!(correct_label(&map, &overrides, "misc"), "miscellaneous");
        assert_eq!(correct_label(&map, &overrides, "hiring"), "hiring");
    }

    #[test]
    fn test_correction_reaches_fixed_point() {
        let mut map = CorrectionMap::new();
        map.insert("transit", "transitt");
        let overrides = StaticOverrides::default();
        let once = correct_label(&map, &overrides, "traffic");
        assert_eq!(once, "transitt");
        assert_eq!(correct_label(&map, &overrides, &once), once);
    }

    #[test]
    fn test_correction_cycle_terminates() {
        let mut map = CorrectionMap::new();
        map.insert("a", "b");
        let overrides = StaticOverrides::from_pairs([("b", "a")]);
        let result = correct_label(&map, &overrides, "a");
        assert_eq!(result, "a");
        assert_eq!(correct_label(&map, &overrides, &result), result);
    }

    #[test]
    fn test_clean_entries_filters_and_corrects() {
        let entries = vec![
            entry(Some("ana"), 2.0, "opdandadmin"),
            entry(None, 3.0, "opsandadmin"),
            entry(Some("ben"), 0.0, "hiring"),
            entry(Some("ben"), -1.0, "hiring"),
            entry(Some("cy"), f64::NAN, "hiring"),
            entry(Some("cy"), 1.5, "traffic"),
        ];
        let (cleaned, report) = clean_entries(&entries, &ops_map(), &StaticOverrides::default());

        assert_eq!(cleaned.len(), 2);
        assert_eq!(cleaned[0].project, "opsandadmin");
        assert_eq!(cleaned[1].project, "transit");
        assert_eq!(report.dropped_missing_user, 1);
        assert_eq!(report.dropped_non_positive_hours, 3);
        assert_eq!(report.rewritten_labels, 2);
        assert!(cleaned.iter().all(|e| e.user.is_some() && e.hours > 0.0));
    }

    #[test]
    fn test_clean_entries_is_idempotent() {
        let entries = vec![
            entry(Some("ana"), 2.0, "opdandadmin"),
            entry(Some("ana"), 2.0, "opsadadmin"),
            entry(Some("cy"), 1.5, "misc"),
        ];
        let map = ops_map();
        let overrides = StaticOverrides::default();
        let (once, _) = clean_entries(&entries, &map, &overrides);
        let (twice, report) = clean_entries(&once, &map, &overrides);
        assert_eq!(once, twice);
        assert_eq!(report.rewritten_labels, 0);
    }

    #[test]
    fn test_clean_entries_empty() {
        let (cleaned, report) = clean_entries(&[], &CorrectionMap::new(), &StaticOverrides::default());
        assert!(cleaned.is_empty());
        assert_eq!(report, CleanReport::default());
    }

    #[test]
    fn test_injected_overrides_replace_defaults() {
        let overrides = StaticOverrides::from_pairs([("leave", "time-off")]);
        assert_eq!(overrides.len(), 1);
        assert_eq!(correct_label(&CorrectionMap::new(), &overrides, "traffic"), "traffic");
        assert_eq!(correct_label(&CorrectionMap::new(), &overrides, "leave"), "time-off");
        assert!(StaticOverrides::empty().is_empty());
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn cleaning_twice_equals_cleaning_once(
                projects in prop::collection::vec("[a-z]{0,8}", 0..20),
                pairs in prop::collection::vec(("[a-z]{1,4}", "[a-z]{1,4}"), 0..6),
            ) {
                let map: CorrectionMap = pairs.iter().cloned().collect();
                let overrides = StaticOverrides::default();
                let entries: Vec<TimeEntry> = projects
                    .iter()
                    .map(|p| entry(Some("ana"), 1.0, p))
                    .collect();

                let (once, _) = clean_entries(&entries, &map, &overrides);
                let (twice, _) = clean_entries(&once, &map, &overrides);
                prop_assert_eq!(once, twice);
            }

            #[test]
            fn unmapped_labels_pass_through(label in "[a-z]{0,12}") {
                let map = ops_map();
                prop_assume!(map.get(&label).is_none());
                prop_assert_eq!(apply_correction(&map, &label), label);
            }
        }
    }
}

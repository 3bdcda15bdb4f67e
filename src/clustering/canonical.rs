// src/clustering/canonical.rs - Canonical label choice and the correction map

use log::debug;
use serde::Serialize;
use std::collections::BTreeMap;

use super::label_clustering::{extract_clusters, Cluster};
use crate::matching::{group_by_phonetics, rank_labels, score_adjacent};
use crate::models::core::LabelRecord;

/// How the representative of a cluster is picked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CanonicalRule {
    /// First member after sorting members by label, descending.
    #[default]
    LabelDescending,
    /// First member after sorting members by occurrence count, descending
    /// (ties broken by label, descending).
    CountDescending,
}

impl CanonicalRule {
    pub fn pick<'a>(&self, members: &'a [LabelRecord]) -> Option<&'a LabelRecord> {
        match self {
            CanonicalRule::LabelDescending => members.iter().max_by(|a, b| a.label.cmp(&b.label)),
            CanonicalRule::CountDescending => members
                .iter()
                .max_by(|a, b| a.count.cmp(&b.count).then_with(|| a.label.cmp(&b.label))),
        }
    }
}

/// Raw label -> canonical label. Unknown labels map to themselves.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CorrectionMap {
    entries: BTreeMap<String, String>,
}

impl CorrectionMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, label: &str) -> Option<&str> {
        self.entries.get(label).map(String::as_str)
    }

    pub fn insert(&mut self, label: impl Into<String>, canonical: impl Into<String>) {
        self.entries.insert(label.into(), canonical.into());
    }

    /// Later entries overwrite earlier ones on key collision.
    pub fn merge(&mut self, other: CorrectionMap) {
        self.entries.extend(other.entries);
    }

    /// `map[label]` when present, otherwise `label` unchanged.
    pub fn apply(&self, label: &str) -> String {
        self.get(label).unwrap_or(label).to_string()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of entries that actually rewrite a label.
    pub fn corrections(&self) -> usize {
        self.entries.iter().filter(|(k, v)| k != v).count()
    }
}

impl FromIterator<(String, String)> for CorrectionMap {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Maps every label a cluster touches to the cluster's canonical label.
pub fn process_cluster(cluster: &Cluster, rule: CanonicalRule) -> CorrectionMap {
    let Some(canonical) = rule.pick(cluster.members()) else {
        return CorrectionMap::new();
    };
    let mapping: CorrectionMap = cluster
        .labels()
        .into_iter()
        .map(|label| (label, canonical.label.clone()))
        .collect();
    debug!(
        "Cluster {:?} -> canonical '{}'",
        mapping.iter().map(|(k, _)| k).collect::<Vec<_>>(),
        canonical.label
    );
    mapping
}

/// Merges the per-cluster mappings into one correction map.
pub fn generate_correction_map(clusters: &[Cluster], rule: CanonicalRule) -> CorrectionMap {
    let mut correction_map = CorrectionMap::new();
    for cluster in clusters {
        correction_map.merge(process_cluster(cluster, rule));
    }
    correction_map
}

/// Ranked, phonetically sorted and scored distinct labels of a dataset.
pub fn construct_projects_table<'a, I>(labels: I) -> Vec<LabelRecord>
where
    I: IntoIterator<Item = &'a str>,
{
    score_adjacent(group_by_phonetics(rank_labels(labels)))
}

/// Runs the whole deduplication engine over a column of raw labels.
pub fn build_correction_map<'a, I>(labels: I, rule: CanonicalRule) -> (CorrectionMap, usize)
where
    I: IntoIterator<Item = &'a str>,
{
    let clusters = extract_clusters(construct_projects_table(labels));
    (generate_correction_map(&clusters, rule), clusters.len())
}

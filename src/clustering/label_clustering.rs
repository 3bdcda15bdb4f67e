// src/clustering/label_clustering.rs - Maximal runs of adjacent, highly similar labels

use log::debug;
use std::collections::HashSet;

use crate::matching::similarity::SIMILARITY_THRESHOLD;
use crate::models::core::LabelRecord;

/// A maximal run of consecutive records that each score above the threshold
/// against their predecessor. The predecessor of the first member belongs to
/// the cluster's label set but is not itself a member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cluster {
    members: Vec<LabelRecord>,
}

impl Cluster {
    pub fn members(&self) -> &[LabelRecord] {
        &self.members
    }

    /// Every label the cluster touches: member labels plus their predecessors, deduplicated.
    pub fn labels(&self) -> Vec<String> {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut labels = Vec::new();
        let referenced = self.members.iter().flat_map(|record| {
            std::iter::once(record.label.as_str()).chain(record.previous.as_deref())
        });
        for label in referenced {
            if seen.insert(label) {
                labels.push(label.to_string());
            }
        }
        labels
    }
}

#[derive(Debug)]
enum ExtractorState {
    NoActiveCluster,
    AccumulatingCluster(Vec<LabelRecord>),
}

/// Scan-and-flush cluster extraction as an explicit two-state machine.
///
/// A record linked to its predecessor moves the machine into (or keeps it in)
/// `AccumulatingCluster`; any other record flushes the open run and returns to
/// `NoActiveCluster`.
#[derive(Debug)]
pub struct ClusterExtractor {
    state: ExtractorState,
    finished: Vec<Cluster>,
}

impl Default for ClusterExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl ClusterExtractor {
    pub fn new() -> Self {
        Self {
            state: ExtractorState::NoActiveCluster,
            finished: Vec::new(),
        }
    }

    fn links_to_previous(record: &LabelRecord) -> bool {
        record.previous.is_some()
            && matches!(record.similarity_to_prev, Some(score) if score > SIMILARITY_THRESHOLD)
    }

    pub fn is_accumulating(&self) -> bool {
        matches!(self.state, ExtractorState::AccumulatingCluster(_))
    }

    pub fn push(&mut self, record: LabelRecord) {
        let linked = Self::links_to_previous(&record);
        let state = std::mem::replace(&mut self.state, ExtractorState::NoActiveCluster);
        self.state = match (state, linked) {
            (ExtractorState::NoActiveCluster, true) => {
                ExtractorState::AccumulatingCluster(vec![record])
            }
            (ExtractorState::AccumulatingCluster(mut members), true) => {
                members.push(record);
                ExtractorState::AccumulatingCluster(members)
            }
            (ExtractorState::AccumulatingCluster(members), false) => {
                self.flush(members);
                ExtractorState::NoActiveCluster
            }
            (ExtractorState::NoActiveCluster, false) => ExtractorState::NoActiveCluster,
        };
    }

    fn flush(&mut self, members: Vec<LabelRecord>) {
        if members.is_empty() {
            return;
        }
        debug!(
            "Closing cluster of {} linked labels starting after {:?}",
            members.len(),
            members[0].previous
        );
        self.finished.push(Cluster { members });
    }

    pub fn finish(mut self) -> Vec<Cluster> {
        if let ExtractorState::AccumulatingCluster(members) =
            std::mem::replace(&mut self.state, ExtractorState::NoActiveCluster)
        {
            self.flush(members);
        }
        self.finished
    }
}

/// Partitions the scored sequence into clusters.
pub fn extract_clusters(records: Vec<LabelRecord>) -> Vec<Cluster> {
    let mut extractor = ClusterExtractor::new();
    for record in records {
        extractor.push(record);
    }
    extractor.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(label: &str, previous: Option<&str>, score: Option<u8>) -> LabelRecord {
        LabelRecord {
            label: label.to_string(),
            count: 1,
            phonetic_code: "X000".to_string(),
            previous: previous.map(|p| p.to_string()),
            similarity_to_prev: score,
        }
    }

    #[test]
    fn test_score_of_exactly_90_does_not_cluster() {
        let clusters = extract_clusters(vec![
            record("project-30", None, None),
            record("project-31", Some("project-30"), Some(90)),
        ]);
        assert!(clusters.is_empty());
    }

    #[test]
    fn test_score_of_91_clusters() {
        let clusters = extract_clusters(vec![
            record("opsandamin", None, None),
            record("opssandadmin", Some("opsandamin"), Some(91)),
        ]);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].members().len(), 1);
        assert_eq!(clusters[0].labels(), vec!["opssandadmin", "opsandamin"]);
    }

    #[test]
    fn test_first_record_never_opens_a_cluster() {
        let clusters = extract_clusters(vec![record("solo", None, Some(100))]);
        assert!(clusters.is_empty());
    }

    #[test]
    fn test_runs_are_maximal_and_disjoint() {
        let clusters = extract_clusters(vec![
            record("a", None, None),
            record("b", Some("a"), Some(95)),
            record("c", Some("b"), Some(92)),
            record("d", Some("c"), Some(40)),
            record("e", Some("d"), Some(99)),
            record("f", Some("e"), Some(10)),
            record("g", Some("f"), Some(91)),
        ]);
        assert_eq!(clusters.len(), 3);
        assert_eq!(clusters[0].labels(), vec!["b", "a", "c"]);
        assert_eq!(clusters[1].labels(), vec!["e", "d"]);
        // open run at end of input is flushed
        assert_eq!(clusters[2].labels(), vec!["g", "f"]);
    }

    #[test]
    fn test_state_transitions() {
        let mut extractor = ClusterExtractor::new();
        assert!(!extractor.is_accumulating());
        extractor.push(record("a", None, None));
        assert!(!extractor.is_accumulating());
        extractor.push(record("b", Some("a"), Some(97)));
        assert!(extractor.is_accumulating());
        extractor.push(record("c", Some("b"), Some(50)));
        assert!(!extractor.is_accumulating());
        assert_eq!(extractor.finish().len(), 1);
    }

    #[test]
    fn test_empty_sequence() {
        assert!(extract_clusters(Vec::new()).is_empty());
    }
}

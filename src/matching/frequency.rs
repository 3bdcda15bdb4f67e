// src/matching/frequency.rs

use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelCount {
    pub label: String,
    pub count: usize,
}

/// Counts occurrences of each distinct label. Output is in first-seen order.
pub fn rank_labels<'a, I>(labels: I) -> Vec<LabelCount>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut index_by_label: HashMap<&'a str, usize> = HashMap::new();
    let mut counts: Vec<LabelCount> = Vec::new();

    for label in labels {
        match index_by_label.get(label) {
            Some(&idx) => counts[idx].count += 1,
            None => {
                index_by_label.insert(label, counts.len());
                counts.push(LabelCount {
                    label: label.to_string(),
                    count: 1,
                });
            }
        }
    }
    counts
}

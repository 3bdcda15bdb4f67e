// src/matching/similarity.rs - Indel-ratio similarity between adjacent labels

use super::phonetic::PhoneticLabel;
use crate::models::core::LabelRecord;

/// Adjacent labels must score strictly above this to be linked.
pub const SIMILARITY_THRESHOLD: u8 = 90;

fn longest_common_subsequence(a: &[char], b: &[char]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    let mut prev_row = vec![0usize; b.len() + 1];
    let mut curr_row = vec![0usize; b.len() + 1];

    for &ca in a {
        for (j, &cb) in b.iter().enumerate() {
            curr_row[j + 1] = if ca == cb {
                prev_row[j] + 1
            } else {
                prev_row[j + 1].max(curr_row[j])
            };
        }
        std::mem::swap(&mut prev_row, &mut curr_row);
    }
    prev_row[b.len()]
}

/// Similarity on a 0-100 scale: `2 * LCS / (len(a) + len(b))`, rounded half to even.
///
/// Identical strings (the empty string included) score 100 and strings sharing
/// no character score 0. The score is symmetric in its arguments.
pub fn calculate_similarity(entry1: &str, entry2: &str) -> u8 {
    if entry1 == entry2 {
        return 100;
    }
    let a: Vec<char> = entry1.chars().collect();
    let b: Vec<char> = entry2.chars().collect();
    let total = a.len() + b.len();
    let lcs = longest_common_subsequence(&a, &b);

    let numerator = 200 * lcs;
    let quotient = numerator / total;
    let remainder = numerator % total;
    let rounded = if 2 * remainder > total || (2 * remainder == total && quotient % 2 == 1) {
        quotient + 1
    } else {
        quotient
    };
    rounded as u8
}

/// Scores every label against the one sorted immediately before it.
pub fn score_adjacent(sorted: Vec<PhoneticLabel>) -> Vec<LabelRecord> {
    let mut records: Vec<LabelRecord> = Vec::with_capacity(sorted.len());
    let mut previous: Option<String> = None;

    for entry in sorted {
        let similarity_to_prev = previous
            .as_deref()
            .map(|prev| calculate_similarity(&entry.label, prev));
        let next_previous = entry.label.clone();
        records.push(LabelRecord {
            label: entry.label,
            count: entry.count,
            phonetic_code: entry.phonetic_code,
            previous: previous.take(),
            similarity_to_prev,
        });
        previous = Some(next_previous);
    }
    records
}

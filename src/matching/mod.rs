// src/matching/mod.rs - Label ranking, phonetic grouping and adjacency scoring

pub mod frequency;
pub mod phonetic;
pub mod similarity;

pub use frequency::{rank_labels, LabelCount};
pub use phonetic::{group_by_phonetics, soundex, PhoneticLabel};
pub use similarity::{calculate_similarity, score_adjacent, SIMILARITY_THRESHOLD};

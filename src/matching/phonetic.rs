// src/matching/phonetic.rs - Soundex coding and phonetic ordering of labels

use rphonetic::{Encoder, Soundex};

use super::frequency::LabelCount;

const EMPTY_SOUNDEX: &str = "0000";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhoneticLabel {
    pub label: String,
    pub count: usize,
    pub phonetic_code: String,
}

fn encode_label(encoder: &Soundex, label: &str) -> String {
    let letters: String = label
        .chars()
        .filter(|c| c.is_ascii_alphabetic())
        .map(|c| c.to_ascii_uppercase())
        .collect();
    if letters.is_empty() {
        return EMPTY_SOUNDEX.to_string();
    }
    encoder.encode(&letters)
}

/// American Soundex code of `s` over its ASCII letters.
///
/// Digits, punctuation and non-Latin letters are ignored. Labels without any
/// ASCII letter get `"0000"`.
pub fn soundex(s: &str) -> String {
    encode_label(&Soundex::default(), s)
}

/// Attaches a phonetic code to every label and sorts by (code, label) so that
/// labels that sound alike become neighbours.
pub fn group_by_phonetics(counts: Vec<LabelCount>) -> Vec<PhoneticLabel> {
    let encoder = Soundex::default();
    let mut grouped: Vec<PhoneticLabel> = counts
        .into_iter()
        .map(|lc| PhoneticLabel {
            phonetic_code: encode_label(&encoder, &lc.label),
            label: lc.label,
            count: lc.count,
        })
        .collect();

    grouped.sort_by(|a, b| {
        a.phonetic_code
            .cmp(&b.phonetic_code)
            .then_with(|| a.label.cmp(&b.label))
    });
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_soundex_reference_codes() {
        assert_eq!(soundex("Robert"), "R163");
        assert_eq!(soundex("Rupert"), "R163");
        assert_eq!(soundex("Rubin"), "R150");
        assert_eq!(soundex("Ashcraft"), "A261");
        assert_eq!(soundex("Tymczak"), "T522");
        assert_eq!(soundex("Pfister"), "P236");
    }

    #[test]
    fn test_soundex_project_labels() {
        assert_eq!(soundex("traffic"), "T612");
        assert_eq!(soundex("misc"), "M200");
        assert_eq!(soundex("hiring"), "H652");
        assert_eq!(soundex("project-30"), "P622");
        assert_eq!(soundex("project-31"), "P622");
        assert_eq!(soundex("opsandadmin"), soundex("opssandadmin"));
        assert_eq!(soundex("opsandadmin"), soundex("opsandamin"));
    }

    #[test]
    fn test_soundex_fallback_for_non_alphabetic() {
        assert_eq!(soundex(""), "0000");
        assert_eq!(soundex("1234"), "0000");
        assert_eq!(soundex("--"), "0000");
        assert_eq!(soundex("#hiring"), "H652");
        assert_eq!(soundex("сентябрь"), "0000");
    }

    #[test]
    fn test_soundex_ignores_non_letters_and_case() {
        assert_eq!(soundex("pro-ject 2"), soundex("project"));
        assert_eq!(soundex("HIRING"), soundex("hiring"));
        assert_eq!(soundex("blog-ideas"), soundex("blogideas"));
    }

    #[test]
    fn test_grouping_orders_by_code_then_label() {
        let counts = vec![
            LabelCount { label: "traffic".into(), count: 4 },
            LabelCount { label: "project-31".into(), count: 1 },
            LabelCount { label: "misc".into(), count: 2 },
            LabelCount { label: "project-30".into(), count: 7 },
        ];
        let grouped = group_by_phonetics(counts);
        let labels: Vec<&str> = grouped.iter().map(|p| p.label.as_str()).collect();
        assert_eq!(labels, vec!["misc", "project-30", "project-31", "traffic"]);
        assert_eq!(grouped[1].count, 7);
        assert_eq!(grouped[1].phonetic_code, "P622");
    }
}

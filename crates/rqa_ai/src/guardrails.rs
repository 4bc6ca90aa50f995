//! Post-hoc heuristics over generated answers. They flag, they never block.

use std::collections::HashSet;

use rqa_core::domain::{Chunk, Citation, Flag};

use crate::answer::REFUSAL_ANSWER;

/// Raised when an answer carries no citations at all.
pub fn hallucination_flag(citations: &[Citation]) -> Flag {
    Flag::from_bool(citations.is_empty())
}

/// Raised when any non-blank line of the answer repeats, ignoring case and surrounding whitespace.
/// Blank lines never count as repeats, so paragraph spacing alone does not raise the flag.
pub fn redundancy_flag(answer: &str) -> Flag {
    let mut seen: HashSet<String> = HashSet::new();
    let repeated = answer
        .to_lowercase()
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .any(|l| !seen.insert(l.to_string()));
    Flag::from_bool(repeated)
}

pub fn is_refusal(answer: &str) -> bool {
    answer.trim() == REFUSAL_ANSWER
}

/// Numeric figures (`7%`, `4.5`, `1,000`) in `answer` that occur in none of `chunks`.
/// Chunk labels such as `[chunk 2]` are not figures.
pub fn unsupported_figures(answer: &str, chunks: &[Chunk]) -> Vec<String> {
    let known: HashSet<String> = chunks.iter().flat_map(|c| figures(&c.text)).collect();
    let mut out: Vec<String> = Vec::new();
    for f in figures(answer) {
        if !known.contains(&f) && !out.contains(&f) {
            out.push(f);
        }
    }
    out
}

fn figures(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut prev = String::new();
    for word in text.split_whitespace() {
        let cleaned = word.trim_matches(|c: char| !(c.is_alphanumeric() || c == '%'));
        let is_figure = cleaned.chars().any(|c| c.is_ascii_digit())
            && cleaned
                .chars()
                .all(|c| c.is_ascii_digit() || c == '.' || c == ',' || c == '%');
        if is_figure && prev != "chunk" {
            out.push(cleaned.replace(',', ""));
        }
        prev = cleaned.to_lowercase();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rqa_core::ingest::new_chunk;

    #[test]
    fn redundancy_ignores_case_and_blank_lines() {
        assert_eq!(redundancy_flag("- CET1: 4.5%\n\n- Tier 1: 6%\n"), Flag::No);
        assert_eq!(redundancy_flag("- CET1: 4.5%\n- cet1: 4.5%  "), Flag::Yes);
        assert_eq!(redundancy_flag(""), Flag::No);
        assert_eq!(redundancy_flag("- CET1: 4.5%\n\n- Tier 1: 6%\n\n\n- LCR: 100%"), Flag::No);
    }

    #[test]
    fn hallucination_tracks_missing_citations() {
        assert_eq!(hallucination_flag(&[]), Flag::Yes);
        let cite = Citation {
            source: "a.pdf".to_string(),
            page: Some(1),
        };
        assert_eq!(hallucination_flag(&[cite]), Flag::No);
    }

    #[test]
    fn refusal_matches_trimmed_sentence() {
        assert!(is_refusal(&format!("  {REFUSAL_ANSWER}\n")));
        assert!(!is_refusal("I don't know."));
    }

    #[test]
    fn figures_missing_from_context_are_reported() {
        let chunks = vec![new_chunk(
            "capital.pdf",
            0,
            Some(3),
            "Minimum CET1 ratio of 4.5% and total capital of 1,000 units.".to_string(),
        )];
        let answer =
            "- CET1 is 4.5% [chunk 1]\n- Tier 1 is 6%.\n- Capital 1000, buffer 2.5%, again 6%";
        assert_eq!(unsupported_figures(answer, &chunks), vec!["1", "6%", "2.5%"]);
    }
}

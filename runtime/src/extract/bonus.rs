//! Bonus balance reader.
//!
//! Two tiers. A labeled element that carries the balance on its own wins
//! outright. Otherwise every line of page text is run through the pattern
//! rules, each hit becomes a [`Candidate`], and candidates are ranked by the
//! weight tables below. Ties go to the larger value.

use super::text::{first_number, normalize_lines, number_from_text, weigh, NUMBER};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// How many ranked candidates are kept as evidence.
pub const EVIDENCE_LIMIT: usize = 5;

/// Rank given to the structural fast path.
pub const STRUCTURAL_RANK: i32 = 100;

/// Phrases that make a line more likely to carry the live balance.
pub const RANK_WEIGHTS: &[(&str, i32)] = &[
    ("current bonus points", 6),
    ("bonus points", 4),
    ("seedbonus", 3),
    ("karma", 2),
    ("you have", 1),
];

/// Phrases typical of store offers and help text.
pub const PENALTY_WEIGHTS: &[(&str, i32)] = &[
    ("points each", -4),
    ("per gb", -4),
    ("per hour", -4),
    ("cost", -3),
    ("price", -3),
    ("buy ", -3),
    ("exchange", -2),
    ("earn", -2),
    ("faq", -5),
    ("guide", -4),
    ("how to", -4),
];

/// One parsed balance with the line it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub value: u64,
    pub source_line: String,
    pub rank: i32,
}

/// Result of reading the balance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BonusReading {
    /// Top-ranked value; `None` means extraction failed.
    pub value: Option<u64>,
    /// Up to [`EVIDENCE_LIMIT`] candidates, best first.
    pub evidence: Vec<Candidate>,
}

fn rules() -> &'static [Regex] {
    static RULES: OnceLock<Vec<Regex>> = OnceLock::new();
    RULES.get_or_init(|| {
        let keyword = r"(?:bonus(?:\s+points?)?|seedbonus|karma)";
        [
            format!(r"(?i){keyword}\D{{0,30}}{NUMBER}"),
            format!(r"(?i){NUMBER}\D{{0,30}}{keyword}"),
            format!(
                r"(?i)you\s+(?:currently\s+)?have\D{{0,20}}{NUMBER}\D{{0,20}}(?:points?|bonus|seedbonus|karma)"
            ),
        ]
        .iter()
        .map(|pattern| Regex::new(pattern).expect("bonus rule regex is valid"))
        .collect()
    })
}

/// Score a line with the rank and penalty tables.
pub fn rank_line(line: &str) -> i32 {
    weigh(line, RANK_WEIGHTS) + weigh(line, PENALTY_WEIGHTS)
}

/// Every rule hit in `text`, unranked order, values above `ceiling` dropped.
pub fn parse_candidates(text: &str, ceiling: u64) -> Vec<Candidate> {
    let mut candidates: Vec<Candidate> = Vec::new();
    for line in normalize_lines(text) {
        for rule in rules() {
            let Some(value) = rule
                .captures(&line)
                .and_then(|caps| caps.get(1))
                .and_then(|m| number_from_text(m.as_str()))
            else {
                continue;
            };
            if value > ceiling {
                continue;
            }
            if candidates
                .iter()
                .any(|c| c.value == value && c.source_line == line)
            {
                continue;
            }
            candidates.push(Candidate {
                value,
                rank: rank_line(&line),
                source_line: line.clone(),
            });
        }
    }
    candidates
}

/// Sort best first: rank descending, then value descending.
pub fn rank_candidates(candidates: &mut [Candidate]) {
    candidates.sort_by(|a, b| b.rank.cmp(&a.rank).then(b.value.cmp(&a.value)));
}

/// Read the balance from a labeled element's text, if it holds a number.
pub fn read_structural(structured: &str, ceiling: u64) -> Option<Candidate> {
    let value = first_number(structured).filter(|v| *v <= ceiling)?;
    Some(Candidate {
        value,
        source_line: super::text::collapse_whitespace(structured),
        rank: STRUCTURAL_RANK,
    })
}

/// Read the bonus balance, preferring the structural element when present.
pub fn read_bonus_points(text: &str, structured: Option<&str>, ceiling: u64) -> BonusReading {
    if let Some(candidate) = structured.and_then(|s| read_structural(s, ceiling)) {
        tracing::debug!(value = candidate.value, "bonus read from labeled element");
        return BonusReading {
            value: Some(candidate.value),
            evidence: vec![candidate],
        };
    }

    let mut candidates = parse_candidates(text, ceiling);
    if candidates.is_empty() {
        return BonusReading::default();
    }
    rank_candidates(&mut candidates);
    candidates.truncate(EVIDENCE_LIMIT);

    tracing::debug!(
        value = candidates[0].value,
        rank = candidates[0].rank,
        considered = candidates.len(),
        "bonus read from page text"
    );
    BonusReading {
        value: Some(candidates[0].value),
        evidence: candidates,
    }
}

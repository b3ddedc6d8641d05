//! Text helpers shared by the readers.

use regex::Regex;
use std::sync::OnceLock;

/// A digit group with optional thousands separators and an ignored fraction.
pub const NUMBER: &str = r"(\d{1,3}(?:[, ]\d{3})+|\d+)(?:\.\d+)?";

/// Split page text into whitespace-collapsed, non-empty lines.
pub fn normalize_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(collapse_whitespace)
        .filter(|line| !line.is_empty())
        .collect()
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Parse a number by keeping only its digits.
pub fn number_from_text(text: &str) -> Option<u64> {
    let digits: String = text.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}

/// First number token in `text`.
pub fn first_number(text: &str) -> Option<u64> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(NUMBER).expect("number regex is valid"));
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| number_from_text(m.as_str()))
}

/// Sum of the weights whose phrase occurs in the lowercased `line`.
pub fn weigh(line: &str, table: &[(&str, i32)]) -> i32 {
    let lower = line.to_lowercase();
    table
        .iter()
        .filter(|(phrase, _)| lower.contains(phrase))
        .map(|(_, weight)| weight)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_lines() {
        let lines = normalize_lines("  Bonus \t points:\n\n  12,345  \n");
        assert_eq!(lines, vec!["Bonus points:", "12,345"]);
    }

    #[test]
    fn test_number_from_text() {
        assert_eq!(number_from_text("12,345"), Some(12_345));
        assert_eq!(number_from_text("1 234 567"), Some(1_234_567));
        assert_eq!(number_from_text("none"), None);
    }

    #[test]
    fn test_first_number_drops_fraction() {
        assert_eq!(first_number("Bonus: 54,321.5"), Some(54_321));
        assert_eq!(first_number("no digits"), None);
    }

    #[test]
    fn test_weigh_is_additive() {
        let table = [("bonus points", 4), ("current", 2), ("faq", -5)];
        assert_eq!(weigh("Current Bonus Points: 1", &table), 6);
        assert_eq!(weigh("Bonus points FAQ", &table), -1);
        assert_eq!(weigh("nothing", &table), 0);
    }
}

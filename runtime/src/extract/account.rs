//! VIP and donation readers.

use super::text::{normalize_lines, number_from_text, NUMBER};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Phrases the page shows once today's donation has gone through.
pub const ALREADY_DONATED_PHRASES: &[&str] =
    &["already donated", "already contributed", "you have donated"];

/// Donation eligibility for the current day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DonationStatus {
    pub donated_today: bool,
    pub max_daily_donation: u64,
}

fn vip_rules() -> &'static [Regex] {
    static RULES: OnceLock<Vec<Regex>> = OnceLock::new();
    RULES.get_or_init(|| {
        [
            r"(?i)vip\s+(?:status\s+)?(?:expires|ends|remaining)\D{0,40}?(\d+(?:\.\d+)?)\s*weeks?",
            r"(?i)(\d+(?:\.\d+)?)\s*weeks?\s+(?:of\s+)?vip\s+(?:remaining|left)",
        ]
        .iter()
        .map(|pattern| Regex::new(pattern).expect("vip regex is valid"))
        .collect()
    })
}

fn allowance_rules() -> &'static [Regex] {
    static RULES: OnceLock<Vec<Regex>> = OnceLock::new();
    RULES.get_or_init(|| {
        [
            format!(r"(?i)(?:donate|donation)\s+(?:of\s+)?up\s+to\D{{0,15}}{NUMBER}"),
            format!(r"(?i)max(?:imum)?\s+donation\D{{0,30}}{NUMBER}"),
        ]
        .iter()
        .map(|pattern| Regex::new(pattern).expect("allowance regex is valid"))
        .collect()
    })
}

/// Weeks of VIP left, `0.0` when neither phrasing is present.
pub fn read_vip_weeks(text: &str) -> f64 {
    for line in normalize_lines(text) {
        for rule in vip_rules() {
            let weeks = rule
                .captures(&line)
                .and_then(|caps| caps.get(1))
                .and_then(|m| m.as_str().parse::<f64>().ok());
            if let Some(weeks) = weeks.filter(|w| w.is_finite() && *w >= 0.0) {
                return weeks;
            }
        }
    }
    0.0
}

/// Whether today's donation is used up and how much may be donated.
///
/// `default_allowance` applies when the page advertises no maximum.
pub fn read_donation_status(text: &str, default_allowance: u64) -> DonationStatus {
    let lower = text.to_lowercase();
    let donated_today = lower.contains("millionaire")
        && ALREADY_DONATED_PHRASES
            .iter()
            .any(|phrase| lower.contains(phrase));

    let advertised = normalize_lines(text).iter().find_map(|line| {
        allowance_rules().iter().find_map(|rule| {
            rule.captures(line)
                .and_then(|caps| caps.get(1))
                .and_then(|m| number_from_text(m.as_str()))
        })
    });

    DonationStatus {
        donated_today,
        max_daily_donation: advertised.unwrap_or(default_allowance),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vip_expires_phrasing() {
        assert_eq!(read_vip_weeks("Your VIP status expires in 12.6 weeks"), 12.6);
    }

    #[test]
    fn test_vip_remaining_phrasing() {
        assert_eq!(read_vip_weeks("You have 3 weeks of VIP remaining."), 3.0);
    }

    #[test]
    fn test_vip_offers_are_not_remaining_time() {
        let text = "Buy 4 weeks of VIP for 5,000 points\nBuy 8 weeks of VIP";
        assert_eq!(read_vip_weeks(text), 0.0);
    }

    #[test]
    fn test_already_donated_needs_club_context() {
        let page = "Millionaire's Club\nYou have already donated today.";
        assert!(read_donation_status(page, 2_000).donated_today);

        let unrelated = "Thanks! You have already donated to the server fund.";
        assert!(!read_donation_status(unrelated, 2_000).donated_today);
    }

    #[test]
    fn test_advertised_allowance() {
        let page = "Millionaire's Club\nYou may donate up to 1,500 points per day.";
        let status = read_donation_status(page, 2_000);
        assert!(!status.donated_today);
        assert_eq!(status.max_daily_donation, 1_500);
    }

    #[test]
    fn test_default_allowance() {
        let status = read_donation_status("Millionaire's Club", 2_000);
        assert_eq!(status.max_daily_donation, 2_000);
    }
}

//! Per-action knowledge: where each step lives on the page, which controls
//! may carry it out, and how the site acknowledges a submission.

use crate::surface::AckMatcher;
use bonus_plan::{PlanLimits, PlanStep, StepKind};
use serde::{Deserialize, Serialize};

/// Labels accepted when clicking through a confirmation prompt.
pub const AFFIRMATIVE_LABELS: &[&str] = &["yes", "ok", "confirm", "buy", "donate", "continue"];

/// Body fragments that mark an acknowledgment as a rejection.
pub const REJECTION_MARKERS: &[&str] = &[
    "\"success\":false",
    "\"success\": false",
    "not enough",
    "insufficient",
];

/// Static description of one spend action.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionSpec {
    pub kind: StepKind,
    /// Keywords naming the page region that hosts the action.
    pub section: &'static [&'static str],
    /// Keywords naming the controls inside that region.
    pub action: &'static [&'static str],
    /// Whether the site asks for confirmation after the click.
    pub needs_confirm: bool,
    pub ack: AckMatcher,
}

/// One way of carrying out a step, tried in order until one is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlCandidate {
    /// Human-readable name recorded on the attempt.
    pub label: String,
    /// Control label keywords; empty means "use the action keywords".
    pub keywords: Vec<String>,
    /// Amount to fill into the region's amount field or select.
    pub amount: Option<u64>,
    /// Whether the candidate needs its own control or a select to pick it.
    /// Without one a generic click would buy whatever the page defaults to.
    pub requires_choice: bool,
}

impl ControlCandidate {
    fn new(label: impl Into<String>, keywords: &[&str], amount: Option<u64>) -> Self {
        Self {
            label: label.into(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            amount,
            requires_choice: false,
        }
    }
}

pub fn action_spec(kind: StepKind) -> ActionSpec {
    match kind {
        StepKind::Donate => ActionSpec {
            kind,
            section: &["millionaire", "vault", "pot"],
            action: &["donate", "contribute"],
            needs_confirm: false,
            ack: AckMatcher::new(&["millionaires", "donate"]),
        },
        StepKind::Vip => ActionSpec {
            kind,
            section: &["vip"],
            action: &["vip", "extend", "buy", "week"],
            needs_confirm: true,
            ack: AckMatcher::new(&["bonusBuy", "vip"]),
        },
        StepKind::Upload => ActionSpec {
            kind,
            section: &["upload", "credit", "gb"],
            action: &["max", "upload", "credit", "exchange", "buy"],
            needs_confirm: true,
            ack: AckMatcher::new(&["bonusBuy", "upload"]),
        },
    }
}

/// Ordered candidates for a ready step.
///
/// Donation fills the planned amount once. VIP tries every fixed tier not
/// above the planned cost, largest first, then the "max" control. Upload
/// fills the planned amount, then falls back to "max".
pub fn candidates(step: &PlanStep, limits: &PlanLimits) -> Vec<ControlCandidate> {
    match step.kind {
        StepKind::Donate => vec![ControlCandidate::new(
            format!("donate {}", step.estimated_cost),
            &[],
            Some(step.estimated_cost),
        )],
        StepKind::Vip => {
            let mut tiers: Vec<_> = limits
                .vip_tiers
                .iter()
                .filter(|tier| tier.cost <= step.estimated_cost)
                .collect();
            tiers.sort_by(|a, b| b.cost.cmp(&a.cost));
            let mut list: Vec<ControlCandidate> = tiers
                .into_iter()
                .map(|tier| {
                    let weeks = format!("{} week", tier.weeks);
                    ControlCandidate {
                        requires_choice: true,
                        ..ControlCandidate::new(
                            format!("{} weeks", tier.weeks),
                            &[weeks.as_str()],
                            Some(tier.cost),
                        )
                    }
                })
                .collect();
            list.push(ControlCandidate {
                requires_choice: true,
                ..ControlCandidate::new("max vip", &["max"], None)
            });
            list
        }
        StepKind::Upload => vec![
            ControlCandidate::new(
                format!("{} points of upload", step.estimated_cost),
                &["exchange", "buy", "upload"],
                Some(step.estimated_cost),
            ),
            ControlCandidate {
                requires_choice: true,
                ..ControlCandidate::new("max upload", &["max"], None)
            },
        ],
    }
}

/// Whether an acknowledgment body reads as a rejection.
pub fn is_rejection(body: &str) -> bool {
    let lower = body.to_lowercase();
    REJECTION_MARKERS.iter().any(|marker| lower.contains(marker))
}

//! Action locator: pick the container, control and field to operate.
//!
//! Scoring is linear keyword counting over weight tables, so every choice can
//! be explained from the numbers recorded alongside it.

use crate::extract::text::first_number;
use crate::surface::{Container, Control, Field, FieldOption};
use serde::{Deserialize, Serialize};

/// Weight per matched section keyword.
pub const SECTION_WEIGHT: i32 = 10;
/// Weight per matched action keyword.
pub const ACTION_WEIGHT: i32 = 2;
/// Bonus for containers that have any control at all.
pub const HAS_CONTROLS_WEIGHT: i32 = 1;

/// Keyword weights for choosing a numeric input, over `name id placeholder`.
pub const INPUT_FIELD_WEIGHTS: &[(&str, i32)] = &[
    ("point", 5),
    ("bonus", 4),
    ("amount", 3),
    ("vip", 2),
    ("week", 1),
];

/// Keyword weights for choosing a select, over `name id`.
pub const SELECT_FIELD_WEIGHTS: &[(&str, i32)] =
    &[("vip", 4), ("week", 3), ("point", 2), ("bonus", 2)];

/// A container chosen by the locator, with its score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Located {
    pub container: usize,
    pub score: i32,
}

/// The option chosen for a select field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChosenOption {
    pub value: String,
    pub text: String,
    pub numeric: u64,
}

fn haystack(container: &Container) -> String {
    let labels: Vec<&str> = container.controls.iter().map(|c| c.label.as_str()).collect();
    format!("{} {}", container.text, labels.join(" ")).to_lowercase()
}

fn hits(text: &str, keywords: &[&str]) -> i32 {
    keywords.iter().filter(|k| text.contains(&k.to_lowercase())).count() as i32
}

/// Score a container; `-1` disqualifies it.
pub fn score_container(container: &Container, section: &[&str], action: &[&str]) -> i32 {
    let text = haystack(container);
    let section_hits = hits(&text, section);
    if !section.is_empty() && section_hits == 0 {
        return -1;
    }
    let action_hits = hits(&text, action);
    let has_controls = if container.controls.is_empty() {
        0
    } else {
        HAS_CONTROLS_WEIGHT
    };
    section_hits * SECTION_WEIGHT + action_hits * ACTION_WEIGHT + has_controls
}

/// Best-scoring container. Ties go to the first one seen.
pub fn pick_container(containers: &[Container], section: &[&str], action: &[&str]) -> Option<Located> {
    let mut best: Option<Located> = None;
    for container in containers {
        let score = score_container(container, section, action);
        if score < 0 {
            continue;
        }
        if best.as_ref().map_or(true, |b| score > b.score) {
            best = Some(Located {
                container: container.index,
                score,
            });
        }
    }
    best
}

fn field_score(joined: &str, table: &[(&str, i32)]) -> i32 {
    table
        .iter()
        .filter(|(k, _)| joined.contains(k))
        .map(|(_, w)| w)
        .sum()
}

fn best_field<'a>(
    fields: impl Iterator<Item = &'a Field>,
    table: &[(&str, i32)],
    key: impl Fn(&Field) -> String,
) -> Option<&'a Field> {
    let mut best: Option<(&Field, i32)> = None;
    for field in fields {
        let score = field_score(&key(field).to_lowercase(), table);
        if best.map_or(true, |(_, s)| score > s) {
            best = Some((field, score));
        }
    }
    best.map(|(field, _)| field)
}

/// Numeric/text input most likely to take a point amount.
pub fn pick_amount_input(container: &Container) -> Option<&Field> {
    best_field(
        container.fields.iter().filter(|f| f.is_amount_input()),
        INPUT_FIELD_WEIGHTS,
        |f| format!("{} {} {}", f.name, f.id, f.placeholder),
    )
}

/// Select most likely to choose a point amount or VIP length.
pub fn pick_select(container: &Container) -> Option<&Field> {
    best_field(
        container.fields.iter().filter(|f| f.is_select()),
        SELECT_FIELD_WEIGHTS,
        |f| format!("{} {}", f.name, f.id),
    )
}

/// Largest enabled numeric option not above `amount`, else the smallest one.
pub fn pick_option(options: &[FieldOption], amount: u64) -> Option<ChosenOption> {
    let numeric: Vec<ChosenOption> = options
        .iter()
        .filter(|o| !o.disabled)
        .filter_map(|o| {
            let n = first_number(&o.text).or_else(|| first_number(&o.value))?;
            Some(ChosenOption {
                value: o.value.clone(),
                text: o.text.clone(),
                numeric: n,
            })
        })
        .collect();

    let under = numeric
        .iter()
        .filter(|o| o.numeric <= amount)
        .max_by_key(|o| o.numeric);
    under
        .or_else(|| numeric.iter().min_by_key(|o| o.numeric))
        .cloned()
}

/// First control whose label contains an action keyword, else the first one.
pub fn pick_control<'a>(container: &'a Container, action: &[&str]) -> Option<&'a Control> {
    find_control(container, action).or_else(|| container.controls.first())
}

/// First control whose label contains any of `keywords`, no fallback.
pub fn find_control<'a>(container: &'a Container, keywords: &[&str]) -> Option<&'a Control> {
    container.controls.iter().find(|control| {
        let label = control.label.to_lowercase();
        keywords.iter().any(|k| label.contains(&k.to_lowercase()))
    })
}

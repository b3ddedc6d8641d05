//! Attempt execution: run one control candidate against the live page.
//!
//! An attempt walks the phases of a step in order, fill and click, then the
//! confirmation prompt when the action has one, then the acknowledgment. It
//! never returns an error: whatever stops it is recorded on the
//! [`AttemptRecord`] together with the phase it stopped in.

use super::catalog::{is_rejection, ActionSpec, ControlCandidate, AFFIRMATIVE_LABELS};
use crate::error::BonusError;
use crate::locator::{find_control, pick_amount_input, pick_container, pick_control, pick_option, pick_select};
use crate::surface::{Acknowledgment, Container, Control, RemoteSurface};
use serde::{Deserialize, Serialize};

/// How long to look for a message dialog once the acknowledgment is missing.
const LATE_DIALOG_TIMEOUT_MS: u64 = 1_500;

/// Where in the step an attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepPhase {
    Locate,
    Confirm,
    Submit,
    WaitResponse,
}

/// How an attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptOutcome {
    Accepted,
    Rejected,
    /// The candidate has no matching control on the page.
    Unavailable,
}

/// One recorded try of a control candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptRecord {
    pub candidate: String,
    /// Label of the control that was clicked, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control: Option<String>,
    pub phase: StepPhase,
    pub outcome: AttemptOutcome,
    pub detail: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    /// Text of the confirmation or message dialog, if one appeared.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dialog: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_status: Option<u16>,
}

impl AttemptRecord {
    fn start(candidate: &ControlCandidate) -> Self {
        Self {
            candidate: candidate.label.clone(),
            control: None,
            phase: StepPhase::Locate,
            outcome: AttemptOutcome::Rejected,
            detail: String::new(),
            error_code: None,
            dialog: None,
            response_status: None,
        }
    }

    fn fail(mut self, phase: StepPhase, error: BonusError) -> Self {
        self.phase = phase;
        self.outcome = AttemptOutcome::Rejected;
        self.error_code = Some(error.code().to_string());
        self.detail = error.to_string();
        self
    }

    fn unavailable(mut self, detail: impl Into<String>) -> Self {
        self.phase = StepPhase::Locate;
        self.outcome = AttemptOutcome::Unavailable;
        self.detail = detail.into();
        self
    }

    pub fn is_accepted(&self) -> bool {
        self.outcome == AttemptOutcome::Accepted
    }

    /// Clicked through, but the site neither acknowledged nor refused it.
    ///
    /// The spend may have landed, so the balance has to be checked before
    /// another candidate is tried.
    pub fn is_unsettled(&self) -> bool {
        if self.outcome != AttemptOutcome::Rejected || self.control.is_none() {
            return false;
        }
        match self.phase {
            StepPhase::Submit => true,
            StepPhase::WaitResponse => self.error_code.as_deref() != Some("submission_failure"),
            StepPhase::Locate | StepPhase::Confirm => false,
        }
    }

    /// Count an unsettled attempt as accepted once the balance shows it.
    pub fn settle_by_balance(&mut self, spent: u64) {
        self.outcome = AttemptOutcome::Accepted;
        self.error_code = None;
        self.detail = format!("no response seen; balance fell by {spent}");
    }
}

/// Locate the action's container without touching the page.
pub async fn locate(surface: &dyn RemoteSurface, spec: &ActionSpec) -> Result<Container, BonusError> {
    let containers = surface.containers().await?;
    let located = pick_container(&containers, spec.section, spec.action)
        .ok_or_else(|| BonusError::ActionSurfaceNotFound(spec.section.join(", ")))?;
    tracing::debug!(
        kind = ?spec.kind,
        container = located.container,
        score = located.score,
        "action surface located"
    );
    containers
        .into_iter()
        .find(|c| c.index == located.container)
        .ok_or_else(|| BonusError::ActionSurfaceNotFound(spec.section.join(", ")))
}

/// Label of the control a commit run would click first.
///
/// Walks the candidates the same way [`attempt`] does and stops at the first
/// one the page can serve.
pub fn preview_control(
    container: &Container,
    spec: &ActionSpec,
    candidates: &[ControlCandidate],
) -> Option<String> {
    candidates.iter().find_map(|candidate| {
        let by_select = candidate.amount.is_some_and(|amount| {
            pick_select(container).is_some_and(|select| pick_option(&select.options, amount).is_some())
        });
        choose_control(container, spec, candidate, by_select).map(|c| c.label.clone())
    })
}

/// The control a candidate clicks: its own, else the action's best match.
///
/// A candidate that needs its own control gets nothing unless a select
/// already carried the choice.
fn choose_control<'a>(
    container: &'a Container,
    spec: &ActionSpec,
    candidate: &ControlCandidate,
    chose_by_select: bool,
) -> Option<&'a Control> {
    let own = if candidate.keywords.is_empty() {
        None
    } else {
        let keywords: Vec<&str> = candidate.keywords.iter().map(String::as_str).collect();
        find_control(container, &keywords)
    };
    if candidate.requires_choice && own.is_none() && !chose_by_select {
        return None;
    }
    own.or_else(|| pick_control(container, spec.action))
}

/// Try one candidate end to end.
pub async fn attempt(
    surface: &mut dyn RemoteSurface,
    spec: &ActionSpec,
    candidate: &ControlCandidate,
    timeout_ms: u64,
) -> AttemptRecord {
    let mut record = AttemptRecord::start(candidate);

    let container = match locate(&*surface, spec).await {
        Ok(container) => container,
        Err(e) => return record.fail(StepPhase::Locate, e),
    };

    // Fill the amount first so a select-driven choice is in place before
    // the click.
    let mut chose = false;
    if let Some(amount) = candidate.amount {
        match fill_amount(surface, &container, amount).await {
            Ok(filled) => chose = filled,
            Err(e) => return record.fail(StepPhase::Submit, e),
        }
    }

    let Some(control) = choose_control(&container, spec, candidate, chose) else {
        return record.unavailable(format!("no control for {}", candidate.label));
    };
    record.control = Some(control.label.clone());

    tracing::info!(
        kind = ?spec.kind,
        candidate = %candidate.label,
        control = %control.label,
        "submitting"
    );
    if let Err(e) = surface.click_control(container.index, control.index).await {
        return record.fail(StepPhase::Submit, e.into());
    }

    if spec.needs_confirm {
        match confirm(surface, timeout_ms).await {
            Ok(text) => record.dialog = Some(text),
            Err(e) => return record.fail(StepPhase::Confirm, e),
        }
    }

    match surface.wait_for_acknowledgment(&spec.ack, timeout_ms).await {
        Ok(Some(ack)) => {
            record.response_status = Some(ack.status);
            if let Err(e) = check_acknowledgment(&ack) {
                return record.fail(StepPhase::WaitResponse, e);
            }
            record.detail = format!("acknowledged with status {}", ack.status);
        }
        Ok(None) => {
            // A message dialog after the submit stands in for the response.
            match surface.wait_for_dialog(LATE_DIALOG_TIMEOUT_MS).await {
                Ok(Some(dialog)) if is_rejection(&dialog.text) => {
                    let detail = dialog.text.clone();
                    record.dialog = Some(dialog.text);
                    return record.fail(StepPhase::WaitResponse, BonusError::SubmissionFailure(detail));
                }
                Ok(Some(dialog)) => {
                    record.detail = format!("no response seen; page said: {}", dialog.text);
                    record.dialog = Some(dialog.text);
                    if let Err(e) = surface.click_dialog_button(AFFIRMATIVE_LABELS).await {
                        tracing::debug!("could not dismiss message dialog: {e:#}");
                    }
                }
                Ok(None) => {
                    return record.fail(
                        StepPhase::WaitResponse,
                        BonusError::AcknowledgmentTimeout(timeout_ms),
                    )
                }
                Err(e) => return record.fail(StepPhase::WaitResponse, e.into()),
            }
        }
        Err(e) => return record.fail(StepPhase::WaitResponse, e.into()),
    }

    surface.settle().await;
    record.phase = StepPhase::WaitResponse;
    record.outcome = AttemptOutcome::Accepted;
    record
}

/// Put `amount` into the container's select or amount input.
///
/// Returns whether a select carried the choice.
async fn fill_amount(
    surface: &mut dyn RemoteSurface,
    container: &Container,
    amount: u64,
) -> Result<bool, BonusError> {
    if let Some(select) = pick_select(container) {
        if let Some(option) = pick_option(&select.options, amount) {
            tracing::debug!(field = %select.name, option = %option.text, "selecting option");
            surface
                .set_field(container.index, select.index, &option.value)
                .await?;
            return Ok(true);
        }
    }
    if let Some(input) = pick_amount_input(container) {
        tracing::debug!(field = %input.name, amount, "filling amount");
        surface
            .set_field(container.index, input.index, &amount.to_string())
            .await?;
    }
    Ok(false)
}

async fn confirm(surface: &mut dyn RemoteSurface, timeout_ms: u64) -> Result<String, BonusError> {
    let dialog = surface
        .wait_for_dialog(timeout_ms)
        .await?
        .ok_or_else(|| BonusError::ConfirmationFailure("no confirmation dialog appeared".into()))?;
    tracing::debug!(text = %dialog.text, "confirmation dialog");
    surface
        .click_dialog_button(AFFIRMATIVE_LABELS)
        .await?
        .ok_or_else(|| {
            BonusError::ConfirmationFailure(format!(
                "no affirmative button among {:?}",
                dialog.buttons
            ))
        })?;
    Ok(dialog.text)
}

fn check_acknowledgment(ack: &Acknowledgment) -> Result<(), BonusError> {
    if !(200..300).contains(&ack.status) {
        return Err(BonusError::SubmissionFailure(format!(
            "{} answered {}",
            ack.url, ack.status
        )));
    }
    if let Some(body) = ack.body.as_deref().filter(|b| is_rejection(b)) {
        let excerpt: String = body.chars().take(200).collect();
        return Err(BonusError::SubmissionFailure(excerpt));
    }
    Ok(())
}

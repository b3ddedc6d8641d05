//! Run summary: the single JSON document a run produces.

use crate::config::Config;
use crate::diagnostics::DebugArtifacts;
use crate::extract::{Candidate, SnapshotRead};
use crate::live::AttemptRecord;
use bonus_plan::{PlanStep, Snapshot, StepKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What happened to one plan step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ActionOutcome {
    /// Submitted, acknowledged and re-read.
    Applied {
        estimated_cost: u64,
        control: String,
        attempts: Vec<AttemptRecord>,
        /// Balance on the re-read; `None` when the re-read failed.
        bonus_after: Option<u64>,
    },
    /// Dry run: what would have been submitted.
    Planned {
        estimated_cost: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        control: Option<String>,
    },
    Skipped {
        reason: String,
    },
    Failed {
        error: String,
        attempts: Vec<AttemptRecord>,
    },
}

/// Result for one plan step, in plan order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionResult {
    pub name: String,
    pub kind: StepKind,
    #[serde(flatten)]
    pub outcome: ActionOutcome,
}

impl ActionResult {
    pub fn new(kind: StepKind, outcome: ActionOutcome) -> Self {
        Self {
            name: kind.action_name().to_string(),
            kind,
            outcome,
        }
    }

    pub fn skipped(kind: StepKind, reason: impl Into<String>) -> Self {
        Self::new(
            kind,
            ActionOutcome::Skipped {
                reason: reason.into(),
            },
        )
    }

    pub fn status(&self) -> &'static str {
        match self.outcome {
            ActionOutcome::Applied { .. } => "applied",
            ActionOutcome::Planned { .. } => "planned",
            ActionOutcome::Skipped { .. } => "skipped",
            ActionOutcome::Failed { .. } => "failed",
        }
    }
}

/// Everything a run reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub run_id: Uuid,
    pub mode: String,
    pub threshold: u64,
    pub target: u64,
    pub cap: u64,
    pub should_spend: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
    pub starting_bonus: u64,
    pub starting_snapshot: Snapshot,
    pub bonus_evidence: Vec<Candidate>,
    pub plan: Vec<PlanStep>,
    pub actions: Vec<ActionResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after_donation_bonus: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after_vip_bonus: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after_upload_bonus: Option<u64>,
    pub ending_bonus: Option<u64>,
    pub ending_bonus_evidence: Vec<Candidate>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub debug: Vec<DebugArtifacts>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunSummary {
    pub fn action(&self, kind: StepKind) -> Option<&ActionResult> {
        self.actions.iter().find(|a| a.kind == kind)
    }
}

/// `--snapshot` output: the read plus the plan it implies, nothing executed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotReport {
    pub snapshot: Snapshot,
    pub evidence: Vec<Candidate>,
    pub plan: Vec<PlanStep>,
}

/// Accumulates a [`RunSummary`] as the run progresses.
#[derive(Debug)]
pub struct SummaryBuilder {
    run_id: Uuid,
    mode: String,
    threshold: u64,
    target: u64,
    cap: u64,
    started_at: DateTime<Utc>,
    notes: Vec<String>,
    start: Option<(SnapshotRead, Vec<PlanStep>)>,
    actions: Vec<ActionResult>,
    after: [Option<u64>; 3],
    ending: Option<SnapshotRead>,
    debug: Vec<DebugArtifacts>,
}

impl SummaryBuilder {
    pub fn new(config: &Config, started_at: DateTime<Utc>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            mode: config.mode().to_string(),
            threshold: config.bonus_threshold,
            target: config.bonus_target,
            cap: config.bonus_cap,
            started_at,
            notes: Vec::new(),
            start: None,
            actions: Vec::new(),
            after: [None; 3],
            ending: None,
            debug: Vec::new(),
        }
    }

    pub fn starting(&mut self, read: SnapshotRead, plan: &[PlanStep]) {
        self.start = Some((read, plan.to_vec()));
    }

    pub fn note(&mut self, note: impl Into<String>) {
        self.notes.push(note.into());
    }

    pub fn record(&mut self, result: ActionResult) {
        tracing::info!(action = %result.name, status = result.status(), "step finished");
        self.actions.push(result);
    }

    /// Balance re-read after `kind` was applied.
    pub fn after_step(&mut self, kind: StepKind, bonus: u64) {
        self.after[kind.slot()] = Some(bonus);
    }

    pub fn ending(&mut self, read: SnapshotRead) {
        self.ending = Some(read);
    }

    pub fn debug_artifacts(&mut self, artifacts: DebugArtifacts) {
        self.debug.push(artifacts);
    }

    /// Produce the summary. `None` if no starting read was recorded.
    pub fn finish(self, finished_at: DateTime<Utc>) -> Option<RunSummary> {
        let (start, plan) = self.start?;
        let should_spend = start.snapshot.should_spend();
        let (ending_bonus, ending_bonus_evidence) = match self.ending {
            Some(read) => (Some(read.snapshot.bonus_points), read.evidence),
            None => (None, Vec::new()),
        };
        Some(RunSummary {
            run_id: self.run_id,
            mode: self.mode,
            threshold: self.threshold,
            target: self.target,
            cap: self.cap,
            should_spend,
            notes: self.notes,
            starting_bonus: start.snapshot.bonus_points,
            starting_snapshot: start.snapshot,
            bonus_evidence: start.evidence,
            plan,
            actions: self.actions,
            after_donation_bonus: self.after[StepKind::Donate.slot()],
            after_vip_bonus: self.after[StepKind::Vip.slot()],
            after_upload_bonus: self.after[StepKind::Upload.slot()],
            ending_bonus,
            ending_bonus_evidence,
            debug: self.debug,
            started_at: self.started_at,
            finished_at,
        })
    }
}

//! Execution orchestrator.
//!
//! Reads the account, plans, and walks the plan in its fixed order. Each
//! ready step goes locate, confirm (when the action has a prompt), submit,
//! wait for the response, then re-read the account; the fresh read is what
//! the next step is planned from. A submit that goes unanswered is checked
//! against a fresh balance before another candidate is tried. Step failures
//! are recorded and the run carries on. Only the login and the first read can end a run early.

use crate::config::Config;
use crate::diagnostics::save_artifacts;
use crate::error::BonusError;
use crate::extract::{read_snapshot, ExtractSettings, SnapshotRead};
use crate::live::{
    action_spec, attempt, candidates, locate, login, open_overview, preview_control, read_account,
    AttemptOutcome, AttemptRecord,
};
use crate::summary::{ActionOutcome, ActionResult, RunSummary, SnapshotReport, SummaryBuilder};
use crate::surface::RemoteSurface;
use bonus_plan::{plan, group_thousands, PlanLimits, PlanStep, StepKind};
use chrono::Utc;
use serde::Serialize;
use tracing::Instrument;

/// What a run hands back to the caller.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum RunReport {
    Snapshot(SnapshotReport),
    Summary(Box<RunSummary>),
}

/// Drive one full run against an already-open surface.
pub async fn run(config: &Config, surface: &mut dyn RemoteSurface) -> Result<RunReport, BonusError> {
    let started_at = Utc::now();
    login(surface, config).await?;
    let start = first_read(config, surface).await?;

    let limits = config.plan_limits();
    let initial = plan(&start.snapshot, &limits);

    if config.snapshot_only {
        return Ok(RunReport::Snapshot(SnapshotReport {
            snapshot: start.snapshot,
            evidence: start.evidence,
            plan: initial.to_vec(),
        }));
    }

    let mut builder = SummaryBuilder::new(config, started_at);
    let should_spend = start.snapshot.should_spend();
    builder.starting(start.clone(), &initial);

    if should_spend {
        let mut runner = StepRunner {
            config,
            limits,
            surface: &mut *surface,
            latest: start,
            unverified: 0,
        };
        let latest = runner.run_steps(&mut builder).await;
        builder.ending(latest);
    } else {
        let reason = format!(
            "Bonus points ({}) are below threshold ({}); no spending planned.",
            group_thousands(start.snapshot.bonus_points),
            group_thousands(config.bonus_threshold)
        );
        tracing::info!("{reason}");
        for kind in StepKind::ORDER {
            builder.record(ActionResult::skipped(kind, reason.clone()));
        }
        builder.note(reason);
        builder.ending(start);
    }

    match save_artifacts(&*surface, &config.debug_dir, config.mode()).await {
        Ok(artifacts) => builder.debug_artifacts(artifacts),
        Err(e) => tracing::warn!("could not save debug artifacts: {e:#}"),
    }

    builder
        .finish(Utc::now())
        .map(|summary| RunReport::Summary(Box::new(summary)))
        .ok_or(BonusError::ExtractionFailure)
}

/// Open the overview and read it; a failed read leaves artifacts behind.
async fn first_read(config: &Config, surface: &mut dyn RemoteSurface) -> Result<SnapshotRead, BonusError> {
    let page = open_overview(surface, config).await?;
    match read_snapshot(&page, &ExtractSettings::from_config(config), Utc::now()) {
        Ok(read) => Ok(read),
        Err(e) => {
            if let Err(save) = save_artifacts(&*surface, &config.debug_dir, "bonus-not-found").await {
                tracing::warn!("could not save debug artifacts: {save:#}");
            }
            Err(e)
        }
    }
}

struct StepRunner<'a> {
    config: &'a Config,
    limits: PlanLimits,
    surface: &'a mut dyn RemoteSurface,
    /// Last successful read; re-planning always starts from here.
    latest: SnapshotRead,
    /// Cost of applied steps the balance has not been re-read after.
    unverified: u64,
}

impl StepRunner<'_> {
    async fn run_steps(&mut self, builder: &mut SummaryBuilder) -> SnapshotRead {
        let mut donated = false;
        for kind in StepKind::ORDER {
            let mut snapshot = self.latest.snapshot.clone();
            snapshot.donated_today |= donated;
            snapshot.bonus_points = snapshot.bonus_points.saturating_sub(self.unverified);
            let step = plan(&snapshot, &self.limits)[kind.slot()].clone();

            let span = tracing::info_span!("step", kind = kind.id(), cost = step.estimated_cost);
            let result = self.run_step(&step, builder).instrument(span).await;
            if kind == StepKind::Donate && matches!(result.outcome, ActionOutcome::Applied { .. }) {
                donated = true;
            }
            builder.record(result);
        }
        self.latest.clone()
    }

    async fn run_step(&mut self, step: &PlanStep, builder: &mut SummaryBuilder) -> ActionResult {
        let kind = step.kind;
        if !step.is_ready() {
            return ActionResult::skipped(kind, step.detail.clone());
        }
        if self.config.apply {
            self.commit(step, builder).await
        } else {
            self.preview(step).await
        }
    }

    /// Dry run: report the step with the control that would be used.
    async fn preview(&mut self, step: &PlanStep) -> ActionResult {
        let spec = action_spec(step.kind);
        let control = match locate(&*self.surface, &spec).await {
            Ok(container) => preview_control(&container, &spec, &candidates(step, &self.limits)),
            Err(e) => {
                tracing::debug!("no control preview: {e}");
                None
            }
        };
        ActionResult::new(
            step.kind,
            ActionOutcome::Planned {
                estimated_cost: step.estimated_cost,
                control,
            },
        )
    }

    async fn commit(&mut self, step: &PlanStep, builder: &mut SummaryBuilder) -> ActionResult {
        let kind = step.kind;
        let spec = action_spec(kind);

        match locate(&*self.surface, &spec).await {
            Ok(_) => {}
            Err(e @ BonusError::ActionSurfaceNotFound(_)) => {
                tracing::warn!("{e}");
                return ActionResult::skipped(kind, e.to_string());
            }
            Err(e) => {
                return ActionResult::new(
                    kind,
                    ActionOutcome::Failed {
                        error: e.to_string(),
                        attempts: Vec::new(),
                    },
                )
            }
        }

        let mut attempts: Vec<AttemptRecord> = Vec::new();
        // Outcome of a re-read taken right after the last attempt, if any.
        let mut reread: Option<bool> = None;
        for candidate in candidates(step, &self.limits) {
            reread = None;
            let before = self.latest.snapshot.bonus_points;
            let mut record = attempt(&mut *self.surface, &spec, &candidate, self.config.timeout_ms).await;
            if record.is_accepted() {
                attempts.push(record);
                break;
            }
            tracing::info!(
                candidate = %record.candidate,
                phase = ?record.phase,
                outcome = ?record.outcome,
                "attempt not accepted: {}",
                record.detail
            );
            if !record.is_unsettled() {
                attempts.push(record);
                continue;
            }

            // Submitted without an answer: the balance decides whether it
            // landed before anything else is spent.
            let read = self.reverify(kind, builder).await;
            reread = Some(read);
            if !read {
                attempts.push(record);
                break;
            }
            let spent = before.saturating_sub(self.latest.snapshot.bonus_points);
            let landed = spent > 0 && spent >= candidate.amount.unwrap_or(0);
            if landed {
                tracing::info!(spent, candidate = %record.candidate, "unanswered submit landed");
                record.settle_by_balance(spent);
            }
            attempts.push(record);
            if landed {
                break;
            }
        }

        let accepted = attempts.iter().find(|a| a.is_accepted()).cloned();
        let refreshed = match reread {
            Some(read) => read,
            None => self.reverify(kind, builder).await,
        };

        match accepted {
            Some(record) => {
                let bonus_after = refreshed.then_some(self.latest.snapshot.bonus_points);
                match bonus_after {
                    Some(bonus) => builder.after_step(kind, bonus),
                    None => self.unverified += step.estimated_cost,
                }
                ActionResult::new(
                    kind,
                    ActionOutcome::Applied {
                        estimated_cost: step.estimated_cost,
                        control: record.control.unwrap_or(record.candidate),
                        attempts,
                        bonus_after,
                    },
                )
            }
            None => {
                let error = attempts
                    .iter()
                    .rev()
                    .find(|a| a.outcome == AttemptOutcome::Rejected)
                    .or(attempts.last())
                    .map(|a| a.detail.clone())
                    .unwrap_or_else(|| "no candidate to try".to_string());
                ActionResult::new(kind, ActionOutcome::Failed { error, attempts })
            }
        }
    }

    /// Re-open the overview and re-read. On failure the last good read is
    /// kept, a note is added, and later steps plan with the applied cost
    /// taken off it.
    async fn reverify(&mut self, kind: StepKind, builder: &mut SummaryBuilder) -> bool {
        match read_account(&mut *self.surface, self.config).await {
            Ok(read) => {
                tracing::info!(bonus = read.snapshot.bonus_points, "state re-read");
                self.latest = read;
                self.unverified = 0;
                true
            }
            Err(e) => {
                let note = format!(
                    "Re-read after {} failed ({e}); continuing from the previous reading.",
                    kind.action_name()
                );
                tracing::warn!("{note}");
                builder.note(note);
                false
            }
        }
    }
}

//! The spend planner.
//!
//! `plan` is a pure function of a [`Snapshot`] and [`PlanLimits`]: no clock,
//! no I/O, no hidden state. The runtime calls it after every verified read
//! and display clients call it over a fetched snapshot, and both must agree.

use crate::types::{PlanLimits, PlanStep, Snapshot, StepKind, StepStatus, VipTier};

/// Build the three-step spend plan: donate, then VIP, then upload credit.
pub fn plan(snapshot: &Snapshot, limits: &PlanLimits) -> [PlanStep; 3] {
    let overflow = snapshot.overflow();

    let donation = donation_step(snapshot, overflow);
    let remaining_after_donation = if donation.is_ready() {
        overflow.saturating_sub(donation.estimated_cost)
    } else {
        overflow
    };

    let vip = vip_step(snapshot, limits, remaining_after_donation);
    let remaining_after_vip = if vip.is_ready() {
        remaining_after_donation.saturating_sub(vip.estimated_cost)
    } else {
        remaining_after_donation
    };

    let upload = upload_step(limits, remaining_after_vip);

    [donation, vip, upload]
}

/// Most expensive tier that fits in `remaining`, if any.
pub fn affordable_vip_tier(tiers: &[VipTier], remaining: u64) -> Option<VipTier> {
    tiers
        .iter()
        .filter(|tier| tier.cost <= remaining)
        .max_by_key(|tier| tier.cost)
        .copied()
}

/// `remaining` floored to a whole number of exchange units.
pub fn floor_to_unit(remaining: u64, unit: u64) -> u64 {
    let unit = unit.max(1);
    (remaining / unit) * unit
}

fn donation_step(snapshot: &Snapshot, overflow: u64) -> PlanStep {
    let kind = StepKind::Donate;
    if snapshot.donated_today {
        return PlanStep::new(
            kind,
            StepStatus::Blocked,
            0,
            "Already donated for the current day.".into(),
        );
    }
    if overflow == 0 {
        return PlanStep::new(
            kind,
            StepStatus::NotNeeded,
            0,
            "No bonus overflow to reduce.".into(),
        );
    }
    if snapshot.max_daily_donation == 0 {
        return PlanStep::new(
            kind,
            StepStatus::Blocked,
            0,
            "No donation allowance is advertised today.".into(),
        );
    }
    PlanStep::new(
        kind,
        StepStatus::Ready,
        overflow.min(snapshot.max_daily_donation),
        format!(
            "Donate up to {} points today.",
            group_thousands(snapshot.max_daily_donation)
        ),
    )
}

fn vip_step(snapshot: &Snapshot, limits: &PlanLimits, remaining: u64) -> PlanStep {
    let kind = StepKind::Vip;
    if snapshot.vip_weeks_remaining >= limits.vip_cap_weeks {
        return PlanStep::new(
            kind,
            StepStatus::Blocked,
            0,
            format!(
                "VIP time is already at the {} week cap.",
                limits.vip_cap_weeks
            ),
        );
    }
    if remaining == 0 {
        return PlanStep::new(
            kind,
            StepStatus::NotNeeded,
            0,
            "No overflow remains after donation.".into(),
        );
    }
    match affordable_vip_tier(&limits.vip_tiers, remaining) {
        Some(tier) => PlanStep::new(
            kind,
            StepStatus::Ready,
            tier.cost,
            format!(
                "Buy {} weeks of VIP for {} points.",
                tier.weeks,
                group_thousands(tier.cost)
            ),
        ),
        None => {
            let cheapest = limits
                .vip_tiers
                .iter()
                .map(|tier| tier.cost)
                .min()
                .unwrap_or_default();
            PlanStep::new(
                kind,
                StepStatus::Blocked,
                0,
                format!(
                    "Need at least {} points to buy a fixed VIP block.",
                    group_thousands(cheapest)
                ),
            )
        }
    }
}

fn upload_step(limits: &PlanLimits, remaining: u64) -> PlanStep {
    let kind = StepKind::Upload;
    if remaining < limits.upload_unit.max(1) {
        let status = if remaining == 0 {
            StepStatus::NotNeeded
        } else {
            StepStatus::Blocked
        };
        return PlanStep::new(
            kind,
            status,
            0,
            format!(
                "Leftover is below the minimum {}-point exchange.",
                group_thousands(limits.upload_unit)
            ),
        );
    }
    PlanStep::new(
        kind,
        StepStatus::Ready,
        floor_to_unit(remaining, limits.upload_unit),
        "Exchange remaining points into upload credit blocks.".into(),
    )
}

/// `12345` → `"12,345"`.
pub fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(bonus: u64, target: u64) -> Snapshot {
        Snapshot {
            bonus_points: bonus,
            threshold: 98_000,
            target,
            max_cap: 99_999,
            donated_today: false,
            max_daily_donation: 2_000,
            vip_weeks_remaining: 5.0,
            checked_at: "2026-02-16T21:37:17Z".into(),
            donation_history: Vec::new(),
        }
    }

    fn statuses(steps: &[PlanStep; 3]) -> [StepStatus; 3] {
        [steps[0].status, steps[1].status, steps[2].status]
    }

    fn costs(steps: &[PlanStep; 3]) -> [u64; 3] {
        [
            steps[0].estimated_cost,
            steps[1].estimated_cost,
            steps[2].estimated_cost,
        ]
    }

    #[test]
    fn test_scenario_overflow_spends_all_three() {
        let snap = snapshot(99_000, 90_000);
        let steps = plan(&snap, &PlanLimits::default());

        assert_eq!(statuses(&steps), [StepStatus::Ready; 3]);
        assert_eq!(costs(&steps), [2_000, 5_000, 2_000]);
        assert_eq!(steps[0].kind, StepKind::Donate);
        assert_eq!(steps[1].kind, StepKind::Vip);
        assert_eq!(steps[2].kind, StepKind::Upload);
    }

    #[test]
    fn test_scenario_below_target_needs_nothing() {
        let snap = snapshot(38_758, 90_000);
        let steps = plan(&snap, &PlanLimits::default());

        assert_eq!(statuses(&steps), [StepStatus::NotNeeded; 3]);
        assert_eq!(costs(&steps), [0, 0, 0]);
    }

    #[test]
    fn test_scenario_already_donated_uses_full_overflow() {
        let mut snap = snapshot(99_000, 90_000);
        snap.donated_today = true;
        let steps = plan(&snap, &PlanLimits::default());

        assert_eq!(steps[0].status, StepStatus::Blocked);
        assert_eq!(steps[0].estimated_cost, 0);
        // 9000 overflow: 4-week tier, then 4000 left for upload.
        assert_eq!(steps[1].estimated_cost, 5_000);
        assert_eq!(steps[2].estimated_cost, 4_000);
    }

    #[test]
    fn test_plan_is_deterministic() {
        let snap = snapshot(97_321, 80_000);
        let limits = PlanLimits::default();
        assert_eq!(plan(&snap, &limits), plan(&snap, &limits));
    }

    #[test]
    fn test_donation_never_exceeds_allowance_or_overflow() {
        let limits = PlanLimits::default();
        for (bonus, allowance) in [(90_001, 2_000), (91_500, 2_000), (95_000, 700)] {
            let mut snap = snapshot(bonus, 90_000);
            snap.max_daily_donation = allowance;
            let step = &plan(&snap, &limits)[0];
            assert!(step.estimated_cost <= snap.overflow().min(allowance));
        }
    }

    #[test]
    fn test_zero_allowance_blocks_donation() {
        let mut snap = snapshot(95_000, 90_000);
        snap.max_daily_donation = 0;
        let steps = plan(&snap, &PlanLimits::default());
        assert_eq!(steps[0].status, StepStatus::Blocked);
        assert_eq!(steps[1].estimated_cost, 5_000);
    }

    #[test]
    fn test_vip_tier_boundaries() {
        let limits = PlanLimits::default();
        let cases = [
            (4_999, None),
            (5_000, Some(5_000)),
            (9_999, Some(5_000)),
            (10_000, Some(10_000)),
            (14_999, Some(10_000)),
            (15_000, Some(15_000)),
            (40_000, Some(15_000)),
        ];
        for (remaining, expected) in cases {
            let mut snap = snapshot(90_000 + remaining, 90_000);
            snap.donated_today = true;
            let vip = &plan(&snap, &limits)[1];
            match expected {
                Some(cost) => {
                    assert_eq!(vip.status, StepStatus::Ready, "remaining {remaining}");
                    assert_eq!(vip.estimated_cost, cost, "remaining {remaining}");
                }
                None => assert_eq!(vip.status, StepStatus::Blocked, "remaining {remaining}"),
            }
        }
    }

    #[test]
    fn test_vip_at_cap_is_blocked() {
        let mut snap = snapshot(99_000, 90_000);
        snap.vip_weeks_remaining = 12.8;
        let steps = plan(&snap, &PlanLimits::default());
        assert_eq!(steps[1].status, StepStatus::Blocked);
        // Upload picks up what VIP could not spend.
        assert_eq!(steps[2].estimated_cost, 7_000);
    }

    #[test]
    fn test_upload_floors_to_unit() {
        let limits = PlanLimits::default();
        for remaining in [500, 501, 999, 1_000, 3_250, 4_999] {
            let mut snap = snapshot(90_000 + remaining, 90_000);
            snap.donated_today = true;
            snap.vip_weeks_remaining = 13.0;
            let upload = &plan(&snap, &limits)[2];
            assert_eq!(upload.estimated_cost, (remaining / 500) * 500);
            assert_eq!(upload.estimated_cost % 500, 0);
            assert!(upload.estimated_cost <= remaining);
        }
    }

    #[test]
    fn test_upload_leftover_below_unit() {
        let limits = PlanLimits::default();

        let mut snap = snapshot(90_300, 90_000);
        snap.donated_today = true;
        assert_eq!(plan(&snap, &limits)[2].status, StepStatus::Blocked);

        snap.bonus_points = 90_000;
        assert_eq!(plan(&snap, &limits)[2].status, StepStatus::NotNeeded);
    }

    #[test]
    fn test_inverted_ordering_degrades_to_not_needed() {
        let mut snap = snapshot(50_000, 99_999);
        snap.threshold = 10;
        snap.max_cap = 5;
        let steps = plan(&snap, &PlanLimits::default());
        assert_eq!(statuses(&steps), [StepStatus::NotNeeded; 3]);
    }

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(2_000), "2,000");
        assert_eq!(group_thousands(1_234_567), "1,234,567");
    }

    #[test]
    fn test_plan_json_shape() {
        let steps = plan(&snapshot(99_000, 90_000), &PlanLimits::default());
        let json = serde_json::to_value(&steps[0]).unwrap();
        assert_eq!(json["id"], "donation");
        assert_eq!(json["kind"], "donate");
        assert_eq!(json["status"], "ready");
        assert_eq!(json["estimatedCost"], 2000);
    }
}

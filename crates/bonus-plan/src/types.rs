//! Snapshot and plan value types.

use serde::{Deserialize, Serialize};

/// One row of the account's donation history, in scraped order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DonationRecord {
    pub date: String,
    pub amount: u64,
}

/// The account's economic state at one point in time.
///
/// A fresh value is produced by every read of the account overview; nothing
/// mutates a snapshot after it has been built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub bonus_points: u64,
    pub threshold: u64,
    pub target: u64,
    pub max_cap: u64,
    pub donated_today: bool,
    pub max_daily_donation: u64,
    pub vip_weeks_remaining: f64,
    /// RFC 3339 timestamp of the read.
    pub checked_at: String,
    #[serde(default)]
    pub donation_history: Vec<DonationRecord>,
}

impl Snapshot {
    /// Points above the configured target, zero when at or below it.
    pub fn overflow(&self) -> u64 {
        self.bonus_points.saturating_sub(self.target)
    }

    /// Whether the balance has reached the spending threshold.
    pub fn should_spend(&self) -> bool {
        self.bonus_points >= self.threshold
    }
}

/// Which benefit a plan step buys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    Donate,
    Vip,
    Upload,
}

impl StepKind {
    /// Fixed execution order.
    pub const ORDER: [StepKind; 3] = [StepKind::Donate, StepKind::Vip, StepKind::Upload];

    /// Stable identifier used in plan JSON.
    pub fn id(&self) -> &'static str {
        match self {
            StepKind::Donate => "donation",
            StepKind::Vip => "vip",
            StepKind::Upload => "upload",
        }
    }

    /// Name used for the step's action result.
    pub fn action_name(&self) -> &'static str {
        match self {
            StepKind::Donate => "donate_millionaires_club",
            StepKind::Vip => "extend_vip",
            StepKind::Upload => "buy_upload_credit",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            StepKind::Donate => "Millionaire's Club",
            StepKind::Vip => "VIP Extension",
            StepKind::Upload => "Upload Credit",
        }
    }

    /// Position of this kind inside a plan.
    pub fn slot(&self) -> usize {
        match self {
            StepKind::Donate => 0,
            StepKind::Vip => 1,
            StepKind::Upload => 2,
        }
    }
}

/// Planner verdict for a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepStatus {
    Ready,
    Blocked,
    NotNeeded,
}

/// One priced action in the spend sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanStep {
    pub id: String,
    pub kind: StepKind,
    pub title: String,
    pub detail: String,
    pub status: StepStatus,
    pub estimated_cost: u64,
}

impl PlanStep {
    pub(crate) fn new(kind: StepKind, status: StepStatus, cost: u64, detail: String) -> Self {
        Self {
            id: kind.id().to_string(),
            kind,
            title: kind.title().to_string(),
            detail,
            status,
            estimated_cost: cost,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.status == StepStatus::Ready
    }
}

/// A fixed-price VIP block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VipTier {
    pub weeks: u32,
    pub cost: u64,
}

/// VIP tiers, most expensive first.
pub const VIP_TIERS: [VipTier; 3] = [
    VipTier { weeks: 12, cost: 15_000 },
    VipTier { weeks: 8, cost: 10_000 },
    VipTier { weeks: 4, cost: 5_000 },
];

/// Limits the planner applies on top of a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanLimits {
    /// VIP time the site will not extend past.
    pub vip_cap_weeks: f64,
    /// Smallest upload-credit exchange, in points.
    pub upload_unit: u64,
    /// Descending tier table.
    pub vip_tiers: Vec<VipTier>,
}

impl Default for PlanLimits {
    fn default() -> Self {
        Self {
            vip_cap_weeks: 12.8,
            upload_unit: 500,
            vip_tiers: VIP_TIERS.to_vec(),
        }
    }
}

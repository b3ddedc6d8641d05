//! Configuration loading and resolution.
//!
//! Every setting comes from a `MAM_*` environment variable with a built-in
//! default; CLI flags can only switch modes on. Lookups go through a closure
//! so tests never touch the process environment.

use crate::error::BonusError;
use crate::surface::chromium::Pacing;
use bonus_plan::PlanLimits;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_LOGIN_URL: &str = "https://www.myanonamouse.net/login.php?returnto=%2Fstore.php";
pub const DEFAULT_STORE_URL: &str = "https://www.myanonamouse.net/store.php";

/// Resolved settings for one process.
#[derive(Debug, Clone)]
pub struct Config {
    pub email: String,
    pub password: String,
    pub login_url: String,
    pub store_url: String,
    /// Commit mode: submit planned actions instead of reporting them.
    pub apply: bool,
    pub headless: bool,
    pub bonus_cap: u64,
    pub bonus_threshold: u64,
    pub bonus_target: u64,
    /// Per-cycle donation amount, used when the page advertises none.
    pub donate_points: u64,
    pub min_upload_spend: u64,
    pub vip_cap_weeks: f64,
    pub timeout_ms: u64,
    pub pace_min_ms: u64,
    pub pace_max_ms: u64,
    pub debug_dir: PathBuf,
    /// Read-only: report the snapshot and skip all mutation.
    pub snapshot_only: bool,
    /// Machine-readable single-line output.
    pub json_output: bool,
    /// CSS selector of the element that carries the balance on its own.
    pub bonus_selector: String,
    /// Parsed balances above this are rejected as table totals.
    pub bonus_ceiling: u64,
    pub snapshot_ttl: Duration,
}

/// Mode switches coming from the command line.
#[derive(Debug, Clone, Copy, Default)]
pub struct CliOverrides {
    pub apply: bool,
    pub headed: bool,
    pub snapshot: bool,
    pub json: bool,
}

impl Config {
    /// Load from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let text = |key: &str, default: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };
        let int = |key: &str, default: u64| parse_int(lookup(key).as_deref(), default);
        let flag = |key: &str, default: bool| parse_bool(lookup(key).as_deref(), default);

        let email = lookup("MAM_EMAIL")
            .filter(|v| !v.is_empty())
            .or_else(|| lookup("MAM_USERNAME"))
            .unwrap_or_default();

        Self {
            email,
            password: lookup("MAM_PASSWORD").unwrap_or_default(),
            login_url: text("MAM_LOGIN_URL", DEFAULT_LOGIN_URL),
            store_url: text("MAM_STORE_URL", DEFAULT_STORE_URL),
            apply: flag("MAM_APPLY", false),
            headless: flag("MAM_HEADLESS", false),
            bonus_cap: int("MAM_BONUS_CAP", 99_999),
            bonus_threshold: int("MAM_BONUS_THRESHOLD", 98_000),
            bonus_target: int("MAM_BONUS_TARGET", 90_000),
            donate_points: int("MAM_DONATE_POINTS", 2_000),
            min_upload_spend: int("MAM_MIN_UPLOAD_SPEND", 500),
            vip_cap_weeks: lookup("MAM_VIP_CAP_WEEKS")
                .and_then(|v| v.trim().parse::<f64>().ok())
                .filter(|v| v.is_finite())
                .unwrap_or(12.8),
            timeout_ms: int("MAM_TIMEOUT_MS", 45_000),
            pace_min_ms: int("MAM_PACE_MIN_MS", 150),
            pace_max_ms: int("MAM_PACE_MAX_MS", 450),
            debug_dir: PathBuf::from(text("MAM_DEBUG_DIR", "./debug")),
            snapshot_only: flag("MAM_SNAPSHOT", false),
            json_output: flag("MAM_JSON", false),
            bonus_selector: text("MAM_BONUS_SELECTOR", "#tmBP"),
            bonus_ceiling: int("MAM_BONUS_CEILING", 500_000),
            snapshot_ttl: Duration::from_secs(int("MAM_SNAPSHOT_TTL_SECS", 300)),
        }
    }

    /// Fold CLI switches in. Flags only ever turn a mode on.
    pub fn with_overrides(mut self, cli: CliOverrides) -> Self {
        self.apply |= cli.apply;
        self.snapshot_only |= cli.snapshot;
        self.json_output |= cli.json;
        if cli.headed {
            self.headless = false;
        }
        self
    }

    pub fn require_credentials(&self) -> Result<(), BonusError> {
        if self.email.trim().is_empty() || self.password.is_empty() {
            return Err(BonusError::MissingCredentials);
        }
        Ok(())
    }

    pub fn plan_limits(&self) -> PlanLimits {
        PlanLimits {
            vip_cap_weeks: self.vip_cap_weeks,
            upload_unit: self.min_upload_spend.max(1),
            ..PlanLimits::default()
        }
    }

    pub fn pacing(&self) -> Pacing {
        Pacing {
            min_ms: self.pace_min_ms,
            max_ms: self.pace_max_ms,
        }
    }

    /// `dry-run` or `apply`.
    pub fn mode(&self) -> &'static str {
        if self.apply {
            "apply"
        } else {
            "dry-run"
        }
    }
}

/// Parse a boolean switch; unknown values keep the default.
pub fn parse_bool(value: Option<&str>, default: bool) -> bool {
    let Some(value) = value else {
        return default;
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" => true,
        "0" | "false" | "no" | "n" | "off" => false,
        _ => default,
    }
}

/// Parse a non-negative integer; anything unparseable keeps the default.
pub fn parse_int(value: Option<&str>, default: u64) -> u64 {
    value
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(default)
}

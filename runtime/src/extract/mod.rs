//! State extraction: turn raw page content into a [`Snapshot`].
//!
//! Each reader is a synchronous function over text or HTML so it can be
//! tested against fixture pages. [`capture_page`] is the only part that
//! touches the remote surface.

pub mod account;
pub mod bonus;
pub mod history;
pub mod text;

pub use account::{read_donation_status, read_vip_weeks, DonationStatus};
pub use bonus::{read_bonus_points, BonusReading, Candidate};
pub use history::read_donation_history;

use crate::config::Config;
use crate::error::BonusError;
use crate::surface::RemoteSurface;
use anyhow::{Context, Result};
use bonus_plan::Snapshot;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Everything the readers need from one page load.
#[derive(Debug, Clone, Default)]
pub struct PageContent {
    pub text: String,
    pub html: String,
    /// Own text of the labeled balance element, when the page has one.
    pub structured: Option<String>,
}

/// Settings the readers take from configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractSettings {
    pub ceiling: u64,
    pub threshold: u64,
    pub target: u64,
    pub max_cap: u64,
    pub default_allowance: u64,
}

impl ExtractSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            ceiling: config.bonus_ceiling,
            threshold: config.bonus_threshold,
            target: config.bonus_target,
            max_cap: config.bonus_cap,
            default_allowance: config.donate_points,
        }
    }
}

/// A snapshot plus the balance evidence it was built from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRead {
    pub snapshot: Snapshot,
    pub evidence: Vec<Candidate>,
}

/// Pull text, HTML and the labeled balance element off the surface.
pub async fn capture_page(surface: &dyn RemoteSurface, selector: &str) -> Result<PageContent> {
    let text = surface.page_text().await.context("failed to read page text")?;
    let html = surface.page_html().await.context("failed to read page HTML")?;
    let structured = match surface.element_text(selector).await {
        Ok(found) => found,
        Err(e) => {
            tracing::debug!("labeled balance element unreadable: {e:#}");
            None
        }
    };
    Ok(PageContent {
        text,
        html,
        structured,
    })
}

/// Build a snapshot from one page load.
///
/// Fails with [`BonusError::ExtractionFailure`] when no balance candidate
/// survives; a missing balance is never read as zero.
pub fn read_snapshot(
    page: &PageContent,
    settings: &ExtractSettings,
    checked_at: DateTime<Utc>,
) -> Result<SnapshotRead, BonusError> {
    let reading = read_bonus_points(&page.text, page.structured.as_deref(), settings.ceiling);
    let Some(bonus_points) = reading.value else {
        return Err(BonusError::ExtractionFailure);
    };
    let donation = read_donation_status(&page.text, settings.default_allowance);

    let snapshot = Snapshot {
        bonus_points,
        threshold: settings.threshold,
        target: settings.target,
        max_cap: settings.max_cap,
        donated_today: donation.donated_today,
        max_daily_donation: donation.max_daily_donation,
        vip_weeks_remaining: read_vip_weeks(&page.text),
        checked_at: checked_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        donation_history: read_donation_history(&page.html),
    };

    tracing::info!(
        bonus = snapshot.bonus_points,
        donated_today = snapshot.donated_today,
        vip_weeks = snapshot.vip_weeks_remaining,
        "account state read"
    );

    Ok(SnapshotRead {
        snapshot,
        evidence: reading.evidence,
    })
}

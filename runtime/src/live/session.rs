//! Session setup: log in and open the account overview.

use crate::config::Config;
use crate::error::BonusError;
use crate::extract::{capture_page, read_snapshot, ExtractSettings, PageContent, SnapshotRead};
use crate::locator::pick_control;
use crate::surface::{Container, RemoteSurface};
use chrono::Utc;
use url::Url;

/// Page phrases that explain why a login did not stick.
pub const LOGIN_FAILURE_HINTS: &[&str] = &[
    "not logged in",
    "problem logging in",
    "cookies enabled",
    "failed login",
];

const SUBMIT_LABELS: &[&str] = &["log in", "login", "sign in", "submit"];

/// Whether `url` points at the login page.
pub fn is_login_url(url: &str) -> bool {
    match Url::parse(url) {
        Ok(parsed) => parsed.path().ends_with("/login.php"),
        Err(_) => url.contains("/login.php"),
    }
}

fn login_form(containers: &[Container]) -> Option<&Container> {
    containers.iter().find(|c| {
        c.fields.iter().any(|f| f.name.eq_ignore_ascii_case("password"))
            && (c.field_named("email").is_some() || c.field_named("username").is_some())
    })
}

/// Fill and submit the login form.
///
/// A page that still asks for a password afterwards and shows one of
/// [`LOGIN_FAILURE_HINTS`] fails with [`BonusError::LoginFailure`].
pub async fn login(surface: &mut dyn RemoteSurface, config: &Config) -> Result<(), BonusError> {
    config.require_credentials()?;

    surface.navigate(&config.login_url, config.timeout_ms).await?;
    surface.settle().await;

    let containers = surface.containers().await?;
    let form = login_form(&containers)
        .ok_or_else(|| BonusError::LoginFailure("login fields not found".into()))?;
    let user_field = form
        .field_named("email")
        .or_else(|| form.field_named("username"))
        .ok_or_else(|| BonusError::LoginFailure("login fields not found".into()))?;
    let password_field = form
        .field_named("password")
        .ok_or_else(|| BonusError::LoginFailure("login fields not found".into()))?;

    surface
        .set_field(form.index, user_field.index, &config.email)
        .await?;
    surface
        .set_field(form.index, password_field.index, &config.password)
        .await?;

    let submit = pick_control(form, SUBMIT_LABELS)
        .ok_or_else(|| BonusError::LoginFailure("login submit button not found".into()))?;
    tracing::debug!(control = %submit.label, "submitting login form");
    surface.click_control(form.index, submit.index).await?;
    surface.settle().await;

    let url = surface.current_url().await?;
    let still_asking = is_login_url(&url) || login_form(&surface.containers().await?).is_some();
    if still_asking {
        let text = surface.page_text().await?.to_lowercase();
        if let Some(hint) = LOGIN_FAILURE_HINTS.iter().find(|hint| text.contains(*hint)) {
            return Err(BonusError::LoginFailure(hint.to_string()));
        }
        tracing::warn!(%url, "login form still present after submit");
    }
    tracing::info!("logged in");
    Ok(())
}

/// Navigate to the account overview and capture it.
pub async fn open_overview(
    surface: &mut dyn RemoteSurface,
    config: &Config,
) -> Result<PageContent, BonusError> {
    surface.navigate(&config.store_url, config.timeout_ms).await?;
    surface.settle().await;

    let url = surface.current_url().await?;
    if is_login_url(&url) {
        return Err(BonusError::SessionUnauthenticated(config.store_url.clone()));
    }
    Ok(capture_page(&*surface, &config.bonus_selector).await?)
}

/// Open the overview and read a fresh snapshot from it.
pub async fn read_account(
    surface: &mut dyn RemoteSurface,
    config: &Config,
) -> Result<SnapshotRead, BonusError> {
    let page = open_overview(surface, config).await?;
    read_snapshot(&page, &ExtractSettings::from_config(config), Utc::now())
}

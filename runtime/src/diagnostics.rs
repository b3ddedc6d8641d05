//! Debug artifacts: page HTML, a screenshot and the discovered containers,
//! written to a timestamped directory under the configured debug root.

use crate::surface::{Container, RemoteSurface};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Paths of one artifact set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugArtifacts {
    pub dir: PathBuf,
    pub html_path: PathBuf,
    /// `None` when the screenshot could not be taken.
    pub screenshot_path: Option<PathBuf>,
    pub containers_path: PathBuf,
}

/// Directory name for an artifact set: RFC 3339 stamp made filename-safe.
pub fn artifact_dir_name(at: DateTime<Utc>, label: &str) -> String {
    let stamp = at.format("%Y-%m-%dT%H-%M-%S-%3fZ").to_string();
    format!("{stamp}-{label}")
}

/// Write already-captured artifacts to disk.
pub fn write_artifacts(
    root: &Path,
    label: &str,
    at: DateTime<Utc>,
    html: &str,
    screenshot: Option<&[u8]>,
    containers: &[Container],
) -> Result<DebugArtifacts> {
    let dir = root.join(artifact_dir_name(at, label));
    fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create debug dir: {}", dir.display()))?;

    let html_path = dir.join("page.html");
    fs::write(&html_path, html).context("failed to write page.html")?;

    let screenshot_path = match screenshot {
        Some(png) => {
            let path = dir.join("page.png");
            fs::write(&path, png).context("failed to write page.png")?;
            Some(path)
        }
        None => None,
    };

    let containers_path = dir.join("containers.json");
    let json = serde_json::to_string_pretty(containers)?;
    fs::write(&containers_path, json).context("failed to write containers.json")?;

    Ok(DebugArtifacts {
        dir,
        html_path,
        screenshot_path,
        containers_path,
    })
}

/// Capture the current page from the surface and write it out.
///
/// The screenshot and container list are best-effort; only the HTML read
/// and the writes themselves can fail.
pub async fn save_artifacts(
    surface: &dyn RemoteSurface,
    root: &Path,
    label: &str,
) -> Result<DebugArtifacts> {
    let html = surface.page_html().await?;
    let screenshot = match surface.screenshot().await {
        Ok(png) => Some(png),
        Err(e) => {
            tracing::debug!("screenshot unavailable: {e:#}");
            None
        }
    };
    let containers = surface.containers().await.unwrap_or_default();

    let artifacts = write_artifacts(
        root,
        label,
        Utc::now(),
        &html,
        screenshot.as_deref(),
        &containers,
    )?;
    tracing::info!(dir = %artifacts.dir.display(), "debug artifacts saved");
    Ok(artifacts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_dir_name_is_filename_safe() {
        let at = Utc.with_ymd_and_hms(2026, 2, 16, 21, 37, 17).unwrap();
        let name = artifact_dir_name(at, "dry-run");
        assert_eq!(name, "2026-02-16T21-37-17-000Z-dry-run");
        assert!(!name.contains(':'));
    }

    #[test]
    fn test_write_artifacts() {
        let tmp = tempfile::tempdir().unwrap();
        let at = Utc.with_ymd_and_hms(2026, 2, 16, 21, 37, 17).unwrap();
        let containers = vec![Container {
            index: 0,
            text: "VIP".into(),
            controls: Vec::new(),
            fields: Vec::new(),
        }];
        let artifacts = write_artifacts(
            tmp.path(),
            "bonus-not-found",
            at,
            "<html></html>",
            Some(&b"\x89PNG"[..]),
            &containers,
        )
        .unwrap();

        assert!(artifacts.dir.starts_with(tmp.path()));
        assert_eq!(fs::read_to_string(&artifacts.html_path).unwrap(), "<html></html>");
        assert!(artifacts.screenshot_path.unwrap().exists());
        let saved: Vec<Container> =
            serde_json::from_str(&fs::read_to_string(&artifacts.containers_path).unwrap()).unwrap();
        assert_eq!(saved, containers);
    }

    #[test]
    fn test_missing_screenshot_is_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        let artifacts = write_artifacts(tmp.path(), "x", Utc::now(), "", None, &[]).unwrap();
        assert!(artifacts.screenshot_path.is_none());
        assert!(!artifacts.dir.join("page.png").exists());
    }
}

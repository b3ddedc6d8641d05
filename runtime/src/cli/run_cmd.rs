//! The default command: one run against the live account.

use super::output;
use crate::config::Config;
use crate::orchestrator::{self, RunReport};
use crate::surface::chromium::{ChromiumRenderer, LaunchOptions};
use crate::surface::Renderer;
use anyhow::Result;

pub async fn run(config: &Config) -> Result<()> {
    config.require_credentials()?;
    tracing::info!(
        mode = config.mode(),
        snapshot_only = config.snapshot_only,
        "starting run"
    );

    let renderer = ChromiumRenderer::launch(LaunchOptions {
        headless: config.headless,
        pacing: config.pacing(),
    })
    .await?;
    let mut surface = renderer.new_surface().await?;

    let result = orchestrator::run(config, surface.as_mut()).await;

    if let Err(e) = surface.close().await {
        tracing::debug!("surface close failed: {e:#}");
    }
    renderer.shutdown().await?;

    let report = result?;
    if let RunReport::Summary(summary) = &report {
        tracing::info!(
            starting = summary.starting_bonus,
            ending = ?summary.ending_bonus,
            "run finished"
        );
    }
    output::print_json(&report, config.json_output);
    Ok(())
}

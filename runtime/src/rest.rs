// Copyright 2026 bonus-steward contributors
// SPDX-License-Identifier: Apache-2.0

//! Read-only HTTP service for dashboards.
//!
//! Serves the latest account snapshot and the plan the shared planner
//! derives from it. Live reads are serialized behind one lock and cached for
//! the configured TTL; `?refresh=true` forces a live read.

use crate::cache::{Clock, SnapshotCache, SystemClock};
use crate::config::Config;
use crate::error::BonusError;
use crate::live::{login, read_account};
use crate::surface::chromium::{ChromiumRenderer, LaunchOptions};
use crate::surface::Renderer;
use async_trait::async_trait;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use bonus_plan::{plan, PlanLimits, PlanStep, Snapshot};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};

/// Where fresh snapshots come from.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn fetch(&self) -> Result<Snapshot, BonusError>;
}

/// Reads the account through a short-lived browser session.
pub struct LiveSource {
    config: Config,
}

impl LiveSource {
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}

#[async_trait]
impl SnapshotSource for LiveSource {
    async fn fetch(&self) -> Result<Snapshot, BonusError> {
        self.config.require_credentials()?;
        let renderer = ChromiumRenderer::launch(LaunchOptions {
            headless: self.config.headless,
            pacing: self.config.pacing(),
        })
        .await?;
        let mut surface = renderer.new_surface().await?;

        let result = async {
            login(surface.as_mut(), &self.config).await?;
            read_account(surface.as_mut(), &self.config).await
        }
        .await;

        if let Err(e) = surface.close().await {
            tracing::debug!("surface close failed: {e:#}");
        }
        if let Err(e) = renderer.shutdown().await {
            tracing::debug!("renderer shutdown failed: {e:#}");
        }
        result.map(|read| read.snapshot)
    }
}

/// State shared by all handlers.
pub struct AppState {
    source: Arc<dyn SnapshotSource>,
    cache: Mutex<SnapshotCache<Arc<dyn Clock>>>,
    limits: PlanLimits,
    started_at: Instant,
}

impl AppState {
    pub fn new(
        source: Arc<dyn SnapshotSource>,
        clock: Arc<dyn Clock>,
        config: &Config,
    ) -> Self {
        Self {
            source,
            cache: Mutex::new(SnapshotCache::new(clock, config.snapshot_ttl)),
            limits: config.plan_limits(),
            started_at: Instant::now(),
        }
    }

    /// Cached snapshot when fresh, otherwise a live read.
    ///
    /// The lock is held across the live read so concurrent requests share
    /// one browser session instead of racing to log in.
    pub async fn snapshot(&self, refresh: bool) -> Result<Snapshot, BonusError> {
        let mut cache = self.cache.lock().await;
        if !refresh {
            if let Some(snapshot) = cache.fresh() {
                return Ok(snapshot.clone());
            }
        }
        tracing::info!(refresh, "fetching live snapshot");
        let snapshot = self.source.fetch().await?;
        cache.store(snapshot.clone());
        Ok(snapshot)
    }
}

/// `{"error": message}` with a 502.
pub struct ApiError(BonusError);

impl From<BonusError> for ApiError {
    fn from(e: BonusError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        tracing::warn!(code = self.0.code(), "snapshot request failed: {}", self.0);
        let body = Json(serde_json::json!({ "error": self.0.to_string() }));
        (StatusCode::BAD_GATEWAY, body).into_response()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct RefreshParams {
    #[serde(default)]
    refresh: bool,
}

/// Response of the plan endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct PlanResponse {
    pub snapshot: Snapshot,
    pub plan: Vec<PlanStep>,
}

/// Build the axum Router with all endpoints.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/api/v1/snapshot", get(handle_snapshot))
        .route("/api/v1/plan", get(handle_plan))
        .layer(cors)
        .with_state(state)
}

/// Serve the live source on `port` until the process is stopped.
pub async fn start(port: u16, config: Config) -> anyhow::Result<()> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let state = AppState::new(Arc::new(LiveSource::new(config.clone())), clock, &config);
    let app = router(Arc::new(state));
    let addr = std::net::SocketAddr::from(([127, 0, 0, 1], port));
    tracing::info!("snapshot service listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_seconds": state.started_at.elapsed().as_secs_f64(),
    }))
}

async fn handle_snapshot(
    Query(params): Query<RefreshParams>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Snapshot>, ApiError> {
    Ok(Json(state.snapshot(params.refresh).await?))
}

async fn handle_plan(
    Query(params): Query<RefreshParams>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<PlanResponse>, ApiError> {
    let snapshot = state.snapshot(params.refresh).await?;
    let steps = plan(&snapshot, &state.limits);
    Ok(Json(PlanResponse {
        snapshot,
        plan: steps.to_vec(),
    }))
}

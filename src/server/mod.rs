//! JSON HTTP surface over the finance and work log services.

pub mod auth;
pub mod error;
mod extract;
mod finance;
mod stats;
mod worklog;

use std::sync::Arc;

use axum::{middleware, routing::get, Json, Router};
use serde::Serialize;
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::info;

use crate::{
    config::{AppConfig, ConfigManager},
    core::services::{FinanceService, WorkLogService},
    currency::RateTable,
    errors::Result,
    storage::{JsonStorage, StorageBackend},
};

pub use auth::AuthSettings;
pub use error::{ApiError, ApiResult};

pub struct AppState {
    pub finance: FinanceService,
    pub worklog: WorkLogService,
    pub auth: AuthSettings,
}

/// Response envelope shared by every endpoint.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Loads both collections from `storage` and wires up the services.
pub fn build_state(
    config: &AppConfig,
    storage: Arc<dyn StorageBackend>,
) -> Result<Arc<AppState>> {
    let finance =
        FinanceService::load(storage.clone(), RateTable::standard(), config.page_size)?;
    let worklog = WorkLogService::load(storage, config.overtime_accounting)?;
    Ok(Arc::new(AppState {
        finance,
        worklog,
        auth: AuthSettings::from_config(config),
    }))
}

#[derive(Serialize)]
struct Health {
    status: &'static str,
}

async fn health() -> Json<ApiResponse<Health>> {
    Json(ApiResponse::ok(Health { status: "ok" }))
}

pub fn app_router(state: Arc<AppState>, config: &AppConfig) -> Router {
    let api = Router::new()
        .merge(finance::router())
        .merge(worklog::router())
        .merge(stats::router());

    let mut protected = Router::new().nest("/api", api);
    if let Some(dir) = config.static_dir.as_ref().filter(|dir| dir.is_dir()) {
        info!(dir = %dir.display(), "serving static files");
        protected = protected.nest_service("/static", ServeDir::new(dir));
    }
    let protected = protected.layer(middleware::from_fn_with_state(
        state.clone(),
        auth::require_auth,
    ));

    Router::new()
        .route("/api/health", get(health))
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    #[error(transparent)]
    Tracker(#[from] crate::errors::TrackerError),
    #[error("server I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Loads configuration and data from the data directory and serves until shutdown.
pub async fn run_server() -> std::result::Result<(), ServeError> {
    let manager = ConfigManager::new()?;
    let config = manager.load()?.with_env_overrides();
    let storage = JsonStorage::new(
        Some(manager.base_dir().to_path_buf()),
        Some(config.backup_retention),
    )?;
    let state = build_state(&config, Arc::new(storage))?;
    let app = app_router(state, &config);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    info!(addr = %config.listen_addr, "finance tracker listening");
    axum::serve(listener, app).await?;
    Ok(())
}

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use chrono::Local;
use serde::Deserialize;

use super::{error::ApiResult, ApiResponse, AppState};
use crate::stats::{Period, PeriodStats};

#[derive(Debug, Default, Deserialize)]
pub struct StatsParams {
    pub period: Option<String>,
    pub date: Option<String>,
}

async fn period_stats(
    State(state): State<Arc<AppState>>,
    Query(params): Query<StatsParams>,
) -> ApiResult<Json<ApiResponse<PeriodStats>>> {
    let period = match params.period.as_deref() {
        Some(raw) => raw.parse::<Period>()?,
        None => Period::default(),
    };
    let today = Local::now().date_naive();
    let anchor = period.parse_anchor(params.date.as_deref(), today)?;
    Ok(Json(ApiResponse::ok(state.finance.period_stats(period, anchor)?)))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/stats", get(period_stats))
}

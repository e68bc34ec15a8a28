use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, put},
    Json, Router,
};
use chrono::{Local, NaiveDate};
use serde::Deserialize;

use super::{
    error::{ApiError, ApiResult},
    extract::{ApiJson, ApiPath},
    ApiResponse, AppState,
};
use crate::{
    calendar::YearMonth,
    worklog::{MonthSummary, ShiftInput, WorkEntry, WorkEntryView},
};

#[derive(Debug, Deserialize)]
pub struct NewEntryRequest {
    /// `YYYY-MM-DD`; today when absent.
    #[serde(default)]
    pub date: Option<String>,
    #[serde(flatten)]
    pub shift: ShiftInput,
}

#[derive(Debug, Default, Deserialize)]
pub struct MonthParams {
    pub month: Option<String>,
}

impl MonthParams {
    fn month(&self) -> ApiResult<YearMonth> {
        match self.month.as_deref().map(str::trim).filter(|raw| !raw.is_empty()) {
            None => Ok(YearMonth::of(Local::now().date_naive())),
            Some(raw) => Ok(raw.parse::<YearMonth>()?),
        }
    }
}

fn parse_entry_date(raw: &str) -> ApiResult<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| ApiError::BadRequest(format!("invalid date `{}`", raw)))
}

async fn list_entries(
    State(state): State<Arc<AppState>>,
) -> Json<ApiResponse<Vec<WorkEntryView>>> {
    Json(ApiResponse::ok(state.worklog.listing()))
}

async fn create_entry(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<NewEntryRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<WorkEntry>>)> {
    let date = match request.date.as_deref().filter(|raw| !raw.trim().is_empty()) {
        Some(raw) => parse_entry_date(raw)?,
        None => Local::now().date_naive(),
    };
    let entry = state.worklog.add_entry(date, &request.shift)?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(entry))))
}

async fn update_entry(
    State(state): State<Arc<AppState>>,
    ApiPath(date): ApiPath<String>,
    ApiJson(shift): ApiJson<ShiftInput>,
) -> ApiResult<Json<ApiResponse<WorkEntry>>> {
    let date = parse_entry_date(&date)?;
    let entry = state.worklog.edit_entry(date, &shift)?;
    Ok(Json(ApiResponse::ok(entry)))
}

async fn month_summary(
    State(state): State<Arc<AppState>>,
    Query(params): Query<MonthParams>,
) -> ApiResult<Json<ApiResponse<MonthSummary>>> {
    let month = params.month()?;
    Ok(Json(ApiResponse::ok(state.worklog.month_summary(month))))
}

async fn export_timesheet(
    State(state): State<Arc<AppState>>,
    Query(params): Query<MonthParams>,
) -> ApiResult<Response> {
    let month = params.month()?;
    let export = state.worklog.export_pdf(month)?;
    let disposition = format!("attachment; filename=\"{}\"", export.file_name);
    let mut response = (StatusCode::OK, export.bytes).into_response();
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/pdf"));
    if let Ok(value) = HeaderValue::from_str(&disposition) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }
    Ok(response)
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/worklog", get(list_entries).post(create_entry))
        .route("/worklog/summary", get(month_summary))
        .route("/worklog/export", get(export_timesheet))
        .route("/worklog/:date", put(update_entry))
}

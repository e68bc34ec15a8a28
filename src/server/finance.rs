use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use chrono::{Local, NaiveDate};
use rust_decimal::Decimal;
use serde::Deserialize;

use super::{
    error::{ApiError, ApiResult},
    extract::{ApiJson, ApiPath},
    ApiResponse, AppState,
};
use crate::{
    core::services::TransactionListing,
    ledger::{Balances, Transaction, TransactionDraft, TransactionFilter, TransactionKind},
    stats::MonthlyOverview,
};

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub page: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
}

impl ListParams {
    /// Unparseable page numbers fall back to the first page.
    fn page(&self) -> usize {
        self.page
            .as_deref()
            .and_then(|raw| raw.trim().parse().ok())
            .unwrap_or(1)
    }

    fn filter(&self) -> ApiResult<TransactionFilter> {
        let kind = match self.kind.as_deref().map(str::trim) {
            None | Some("") | Some("all") => None,
            Some(raw) => Some(raw.parse::<TransactionKind>()?),
        };
        Ok(TransactionFilter {
            kind,
            date_from: parse_date(self.from.as_deref())?,
            date_to: parse_date(self.to.as_deref())?,
        })
    }
}

fn parse_date(raw: Option<&str>) -> ApiResult<Option<NaiveDate>> {
    match raw.map(str::trim).filter(|value| !value.is_empty()) {
        None => Ok(None),
        Some(value) => NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| ApiError::BadRequest(format!("invalid date `{}`", value))),
    }
}

/// Tags arrive either as a list or as the comma separated form field.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum TagsInput {
    List(Vec<String>),
    Text(String),
}

impl Default for TagsInput {
    fn default() -> Self {
        TagsInput::List(Vec::new())
    }
}

#[derive(Debug, Deserialize)]
pub struct TransactionRequest {
    pub amount: Decimal,
    pub description: String,
    #[serde(default)]
    pub currency: String,
    pub is_positive: bool,
    #[serde(default)]
    pub tags: TagsInput,
    #[serde(default)]
    pub notes: String,
}

impl From<TransactionRequest> for TransactionDraft {
    fn from(request: TransactionRequest) -> Self {
        let tags = match request.tags {
            TagsInput::List(tags) => tags,
            TagsInput::Text(raw) => Transaction::parse_tags(&raw),
        };
        TransactionDraft {
            amount: request.amount,
            description: request.description,
            currency: request.currency,
            is_positive: request.is_positive,
            tags,
            notes: request.notes,
        }
    }
}

async fn list_transactions(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<ApiResponse<TransactionListing>>> {
    let filter = params.filter()?;
    let listing = state.finance.list(&filter, params.page());
    Ok(Json(ApiResponse::ok(listing)))
}

async fn create_transaction(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<TransactionRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<Transaction>>)> {
    let transaction = state.finance.add_transaction(request.into())?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(transaction))))
}

async fn update_transaction(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<u64>,
    ApiJson(request): ApiJson<TransactionRequest>,
) -> ApiResult<Json<ApiResponse<Transaction>>> {
    let transaction = state.finance.edit_transaction(id, request.into())?;
    Ok(Json(ApiResponse::ok(transaction)))
}

async fn delete_transaction(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<u64>,
) -> ApiResult<Json<ApiResponse<Transaction>>> {
    let transaction = state.finance.delete_transaction(id)?;
    Ok(Json(ApiResponse::ok(transaction)))
}

async fn balances(State(state): State<Arc<AppState>>) -> Json<ApiResponse<Balances>> {
    Json(ApiResponse::ok(state.finance.balances()))
}

async fn overview(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<ApiResponse<MonthlyOverview>>> {
    let now = Local::now().fixed_offset();
    Ok(Json(ApiResponse::ok(state.finance.overview(now)?)))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/transactions",
            get(list_transactions).post(create_transaction),
        )
        .route(
            "/transactions/:id",
            put(update_transaction).delete(delete_transaction),
        )
        .route("/balances", get(balances))
        .route("/overview", get(overview))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_params_defaults_and_errors() {
        let params = ListParams {
            page: Some("abc".into()),
            kind: Some("all".into()),
            ..ListParams::default()
        };
        assert_eq!(params.page(), 1);
        assert_eq!(params.filter().unwrap(), TransactionFilter::default());

        let params = ListParams {
            kind: Some("expense".into()),
            from: Some("2024-03-01".into()),
            to: Some("03/31/2024".into()),
            ..ListParams::default()
        };
        assert!(matches!(params.filter(), Err(ApiError::BadRequest(_))));
    }

    #[test]
    fn tags_accept_list_or_text() {
        let request: TransactionRequest = serde_json::from_str(
            r#"{"amount": 12.5, "description": "Lunch", "is_positive": false, "tags": " food, ,work "}"#,
        )
        .unwrap();
        let draft = TransactionDraft::from(request);
        assert_eq!(draft.tags, vec!["food", "work"]);
        assert_eq!(draft.currency, "");

        let request: TransactionRequest = serde_json::from_str(
            r#"{"amount": 3, "description": "Bus", "is_positive": false, "tags": ["travel"]}"#,
        )
        .unwrap();
        assert_eq!(TransactionDraft::from(request).tags, vec!["travel"]);
    }
}

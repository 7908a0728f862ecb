//! `POST /search` and `GET /search-status` — the synchronous half of the
//! HTTP surface, wrapping `Intake` and `StatusReader` (spec §6).

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::models::result::SearchResult;
use crate::models::search::{SearchRequest, SearchStatus};
use crate::services::intake::IntakeOutcome;
use crate::services::status_reader::StatusOutcome;
use crate::utils::error::ApiResult;
use crate::AppState;

#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateSearchResponse {
    pub search_id: Uuid,
    pub status: SearchStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<SearchResult>,
}

#[utoipa::path(
    post,
    path = "/search",
    request_body = SearchRequest,
    responses(
        (status = 200, description = "Search accepted, in flight, or served from cache", body = CreateSearchResponse),
        (status = 400, description = "Request failed validation"),
    ),
    tag = "search",
)]
pub async fn create_search(
    State(state): State<AppState>,
    Json(req): Json<SearchRequest>,
) -> ApiResult<Json<CreateSearchResponse>> {
    let outcome = state.intake.handle(&req).await?;

    let body = match outcome {
        IntakeOutcome::Completed { search_id, result } => {
            CreateSearchResponse { search_id, status: SearchStatus::Completed, result: Some(result) }
        },
        IntakeOutcome::Enqueued { search_id } => {
            CreateSearchResponse { search_id, status: SearchStatus::Pending, result: None }
        },
        IntakeOutcome::InFlight { search_id, status } => {
            CreateSearchResponse { search_id, status, result: None }
        },
    };

    Ok(Json(body))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusQuery {
    pub search_id: Uuid,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SearchStatusResponse {
    pub search_id: Uuid,
    pub status: SearchStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<SearchResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<Value>,
}

#[utoipa::path(
    get,
    path = "/search-status",
    params(("searchId" = Uuid, Query, description = "Search identifier returned by POST /search")),
    responses(
        (status = 200, description = "Current status or completed result", body = SearchStatusResponse),
        (status = 404, description = "No search with that id"),
    ),
    tag = "search",
)]
pub async fn get_status(
    State(state): State<AppState>,
    Query(query): Query<StatusQuery>,
) -> ApiResult<Json<SearchStatusResponse>> {
    let outcome = state.status_reader.get(query.search_id).await?;

    let body = match outcome {
        StatusOutcome::Completed { result } => SearchStatusResponse {
            search_id: query.search_id,
            status: SearchStatus::Completed,
            result: Some(result),
            error_message: None,
        },
        StatusOutcome::Pending { status, error_message } => SearchStatusResponse {
            search_id: query.search_id,
            status,
            result: None,
            error_message: error_message.map(Value::String),
        },
    };

    Ok(Json(body))
}

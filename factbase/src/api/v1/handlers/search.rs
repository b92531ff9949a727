//! v1 Search handler.

use axum::extract::{Path, State};

use super::scope_from_path;
use crate::api::v1::dto::{SearchRequest, SearchResponse};
use crate::api::v1::response::{ApiError, ApiResponse, ErrorCode};
use crate::api::AppState;
use crate::models::EntryType;

/// `POST /api/v1/scopes/{scopeId}/search`
#[utoipa::path(
    post,
    path = "/api/v1/scopes/{scopeId}/search",
    tag = "search",
    operation_id = "search.similar",
    params(("scopeId" = String, Path, description = "Tenant scope")),
    request_body = SearchRequest,
    responses(
        (status = 200, description = "Matches, best first", body = SearchResponse),
        (status = 400, description = "Invalid request", body = ApiError),
    )
)]
pub async fn search(
    State(state): State<AppState>,
    Path(scope_id): Path<String>,
    axum::Json(req): axum::Json<SearchRequest>,
) -> ApiResponse<SearchResponse> {
    let scope = match scope_from_path(scope_id) {
        Ok(scope) => scope,
        Err(e) => return e.into(),
    };

    if req.query.trim().is_empty() {
        return ApiResponse::error(ErrorCode::InvalidRequest, "Query cannot be empty");
    }

    let types: Option<Vec<EntryType>> = req
        .types
        .map(|types| types.into_iter().map(Into::into).collect());

    let results = match state
        .search
        .search_similar_conversations(
            &scope,
            &req.query,
            req.threshold,
            req.top_k,
            types.as_deref(),
        )
        .await
    {
        Ok(results) => results,
        Err(e) => return e.into(),
    };

    let total = results.len();
    ApiResponse::success_with_total(
        SearchResponse {
            results: results.into_iter().map(Into::into).collect(),
        },
        total,
    )
}

//! v1 Scope-level handlers.

use axum::extract::{Path, State};

use super::scope_from_path;
use crate::api::v1::dto::{DeleteScopeResponse, KnowledgeSummaryResponse};
use crate::api::v1::response::{ApiError, ApiResponse};
use crate::api::AppState;

/// `GET /api/v1/scopes/{scopeId}/summary`
#[utoipa::path(
    get,
    path = "/api/v1/scopes/{scopeId}/summary",
    tag = "scopes",
    operation_id = "scopes.summary",
    params(("scopeId" = String, Path, description = "Tenant scope")),
    responses(
        (status = 200, description = "Counts of current knowledge", body = KnowledgeSummaryResponse),
        (status = 400, description = "Invalid scope", body = ApiError),
    )
)]
pub async fn get_summary(
    State(state): State<AppState>,
    Path(scope_id): Path<String>,
) -> ApiResponse<KnowledgeSummaryResponse> {
    let scope = match scope_from_path(scope_id) {
        Ok(scope) => scope,
        Err(e) => return e.into(),
    };

    match state.search.get_business_knowledge_summary(&scope).await {
        Ok(summary) => ApiResponse::success(summary.into()),
        Err(e) => e.into(),
    }
}

/// `DELETE /api/v1/scopes/{scopeId}`
///
/// Removes every entry of the scope, superseded history included.
#[utoipa::path(
    delete,
    path = "/api/v1/scopes/{scopeId}",
    tag = "scopes",
    operation_id = "scopes.delete",
    params(("scopeId" = String, Path, description = "Tenant scope")),
    responses(
        (status = 200, description = "Scope deleted", body = DeleteScopeResponse),
        (status = 400, description = "Invalid scope", body = ApiError),
    )
)]
pub async fn delete_scope(
    State(state): State<AppState>,
    Path(scope_id): Path<String>,
) -> ApiResponse<DeleteScopeResponse> {
    let scope = match scope_from_path(scope_id) {
        Ok(scope) => scope,
        Err(e) => return e.into(),
    };

    match state
        .retry
        .run("delete_scope", || state.memory.delete_scope(&scope))
        .await
    {
        Ok(deleted) => ApiResponse::success(DeleteScopeResponse { deleted }),
        Err(e) => e.into(),
    }
}

//! v1 Conflict scan handler.

use axum::extract::{Path, Query, State};

use super::scope_from_path;
use crate::api::v1::dto::{ConflictsQuery, ConflictsResponse};
use crate::api::v1::response::{ApiError, ApiResponse};
use crate::api::AppState;

/// `GET /api/v1/scopes/{scopeId}/conflicts`
///
/// Groups of current entries that look like versions of the same fact.
#[utoipa::path(
    get,
    path = "/api/v1/scopes/{scopeId}/conflicts",
    tag = "conflicts",
    operation_id = "conflicts.list",
    params(
        ("scopeId" = String, Path, description = "Tenant scope"),
        ConflictsQuery,
    ),
    responses(
        (status = 200, description = "Conflict groups", body = ConflictsResponse),
        (status = 400, description = "Invalid threshold", body = ApiError),
    )
)]
pub async fn list_conflicts(
    State(state): State<AppState>,
    Path(scope_id): Path<String>,
    Query(query): Query<ConflictsQuery>,
) -> ApiResponse<ConflictsResponse> {
    let scope = match scope_from_path(scope_id) {
        Ok(scope) => scope,
        Err(e) => return e.into(),
    };

    match state
        .search
        .get_memory_conflicts(&scope, query.threshold)
        .await
    {
        Ok(groups) => {
            let total = groups.len();
            ApiResponse::success_with_total(
                ConflictsResponse {
                    groups: groups.into_iter().map(Into::into).collect(),
                },
                total,
            )
        }
        Err(e) => e.into(),
    }
}

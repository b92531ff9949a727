//! v1 Memory handlers: update, extract and import.

use axum::extract::{Path, State};

use super::scope_from_path;
use crate::api::v1::dto::{
    ExtractRequest, ExtractResponse, ImportItemResponse, ImportRequest, ImportResponse,
    UpdateMemoryRequest, UpdateMemoryResponse,
};
use crate::api::v1::response::{ApiError, ApiResponse, ErrorCode};
use crate::api::AppState;
use crate::error::{FactbaseError, Result};
use crate::models::{UpdateCandidate, UpdateMode};

/// `POST /api/v1/scopes/{scopeId}/memories:update`
///
/// Detects conflicts for a candidate and, in `auto` mode, resolves and
/// persists it. `manual` mode only reports the conflicts.
#[utoipa::path(
    post,
    path = "/api/v1/scopes/{scopeId}/memories:update",
    tag = "memories",
    operation_id = "memories.update",
    params(("scopeId" = String, Path, description = "Tenant scope")),
    request_body = UpdateMemoryRequest,
    responses(
        (status = 200, description = "Update applied or conflicts reported", body = UpdateMemoryResponse),
        (status = 400, description = "Invalid request or scope mismatch", body = ApiError),
        (status = 429, description = "Provider rate limited", body = ApiError),
        (status = 503, description = "Provider unavailable", body = ApiError),
    )
)]
pub async fn update_memory(
    State(state): State<AppState>,
    Path(scope_id): Path<String>,
    axum::Json(req): axum::Json<UpdateMemoryRequest>,
) -> ApiResponse<UpdateMemoryResponse> {
    let scope = match scope_from_path(scope_id) {
        Ok(scope) => scope,
        Err(e) => return e.into(),
    };

    let candidate = match req.candidate.into_candidate(&scope) {
        Ok(candidate) => candidate,
        Err(e) => return e.into(),
    };
    if candidate.scope_id != scope {
        return FactbaseError::TenantScopeViolation(format!(
            "candidate scope {} does not match path scope {scope}",
            candidate.scope_id
        ))
        .into();
    }
    if candidate.text.trim().is_empty() {
        return ApiResponse::error(ErrorCode::InvalidRequest, "Candidate text cannot be empty");
    }

    let mode: UpdateMode = req.mode.into();
    match state
        .retry
        .run("update_memory", || {
            state.memory.update_memory(candidate.clone(), mode)
        })
        .await
    {
        Ok(result) => ApiResponse::success(result.into()),
        Err(e) => e.into(),
    }
}

/// `POST /api/v1/scopes/{scopeId}/memories:extract`
///
/// Looks for one fact update in a conversation. With `apply`, the candidate
/// goes straight through `memories:update` in auto mode.
#[utoipa::path(
    post,
    path = "/api/v1/scopes/{scopeId}/memories:extract",
    tag = "memories",
    operation_id = "memories.extract",
    params(("scopeId" = String, Path, description = "Tenant scope")),
    request_body = ExtractRequest,
    responses(
        (status = 200, description = "Extraction result, candidate absent when nothing changed", body = ExtractResponse),
        (status = 400, description = "Invalid request", body = ApiError),
        (status = 429, description = "Provider rate limited", body = ApiError),
    )
)]
pub async fn extract_memory(
    State(state): State<AppState>,
    Path(scope_id): Path<String>,
    axum::Json(req): axum::Json<ExtractRequest>,
) -> ApiResponse<ExtractResponse> {
    let scope = match scope_from_path(scope_id) {
        Ok(scope) => scope,
        Err(e) => return e.into(),
    };

    match state
        .retry
        .run("extract_memory", || {
            state.memory.extract(&scope, &req.conversation, req.apply)
        })
        .await
    {
        Ok(outcome) => ApiResponse::success(ExtractResponse {
            candidate: outcome.candidate.map(Into::into),
            update: outcome.update.map(Into::into),
        }),
        Err(e) => e.into(),
    }
}

/// `POST /api/v1/scopes/{scopeId}/memories:import`
///
/// Applies candidates in order through the same path as `memories:update`
/// in auto mode. One failing candidate does not stop the rest; a candidate
/// for another scope rejects the whole batch.
#[utoipa::path(
    post,
    path = "/api/v1/scopes/{scopeId}/memories:import",
    tag = "memories",
    operation_id = "memories.import",
    params(("scopeId" = String, Path, description = "Tenant scope")),
    request_body = ImportRequest,
    responses(
        (status = 200, description = "Per-candidate results", body = ImportResponse),
        (status = 400, description = "Invalid request or scope mismatch", body = ApiError),
    )
)]
pub async fn import_memories(
    State(state): State<AppState>,
    Path(scope_id): Path<String>,
    axum::Json(req): axum::Json<ImportRequest>,
) -> ApiResponse<ImportResponse> {
    let scope = match scope_from_path(scope_id) {
        Ok(scope) => scope,
        Err(e) => return e.into(),
    };

    if req.candidates.is_empty() {
        return ApiResponse::error(ErrorCode::InvalidRequest, "Candidates cannot be empty");
    }

    let candidates: Result<Vec<UpdateCandidate>> = req
        .candidates
        .into_iter()
        .map(|c| c.into_candidate(&scope))
        .collect();
    let candidates = match candidates {
        Ok(candidates) => candidates,
        Err(e) => return e.into(),
    };

    let outcomes = match state.memory.import_candidates(&scope, candidates).await {
        Ok(outcomes) => outcomes,
        Err(e) => return e.into(),
    };

    let results: Vec<ImportItemResponse> = outcomes
        .into_iter()
        .enumerate()
        .map(|(index, outcome)| match outcome {
            Ok(result) => ImportItemResponse {
                index,
                update: Some(result.into()),
                error: None,
            },
            Err(e) => ImportItemResponse {
                index,
                update: None,
                error: Some(e.kind().to_string()),
            },
        })
        .collect();
    let failed = results.iter().filter(|r| r.error.is_some()).count();

    ApiResponse::success(ImportResponse {
        applied: results.len() - failed,
        failed,
        results,
    })
}

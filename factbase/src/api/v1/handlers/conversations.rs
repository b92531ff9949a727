//! v1 Conversation handlers.

use axum::extract::{Path, State};

use super::scope_from_path;
use crate::api::v1::dto::{StoreConversationsRequest, StoreConversationsResponse};
use crate::api::v1::response::{ApiError, ApiResponse, ErrorCode};
use crate::api::AppState;
use crate::models::ConversationSegment;

/// `POST /api/v1/scopes/{scopeId}/conversations`
///
/// Embeds and stores conversation segments for later retrieval. No conflict
/// detection runs for conversation history.
#[utoipa::path(
    post,
    path = "/api/v1/scopes/{scopeId}/conversations",
    tag = "conversations",
    operation_id = "conversations.store",
    params(("scopeId" = String, Path, description = "Tenant scope")),
    request_body = StoreConversationsRequest,
    responses(
        (status = 201, description = "Segments stored", body = StoreConversationsResponse),
        (status = 400, description = "Invalid request", body = ApiError),
        (status = 429, description = "Embedding provider rate limited", body = ApiError),
    )
)]
pub async fn store_conversations(
    State(state): State<AppState>,
    Path(scope_id): Path<String>,
    axum::Json(req): axum::Json<StoreConversationsRequest>,
) -> ApiResponse<StoreConversationsResponse> {
    let scope = match scope_from_path(scope_id) {
        Ok(scope) => scope,
        Err(e) => return e.into(),
    };

    if req.segments.is_empty() {
        return ApiResponse::error(ErrorCode::InvalidRequest, "Segments cannot be empty");
    }

    let segments: Vec<ConversationSegment> = req.segments.into_iter().map(Into::into).collect();

    match state
        .retry
        .run("store_conversations", || {
            state.memory.store_conversation_embeddings(&scope, &segments)
        })
        .await
    {
        Ok(ids) => ApiResponse::created(StoreConversationsResponse { ids }),
        Err(e) => e.into(),
    }
}

use axum::Json;
use utoipa::OpenApi;
use utoipa_redoc::{Redoc, Servable};

use super::dto;
use super::handlers;
use super::response;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Factbase API",
        version = "1.0.0",
        description = "Writable per-tenant memory for business knowledge: semantic search, conflict detection and safe fact updates.",
    ),
    paths(
        handlers::health::health_check,
        handlers::conversations::store_conversations,
        handlers::search::search,
        handlers::memories::update_memory,
        handlers::memories::extract_memory,
        handlers::memories::import_memories,
        handlers::conflicts::list_conflicts,
        handlers::scopes::get_summary,
        handlers::scopes::delete_scope,
    ),
    components(schemas(
        // Response envelope
        response::ErrorCode,
        response::ApiError,
        response::ResponseMeta,
        // Common
        dto::common::V1EntryType,
        dto::common::V1ResolutionAction,
        dto::common::EntryResponse,
        // Conversations
        dto::conversations::StoreConversationsRequest,
        dto::conversations::ConversationSegmentDto,
        dto::conversations::StoreConversationsResponse,
        // Search
        dto::search::SearchRequest,
        dto::search::SearchResultItem,
        dto::search::SearchResponse,
        // Memories
        dto::memories::V1UpdateMode,
        dto::memories::CandidateDto,
        dto::memories::UpdateMemoryRequest,
        dto::memories::UpdateMemoryResponse,
        dto::memories::ExtractRequest,
        dto::memories::ExtractedCandidateResponse,
        dto::memories::ExtractResponse,
        dto::memories::ImportRequest,
        dto::memories::ImportItemResponse,
        dto::memories::ImportResponse,
        // Conflicts
        dto::conflicts::ConflictMemberResponse,
        dto::conflicts::ConflictGroupResponse,
        dto::conflicts::ConflictsResponse,
        dto::conflicts::ResolutionResponse,
        // Scopes
        dto::scopes::KnowledgeSummaryResponse,
        dto::scopes::DeleteScopeResponse,
        // Health (handler-local types)
        handlers::health::HealthData,
        handlers::health::DatabaseStatus,
        handlers::health::EmbeddingsStatus,
        handlers::health::LlmStatus,
    )),
    tags(
        (name = "health", description = "Health check"),
        (name = "conversations", description = "Conversation storage for retrieval"),
        (name = "search", description = "Similarity search within a scope"),
        (name = "memories", description = "Fact updates, extraction and import"),
        (name = "conflicts", description = "Groups of entries describing the same fact"),
        (name = "scopes", description = "Per-scope summary and deletion"),
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            utoipa::openapi::security::SecurityScheme::Http(utoipa::openapi::security::Http::new(
                utoipa::openapi::security::HttpAuthScheme::Bearer,
            )),
        );
    }
}

pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

pub fn redoc_router<S: Clone + Send + Sync + 'static>() -> axum::Router<S> {
    Redoc::with_url("/docs", ApiDoc::openapi()).into()
}

//! Conversation storage DTOs for the v1 API.

use serde::{Deserialize, Serialize};

use super::common::Metadata;
use crate::models::ConversationSegment;

/// Request body for `POST /v1/scopes/{scopeId}/conversations`.
#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StoreConversationsRequest {
    /// Segments to embed and store, in order.
    pub segments: Vec<ConversationSegmentDto>,
}

#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSegmentDto {
    pub text: String,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub metadata: Metadata,
}

impl From<ConversationSegmentDto> for ConversationSegment {
    fn from(dto: ConversationSegmentDto) -> Self {
        Self {
            text: dto.text,
            metadata: dto.metadata,
        }
    }
}

/// Response for `POST /v1/scopes/{scopeId}/conversations`.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StoreConversationsResponse {
    /// IDs of the stored entries, in segment order.
    pub ids: Vec<String>,
}

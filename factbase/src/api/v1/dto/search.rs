//! Search DTOs for the v1 API.

use serde::{Deserialize, Serialize};

use super::common::{EntryResponse, V1EntryType};
use crate::models::ScoredEntry;

/// Request body for `POST /v1/scopes/{scopeId}/search`.
///
/// Omitted `threshold` and `topK` fall back to the server defaults.
#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    pub query: String,
    /// Minimum cosine similarity, in `[0, 1]`.
    pub threshold: Option<f32>,
    /// Maximum number of results. Clamped to `1..=100`.
    pub top_k: Option<usize>,
    /// Restrict results to these entry types. All types when absent.
    pub types: Option<Vec<V1EntryType>>,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SearchResultItem {
    #[serde(flatten)]
    pub entry: EntryResponse,
    pub similarity: f32,
}

impl From<ScoredEntry> for SearchResultItem {
    fn from(scored: ScoredEntry) -> Self {
        Self {
            entry: scored.entry.into(),
            similarity: scored.similarity,
        }
    }
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    /// Best match first.
    pub results: Vec<SearchResultItem>,
}

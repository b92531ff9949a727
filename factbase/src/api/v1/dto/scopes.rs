//! Scope-level DTOs: knowledge summary and deletion.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::models::KnowledgeSummary;

/// Response for `GET /v1/scopes/{scopeId}/summary`.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeSummaryResponse {
    pub scope_id: String,
    /// Current entries across all types.
    pub total: u64,
    /// Current entries per type. Every type is present, possibly with 0.
    pub by_type: BTreeMap<String, u64>,
    /// Entries retired by a newer version.
    pub superseded: u64,
}

impl From<KnowledgeSummary> for KnowledgeSummaryResponse {
    fn from(summary: KnowledgeSummary) -> Self {
        Self {
            scope_id: summary.scope_id.into(),
            total: summary.total,
            by_type: summary
                .by_type
                .into_iter()
                .map(|(ty, count)| (ty.to_string(), count))
                .collect(),
            superseded: summary.superseded,
        }
    }
}

/// Response for `DELETE /v1/scopes/{scopeId}`.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeleteScopeResponse {
    /// Entries removed, history included.
    pub deleted: u64,
}

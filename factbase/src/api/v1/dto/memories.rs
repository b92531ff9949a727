//! Memory update, extraction and import DTOs for the v1 API.

use serde::{Deserialize, Serialize};

use super::common::{Metadata, V1EntryType, V1ResolutionAction};
use super::conflicts::{ConflictGroupResponse, ResolutionResponse};
use crate::error::Result;
use crate::models::{ScopeId, UpdateCandidate, UpdateMemoryResult, UpdateMode};

/// How `memories:update` treats conflicts.
///
/// Wire format: `"auto"` (resolve and persist) or `"manual"` (detect only).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum V1UpdateMode {
    #[default]
    Auto,
    Manual,
}

impl From<V1UpdateMode> for UpdateMode {
    fn from(mode: V1UpdateMode) -> Self {
        match mode {
            V1UpdateMode::Auto => UpdateMode::Auto,
            V1UpdateMode::Manual => UpdateMode::Manual,
        }
    }
}

/// A proposed fact.
///
/// `scopeId` may be omitted; the scope from the path is used. When given it
/// must equal the path scope.
#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CandidateDto {
    pub scope_id: Option<String>,
    pub text: String,
    /// Defaults to `knowledge`.
    pub entry_type: Option<V1EntryType>,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub metadata: Metadata,
    /// In `[0, 1]`. Defaults to 1.
    pub confidence: Option<f32>,
    #[serde(default)]
    pub reason: String,
}

impl CandidateDto {
    /// Build a domain candidate, defaulting the scope to `path_scope`.
    pub fn into_candidate(self, path_scope: &ScopeId) -> Result<UpdateCandidate> {
        let scope_id = match self.scope_id {
            Some(raw) => ScopeId::new(raw)?,
            None => path_scope.clone(),
        };
        let mut candidate = UpdateCandidate::new(
            scope_id,
            self.text,
            self.entry_type.map(Into::into).unwrap_or_default(),
        )
        .with_reason(self.reason);
        candidate.metadata = self.metadata;
        if let Some(confidence) = self.confidence {
            candidate.confidence = confidence;
        }
        Ok(candidate)
    }
}

/// Request body for `POST /v1/scopes/{scopeId}/memories:update`.
#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMemoryRequest {
    pub candidate: CandidateDto,
    #[serde(default)]
    pub mode: V1UpdateMode,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMemoryResponse {
    /// Absent in manual mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<V1ResolutionAction>,
    /// ID of the entry written, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_id: Option<String>,
    pub conflicts: Vec<ConflictGroupResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution: Option<ResolutionResponse>,
    pub superseded_ids: Vec<String>,
    pub needs_review: bool,
    /// Final pipeline state, e.g. `persisted` or `rejected`.
    pub state: String,
}

impl From<UpdateMemoryResult> for UpdateMemoryResponse {
    fn from(result: UpdateMemoryResult) -> Self {
        let needs_review = result.needs_review();
        Self {
            action: result.action.map(Into::into),
            memory_id: result.memory_id,
            conflicts: result.conflicts.into_iter().map(Into::into).collect(),
            resolution: result.resolution.map(Into::into),
            superseded_ids: result.superseded_ids,
            needs_review,
            state: result.state.to_string(),
        }
    }
}

/// Request body for `POST /v1/scopes/{scopeId}/memories:extract`.
#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExtractRequest {
    /// Conversation transcript as plain text.
    pub conversation: String,
    /// Run the extracted candidate through `memories:update` in auto mode.
    #[serde(default)]
    pub apply: bool,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedCandidateResponse {
    pub text: String,
    pub entry_type: V1EntryType,
    pub confidence: f32,
    pub reason: String,
    #[schema(value_type = Object)]
    pub metadata: Metadata,
}

impl From<UpdateCandidate> for ExtractedCandidateResponse {
    fn from(candidate: UpdateCandidate) -> Self {
        Self {
            text: candidate.text,
            entry_type: candidate.entry_type.into(),
            confidence: candidate.confidence,
            reason: candidate.reason,
            metadata: candidate.metadata,
        }
    }
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExtractResponse {
    /// Absent when the conversation holds no update.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidate: Option<ExtractedCandidateResponse>,
    /// Present only when `apply` was set and a candidate was found.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update: Option<UpdateMemoryResponse>,
}

/// Request body for `POST /v1/scopes/{scopeId}/memories:import`.
#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImportRequest {
    /// Applied in order.
    pub candidates: Vec<CandidateDto>,
}

/// Outcome for one imported candidate. Exactly one of `update` and `error`
/// is present.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImportItemResponse {
    pub index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update: Option<UpdateMemoryResponse>,
    /// Error kind, e.g. `rate_limited` or `validation_error`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImportResponse {
    pub results: Vec<ImportItemResponse>,
    pub applied: usize,
    pub failed: usize,
}

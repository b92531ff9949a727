//! Conflict and resolution DTOs shared by the memories and conflicts endpoints.

use serde::{Deserialize, Serialize};

use super::common::{EntryResponse, V1ResolutionAction};
use crate::models::{ConflictGroup, ConflictMember, Resolution, ResolutionStage};

/// Query parameters for `GET /v1/scopes/{scopeId}/conflicts`.
#[derive(Debug, Clone, Default, Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ConflictsQuery {
    /// Similarity at or above which two entries are linked. Server default
    /// when absent.
    pub threshold: Option<f32>,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConflictMemberResponse {
    #[serde(flatten)]
    pub entry: EntryResponse,
    /// Similarity to the candidate. Absent for scope-wide scans.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similarity: Option<f32>,
}

impl From<ConflictMember> for ConflictMemberResponse {
    fn from(member: ConflictMember) -> Self {
        Self {
            entry: member.entry.into(),
            similarity: member.similarity,
        }
    }
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConflictGroupResponse {
    pub topic: String,
    pub members: Vec<ConflictMemberResponse>,
    pub pairwise_similarity: f32,
}

impl From<ConflictGroup> for ConflictGroupResponse {
    fn from(group: ConflictGroup) -> Self {
        Self {
            topic: group.topic,
            members: group.members.into_iter().map(Into::into).collect(),
            pairwise_similarity: group.pairwise_similarity,
        }
    }
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConflictsResponse {
    pub groups: Vec<ConflictGroupResponse>,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionResponse {
    pub action: V1ResolutionAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merged_text: Option<String>,
    pub confidence: f32,
    pub reason: String,
    pub needs_review: bool,
    /// Pipeline step that decided: `noConflict`, `duplicate`, `lexical`,
    /// `classifier` or `fallback`.
    pub stage: String,
}

impl From<Resolution> for ResolutionResponse {
    fn from(resolution: Resolution) -> Self {
        let stage = match resolution.stage {
            ResolutionStage::NoConflict => "noConflict",
            ResolutionStage::Duplicate => "duplicate",
            ResolutionStage::Lexical => "lexical",
            ResolutionStage::Classifier => "classifier",
            ResolutionStage::Fallback => "fallback",
        };
        Self {
            action: resolution.action.into(),
            merged_text: resolution.merged_text,
            confidence: resolution.confidence,
            reason: resolution.reason,
            needs_review: resolution.needs_review,
            stage: stage.to_string(),
        }
    }
}

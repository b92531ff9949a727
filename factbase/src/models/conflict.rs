use serde::{Deserialize, Serialize};

use super::MemoryEntry;

/// A group member plus its similarity to the candidate that triggered detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictMember {
    #[serde(flatten)]
    pub entry: MemoryEntry,
    /// Absent when the group comes from a scope-wide scan.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similarity: Option<f32>,
}

/// Entries that plausibly describe the same fact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictGroup {
    pub topic: String,
    pub members: Vec<ConflictMember>,
    /// Mean similarity over the edges that connect the group.
    pub pairwise_similarity: f32,
}

impl ConflictGroup {
    pub fn member_ids(&self) -> Vec<String> {
        self.members.iter().map(|m| m.entry.id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionAction {
    Create,
    Merge,
    Replace,
    KeepBoth,
    Reject,
}

impl ResolutionAction {
    /// Merge and replace retire every group member.
    pub fn supersedes(&self) -> bool {
        matches!(self, Self::Merge | Self::Replace)
    }
}

impl std::fmt::Display for ResolutionAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Create => write!(f, "create"),
            Self::Merge => write!(f, "merge"),
            Self::Replace => write!(f, "replace"),
            Self::KeepBoth => write!(f, "keep_both"),
            Self::Reject => write!(f, "reject"),
        }
    }
}

/// Which step of the resolution pipeline produced the decision.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStage {
    NoConflict,
    Duplicate,
    Lexical,
    Classifier,
    Fallback,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resolution {
    pub action: ResolutionAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merged_text: Option<String>,
    pub confidence: f32,
    pub reason: String,
    /// Set when no stage could decide with enough confidence.
    pub needs_review: bool,
    pub stage: ResolutionStage,
}

impl Resolution {
    pub fn new(
        action: ResolutionAction,
        confidence: f32,
        reason: impl Into<String>,
        stage: ResolutionStage,
    ) -> Self {
        Self {
            action,
            merged_text: None,
            confidence,
            reason: reason.into(),
            needs_review: false,
            stage,
        }
    }

    pub fn create() -> Self {
        Self::new(
            ResolutionAction::Create,
            1.0,
            "no conflicting entries",
            ResolutionStage::NoConflict,
        )
    }

    /// Keep both entries and flag the pair for a human.
    pub fn unresolved(confidence: f32, reason: impl Into<String>, stage: ResolutionStage) -> Self {
        Self {
            needs_review: true,
            ..Self::new(ResolutionAction::KeepBoth, confidence, reason, stage)
        }
    }

    pub fn with_merged_text(mut self, text: impl Into<String>) -> Self {
        self.merged_text = Some(text.into());
        self
    }
}

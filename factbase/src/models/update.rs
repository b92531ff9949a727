use serde::{Deserialize, Serialize, Serializer};

use super::{ConflictGroup, EntryType, Metadata, Resolution, ResolutionAction, ScopeId};
use crate::error::ErrorKind;

/// A proposed new or changed fact, usually produced by extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateCandidate {
    pub scope_id: ScopeId,
    pub text: String,
    #[serde(default)]
    pub entry_type: EntryType,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default = "default_confidence")]
    pub confidence: f32,
    #[serde(default)]
    pub reason: String,
}

fn default_confidence() -> f32 {
    1.0
}

impl UpdateCandidate {
    pub fn new(scope_id: ScopeId, text: impl Into<String>, entry_type: EntryType) -> Self {
        Self {
            scope_id,
            text: text.into(),
            entry_type,
            metadata: Metadata::new(),
            confidence: 1.0,
            reason: String::new(),
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum UpdateMode {
    /// Resolve and persist.
    #[default]
    Auto,
    /// Detect only; the caller decides what to do with the conflicts.
    Manual,
}

/// Lifecycle of a candidate through the update pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateState {
    Extracted,
    Embedded,
    ConflictChecked,
    Resolved,
    Persisted,
    Rejected,
    Failed(ErrorKind),
}

impl std::fmt::Display for CandidateState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Extracted => write!(f, "extracted"),
            Self::Embedded => write!(f, "embedded"),
            Self::ConflictChecked => write!(f, "conflict_checked"),
            Self::Resolved => write!(f, "resolved"),
            Self::Persisted => write!(f, "persisted"),
            Self::Rejected => write!(f, "rejected"),
            Self::Failed(kind) => write!(f, "failed:{kind}"),
        }
    }
}

impl Serialize for CandidateState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UpdateMemoryResult {
    /// `None` in manual mode, where nothing is resolved.
    pub action: Option<ResolutionAction>,
    pub memory_id: Option<String>,
    pub conflicts: Vec<ConflictGroup>,
    pub resolution: Option<Resolution>,
    pub superseded_ids: Vec<String>,
    pub state: CandidateState,
}

impl UpdateMemoryResult {
    pub fn needs_review(&self) -> bool {
        self.resolution.as_ref().is_some_and(|r| r.needs_review)
    }
}

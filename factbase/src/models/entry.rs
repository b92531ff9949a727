use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{EntryType, Metadata, ScopeId};

/// A stored fact. Old versions are kept with `superseded_by` set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryEntry {
    pub id: String,
    pub scope_id: ScopeId,
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub vector: Vec<f32>,
    pub entry_type: EntryType,
    pub metadata: Metadata,
    pub confidence: f32,
    pub superseded_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MemoryEntry {
    pub fn new(scope_id: ScopeId, text: String, entry_type: EntryType, vector: Vec<f32>) -> Self {
        let now = Utc::now();
        Self {
            id: nanoid::nanoid!(),
            scope_id,
            text,
            vector,
            entry_type,
            metadata: Metadata::new(),
            confidence: 1.0,
            superseded_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    pub fn is_current(&self) -> bool {
        self.superseded_by.is_none()
    }
}

/// An entry returned from a similarity query together with its cosine score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredEntry {
    #[serde(flatten)]
    pub entry: MemoryEntry,
    pub similarity: f32,
}

/// One piece of conversation to be stored for later retrieval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSegment {
    pub text: String,
    #[serde(default)]
    pub metadata: Metadata,
}

/// Counts of current knowledge per type, for prompt builders and dashboards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KnowledgeSummary {
    pub scope_id: ScopeId,
    pub total: u64,
    pub by_type: std::collections::BTreeMap<EntryType, u64>,
    pub superseded: u64,
}

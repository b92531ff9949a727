//! Shared DTO types used across multiple v1 API endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::models::{self, EntryType, ResolutionAction};

/// Arbitrary key-value pairs.
///
/// Wire format: `{ "key": <any JSON value>, ... }`
pub type Metadata = HashMap<String, serde_json::Value>;

/// Entry type classification.
///
/// Wire format: lowercase string (`"conversation"`, `"faq"`, `"knowledge"`,
/// `"example"`, `"document"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum V1EntryType {
    Conversation,
    Faq,
    Knowledge,
    Example,
    Document,
}

impl From<EntryType> for V1EntryType {
    fn from(et: EntryType) -> Self {
        match et {
            EntryType::Conversation => V1EntryType::Conversation,
            EntryType::Faq => V1EntryType::Faq,
            EntryType::Knowledge => V1EntryType::Knowledge,
            EntryType::Example => V1EntryType::Example,
            EntryType::Document => V1EntryType::Document,
        }
    }
}

impl From<V1EntryType> for EntryType {
    fn from(et: V1EntryType) -> Self {
        match et {
            V1EntryType::Conversation => EntryType::Conversation,
            V1EntryType::Faq => EntryType::Faq,
            V1EntryType::Knowledge => EntryType::Knowledge,
            V1EntryType::Example => EntryType::Example,
            V1EntryType::Document => EntryType::Document,
        }
    }
}

/// What the resolver decided for a candidate.
///
/// Wire format: `"create"`, `"merge"`, `"replace"`, `"keepBoth"`, `"reject"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum V1ResolutionAction {
    Create,
    Merge,
    Replace,
    KeepBoth,
    Reject,
}

impl From<ResolutionAction> for V1ResolutionAction {
    fn from(action: ResolutionAction) -> Self {
        match action {
            ResolutionAction::Create => V1ResolutionAction::Create,
            ResolutionAction::Merge => V1ResolutionAction::Merge,
            ResolutionAction::Replace => V1ResolutionAction::Replace,
            ResolutionAction::KeepBoth => V1ResolutionAction::KeepBoth,
            ResolutionAction::Reject => V1ResolutionAction::Reject,
        }
    }
}

/// A stored entry as seen by API clients. Vectors are never returned.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EntryResponse {
    pub id: String,
    pub scope_id: String,
    pub text: String,
    pub entry_type: V1EntryType,
    #[schema(value_type = Object)]
    pub metadata: Metadata,
    pub confidence: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub superseded_by: Option<String>,
    #[schema(value_type = String)]
    pub created_at: DateTime<Utc>,
    #[schema(value_type = String)]
    pub updated_at: DateTime<Utc>,
}

impl From<models::MemoryEntry> for EntryResponse {
    fn from(entry: models::MemoryEntry) -> Self {
        Self {
            id: entry.id,
            scope_id: entry.scope_id.into(),
            text: entry.text,
            entry_type: entry.entry_type.into(),
            metadata: entry.metadata,
            confidence: entry.confidence,
            superseded_by: entry.superseded_by,
            created_at: entry.created_at,
            updated_at: entry.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ScopeId;

    #[test]
    fn entry_type_round_trips() {
        for ty in EntryType::ALL {
            let wire: V1EntryType = ty.into();
            assert_eq!(EntryType::from(wire), ty);
        }
    }

    #[test]
    fn keep_both_is_camel_case() {
        let json = serde_json::to_value(V1ResolutionAction::KeepBoth).unwrap();
        assert_eq!(json, "keepBoth");
    }

    #[test]
    fn entry_response_omits_vector_and_current_marker() {
        let entry = models::MemoryEntry::new(
            ScopeId::new("acme").unwrap(),
            "Open 9 to 5".into(),
            EntryType::Knowledge,
            vec![0.1, 0.2],
        );
        let json = serde_json::to_value(EntryResponse::from(entry)).unwrap();
        assert_eq!(json["scopeId"], "acme");
        assert_eq!(json["entryType"], "knowledge");
        assert!(json.get("vector").is_none());
        assert!(json.get("supersededBy").is_none());
    }
}

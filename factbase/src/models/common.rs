use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::FactbaseError;

pub type Metadata = HashMap<String, serde_json::Value>;

const MAX_SCOPE_LEN: usize = 128;

/// Tenant identifier. Every read and write in the store is keyed by one.
///
/// Construction validates the raw value, so holding a `ScopeId` means the
/// scope filter can never be empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ScopeId(String);

impl ScopeId {
    pub fn new(raw: impl Into<String>) -> Result<Self, FactbaseError> {
        let raw = raw.into();
        let trimmed = raw.trim();

        if trimmed.is_empty() {
            return Err(FactbaseError::TenantScopeViolation(
                "scope id must not be empty".to_string(),
            ));
        }
        if trimmed.len() > MAX_SCOPE_LEN {
            return Err(FactbaseError::Validation(format!(
                "scope id exceeds {MAX_SCOPE_LEN} characters"
            )));
        }
        if let Some(bad) = trimmed
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | ':')))
        {
            return Err(FactbaseError::Validation(format!(
                "scope id contains invalid character '{bad}'"
            )));
        }

        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ScopeId {
    type Error = FactbaseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ScopeId> for String {
    fn from(scope: ScopeId) -> Self {
        scope.0
    }
}

impl std::fmt::Display for ScopeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[serde(rename_all = "snake_case")]
pub enum EntryType {
    Conversation,
    Faq,
    #[default]
    Knowledge,
    Example,
    Document,
}

impl EntryType {
    pub const ALL: [EntryType; 5] = [
        Self::Conversation,
        Self::Faq,
        Self::Knowledge,
        Self::Example,
        Self::Document,
    ];

    /// Types that state facts. Conversation history is never one.
    pub const FACTS: [EntryType; 4] = [Self::Faq, Self::Knowledge, Self::Example, Self::Document];
}

impl std::fmt::Display for EntryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Conversation => write!(f, "conversation"),
            Self::Faq => write!(f, "faq"),
            Self::Knowledge => write!(f, "knowledge"),
            Self::Example => write!(f, "example"),
            Self::Document => write!(f, "document"),
        }
    }
}

impl std::str::FromStr for EntryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "conversation" => Ok(Self::Conversation),
            "faq" => Ok(Self::Faq),
            "knowledge" => Ok(Self::Knowledge),
            "example" => Ok(Self::Example),
            "document" => Ok(Self::Document),
            _ => Err(format!("Unknown entry type: {s}")),
        }
    }
}

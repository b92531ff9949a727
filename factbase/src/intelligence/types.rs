use serde::Deserialize;

use crate::error::{FactbaseError, Result};
use crate::models::{EntryType, ResolutionAction};

/// Raw classifier output, as the LLM returned it.
#[derive(Debug, Clone, Deserialize)]
pub struct ClassifierResponse {
    pub action: ResolutionAction,
    #[serde(default)]
    pub merged_text: Option<String>,
    #[serde(default)]
    pub reason: String,
    pub confidence: f32,
}

/// A classifier verdict that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub enum ClassifierVerdict {
    Merge { merged_text: String },
    Replace,
    KeepBoth,
    Reject,
}

impl ClassifierVerdict {
    pub fn action(&self) -> ResolutionAction {
        match self {
            Self::Merge { .. } => ResolutionAction::Merge,
            Self::Replace => ResolutionAction::Replace,
            Self::KeepBoth => ResolutionAction::KeepBoth,
            Self::Reject => ResolutionAction::Reject,
        }
    }
}

impl ClassifierResponse {
    /// Check the response against the rules for a non-empty conflict group.
    pub fn validate(self) -> Result<(ClassifierVerdict, f32, String)> {
        if !(0.0..=1.0).contains(&self.confidence) || self.confidence.is_nan() {
            return Err(FactbaseError::Schema(format!(
                "classifier confidence {} outside [0, 1]",
                self.confidence
            )));
        }

        let verdict = match self.action {
            ResolutionAction::Create => {
                return Err(FactbaseError::Schema(
                    "classifier chose create although a conflict group exists".to_string(),
                ))
            }
            ResolutionAction::Merge => match self.merged_text {
                Some(text) if !text.trim().is_empty() => ClassifierVerdict::Merge {
                    merged_text: text.trim().to_string(),
                },
                _ => {
                    return Err(FactbaseError::Schema(
                        "merge verdict without merged_text".to_string(),
                    ))
                }
            },
            ResolutionAction::Replace => ClassifierVerdict::Replace,
            ResolutionAction::KeepBoth => ClassifierVerdict::KeepBoth,
            ResolutionAction::Reject => ClassifierVerdict::Reject,
        };

        Ok((verdict, self.confidence, self.reason))
    }
}

/// A fact update found in a conversation.
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractedUpdate {
    pub text: String,
    #[serde(rename = "type", default)]
    pub entry_type: Option<String>,
    #[serde(default)]
    pub reason: String,
    pub confidence: f32,
}

impl ExtractedUpdate {
    pub fn validate(&self) -> Result<EntryType> {
        if self.text.trim().is_empty() {
            return Err(FactbaseError::Schema("extracted update has empty text".to_string()));
        }
        if !(0.0..=1.0).contains(&self.confidence) || self.confidence.is_nan() {
            return Err(FactbaseError::Schema(format!(
                "extraction confidence {} outside [0, 1]",
                self.confidence
            )));
        }

        Ok(match self.entry_type.as_deref() {
            None => EntryType::Knowledge,
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                tracing::debug!(entry_type = raw, "Unknown extracted type, using knowledge");
                EntryType::Knowledge
            }),
        })
    }
}

/// Wrapper for extraction output. LLMs return the update directly, wrapped
/// in `{"update": ...}`, or `{"update": null}` when there is nothing.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ExtractionResponse {
    Direct(ExtractedUpdate),
    Wrapped { update: Option<ExtractedUpdate> },
}

impl ExtractionResponse {
    pub fn into_update(self) -> Option<ExtractedUpdate> {
        match self {
            Self::Direct(update) => Some(update),
            Self::Wrapped { update } => update,
        }
    }
}

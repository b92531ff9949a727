use chrono::Utc;
use regex::Regex;
use serde_json::Value;

use crate::config::ExtractionConfig;
use crate::error::{ErrorKind, FactbaseError, Result};
use crate::llm::{prompts, LlmProvider};
use crate::models::{Metadata, ScopeId, UpdateCandidate};

use super::types::ExtractionResponse;

/// Phrases that suggest the owner is reporting a change. Conversations
/// without any of them never reach the LLM.
const UPDATE_GATE_PATTERN: &str = r"(?ix)
    \b(
        hours?\s+(have\s+|has\s+)?changed
      | changed\s+(our\s+|the\s+|my\s+)?(hours|address|phone|number|prices?|pricing|menu)
      | new\s+(address|location|phone|number|hours|prices?|pricing|menu|email|website|policy)
      | updated?\s+(our\s+|the\s+)?(pricing|prices?|hours|menu|address|phone|policy)
      | moved\s+to
      | relocated
      | no\s+longer
      | from\s+now\s+on
      | (we|we're|we\s+are)\s+now
      | now\s+(open|close|closes|closed|offer|offers|charge|charges|accept|accepts|deliver|delivers)
      | (raised|lowered|increased|decreased)\s+(our\s+|the\s+)?(prices?|fees?|rates?)
      | starting\s+(next|from|on|this|today|tomorrow)
      | effective\s+(immediately|today|from|on)
    )\b";

const EXTRACTION_MAX_TOKENS: u32 = 256;

/// Finds fact updates in conversation text.
pub struct ExtractionService {
    llm: LlmProvider,
    gate: Regex,
    min_confidence: f32,
}

impl ExtractionService {
    pub fn new(llm: LlmProvider, config: &ExtractionConfig) -> Result<Self> {
        let gate = Regex::new(UPDATE_GATE_PATTERN)
            .map_err(|e| FactbaseError::Internal(format!("invalid extraction gate: {e}")))?;

        Ok(Self {
            llm,
            gate,
            min_confidence: config.min_confidence,
        })
    }

    /// Cheap local check run before any LLM call.
    pub fn passes_gate(&self, conversation: &str) -> bool {
        self.gate.is_match(conversation)
    }

    /// At most one candidate update. `Ok(None)` when there is nothing to
    /// extract, the LLM is not configured, or its output is unusable.
    /// Provider failures are returned as errors.
    pub async fn extract(
        &self,
        scope: &ScopeId,
        conversation: &str,
    ) -> Result<Option<UpdateCandidate>> {
        if conversation.trim().is_empty() {
            return Ok(None);
        }

        if !self.passes_gate(conversation) {
            tracing::debug!(scope_id = %scope, "No update phrases, skipping extraction");
            return Ok(None);
        }

        if !self.llm.is_available() {
            tracing::warn!("LLM unavailable, skipping update extraction");
            return Ok(None);
        }

        let prompt = prompts::update_extraction_prompt(conversation);
        let options = self.llm.deterministic_options(EXTRACTION_MAX_TOKENS);

        let response = match self
            .llm
            .complete_structured::<ExtractionResponse>(
                prompts::EXTRACTION_SYSTEM_PROMPT,
                &prompt,
                Some(&options),
            )
            .await
        {
            Ok(response) => response,
            Err(FactbaseError::LlmUnavailable(reason)) => {
                tracing::warn!(%reason, "LLM unavailable during extraction");
                return Ok(None);
            }
            Err(e) if e.kind() == ErrorKind::Schema => {
                tracing::warn!(error = %e, "Extraction returned malformed output");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let Some(update) = response.into_update() else {
            tracing::debug!(scope_id = %scope, "LLM found no update");
            return Ok(None);
        };

        let entry_type = match update.validate() {
            Ok(entry_type) => entry_type,
            Err(e) => {
                tracing::warn!(error = %e, "Extracted update failed validation");
                return Ok(None);
            }
        };

        if update.confidence < self.min_confidence {
            tracing::debug!(
                confidence = update.confidence,
                floor = self.min_confidence,
                "Extracted update below confidence floor"
            );
            return Ok(None);
        }

        let mut metadata = Metadata::new();
        metadata.insert("source".to_string(), Value::from("conversation"));
        metadata.insert("extracted_at".to_string(), Value::from(Utc::now().to_rfc3339()));
        metadata.insert("scope_id".to_string(), Value::from(scope.as_str()));
        metadata.insert("reason".to_string(), Value::from(update.reason.clone()));

        tracing::info!(
            scope_id = %scope,
            entry_type = %entry_type,
            confidence = update.confidence,
            "Extracted update candidate"
        );

        Ok(Some(UpdateCandidate {
            scope_id: scope.clone(),
            text: update.text.trim().to_string(),
            entry_type,
            metadata,
            confidence: update.confidence,
            reason: update.reason,
        }))
    }
}

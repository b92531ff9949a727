use regex::Regex;

use crate::config::MemoryConfig;
use crate::error::{ErrorKind, FactbaseError, Result};
use crate::intelligence::contradiction::ContradictionDetector;
use crate::intelligence::types::{ClassifierResponse, ClassifierVerdict};
use crate::intelligence::utils::is_near_identical;
use crate::llm::{prompts, LlmProvider};
use crate::models::{ConflictGroup, Resolution, ResolutionAction, ResolutionStage, UpdateCandidate};

const UPDATE_MARKER_PATTERN: &str =
    r"(?i)\b(updated|new|changed|moved|now|no\s+longer|instead|effective)\b";

const CLASSIFIER_MAX_TOKENS: u32 = 512;

/// Decides what to do with a candidate and its conflict group.
///
/// The stages run in a fixed order and the first one that decides wins:
/// no conflict, duplicate, lexical markers, LLM classifier, fallback.
/// Only the classifier stage can return an error, and only for provider
/// failures; malformed classifier output becomes a flagged `keep_both`.
pub struct ConflictResolver {
    llm: LlmProvider,
    contradiction: ContradictionDetector,
    update_markers: Regex,
    duplicate_threshold: f32,
    confidence_floor: f32,
}

impl ConflictResolver {
    pub fn new(llm: LlmProvider, config: &MemoryConfig) -> Result<Self> {
        let update_markers = Regex::new(UPDATE_MARKER_PATTERN)
            .map_err(|e| FactbaseError::Internal(format!("invalid update marker pattern: {e}")))?;

        Ok(Self {
            llm,
            contradiction: ContradictionDetector::new(),
            update_markers,
            duplicate_threshold: config.duplicate_threshold,
            confidence_floor: config.confidence_floor,
        })
    }

    pub async fn resolve(
        &self,
        candidate: &UpdateCandidate,
        group: Option<&ConflictGroup>,
    ) -> Result<Resolution> {
        let group = match group {
            Some(group) if !group.is_empty() => group,
            _ => return Ok(Resolution::create()),
        };

        if let Some(resolution) = self.check_duplicate(candidate, group) {
            return Ok(resolution);
        }

        if let Some(resolution) = self.check_lexical(candidate, group) {
            return Ok(resolution);
        }

        if let Some(resolution) = self.classify(candidate, group).await? {
            return Ok(resolution);
        }

        Ok(Resolution::unresolved(
            0.0,
            "no stage could decide between the facts",
            ResolutionStage::Fallback,
        ))
    }

    /// One member close enough in vector space and in wording.
    fn check_duplicate(&self, candidate: &UpdateCandidate, group: &ConflictGroup) -> Option<Resolution> {
        let near: Vec<_> = group
            .members
            .iter()
            .filter(|m| m.similarity.unwrap_or(0.0) >= self.duplicate_threshold)
            .collect();

        match near.as_slice() {
            [member] if is_near_identical(&candidate.text, &member.entry.text) => {
                tracing::debug!(entry_id = %member.entry.id, "Candidate duplicates an existing entry");
                Some(Resolution::new(
                    ResolutionAction::Reject,
                    1.0,
                    "duplicate",
                    ResolutionStage::Duplicate,
                ))
            }
            _ => None,
        }
    }

    fn check_lexical(&self, candidate: &UpdateCandidate, group: &ConflictGroup) -> Option<Resolution> {
        let marker = self
            .update_markers
            .find(&candidate.text)
            .or_else(|| self.update_markers.find(&candidate.reason));
        if let Some(found) = marker {
            return Some(Resolution::new(
                ResolutionAction::Replace,
                0.8,
                format!("update marker \"{}\"", found.as_str().to_lowercase()),
                ResolutionStage::Lexical,
            ));
        }

        let contradicted = group.members.iter().find(|m| {
            self.contradiction
                .check(&m.entry.text, &candidate.text)
                .is_strong()
        });
        contradicted.map(|member| {
            Resolution::new(
                ResolutionAction::Replace,
                0.75,
                format!("contradicts entry {}", member.entry.id),
                ResolutionStage::Lexical,
            )
        })
    }

    /// `Ok(None)` when no classifier is configured.
    async fn classify(
        &self,
        candidate: &UpdateCandidate,
        group: &ConflictGroup,
    ) -> Result<Option<Resolution>> {
        if !self.llm.is_available() {
            return Ok(None);
        }

        let existing: Vec<(&str, &str, f32)> = group
            .members
            .iter()
            .map(|m| {
                (
                    m.entry.id.as_str(),
                    m.entry.text.as_str(),
                    m.similarity.unwrap_or(group.pairwise_similarity),
                )
            })
            .collect();
        let prompt =
            prompts::conflict_resolution_prompt(&candidate.text, &candidate.reason, &existing);
        let options = self.llm.deterministic_options(CLASSIFIER_MAX_TOKENS);

        let response = match self
            .llm
            .complete_structured::<ClassifierResponse>(
                prompts::CONFLICT_SYSTEM_PROMPT,
                &prompt,
                Some(&options),
            )
            .await
        {
            Ok(response) => response,
            Err(FactbaseError::LlmUnavailable(reason)) => {
                tracing::warn!(%reason, "Classifier unavailable, falling back");
                return Ok(None);
            }
            Err(e) if e.kind() == ErrorKind::Schema => {
                tracing::warn!(error = %e, "Classifier returned malformed output");
                return Ok(Some(Resolution::unresolved(
                    0.0,
                    "classifier output was malformed",
                    ResolutionStage::Classifier,
                )));
            }
            Err(e) => return Err(e),
        };

        let (verdict, confidence, reason) = match response.validate() {
            Ok(valid) => valid,
            Err(e) => {
                tracing::warn!(error = %e, "Classifier output failed validation");
                return Ok(Some(Resolution::unresolved(
                    0.0,
                    format!("classifier output invalid: {e}"),
                    ResolutionStage::Classifier,
                )));
            }
        };

        if confidence < self.confidence_floor {
            tracing::info!(
                action = %verdict.action(),
                confidence,
                "Classifier below confidence floor"
            );
            return Ok(Some(Resolution::unresolved(
                confidence,
                format!("low-confidence {}: {reason}", verdict.action()),
                ResolutionStage::Classifier,
            )));
        }

        let resolution = Resolution::new(
            verdict.action(),
            confidence,
            reason,
            ResolutionStage::Classifier,
        );
        Ok(Some(match verdict {
            ClassifierVerdict::Merge { merged_text } => resolution.with_merged_text(merged_text),
            _ => resolution,
        }))
    }
}

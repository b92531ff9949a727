use std::sync::Arc;

use dashmap::DashMap;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::db::DatabaseBackend;
use crate::embeddings::EmbeddingProvider;
use crate::error::{FactbaseError, Result};
use crate::intelligence::{ConflictDetector, ConflictResolver, ExtractionService};
use crate::models::{
    CandidateState, ConversationSegment, EntryType, MemoryEntry, Resolution, ResolutionAction,
    ScopeId, UpdateCandidate, UpdateMemoryResult, UpdateMode,
};

/// Outcome of extracting (and optionally applying) an update from a conversation.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractOutcome {
    pub candidate: Option<UpdateCandidate>,
    pub update: Option<UpdateMemoryResult>,
}

/// Entry point for every write to a scope's knowledge.
///
/// Detection, resolution and persistence for one scope run under that scope's
/// mutex, so two updates to the same scope never interleave their
/// read-decide-write sequences. Different scopes proceed in parallel.
pub struct MemoryService {
    db: Arc<dyn DatabaseBackend>,
    embeddings: EmbeddingProvider,
    detector: Arc<ConflictDetector>,
    resolver: ConflictResolver,
    extraction: ExtractionService,
    scope_locks: DashMap<ScopeId, Arc<Mutex<()>>>,
    cancel: CancellationToken,
}

impl MemoryService {
    pub fn new(
        db: Arc<dyn DatabaseBackend>,
        embeddings: EmbeddingProvider,
        detector: Arc<ConflictDetector>,
        resolver: ConflictResolver,
        extraction: ExtractionService,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            db,
            embeddings,
            detector,
            resolver,
            extraction,
            scope_locks: DashMap::new(),
            cancel,
        }
    }

    fn scope_lock(&self, scope: &ScopeId) -> Arc<Mutex<()>> {
        self.scope_locks
            .entry(scope.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Store conversation segments for retrieval. No conflict detection runs
    /// for conversation history.
    pub async fn store_conversation_embeddings(
        &self,
        scope: &ScopeId,
        segments: &[ConversationSegment],
    ) -> Result<Vec<String>> {
        if segments.is_empty() {
            return Ok(Vec::new());
        }
        if let Some(pos) = segments.iter().position(|s| s.text.trim().is_empty()) {
            return Err(FactbaseError::Validation(format!(
                "segment {pos} has empty text"
            )));
        }

        let texts: Vec<String> = segments.iter().map(|s| s.text.clone()).collect();
        let vectors = self.embeddings.embed_passages(&texts).await?;

        let entries: Vec<MemoryEntry> = segments
            .iter()
            .zip(vectors)
            .map(|(segment, vector)| {
                MemoryEntry::new(
                    scope.clone(),
                    segment.text.clone(),
                    EntryType::Conversation,
                    vector,
                )
                .with_metadata(segment.metadata.clone())
            })
            .collect();

        let ids = self.db.insert(scope, &entries).await?;
        tracing::info!(scope_id = %scope, count = ids.len(), "Stored conversation segments");
        Ok(ids)
    }

    /// Apply one candidate. In manual mode only detection runs and nothing
    /// is written.
    pub async fn update_memory(
        &self,
        candidate: UpdateCandidate,
        mode: UpdateMode,
    ) -> Result<UpdateMemoryResult> {
        let scope = candidate.scope_id.clone();
        match self.run_update(candidate, mode).await {
            Ok(result) => Ok(result),
            Err(e) => {
                tracing::warn!(
                    scope_id = %scope,
                    state = %CandidateState::Failed(e.kind()),
                    error = %e,
                    "Memory update failed"
                );
                Err(e)
            }
        }
    }

    async fn run_update(
        &self,
        candidate: UpdateCandidate,
        mode: UpdateMode,
    ) -> Result<UpdateMemoryResult> {
        let scope = candidate.scope_id.clone();
        validate_candidate(&candidate)?;
        trace_state(&scope, CandidateState::Extracted);

        let vector = self.embeddings.embed_passage(&candidate.text).await?;
        self.embeddings.check_dimensions(&vector)?;
        trace_state(&scope, CandidateState::Embedded);

        let lock = self.scope_lock(&scope);
        let _guard = lock.lock().await;

        let conflicts = self
            .detector
            .detect(&scope, &vector, &candidate.text)
            .await?;
        trace_state(&scope, CandidateState::ConflictChecked);

        if mode == UpdateMode::Manual {
            return Ok(UpdateMemoryResult {
                action: None,
                memory_id: None,
                conflicts,
                resolution: None,
                superseded_ids: Vec::new(),
                state: CandidateState::ConflictChecked,
            });
        }

        let resolution = self.resolver.resolve(&candidate, conflicts.first()).await?;
        tracing::info!(
            scope_id = %scope,
            action = %resolution.action,
            stage = ?resolution.stage,
            confidence = resolution.confidence,
            needs_review = resolution.needs_review,
            "Conflict resolved"
        );
        trace_state(&scope, CandidateState::Resolved);

        if self.cancel.is_cancelled() {
            return Err(FactbaseError::Cancelled(
                "update cancelled before persistence".to_string(),
            ));
        }

        let superseded_ids = match resolution.action {
            action if action.supersedes() => conflicts
                .first()
                .map(|group| group.member_ids())
                .unwrap_or_default(),
            _ => Vec::new(),
        };

        let (memory_id, state) = self
            .persist(&scope, &candidate, vector, &resolution, &superseded_ids)
            .await?;
        trace_state(&scope, state);

        Ok(UpdateMemoryResult {
            action: Some(resolution.action),
            memory_id,
            conflicts,
            resolution: Some(resolution),
            superseded_ids,
            state,
        })
    }

    async fn persist(
        &self,
        scope: &ScopeId,
        candidate: &UpdateCandidate,
        vector: Vec<f32>,
        resolution: &Resolution,
        superseded_ids: &[String],
    ) -> Result<(Option<String>, CandidateState)> {
        match resolution.action {
            ResolutionAction::Reject => Ok((None, CandidateState::Rejected)),
            ResolutionAction::Create | ResolutionAction::KeepBoth => {
                let entry = new_entry(scope, candidate, candidate.text.clone(), vector, resolution);
                let id = entry.id.clone();
                self.db.insert(scope, &[entry]).await?;
                Ok((Some(id), CandidateState::Persisted))
            }
            ResolutionAction::Replace | ResolutionAction::Merge => {
                let (text, vector) = match &resolution.merged_text {
                    Some(merged) if resolution.action == ResolutionAction::Merge => {
                        let merged_vector = self.embeddings.embed_passage(merged).await?;
                        self.embeddings.check_dimensions(&merged_vector)?;
                        (merged.clone(), merged_vector)
                    }
                    _ => (candidate.text.clone(), vector),
                };

                let entry = new_entry(scope, candidate, text, vector, resolution);
                let id = entry.id.clone();
                self.db
                    .apply_supersession(scope, &entry, superseded_ids)
                    .await?;
                tracing::info!(
                    scope_id = %scope,
                    memory_id = %id,
                    superseded = superseded_ids.len(),
                    "Superseded conflicting entries"
                );
                Ok((Some(id), CandidateState::Persisted))
            }
        }
    }

    /// Apply candidates in order, each through the same path as
    /// [`update_memory`](Self::update_memory) in auto mode.
    ///
    /// Every candidate must belong to `scope`; otherwise nothing is applied.
    pub async fn import_candidates(
        &self,
        scope: &ScopeId,
        candidates: Vec<UpdateCandidate>,
    ) -> Result<Vec<Result<UpdateMemoryResult>>> {
        if let Some(foreign) = candidates.iter().find(|c| &c.scope_id != scope) {
            return Err(FactbaseError::TenantScopeViolation(format!(
                "import into {scope} contains a candidate for {}",
                foreign.scope_id
            )));
        }

        let total = candidates.len();
        let mut results = Vec::with_capacity(total);
        for candidate in candidates {
            results.push(self.update_memory(candidate, UpdateMode::Auto).await);
        }

        let failed = results.iter().filter(|r| r.is_err()).count();
        tracing::info!(scope_id = %scope, total, failed, "Import finished");
        Ok(results)
    }

    /// Look for an update in a conversation and, when asked, apply it.
    pub async fn extract(
        &self,
        scope: &ScopeId,
        conversation: &str,
        apply: bool,
    ) -> Result<ExtractOutcome> {
        let candidate = self.extraction.extract(scope, conversation).await?;

        let update = match (&candidate, apply) {
            (Some(candidate), true) => {
                Some(self.update_memory(candidate.clone(), UpdateMode::Auto).await?)
            }
            _ => None,
        };

        Ok(ExtractOutcome { candidate, update })
    }

    /// Remove every entry of a scope, history included.
    pub async fn delete_scope(&self, scope: &ScopeId) -> Result<u64> {
        let lock = self.scope_lock(scope);
        let deleted = {
            let _guard = lock.lock().await;
            self.db.delete_scope(scope).await?
        };
        drop(lock);
        // Only forget the lock if no other update is waiting on it
        self.scope_locks
            .remove_if(scope, |_, l| Arc::strong_count(l) == 1);

        tracing::info!(scope_id = %scope, deleted, "Scope deleted");
        Ok(deleted)
    }
}

fn validate_candidate(candidate: &UpdateCandidate) -> Result<()> {
    if candidate.text.trim().is_empty() {
        return Err(FactbaseError::Validation("candidate text must not be empty".to_string()));
    }
    if !(0.0..=1.0).contains(&candidate.confidence) {
        return Err(FactbaseError::Validation(format!(
            "candidate confidence must be between 0 and 1, got {}",
            candidate.confidence
        )));
    }
    Ok(())
}

fn new_entry(
    scope: &ScopeId,
    candidate: &UpdateCandidate,
    text: String,
    vector: Vec<f32>,
    resolution: &Resolution,
) -> MemoryEntry {
    let mut metadata = candidate.metadata.clone();
    if !candidate.reason.is_empty() {
        metadata
            .entry("reason".to_string())
            .or_insert_with(|| Value::from(candidate.reason.clone()));
    }
    if resolution.needs_review {
        metadata.insert("needs_review".to_string(), Value::Bool(true));
    }

    MemoryEntry::new(scope.clone(), text, candidate.entry_type, vector)
        .with_metadata(metadata)
        .with_confidence(candidate.confidence)
}

fn trace_state(scope: &ScopeId, state: CandidateState) {
    tracing::debug!(scope_id = %scope, state = %state, "Candidate state");
}

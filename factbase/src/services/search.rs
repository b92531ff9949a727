use std::sync::Arc;

use crate::config::{MemoryConfig, SearchConfig};
use crate::db::DatabaseBackend;
use crate::error::Result;
use crate::intelligence::ConflictDetector;
use crate::models::{ConflictGroup, EntryType, KnowledgeSummary, ScopeId, ScoredEntry};
use crate::search::{validate_threshold, SimilaritySearch};

/// Read-only operations over a scope's knowledge.
#[derive(Clone)]
pub struct SearchService {
    db: Arc<dyn DatabaseBackend>,
    search: SimilaritySearch,
    detector: Arc<ConflictDetector>,
    default_threshold: f32,
    default_top_k: usize,
    default_conflict_threshold: f32,
}

impl SearchService {
    pub fn new(
        db: Arc<dyn DatabaseBackend>,
        search: SimilaritySearch,
        detector: Arc<ConflictDetector>,
        search_config: &SearchConfig,
        memory_config: &MemoryConfig,
    ) -> Self {
        Self {
            db,
            search,
            detector,
            default_threshold: search_config.default_threshold,
            default_top_k: search_config.default_top_k,
            default_conflict_threshold: memory_config.conflict_threshold,
        }
    }

    /// Current entries of `scope` similar to `query`, best first. All entry
    /// types are searched unless `types` narrows them.
    pub async fn search_similar_conversations(
        &self,
        scope: &ScopeId,
        query: &str,
        threshold: Option<f32>,
        top_k: Option<usize>,
        types: Option<&[EntryType]>,
    ) -> Result<Vec<ScoredEntry>> {
        let threshold = threshold.unwrap_or(self.default_threshold);
        let top_k = top_k.unwrap_or(self.default_top_k);

        let results = self
            .search
            .search_text(scope, query, threshold, top_k, types)
            .await?;

        tracing::info!(
            scope_id = %scope,
            threshold,
            results = results.len(),
            "Searched knowledge"
        );
        Ok(results)
    }

    /// Groups of current entries that look like versions of the same fact.
    pub async fn get_memory_conflicts(
        &self,
        scope: &ScopeId,
        threshold: Option<f32>,
    ) -> Result<Vec<ConflictGroup>> {
        let threshold = validate_threshold(threshold.unwrap_or(self.default_conflict_threshold))?;
        self.detector.scan(scope, threshold).await
    }

    pub async fn get_business_knowledge_summary(&self, scope: &ScopeId) -> Result<KnowledgeSummary> {
        let (mut by_type, superseded) = self.db.count_by_type(scope).await?;
        for entry_type in EntryType::ALL {
            by_type.entry(entry_type).or_insert(0);
        }
        let total: u64 = by_type.values().sum();

        Ok(KnowledgeSummary {
            scope_id: scope.clone(),
            total,
            by_type,
            superseded,
        })
    }
}

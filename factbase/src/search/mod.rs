mod cache;

use std::sync::Arc;

use crate::db::DatabaseBackend;
use crate::embeddings::EmbeddingProvider;
use crate::error::{FactbaseError, Result};
use crate::models::{EntryType, ScopeId, ScoredEntry};

pub use cache::QueryEmbeddingCache;

pub const MAX_TOP_K: usize = 100;

/// Threshold must lie in `[0, 1]`.
pub fn validate_threshold(threshold: f32) -> Result<f32> {
    if !(0.0..=1.0).contains(&threshold) {
        return Err(FactbaseError::Validation(format!(
            "threshold must be between 0 and 1, got {threshold}"
        )));
    }
    Ok(threshold)
}

pub fn clamp_top_k(top_k: usize) -> usize {
    top_k.clamp(1, MAX_TOP_K)
}

/// Nearest-neighbour search over one scope.
#[derive(Clone)]
pub struct SimilaritySearch {
    db: Arc<dyn DatabaseBackend>,
    embeddings: EmbeddingProvider,
    cache: QueryEmbeddingCache,
}

impl SimilaritySearch {
    pub fn new(db: Arc<dyn DatabaseBackend>, embeddings: EmbeddingProvider, cache_size: usize) -> Self {
        Self {
            db,
            embeddings,
            cache: QueryEmbeddingCache::new(cache_size),
        }
    }

    /// Matches for an already embedded query, best first.
    pub async fn search(
        &self,
        scope: &ScopeId,
        vector: &[f32],
        threshold: f32,
        top_k: usize,
        types: Option<&[EntryType]>,
    ) -> Result<Vec<ScoredEntry>> {
        let threshold = validate_threshold(threshold)?;
        let top_k = clamp_top_k(top_k);

        if vector.len() != self.db.dimensions() {
            return Err(FactbaseError::DimensionMismatch {
                expected: self.db.dimensions(),
                actual: vector.len(),
            });
        }

        let mut results = self.db.query(scope, vector, threshold, top_k, types).await?;
        results.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        results.truncate(top_k);

        tracing::debug!(
            scope_id = %scope,
            threshold,
            top_k,
            results = results.len(),
            "Similarity search"
        );
        Ok(results)
    }

    pub async fn search_text(
        &self,
        scope: &ScopeId,
        query: &str,
        threshold: f32,
        top_k: usize,
        types: Option<&[EntryType]>,
    ) -> Result<Vec<ScoredEntry>> {
        validate_threshold(threshold)?;
        let vector = self.embed_query(query).await?;
        self.search(scope, &vector, threshold, top_k, types).await
    }

    /// Query embedding, served from the LRU cache when possible.
    pub async fn embed_query(&self, query: &str) -> Result<Vec<f32>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(FactbaseError::Validation("query must not be empty".to_string()));
        }

        if let Some(vector) = self.cache.get(query) {
            tracing::trace!("Query embedding cache hit");
            return Ok(vector);
        }

        let vector = self.embeddings.embed_query(query).await?;
        self.cache.put(query, vector.clone());
        Ok(vector)
    }
}

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::db::DatabaseBackend;
use crate::embeddings::EmbeddingProvider;
use crate::error::Result;
use crate::intelligence::{ConflictDetector, ConflictResolver, ExtractionService};
use crate::llm::LlmProvider;
use crate::retry::RetryPolicy;
use crate::search::SimilaritySearch;
use crate::services::{MemoryService, SearchService};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub db: Arc<dyn DatabaseBackend>,
    pub embeddings: EmbeddingProvider,
    pub llm: LlmProvider,
    pub search: SearchService,
    /// Shared so every request sees the same per-scope locks.
    pub memory: Arc<MemoryService>,
    pub retry: RetryPolicy,
}

impl AppState {
    pub fn new(
        config: Config,
        db: Arc<dyn DatabaseBackend>,
        embeddings: EmbeddingProvider,
        llm: LlmProvider,
        cancel: CancellationToken,
    ) -> Result<Self> {
        let config = Arc::new(config);

        let detector = Arc::new(ConflictDetector::new(db.clone(), &config.memory));
        let resolver = ConflictResolver::new(llm.clone(), &config.memory)?;
        let extraction = ExtractionService::new(llm.clone(), &config.extraction)?;

        let similarity = SimilaritySearch::new(
            db.clone(),
            embeddings.clone(),
            config.search.query_cache_size,
        );
        let search = SearchService::new(
            db.clone(),
            similarity,
            detector.clone(),
            &config.search,
            &config.memory,
        );
        let memory = Arc::new(MemoryService::new(
            db.clone(),
            embeddings.clone(),
            detector,
            resolver,
            extraction,
            cancel,
        ));
        let retry = RetryPolicy::new(&config.retry);

        Ok(Self {
            config,
            db,
            embeddings,
            llm,
            search,
            memory,
            retry,
        })
    }
}

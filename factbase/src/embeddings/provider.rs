use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use std::sync::{Arc, Mutex};

use super::api::{default_base_url, ApiConfig, EmbeddingApiClient};
use crate::config::{parse_provider_model, EmbeddingsConfig};
use crate::error::{FactbaseError, Result};

#[derive(Clone)]
enum EmbeddingBackend {
    Local { model: Arc<Mutex<TextEmbedding>> },
    Api { client: EmbeddingApiClient },
}

/// Turns text into fixed-dimension vectors.
///
/// Inputs are split into `batch_size` chunks. Every returned vector is
/// checked against the configured dimensionality so a misconfigured model
/// never reaches the store.
#[derive(Clone)]
pub struct EmbeddingProvider {
    backend: EmbeddingBackend,
    dimensions: usize,
    batch_size: usize,
}

impl EmbeddingProvider {
    pub fn new(config: &EmbeddingsConfig) -> Result<Self> {
        let (provider, model_name) = parse_provider_model(&config.model);

        if provider == "local" {
            return Self::new_local(config, model_name);
        }

        let api_config = ApiConfig {
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| default_base_url(provider).to_string()),
            api_key: config.api_key.clone(),
            model: model_name.to_string(),
            timeout_secs: config.timeout_secs,
        };
        Self::from_api(api_config, config.dimensions, config.batch_size)
    }

    /// Build a provider backed by an OpenAI-compatible HTTP endpoint.
    pub fn from_api(config: ApiConfig, dimensions: usize, batch_size: usize) -> Result<Self> {
        Ok(Self {
            backend: EmbeddingBackend::Api {
                client: EmbeddingApiClient::new(config)?,
            },
            dimensions,
            batch_size: batch_size.max(1),
        })
    }

    fn new_local(config: &EmbeddingsConfig, model_name: &str) -> Result<Self> {
        let model = build_model(resolve_embedding_model(model_name))?;

        Ok(Self {
            backend: EmbeddingBackend::Local {
                model: Arc::new(Mutex::new(model)),
            },
            dimensions: config.dimensions,
            batch_size: config.batch_size.max(1),
        })
    }

    pub fn is_local(&self) -> bool {
        matches!(self.backend, EmbeddingBackend::Local { .. })
    }

    /// Embed a list of texts, preserving order.
    pub async fn generate(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut all_embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            let mut embedded = self.embed_batch(batch.to_vec()).await?;
            for vector in &embedded {
                self.check_dimensions(vector)?;
            }
            all_embeddings.append(&mut embedded);
            tokio::task::yield_now().await;
        }

        Ok(all_embeddings)
    }

    async fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        match &self.backend {
            EmbeddingBackend::Local { model } => {
                let model = Arc::clone(model);
                let batch_size = self.batch_size;
                tokio::task::spawn_blocking(move || {
                    let mut model = model.lock().map_err(|e| {
                        FactbaseError::Embedding(format!("Embedding model lock poisoned: {e}"))
                    })?;
                    model
                        .embed(texts, Some(batch_size))
                        .map_err(|e| FactbaseError::Embedding(e.to_string()))
                })
                .await
                .map_err(|e| FactbaseError::Embedding(format!("Embedding worker failed: {e}")))?
            }
            EmbeddingBackend::Api { client } => {
                let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
                client.embed(&refs).await
            }
        }
    }

    async fn embed_single(&self, text: String) -> Result<Vec<f32>> {
        self.generate(&[text])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| FactbaseError::Embedding("No embedding generated".to_string()))
    }

    /// Embed a search query. Local models expect a `query:` prefix.
    pub async fn embed_query(&self, query: &str) -> Result<Vec<f32>> {
        let text = match &self.backend {
            EmbeddingBackend::Local { .. } => format!("query: {query}"),
            EmbeddingBackend::Api { .. } => query.to_string(),
        };
        self.embed_single(text).await
    }

    /// Embed a fact or conversation passage for storage.
    pub async fn embed_passage(&self, passage: &str) -> Result<Vec<f32>> {
        self.embed_single(self.passage_text(passage)).await
    }

    pub async fn embed_passages(&self, passages: &[String]) -> Result<Vec<Vec<f32>>> {
        let texts: Vec<String> = passages.iter().map(|p| self.passage_text(p)).collect();
        self.generate(&texts).await
    }

    fn passage_text(&self, passage: &str) -> String {
        match &self.backend {
            EmbeddingBackend::Local { .. } => format!("passage: {passage}"),
            EmbeddingBackend::Api { .. } => passage.to_string(),
        }
    }

    /// Ask the remote model for one vector and report its length.
    pub async fn probe_dimensions(&self) -> Result<usize> {
        match &self.backend {
            EmbeddingBackend::Local { .. } => Ok(self.dimensions),
            EmbeddingBackend::Api { client } => client.detect_dimensions().await,
        }
    }

    pub fn check_dimensions(&self, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dimensions {
            return Err(FactbaseError::DimensionMismatch {
                expected: self.dimensions,
                actual: vector.len(),
            });
        }
        Ok(())
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }
}

fn resolve_embedding_model(model_name: &str) -> EmbeddingModel {
    match model_name {
        "BAAI/bge-small-en-v1.5" | "bge-small-en-v1.5" => EmbeddingModel::BGESmallENV15,
        "BAAI/bge-base-en-v1.5" | "bge-base-en-v1.5" => EmbeddingModel::BGEBaseENV15,
        "BAAI/bge-large-en-v1.5" | "bge-large-en-v1.5" => EmbeddingModel::BGELargeENV15,
        "all-MiniLM-L6-v2" | "sentence-transformers/all-MiniLM-L6-v2" => {
            EmbeddingModel::AllMiniLML6V2
        }
        "all-MiniLM-L12-v2" | "sentence-transformers/all-MiniLM-L12-v2" => {
            EmbeddingModel::AllMiniLML12V2
        }
        "nomic-embed-text-v1.5" | "nomic-ai/nomic-embed-text-v1.5" => {
            EmbeddingModel::NomicEmbedTextV15
        }
        other => {
            tracing::warn!(model = other, "Unknown local embedding model, using bge-small-en-v1.5");
            EmbeddingModel::BGESmallENV15
        }
    }
}

fn build_model(embedding_model: EmbeddingModel) -> Result<TextEmbedding> {
    TextEmbedding::try_new(InitOptions::new(embedding_model).with_show_download_progress(true))
        .map_err(|e| FactbaseError::Embedding(e.to_string()))
}

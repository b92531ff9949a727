use axum::extract::State;
use serde::Serialize;

use crate::api::state::AppState;
use crate::api::v1::response::ApiResponse;
use crate::llm::LlmBackend;

/// Health data returned inside the v1 envelope.
///
/// `status` is `degraded` when the store cannot be reached. An unconfigured
/// LLM is not a failure: conflicts then resolve with the lexical stages only.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthData {
    pub status: String,
    pub version: String,
    pub database: DatabaseStatus,
    pub embeddings: EmbeddingsStatus,
    pub llm: LlmStatus,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseStatus {
    pub status: String,
    /// Vector width the store was built with.
    pub dimensions: usize,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EmbeddingsStatus {
    pub model: String,
    /// `local` or `api`.
    pub backend: String,
    pub dimensions: usize,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LlmStatus {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// `classifier` when the LLM decides inconclusive conflicts, otherwise
    /// `lexical`.
    pub resolution_mode: String,
}

fn llm_status(state: &AppState) -> LlmStatus {
    let provider = match state.llm.backend() {
        LlmBackend::OpenAI => "openai",
        LlmBackend::OpenRouter => "openrouter",
        LlmBackend::Ollama => "ollama",
        LlmBackend::LmStudio => "lmstudio",
        LlmBackend::OpenAICompatible { .. } => "openai-compatible",
        LlmBackend::Unavailable { .. } => {
            return LlmStatus {
                status: "unavailable".to_string(),
                provider: None,
                model: None,
                resolution_mode: "lexical".to_string(),
            }
        }
    };

    LlmStatus {
        status: "available".to_string(),
        provider: Some(provider.to_string()),
        model: state.config.llm.as_ref().map(|c| c.model.clone()),
        resolution_mode: "classifier".to_string(),
    }
}

/// `GET /api/v1/health`
#[utoipa::path(
    get,
    path = "/api/v1/health",
    tag = "health",
    responses(
        (status = 200, description = "Service health status", body = HealthData),
    )
)]
pub async fn health_check(State(state): State<AppState>) -> ApiResponse<HealthData> {
    let db_ok = match state.db.get_embedding_dimensions().await {
        Ok(_) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Health check could not reach the store");
            false
        }
    };

    let embeddings = EmbeddingsStatus {
        model: state.config.embeddings.model.clone(),
        backend: if state.embeddings.is_local() { "local" } else { "api" }.to_string(),
        dimensions: state.embeddings.dimensions(),
    };

    ApiResponse::success(HealthData {
        status: if db_ok { "ok" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: DatabaseStatus {
            status: if db_ok { "ok" } else { "error" }.to_string(),
            dimensions: state.db.dimensions(),
        },
        embeddings,
        llm: llm_status(&state),
    })
}

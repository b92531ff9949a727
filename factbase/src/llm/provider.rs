use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::{parse_llm_provider_model, LlmConfig};
use crate::error::{FactbaseError, Result};
use crate::llm::api::LlmApiClient;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LlmBackend {
    OpenAI,
    OpenRouter,
    Ollama,
    LmStudio,
    OpenAICompatible { base_url: String },
    Unavailable { reason: String },
}

#[derive(Debug, Clone, Default)]
pub struct CompletionOptions {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

/// Entry point for every LLM call in the crate.
///
/// An unconfigured or misconfigured provider is still constructible; it
/// reports [`FactbaseError::LlmUnavailable`] on use so callers can fall back.
#[derive(Clone)]
pub struct LlmProvider {
    backend: LlmBackend,
    client: Option<LlmApiClient>,
    temperature: f32,
}

impl LlmProvider {
    pub fn new(config: Option<&LlmConfig>) -> Self {
        let Some(config) = config else {
            return Self::unavailable("No LLM configuration provided");
        };

        let (provider, _model) = parse_llm_provider_model(&config.model);

        let backend = match provider.to_lowercase().as_str() {
            "openai" => LlmBackend::OpenAI,
            "openrouter" => LlmBackend::OpenRouter,
            "ollama" => LlmBackend::Ollama,
            "lmstudio" => LlmBackend::LmStudio,
            _ => match &config.base_url {
                Some(base_url) => LlmBackend::OpenAICompatible {
                    base_url: base_url.clone(),
                },
                None => {
                    return Self::unavailable(&format!(
                        "Unknown provider in model: {}",
                        config.model
                    ))
                }
            },
        };

        match LlmApiClient::new(config) {
            Ok(client) => Self {
                backend,
                client: Some(client),
                temperature: config.temperature,
            },
            Err(e) => {
                tracing::warn!(error = %e, model = %config.model, "LLM client could not be created");
                Self::unavailable(&e.to_string())
            }
        }
    }

    pub fn unavailable(reason: &str) -> Self {
        Self {
            backend: LlmBackend::Unavailable {
                reason: reason.to_string(),
            },
            client: None,
            temperature: 0.0,
        }
    }

    pub fn is_available(&self) -> bool {
        self.client.is_some()
    }

    pub fn backend(&self) -> &LlmBackend {
        &self.backend
    }

    /// Options for classification-style calls: low temperature, bounded output.
    pub fn deterministic_options(&self, max_tokens: u32) -> CompletionOptions {
        CompletionOptions {
            temperature: Some(self.temperature),
            max_tokens: Some(max_tokens),
        }
    }

    fn client(&self) -> Result<&LlmApiClient> {
        self.client.as_ref().ok_or_else(|| {
            let reason = match &self.backend {
                LlmBackend::Unavailable { reason } => reason.clone(),
                _ => "LLM client not initialised".to_string(),
            };
            FactbaseError::LlmUnavailable(reason)
        })
    }

    pub async fn complete(
        &self,
        prompt: &str,
        options: Option<&CompletionOptions>,
    ) -> Result<String> {
        self.client()?.complete(prompt, None, options).await
    }

    pub async fn complete_json(
        &self,
        system_prompt: &str,
        prompt: &str,
        options: Option<&CompletionOptions>,
    ) -> Result<Value> {
        self.client()?
            .complete_json(prompt, Some(system_prompt), options)
            .await
    }

    /// Complete and deserialize into `T`. Shape mismatches are schema errors.
    pub async fn complete_structured<T: DeserializeOwned>(
        &self,
        system_prompt: &str,
        prompt: &str,
        options: Option<&CompletionOptions>,
    ) -> Result<T> {
        let json_value = self.complete_json(system_prompt, prompt, options).await?;

        serde_json::from_value(json_value)
            .map_err(|e| FactbaseError::Schema(format!("Unexpected LLM response shape: {e}")))
    }
}

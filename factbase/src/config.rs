use serde::Deserialize;
use std::env;

fn parse_env_or<T: std::str::FromStr>(var: &str, default: T) -> T
where
    T::Err: std::fmt::Display,
{
    match env::var(var) {
        Ok(val) => match val.parse() {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("Invalid value '{}' for {}: {}. Using default.", val, var, e);
                default
            }
        },
        Err(_) => default,
    }
}

/// Like [`parse_env_or`], but also rejects values outside `[min, max]`.
fn parse_env_in_range(var: &str, default: f32, min: f32, max: f32) -> f32 {
    let value = parse_env_or(var, default);
    if (min..=max).contains(&value) {
        value
    } else {
        tracing::warn!(
            "Value {} for {} is outside [{}, {}]. Using default.",
            value,
            var,
            min,
            max
        );
        default
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub embeddings: EmbeddingsConfig,
    pub memory: MemoryConfig,
    pub search: SearchConfig,
    pub extraction: ExtractionConfig,
    pub retry: RetryConfig,
    pub llm: Option<LlmConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub api_keys: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub auth_token: Option<String>,
    pub local_path: Option<String>,
    /// Upper bound for a single store call before it is reported as transient.
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingsConfig {
    pub model: String,
    pub dimensions: usize,
    pub batch_size: usize,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub timeout_secs: u64,
}

/// LLM configuration for the conflict classifier and extraction prompts.
#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    pub model: String,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub timeout_secs: u64,
    pub temperature: f32,
}

/// Thresholds governing conflict detection and resolution.
#[derive(Debug, Clone, Deserialize)]
pub struct MemoryConfig {
    /// Pairwise similarity at or above which two entries are the same fact.
    pub conflict_threshold: f32,
    /// Looser bound used to collect the neighbourhood around a candidate.
    pub neighbor_threshold: f32,
    pub conflict_top_k: usize,
    pub duplicate_threshold: f32,
    /// Classifier verdicts below this confidence become `keep_both`.
    pub confidence_floor: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    pub default_threshold: f32,
    pub default_top_k: usize,
    pub query_cache_size: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExtractionConfig {
    pub min_confidence: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_interval_ms: u64,
    pub max_interval_ms: u64,
    pub multiplier: f64,
    pub jitter: f64,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            conflict_threshold: 0.85,
            neighbor_threshold: 0.7,
            conflict_top_k: 10,
            duplicate_threshold: 0.95,
            confidence_floor: 0.6,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_threshold: 0.7,
            default_top_k: 5,
            query_cache_size: 1000,
        }
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            min_confidence: 0.5,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_interval_ms: 200,
            max_interval_ms: 5_000,
            multiplier: 2.0,
            jitter: 0.3,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let memory_defaults = MemoryConfig::default();
        let search_defaults = SearchConfig::default();
        let retry_defaults = RetryConfig::default();

        Self {
            server: ServerConfig {
                host: env::var("FACTBASE_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: parse_env_or("FACTBASE_PORT", 3000),
                api_keys: env::var("FACTBASE_API_KEYS")
                    .map(|keys| {
                        keys.split(',')
                            .map(|s| s.trim().to_string())
                            .filter(|s| !s.is_empty())
                            .collect()
                    })
                    .unwrap_or_default(),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").unwrap_or_else(|_| "file:factbase.db".to_string()),
                auth_token: env::var("DATABASE_AUTH_TOKEN").ok(),
                local_path: env::var("DATABASE_LOCAL_PATH").ok(),
                timeout_secs: parse_env_or("STORE_TIMEOUT_SECS", 10),
            },
            embeddings: EmbeddingsConfig {
                model: env::var("EMBEDDING_MODEL")
                    .unwrap_or_else(|_| "BAAI/bge-small-en-v1.5".to_string()),
                dimensions: parse_env_or("EMBEDDING_DIMENSIONS", 384),
                batch_size: parse_env_or("EMBEDDING_BATCH_SIZE", 256),
                api_key: env::var("EMBEDDING_API_KEY").ok(),
                base_url: env::var("EMBEDDING_BASE_URL").ok(),
                timeout_secs: parse_env_or("EMBEDDING_TIMEOUT", 30),
            },
            memory: MemoryConfig {
                conflict_threshold: parse_env_in_range(
                    "CONFLICT_THRESHOLD",
                    memory_defaults.conflict_threshold,
                    0.0,
                    1.0,
                ),
                neighbor_threshold: parse_env_in_range(
                    "NEIGHBOR_THRESHOLD",
                    memory_defaults.neighbor_threshold,
                    0.0,
                    1.0,
                ),
                conflict_top_k: parse_env_or("CONFLICT_TOP_K", memory_defaults.conflict_top_k),
                duplicate_threshold: parse_env_in_range(
                    "DUPLICATE_THRESHOLD",
                    memory_defaults.duplicate_threshold,
                    0.0,
                    1.0,
                ),
                confidence_floor: parse_env_in_range(
                    "RESOLUTION_CONFIDENCE_FLOOR",
                    memory_defaults.confidence_floor,
                    0.0,
                    1.0,
                ),
            },
            search: SearchConfig {
                default_threshold: parse_env_in_range(
                    "SEARCH_THRESHOLD",
                    search_defaults.default_threshold,
                    0.0,
                    1.0,
                ),
                default_top_k: parse_env_or("SEARCH_TOP_K", search_defaults.default_top_k),
                query_cache_size: parse_env_or("QUERY_CACHE_SIZE", search_defaults.query_cache_size),
            },
            extraction: ExtractionConfig {
                min_confidence: parse_env_in_range(
                    "EXTRACTION_MIN_CONFIDENCE",
                    ExtractionConfig::default().min_confidence,
                    0.0,
                    1.0,
                ),
            },
            retry: RetryConfig {
                max_attempts: parse_env_or("RETRY_MAX_ATTEMPTS", retry_defaults.max_attempts),
                initial_interval_ms: parse_env_or(
                    "RETRY_INITIAL_INTERVAL_MS",
                    retry_defaults.initial_interval_ms,
                ),
                max_interval_ms: parse_env_or("RETRY_MAX_INTERVAL_MS", retry_defaults.max_interval_ms),
                multiplier: parse_env_or("RETRY_MULTIPLIER", retry_defaults.multiplier),
                jitter: parse_env_or("RETRY_JITTER", retry_defaults.jitter),
            },
            llm: env::var("LLM_MODEL").ok().map(|model| LlmConfig {
                model,
                api_key: env::var("LLM_API_KEY").ok(),
                base_url: env::var("LLM_BASE_URL").ok(),
                timeout_secs: parse_env_or("LLM_TIMEOUT", 30),
                temperature: parse_env_in_range("LLM_TEMPERATURE", 0.1, 0.0, 0.2),
            }),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::default()
    }
}

/// Known embedding providers that use OpenAI-compatible APIs
const KNOWN_PROVIDERS: &[&str] = &["openai", "openrouter", "ollama", "lmstudio", "local"];

/// Known LLM providers that use OpenAI-compatible APIs
pub const KNOWN_LLM_PROVIDERS: &[&str] = &["openai", "openrouter", "ollama", "lmstudio"];

/// Parse a model name into (provider, model) tuple.
pub fn parse_provider_model(model: &str) -> (&str, &str) {
    if let Some((prefix, rest)) = model.split_once('/') {
        let prefix_lower = prefix.to_lowercase();
        if KNOWN_PROVIDERS.contains(&prefix_lower.as_str()) {
            return (prefix, rest);
        }
    }
    ("local", model)
}

/// Parse an LLM model name into (provider, model) tuple.
pub fn parse_llm_provider_model(model: &str) -> (&str, &str) {
    if let Some((prefix, rest)) = model.split_once('/') {
        let prefix_lower = prefix.to_lowercase();
        if KNOWN_LLM_PROVIDERS.contains(&prefix_lower.as_str()) {
            return (prefix, rest);
        }
    }
    ("local", model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_memory_config_defaults() {
        for var in [
            "CONFLICT_THRESHOLD",
            "NEIGHBOR_THRESHOLD",
            "CONFLICT_TOP_K",
            "DUPLICATE_THRESHOLD",
            "RESOLUTION_CONFIDENCE_FLOOR",
        ] {
            std::env::remove_var(var);
        }

        let config = Config::default();
        assert_eq!(config.memory.conflict_threshold, 0.85);
        assert_eq!(config.memory.neighbor_threshold, 0.7);
        assert_eq!(config.memory.conflict_top_k, 10);
        assert_eq!(config.memory.duplicate_threshold, 0.95);
        assert_eq!(config.memory.confidence_floor, 0.6);
    }

    #[test]
    #[serial]
    fn test_conflict_threshold_from_env() {
        std::env::set_var("CONFLICT_THRESHOLD", "0.9");
        let config = Config::default();
        assert_eq!(config.memory.conflict_threshold, 0.9);
        std::env::remove_var("CONFLICT_THRESHOLD");
    }

    #[test]
    #[serial]
    fn test_out_of_range_threshold_falls_back() {
        std::env::set_var("CONFLICT_THRESHOLD", "1.5");
        let config = Config::default();
        assert_eq!(config.memory.conflict_threshold, 0.85);
        std::env::remove_var("CONFLICT_THRESHOLD");
    }

    #[test]
    #[serial]
    fn test_llm_config_defaults() {
        std::env::remove_var("LLM_MODEL");
        std::env::remove_var("LLM_TEMPERATURE");
        let config = Config::default();
        assert!(config.llm.is_none());

        std::env::set_var("LLM_MODEL", "openai/gpt-4o-mini");
        let config = Config::default();
        let llm = config.llm.expect("llm configured");
        assert_eq!(llm.model, "openai/gpt-4o-mini");
        assert_eq!(llm.timeout_secs, 30);
        assert_eq!(llm.temperature, 0.1);

        std::env::remove_var("LLM_MODEL");
    }

    #[test]
    #[serial]
    fn test_llm_temperature_is_capped() {
        std::env::set_var("LLM_MODEL", "openai/gpt-4o-mini");
        std::env::set_var("LLM_TEMPERATURE", "0.9");
        let llm = Config::default().llm.expect("llm configured");
        assert_eq!(llm.temperature, 0.1);
        std::env::remove_var("LLM_MODEL");
        std::env::remove_var("LLM_TEMPERATURE");
    }

    #[test]
    #[serial]
    fn test_api_keys_skip_blank_entries() {
        std::env::set_var("FACTBASE_API_KEYS", "alpha, ,beta");
        let config = Config::default();
        assert_eq!(config.server.api_keys, vec!["alpha", "beta"]);
        std::env::remove_var("FACTBASE_API_KEYS");
    }

    #[test]
    #[serial]
    fn test_parse_env_or_invalid_value_uses_default() {
        std::env::set_var("__TEST_PARSE_PORT", "not-a-port");
        let result: u16 = parse_env_or("__TEST_PARSE_PORT", 3000);
        assert_eq!(result, 3000);
        std::env::remove_var("__TEST_PARSE_PORT");
    }

    #[test]
    fn test_parse_provider_model() {
        assert_eq!(
            parse_provider_model("openai/text-embedding-3-small"),
            ("openai", "text-embedding-3-small")
        );
        assert_eq!(
            parse_provider_model("BAAI/bge-small-en-v1.5"),
            ("local", "BAAI/bge-small-en-v1.5")
        );
        assert_eq!(
            parse_llm_provider_model("ollama/llama3"),
            ("ollama", "llama3")
        );
    }
}

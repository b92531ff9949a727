// Common test utilities for integration tests
#![allow(dead_code)]

use std::sync::{Arc, Once};
use std::time::Duration;

use factbase::api::AppState;
use factbase::config::{Config, DatabaseConfig, LlmConfig, RetryConfig, ServerConfig};
use factbase::db::{Database, DatabaseBackend, LibSqlBackend};
use factbase::embeddings::{ApiConfig, EmbeddingProvider};
use factbase::llm::LlmProvider;
use factbase::models::{EntryType, ScopeId, UpdateCandidate};
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

pub const DIMENSIONS: usize = 8;
pub const API_KEY: &str = "test-key";

static INIT: Once = Once::new();

/// Initialize tracing subscriber once for tests
pub fn init_test_logger() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Keyword sets for the topic axes. A text lands on the first topic whose
/// keyword it contains, or on the catch-all axis.
const TOPICS: [&[&str]; 4] = [
    &["open", "opens", "hours", "close", "closes", "closed"],
    &["phone", "call", "number"],
    &["address", "street", "located", "moved"],
    &["deliver", "delivery", "delivers"],
];
const OTHER_AXIS: usize = 4;
const HASH_AXES: usize = 3;
const HASH_SCALE: f32 = 0.2;

/// Deterministic embedding: a unit topic axis plus three small non-negative
/// hash axes. Texts sharing a topic land at cosine >= 0.89, texts on
/// different topics below 0.15, and identical texts at exactly 1.
pub fn embed_text(text: &str) -> Vec<f32> {
    let lowered = text.to_lowercase();
    let tokens: Vec<&str> = lowered
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect();

    let mut vector = vec![0.0f32; DIMENSIONS];
    let axis = TOPICS
        .iter()
        .position(|keywords| tokens.iter().any(|t| keywords.contains(t)))
        .unwrap_or(OTHER_AXIS);
    vector[axis] = 1.0;

    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for token in &tokens {
        for byte in token.bytes() {
            hash ^= u64::from(byte);
            hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
        }
    }
    for i in 0..HASH_AXES {
        let bucket = ((hash >> (i * 16)) & 0xffff) as f32 / 65535.0;
        vector[OTHER_AXIS + 1 + i] = bucket * HASH_SCALE;
    }
    vector
}

/// Answers `POST /embeddings` in the OpenAI format using [`embed_text`].
pub struct TopicEmbedder;

impl Respond for TopicEmbedder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body: Value = match serde_json::from_slice(&request.body) {
            Ok(body) => body,
            Err(_) => return ResponseTemplate::new(400),
        };
        let inputs: Vec<String> = match &body["input"] {
            Value::String(s) => vec![s.clone()],
            Value::Array(items) => items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            _ => return ResponseTemplate::new(400),
        };

        let data: Vec<Value> = inputs
            .iter()
            .enumerate()
            .map(|(index, text)| {
                json!({"object": "embedding", "index": index, "embedding": embed_text(text)})
            })
            .collect();
        ResponseTemplate::new(200).set_body_json(json!({
            "object": "list",
            "data": data,
            "model": "topic-embedder",
        }))
    }
}

pub async fn start_embedder() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with(TopicEmbedder)
        .mount(&server)
        .await;
    server
}

/// A chat completion whose message content is `content`.
pub fn completion_body(content: &str) -> Value {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "created": 1_700_000_000,
        "model": "llama3",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 10, "completion_tokens": 10, "total_tokens": 20}
    })
}

/// Mock `POST /chat/completions` answering every call with `content`.
pub fn llm_reply(content: &str) -> Mock {
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body(content)))
}

/// Services wired over a fresh database file and mock providers.
pub struct Harness {
    pub state: AppState,
    pub embedder: MockServer,
    pub llm: Option<MockServer>,
    pub cancel: CancellationToken,
    _dir: TempDir,
}

impl Harness {
    pub async fn new() -> Self {
        Self::build(None).await
    }

    pub async fn with_llm(llm: MockServer) -> Self {
        Self::build(Some(llm)).await
    }

    async fn build(llm: Option<MockServer>) -> Self {
        init_test_logger();
        let embedder = start_embedder().await;
        let dir = TempDir::new().unwrap();

        let config = Config {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                api_keys: vec![API_KEY.to_string()],
            },
            database: DatabaseConfig {
                url: format!("file:{}", dir.path().join("factbase.db").display()),
                auth_token: None,
                local_path: None,
                timeout_secs: 10,
            },
            retry: RetryConfig {
                max_attempts: 3,
                initial_interval_ms: 1,
                max_interval_ms: 10,
                multiplier: 2.0,
                jitter: 0.0,
            },
            llm: llm.as_ref().map(|server| LlmConfig {
                model: "ollama/llama3".to_string(),
                api_key: None,
                base_url: Some(server.uri()),
                timeout_secs: 5,
                temperature: 0.0,
            }),
            ..Config::default()
        };

        let db = open_backend(&config.database, DIMENSIONS).await;
        let embeddings = embedder_for(&embedder, DIMENSIONS);
        let llm_provider = LlmProvider::new(config.llm.as_ref());

        let cancel = CancellationToken::new();
        let state = AppState::new(config, db, embeddings, llm_provider, cancel.clone()).unwrap();

        Self {
            state,
            embedder,
            llm,
            cancel,
            _dir: dir,
        }
    }

    pub fn db(&self) -> &dyn DatabaseBackend {
        self.state.db.as_ref()
    }

    pub async fn current_texts(&self, scope: &ScopeId) -> Vec<String> {
        let mut texts: Vec<String> = self
            .db()
            .list_current(scope)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.text)
            .collect();
        texts.sort();
        texts
    }

    pub async fn llm_calls(&self) -> usize {
        match &self.llm {
            Some(server) => server.received_requests().await.map_or(0, |r| r.len()),
            None => 0,
        }
    }
}

pub async fn open_backend(config: &DatabaseConfig, dims: usize) -> Arc<dyn DatabaseBackend> {
    let raw = Database::new(config, dims).await.unwrap();
    Arc::new(LibSqlBackend::new(
        raw,
        Duration::from_secs(config.timeout_secs),
    ))
}

pub fn embedder_for(server: &MockServer, dims: usize) -> EmbeddingProvider {
    EmbeddingProvider::from_api(
        ApiConfig {
            base_url: server.uri(),
            api_key: None,
            model: "topic-embedder".to_string(),
            timeout_secs: 5,
        },
        dims,
        16,
    )
    .unwrap()
}

pub fn scope(raw: &str) -> ScopeId {
    ScopeId::new(raw).unwrap()
}

pub fn knowledge(scope: &ScopeId, text: &str) -> UpdateCandidate {
    UpdateCandidate::new(scope.clone(), text, EntryType::Knowledge)
}

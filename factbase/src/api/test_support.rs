use std::sync::Arc;

use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use crate::api::AppState;
use crate::config::{Config, DatabaseConfig, ServerConfig};
use crate::db::{Database, DatabaseBackend, LibSqlBackend};
use crate::embeddings::{ApiConfig, EmbeddingProvider};
use crate::llm::LlmProvider;

pub(crate) const TEST_DIMENSIONS: usize = 8;

/// State over a fresh database file. The embedding endpoint is never
/// reachable, so only routes that do not embed can succeed.
pub(crate) async fn test_state(api_keys: Vec<String>) -> (AppState, TempDir) {
    let dir = TempDir::new().unwrap();
    let config = Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 3000,
            api_keys,
        },
        database: DatabaseConfig {
            url: format!("file:{}", dir.path().join("api.db").display()),
            auth_token: None,
            local_path: None,
            timeout_secs: 5,
        },
        llm: None,
        ..Config::default()
    };

    let raw_db = Database::new(&config.database, TEST_DIMENSIONS)
        .await
        .unwrap();
    let db: Arc<dyn DatabaseBackend> = Arc::new(LibSqlBackend::new(
        raw_db,
        std::time::Duration::from_secs(config.database.timeout_secs),
    ));

    let embeddings = EmbeddingProvider::from_api(
        ApiConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            api_key: None,
            model: "test-embedder".to_string(),
            timeout_secs: 1,
        },
        TEST_DIMENSIONS,
        16,
    )
    .unwrap();
    let llm = LlmProvider::new(config.llm.as_ref());

    let state = AppState::new(config, db, embeddings, llm, CancellationToken::new()).unwrap();
    (state, dir)
}

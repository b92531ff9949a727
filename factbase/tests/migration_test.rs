//! Embedding dimension checks and the re-embedding rebuild.

mod common;

use common::{embedder_for, knowledge, open_backend, scope, start_embedder, DIMENSIONS};
use factbase::config::DatabaseConfig;
use factbase::migration::{check_dimension_compatibility, rebuild_embeddings, MigrationDecision};
use factbase::models::UpdateMode;
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn database_config(dir: &TempDir) -> DatabaseConfig {
    DatabaseConfig {
        url: format!("file:{}", dir.path().join("migrate.db").display()),
        auth_token: None,
        local_path: None,
        timeout_secs: 10,
    }
}

#[tokio::test]
async fn test_fresh_database_records_dimensions() {
    common::init_test_logger();
    let dir = TempDir::new().unwrap();
    let server = start_embedder().await;
    let db = open_backend(&database_config(&dir), DIMENSIONS).await;
    let embeddings = embedder_for(&server, DIMENSIONS);

    let decision = check_dimension_compatibility(db.as_ref(), &embeddings, false)
        .await
        .unwrap();
    assert_eq!(decision, MigrationDecision::NotNeeded);
    assert_eq!(db.get_embedding_dimensions().await.unwrap(), Some(DIMENSIONS));

    let again = check_dimension_compatibility(db.as_ref(), &embeddings, false)
        .await
        .unwrap();
    assert_eq!(again, MigrationDecision::NotNeeded);
}

#[tokio::test]
async fn test_mismatch_requires_approval() {
    let dir = TempDir::new().unwrap();
    let server = start_embedder().await;
    let db = open_backend(&database_config(&dir), DIMENSIONS).await;
    db.set_embedding_dimensions(4).await.unwrap();
    let embeddings = embedder_for(&server, DIMENSIONS);

    // Test processes have no terminal on stdin
    let decision = check_dimension_compatibility(db.as_ref(), &embeddings, false)
        .await
        .unwrap();
    assert_eq!(decision, MigrationDecision::Rejected);

    let forced = check_dimension_compatibility(db.as_ref(), &embeddings, true)
        .await
        .unwrap();
    assert_eq!(forced, MigrationDecision::Approved);
}

#[tokio::test]
async fn test_rebuild_reembeds_and_keeps_history() {
    common::init_test_logger();
    let dir = TempDir::new().unwrap();
    let config = database_config(&dir);
    let server = start_embedder().await;
    let acme = scope("acme");

    // Populate with the current model first
    {
        let db = open_backend(&config, DIMENSIONS).await;
        let embeddings = embedder_for(&server, DIMENSIONS);
        check_dimension_compatibility(db.as_ref(), &embeddings, false)
            .await
            .unwrap();

        let state = factbase::api::AppState::new(
            factbase::config::Config {
                database: config.clone(),
                llm: None,
                ..factbase::config::Config::default()
            },
            db,
            embeddings,
            factbase::llm::LlmProvider::new(None),
            tokio_util::sync::CancellationToken::new(),
        )
        .unwrap();
        state
            .memory
            .update_memory(knowledge(&acme, "We are open 9am to 5pm on weekdays"), UpdateMode::Auto)
            .await
            .unwrap();
        state
            .memory
            .update_memory(knowledge(&acme, "We now open 8am to 6pm on weekdays"), UpdateMode::Auto)
            .await
            .unwrap();
    }

    let db = open_backend(&config, DIMENSIONS).await;
    let embeddings = embedder_for(&server, DIMENSIONS);
    let rebuilt = rebuild_embeddings(db.as_ref(), &embeddings).await.unwrap();
    assert_eq!(rebuilt, 2);
    assert_eq!(db.get_embedding_dimensions().await.unwrap(), Some(DIMENSIONS));

    let current = db.list_current(&acme).await.unwrap();
    assert_eq!(current.len(), 1);
    assert_eq!(current[0].text, "We now open 8am to 6pm on weekdays");
    assert_eq!(current[0].vector.len(), DIMENSIONS);

    let (_, superseded) = db.count_by_type(&acme).await.unwrap();
    assert_eq!(superseded, 1);
}

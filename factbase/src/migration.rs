use std::io::{self, IsTerminal, Write};

use crate::db::DatabaseBackend;
use crate::embeddings::EmbeddingProvider;
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationDecision {
    NotNeeded,
    Approved,
    Rejected,
}

/// Check if embedding dimensions are compatible with the database.
///
/// If dimensions mismatch, either prompt the user or check force_rebuild flag.
/// Without a terminal and without the flag, the mismatch is rejected.
pub async fn check_dimension_compatibility(
    db: &dyn DatabaseBackend,
    provider: &EmbeddingProvider,
    force_rebuild: bool,
) -> Result<MigrationDecision> {
    let model_dimensions = provider.dimensions();
    let stored_dimensions = db.get_embedding_dimensions().await?;

    match stored_dimensions {
        None => {
            tracing::info!(
                "Fresh database, storing embedding dimensions: {}",
                model_dimensions
            );
            db.set_embedding_dimensions(model_dimensions).await?;
            Ok(MigrationDecision::NotNeeded)
        }
        Some(db_dims) if db_dims == model_dimensions => {
            tracing::info!("Embedding dimensions match: {}", model_dimensions);
            Ok(MigrationDecision::NotNeeded)
        }
        Some(db_dims) => {
            tracing::warn!(
                "Dimension mismatch: database has {} dimensions, model produces {}",
                db_dims,
                model_dimensions
            );

            if force_rebuild {
                tracing::info!("Force rebuild flag set, proceeding with migration");
                return Ok(MigrationDecision::Approved);
            }

            if !io::stdin().is_terminal() {
                return Ok(MigrationDecision::Rejected);
            }

            print!(
                "\nEmbedding dimension mismatch detected!\n\
                 Database: {db_dims} dimensions\n\
                 Model: {model_dimensions} dimensions\n\n\
                 This requires re-embedding every stored entry.\n\
                 Proceed with migration? [y/N]: "
            );
            io::stdout().flush()?;

            let mut input = String::new();
            io::stdin().read_line(&mut input)?;

            let answer = input.trim().to_lowercase();
            if answer == "y" || answer == "yes" {
                Ok(MigrationDecision::Approved)
            } else {
                Ok(MigrationDecision::Rejected)
            }
        }
    }
}

/// Re-embed every stored entry with the current model and rebuild the
/// vector column at the model's width.
///
/// Texts and supersession history are kept; only vectors change.
pub async fn rebuild_embeddings(
    db: &dyn DatabaseBackend,
    provider: &EmbeddingProvider,
) -> Result<usize> {
    let new_dimensions = provider.dimensions();
    tracing::info!(
        "Starting re-embedding migration to {} dimensions",
        new_dimensions
    );

    let rows = db.list_all_texts().await?;
    let texts: Vec<String> = rows.iter().map(|(_, text)| text.clone()).collect();
    let vectors = provider.embed_passages(&texts).await?;

    let updates: Vec<(String, Vec<f32>)> = rows
        .into_iter()
        .map(|(id, _)| id)
        .zip(vectors)
        .collect();

    db.rebuild_vectors(new_dimensions, &updates).await?;

    tracing::info!(entries = updates.len(), "Re-embedding migration complete");
    Ok(updates.len())
}

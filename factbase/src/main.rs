use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use factbase::api::{create_router, AppState};
use factbase::config::Config;
use factbase::db::{Database, DatabaseBackend, LibSqlBackend};
use factbase::embeddings::EmbeddingProvider;
use factbase::llm::LlmProvider;
use factbase::migration::{self, MigrationDecision};

#[derive(Parser)]
#[command(name = "factbase")]
#[command(about = "Writable per-tenant memory engine for business knowledge")]
struct Args {
    /// Re-embed every entry when the model's dimensions differ from the store's
    #[arg(long)]
    rebuild_embeddings: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "factbase=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();

    if config.server.api_keys.is_empty() {
        tracing::warn!(
            "FACTBASE_API_KEYS is not set. Scope routes are locked until keys are configured."
        );
    }

    tracing::info!("Loading embedding model: {}...", config.embeddings.model);
    let embeddings = EmbeddingProvider::new(&config.embeddings)?;

    tracing::info!("Initializing database...");
    let raw_db = Database::new(&config.database, embeddings.dimensions()).await?;
    let db: Arc<dyn DatabaseBackend> = Arc::new(LibSqlBackend::new(
        raw_db,
        Duration::from_secs(config.database.timeout_secs),
    ));
    db.sync().await?;

    match migration::check_dimension_compatibility(&*db, &embeddings, args.rebuild_embeddings)
        .await?
    {
        MigrationDecision::NotNeeded => {}
        MigrationDecision::Approved => {
            let count = migration::rebuild_embeddings(&*db, &embeddings).await?;
            tracing::info!(entries = count, "Embeddings rebuilt");
        }
        MigrationDecision::Rejected => {
            tracing::error!("Migration rejected. Cannot start with dimension mismatch.");
            return Err(anyhow::anyhow!(
                "Embedding dimension mismatch - use --rebuild-embeddings flag to force migration"
            ));
        }
    }

    if let Some(llm_config) = &config.llm {
        tracing::info!("Initializing LLM provider: {}...", llm_config.model);
    }
    let llm = LlmProvider::new(config.llm.as_ref());
    if !llm.is_available() {
        tracing::warn!("LLM unavailable - conflicts resolve with lexical rules only and extraction is disabled");
    }

    let cancel_token = CancellationToken::new();
    let addr = format!("{}:{}", config.server.host, config.server.port);

    let state = AppState::new(config, db, embeddings, llm, cancel_token.clone())?;
    let app = create_router(state);

    tracing::info!("Factbase starting on http://{}", addr);
    tracing::info!("  Health check: http://{}/api/v1/health", addr);
    tracing::info!("  API docs:     http://{}/api/v1/docs", addr);
    tracing::info!("  OpenAPI spec: http://{}/api/v1/openapi.json", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel_token))
        .await?;

    Ok(())
}

async fn shutdown_signal(cancel_token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, cancelling in-flight updates...");
    cancel_token.cancel();
}

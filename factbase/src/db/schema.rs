use libsql::Connection;

use crate::error::Result;

/// DDL for the entries table. `{dims}` is the embedding width, fixed per database.
fn entries_table_sql(table: &str, dims: usize) -> String {
    format!(
        r#"
        CREATE TABLE IF NOT EXISTS {table} (
            id TEXT PRIMARY KEY,
            scope_id TEXT NOT NULL,
            text TEXT NOT NULL,
            entry_type TEXT NOT NULL DEFAULT 'knowledge',
            metadata TEXT NOT NULL DEFAULT '{{}}',
            confidence REAL NOT NULL DEFAULT 1.0,
            superseded_by TEXT,
            embedding F32_BLOB({dims}),
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#
    )
}

pub async fn init_schema(conn: &Connection, dims: usize) -> Result<()> {
    conn.execute_batch(&entries_table_sql("memory_entries", dims))
        .await?;

    conn.execute_batch(
        r#"
        -- Every query filters by scope and, usually, by current-ness
        CREATE INDEX IF NOT EXISTS idx_memory_entries_scope_current
            ON memory_entries(scope_id, superseded_by);
        CREATE INDEX IF NOT EXISTS idx_memory_entries_scope_type
            ON memory_entries(scope_id, entry_type);

        -- Metadata key-value store
        CREATE TABLE IF NOT EXISTS factbase_meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
    )
    .await?;

    create_vector_index(conn).await?;

    Ok(())
}

/// Recreate the entries table with a new embedding width, keeping every row
/// but its vector. Must run inside a transaction.
pub async fn recreate_entries_table(conn: &Connection, dims: usize) -> Result<()> {
    conn.execute_batch(
        r#"
        DROP INDEX IF EXISTS memory_entries_embedding_idx;
        DROP TABLE IF EXISTS memory_entries_old;
        ALTER TABLE memory_entries RENAME TO memory_entries_old;
        "#,
    )
    .await?;

    conn.execute_batch(&entries_table_sql("memory_entries", dims))
        .await?;

    conn.execute_batch(
        r#"
        INSERT INTO memory_entries (
            id, scope_id, text, entry_type, metadata, confidence,
            superseded_by, created_at, updated_at
        )
        SELECT id, scope_id, text, entry_type, metadata, confidence,
               superseded_by, created_at, updated_at
        FROM memory_entries_old;

        DROP TABLE memory_entries_old;

        CREATE INDEX IF NOT EXISTS idx_memory_entries_scope_current
            ON memory_entries(scope_id, superseded_by);
        CREATE INDEX IF NOT EXISTS idx_memory_entries_scope_type
            ON memory_entries(scope_id, entry_type);
        "#,
    )
    .await?;

    Ok(())
}

pub async fn create_vector_index(conn: &Connection) -> Result<()> {
    let index_exists: bool = conn
        .query(
            "SELECT 1 FROM sqlite_master WHERE type='index' AND name='memory_entries_embedding_idx'",
            (),
        )
        .await?
        .next()
        .await?
        .is_some();

    if !index_exists {
        if let Err(e) = conn
            .execute(
                "CREATE INDEX IF NOT EXISTS memory_entries_embedding_idx ON memory_entries(libsql_vector_idx(embedding))",
                (),
            )
            .await
        {
            tracing::warn!("Vector index creation failed for memory_entries (may already exist): {e}");
        }
    }

    Ok(())
}

use std::collections::BTreeMap;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;

use crate::db::connection::Database;
use crate::db::repository::EntryRepository;
use crate::db::schema;
use crate::db::traits::{DatabaseBackend, MaintenanceStore, MetadataStore, VectorStore};
use crate::db::MetadataRepository;
use crate::error::{FactbaseError, Result};
use crate::models::{EntryType, MemoryEntry, ScopeId, ScoredEntry};

pub struct LibSqlBackend {
    db: Database,
    timeout: Duration,
}

impl LibSqlBackend {
    pub fn new(db: Database, timeout: Duration) -> Self {
        Self { db, timeout }
    }

    /// Run a store operation under the configured deadline.
    async fn timed<T, F>(&self, operation: &'static str, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>> + Send,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(elapsed) => {
                tracing::warn!(operation, timeout_ms = self.timeout.as_millis() as u64, "Store call timed out");
                Err(elapsed.into())
            }
        }
    }

    fn check_vector(&self, vector: &[f32]) -> Result<()> {
        if vector.len() != self.db.dimensions() {
            return Err(FactbaseError::DimensionMismatch {
                expected: self.db.dimensions(),
                actual: vector.len(),
            });
        }
        Ok(())
    }

    fn check_entry(&self, scope: &ScopeId, entry: &MemoryEntry) -> Result<()> {
        if &entry.scope_id != scope {
            return Err(FactbaseError::TenantScopeViolation(format!(
                "entry {} is tagged with scope {} but written to {}",
                entry.id, entry.scope_id, scope
            )));
        }
        self.check_vector(&entry.vector)
    }
}

#[async_trait]
impl VectorStore for LibSqlBackend {
    async fn insert(&self, scope: &ScopeId, entries: &[MemoryEntry]) -> Result<Vec<String>> {
        for entry in entries {
            self.check_entry(scope, entry)?;
        }
        if entries.is_empty() {
            return Ok(Vec::new());
        }

        self.timed("insert", async {
            let conn = self.db.session().await?;
            let tx = conn.transaction().await?;
            for entry in entries {
                EntryRepository::insert(&tx, entry).await?;
            }
            tx.commit().await?;
            Ok(entries.iter().map(|e| e.id.clone()).collect())
        })
        .await
    }

    async fn query(
        &self,
        scope: &ScopeId,
        vector: &[f32],
        threshold: f32,
        top_k: usize,
        types: Option<&[EntryType]>,
    ) -> Result<Vec<ScoredEntry>> {
        self.check_vector(vector)?;
        self.timed("query", async {
            let conn = self.db.session().await?;
            EntryRepository::search_similar(&conn, scope, vector, threshold, top_k, types).await
        })
        .await
    }

    async fn delete(&self, scope: &ScopeId, ids: &[String]) -> Result<u64> {
        self.timed("delete", async {
            let conn = self.db.session().await?;
            EntryRepository::delete(&conn, scope, ids).await
        })
        .await
    }

    async fn delete_scope(&self, scope: &ScopeId) -> Result<u64> {
        self.timed("delete_scope", async {
            let conn = self.db.session().await?;
            EntryRepository::delete_scope(&conn, scope).await
        })
        .await
    }

    async fn apply_supersession(
        &self,
        scope: &ScopeId,
        new_entry: &MemoryEntry,
        superseded_ids: &[String],
    ) -> Result<()> {
        self.check_entry(scope, new_entry)?;
        self.timed("apply_supersession", async {
            let conn = self.db.session().await?;
            EntryRepository::apply_supersession(&conn, scope, new_entry, superseded_ids).await
        })
        .await
    }

    async fn get_entries(&self, scope: &ScopeId, ids: &[String]) -> Result<Vec<MemoryEntry>> {
        self.timed("get_entries", async {
            let conn = self.db.session().await?;
            EntryRepository::get_by_ids(&conn, scope, ids).await
        })
        .await
    }

    async fn list_current(&self, scope: &ScopeId) -> Result<Vec<MemoryEntry>> {
        self.timed("list_current", async {
            let conn = self.db.session().await?;
            EntryRepository::list_current(&conn, scope).await
        })
        .await
    }

    async fn count_by_type(&self, scope: &ScopeId) -> Result<(BTreeMap<EntryType, u64>, u64)> {
        self.timed("count_by_type", async {
            let conn = self.db.session().await?;
            EntryRepository::count_by_type(&conn, scope).await
        })
        .await
    }
}

#[async_trait]
impl MetadataStore for LibSqlBackend {
    async fn get_embedding_dimensions(&self) -> Result<Option<usize>> {
        let conn = self.db.connect()?;
        MetadataRepository::get_embedding_dimensions(&conn).await
    }
    async fn set_embedding_dimensions(&self, dims: usize) -> Result<()> {
        let conn = self.db.connect()?;
        MetadataRepository::set_embedding_dimensions(&conn, dims).await
    }
}

#[async_trait]
impl MaintenanceStore for LibSqlBackend {
    async fn list_all_texts(&self) -> Result<Vec<(String, String)>> {
        let conn = self.db.session().await?;
        EntryRepository::list_texts(&conn).await
    }

    async fn rebuild_vectors(&self, dims: usize, vectors: &[(String, Vec<f32>)]) -> Result<()> {
        if let Some((id, bad)) = vectors.iter().find(|(_, v)| v.len() != dims) {
            tracing::error!(entry_id = %id, "Re-embedded vector has the wrong width");
            return Err(FactbaseError::DimensionMismatch {
                expected: dims,
                actual: bad.len(),
            });
        }

        let conn = self.db.session().await?;
        let tx = conn.transaction().await?;
        schema::recreate_entries_table(&tx, dims).await?;
        for (id, vector) in vectors {
            EntryRepository::update_embedding(&tx, id, vector).await?;
        }
        MetadataRepository::set_embedding_dimensions(&tx, dims).await?;
        tx.commit().await?;

        schema::create_vector_index(&conn).await?;
        Ok(())
    }
}

#[async_trait]
impl DatabaseBackend for LibSqlBackend {
    async fn sync(&self) -> Result<()> {
        self.db.sync().await
    }

    fn dimensions(&self) -> usize {
        self.db.dimensions()
    }
}

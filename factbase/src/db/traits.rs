use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{EntryType, MemoryEntry, ScopeId, ScoredEntry};

/// Tenant-scoped storage of embedded entries.
///
/// Every method takes the scope explicitly. Implementations must never
/// return or touch a row owned by another scope; if one shows up anyway the
/// call fails with `TenantScopeViolation`.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert entries, all of which must carry `scope`. Returns their ids.
    async fn insert(&self, scope: &ScopeId, entries: &[MemoryEntry]) -> Result<Vec<String>>;

    /// Current entries with cosine similarity `>= threshold`, best first.
    async fn query(
        &self,
        scope: &ScopeId,
        vector: &[f32],
        threshold: f32,
        top_k: usize,
        types: Option<&[EntryType]>,
    ) -> Result<Vec<ScoredEntry>>;

    /// Delete by id. Fails without deleting anything if an id is foreign.
    async fn delete(&self, scope: &ScopeId, ids: &[String]) -> Result<u64>;

    async fn delete_scope(&self, scope: &ScopeId) -> Result<u64>;

    /// Insert `new_entry` and mark `superseded_ids` as superseded by it in
    /// one transaction.
    async fn apply_supersession(
        &self,
        scope: &ScopeId,
        new_entry: &MemoryEntry,
        superseded_ids: &[String],
    ) -> Result<()>;

    async fn get_entries(&self, scope: &ScopeId, ids: &[String]) -> Result<Vec<MemoryEntry>>;

    async fn list_current(&self, scope: &ScopeId) -> Result<Vec<MemoryEntry>>;

    /// Current entries per type, plus the number of superseded rows.
    async fn count_by_type(&self, scope: &ScopeId) -> Result<(BTreeMap<EntryType, u64>, u64)>;
}

/// Key-value metadata store (e.g. embedding dimensions).
#[async_trait]
pub trait MetadataStore: Send + Sync {
    async fn get_embedding_dimensions(&self) -> Result<Option<usize>>;
    async fn set_embedding_dimensions(&self, dims: usize) -> Result<()>;
}

/// Whole-database maintenance used by the dimension migration.
#[async_trait]
pub trait MaintenanceStore: Send + Sync {
    /// `(id, text)` for every row of every scope.
    async fn list_all_texts(&self) -> Result<Vec<(String, String)>>;

    /// Recreate the vector column at `dims` and store the given vectors.
    async fn rebuild_vectors(&self, dims: usize, vectors: &[(String, Vec<f32>)]) -> Result<()>;
}

/// A complete database backend that combines all store traits plus lifecycle
/// operations.
#[async_trait]
pub trait DatabaseBackend: VectorStore + MetadataStore + MaintenanceStore {
    /// Sync with remote (e.g. Turso replication). No-op for local-only backends.
    async fn sync(&self) -> Result<()>;

    /// Width of the stored vectors.
    fn dimensions(&self) -> usize;
}

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use libsql::{params, params_from_iter, Connection, Value};

use crate::error::{FactbaseError, Result};
use crate::models::{EntryType, MemoryEntry, ScopeId, ScoredEntry};

const COLUMNS: &str = "id, scope_id, text, entry_type, metadata, confidence, superseded_by, \
                       created_at, updated_at, vector_extract(embedding)";

pub struct EntryRepository;

impl EntryRepository {
    pub async fn insert(conn: &Connection, entry: &MemoryEntry) -> Result<()> {
        let embedding_json = serde_json::to_string(&entry.vector)?;

        conn.execute(
            r#"
            INSERT INTO memory_entries (
                id, scope_id, text, entry_type, metadata, confidence,
                superseded_by, embedding, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, vector32(?8), ?9, ?10)
            "#,
            params![
                entry.id.clone(),
                entry.scope_id.as_str(),
                entry.text.clone(),
                entry.entry_type.to_string(),
                serde_json::to_string(&entry.metadata)?,
                entry.confidence as f64,
                entry.superseded_by.clone(),
                embedding_json,
                entry.created_at.to_rfc3339(),
                entry.updated_at.to_rfc3339(),
            ],
        )
        .await?;

        Ok(())
    }

    /// Nearest current entries of `scope` at or above `threshold`, best first.
    pub async fn search_similar(
        conn: &Connection,
        scope: &ScopeId,
        embedding: &[f32],
        threshold: f32,
        limit: usize,
        types: Option<&[EntryType]>,
    ) -> Result<Vec<ScoredEntry>> {
        let embedding_json = serde_json::to_string(embedding)?;

        let mut values: Vec<Value> = vec![
            Value::from(embedding_json),
            Value::from(scope.as_str().to_string()),
            Value::from(threshold as f64),
            Value::from(limit as i64),
        ];

        let type_filter = match types.filter(|t| !t.is_empty()) {
            Some(types) => {
                let placeholders: Vec<String> = (0..types.len())
                    .map(|i| format!("?{}", i + 5))
                    .collect();
                values.extend(types.iter().map(|t| Value::from(t.to_string())));
                format!("AND entry_type IN ({})", placeholders.join(", "))
            }
            None => String::new(),
        };

        let sql = format!(
            r#"
            SELECT {COLUMNS},
                   1 - vector_distance_cos(embedding, vector32(?1)) AS score
            FROM memory_entries
            WHERE scope_id = ?2
              AND superseded_by IS NULL
              AND embedding IS NOT NULL
              AND (1 - vector_distance_cos(embedding, vector32(?1))) >= ?3
              {type_filter}
            ORDER BY score DESC
            LIMIT ?4
            "#
        );

        let mut rows = conn.query(&sql, params_from_iter(values)).await?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await? {
            let entry = Self::row_to_entry(&row)?;
            ensure_scope(scope, &entry)?;
            let similarity = row.get::<f64>(10)? as f32;
            results.push(ScoredEntry { entry, similarity });
        }

        Ok(results)
    }

    pub async fn get_by_ids(
        conn: &Connection,
        scope: &ScopeId,
        ids: &[String],
    ) -> Result<Vec<MemoryEntry>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders: Vec<String> = (0..ids.len()).map(|i| format!("?{}", i + 2)).collect();
        let sql = format!(
            "SELECT {COLUMNS} FROM memory_entries WHERE scope_id = ?1 AND id IN ({})",
            placeholders.join(", ")
        );

        let mut values = vec![Value::from(scope.as_str().to_string())];
        values.extend(ids.iter().map(|id| Value::from(id.clone())));

        let mut rows = conn.query(&sql, params_from_iter(values)).await?;
        let mut entries = Vec::new();
        while let Some(row) = rows.next().await? {
            let entry = Self::row_to_entry(&row)?;
            ensure_scope(scope, &entry)?;
            entries.push(entry);
        }
        Ok(entries)
    }

    pub async fn list_current(conn: &Connection, scope: &ScopeId) -> Result<Vec<MemoryEntry>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM memory_entries
             WHERE scope_id = ?1 AND superseded_by IS NULL
             ORDER BY created_at ASC"
        );

        let mut rows = conn.query(&sql, params![scope.as_str()]).await?;
        let mut entries = Vec::new();
        while let Some(row) = rows.next().await? {
            let entry = Self::row_to_entry(&row)?;
            ensure_scope(scope, &entry)?;
            entries.push(entry);
        }
        Ok(entries)
    }

    /// Owner scope for each id that exists, regardless of scope.
    async fn owners(conn: &Connection, ids: &[String]) -> Result<Vec<(String, String, bool)>> {
        let placeholders: Vec<String> = (0..ids.len()).map(|i| format!("?{}", i + 1)).collect();
        let sql = format!(
            "SELECT id, scope_id, superseded_by IS NULL FROM memory_entries WHERE id IN ({})",
            placeholders.join(", ")
        );
        let values: Vec<Value> = ids.iter().map(|id| Value::from(id.clone())).collect();

        let mut rows = conn.query(&sql, params_from_iter(values)).await?;
        let mut owners = Vec::new();
        while let Some(row) = rows.next().await? {
            owners.push((
                row.get::<String>(0)?,
                row.get::<String>(1)?,
                row.get::<i64>(2)? != 0,
            ));
        }
        Ok(owners)
    }

    /// Fail if any id belongs to a different scope.
    async fn ensure_owned(conn: &Connection, scope: &ScopeId, ids: &[String]) -> Result<Vec<(String, bool)>> {
        let owners = Self::owners(conn, ids).await?;
        if let Some((id, owner, _)) = owners.iter().find(|(_, owner, _)| owner != scope.as_str()) {
            tracing::error!(
                scope_id = %scope,
                entry_id = %id,
                owner_scope = %owner,
                "Cross-scope access attempt"
            );
            return Err(FactbaseError::TenantScopeViolation(format!(
                "entry {id} does not belong to scope {scope}"
            )));
        }
        Ok(owners
            .into_iter()
            .map(|(id, _, current)| (id, current))
            .collect())
    }

    /// Delete entries by id. Nothing is deleted if any id belongs elsewhere.
    pub async fn delete(conn: &Connection, scope: &ScopeId, ids: &[String]) -> Result<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let tx = conn.transaction().await?;
        Self::ensure_owned(&tx, scope, ids).await?;

        let placeholders: Vec<String> = (0..ids.len()).map(|i| format!("?{}", i + 2)).collect();
        let sql = format!(
            "DELETE FROM memory_entries WHERE scope_id = ?1 AND id IN ({})",
            placeholders.join(", ")
        );
        let mut values = vec![Value::from(scope.as_str().to_string())];
        values.extend(ids.iter().map(|id| Value::from(id.clone())));

        let deleted = tx.execute(&sql, params_from_iter(values)).await?;
        tx.commit().await?;
        Ok(deleted)
    }

    pub async fn delete_scope(conn: &Connection, scope: &ScopeId) -> Result<u64> {
        let deleted = conn
            .execute(
                "DELETE FROM memory_entries WHERE scope_id = ?1",
                params![scope.as_str()],
            )
            .await?;
        Ok(deleted)
    }

    /// Insert `new_entry` and point every superseded id at it, atomically.
    pub async fn apply_supersession(
        conn: &Connection,
        scope: &ScopeId,
        new_entry: &MemoryEntry,
        superseded_ids: &[String],
    ) -> Result<()> {
        let tx = conn.transaction().await?;

        if !superseded_ids.is_empty() {
            let owned = Self::ensure_owned(&tx, scope, superseded_ids).await?;

            let found: HashSet<&str> = owned.iter().map(|(id, _)| id.as_str()).collect();
            if let Some(missing) = superseded_ids.iter().find(|id| !found.contains(id.as_str())) {
                return Err(FactbaseError::NotFound(format!("entry {missing}")));
            }
            if let Some((stale, _)) = owned.iter().find(|(_, current)| !current) {
                return Err(FactbaseError::Validation(format!(
                    "entry {stale} is already superseded"
                )));
            }
        }

        Self::insert(&tx, new_entry).await?;

        let now = Utc::now().to_rfc3339();
        for id in superseded_ids {
            tx.execute(
                "UPDATE memory_entries SET superseded_by = ?1, updated_at = ?2
                 WHERE id = ?3 AND scope_id = ?4 AND superseded_by IS NULL",
                params![new_entry.id.clone(), now.clone(), id.clone(), scope.as_str()],
            )
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    pub async fn count_by_type(
        conn: &Connection,
        scope: &ScopeId,
    ) -> Result<(BTreeMap<EntryType, u64>, u64)> {
        let mut rows = conn
            .query(
                "SELECT entry_type, COUNT(*) FROM memory_entries
                 WHERE scope_id = ?1 AND superseded_by IS NULL
                 GROUP BY entry_type",
                params![scope.as_str()],
            )
            .await?;

        let mut by_type = BTreeMap::new();
        while let Some(row) = rows.next().await? {
            let entry_type = parse_entry_type(&row.get::<String>(0)?)?;
            *by_type.entry(entry_type).or_insert(0) += row.get::<i64>(1)? as u64;
        }

        let mut rows = conn
            .query(
                "SELECT COUNT(*) FROM memory_entries WHERE scope_id = ?1 AND superseded_by IS NOT NULL",
                params![scope.as_str()],
            )
            .await?;
        let superseded = match rows.next().await? {
            Some(row) => row.get::<i64>(0)? as u64,
            None => 0,
        };

        Ok((by_type, superseded))
    }

    /// `(id, text)` of every row in every scope, for re-embedding.
    pub async fn list_texts(conn: &Connection) -> Result<Vec<(String, String)>> {
        let mut rows = conn
            .query("SELECT id, text FROM memory_entries ORDER BY id", ())
            .await?;
        let mut texts = Vec::new();
        while let Some(row) = rows.next().await? {
            texts.push((row.get::<String>(0)?, row.get::<String>(1)?));
        }
        Ok(texts)
    }

    pub async fn update_embedding(conn: &Connection, id: &str, embedding: &[f32]) -> Result<()> {
        let embedding_json = serde_json::to_string(embedding)?;
        conn.execute(
            "UPDATE memory_entries SET embedding = vector32(?2) WHERE id = ?1",
            params![id, embedding_json],
        )
        .await?;
        Ok(())
    }

    pub fn row_to_entry(row: &libsql::Row) -> Result<MemoryEntry> {
        let scope_raw: String = row.get(1)?;
        let scope_id = ScopeId::new(scope_raw).map_err(|e| {
            FactbaseError::TenantScopeViolation(format!("stored row has invalid scope: {e}"))
        })?;

        let vector = match row.get::<Option<String>>(9)? {
            Some(raw) => serde_json::from_str(&raw)?,
            None => Vec::new(),
        };

        let id: String = row.get(0)?;
        let metadata = serde_json::from_str(&row.get::<String>(4)?).map_err(|e| {
            FactbaseError::CorruptRow(format!("entry {id} has invalid metadata: {e}"))
        })?;

        Ok(MemoryEntry {
            scope_id,
            text: row.get(2)?,
            entry_type: parse_entry_type(&row.get::<String>(3)?)?,
            metadata,
            confidence: row.get::<f64>(5)? as f32,
            superseded_by: row.get(6)?,
            vector,
            created_at: parse_timestamp(&row.get::<String>(7)?)?,
            updated_at: parse_timestamp(&row.get::<String>(8)?)?,
            id,
        })
    }
}

fn parse_entry_type(raw: &str) -> Result<EntryType> {
    raw.parse()
        .map_err(|e: String| FactbaseError::CorruptRow(format!("invalid entry type: {e}")))
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| FactbaseError::CorruptRow(format!("invalid timestamp {raw:?}: {e}")))
}

fn ensure_scope(scope: &ScopeId, entry: &MemoryEntry) -> Result<()> {
    if &entry.scope_id != scope {
        tracing::error!(
            scope_id = %scope,
            entry_id = %entry.id,
            owner_scope = %entry.scope_id,
            "Store returned a row from another scope"
        );
        return Err(FactbaseError::TenantScopeViolation(format!(
            "entry {} belongs to another scope",
            entry.id
        )));
    }
    Ok(())
}

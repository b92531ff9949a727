use libsql::{Builder, Connection};
use std::sync::Arc;

use crate::config::DatabaseConfig;
use crate::error::Result;

use super::schema;

/// SQLite pragmas applied to every connection, read from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Pragmas {
    pub busy_timeout_ms: u64,
    pub journal_mode: &'static str,
    pub synchronous: &'static str,
}

impl Pragmas {
    fn from_env() -> Self {
        let busy_timeout_ms = std::env::var("DATABASE_BUSY_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(5000);
        let journal_mode = std::env::var("DATABASE_JOURNAL_MODE")
            .map(|v| normalize_journal_mode(&v))
            .unwrap_or("WAL");
        let synchronous = std::env::var("DATABASE_SYNCHRONOUS")
            .map(|v| normalize_synchronous(&v))
            .unwrap_or("NORMAL");

        Self {
            busy_timeout_ms,
            journal_mode,
            synchronous,
        }
    }
}

/// Where the entries live, derived from `DATABASE_URL`.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Location<'a> {
    Remote { url: &'a str },
    Replica { url: &'a str, local_path: &'a str },
    Local { path: &'a str },
}

impl<'a> Location<'a> {
    fn of(config: &'a DatabaseConfig) -> Self {
        let url = config.url.as_str();
        if url.starts_with("libsql://") || url.starts_with("https://") {
            return match config.local_path.as_deref() {
                Some(local_path) => Self::Replica { url, local_path },
                None => Self::Remote { url },
            };
        }
        Self::Local {
            path: url.strip_prefix("file:").unwrap_or(url),
        }
    }
}

/// Handle to the libsql database holding every scope's entries.
#[derive(Clone)]
pub struct Database {
    pub(crate) db: Arc<libsql::Database>,
    pub(crate) dimensions: usize,
    pragmas: Pragmas,
}

impl Database {
    pub async fn new(config: &DatabaseConfig, dimensions: usize) -> Result<Self> {
        let token = config.auth_token.clone().unwrap_or_default();
        let location = Location::of(config);
        tracing::debug!(?location, "Opening database");

        let db = match location {
            Location::Replica { url, local_path } => {
                Builder::new_remote_replica(local_path, url.to_string(), token)
                    .build()
                    .await?
            }
            Location::Remote { url } => Builder::new_remote(url.to_string(), token).build().await?,
            Location::Local { path } => Builder::new_local(path).build().await?,
        };

        let database = Self {
            db: Arc::new(db),
            dimensions,
            pragmas: Pragmas::from_env(),
        };
        database.configure_database().await?;
        database.init_schema().await?;

        Ok(database)
    }

    pub fn connect(&self) -> Result<Connection> {
        Ok(self.db.connect()?)
    }

    /// A fresh connection with the per-connection busy timeout applied.
    pub async fn session(&self) -> Result<Connection> {
        let conn = self.connect()?;
        let busy_timeout_sql = format!("PRAGMA busy_timeout = {}", self.pragmas.busy_timeout_ms);
        if let Err(error) = conn.execute_batch(&busy_timeout_sql).await {
            tracing::debug!(error = %error, "busy_timeout not applied to connection");
        }
        Ok(conn)
    }

    async fn configure_database(&self) -> Result<()> {
        let conn = self.connect()?;
        let pragmas = [
            ("busy_timeout", self.pragmas.busy_timeout_ms.to_string()),
            ("journal_mode", self.pragmas.journal_mode.to_string()),
            ("synchronous", self.pragmas.synchronous.to_string()),
        ];

        for (pragma, value) in pragmas {
            if let Err(error) = conn.execute_batch(&format!("PRAGMA {pragma} = {value}")).await {
                tracing::warn!(pragma, %value, %error, "Failed to apply SQLite pragma");
            }
        }
        Ok(())
    }

    async fn init_schema(&self) -> Result<()> {
        let conn = self.connect()?;
        schema::init_schema(&conn, self.dimensions).await?;
        Ok(())
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub async fn sync(&self) -> Result<()> {
        // Local files have nothing to sync; only replicas report progress
        match self.db.sync().await {
            Ok(replicated) => tracing::debug!(?replicated, "Replica synced"),
            Err(error) => tracing::trace!(%error, "Sync skipped"),
        }
        Ok(())
    }
}

fn normalize_journal_mode(value: &str) -> &'static str {
    match value.trim().to_uppercase().as_str() {
        "DELETE" => "DELETE",
        "TRUNCATE" => "TRUNCATE",
        "PERSIST" => "PERSIST",
        "MEMORY" => "MEMORY",
        "WAL" => "WAL",
        "OFF" => "OFF",
        _ => "WAL",
    }
}

fn normalize_synchronous(value: &str) -> &'static str {
    match value.trim().to_uppercase().as_str() {
        "OFF" => "OFF",
        "NORMAL" => "NORMAL",
        "FULL" => "FULL",
        "EXTRA" => "EXTRA",
        _ => "NORMAL",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(url: &str, local_path: Option<&str>) -> DatabaseConfig {
        DatabaseConfig {
            url: url.to_string(),
            auth_token: None,
            local_path: local_path.map(str::to_string),
            timeout_secs: 5,
        }
    }

    #[test]
    fn test_location_from_url() {
        let local = config("file:data/factbase.db", None);
        assert_eq!(Location::of(&local), Location::Local { path: "data/factbase.db" });

        let memory = config(":memory:", None);
        assert_eq!(Location::of(&memory), Location::Local { path: ":memory:" });

        let remote = config("libsql://acme.turso.io", None);
        assert_eq!(
            Location::of(&remote),
            Location::Remote { url: "libsql://acme.turso.io" }
        );

        let replica = config("https://acme.turso.io", Some("replica.db"));
        assert_eq!(
            Location::of(&replica),
            Location::Replica {
                url: "https://acme.turso.io",
                local_path: "replica.db"
            }
        );
    }

    #[test]
    fn test_normalize_pragmas() {
        assert_eq!(normalize_journal_mode("delete"), "DELETE");
        assert_eq!(normalize_journal_mode("bogus"), "WAL");
        assert_eq!(normalize_synchronous(" full "), "FULL");
        assert_eq!(normalize_synchronous(""), "NORMAL");
    }

    #[tokio::test]
    async fn test_file_database_initializes_schema() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = DatabaseConfig {
            url: format!("file:{}", dir.path().join("schema.db").display()),
            auth_token: None,
            local_path: None,
            timeout_secs: 5,
        };
        let db = Database::new(&config, 8).await.unwrap();
        assert_eq!(db.dimensions(), 8);

        let conn = db.connect().unwrap();
        let mut rows = conn
            .query(
                "SELECT 1 FROM sqlite_master WHERE type='table' AND name='memory_entries'",
                (),
            )
            .await
            .unwrap();
        assert!(rows.next().await.unwrap().is_some());
    }
}

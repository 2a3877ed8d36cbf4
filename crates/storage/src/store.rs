//! SQLite store with disposition-aware batch writes.

use std::path::{Path, PathBuf};

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::{debug, info, warn};

use comfort_common::{ComfortError, ComfortResult};

use crate::record::{
    create_table_sql, dedupe_sql, insert_sql, key_index_name, key_index_sql, Disposition, Record,
};
use crate::store_err;

/// One embedded database file.
///
/// The write pool holds a single connection, so a store has exactly one
/// writer.
#[derive(Debug, Clone)]
pub struct Store {
    pub(crate) pool: SqlitePool,
    path: Option<PathBuf>,
}

impl Store {
    /// Open or create the database at the given path.
    pub async fn open(path: &Path) -> ComfortResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| ComfortError::Store(format!("Failed to create {}: {}", parent.display(), e)))?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(store_err("Open failed"))?;

        info!(path = %path.display(), "Opened store");

        Ok(Self {
            pool,
            path: Some(path.to_path_buf()),
        })
    }

    /// Open an in-memory database (for testing).
    pub async fn open_memory() -> ComfortResult<Self> {
        let options = SqliteConnectOptions::new()
            .filename(":memory:")
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(store_err("Open failed"))?;

        Ok(Self { pool, path: None })
    }

    /// Attach a second, existing store for reading only.
    ///
    /// The connection itself is opened read-only, and the returned handle
    /// exposes no write operations.
    pub async fn open_read_only(path: &Path) -> ComfortResult<RawStoreReader> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .read_only(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(2)
            .connect_with(options)
            .await
            .map_err(|e| ComfortError::Store(format!("Attach of {} failed: {}", path.display(), e)))?;

        info!(path = %path.display(), "Attached read-only store");

        Ok(RawStoreReader {
            store: Self {
                pool,
                path: Some(path.to_path_buf()),
            },
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Write a batch to `table` under `disposition`.
    ///
    /// The whole batch runs in one transaction; on any failure nothing from
    /// it is visible and the table keeps its previous contents. An empty batch
    /// is a no-op: no table is created or dropped. Returns rows written.
    pub async fn write<R: Record>(
        &self,
        table: &str,
        records: &[R],
        disposition: Disposition,
    ) -> ComfortResult<u64> {
        validate_table_name(table)?;

        if records.is_empty() {
            info!(table = %table, disposition = %disposition, "Empty batch, nothing written");
            return Ok(0);
        }

        if disposition == Disposition::UpsertByKey && R::key().is_empty() {
            return Err(ComfortError::InvalidConfig(format!(
                "{} records have no key to upsert on",
                table
            )));
        }

        let mut tx = self.pool.begin().await.map_err(store_err("Begin failed"))?;

        if disposition == Disposition::ReplaceAll {
            sqlx::query(&format!("DROP TABLE IF EXISTS {}", table))
                .execute(&mut *tx)
                .await
                .map_err(store_err("Drop failed"))?;
        }

        sqlx::query(&create_table_sql::<R>(table))
            .execute(&mut *tx)
            .await
            .map_err(store_err("Create failed"))?;

        if disposition == Disposition::UpsertByKey {
            let indexed: (i64,) =
                sqlx::query_as("SELECT COUNT(*) FROM sqlite_master WHERE type = 'index' AND name = ?")
                    .bind(key_index_name(table))
                    .fetch_one(&mut *tx)
                    .await
                    .map_err(store_err("Lookup failed"))?;

            // A table previously written with Append may hold duplicate keys.
            if indexed.0 == 0 {
                let removed = sqlx::query(&dedupe_sql::<R>(table))
                    .execute(&mut *tx)
                    .await
                    .map_err(store_err("Dedupe failed"))?
                    .rows_affected();
                if removed > 0 {
                    warn!(table = %table, removed = removed, "Dropped duplicate keys before indexing");
                }
            }

            sqlx::query(&key_index_sql::<R>(table))
                .execute(&mut *tx)
                .await
                .map_err(store_err("Key index failed"))?;
        }

        let sql = insert_sql::<R>(table, disposition);
        let mut written = 0u64;
        for record in records {
            let result = record
                .bind(sqlx::query(&sql))
                .execute(&mut *tx)
                .await
                .map_err(store_err("Insert failed"))?;
            written += result.rows_affected();
        }

        tx.commit().await.map_err(store_err("Commit failed"))?;

        debug!(
            table = %table,
            disposition = %disposition,
            records = records.len(),
            rows = written,
            "Wrote batch"
        );

        Ok(written)
    }
}

/// Read-only handle onto another store.
///
/// Handed to the scoring phase so it can read raw observations without being
/// able to modify them.
#[derive(Debug, Clone)]
pub struct RawStoreReader {
    pub(crate) store: Store,
}

impl RawStoreReader {
    pub fn path(&self) -> Option<&Path> {
        self.store.path()
    }
}

/// Table names are interpolated into SQL, so only plain identifiers pass.
pub fn validate_table_name(table: &str) -> ComfortResult<()> {
    let mut chars = table.chars();
    let valid = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');

    if valid {
        Ok(())
    } else {
        Err(ComfortError::InvalidConfig(format!(
            "invalid table name '{}'",
            table
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_names() {
        assert!(validate_table_name("weather_realtime").is_ok());
        assert!(validate_table_name("_scratch2").is_ok());
        assert!(validate_table_name("").is_err());
        assert!(validate_table_name("2fast").is_err());
        assert!(validate_table_name("scores; DROP TABLE x").is_err());
        assert!(validate_table_name("weather.realtime").is_err());
    }
}

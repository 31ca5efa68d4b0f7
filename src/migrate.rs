//! Idempotent schema setup for the SQLite backend.
//!
//! Safe to run on every process start: tables and indexes use
//! `IF NOT EXISTS`, columns added after the first release are added only
//! when `PRAGMA table_info` shows them missing, and a concurrent "duplicate
//! column" failure is treated as already done.

use sqlx::{Row, SqlitePool};
use tracing::info;

use chunkvec_core::store::check_same_dims;
use chunkvec_core::{Error, Result};

use crate::sqlite_store::storage_err;

const DIMS_KEY: &str = "dimensionality";

/// Columns that older `embeddings` tables may lack, with their definitions.
const ADDITIVE_COLUMNS: &[(&str, &str)] = &[("filename", "TEXT"), ("chunk_number", "INTEGER")];

/// Ensure the schema exists for `dims`-length vectors.
///
/// # Errors
///
/// [`Error::SchemaError`] if the database already records (or, for a table
/// created before the dimensionality was recorded, already holds) vectors
/// of a different length. [`Error::StorageIo`] on database failures.
pub async fn ensure_schema(pool: &SqlitePool, dims: usize) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS embeddings (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            text TEXT NOT NULL,
            embedding TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
            filename TEXT,
            chunk_number INTEGER
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(storage_err)?;

    add_missing_columns(pool).await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_embeddings_created_at ON embeddings(created_at DESC, id DESC)",
    )
    .execute(pool)
    .await
    .map_err(storage_err)?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS store_meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(storage_err)?;

    if let Some(recorded) = recorded_dims(pool).await? {
        return check_same_dims(recorded, dims);
    }

    // Tables from before the dimensionality was recorded: trust the data.
    let existing: Option<i64> =
        sqlx::query_scalar("SELECT json_array_length(embedding) FROM embeddings ORDER BY id LIMIT 1")
            .fetch_optional(pool)
            .await
            .map_err(storage_err)?;
    if let Some(len) = existing {
        check_same_dims(usize::try_from(len).unwrap_or(0), dims)?;
    }

    sqlx::query("INSERT OR IGNORE INTO store_meta (key, value) VALUES (?, ?)")
        .bind(DIMS_KEY)
        .bind(dims.to_string())
        .execute(pool)
        .await
        .map_err(storage_err)?;

    // Another process may have won the race with a different value.
    match recorded_dims(pool).await? {
        Some(recorded) => check_same_dims(recorded, dims),
        None => Err(Error::SchemaError(
            "dimensionality was not recorded".to_string(),
        )),
    }
}

/// Read the recorded dimensionality, if any.
pub async fn recorded_dims(pool: &SqlitePool) -> Result<Option<usize>> {
    let value: Option<String> = sqlx::query_scalar("SELECT value FROM store_meta WHERE key = ?")
        .bind(DIMS_KEY)
        .fetch_optional(pool)
        .await
        .map_err(storage_err)?;

    value
        .map(|v| {
            v.parse::<usize>()
                .map_err(|_| Error::SchemaError(format!("corrupt dimensionality value: '{}'", v)))
        })
        .transpose()
}

async fn add_missing_columns(pool: &SqlitePool) -> Result<()> {
    let rows = sqlx::query("PRAGMA table_info(embeddings)")
        .fetch_all(pool)
        .await
        .map_err(storage_err)?;
    let present: Vec<String> = rows.iter().map(|r| r.get::<String, _>("name")).collect();

    for (name, ty) in ADDITIVE_COLUMNS {
        if present.iter().any(|p| p == name) {
            continue;
        }
        let ddl = format!("ALTER TABLE embeddings ADD COLUMN {} {}", name, ty);
        match sqlx::query(&ddl).execute(pool).await {
            Ok(_) => info!(column = name, "added column to embeddings"),
            Err(e) if e.to_string().contains("duplicate column") => {}
            Err(e) => return Err(storage_err(e)),
        }
    }
    Ok(())
}

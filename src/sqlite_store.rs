//! SQLite-backed [`VectorStore`] implementation.
//!
//! Records live in a single `embeddings` table keyed by an
//! `AUTOINCREMENT` id, so ids are assigned atomically by SQLite and never
//! reused. Each vector is stored as a JSON array of its components widened
//! to `f64`, which lets the ranking happen inside SQLite: `search` computes
//! the squared L2 distance over `json_each` of the stored and query
//! vectors and orders by `distance, id`, the same order the in-memory index
//! produces.
//!
//! Every method runs a single statement against the pool; the connection
//! is released when the statement future completes or is dropped.

use std::sync::OnceLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use chunkvec_core::models::{Provenance, ScoredRecord, VectorRecord};
use chunkvec_core::store::{
    check_same_dims, require_dims, validate_dims, validate_insert, validate_search, VectorStore,
};
use chunkvec_core::{Error, Result};

use crate::migrate;

/// Map a database failure into the storage error variant.
pub(crate) fn storage_err(err: sqlx::Error) -> Error {
    Error::StorageIo(err.to_string())
}

/// Encode a vector as a JSON array of `f64` components.
///
/// # Example
///
/// ```rust
/// use chunkvec::sqlite_store::{json_to_vec, vec_to_json};
///
/// let v = vec![1.0f32, -2.5, 0.1];
/// let json = vec_to_json(&v);
/// assert!(json.starts_with("[1.0,-2.5,0.10000000149"));
/// assert_eq!(json_to_vec(&json).unwrap(), v);
/// ```
pub fn vec_to_json(vector: &[f32]) -> String {
    let widened: Vec<f64> = vector.iter().map(|&v| f64::from(v)).collect();
    serde_json::Value::from(widened).to_string()
}

/// Decode a JSON array written by [`vec_to_json`].
pub fn json_to_vec(json: &str) -> Result<Vec<f32>> {
    let widened: Vec<f64> = serde_json::from_str(json)
        .map_err(|e| Error::StorageIo(format!("corrupt embedding column: {}", e)))?;
    Ok(widened.into_iter().map(|v| v as f32).collect())
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::StorageIo(format!("corrupt created_at '{}': {}", raw, e)))
}

fn row_to_record(row: &SqliteRow) -> Result<VectorRecord> {
    let embedding: String = row.try_get("embedding").map_err(storage_err)?;
    let created_at: String = row.try_get("created_at").map_err(storage_err)?;
    Ok(VectorRecord {
        id: row.try_get("id").map_err(storage_err)?,
        text: row.try_get("text").map_err(storage_err)?,
        vector: json_to_vec(&embedding)?,
        filename: row.try_get("filename").map_err(storage_err)?,
        chunk_number: row.try_get("chunk_number").map_err(storage_err)?,
        created_at: parse_timestamp(&created_at)?,
    })
}

/// SQLite implementation of the [`VectorStore`] trait.
///
/// Wraps a [`SqlitePool`]; the dimensionality is fixed by the first
/// successful [`initialize`](VectorStore::initialize).
pub struct SqliteStore {
    pool: SqlitePool,
    dims: OnceLock<usize>,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            dims: OnceLock::new(),
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl VectorStore for SqliteStore {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    fn dims(&self) -> Option<usize> {
        self.dims.get().copied()
    }

    async fn initialize(&self, dims: usize) -> Result<()> {
        validate_dims(dims)?;
        if let Some(existing) = self.dims.get() {
            return check_same_dims(*existing, dims);
        }
        migrate::ensure_schema(&self.pool, dims).await?;
        let fixed = *self.dims.get_or_init(|| dims);
        check_same_dims(fixed, dims)
    }

    async fn insert(
        &self,
        text: &str,
        vector: &[f32],
        provenance: Option<&Provenance>,
    ) -> Result<i64> {
        let dims = require_dims(self.dims())?;
        validate_insert(dims, text, vector)?;

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO embeddings (text, embedding, created_at, filename, chunk_number)
            VALUES (
                ?, ?,
                MAX(strftime('%Y-%m-%dT%H:%M:%fZ', 'now'),
                    COALESCE((SELECT MAX(created_at) FROM embeddings), '')),
                ?, ?
            )
            RETURNING id
            "#,
        )
        .bind(text)
        .bind(vec_to_json(vector))
        .bind(provenance.map(|p| p.filename.as_str()))
        .bind(provenance.map(|p| p.chunk_number))
        .fetch_one(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(id)
    }

    async fn search(&self, query: &[f32], k: i64) -> Result<Vec<ScoredRecord>> {
        let dims = require_dims(self.dims())?;
        let k = validate_search(dims, query, k)?;
        let limit = i64::try_from(k).unwrap_or(i64::MAX);

        let rows = sqlx::query(
            r#"
            SELECT e.id, e.text, e.embedding, e.created_at, e.filename, e.chunk_number,
                   (SELECT CAST(SUM(t.term) AS REAL)
                      FROM (SELECT (s.value - q.value) * (s.value - q.value) AS term
                              FROM json_each(e.embedding) AS s
                              JOIN json_each(?1) AS q ON q.key = s.key
                             ORDER BY s.key) AS t) AS distance
            FROM embeddings e
            ORDER BY distance ASC, e.id ASC
            LIMIT ?2
            "#,
        )
        .bind(vec_to_json(query))
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)?;

        rows.iter()
            .map(|row| {
                let distance: f64 = row.try_get("distance").map_err(storage_err)?;
                Ok(ScoredRecord {
                    record: row_to_record(row)?,
                    distance,
                })
            })
            .collect()
    }

    async fn list_all(&self) -> Result<Vec<VectorRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, text, embedding, created_at, filename, chunk_number
            FROM embeddings
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)?;

        rows.iter().map(row_to_record).collect()
    }

    async fn count(&self) -> Result<usize> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM embeddings")
            .fetch_one(&self.pool)
            .await
            .map_err(storage_err)?;
        Ok(usize::try_from(n).unwrap_or(0))
    }
}

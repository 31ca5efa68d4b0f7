//! In-memory flat [`VectorStore`] implementation.
//!
//! Vectors live in one dense row-major `Vec<f32>` with a parallel `Vec` of
//! row metadata, both behind a single `std::sync::RwLock`. Inserts take the
//! write lock only to append the row and assign the id; searches share the
//! read lock and scan every row (exact squared L2, no approximate index),
//! then keep the k best with a partial sort.
//!
//! Contents live for the lifetime of the store value.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::embedding::squared_l2;
use crate::error::{Error, Result};
use crate::models::{Provenance, ScoredRecord, VectorRecord};

use super::{
    check_same_dims, rank_order, require_dims, validate_dims, validate_insert, validate_search,
    VectorStore,
};

struct RowMeta {
    id: i64,
    text: String,
    filename: Option<String>,
    chunk_number: Option<i64>,
    created_at: DateTime<Utc>,
}

#[derive(Default)]
struct Inner {
    dims: Option<usize>,
    /// Row-major: row `i` occupies `data[i * dims .. (i + 1) * dims]`.
    data: Vec<f32>,
    rows: Vec<RowMeta>,
    last_id: i64,
}

impl Inner {
    fn row_vector(&self, dims: usize, row: usize) -> &[f32] {
        &self.data[row * dims..(row + 1) * dims]
    }

    fn record(&self, dims: usize, row: usize) -> VectorRecord {
        let meta = &self.rows[row];
        VectorRecord {
            id: meta.id,
            text: meta.text.clone(),
            vector: self.row_vector(dims, row).to_vec(),
            filename: meta.filename.clone(),
            chunk_number: meta.chunk_number,
            created_at: meta.created_at,
        }
    }
}

/// Volatile flat index; everything is lost when the value is dropped.
#[derive(Default)]
pub struct InMemoryStore {
    inner: RwLock<Inner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Inner>> {
        self.inner
            .read()
            .map_err(|_| Error::StorageIo("in-memory index lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Inner>> {
        self.inner
            .write()
            .map_err(|_| Error::StorageIo("in-memory index lock poisoned".to_string()))
    }
}

#[async_trait]
impl VectorStore for InMemoryStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    fn dims(&self) -> Option<usize> {
        self.inner.read().ok().and_then(|inner| inner.dims)
    }

    async fn initialize(&self, dims: usize) -> Result<()> {
        validate_dims(dims)?;
        let mut inner = self.write()?;
        match inner.dims {
            Some(existing) => check_same_dims(existing, dims),
            None => {
                inner.dims = Some(dims);
                Ok(())
            }
        }
    }

    async fn insert(
        &self,
        text: &str,
        vector: &[f32],
        provenance: Option<&Provenance>,
    ) -> Result<i64> {
        let dims = require_dims(self.dims())?;
        validate_insert(dims, text, vector)?;

        let text = text.to_string();
        let (filename, chunk_number) = match provenance {
            Some(p) => (Some(p.filename.clone()), Some(p.chunk_number)),
            None => (None, None),
        };

        let mut inner = self.write()?;
        let created_at = match inner.rows.last() {
            Some(last) => Utc::now().max(last.created_at),
            None => Utc::now(),
        };
        let id = inner.last_id + 1;
        inner.data.extend_from_slice(vector);
        inner.rows.push(RowMeta {
            id,
            text,
            filename,
            chunk_number,
            created_at,
        });
        inner.last_id = id;
        Ok(id)
    }

    async fn search(&self, query: &[f32], k: i64) -> Result<Vec<ScoredRecord>> {
        let inner = self.read()?;
        let dims = require_dims(inner.dims)?;
        let k = validate_search(dims, query, k)?;

        let mut scored: Vec<(f64, usize)> = (0..inner.rows.len())
            .map(|row| (squared_l2(query, inner.row_vector(dims, row)), row))
            .collect();

        let cmp = |a: &(f64, usize), b: &(f64, usize)| {
            rank_order(a.0, inner.rows[a.1].id, b.0, inner.rows[b.1].id)
        };
        if k < scored.len() {
            scored.select_nth_unstable_by(k - 1, cmp);
            scored.truncate(k);
        }
        scored.sort_by(cmp);

        Ok(scored
            .into_iter()
            .map(|(distance, row)| ScoredRecord {
                record: inner.record(dims, row),
                distance,
            })
            .collect())
    }

    async fn list_all(&self) -> Result<Vec<VectorRecord>> {
        let inner = self.read()?;
        let Some(dims) = inner.dims else {
            return Ok(Vec::new());
        };
        let mut records: Vec<VectorRecord> = (0..inner.rows.len())
            .map(|row| inner.record(dims, row))
            .collect();
        records.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(records)
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.read()?.rows.len())
    }
}

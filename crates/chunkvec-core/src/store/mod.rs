//! Storage abstraction for chunkvec.
//!
//! The [`VectorStore`] trait defines the insert/search/list contract that
//! the ingestion pipeline and query engine run against. Two backends
//! implement it: the in-process flat index in [`memory`] and the durable
//! SQLite store in the app crate. Nothing downstream branches on which
//! one is active.
//!
//! Both backends run the validation helpers in this module before touching
//! storage, so error precedence and ranking order are identical.
//!
//! Implementations must be `Send + Sync` to be shared across request
//! workers.

pub mod memory;

use std::cmp::Ordering;

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::models::{Provenance, ScoredRecord, VectorRecord};

/// Abstract vector storage backend.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`initialize`](VectorStore::initialize) | Create storage for a dimensionality (idempotent) |
/// | [`insert`](VectorStore::insert) | Append one record, returning its new `id` |
/// | [`search`](VectorStore::search) | k nearest records by squared L2, ties by `id` |
/// | [`list_all`](VectorStore::list_all) | Every record, newest first |
/// | [`count`](VectorStore::count) | Number of stored records |
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Short backend identifier (`"memory"`, `"sqlite"`).
    fn backend_name(&self) -> &'static str;

    /// Dimensionality fixed by [`initialize`](VectorStore::initialize), if any.
    fn dims(&self) -> Option<usize>;

    /// Create the underlying storage for `dims`-length vectors.
    ///
    /// Calling it again with the same `dims` is a no-op. Fails with
    /// [`Error::SchemaError`] if the store already holds a different
    /// dimensionality.
    async fn initialize(&self, dims: usize) -> Result<()>;

    /// Store one record. The record is visible to searches as soon as this
    /// returns.
    async fn insert(
        &self,
        text: &str,
        vector: &[f32],
        provenance: Option<&Provenance>,
    ) -> Result<i64>;

    /// Return at most `k` records ordered by ascending squared L2 distance
    /// to `query`, ties broken by ascending `id`.
    async fn search(&self, query: &[f32], k: i64) -> Result<Vec<ScoredRecord>>;

    /// Every record ordered by descending `created_at`, then descending `id`.
    async fn list_all(&self) -> Result<Vec<VectorRecord>>;

    async fn count(&self) -> Result<usize>;
}

/// Reject a zero dimensionality before any storage is created.
pub fn validate_dims(dims: usize) -> Result<()> {
    if dims == 0 {
        return Err(Error::SchemaError(
            "dimensionality must be greater than 0".to_string(),
        ));
    }
    Ok(())
}

/// Compare a requested dimensionality against the one already in place.
pub fn check_same_dims(existing: usize, requested: usize) -> Result<()> {
    if existing != requested {
        return Err(Error::SchemaError(format!(
            "store has dimensionality {}, requested {}",
            existing, requested
        )));
    }
    Ok(())
}

/// Unwrap the dimensionality of a store, failing if it was never initialized.
pub fn require_dims(dims: Option<usize>) -> Result<usize> {
    dims.ok_or_else(|| Error::SchemaError("store is not initialized".to_string()))
}

fn check_vector(dims: usize, vector: &[f32]) -> Result<()> {
    if vector.len() != dims {
        return Err(Error::DimensionMismatch {
            expected: dims,
            actual: vector.len(),
        });
    }
    if vector.iter().any(|v| !v.is_finite()) {
        return Err(Error::NonFiniteVector);
    }
    Ok(())
}

/// Validate an insert: dimension first, then text.
pub fn validate_insert(dims: usize, text: &str, vector: &[f32]) -> Result<()> {
    check_vector(dims, vector)?;
    if text.trim().is_empty() {
        return Err(Error::EmptyText);
    }
    Ok(())
}

/// Validate a search and return `k` as a `usize`.
pub fn validate_search(dims: usize, query: &[f32], k: i64) -> Result<usize> {
    check_vector(dims, query)?;
    if k <= 0 {
        return Err(Error::InvalidK(k));
    }
    Ok(usize::try_from(k).unwrap_or(usize::MAX))
}

/// Ranking order shared by every backend: distance ascending, then id
/// ascending.
pub fn rank_order(a_distance: f64, a_id: i64, b_distance: f64, b_id: i64) -> Ordering {
    a_distance
        .total_cmp(&b_distance)
        .then_with(|| a_id.cmp(&b_id))
}

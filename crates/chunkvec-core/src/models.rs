//! Vector records and the values that flow into and out of a store.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Where a stored chunk came from.
///
/// Present only for file-derived chunks; directly submitted text carries
/// no provenance. `chunk_number` is 1-based within its file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Provenance {
    pub filename: String,
    pub chunk_number: i64,
}

impl Provenance {
    pub fn new(filename: impl Into<String>, chunk_number: i64) -> Self {
        Self {
            filename: filename.into(),
            chunk_number,
        }
    }
}

/// A persisted chunk: text, its embedding, and provenance.
///
/// Records are created once by a store's `insert`, never mutated, and
/// identified by a store-assigned, strictly increasing `id`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VectorRecord {
    pub id: i64,
    pub text: String,
    #[serde(skip_serializing)]
    pub vector: Vec<f32>,
    pub filename: Option<String>,
    pub chunk_number: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl VectorRecord {
    pub fn provenance(&self) -> Option<Provenance> {
        match (&self.filename, self.chunk_number) {
            (Some(f), Some(n)) => Some(Provenance::new(f.clone(), n)),
            _ => None,
        }
    }
}

/// A record paired with its squared L2 distance to a query vector.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredRecord {
    pub record: VectorRecord,
    pub distance: f64,
}

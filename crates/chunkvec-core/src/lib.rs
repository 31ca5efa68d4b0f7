//! # chunkvec core
//!
//! Filesystem-free logic for chunkvec: the error taxonomy, the
//! character-window chunker, the vector record model, the embedding
//! provider trait, the [`store::VectorStore`] abstraction with its
//! in-memory flat index, and the query engine.
//!
//! This crate contains no tokio runtime, sqlx, or filesystem I/O. The
//! durable SQLite backend, concrete embedding providers, and the file
//! ingestion pipeline live in the `chunkvec` app crate.

pub mod chunk;
pub mod embedding;
pub mod error;
pub mod models;
pub mod search;
pub mod store;

pub use error::{Error, Result};

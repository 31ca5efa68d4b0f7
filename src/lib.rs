//! # chunkvec
//!
//! Chunked text ingestion and nearest-neighbor retrieval over embedding
//! vectors.
//!
//! Text is split into overlapping character windows, embedded by a
//! configurable provider, and stored with its provenance in one of two
//! interchangeable backends: an in-process flat index or a durable SQLite
//! table. Queries are embedded the same way and ranked by squared L2
//! distance, ties broken by insertion order.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌─────────────┐   ┌──────────────┐
//! │ Files/Text  │──▶│  Pipeline   │──▶│ VectorStore  │
//! │             │   │ Chunk+Embed │   │ memory/SQLite│
//! └─────────────┘   └─────────────┘   └──────┬───────┘
//!                                           │
//!                      ┌────────────────────┤
//!                      ▼                    ▼
//!                 ┌──────────┐        ┌──────────┐
//!                 │   CLI    │        │   HTTP   │
//!                 │(chunkvec)│        │  (axum)  │
//!                 └──────────┘        └──────────┘
//! ```
//!
//! The filesystem-free pieces (chunker, store trait, in-memory backend,
//! query engine, error taxonomy) live in the `chunkvec-core` crate.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`db`] | SQLite connection pool |
//! | [`migrate`] | Idempotent schema setup |
//! | [`sqlite_store`] | Durable [`VectorStore`](chunkvec_core::store::VectorStore) backend |
//! | [`embedding`] | Concrete embedding providers |
//! | [`engine`] | Backend selection and initialization |
//! | [`ingest`] | Text, file and directory ingestion |
//! | [`search`] | `search` and `list` command output |
//! | [`stats`] | `stats` command output |
//! | [`server`] | HTTP server |

pub mod config;
pub mod db;
pub mod embedding;
pub mod engine;
pub mod ingest;
pub mod migrate;
pub mod search;
pub mod server;
pub mod sqlite_store;
pub mod stats;

pub use chunkvec_core as core;

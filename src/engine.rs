//! Process-wide wiring: one store and one embedding provider.
//!
//! The backend is chosen here, once, from `[store].backend`; everything
//! downstream holds `Arc<dyn VectorStore>` and never asks which one it got.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use chunkvec_core::embedding::EmbeddingProvider;
use chunkvec_core::store::memory::InMemoryStore;
use chunkvec_core::store::VectorStore;

use crate::config::Config;
use crate::db;
use crate::embedding::create_provider;
use crate::migrate;
use crate::sqlite_store::SqliteStore;

/// An initialized store paired with the provider that feeds it.
#[derive(Clone)]
pub struct Engine {
    pub config: Config,
    pub store: Arc<dyn VectorStore>,
    pub embedder: Arc<dyn EmbeddingProvider>,
}

impl Engine {
    /// Build the provider, open the configured backend and initialize it
    /// for the provider's dimensionality.
    ///
    /// With embeddings disabled and no `embedding.dims` configured, an
    /// existing SQLite store keeps the dimensionality it already records,
    /// so read-only commands work against any database.
    pub async fn open(config: &Config) -> Result<Self> {
        let embedder = create_provider(&config.embedding)?;
        let mut dims = embedder.dims();

        let store: Arc<dyn VectorStore> = match config.store.backend.as_str() {
            "memory" => Arc::new(InMemoryStore::new()),
            "sqlite" => {
                let path = config
                    .store
                    .path
                    .as_deref()
                    .context("store.path must be set for the sqlite backend")?;
                let pool = db::connect(path).await?;
                if !config.embedding.is_enabled() && config.embedding.dims.is_none() {
                    if let Ok(Some(recorded)) = migrate::recorded_dims(&pool).await {
                        dims = recorded;
                    }
                }
                Arc::new(SqliteStore::new(pool))
            }
            other => anyhow::bail!("Unknown store backend: '{}'", other),
        };

        store
            .initialize(dims)
            .await
            .with_context(|| format!("Failed to initialize {} store", store.backend_name()))?;

        info!(
            backend = store.backend_name(),
            dims,
            model = embedder.model_name(),
            "store ready"
        );

        Ok(Self {
            config: config.clone(),
            store,
            embedder,
        })
    }

    /// Assemble an engine from parts that are already initialized.
    pub fn from_parts(
        config: Config,
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Self {
        Self {
            config,
            store,
            embedder,
        }
    }
}

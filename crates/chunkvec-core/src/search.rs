//! Query engine: embed the query, rank stored records, shape the response.
//!
//! Runs entirely through the [`VectorStore`] and [`EmbeddingProvider`]
//! traits. Every call re-embeds the query; nothing is cached.

use serde::Serialize;
use tracing::debug;

use crate::embedding::{check_provider_dims, embed_one, EmbeddingProvider};
use crate::error::{Error, Result};
use crate::models::ScoredRecord;
use crate::store::VectorStore;

/// One ranked result, in the shape returned by the CLI and HTTP server.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SearchHit {
    pub id: i64,
    pub text: String,
    /// Squared L2 distance to the query vector; smaller is closer.
    pub distance: f64,
    pub filename: Option<String>,
    pub chunk_number: Option<i64>,
}

impl From<ScoredRecord> for SearchHit {
    fn from(scored: ScoredRecord) -> Self {
        Self {
            id: scored.record.id,
            text: scored.record.text,
            distance: scored.distance,
            filename: scored.record.filename,
            chunk_number: scored.record.chunk_number,
        }
    }
}

/// Ranked results together with the query that produced them.
#[derive(Debug, Clone, Serialize)]
pub struct QueryResponse {
    pub query: String,
    pub results: Vec<SearchHit>,
}

/// Find the `k` stored records nearest to `text`.
///
/// # Errors
///
/// - [`Error::EmptyQuery`] if `text` is blank (checked before embedding).
/// - [`Error::ProviderError`] if embedding fails or the provider returns a
///   vector whose length differs from the store's dimensionality.
/// - Any error from [`VectorStore::search`] (`InvalidK`, `DimensionMismatch`,
///   storage failures).
pub async fn query(
    store: &dyn VectorStore,
    embedder: &dyn EmbeddingProvider,
    text: &str,
    k: i64,
) -> Result<QueryResponse> {
    if text.trim().is_empty() {
        return Err(Error::EmptyQuery);
    }

    let query_vec = embed_one(embedder, text).await?;
    check_provider_dims(&query_vec, store.dims())?;
    let ranked = store.search(&query_vec, k).await?;
    debug!(k, hits = ranked.len(), "query ranked");

    Ok(QueryResponse {
        query: text.to_string(),
        results: ranked.into_iter().map(SearchHit::from).collect(),
    })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::store::memory::InMemoryStore;

    /// Embeds text as `[len, vowel count]`, counting calls.
    #[derive(Default)]
    struct CountingProvider {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl EmbeddingProvider for CountingProvider {
        fn model_name(&self) -> &str {
            "counting"
        }
        fn dims(&self) -> usize {
            2
        }
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(texts
                .iter()
                .map(|t| {
                    let len = t.chars().count() as f32;
                    let vowels = t.chars().filter(|c| "aeiou".contains(*c)).count() as f32;
                    vec![len, vowels]
                })
                .collect())
        }
    }

    struct FailingProvider;

    #[async_trait]
    impl EmbeddingProvider for FailingProvider {
        fn model_name(&self) -> &str {
            "failing"
        }
        fn dims(&self) -> usize {
            2
        }
        async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Err(Error::ProviderError("model offline".to_string()))
        }
    }

    /// Claims two dimensions but returns three.
    struct OversizedProvider;

    #[async_trait]
    impl EmbeddingProvider for OversizedProvider {
        fn model_name(&self) -> &str {
            "oversized"
        }
        fn dims(&self) -> usize {
            2
        }
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![1.0, 2.0, 3.0]).collect())
        }
    }

    async fn seeded_store() -> InMemoryStore {
        let store = InMemoryStore::new();
        store.initialize(2).await.unwrap();
        store.insert("bcd", &[3.0, 0.0], None).await.unwrap();
        store.insert("aeiou", &[5.0, 5.0], None).await.unwrap();
        store.insert("xyz", &[3.0, 0.0], None).await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_query_returns_ranked_hits_with_query_text() {
        let store = seeded_store().await;
        let embedder = CountingProvider::default();

        let resp = query(&store, &embedder, "fgh", 2).await.unwrap();
        assert_eq!(resp.query, "fgh");
        let ids: Vec<i64> = resp.results.iter().map(|h| h.id).collect();
        assert_eq!(ids, vec![1, 3]);
        assert_eq!(resp.results[0].distance, 0.0);
    }

    #[tokio::test]
    async fn test_query_reembeds_every_call() {
        let store = seeded_store().await;
        let embedder = CountingProvider::default();
        query(&store, &embedder, "abc", 1).await.unwrap();
        query(&store, &embedder, "abc", 1).await.unwrap();
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_blank_query_rejected_before_embedding() {
        let store = seeded_store().await;
        let embedder = CountingProvider::default();
        let err = query(&store, &embedder, "  \t", 3).await.unwrap_err();
        assert_eq!(err, Error::EmptyQuery);
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_invalid_k_propagates() {
        let store = seeded_store().await;
        let embedder = CountingProvider::default();
        let err = query(&store, &embedder, "abc", 0).await.unwrap_err();
        assert_eq!(err, Error::InvalidK(0));
    }

    #[tokio::test]
    async fn test_provider_failure_propagates() {
        let store = seeded_store().await;
        let err = query(&store, &FailingProvider, "abc", 3).await.unwrap_err();
        assert!(matches!(err, Error::ProviderError(_)));
    }

    #[tokio::test]
    async fn test_wrong_length_query_vector_is_provider_error() {
        let store = seeded_store().await;
        let err = query(&store, &OversizedProvider, "abc", 3).await.unwrap_err();
        assert!(matches!(err, Error::ProviderError(_)));
    }
}

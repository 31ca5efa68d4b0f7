//! Embedding provider trait and vector math.
//!
//! Defines the [`EmbeddingProvider`] trait that every embedding backend
//! implements, plus the distance function both store backends rank by.
//!
//! Concrete providers (fastembed, Ollama, OpenAI) live in the `chunkvec`
//! app crate.

use async_trait::async_trait;

use crate::error::{Error, Result};

/// Maps text to fixed-dimension float vectors.
///
/// `embed` returns one vector per input, in input order. Failures are
/// reported as [`Error::ProviderError`] and are never retried by callers
/// in this crate.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Returns the model identifier (e.g. `"all-minilm-l6-v2"`).
    fn model_name(&self) -> &str;

    /// Returns the embedding vector dimensionality (e.g. `384`).
    fn dims(&self) -> usize;

    /// Maximum texts per [`embed`](EmbeddingProvider::embed) call.
    ///
    /// `None` means the whole sequence goes in one call.
    fn max_batch_size(&self) -> Option<usize> {
        None
    }

    /// Embed a batch of texts.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Embed a single text.
///
/// Convenience wrapper around [`EmbeddingProvider::embed`] for queries and
/// single-text ingestion.
pub async fn embed_one(provider: &dyn EmbeddingProvider, text: &str) -> Result<Vec<f32>> {
    let mut vectors = provider.embed(&[text.to_string()]).await?;
    if vectors.len() != 1 {
        return Err(Error::ProviderError(format!(
            "expected 1 embedding, provider returned {}",
            vectors.len()
        )));
    }
    Ok(vectors.remove(0))
}

/// Reject a provider-produced vector whose length differs from the store's.
///
/// A wrong length here is a provider fault, so it is reported as
/// [`Error::ProviderError`] rather than a caller-facing
/// [`Error::DimensionMismatch`]. `expected` of `None` accepts any length.
pub fn check_provider_dims(vector: &[f32], expected: Option<usize>) -> Result<()> {
    match expected {
        Some(dims) if vector.len() != dims => Err(Error::ProviderError(format!(
            "provider returned {} dimensions, store expects {}",
            vector.len(),
            dims
        ))),
        _ => Ok(()),
    }
}

/// Squared Euclidean (L2) distance.
///
/// Components are widened to `f64` and the squared differences are added
/// in index order with Kahan-Babuska-Neumaier compensation, the same
/// summation SQLite's `SUM()` performs over `REAL` values. Both backends
/// therefore produce bit-identical distances and rank ties identically.
/// Callers guarantee equal lengths.
pub fn squared_l2(a: &[f32], b: &[f32]) -> f64 {
    let mut sum = 0.0_f64;
    let mut err = 0.0_f64;
    for (&x, &y) in a.iter().zip(b.iter()) {
        let d = f64::from(x) - f64::from(y);
        let term = d * d;
        let t = sum + term;
        if sum.abs() > term.abs() {
            err += (sum - t) + term;
        } else {
            err += (term - t) + sum;
        }
        sum = t;
    }
    sum + err
}

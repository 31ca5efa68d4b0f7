//! Error taxonomy shared by the chunker, stores, ingestion, and queries.

use thiserror::Error;

/// Errors surfaced by chunkvec operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("text must not be empty")]
    EmptyText,

    #[error("file has no content after decoding: {path}")]
    EmptyFile { path: String },

    #[error("query must not be empty")]
    EmptyQuery,

    #[error("vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("vector contains non-finite components")]
    NonFiniteVector,

    #[error("invalid k: {0} (must be >= 1)")]
    InvalidK(i64),

    #[error("invalid chunking: chunk_size={chunk_size}, overlap={overlap} (need chunk_size > 0 and overlap < chunk_size)")]
    InvalidChunking { chunk_size: usize, overlap: usize },

    #[error("schema error: {0}")]
    SchemaError(String),

    #[error("directory ingestion incomplete: {successful_files}/{total_files} files succeeded")]
    PartialDirectoryFailure {
        successful_files: usize,
        total_files: usize,
    },

    #[error("embedding provider error: {0}")]
    ProviderError(String),

    #[error("storage error: {0}")]
    StorageIo(String),
}

impl Error {
    /// True for errors caused by caller input rather than a collaborator.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Error::EmptyText
                | Error::EmptyFile { .. }
                | Error::EmptyQuery
                | Error::DimensionMismatch { .. }
                | Error::NonFiniteVector
                | Error::InvalidK(_)
                | Error::InvalidChunking { .. }
        )
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::StorageIo(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_directory_message_carries_counts() {
        let err = Error::PartialDirectoryFailure {
            successful_files: 1,
            total_files: 2,
        };
        assert_eq!(
            err.to_string(),
            "directory ingestion incomplete: 1/2 files succeeded"
        );
    }

    #[test]
    fn test_validation_classification() {
        assert!(Error::EmptyQuery.is_validation());
        assert!(Error::InvalidK(0).is_validation());
        assert!(!Error::ProviderError("down".into()).is_validation());
        assert!(!Error::StorageIo("disk".into()).is_validation());
    }
}

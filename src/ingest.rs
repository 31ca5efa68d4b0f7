//! Ingestion pipeline: chunk → embed → store.
//!
//! Three entry points share one primitive, embedding a batch of chunks and
//! inserting each result with its provenance:
//!
//! - [`Ingestor::ingest_text`]: one record, no provenance.
//! - [`Ingestor::ingest_file`]: decode, trim, chunk, embed in batches,
//!   insert in chunk order.
//! - [`Ingestor::ingest_directory`]: walk a tree and ingest every file
//!   matching the include globs.
//!
//! Per-chunk failures are collected in the [`FileReport`] instead of
//! aborting the file. A file succeeds when at least one chunk was stored.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::Serialize;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use chunkvec_core::chunk::{chunk_text, ChunkParams};
use chunkvec_core::embedding::{check_provider_dims, embed_one, EmbeddingProvider};
use chunkvec_core::models::Provenance;
use chunkvec_core::store::VectorStore;
use chunkvec_core::{Error, Result};

use crate::config::Config;
use crate::engine::Engine;

/// A chunk that was not stored, and why.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChunkFailure {
    /// 1-based position of the chunk within its file.
    pub chunk_number: i64,
    pub reason: String,
}

/// Outcome of ingesting one file.
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub filename: String,
    pub total_chunks: usize,
    pub successful_chunks: usize,
    pub failures: Vec<ChunkFailure>,
}

impl FileReport {
    pub fn succeeded(&self) -> bool {
        self.successful_chunks > 0
    }
}

/// Outcome of one file visited by a directory walk.
#[derive(Debug, Clone)]
pub struct FileOutcome {
    pub path: PathBuf,
    pub result: Result<FileReport>,
}

impl FileOutcome {
    pub fn succeeded(&self) -> bool {
        matches!(&self.result, Ok(report) if report.succeeded())
    }
}

/// Outcome of a directory walk.
#[derive(Debug, Clone)]
pub struct DirectoryReport {
    pub successful_files: usize,
    pub total_files: usize,
    pub files: Vec<FileOutcome>,
}

impl DirectoryReport {
    /// Turn the report into an error unless every file succeeded.
    pub fn into_result(self) -> Result<Self> {
        if self.successful_files == self.total_files {
            Ok(self)
        } else {
            Err(Error::PartialDirectoryFailure {
                successful_files: self.successful_files,
                total_files: self.total_files,
            })
        }
    }
}

/// Drives ingestion against a shared store and provider.
pub struct Ingestor {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    include: GlobSet,
}

impl Ingestor {
    /// # Errors
    ///
    /// Returns an error if any include glob fails to compile.
    pub fn new(
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        include_globs: &[String],
    ) -> anyhow::Result<Self> {
        Ok(Self {
            store,
            embedder,
            include: build_globset(include_globs)?,
        })
    }

    pub fn from_engine(engine: &Engine) -> anyhow::Result<Self> {
        Self::new(
            Arc::clone(&engine.store),
            Arc::clone(&engine.embedder),
            &engine.config.chunking.include_globs,
        )
    }

    /// Embed and store a single text without provenance.
    ///
    /// # Errors
    ///
    /// [`Error::EmptyText`] for blank input (checked before embedding),
    /// [`Error::ProviderError`] if embedding fails or yields a vector of the
    /// wrong length, or any insert error.
    pub async fn ingest_text(&self, text: &str) -> Result<i64> {
        if text.trim().is_empty() {
            return Err(Error::EmptyText);
        }
        let vector = embed_one(self.embedder.as_ref(), text).await?;
        check_provider_dims(&vector, self.store.dims())?;
        let id = self.store.insert(text, &vector, None).await?;
        debug!(id, "stored text");
        Ok(id)
    }

    /// Chunk, embed and store one file.
    ///
    /// Content is decoded as UTF-8, or byte-per-character (Latin-1) when it
    /// is not valid UTF-8, then trimmed. Chunks are embedded in batches of
    /// the provider's [`max_batch_size`](EmbeddingProvider::max_batch_size)
    /// and inserted in order with `filename` set to the file's base name.
    ///
    /// # Errors
    ///
    /// - [`Error::StorageIo`] if the file cannot be read.
    /// - [`Error::EmptyFile`] if nothing is left after trimming.
    /// - [`Error::ProviderError`] if no chunk was stored and the provider
    ///   failed at least once.
    pub async fn ingest_file(&self, path: &Path, params: &ChunkParams) -> Result<FileReport> {
        let bytes = std::fs::read(path)
            .map_err(|e| Error::StorageIo(format!("{}: {}", path.display(), e)))?;
        let content = decode_text(bytes);
        let trimmed = content.trim();
        if trimmed.is_empty() {
            return Err(Error::EmptyFile {
                path: path.display().to_string(),
            });
        }

        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let chunks = chunk_text(trimmed, params);
        let batch_size = self
            .embedder
            .max_batch_size()
            .unwrap_or(chunks.len())
            .max(1);

        let mut report = FileReport {
            filename: filename.clone(),
            total_chunks: chunks.len(),
            successful_chunks: 0,
            failures: Vec::new(),
        };
        let mut provider_failure: Option<Error> = None;

        for (batch_index, batch) in chunks.chunks(batch_size).enumerate() {
            let first = batch_index * batch_size;
            let vectors = match self.embedder.embed(batch).await {
                Ok(v) if v.len() == batch.len() => v,
                Ok(v) => {
                    let err = Error::ProviderError(format!(
                        "provider returned {} embeddings for {} chunks",
                        v.len(),
                        batch.len()
                    ));
                    record_batch_failure(&mut report, first, batch.len(), &err);
                    provider_failure = Some(err);
                    continue;
                }
                Err(err) => {
                    warn!(file = %filename, error = %err, "embedding batch failed");
                    record_batch_failure(&mut report, first, batch.len(), &err);
                    provider_failure = Some(err);
                    continue;
                }
            };

            for (offset, (chunk, vector)) in batch.iter().zip(vectors.iter()).enumerate() {
                let chunk_number = (first + offset + 1) as i64;
                let provenance = Provenance::new(filename.clone(), chunk_number);
                match self.store.insert(chunk, vector, Some(&provenance)).await {
                    Ok(_) => report.successful_chunks += 1,
                    Err(err) => {
                        warn!(file = %filename, chunk_number, error = %err, "chunk not stored");
                        report.failures.push(ChunkFailure {
                            chunk_number,
                            reason: err.to_string(),
                        });
                    }
                }
            }
        }

        if report.successful_chunks == 0 {
            if let Some(err) = provider_failure {
                return Err(err);
            }
        }

        info!(
            file = %filename,
            stored = report.successful_chunks,
            total = report.total_chunks,
            "file ingested"
        );
        Ok(report)
    }

    /// Ingest every eligible file under `root`, failing with
    /// [`Error::PartialDirectoryFailure`] unless all of them succeed.
    pub async fn ingest_directory(&self, root: &Path, params: &ChunkParams) -> Result<DirectoryReport> {
        self.walk_directory(root, params).await?.into_result()
    }

    /// Like [`ingest_directory`](Self::ingest_directory) but always returns
    /// the full report, leaving the success check to the caller.
    pub async fn walk_directory(&self, root: &Path, params: &ChunkParams) -> Result<DirectoryReport> {
        if !root.is_dir() {
            return Err(Error::StorageIo(format!(
                "not a directory: {}",
                root.display()
            )));
        }

        let mut report = DirectoryReport {
            successful_files: 0,
            total_files: 0,
            files: Vec::new(),
        };

        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    warn!(error = %e, "skipping unreadable entry");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
            if !self.include.is_match(relative) {
                continue;
            }

            let result = self.ingest_file(entry.path(), params).await;
            if let Err(e) = &result {
                warn!(path = %entry.path().display(), error = %e, "file failed");
            }
            let outcome = FileOutcome {
                path: entry.path().to_path_buf(),
                result,
            };
            report.total_files += 1;
            if outcome.succeeded() {
                report.successful_files += 1;
            }
            report.files.push(outcome);
        }

        info!(
            root = %root.display(),
            successful = report.successful_files,
            total = report.total_files,
            "directory ingested"
        );
        Ok(report)
    }
}

fn record_batch_failure(report: &mut FileReport, first: usize, len: usize, err: &Error) {
    for offset in 0..len {
        report.failures.push(ChunkFailure {
            chunk_number: (first + offset + 1) as i64,
            reason: err.to_string(),
        });
    }
}

/// UTF-8 when valid, otherwise one character per byte.
fn decode_text(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => e.into_bytes().iter().map(|&b| b as char).collect(),
    }
}

fn build_globset(patterns: &[String]) -> anyhow::Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}

/// Run the `ingest` command: dispatch on file vs directory and print the
/// per-file chunk ratios.
pub async fn run_ingest(
    config: &Config,
    path: &Path,
    chunk_size: Option<usize>,
    overlap: Option<usize>,
) -> anyhow::Result<()> {
    let params = ChunkParams::new(
        chunk_size.unwrap_or(config.chunking.chunk_size),
        overlap.unwrap_or(config.chunking.overlap),
    )?;
    let engine = Engine::open(config).await?;
    let ingestor = Ingestor::from_engine(&engine)?;

    if path.is_dir() {
        let report = ingestor.walk_directory(path, &params).await?;
        println!("ingest {}", path.display());
        for file in &report.files {
            match &file.result {
                Ok(r) => println!(
                    "  {}: {}/{} chunks",
                    file.path.display(),
                    r.successful_chunks,
                    r.total_chunks
                ),
                Err(e) => println!("  {}: failed: {}", file.path.display(), e),
            }
        }
        println!(
            "  files: {}/{}",
            report.successful_files, report.total_files
        );
        report.into_result()?;
    } else {
        let report = ingestor.ingest_file(path, &params).await?;
        println!("ingest {}", path.display());
        println!(
            "  chunks: {}/{}",
            report.successful_chunks, report.total_chunks
        );
        for failure in &report.failures {
            println!("  chunk {} failed: {}", failure.chunk_number, failure.reason);
        }
        if !report.succeeded() {
            anyhow::bail!("no chunks stored for {}", path.display());
        }
    }
    println!("ok");
    Ok(())
}

/// Run the `embed` command: store one text and print its id.
pub async fn run_embed(config: &Config, text: &str) -> anyhow::Result<()> {
    let engine = Engine::open(config).await?;
    let ingestor = Ingestor::from_engine(&engine)?;
    let id = ingestor.ingest_text(text).await?;
    println!("stored id {} ({} dims)", id, engine.embedder.dims());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chunkvec_core::store::memory::InMemoryStore;

    /// Embeds each text as `[len, first char code]`.
    struct LengthProvider;

    #[async_trait]
    impl EmbeddingProvider for LengthProvider {
        fn model_name(&self) -> &str {
            "length"
        }
        fn dims(&self) -> usize {
            2
        }
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts
                .iter()
                .map(|t| {
                    let first = t.chars().next().map(|c| c as u32).unwrap_or(0);
                    vec![t.chars().count() as f32, first as f32]
                })
                .collect())
        }
    }

    async fn ingestor() -> (Arc<InMemoryStore>, Ingestor) {
        let store = Arc::new(InMemoryStore::new());
        store.initialize(2).await.unwrap();
        let globs = vec!["**/*.txt".to_string(), "**/*.md".to_string()];
        let ingestor = Ingestor::new(store.clone(), Arc::new(LengthProvider), &globs).unwrap();
        (store, ingestor)
    }

    #[test]
    fn test_decode_text_falls_back_to_latin1() {
        assert_eq!(decode_text("héllo".as_bytes().to_vec()), "héllo");
        assert_eq!(decode_text(vec![0x63, 0x61, 0x66, 0xE9]), "café");
    }

    #[tokio::test]
    async fn test_ingest_text_rejects_blank() {
        let (_, ingestor) = ingestor().await;
        assert_eq!(ingestor.ingest_text("  \n").await.unwrap_err(), Error::EmptyText);
        assert_eq!(ingestor.ingest_text("hello").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_ingest_file_assigns_provenance_in_order() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("alpha.txt");
        std::fs::write(&path, "  abcdefghijklmno\n").unwrap();

        let (store, ingestor) = ingestor().await;
        let params = ChunkParams::new(10, 3).unwrap();
        let report = ingestor.ingest_file(&path, &params).await.unwrap();
        assert_eq!(report.filename, "alpha.txt");
        assert_eq!((report.successful_chunks, report.total_chunks), (2, 2));

        let mut records = store.list_all().await.unwrap();
        records.sort_by_key(|r| r.id);
        assert_eq!(records[0].text, "abcdefghij");
        assert_eq!(records[0].chunk_number, Some(1));
        assert_eq!(records[1].text, "hijklmno");
        assert_eq!(records[1].chunk_number, Some(2));
        assert_eq!(records[1].filename.as_deref(), Some("alpha.txt"));
    }

    #[tokio::test]
    async fn test_ingest_file_empty_after_trim() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("blank.txt");
        std::fs::write(&path, " \n\t ").unwrap();

        let (_, ingestor) = ingestor().await;
        let params = ChunkParams::new(10, 0).unwrap();
        let err = ingestor.ingest_file(&path, &params).await.unwrap_err();
        assert!(matches!(err, Error::EmptyFile { .. }));
    }

    #[tokio::test]
    async fn test_ingest_file_missing_is_storage_error() {
        let (_, ingestor) = ingestor().await;
        let params = ChunkParams::new(10, 0).unwrap();
        let err = ingestor
            .ingest_file(Path::new("/nonexistent/file.txt"), &params)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::StorageIo(_)));
    }

    #[tokio::test]
    async fn test_directory_skips_ineligible_and_empty_is_ok() {
        let tmp = tempfile::TempDir::new().unwrap();
        std::fs::write(tmp.path().join("data.csv"), "a,b,c").unwrap();

        let (_, ingestor) = ingestor().await;
        let params = ChunkParams::new(10, 0).unwrap();
        let report = ingestor.ingest_directory(tmp.path(), &params).await.unwrap();
        assert_eq!((report.successful_files, report.total_files), (0, 0));
    }

    #[tokio::test]
    async fn test_directory_recurses_in_name_order() {
        let tmp = tempfile::TempDir::new().unwrap();
        std::fs::create_dir(tmp.path().join("nested")).unwrap();
        std::fs::write(tmp.path().join("b.md"), "second file").unwrap();
        std::fs::write(tmp.path().join("a.txt"), "first file").unwrap();
        std::fs::write(tmp.path().join("nested").join("c.txt"), "third file").unwrap();

        let (store, ingestor) = ingestor().await;
        let params = ChunkParams::new(100, 0).unwrap();
        let report = ingestor.ingest_directory(tmp.path(), &params).await.unwrap();
        assert_eq!((report.successful_files, report.total_files), (3, 3));

        let mut records = store.list_all().await.unwrap();
        records.sort_by_key(|r| r.id);
        let names: Vec<_> = records.iter().filter_map(|r| r.filename.clone()).collect();
        assert_eq!(names, vec!["a.txt", "b.md", "c.txt"]);
    }

    #[tokio::test]
    async fn test_directory_counts_empty_file_as_failed() {
        let tmp = tempfile::TempDir::new().unwrap();
        std::fs::write(tmp.path().join("a.txt"), "content").unwrap();
        std::fs::write(tmp.path().join("b.txt"), "   ").unwrap();

        let (_, ingestor) = ingestor().await;
        let params = ChunkParams::new(100, 0).unwrap();
        let err = ingestor
            .ingest_directory(tmp.path(), &params)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            Error::PartialDirectoryFailure {
                successful_files: 1,
                total_files: 2
            }
        );
    }

    #[tokio::test]
    async fn test_ingest_text_rejects_provider_vector_of_wrong_length() {
        let store = Arc::new(InMemoryStore::new());
        store.initialize(3).await.unwrap();
        let ingestor = Ingestor::new(store.clone(), Arc::new(LengthProvider), &[]).unwrap();

        let err = ingestor.ingest_text("hello").await.unwrap_err();
        assert!(matches!(err, Error::ProviderError(_)));
        assert_eq!(store.count().await.unwrap(), 0);
    }
}

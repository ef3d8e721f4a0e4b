use crate::embeddings::Embedder;
use crate::error::PipelineError;
use crate::ingest::{discover_pdf_files, DocumentProcessor};
use crate::models::{FileOutcome, IndexReport, ProcessDecision, SearchHit, SkippedPdf};
use crate::traits::VectorIndex;
use crate::{IngestError, SearchError};
use std::path::Path;
use tracing::{info, warn};

/// File → text → chunks → vectors → rows, and query → vector → rows.
pub struct Pipeline<E, V> {
    processor: DocumentProcessor,
    embedder: E,
    store: V,
}

impl<E, V> Pipeline<E, V>
where
    E: Embedder,
    V: VectorIndex,
{
    pub fn new(processor: DocumentProcessor, embedder: E, store: V) -> Self {
        Self {
            processor,
            embedder,
            store,
        }
    }

    pub fn store(&self) -> &V {
        &self.store
    }

    pub fn embedder(&self) -> &E {
        &self.embedder
    }

    pub fn processor(&self) -> &DocumentProcessor {
        &self.processor
    }

    /// Checks that the provider and the collection agree on the vector length,
    /// then creates or reopens the collection.
    pub async fn open(&mut self) -> Result<(), PipelineError> {
        if self.embedder.dimensions() != self.store.dimension() {
            return Err(SearchError::DimensionMismatch {
                collection: self.store.collection().to_string(),
                declared: self.store.dimension(),
                provided: self.embedder.dimensions(),
            }
            .into());
        }
        self.store.create_collection().await?;
        info!(
            collection = %self.store.collection(),
            model = %self.embedder.model_id(),
            dimension = self.store.dimension(),
            "collection ready"
        );
        Ok(())
    }

    pub async fn index_file(&self, path: &Path) -> Result<FileOutcome, PipelineError> {
        let decision = self.processor.should_process(path, &self.store).await?;
        let replaced = match decision {
            ProcessDecision::Missing => return Ok(FileOutcome::Missing),
            ProcessDecision::Unchanged => {
                info!(path = %path.display(), "already indexed and unchanged, skipping");
                return Ok(FileOutcome::Unchanged);
            }
            ProcessDecision::Insert { .. } => false,
            ProcessDecision::Replace { .. } => true,
        };

        let batch = self.processor.process(path).await?;
        if batch.is_empty() {
            return Ok(FileOutcome::Empty { replaced });
        }

        let vectors = self.embedder.embed_batch(&batch.texts)?;
        let chunks = self.store.insert(&batch, &vectors).await?;
        info!(path = %path.display(), chunks, replaced, "indexed file");
        Ok(FileOutcome::Indexed { chunks, replaced })
    }

    /// Indexes every PDF in `folder`. A file that cannot be read or extracted
    /// is recorded in the report and the run continues; store and embedding
    /// failures end the run.
    pub async fn index_folder(&self, folder: &Path, recursive: bool) -> Result<IndexReport, PipelineError> {
        if !folder.is_dir() {
            return Err(IngestError::InvalidArgument(format!(
                "input directory not found: {}",
                folder.display()
            ))
            .into());
        }

        let files = discover_pdf_files(folder, recursive);
        let mut report = IndexReport {
            discovered: files.len(),
            ..IndexReport::default()
        };
        if files.is_empty() {
            warn!(folder = %folder.display(), "no pdf files found");
            return Ok(report);
        }
        info!(folder = %folder.display(), files = files.len(), "indexing folder");

        for path in files {
            match self.index_file(&path).await {
                Ok(outcome) => report.record(&outcome),
                Err(PipelineError::Ingest(error)) => {
                    warn!(path = %path.display(), %error, "skipping file");
                    report.failed.push(SkippedPdf {
                        path,
                        reason: error.to_string(),
                    });
                }
                Err(error) => return Err(error),
            }
        }

        info!(
            processed = report.processed(),
            discovered = report.discovered,
            unchanged = report.unchanged,
            failed = report.failed.len(),
            "folder indexed"
        );
        Ok(report)
    }

    pub async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>, PipelineError> {
        if query.trim().is_empty() {
            return Err(SearchError::Request("query is empty".to_string()).into());
        }
        let vector = self.embedder.embed(query.trim())?;
        Ok(self.store.search(&vector, limit).await?)
    }

    pub async fn drop_collection(&mut self) -> Result<bool, SearchError> {
        self.store.drop_collection().await
    }

    pub async fn close(&mut self) {
        self.store.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunking::ChunkingConfig;
    use crate::embeddings::NgramEmbedder;
    use crate::extractor::TextExtractor;
    use crate::stores::MemoryStore;
    use std::fs;
    use std::sync::Arc;
    use tempfile::tempdir;

    /// Reads the file as UTF-8 text; names containing "broken" fail.
    struct FakeExtractor;

    impl TextExtractor for FakeExtractor {
        fn name(&self) -> &'static str {
            "fake"
        }

        fn extract_text(&self, path: &Path) -> Result<String, IngestError> {
            if path.to_string_lossy().contains("broken") {
                return Err(IngestError::PdfParse("unreadable".to_string()));
            }
            Ok(fs::read_to_string(path)?)
        }
    }

    fn pipeline(dimension: usize) -> Pipeline<NgramEmbedder, MemoryStore> {
        let processor =
            DocumentProcessor::new(Arc::new(FakeExtractor), ChunkingConfig::default(), false).unwrap();
        Pipeline::new(processor, NgramEmbedder::default(), MemoryStore::new("test", dimension))
    }

    #[tokio::test]
    async fn open_rejects_a_dimension_mismatch() {
        let mut pipeline = pipeline(384);
        let result = pipeline.open().await;
        assert!(matches!(
            result,
            Err(PipelineError::Store(SearchError::DimensionMismatch { declared: 384, provided: 256, .. }))
        ));
    }

    #[tokio::test]
    async fn empty_query_is_rejected() {
        let mut pipeline = pipeline(256);
        pipeline.open().await.unwrap();
        let result = pipeline.search("   ", 5).await;
        assert!(matches!(result, Err(PipelineError::Store(SearchError::Request(_)))));
    }

    #[tokio::test]
    async fn unreadable_files_are_recorded_and_the_batch_continues() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        fs::write(dir.path().join("a.pdf"), "ข้อความภาษาไทย")?;
        fs::write(dir.path().join("broken.pdf"), "%PDF-1.4")?;
        fs::write(dir.path().join("c.pdf"), "English text")?;

        let mut pipeline = pipeline(256);
        pipeline.open().await?;
        let report = pipeline.index_folder(dir.path(), false).await?;

        assert_eq!(report.discovered, 3);
        assert_eq!(report.indexed, 2);
        assert_eq!(report.failed.len(), 1);
        assert!(report.failed[0].path.ends_with("broken.pdf"));
        Ok(())
    }

    #[tokio::test]
    async fn empty_extraction_inserts_nothing() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("scan.pdf");
        fs::write(&path, "")?;

        let mut pipeline = pipeline(256);
        pipeline.open().await?;
        let outcome = pipeline.index_file(&path).await?;

        assert_eq!(outcome, FileOutcome::Empty { replaced: false });
        assert!(pipeline.store().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn missing_folder_is_an_error() {
        let mut pipeline = pipeline(256);
        pipeline.open().await.unwrap();
        let result = pipeline
            .index_folder(Path::new("/definitely/not/here"), false)
            .await;
        assert!(matches!(
            result,
            Err(PipelineError::Ingest(IngestError::InvalidArgument(_)))
        ));
    }

    #[tokio::test]
    async fn drop_then_close() {
        let mut pipeline = pipeline(256);
        pipeline.open().await.unwrap();
        assert!(pipeline.drop_collection().await.unwrap());
        pipeline.close().await;
        assert!(!pipeline.drop_collection().await.unwrap());
    }
}

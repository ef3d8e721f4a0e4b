use crate::chunking::{ChunkingConfig, RecursiveSplitter};
use crate::error::PipelineError;
use crate::extractor::{extract_blocking, write_text_dump, TextExtractor};
use crate::models::{ChunkBatch, DocumentStamp, ProcessDecision};
use crate::traits::VectorIndex;
use crate::IngestError;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Lists `*.pdf` files under `folder`, sorted. Only the top level is scanned
/// unless `recursive` is set.
pub fn discover_pdf_files(folder: &Path, recursive: bool) -> Vec<PathBuf> {
    let mut walker = WalkDir::new(folder).min_depth(1);
    if !recursive {
        walker = walker.max_depth(1);
    }

    let mut files = Vec::new();
    for entry in walker.into_iter().filter_map(|item| item.ok()) {
        if !entry.file_type().is_file() {
            continue;
        }

        let is_pdf = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));

        if is_pdf {
            files.push(entry.path().to_path_buf());
        }
    }

    files.sort_unstable();
    files
}

/// Base name and modification time of a file on disk.
pub fn document_stamp(path: &Path) -> Result<DocumentStamp, IngestError> {
    let name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| {
            IngestError::MissingFileName(format!("path missing filename: {}", path.display()))
        })?;
    let modified = fs::metadata(path)?.modified()?;

    Ok(DocumentStamp {
        name: name.to_string(),
        modified: epoch_seconds(modified),
    })
}

fn epoch_seconds(time: SystemTime) -> f64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(elapsed) => elapsed.as_secs_f64(),
        Err(before) => -before.duration().as_secs_f64(),
    }
}

/// Decides whether a file needs (re)indexing and turns it into chunk rows.
pub struct DocumentProcessor {
    extractor: Arc<dyn TextExtractor>,
    splitter: RecursiveSplitter,
    dump_text: bool,
}

impl DocumentProcessor {
    pub fn new(
        extractor: Arc<dyn TextExtractor>,
        chunking: ChunkingConfig,
        dump_text: bool,
    ) -> Result<Self, IngestError> {
        Ok(Self {
            extractor,
            splitter: RecursiveSplitter::new(chunking)?,
            dump_text,
        })
    }

    pub fn extractor_name(&self) -> &'static str {
        self.extractor.name()
    }

    /// Compares the file's modification time with the newest stored rows of
    /// the same name. Stale rows are deleted and flushed before this returns,
    /// so a [`ProcessDecision::Replace`] always starts from an empty slate.
    pub async fn should_process<V>(
        &self,
        path: &Path,
        store: &V,
    ) -> Result<ProcessDecision, PipelineError>
    where
        V: VectorIndex + ?Sized,
    {
        if !path.is_file() {
            warn!(path = %path.display(), "file not found, skipping");
            return Ok(ProcessDecision::Missing);
        }

        let stamp = document_stamp(path)?;
        match store.latest_mod_time(&stamp.name).await? {
            None => {
                debug!(document = %stamp.name, "not indexed yet");
                Ok(ProcessDecision::Insert {
                    modified: stamp.modified,
                })
            }
            Some(stored) if stored < stamp.modified => {
                info!(
                    document = %stamp.name,
                    stored,
                    current = stamp.modified,
                    "file changed since last index, removing old chunks"
                );
                store.delete_document(&stamp.name).await?;
                store.flush().await?;
                Ok(ProcessDecision::Replace {
                    modified: stamp.modified,
                })
            }
            Some(_) => {
                debug!(document = %stamp.name, "index is up to date");
                Ok(ProcessDecision::Unchanged)
            }
        }
    }

    /// Extracts, splits and stamps one document. An extraction that succeeds
    /// without text gives an empty batch.
    pub async fn process(&self, path: &Path) -> Result<ChunkBatch, IngestError> {
        let stamp = document_stamp(path)?;
        let text = extract_blocking(self.extractor.clone(), path.to_path_buf()).await?;

        if self.dump_text {
            match write_text_dump(path, self.extractor.name(), &text) {
                Ok(target) => debug!(dump = %target.display(), "wrote extracted text"),
                Err(error) => warn!(path = %path.display(), %error, "could not write text dump"),
            }
        }

        if text.trim().is_empty() {
            warn!(
                path = %path.display(),
                extractor = self.extractor.name(),
                "no text extracted"
            );
            return Ok(ChunkBatch::for_document(&stamp, Vec::new()));
        }

        let chunks = self.splitter.split(&text);
        info!(
            document = %stamp.name,
            chars = text.chars().count(),
            chunks = chunks.len(),
            "split document"
        );
        Ok(ChunkBatch::for_document(&stamp, chunks))
    }
}

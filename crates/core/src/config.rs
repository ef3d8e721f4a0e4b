//! Runtime configuration, built once at process start and handed to each
//! component constructor.

use crate::chunking::ChunkingConfig;
use crate::error::IngestError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_COLLECTION: &str = "pdf_collection_thai";
pub const DEFAULT_MODEL: &str = "Xenova/paraphrase-multilingual-mpnet-base-v2";
pub const DEFAULT_SEARCH_LIMIT: usize = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub host: String,
    pub port: u16,
    pub collection: String,
    pub token: Option<String>,
}

impl StoreConfig {
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 19530,
            collection: DEFAULT_COLLECTION.to_string(),
            token: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Model code as listed by fastembed, or `ngram` for the offline hashed embedder.
    pub model: String,
    pub cache_dir: Option<PathBuf>,
    pub show_download_progress: bool,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            cache_dir: None,
            show_download_progress: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExtractorKind {
    /// Text layer via lopdf.
    Parser,
    /// pdftoppm + tesseract binaries.
    Tesseract,
    /// Remote neural OCR service.
    Neural,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    pub kind: ExtractorKind,
    pub dpi: u32,
    /// Tesseract-style language codes joined by `+`, e.g. `tha+eng`.
    pub languages: String,
    pub page_segmentation_mode: u8,
    pub engine_mode: u8,
    pub neural_endpoint: Option<String>,
    pub neural_api_key: Option<String>,
    pub use_gpu: bool,
    pub dump_text: bool,
}

impl ExtractionConfig {
    pub fn language_codes(&self) -> Vec<String> {
        self.languages
            .split('+')
            .map(str::trim)
            .filter(|code| !code.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn targets_thai(&self) -> bool {
        self.language_codes()
            .iter()
            .any(|code| code == "tha" || code == "th")
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            kind: ExtractorKind::Parser,
            dpi: 300,
            languages: "tha+eng".to_string(),
            page_segmentation_mode: 6,
            engine_mode: 1,
            neural_endpoint: None,
            neural_api_key: None,
            use_gpu: false,
            dump_text: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub input_dir: PathBuf,
    pub input_path: PathBuf,
    pub recursive: bool,
    pub store: StoreConfig,
    pub embedding: EmbeddingConfig,
    pub chunking: ChunkingConfig,
    pub extraction: ExtractionConfig,
    pub search_limit: usize,
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), IngestError> {
        self.chunking.validate()?;

        if self.search_limit == 0 {
            return Err(IngestError::InvalidArgument(
                "search limit must be at least 1".to_string(),
            ));
        }
        if self.store.collection.trim().is_empty() {
            return Err(IngestError::InvalidArgument(
                "collection name is empty".to_string(),
            ));
        }
        if self.extraction.kind == ExtractorKind::Neural
            && self.extraction.neural_endpoint.is_none()
        {
            return Err(IngestError::InvalidArgument(
                "neural OCR needs an endpoint".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let input_dir = PathBuf::from("document");
        Self {
            input_path: input_dir.join("Vector Database.pdf"),
            input_dir,
            recursive: false,
            store: StoreConfig::default(),
            embedding: EmbeddingConfig::default(),
            chunking: ChunkingConfig::default(),
            extraction: ExtractionConfig::default(),
            search_limit: DEFAULT_SEARCH_LIMIT,
        }
    }
}

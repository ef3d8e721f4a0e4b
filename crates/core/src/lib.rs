pub mod chunking;
pub mod config;
pub mod embeddings;
pub mod error;
pub mod extractor;
pub mod ingest;
pub mod models;
pub mod ocr;
pub mod orchestrator;
pub mod stores;
pub mod traits;

pub use chunking::{normalize_whitespace, ChunkingConfig, RecursiveSplitter};
pub use config::{
    EmbeddingConfig, ExtractionConfig, ExtractorKind, PipelineConfig, StoreConfig,
    DEFAULT_COLLECTION, DEFAULT_MODEL, DEFAULT_SEARCH_LIMIT,
};
pub use embeddings::{
    cosine_similarity, load_embedder, Embedder, FastEmbedder, NgramEmbedder, NGRAM_MODEL_ID,
};
pub use error::{EmbedError, IngestError, PipelineError, SearchError};
pub use extractor::{build_extractor, extract_blocking, write_text_dump, LopdfExtractor, TextExtractor};
pub use ingest::{discover_pdf_files, document_stamp, DocumentProcessor};
pub use models::{
    format_mod_time, ChunkBatch, CollectionState, DocumentStamp, FileOutcome, IndexReport,
    ProcessDecision, SearchHit, SkippedPdf,
};
pub use ocr::TextStats;
pub use orchestrator::Pipeline;
pub use stores::{MemoryStore, MilvusClient, MilvusStore};
pub use traits::VectorIndex;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("pdf parse error: {0}")]
    PdfParse(String),

    #[error("regex error: {0}")]
    RegexError(#[from] regex::Error),

    #[error("path has no file name: {0}")]
    MissingFileName(String),

    #[error("invalid chunking config: {0}")]
    InvalidChunkConfig(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("OCR failed: {0}")]
    OcrFailed(String),

    #[error("OCR engine unavailable: {0}")]
    OcrUnavailable(String),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("extraction task failed: {0}")]
    Task(String),
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("invalid response from {backend}: {details}")]
    BackendResponse { backend: String, details: String },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("serialize error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("search request failed: {0}")]
    Request(String),

    #[error("store not available yet: {0}")]
    NotReady(String),

    #[error("collection `{collection}` declares dimension {declared}, embedding provider produces {provided}")]
    DimensionMismatch {
        collection: String,
        declared: usize,
        provided: usize,
    },

    #[error("column lengths differ: names={names} mod_times={mod_times} texts={texts} vectors={vectors}")]
    ColumnLengthMismatch {
        names: usize,
        mod_times: usize,
        texts: usize,
        vectors: usize,
    },

    #[error("field `{field}` is {found} bytes, limit is {limit}")]
    FieldTooLong {
        field: &'static str,
        limit: usize,
        found: usize,
    },
}

#[derive(Debug, Error)]
pub enum EmbedError {
    #[error("unknown embedding model: {0}")]
    UnknownModel(String),

    #[error("embedding model failed: {0}")]
    Model(String),

    #[error("embedding has {found} dimensions, model declares {expected}")]
    Dimension { expected: usize, found: usize },
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    Store(#[from] SearchError),

    #[error(transparent)]
    Embed(#[from] EmbedError),
}

pub type Result<T, E = IngestError> = std::result::Result<T, E>;

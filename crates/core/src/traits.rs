use crate::models::{ChunkBatch, CollectionState, SearchHit};
use crate::SearchError;
use async_trait::async_trait;

/// A collection of chunk rows with a fixed embedding dimension.
///
/// Everything except `create_collection`, `drop_collection` and `close`
/// requires the collection to be loaded and fails with
/// [`SearchError::NotReady`] otherwise.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    fn collection(&self) -> &str;

    fn dimension(&self) -> usize;

    fn state(&self) -> CollectionState;

    /// Opens the collection, creating the schema and index when absent, and
    /// waits until it is loaded.
    async fn create_collection(&mut self) -> Result<(), SearchError>;

    /// Inserts one row per chunk and flushes. Returns the number of rows
    /// written.
    async fn insert(&self, batch: &ChunkBatch, vectors: &[Vec<f32>]) -> Result<usize, SearchError>;

    async fn latest_mod_time(&self, document_name: &str) -> Result<Option<f64>, SearchError>;

    async fn delete_document(&self, document_name: &str) -> Result<(), SearchError>;

    async fn flush(&self) -> Result<(), SearchError>;

    async fn count_document_rows(&self, document_name: &str) -> Result<usize, SearchError>;

    /// Nearest rows by cosine similarity, best first, at most `limit`.
    async fn search(&self, query_vector: &[f32], limit: usize) -> Result<Vec<SearchHit>, SearchError>;

    /// Returns whether a collection existed.
    async fn drop_collection(&mut self) -> Result<bool, SearchError>;

    async fn close(&mut self);
}

pub(crate) fn require_loaded(state: CollectionState, collection: &str) -> Result<(), SearchError> {
    if state == CollectionState::Loaded {
        Ok(())
    } else {
        Err(SearchError::NotReady(format!(
            "collection `{collection}` is {state:?}, open it first"
        )))
    }
}

/// Checks the column shape of an insert before anything is sent.
pub(crate) fn validate_rows(
    collection: &str,
    dimension: usize,
    batch: &ChunkBatch,
    vectors: &[Vec<f32>],
) -> Result<(), SearchError> {
    let texts = batch.texts.len();
    if batch.document_names.len() != texts
        || batch.mod_times.len() != texts
        || vectors.len() != texts
    {
        return Err(SearchError::ColumnLengthMismatch {
            names: batch.document_names.len(),
            mod_times: batch.mod_times.len(),
            texts,
            vectors: vectors.len(),
        });
    }

    if let Some(vector) = vectors.iter().find(|vector| vector.len() != dimension) {
        return Err(SearchError::DimensionMismatch {
            collection: collection.to_string(),
            declared: dimension,
            provided: vector.len(),
        });
    }

    if let Some(name) = batch
        .document_names
        .iter()
        .find(|name| name.len() > MAX_FILE_NAME_BYTES)
    {
        return Err(SearchError::FieldTooLong {
            field: "file_name",
            limit: MAX_FILE_NAME_BYTES,
            found: name.len(),
        });
    }

    if let Some(text) = batch.texts.iter().find(|text| text.len() > MAX_TEXT_CHUNK_BYTES) {
        return Err(SearchError::FieldTooLong {
            field: "text_chunk",
            limit: MAX_TEXT_CHUNK_BYTES,
            found: text.len(),
        });
    }

    Ok(())
}

pub const MAX_FILE_NAME_BYTES: usize = 256;
pub const MAX_TEXT_CHUNK_BYTES: usize = 65_535;

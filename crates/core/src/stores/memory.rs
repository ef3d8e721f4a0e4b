use crate::embeddings::cosine_similarity;
use crate::models::{ChunkBatch, CollectionState, SearchHit};
use crate::traits::{require_loaded, validate_rows, VectorIndex};
use crate::SearchError;
use async_trait::async_trait;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

#[derive(Debug, Clone)]
struct Row {
    id: i64,
    document_name: String,
    modified: f64,
    text: String,
    vector: Vec<f32>,
}

#[derive(Debug, Default)]
struct Rows {
    next_id: i64,
    rows: Vec<Row>,
}

/// In-process collection with exact cosine ranking. Behaves like
/// [`super::MilvusStore`] for every call, including the load-state checks.
#[derive(Debug)]
pub struct MemoryStore {
    collection: String,
    dimension: usize,
    state: CollectionState,
    rows: Mutex<Rows>,
}

impl MemoryStore {
    pub fn new(collection: impl Into<String>, dimension: usize) -> Self {
        Self {
            collection: collection.into(),
            dimension,
            state: CollectionState::Absent,
            rows: Mutex::new(Rows::default()),
        }
    }

    pub fn len(&self) -> usize {
        self.lock().rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, Rows> {
        self.rows.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl VectorIndex for MemoryStore {
    fn collection(&self) -> &str {
        &self.collection
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn state(&self) -> CollectionState {
        self.state
    }

    async fn create_collection(&mut self) -> Result<(), SearchError> {
        self.state = CollectionState::Loaded;
        Ok(())
    }

    async fn insert(&self, batch: &ChunkBatch, vectors: &[Vec<f32>]) -> Result<usize, SearchError> {
        require_loaded(self.state, &self.collection)?;
        validate_rows(&self.collection, self.dimension, batch, vectors)?;

        let mut guard = self.lock();
        for (row, vector) in vectors.iter().enumerate() {
            guard.next_id += 1;
            let id = guard.next_id;
            guard.rows.push(Row {
                id,
                document_name: batch.document_names[row].clone(),
                modified: batch.mod_times[row],
                text: batch.texts[row].clone(),
                vector: vector.clone(),
            });
        }
        debug!(collection = %self.collection, rows = batch.len(), "inserted rows in memory");
        Ok(batch.len())
    }

    async fn latest_mod_time(&self, document_name: &str) -> Result<Option<f64>, SearchError> {
        require_loaded(self.state, &self.collection)?;
        Ok(self
            .lock()
            .rows
            .iter()
            .filter(|row| row.document_name == document_name)
            .map(|row| row.modified)
            .reduce(f64::max))
    }

    async fn delete_document(&self, document_name: &str) -> Result<(), SearchError> {
        require_loaded(self.state, &self.collection)?;
        self.lock()
            .rows
            .retain(|row| row.document_name != document_name);
        Ok(())
    }

    async fn flush(&self) -> Result<(), SearchError> {
        require_loaded(self.state, &self.collection)
    }

    async fn count_document_rows(&self, document_name: &str) -> Result<usize, SearchError> {
        require_loaded(self.state, &self.collection)?;
        Ok(self
            .lock()
            .rows
            .iter()
            .filter(|row| row.document_name == document_name)
            .count())
    }

    async fn search(&self, query_vector: &[f32], limit: usize) -> Result<Vec<SearchHit>, SearchError> {
        require_loaded(self.state, &self.collection)?;
        if query_vector.len() != self.dimension {
            return Err(SearchError::DimensionMismatch {
                collection: self.collection.clone(),
                declared: self.dimension,
                provided: query_vector.len(),
            });
        }

        let mut hits = self
            .lock()
            .rows
            .iter()
            .map(|row| SearchHit {
                id: row.id,
                score: cosine_similarity(query_vector, &row.vector),
                document_name: row.document_name.clone(),
                text: row.text.clone(),
                modified: row.modified,
            })
            .collect::<Vec<_>>();

        hits.sort_by(|left, right| right.score.total_cmp(&left.score));
        hits.truncate(limit);
        Ok(hits)
    }

    async fn drop_collection(&mut self) -> Result<bool, SearchError> {
        let existed = self.state != CollectionState::Absent;
        *self.lock() = Rows::default();
        self.state = CollectionState::Absent;
        Ok(existed)
    }

    async fn close(&mut self) {
        if self.state != CollectionState::Absent {
            debug!(collection = %self.collection, "closing in-memory collection");
        }
        self.state = CollectionState::Absent;
    }
}

use crate::config::StoreConfig;
use crate::models::{ChunkBatch, CollectionState, SearchHit};
use crate::traits::{require_loaded, validate_rows, VectorIndex, MAX_FILE_NAME_BYTES, MAX_TEXT_CHUNK_BYTES};
use crate::SearchError;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::collections::BTreeSet;
use std::future::Future;
use std::ops::Range;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

const BACKEND: &str = "milvus";
const VECTOR_FIELD: &str = "embedding";
const OUTPUT_FIELDS: [&str; 3] = ["file_name", "text_chunk", "file_mod_time"];
const INSERT_SLICE: usize = 128;
const MOD_TIME_QUERY_LIMIT: usize = 100;
const HNSW_M: u32 = 16;
const HNSW_EF_CONSTRUCTION: u32 = 200;
const MIN_SEARCH_EF: usize = 100;
const LOAD_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Connection to a Milvus server over the v2 REST API.
pub struct MilvusClient {
    base_url: String,
    token: Option<String>,
    client: Client,
    closed: bool,
}

impl MilvusClient {
    /// Opens a client and checks that the server answers. Connection failures
    /// are returned as is.
    pub async fn connect(config: &StoreConfig) -> Result<Self, SearchError> {
        let client = Self {
            base_url: config.base_url(),
            token: config.token.clone().filter(|token| !token.trim().is_empty()),
            client: Client::new(),
            closed: false,
        };
        let collections = client.list_collections().await?;
        info!(
            url = %client.base_url,
            collections = collections.len(),
            "connected to milvus"
        );
        Ok(client)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn list_collections(&self) -> Result<Vec<String>, SearchError> {
        let body = self.post("collections/list", json!({})).await?;
        Ok(body
            .pointer("/data")
            .and_then(Value::as_array)
            .map(|names| {
                names
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default())
    }

    pub async fn has_collection(&self, name: &str) -> Result<bool, SearchError> {
        let body = self
            .post("collections/has", json!({ "collectionName": name }))
            .await?;
        Ok(body
            .pointer("/data/has")
            .and_then(Value::as_bool)
            .unwrap_or(false))
    }

    /// Drops `name` if it exists and reports whether it did.
    pub async fn drop_collection(&self, name: &str) -> Result<bool, SearchError> {
        if !self.has_collection(name).await? {
            return Ok(false);
        }
        self.post("collections/drop", json!({ "collectionName": name }))
            .await?;
        info!(collection = name, "dropped collection");
        Ok(true)
    }

    pub fn close(&mut self) {
        if self.closed {
            debug!(url = %self.base_url, "milvus client already closed");
            return;
        }
        self.closed = true;
        info!(url = %self.base_url, "closed milvus connection");
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    async fn post(&self, path: &str, body: Value) -> Result<Value, SearchError> {
        if self.closed {
            return Err(SearchError::NotReady(format!(
                "milvus connection to {} is closed",
                self.base_url
            )));
        }

        let url = endpoint(&self.base_url, path)?;
        let mut request = self.client.post(url).json(&body);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(SearchError::BackendResponse {
                backend: BACKEND.to_string(),
                details: format!("{path} returned {status}: {text}"),
            });
        }

        let parsed: Value = serde_json::from_str(&text)?;
        check_code(path, &parsed)?;
        Ok(parsed)
    }
}

/// One Milvus collection holding chunk rows.
pub struct MilvusStore {
    client: MilvusClient,
    collection: String,
    dimension: usize,
    state: CollectionState,
}

impl MilvusStore {
    pub fn new(client: MilvusClient, collection: impl Into<String>, dimension: usize) -> Self {
        Self {
            client,
            collection: collection.into(),
            dimension,
            state: CollectionState::Absent,
        }
    }

    pub async fn connect(config: &StoreConfig, dimension: usize) -> Result<Self, SearchError> {
        let client = MilvusClient::connect(config).await?;
        Ok(Self::new(client, config.collection.clone(), dimension))
    }

    pub fn client(&self) -> &MilvusClient {
        &self.client
    }

    async fn declared_dimension(&self) -> Result<Option<usize>, SearchError> {
        let body = self
            .client
            .post(
                "collections/describe",
                json!({ "collectionName": self.collection }),
            )
            .await?;
        Ok(parse_declared_dimension(&body))
    }

    async fn load_and_wait(&mut self) -> Result<(), SearchError> {
        self.client
            .post("collections/load", json!({ "collectionName": self.collection }))
            .await?;

        let mut polls = 0u32;
        loop {
            let body = self
                .client
                .post(
                    "collections/get_load_state",
                    json!({ "collectionName": self.collection }),
                )
                .await?;
            if is_loaded(&body) {
                break;
            }
            polls += 1;
            if polls % 10 == 0 {
                info!(collection = %self.collection, polls, "waiting for collection to load");
            }
            tokio::time::sleep(LOAD_POLL_INTERVAL).await;
        }

        self.state = CollectionState::Loaded;
        debug!(collection = %self.collection, "collection loaded");
        Ok(())
    }
}

#[async_trait]
impl VectorIndex for MilvusStore {
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
        if self.client.has_collection(&self.collection).await? {
            match self.declared_dimension().await? {
                Some(declared) if declared != self.dimension => {
                    return Err(SearchError::DimensionMismatch {
                        collection: self.collection.clone(),
                        declared,
                        provided: self.dimension,
                    });
                }
                Some(_) => {}
                None => warn!(
                    collection = %self.collection,
                    "could not read the embedding dimension of the existing collection"
                ),
            }
            info!(collection = %self.collection, "using existing collection");
        } else {
            self.client
                .post(
                    "collections/create",
                    collection_schema_body(&self.collection, self.dimension),
                )
                .await?;
            info!(
                collection = %self.collection,
                dimension = self.dimension,
                "created collection with HNSW index"
            );
        }

        self.state = CollectionState::Created;
        self.load_and_wait().await
    }

    async fn insert(&self, batch: &ChunkBatch, vectors: &[Vec<f32>]) -> Result<usize, SearchError> {
        require_loaded(self.state, &self.collection)?;
        validate_rows(&self.collection, self.dimension, batch, vectors)?;
        if batch.is_empty() {
            return Ok(0);
        }

        let client = &self.client;
        let collection = self.collection.as_str();
        let send = move |rows: Range<usize>| {
            let body = insert_body(collection, batch, vectors, rows.clone());
            async move {
                let body = client.post("entities/insert", body).await?;
                Ok::<usize, SearchError>(body
                    .pointer("/data/insertCount")
                    .and_then(Value::as_u64)
                    .map(|count| count as usize)
                    .unwrap_or(rows.len()))
            }
        };
        let discard = move || async move {
            for name in distinct_names(batch) {
                self.delete_document(name).await?;
            }
            self.flush().await?;
            Ok::<(), SearchError>(())
        };
        let inserted = insert_in_slices(batch.len(), INSERT_SLICE, send, discard).await?;

        self.flush().await?;
        debug!(collection = %self.collection, rows = inserted, "inserted rows");
        Ok(inserted)
    }

    async fn latest_mod_time(&self, document_name: &str) -> Result<Option<f64>, SearchError> {
        require_loaded(self.state, &self.collection)?;
        let body = self
            .client
            .post(
                "entities/query",
                json!({
                    "collectionName": self.collection,
                    "filter": name_filter(document_name),
                    "outputFields": ["file_mod_time"],
                    "limit": MOD_TIME_QUERY_LIMIT,
                }),
            )
            .await?;
        Ok(parse_latest_mod_time(&body))
    }

    async fn delete_document(&self, document_name: &str) -> Result<(), SearchError> {
        require_loaded(self.state, &self.collection)?;
        self.client
            .post(
                "entities/delete",
                json!({
                    "collectionName": self.collection,
                    "filter": name_filter(document_name),
                }),
            )
            .await?;
        debug!(collection = %self.collection, document = document_name, "deleted document rows");
        Ok(())
    }

    async fn flush(&self) -> Result<(), SearchError> {
        require_loaded(self.state, &self.collection)?;
        self.client
            .post("collections/flush", json!({ "collectionName": self.collection }))
            .await?;
        Ok(())
    }

    async fn count_document_rows(&self, document_name: &str) -> Result<usize, SearchError> {
        require_loaded(self.state, &self.collection)?;
        let body = self
            .client
            .post(
                "entities/query",
                json!({
                    "collectionName": self.collection,
                    "filter": name_filter(document_name),
                    "outputFields": ["count(*)"],
                }),
            )
            .await?;
        Ok(parse_count(&body))
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
        if limit == 0 {
            return Ok(Vec::new());
        }

        let body = self
            .client
            .post(
                "entities/search",
                search_body(&self.collection, query_vector, limit),
            )
            .await?;

        let mut hits = parse_search_hits(&body);
        hits.sort_by(|left, right| right.score.total_cmp(&left.score));
        hits.truncate(limit);
        Ok(hits)
    }

    async fn drop_collection(&mut self) -> Result<bool, SearchError> {
        let existed = self.client.drop_collection(&self.collection).await?;
        self.state = CollectionState::Absent;
        Ok(existed)
    }

    async fn close(&mut self) {
        self.state = CollectionState::Absent;
        self.client.close();
    }
}

/// Sends `total` rows in slices of `slice` through `send`. If a slice fails,
/// `discard` removes whatever earlier slices stored so no document is left
/// half indexed, then the slice error is returned.
async fn insert_in_slices<S, SF, D, DF>(
    total: usize,
    slice: usize,
    mut send: S,
    discard: D,
) -> Result<usize, SearchError>
where
    S: FnMut(Range<usize>) -> SF,
    SF: Future<Output = Result<usize, SearchError>>,
    D: FnOnce() -> DF,
    DF: Future<Output = Result<(), SearchError>>,
{
    let mut inserted = 0usize;
    for start in (0..total).step_by(slice.max(1)) {
        let end = (start + slice.max(1)).min(total);
        match send(start..end).await {
            Ok(count) => inserted += count,
            Err(error) => {
                if inserted > 0 {
                    if let Err(cleanup) = discard().await {
                        warn!(%cleanup, rows = inserted, "failed to remove partially inserted rows");
                    }
                }
                return Err(error);
            }
        }
    }
    Ok(inserted)
}

fn distinct_names(batch: &ChunkBatch) -> BTreeSet<&str> {
    batch.document_names.iter().map(String::as_str).collect()
}

fn endpoint(base_url: &str, path: &str) -> Result<Url, SearchError> {
    let base = Url::parse(&format!("{}/", base_url.trim_end_matches('/')))?;
    Ok(base.join(&format!("v2/vectordb/{path}"))?)
}

fn check_code(path: &str, body: &Value) -> Result<(), SearchError> {
    let code = body.pointer("/code").and_then(Value::as_i64).unwrap_or(0);
    if code == 0 {
        return Ok(());
    }
    let message = body
        .pointer("/message")
        .and_then(Value::as_str)
        .unwrap_or("no message");
    Err(SearchError::BackendResponse {
        backend: BACKEND.to_string(),
        details: format!("{path} failed with code {code}: {message}"),
    })
}

/// Boolean filter selecting every row of one document.
pub fn name_filter(document_name: &str) -> String {
    let escaped = document_name.replace('\\', "\\\\").replace('"', "\\\"");
    format!("file_name == \"{escaped}\"")
}

fn collection_schema_body(collection: &str, dimension: usize) -> Value {
    json!({
        "collectionName": collection,
        "schema": {
            "autoId": true,
            "enableDynamicField": false,
            "fields": [
                {
                    "fieldName": "id",
                    "dataType": "Int64",
                    "isPrimary": true,
                },
                {
                    "fieldName": "file_name",
                    "dataType": "VarChar",
                    "elementTypeParams": { "max_length": MAX_FILE_NAME_BYTES },
                },
                {
                    "fieldName": "file_mod_time",
                    "dataType": "Double",
                },
                {
                    "fieldName": "text_chunk",
                    "dataType": "VarChar",
                    "elementTypeParams": { "max_length": MAX_TEXT_CHUNK_BYTES },
                },
                {
                    "fieldName": VECTOR_FIELD,
                    "dataType": "FloatVector",
                    "elementTypeParams": { "dim": dimension },
                },
            ],
        },
        "indexParams": [
            {
                "fieldName": VECTOR_FIELD,
                "indexName": "embedding_hnsw",
                "metricType": "COSINE",
                "indexType": "HNSW",
                "params": { "M": HNSW_M, "efConstruction": HNSW_EF_CONSTRUCTION },
            }
        ],
    })
}

fn insert_body(
    collection: &str,
    batch: &ChunkBatch,
    vectors: &[Vec<f32>],
    rows: std::ops::Range<usize>,
) -> Value {
    let data = rows
        .map(|row| {
            json!({
                "file_name": batch.document_names[row],
                "file_mod_time": batch.mod_times[row],
                "text_chunk": batch.texts[row],
                VECTOR_FIELD: vectors[row],
            })
        })
        .collect::<Vec<_>>();
    json!({ "collectionName": collection, "data": data })
}

fn search_body(collection: &str, query_vector: &[f32], limit: usize) -> Value {
    json!({
        "collectionName": collection,
        "data": [query_vector],
        "annsField": VECTOR_FIELD,
        "limit": limit,
        "outputFields": OUTPUT_FIELDS,
        "searchParams": {
            "metricType": "COSINE",
            "params": { "ef": limit.max(MIN_SEARCH_EF) },
        },
    })
}

fn is_loaded(body: &Value) -> bool {
    body.pointer("/data/loadState")
        .and_then(Value::as_str)
        .is_some_and(|state| state == "LoadStateLoaded")
}

fn parse_declared_dimension(body: &Value) -> Option<usize> {
    let fields = body.pointer("/data/fields").and_then(Value::as_array)?;
    let vector_field = fields
        .iter()
        .find(|field| field.pointer("/name").and_then(Value::as_str) == Some(VECTOR_FIELD))?;

    let from_params = vector_field
        .pointer("/params")
        .and_then(Value::as_array)
        .and_then(|params| {
            params
                .iter()
                .find(|param| param.pointer("/key").and_then(Value::as_str) == Some("dim"))
        })
        .and_then(|param| param.pointer("/value"))
        .and_then(value_as_usize);

    from_params.or_else(|| {
        vector_field
            .pointer("/elementTypeParams/dim")
            .and_then(value_as_usize)
    })
}

fn value_as_usize(value: &Value) -> Option<usize> {
    match value {
        Value::Number(number) => number.as_u64().map(|dim| dim as usize),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

fn parse_latest_mod_time(body: &Value) -> Option<f64> {
    body.pointer("/data")
        .and_then(Value::as_array)?
        .iter()
        .filter_map(|row| row.pointer("/file_mod_time").and_then(Value::as_f64))
        .reduce(f64::max)
}

fn parse_count(body: &Value) -> usize {
    body.pointer("/data/0/count(*)")
        .and_then(value_as_usize)
        .unwrap_or(0)
}

fn parse_search_hits(body: &Value) -> Vec<SearchHit> {
    let hits = body
        .pointer("/data")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    hits.iter()
        .map(|hit| {
            let id = match hit.pointer("/id") {
                Some(Value::Number(number)) => number.as_i64().unwrap_or_default(),
                Some(Value::String(text)) => text.parse().unwrap_or_default(),
                _ => 0,
            };
            SearchHit {
                id,
                score: hit.pointer("/distance").and_then(Value::as_f64).unwrap_or(0.0) as f32,
                document_name: hit
                    .pointer("/file_name")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                text: hit
                    .pointer("/text_chunk")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                modified: hit
                    .pointer("/file_mod_time")
                    .and_then(Value::as_f64)
                    .unwrap_or_default(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DocumentStamp;

    #[tokio::test]
    async fn close_leaves_the_collection_loaded_on_the_server() {
        let client = MilvusClient {
            base_url: "http://127.0.0.1:9".to_string(),
            token: None,
            client: Client::new(),
            closed: false,
        };
        let mut store = MilvusStore::new(client, "shared", 4);
        store.state = CollectionState::Loaded;

        store.close().await;
        assert!(store.client().is_closed());
        assert_eq!(store.state(), CollectionState::Absent);
        store.close().await;

        let result = store.search(&[0.0; 4], 5).await;
        assert!(matches!(result, Err(SearchError::NotReady(_))));
    }

    #[tokio::test]
    async fn failed_slice_discards_earlier_slices() {
        let stored = std::sync::Mutex::new(Vec::new());
        let discarded = std::sync::atomic::AtomicBool::new(false);

        let result = insert_in_slices(
            300,
            128,
            |rows: Range<usize>| {
                let accepted = rows.start == 0;
                if accepted {
                    stored.lock().unwrap().push(rows.clone());
                }
                async move {
                    if accepted {
                        Ok(rows.len())
                    } else {
                        Err(SearchError::BackendResponse {
                            backend: BACKEND.to_string(),
                            details: "insert rejected".to_string(),
                        })
                    }
                }
            },
            || {
                stored.lock().unwrap().clear();
                discarded.store(true, std::sync::atomic::Ordering::SeqCst);
                async { Ok(()) }
            },
        )
        .await;

        assert!(matches!(result, Err(SearchError::BackendResponse { .. })));
        assert!(discarded.load(std::sync::atomic::Ordering::SeqCst));
        assert!(stored.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn slices_cover_every_row_once() {
        let mut seen = Vec::new();
        let inserted = insert_in_slices(
            300,
            128,
            |rows: Range<usize>| {
                seen.push(rows.clone());
                async move { Ok(rows.len()) }
            },
            || async { Err(SearchError::NotReady("nothing to discard".to_string())) },
        )
        .await
        .unwrap();

        assert_eq!(inserted, 300);
        assert_eq!(seen, vec![0..128, 128..256, 256..300]);
    }

    #[test]
    fn endpoints_are_versioned_paths() {
        let url = endpoint("http://localhost:19530", "collections/has").unwrap();
        assert_eq!(url.as_str(), "http://localhost:19530/v2/vectordb/collections/has");

        let url = endpoint("http://milvus:19530/", "entities/search").unwrap();
        assert_eq!(url.as_str(), "http://milvus:19530/v2/vectordb/entities/search");
    }

    #[test]
    fn nonzero_code_is_a_backend_error() {
        assert!(check_code("collections/has", &json!({ "code": 0, "data": {} })).is_ok());
        let error = check_code(
            "entities/insert",
            &json!({ "code": 1100, "message": "invalid parameter" }),
        )
        .unwrap_err();
        assert!(error.to_string().contains("invalid parameter"));
        assert!(matches!(error, SearchError::BackendResponse { .. }));
    }

    #[test]
    fn filters_escape_quotes_and_backslashes() {
        assert_eq!(name_filter("Vector Database.pdf"), r#"file_name == "Vector Database.pdf""#);
        assert_eq!(name_filter(r#"a"b\c.pdf"#), r#"file_name == "a\"b\\c.pdf""#);
        assert_eq!(name_filter("เอกสาร.pdf"), r#"file_name == "เอกสาร.pdf""#);
    }

    #[test]
    fn schema_declares_fields_and_hnsw_index() {
        let body = collection_schema_body("pdf_collection_thai", 768);
        assert_eq!(body["schema"]["fields"][4]["elementTypeParams"]["dim"], 768);
        assert_eq!(body["schema"]["fields"][1]["elementTypeParams"]["max_length"], 256);
        assert_eq!(body["schema"]["fields"][3]["elementTypeParams"]["max_length"], 65_535);
        assert_eq!(body["indexParams"][0]["indexType"], "HNSW");
        assert_eq!(body["indexParams"][0]["metricType"], "COSINE");
        assert_eq!(body["indexParams"][0]["params"]["M"], 16);
        assert_eq!(body["indexParams"][0]["params"]["efConstruction"], 200);
    }

    #[test]
    fn search_ef_never_drops_below_one_hundred() {
        let body = search_body("c", &[0.5, 0.5], 5);
        assert_eq!(body["searchParams"]["params"]["ef"], 100);
        assert_eq!(body["limit"], 5);
        assert_eq!(body["annsField"], "embedding");

        let body = search_body("c", &[0.5, 0.5], 250);
        assert_eq!(body["searchParams"]["params"]["ef"], 250);
    }

    #[test]
    fn insert_body_is_row_oriented() {
        let stamp = DocumentStamp {
            name: "a.pdf".to_string(),
            modified: 42.5,
        };
        let batch = ChunkBatch::for_document(&stamp, vec!["one".into(), "two".into(), "three".into()]);
        let vectors = vec![vec![1.0], vec![2.0], vec![3.0]];

        let body = insert_body("c", &batch, &vectors, 1..3);
        let rows = body["data"].as_array().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["text_chunk"], "two");
        assert_eq!(rows[1]["file_mod_time"], 42.5);
        assert_eq!(rows[1]["embedding"][0], 3.0);
    }

    #[test]
    fn dimension_is_read_from_params_or_element_params() {
        let described = json!({
            "code": 0,
            "data": {
                "fields": [
                    { "name": "id", "type": "Int64" },
                    { "name": "embedding", "type": "FloatVector",
                      "params": [{ "key": "dim", "value": "768" }] },
                ]
            }
        });
        assert_eq!(parse_declared_dimension(&described), Some(768));

        let described = json!({
            "data": { "fields": [{ "name": "embedding", "elementTypeParams": { "dim": 384 } }] }
        });
        assert_eq!(parse_declared_dimension(&described), Some(384));

        assert_eq!(parse_declared_dimension(&json!({ "data": {} })), None);
    }

    #[test]
    fn latest_mod_time_takes_the_maximum() {
        let body = json!({
            "data": [
                { "file_mod_time": 10.0 },
                { "file_mod_time": 12.5 },
                { "file_mod_time": 11.0 },
            ]
        });
        assert_eq!(parse_latest_mod_time(&body), Some(12.5));
        assert_eq!(parse_latest_mod_time(&json!({ "data": [] })), None);
    }

    #[test]
    fn count_query_result_is_parsed() {
        assert_eq!(parse_count(&json!({ "data": [{ "count(*)": 7 }] })), 7);
        assert_eq!(parse_count(&json!({ "data": [] })), 0);
    }

    #[test]
    fn load_state_is_recognised() {
        assert!(is_loaded(&json!({ "data": { "loadState": "LoadStateLoaded" } })));
        assert!(!is_loaded(&json!({ "data": { "loadState": "LoadStateLoading" } })));
    }

    #[test]
    fn search_hits_carry_output_fields() {
        let body = json!({
            "code": 0,
            "data": [
                {
                    "distance": 0.91,
                    "id": 451234,
                    "file_name": "Vector Database.pdf",
                    "text_chunk": "ฐานข้อมูลเวกเตอร์",
                    "file_mod_time": 1700000000.5,
                },
                {
                    "distance": 0.42,
                    "id": "451235",
                    "file_name": "other.pdf",
                    "text_chunk": "อื่น ๆ",
                    "file_mod_time": 1.0,
                },
            ]
        });

        let hits = parse_search_hits(&body);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, 451234);
        assert_eq!(hits[0].document_name, "Vector Database.pdf");
        assert!((hits[0].score - 0.91).abs() < 1e-6);
        assert_eq!(hits[1].id, 451235);
    }
}

use crate::config::EmbeddingConfig;
use crate::error::EmbedError;
use fastembed::{InitOptions, TextEmbedding};
use tracing::info;

pub const DEFAULT_NGRAM_DIMENSIONS: usize = 256;

/// Model identifier that selects [`NgramEmbedder`] instead of a fastembed model.
pub const NGRAM_MODEL_ID: &str = "ngram";

pub trait Embedder {
    fn dimensions(&self) -> usize;
    fn model_id(&self) -> &str;
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError>;

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        texts.iter().map(|text| self.embed(text)).collect()
    }
}

impl<T: Embedder + ?Sized> Embedder for Box<T> {
    fn dimensions(&self) -> usize {
        (**self).dimensions()
    }

    fn model_id(&self) -> &str {
        (**self).model_id()
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        (**self).embed(text)
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        (**self).embed_batch(texts)
    }
}

/// Builds the provider named by `config.model`.
pub fn load_embedder(config: &EmbeddingConfig) -> Result<Box<dyn Embedder>, EmbedError> {
    if config.model.eq_ignore_ascii_case(NGRAM_MODEL_ID) {
        return Ok(Box::new(NgramEmbedder::default()));
    }
    Ok(Box::new(FastEmbedder::new(config)?))
}

/// Sentence embeddings from a pretrained ONNX model via fastembed. The model
/// is downloaded (or read from the cache) once, in [`FastEmbedder::new`].
pub struct FastEmbedder {
    model: TextEmbedding,
    model_id: String,
    dimensions: usize,
}

impl FastEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self, EmbedError> {
        let model_info = TextEmbedding::list_supported_models()
            .into_iter()
            .find(|info| info.model_code.eq_ignore_ascii_case(&config.model))
            .ok_or_else(|| EmbedError::UnknownModel(config.model.clone()))?;

        let mut options = InitOptions::new(model_info.model.clone())
            .with_show_download_progress(config.show_download_progress);
        if let Some(cache_dir) = &config.cache_dir {
            options = options.with_cache_dir(cache_dir.clone());
        }

        let model =
            TextEmbedding::try_new(options).map_err(|error| EmbedError::Model(error.to_string()))?;

        info!(
            model = %model_info.model_code,
            dimensions = model_info.dim,
            "embedding model loaded"
        );

        Ok(Self {
            model,
            model_id: model_info.model_code.clone(),
            dimensions: model_info.dim,
        })
    }

    fn check(&self, vector: Vec<f32>) -> Result<Vec<f32>, EmbedError> {
        if vector.len() != self.dimensions {
            return Err(EmbedError::Dimension {
                expected: self.dimensions,
                found: vector.len(),
            });
        }
        Ok(vector)
    }
}

impl Embedder for FastEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let vector = self
            .model
            .embed(vec![text], None)
            .map_err(|error| EmbedError::Model(error.to_string()))?
            .into_iter()
            .next()
            .ok_or_else(|| EmbedError::Model("model returned no embedding".to_string()))?;
        self.check(vector)
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let vectors = self
            .model
            .embed(texts.to_vec(), None)
            .map_err(|error| EmbedError::Model(error.to_string()))?;
        if vectors.len() != texts.len() {
            return Err(EmbedError::Model(format!(
                "model returned {} embeddings for {} texts",
                vectors.len(),
                texts.len()
            )));
        }
        vectors.into_iter().map(|vector| self.check(vector)).collect()
    }
}

/// Hashed character-trigram embedding. Deterministic and dependency free;
/// near-duplicate strings land close together, which is enough for offline
/// runs and tests.
#[derive(Debug, Clone, Copy)]
pub struct NgramEmbedder {
    pub dimensions: usize,
}

impl Default for NgramEmbedder {
    fn default() -> Self {
        Self {
            dimensions: DEFAULT_NGRAM_DIMENSIONS,
        }
    }
}

impl Embedder for NgramEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_id(&self) -> &str {
        NGRAM_MODEL_ID
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let mut vector = vec![0f32; self.dimensions.max(1)];
        let chars: Vec<char> = text.to_lowercase().chars().collect();

        for window in chars.windows(3) {
            let token = window.iter().collect::<String>();
            let mut hash = 1469598103934665603u64;
            for byte in token.bytes() {
                hash ^= byte as u64;
                hash = hash.wrapping_mul(1099511628211);
            }
            let bucket = (hash % vector.len() as u64) as usize;
            vector[bucket] += 1.0;
        }

        let magnitude = vector.iter().map(|value| value * value).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            for value in &mut vector {
                *value /= magnitude;
            }
        }

        Ok(vector)
    }
}

pub fn cosine_similarity(left: &[f32], right: &[f32]) -> f32 {
    if left.len() != right.len() || left.is_empty() {
        return 0.0;
    }
    let dot = left.iter().zip(right).map(|(a, b)| a * b).sum::<f32>();
    let left_norm = left.iter().map(|value| value * value).sum::<f32>().sqrt();
    let right_norm = right.iter().map(|value| value * value).sum::<f32>().sqrt();
    if left_norm == 0.0 || right_norm == 0.0 {
        return 0.0;
    }
    dot / (left_norm * right_norm)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedder_is_deterministic() {
        let embedder = NgramEmbedder::default();
        let first = embedder.embed("ฐานข้อมูลเวกเตอร์คืออะไร").unwrap();
        let second = embedder.embed("ฐานข้อมูลเวกเตอร์คืออะไร").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn embedder_outputs_declared_length() {
        let embedder = NgramEmbedder { dimensions: 32 };
        assert_eq!(embedder.embed("abc").unwrap().len(), 32);
        assert_eq!(embedder.embed("").unwrap().len(), 32);
    }

    #[test]
    fn near_duplicate_thai_sentences_score_higher_than_unrelated() {
        let embedder = NgramEmbedder::default();
        let query = embedder.embed("ฐานข้อมูลเวกเตอร์คืออะไร").unwrap();
        let near = embedder.embed("ฐานข้อมูลเวกเตอร์คืออะไรครับ").unwrap();
        let unrelated = embedder.embed("วันนี้อากาศดีมาก").unwrap();

        let near_score = cosine_similarity(&query, &near);
        let unrelated_score = cosine_similarity(&query, &unrelated);
        assert!(near_score > 0.8, "near-duplicate score {near_score}");
        assert!(near_score > unrelated_score);
    }

    #[test]
    fn batch_matches_single_embeddings() {
        let embedder = NgramEmbedder::default();
        let texts = vec!["หนึ่ง".to_string(), "two".to_string()];
        let batch = embedder.embed_batch(&texts).unwrap();
        assert_eq!(batch[1], embedder.embed("two").unwrap());
    }

    #[test]
    fn ngram_model_id_selects_offline_embedder() {
        let config = EmbeddingConfig {
            model: "NGRAM".to_string(),
            ..EmbeddingConfig::default()
        };
        let embedder = load_embedder(&config).unwrap();
        assert_eq!(embedder.model_id(), NGRAM_MODEL_ID);
        assert_eq!(embedder.dimensions(), DEFAULT_NGRAM_DIMENSIONS);
    }

    #[test]
    fn cosine_handles_degenerate_vectors() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
        assert!((cosine_similarity(&[1.0, 1.0], &[2.0, 2.0]) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn default_model_is_a_supported_fastembed_code() {
        let default = EmbeddingConfig::default();
        let info = TextEmbedding::list_supported_models()
            .into_iter()
            .find(|info| info.model_code.eq_ignore_ascii_case(&default.model))
            .expect("default model is listed");
        assert_eq!(info.dim, 768);
    }

    #[test]
    #[ignore = "downloads the multilingual model on first run"]
    fn multilingual_model_separates_thai_sentences() {
        let embedder = FastEmbedder::new(&EmbeddingConfig::default()).expect("model loads");
        let first = embedder.embed("ฐานข้อมูลเวกเตอร์คืออะไร").unwrap();
        let again = embedder.embed("ฐานข้อมูลเวกเตอร์คืออะไร").unwrap();
        let near = embedder.embed("ฐานข้อมูลแบบเวกเตอร์คืออะไร").unwrap();
        let unrelated = embedder.embed("วันนี้อากาศดีมาก").unwrap();

        assert_eq!(first, again);
        assert_eq!(first.len(), embedder.dimensions());
        let near_score = cosine_similarity(&first, &near);
        assert!(near_score > 0.8);
        assert!(near_score > cosine_similarity(&first, &unrelated));
    }
}

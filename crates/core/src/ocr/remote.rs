use super::cleanup::clean_ocr_text;
use super::TextStats;
use crate::config::ExtractionConfig;
use crate::error::IngestError;
use crate::extractor::TextExtractor;
use base64::{engine::general_purpose::STANDARD, Engine};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
struct PageText {
    number: u32,
    text: String,
}

#[derive(Debug, Clone, Serialize)]
struct NeuralOcrRequest<'a> {
    pdf_base64: String,
    source_path: String,
    languages: &'a [String],
    gpu: bool,
}

#[derive(Debug, Clone, Deserialize)]
struct NeuralOcrResponse {
    pages: Option<Vec<NeuralOcrPage>>,
    text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct NeuralOcrPage {
    #[serde(default)]
    page: Option<u32>,
    #[serde(default)]
    text: Option<String>,
}

/// Sends the whole PDF to a neural OCR service (an EasyOCR-style recogniser
/// behind HTTP) and repairs the returned text.
#[derive(Debug, Clone)]
pub struct RemoteOcrExtractor {
    endpoint: String,
    api_key: Option<String>,
    languages: Vec<String>,
    use_gpu: bool,
    thai: bool,
}

impl RemoteOcrExtractor {
    pub fn new(config: &ExtractionConfig) -> Result<Self, IngestError> {
        let endpoint = config
            .neural_endpoint
            .as_deref()
            .map(str::trim)
            .filter(|endpoint| !endpoint.is_empty())
            .ok_or_else(|| IngestError::OcrUnavailable("no neural OCR endpoint configured".to_string()))?;
        url::Url::parse(endpoint)
            .map_err(|error| IngestError::InvalidArgument(format!("bad OCR endpoint {endpoint}: {error}")))?;

        let api_key = config
            .neural_api_key
            .as_ref()
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty());

        Ok(Self {
            endpoint: endpoint.to_string(),
            api_key,
            languages: neural_language_codes(&config.language_codes()),
            use_gpu: config.use_gpu,
            thai: config.targets_thai(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl TextExtractor for RemoteOcrExtractor {
    fn name(&self) -> &'static str {
        "ocr"
    }

    fn extract_text(&self, path: &Path) -> Result<String, IngestError> {
        let pdf = std::fs::read(path)?;
        let payload = NeuralOcrRequest {
            pdf_base64: STANDARD.encode(pdf),
            source_path: path.to_string_lossy().to_string(),
            languages: &self.languages,
            gpu: self.use_gpu,
        };

        let mut request = Client::new()
            .post(&self.endpoint)
            .header("content-type", "application/json")
            .json(&payload);

        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send()?;

        if !response.status().is_success() {
            return Err(IngestError::OcrFailed(format!(
                "neural OCR request to {} returned {}",
                self.endpoint,
                response.status()
            )));
        }

        let payload: NeuralOcrResponse = response.json()?;
        let pages = payload_to_pages(&payload);

        if pages.is_empty() {
            warn!(path = %path.display(), "neural OCR returned no text");
            return Ok(String::new());
        }
        for page in &pages {
            let stats = TextStats::of(&page.text);
            if self.thai && stats.thai_chars == 0 {
                warn!(page = page.number, "no Thai characters recognised on page");
            }
            debug!(page = page.number, chars = stats.total_chars, "page recognised");
        }
        info!(path = %path.display(), pages = pages.len(), "neural OCR finished");

        let joined = pages
            .iter()
            .map(|page| page.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        clean_ocr_text(&joined, self.thai)
    }
}

/// Tesseract codes (`tha`, `eng`) to the two-letter codes neural recognisers
/// expect; unknown codes pass through.
fn neural_language_codes(codes: &[String]) -> Vec<String> {
    codes
        .iter()
        .map(|code| match code.as_str() {
            "tha" => "th".to_string(),
            "eng" => "en".to_string(),
            other => other.to_string(),
        })
        .collect()
}

fn payload_to_pages(payload: &NeuralOcrResponse) -> Vec<PageText> {
    if let Some(listed) = &payload.pages {
        let listed = listed
            .iter()
            .enumerate()
            .filter_map(|(index, page)| {
                let text = page.text.as_ref().map(|value| value.trim().to_string())?;
                if text.is_empty() {
                    return None;
                }
                Some(PageText {
                    number: page.page.unwrap_or(index as u32 + 1),
                    text,
                })
            })
            .collect::<Vec<_>>();

        if !listed.is_empty() {
            return listed;
        }
    }

    payload
        .text
        .as_deref()
        .unwrap_or_default()
        .split('\u{000c}')
        .enumerate()
        .filter_map(|(index, chunk)| {
            let normalized = chunk.trim().to_string();
            if normalized.is_empty() {
                None
            } else {
                Some(PageText {
                    number: (index + 1) as u32,
                    text: normalized,
                })
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ocr_payload_with_pages_converts_only_nonempty_text() {
        let response = NeuralOcrResponse {
            pages: Some(vec![
                NeuralOcrPage {
                    page: Some(2),
                    text: Some("  ".to_string()),
                },
                NeuralOcrPage {
                    page: Some(3),
                    text: Some("หน้า 3".to_string()),
                },
            ]),
            text: None,
        };

        let pages = payload_to_pages(&response);

        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].number, 3);
        assert_eq!(pages[0].text, "หน้า 3");
    }

    #[test]
    fn ocr_payload_fallback_text_split_by_form_feed() {
        let response = NeuralOcrResponse {
            pages: None,
            text: Some("First\u{000C}Second\n".to_string()),
        };

        let pages = payload_to_pages(&response);

        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].number, 1);
        assert_eq!(pages[1].number, 2);
        assert_eq!(pages[1].text, "Second");
    }

    #[test]
    fn empty_payload_yields_no_pages() {
        let response = NeuralOcrResponse {
            pages: Some(Vec::new()),
            text: None,
        };
        assert!(payload_to_pages(&response).is_empty());
    }

    #[test]
    fn construction_maps_language_codes() {
        let config = ExtractionConfig {
            neural_endpoint: Some("http://localhost:8866/ocr".to_string()),
            neural_api_key: Some("  ".to_string()),
            use_gpu: true,
            ..ExtractionConfig::default()
        };
        let extractor = RemoteOcrExtractor::new(&config).unwrap();
        assert_eq!(extractor.languages, vec!["th", "en"]);
        assert!(extractor.api_key.is_none());
        assert!(extractor.thai);
    }

    #[test]
    fn malformed_endpoint_is_rejected() {
        let config = ExtractionConfig {
            neural_endpoint: Some("not a url".to_string()),
            ..ExtractionConfig::default()
        };
        assert!(matches!(
            RemoteOcrExtractor::new(&config),
            Err(IngestError::InvalidArgument(_))
        ));
    }
}

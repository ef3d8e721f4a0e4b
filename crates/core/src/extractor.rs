use crate::config::{ExtractionConfig, ExtractorKind};
use crate::error::IngestError;
use crate::ocr::{RemoteOcrExtractor, TesseractExtractor};
use lopdf::Document;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Turns a PDF on disk into plain text.
///
/// `Ok("")` means the document was read but carried no text; failures to read
/// or recognise the document are errors.
pub trait TextExtractor: Send + Sync {
    fn name(&self) -> &'static str;
    fn extract_text(&self, path: &Path) -> Result<String, IngestError>;
}

/// Reads the embedded text layer with lopdf.
#[derive(Debug, Default, Clone, Copy)]
pub struct LopdfExtractor;

impl TextExtractor for LopdfExtractor {
    fn name(&self) -> &'static str {
        "parser"
    }

    fn extract_text(&self, path: &Path) -> Result<String, IngestError> {
        let document =
            Document::load(path).map_err(|error| IngestError::PdfParse(error.to_string()))?;

        let mut pages = Vec::new();
        for (page_no, _page_id) in document.get_pages() {
            let text = document
                .extract_text(&[page_no])
                .map_err(|error| IngestError::PdfParse(error.to_string()))?;

            if !text.trim().is_empty() {
                pages.push(text);
            }
        }

        if pages.is_empty() {
            warn!(path = %path.display(), "pdf has no extractable text layer");
            return Ok(String::new());
        }

        Ok(pages.join("\n\n"))
    }
}

/// Picks the extraction strategy for this run. An OCR backend that cannot be
/// initialised degrades to the text-layer parser with a warning.
pub fn build_extractor(config: &ExtractionConfig) -> Arc<dyn TextExtractor> {
    match config.kind {
        ExtractorKind::Parser => Arc::new(LopdfExtractor),
        ExtractorKind::Tesseract => match TesseractExtractor::new(config) {
            Ok(extractor) => {
                info!(languages = %extractor.languages(), "using tesseract OCR");
                Arc::new(extractor)
            }
            Err(error) => {
                warn!(%error, "tesseract OCR unavailable, falling back to the PDF text parser");
                Arc::new(LopdfExtractor)
            }
        },
        ExtractorKind::Neural => match RemoteOcrExtractor::new(config) {
            Ok(extractor) => {
                info!(endpoint = %extractor.endpoint(), "using neural OCR service");
                Arc::new(extractor)
            }
            Err(error) => {
                warn!(%error, "neural OCR unavailable, falling back to the PDF text parser");
                Arc::new(LopdfExtractor)
            }
        },
    }
}

/// Runs an extractor on the blocking pool so subprocesses and blocking HTTP
/// never execute on an async worker.
pub async fn extract_blocking(
    extractor: Arc<dyn TextExtractor>,
    path: PathBuf,
) -> Result<String, IngestError> {
    tokio::task::spawn_blocking(move || extractor.extract_text(&path))
        .await
        .map_err(|error| IngestError::Task(error.to_string()))?
}

pub fn dump_path(source: &Path, label: &str) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_else(|| "document".to_string());
    let file_name = format!("{stem}_{label}_output.txt");
    match source.parent() {
        Some(parent) => parent.join(file_name),
        None => PathBuf::from(file_name),
    }
}

/// Writes extracted text next to the source file for inspection.
pub fn write_text_dump(source: &Path, label: &str, text: &str) -> Result<PathBuf, IngestError> {
    let target = dump_path(source, label);
    std::fs::write(&target, text)?;
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Object, Stream};
    use tempfile::tempdir;

    fn hello_pdf(path: &Path) {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! {
                "F1" => font_id,
            },
        });
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 48.into()]),
                Operation::new("Td", vec![100.into(), 600.into()]),
                Operation::new("Tj", vec![Object::string_literal("Hello World!")]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages));
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc.save(path).unwrap();
    }

    #[test]
    fn parser_reads_text_layer() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("hello.pdf");
        hello_pdf(&path);

        let text = LopdfExtractor.extract_text(&path).unwrap();
        assert!(text.contains("Hello World!"), "got {text:?}");
    }

    #[test]
    fn parser_rejects_broken_files() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.pdf");
        std::fs::write(&path, b"%PDF-1.4\n%broken").unwrap();

        let result = LopdfExtractor.extract_text(&path);
        assert!(matches!(result, Err(IngestError::PdfParse(_))));
    }

    #[test]
    fn neural_without_endpoint_degrades_to_parser() {
        let config = ExtractionConfig {
            kind: ExtractorKind::Neural,
            neural_endpoint: None,
            ..ExtractionConfig::default()
        };
        assert_eq!(build_extractor(&config).name(), "parser");
    }

    #[test]
    fn dumps_land_next_to_the_source() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("Vector Database.pdf");
        let written = write_text_dump(&source, "ocr", "ข้อความ").unwrap();

        assert_eq!(written, dir.path().join("Vector Database_ocr_output.txt"));
        assert_eq!(std::fs::read_to_string(written).unwrap(), "ข้อความ");
    }

    #[tokio::test]
    async fn blocking_extraction_propagates_errors() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing.pdf");
        let result = extract_blocking(Arc::new(LopdfExtractor), path).await;
        assert!(result.is_err());
    }
}

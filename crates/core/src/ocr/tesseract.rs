use super::cleanup::clean_ocr_text;
use super::preprocess::{preprocess, PreprocessProfile};
use super::TextStats;
use crate::config::ExtractionConfig;
use crate::error::IngestError;
use crate::extractor::TextExtractor;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::Instant;
use tracing::{debug, info, warn};

const TESSERACT: &str = "tesseract";
const PDFTOPPM: &str = "pdftoppm";
const FALLBACK_LANGUAGE: &str = "eng";

/// Rasterises pages with `pdftoppm` and recognises them with the `tesseract`
/// binary.
#[derive(Debug, Clone)]
pub struct TesseractExtractor {
    languages: String,
    dpi: u32,
    page_segmentation_mode: u8,
    engine_mode: u8,
    thai: bool,
}

impl TesseractExtractor {
    /// Probes both binaries and the installed language data. Requested
    /// languages that are not installed are dropped; English is the last
    /// resort.
    pub fn new(config: &ExtractionConfig) -> Result<Self, IngestError> {
        let version = run_tool(TESSERACT, &["--version"])?;
        let version = String::from_utf8_lossy(&version.stdout)
            .lines()
            .chain(String::from_utf8_lossy(&version.stderr).lines())
            .find(|line| !line.trim().is_empty())
            .unwrap_or("unknown")
            .trim()
            .to_string();
        run_tool(PDFTOPPM, &["-v"])?;

        let listing = run_tool(TESSERACT, &["--list-langs"])?;
        let available = parse_language_listing(&format!(
            "{}\n{}",
            String::from_utf8_lossy(&listing.stdout),
            String::from_utf8_lossy(&listing.stderr)
        ));
        let languages = resolve_languages(&config.language_codes(), &available)?;
        let thai = languages.iter().any(|code| code == "tha");

        info!(
            tesseract = %version,
            languages = %languages.join("+"),
            psm = config.page_segmentation_mode,
            oem = config.engine_mode,
            dpi = config.dpi,
            "tesseract ready"
        );

        Ok(Self {
            languages: languages.join("+"),
            dpi: config.dpi,
            page_segmentation_mode: config.page_segmentation_mode,
            engine_mode: config.engine_mode,
            thai,
        })
    }

    pub fn languages(&self) -> &str {
        &self.languages
    }

    fn rasterize(&self, path: &Path, workdir: &Path) -> Result<Vec<PathBuf>, IngestError> {
        let prefix = workdir.join("page");
        let output = Command::new(PDFTOPPM)
            .arg("-r")
            .arg(self.dpi.to_string())
            .arg("-png")
            .arg(path)
            .arg(&prefix)
            .output()?;

        if !output.status.success() {
            return Err(IngestError::OcrFailed(format!(
                "pdftoppm failed for {}: {}",
                path.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let mut pages = std::fs::read_dir(workdir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|page| {
                page.extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("png"))
            })
            .collect::<Vec<_>>();
        pages.sort_unstable();
        Ok(pages)
    }

    fn recognize_page(&self, page: &Path) -> Result<String, IngestError> {
        let image = image::open(page)?;
        let prepared = preprocess(&image, PreprocessProfile::for_languages(self.thai));
        let prepared_path = page.with_extension("prepared.png");
        prepared.save(&prepared_path)?;

        let output = Command::new(TESSERACT)
            .arg(&prepared_path)
            .arg("stdout")
            .arg("-l")
            .arg(&self.languages)
            .arg("--psm")
            .arg(self.page_segmentation_mode.to_string())
            .arg("--oem")
            .arg(self.engine_mode.to_string())
            .output()?;

        if !output.status.success() {
            return Err(IngestError::OcrFailed(format!(
                "tesseract failed on {}: {}",
                page.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

impl TextExtractor for TesseractExtractor {
    fn name(&self) -> &'static str {
        "ocr"
    }

    fn extract_text(&self, path: &Path) -> Result<String, IngestError> {
        if !path.exists() {
            return Err(IngestError::InvalidArgument(format!(
                "file not found: {}",
                path.display()
            )));
        }

        let workdir = tempfile::tempdir()?;
        let pages = self.rasterize(path, workdir.path())?;
        if pages.is_empty() {
            return Err(IngestError::OcrFailed(format!(
                "no pages rendered from {}",
                path.display()
            )));
        }
        info!(path = %path.display(), pages = pages.len(), dpi = self.dpi, "running OCR");

        let mut texts = Vec::with_capacity(pages.len());
        let mut failures = 0usize;
        for (index, page) in pages.iter().enumerate() {
            let started = Instant::now();
            match self.recognize_page(page) {
                Ok(text) => {
                    let stats = TextStats::of(&text);
                    if self.thai && stats.thai_chars == 0 {
                        warn!(page = index + 1, "no Thai characters recognised on page");
                    }
                    if text.trim().chars().count() < 10 {
                        warn!(page = index + 1, "very little text recognised on page");
                    }
                    debug!(
                        page = index + 1,
                        chars = stats.total_chars,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "page recognised"
                    );
                    texts.push(text);
                }
                Err(error) => {
                    warn!(page = index + 1, %error, "OCR failed for page");
                    failures += 1;
                    texts.push(String::new());
                }
            }
        }

        if failures == pages.len() {
            return Err(IngestError::OcrFailed(format!(
                "every page of {} failed recognition",
                path.display()
            )));
        }

        let cleaned = clean_ocr_text(&texts.join("\n\n"), self.thai)?;
        let stats = TextStats::of(&cleaned);
        if self.thai && stats.thai_chars == 0 {
            warn!(
                path = %path.display(),
                "no Thai characters in OCR output; check installed language data and scan quality"
            );
        }
        info!(
            path = %path.display(),
            chars = stats.total_chars,
            thai_chars = stats.thai_chars,
            thai_percent = %format!("{:.1}", stats.thai_percentage()),
            "OCR finished"
        );

        Ok(cleaned)
    }
}

fn run_tool(program: &str, args: &[&str]) -> Result<Output, IngestError> {
    Command::new(program)
        .args(args)
        .output()
        .map_err(|error| IngestError::OcrUnavailable(format!("cannot run {program}: {error}")))
}

fn parse_language_listing(listing: &str) -> Vec<String> {
    listing
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| !line.contains(' ') && !line.ends_with(':'))
        .map(str::to_string)
        .collect()
}

fn resolve_languages(requested: &[String], available: &[String]) -> Result<Vec<String>, IngestError> {
    let (kept, missing): (Vec<String>, Vec<String>) = requested
        .iter()
        .cloned()
        .partition(|code| available.contains(code));

    if !missing.is_empty() {
        warn!(missing = %missing.join("+"), "tesseract language data not installed");
    }
    if !kept.is_empty() {
        return Ok(kept);
    }

    if available.iter().any(|code| code == FALLBACK_LANGUAGE) {
        warn!("falling back to English recognition; results may be incomplete");
        return Ok(vec![FALLBACK_LANGUAGE.to_string()]);
    }

    Err(IngestError::OcrUnavailable(format!(
        "none of the requested languages ({}) are installed",
        requested.join("+")
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codes(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn listing_skips_the_header() {
        let listing = "List of available languages in \"/usr/share/tessdata/\" (3):\neng\nosd\ntha\n";
        assert_eq!(parse_language_listing(listing), codes(&["eng", "osd", "tha"]));
    }

    #[test]
    fn installed_languages_are_kept() {
        let resolved = resolve_languages(&codes(&["tha", "eng"]), &codes(&["eng", "tha"])).unwrap();
        assert_eq!(resolved, codes(&["tha", "eng"]));
    }

    #[test]
    fn missing_languages_are_dropped() {
        let resolved = resolve_languages(&codes(&["tha", "eng"]), &codes(&["eng", "osd"])).unwrap();
        assert_eq!(resolved, codes(&["eng"]));
    }

    #[test]
    fn english_is_the_last_resort() {
        let resolved = resolve_languages(&codes(&["tha"]), &codes(&["eng"])).unwrap();
        assert_eq!(resolved, codes(&["eng"]));
    }

    #[test]
    fn nothing_installed_is_an_error() {
        let result = resolve_languages(&codes(&["tha"]), &codes(&["osd"]));
        assert!(matches!(result, Err(IngestError::OcrUnavailable(_))));
    }
}

//! OCR strategies for scanned PDFs: page rasterisation and image cleanup,
//! recognition through tesseract or a remote neural service, and repair of
//! the recognised text.

pub mod cleanup;
pub mod preprocess;
pub mod remote;
pub mod tesseract;

pub use cleanup::clean_ocr_text;
pub use preprocess::{preprocess, PreprocessProfile};
pub use remote::RemoteOcrExtractor;
pub use tesseract::TesseractExtractor;

/// Code points in the Thai block, U+0E00..=U+0E7F.
pub fn is_thai(ch: char) -> bool {
    ('\u{0E00}'..='\u{0E7F}').contains(&ch)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStats {
    pub total_chars: usize,
    pub thai_chars: usize,
}

impl TextStats {
    pub fn of(text: &str) -> Self {
        let mut stats = Self {
            total_chars: 0,
            thai_chars: 0,
        };
        for ch in text.chars() {
            stats.total_chars += 1;
            if is_thai(ch) {
                stats.thai_chars += 1;
            }
        }
        stats
    }

    pub fn thai_percentage(&self) -> f64 {
        if self.total_chars == 0 {
            return 0.0;
        }
        self.thai_chars as f64 / self.total_chars as f64 * 100.0
    }
}

//! Best-effort repair of recogniser output.
//!
//! Thai OCR tends to break words with stray spaces and to separate above/below
//! vowels and tone marks from their consonant. The rules here are character
//! class heuristics: they fix the common cases and can also join words that
//! were meant to be apart. Nothing outside OCR output goes through them.

use crate::error::IngestError;
use regex::{Captures, Regex};

const THAI_RUNS: &str = r"[\x{0E00}-\x{0E7F}]+(?:\s+[\x{0E00}-\x{0E7F}]+)*";
const OUTSIDE_THAI_ALLOWED: &str = r"[^\x20-\x7E\x{0E00}-\x{0E7F}\n]";
const OUTSIDE_ASCII_ALLOWED: &str = r"[^\x20-\x7E\n]";
const CONSONANT_THEN_MARK: &str = r"([\x{0E01}-\x{0E2E}])\s+([\x{0E31}-\x{0E3A}\x{0E47}-\x{0E4E}])";
const MARK_THEN_CONSONANT: &str = r"([\x{0E31}-\x{0E3A}\x{0E47}-\x{0E4E}])\s+([\x{0E01}-\x{0E2E}])";

pub fn clean_ocr_text(text: &str, thai: bool) -> Result<String, IngestError> {
    if thai {
        clean_thai(text)
    } else {
        clean_generic(text)
    }
}

fn clean_thai(text: &str) -> Result<String, IngestError> {
    let thai_runs = Regex::new(THAI_RUNS)?;
    let disallowed = Regex::new(OUTSIDE_THAI_ALLOWED)?;
    let whitespace = Regex::new(r"\s+")?;
    let consonant_mark = Regex::new(CONSONANT_THEN_MARK)?;
    let mark_consonant = Regex::new(MARK_THEN_CONSONANT)?;

    let merged = thai_runs.replace_all(text, |captures: &Captures| {
        captures[0]
            .chars()
            .filter(|ch| !ch.is_whitespace())
            .collect::<String>()
    });
    let stripped = disallowed.replace_all(&merged, "");
    let collapsed = whitespace.replace_all(&stripped, " ");
    let attached = consonant_mark.replace_all(&collapsed, "$1$2");
    let attached = mark_consonant.replace_all(&attached, "$1$2");

    Ok(attached.trim().to_string())
}

fn clean_generic(text: &str) -> Result<String, IngestError> {
    let whitespace = Regex::new(r"\s+")?;
    let disallowed = Regex::new(OUTSIDE_ASCII_ALLOWED)?;

    let collapsed = whitespace.replace_all(text, " ");
    let stripped = disallowed.replace_all(&collapsed, "");
    Ok(stripped.trim().to_string())
}

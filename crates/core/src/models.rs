use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A source file as seen by change detection: base name and modification time
/// in fractional seconds since the Unix epoch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentStamp {
    pub name: String,
    pub modified: f64,
}

/// Column-oriented chunk rows for one document, ready to be paired with
/// embeddings and inserted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkBatch {
    pub texts: Vec<String>,
    pub document_names: Vec<String>,
    pub mod_times: Vec<f64>,
}

impl ChunkBatch {
    pub fn for_document(stamp: &DocumentStamp, texts: Vec<String>) -> Self {
        let count = texts.len();
        Self {
            texts,
            document_names: vec![stamp.name.clone(); count],
            mod_times: vec![stamp.modified; count],
        }
    }

    pub fn len(&self) -> usize {
        self.texts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.texts.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollectionState {
    Absent,
    Created,
    Loaded,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ProcessDecision {
    /// The file does not exist.
    Missing,
    /// No stored rows for this name.
    Insert { modified: f64 },
    /// Stored rows were older and have been deleted and flushed.
    Replace { modified: f64 },
    /// Stored rows are at least as new as the file.
    Unchanged,
}

impl ProcessDecision {
    pub fn should_process(&self) -> bool {
        matches!(self, Self::Insert { .. } | Self::Replace { .. })
    }

    pub fn modified(&self) -> Option<f64> {
        match self {
            Self::Insert { modified } | Self::Replace { modified } => Some(*modified),
            Self::Missing | Self::Unchanged => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FileOutcome {
    Missing,
    Unchanged,
    /// Extraction succeeded but produced no text.
    Empty { replaced: bool },
    Indexed { chunks: usize, replaced: bool },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: i64,
    pub score: f32,
    pub document_name: String,
    pub text: String,
    pub modified: f64,
}

#[derive(Debug, Clone)]
pub struct SkippedPdf {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct IndexReport {
    pub discovered: usize,
    pub indexed: usize,
    pub replaced: usize,
    pub unchanged: usize,
    pub empty: usize,
    pub missing: usize,
    pub rows_inserted: usize,
    pub failed: Vec<SkippedPdf>,
}

impl IndexReport {
    /// Files that went through extraction and insertion on this run.
    pub fn processed(&self) -> usize {
        self.indexed + self.empty
    }

    pub fn record(&mut self, outcome: &FileOutcome) {
        match outcome {
            FileOutcome::Missing => self.missing += 1,
            FileOutcome::Unchanged => self.unchanged += 1,
            FileOutcome::Empty { replaced } => {
                self.empty += 1;
                if *replaced {
                    self.replaced += 1;
                }
            }
            FileOutcome::Indexed { chunks, replaced } => {
                self.indexed += 1;
                self.rows_inserted += chunks;
                if *replaced {
                    self.replaced += 1;
                }
            }
        }
    }
}

/// Formats a stored modification time in local time, `YYYY-MM-DD HH:MM:SS`.
pub fn format_mod_time(modified: f64) -> String {
    let seconds = modified.floor();
    let nanos = ((modified - seconds) * 1e9) as u32;
    match DateTime::from_timestamp(seconds as i64, nanos.min(999_999_999)) {
        Some(utc) => utc
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string(),
        None => format!("{modified}"),
    }
}

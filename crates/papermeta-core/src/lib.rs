use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub mod backend;
pub mod config;
pub mod config_file;
pub mod filename;
#[cfg(any(test, feature = "test-support"))]
pub mod memory;

// Re-export for convenience
pub use backend::{BackendError, PdfBackend, PdfDocument, RawPage};
pub use config::{CandidatePolicy, ConfigError, LlmConfig, PipelineConfig, PipelineConfigBuilder};
pub use filename::{fallback_stem, sanitize_filename};
#[cfg(any(test, feature = "test-support"))]
pub use memory::{MemoryBackend, MemoryDocument};

/// Lines of a page that survived normalization, in page order.
pub type CleanedLines = Vec<String>;

/// A date found in the header region of a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectedDate {
    /// ISO-8601 (`YYYY-MM-DD`) rendering of the first date match.
    pub date_value: String,
    /// The line the date was found in, verbatim.
    pub source_line: String,
}

/// Title reported by the language model.
///
/// `line_number` is 1-based within the candidate block; `0` means the
/// model did not say (or the reply could not be parsed).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TitleResult {
    pub title: String,
    pub line_number: u32,
}

impl TitleResult {
    pub fn is_empty(&self) -> bool {
        self.title.trim().is_empty()
    }
}

/// Authors reported by the language model.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthorsResult {
    /// Authors as one display string, e.g. `"Jane Doe, John Smith"`.
    pub authors_display: String,
    /// Individual author names in document order.
    pub authors_list: Vec<String>,
    /// 1-based line within the candidate block; `0` when unknown.
    pub line_number: u32,
}

/// Abstract-style summary reported by the language model.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SummaryResult {
    pub summary: String,
}

/// The assembled metadata for one document.
///
/// Built once by the record assembler and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataRecord {
    pub title: TitleResult,
    pub authors: AuthorsResult,
    pub date: Option<DetectedDate>,
    pub summary: SummaryResult,
    pub source_path: PathBuf,
    /// Sanitized sidecar file name, e.g. `Attention_Is_All_You_Need.json`.
    pub destination_filename: String,
}

use std::path::Path;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("failed to open PDF: {0}")]
    OpenError(String),
    #[error("failed to extract text: {0}")]
    ExtractionError(String),
    #[error("page {index} out of range (document has {count} pages)")]
    PageOutOfRange { index: usize, count: usize },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// One page's extracted text together with its 0-based index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPage {
    pub index: usize,
    pub text: String,
}

impl RawPage {
    /// Length of the page text in characters (not bytes).
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// Trait for PDF text extraction backends.
///
/// Implementors provide the low-level decoding step; header detection and
/// metadata extraction live in `papermeta-parsing` and `papermeta-llm`.
pub trait PdfBackend: Send + Sync {
    /// Open a document. Failure here means the document is unreadable.
    fn open(&self, path: &Path) -> Result<Box<dyn PdfDocument>, BackendError>;
}

/// An opened document, able to hand out the text of individual pages.
pub trait PdfDocument {
    fn page_count(&self) -> usize;

    /// Extract the text of the page at `index` (0-based).
    ///
    /// Blank or image-only pages yield an empty string, not an error.
    fn page_text(&self, index: usize) -> Result<String, BackendError>;
}

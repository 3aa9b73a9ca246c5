use thiserror::Error;

pub mod accumulate;
pub mod date;
pub mod header;
pub mod normalize;

pub use accumulate::{Accumulation, PageAccumulator};
pub use date::{DateDetector, DateMatch, PatternDateDetector};
pub use header::{HeaderBlock, HeaderSplitter, split_header};
pub use normalize::{TextNormalizer, normalize_lines};
// Re-export domain types from core (canonical definitions live there)
pub use papermeta_core::{BackendError, CleanedLines, DetectedDate, PdfDocument, RawPage};

#[derive(Error, Debug)]
pub enum ParsingError {
    #[error("document has no pages")]
    EmptyDocument,
    #[error("failed to read page {page}: {source}")]
    Page {
        page: usize,
        #[source]
        source: BackendError,
    },
}

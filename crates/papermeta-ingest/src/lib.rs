use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

pub mod batch;
pub mod copy;
pub mod pipeline;
pub mod record;
pub mod sidecar;

pub use batch::{BatchOutcome, DocumentJob, DocumentPool, ProgressEvent, process_batch};
pub use copy::{CopyError, CopySummary, copy_renamed};
pub use pipeline::{HeaderPreview, Pipeline};
pub use record::{RecordAssembler, copy_file_name, destination_stem};
pub use sidecar::{Sidecar, SidecarError, read_sidecar, write_sidecar};
// Re-export domain types for convenience
pub use papermeta_core::{MetadataRecord, PdfBackend, PipelineConfig};

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("cannot read {path}: {source}")]
    DocumentUnreadable {
        path: PathBuf,
        #[source]
        source: papermeta_core::BackendError,
    },
    #[error("failed to decode page {page}: {source}")]
    PageDecode {
        page: usize,
        #[source]
        source: papermeta_core::BackendError,
    },
    #[error("model request failed: {0}")]
    Transport(#[from] papermeta_llm::ChatError),
    #[error("failed to write sidecar: {0}")]
    Sidecar(#[from] SidecarError),
    #[error("cancelled")]
    Cancelled,
    #[error("worker failed: {0}")]
    Worker(String),
    #[cfg(not(feature = "pdf"))]
    #[error("PDF support not compiled in (enable the `pdf` feature of papermeta-ingest)")]
    NoPdfSupport,
}

/// The MuPDF backend.
#[cfg(feature = "pdf")]
pub fn default_backend() -> Result<Arc<dyn PdfBackend>, ProcessError> {
    Ok(Arc::new(papermeta_pdf_mupdf::MupdfBackend::default()))
}

#[cfg(not(feature = "pdf"))]
pub fn default_backend() -> Result<Arc<dyn PdfBackend>, ProcessError> {
    Err(ProcessError::NoPdfSupport)
}

/// Expand `inputs` into the list of PDF files to process.
///
/// Files are kept as given. Directories contribute their `*.pdf` entries
/// (not recursive), sorted by name.
pub fn collect_pdf_paths(inputs: &[PathBuf]) -> std::io::Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let mut found: Vec<PathBuf> = std::fs::read_dir(input)?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| p.is_file() && has_pdf_extension(p))
                .collect();
            found.sort();
            tracing::debug!(dir = %input.display(), count = found.len(), "expanded directory");
            paths.extend(found);
        } else {
            paths.push(input.clone());
        }
    }
    Ok(paths)
}

fn has_pdf_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
}

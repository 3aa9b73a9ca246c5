//! In-memory PDF backend for testing.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::backend::{BackendError, PdfBackend, PdfDocument};

struct Pages {
    pages: Vec<String>,
    /// Index of a page whose extraction fails, if any.
    broken_page: Option<usize>,
    /// Page indices in the order they were requested.
    reads: Mutex<Vec<usize>>,
}

/// A hand-rolled document implementing [`PdfDocument`] for tests.
///
/// Clones share the same pages and read log, so a test can keep one clone
/// and inspect [`reads()`](MemoryDocument::reads) after the pipeline has
/// consumed another.
#[derive(Clone)]
pub struct MemoryDocument {
    inner: Arc<Pages>,
}

impl MemoryDocument {
    pub fn new<S: Into<String>>(pages: impl IntoIterator<Item = S>) -> Self {
        Self {
            inner: Arc::new(Pages {
                pages: pages.into_iter().map(Into::into).collect(),
                broken_page: None,
                reads: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Make extraction of page `index` fail with [`BackendError::ExtractionError`].
    pub fn with_broken_page(self, index: usize) -> Self {
        let pages = self.inner.pages.clone();
        Self {
            inner: Arc::new(Pages {
                pages,
                broken_page: Some(index),
                reads: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Page indices read so far, in request order.
    pub fn reads(&self) -> Vec<usize> {
        self.inner
            .reads
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

impl PdfDocument for MemoryDocument {
    fn page_count(&self) -> usize {
        self.inner.pages.len()
    }

    fn page_text(&self, index: usize) -> Result<String, BackendError> {
        if let Ok(mut reads) = self.inner.reads.lock() {
            reads.push(index);
        }
        if self.inner.broken_page == Some(index) {
            return Err(BackendError::ExtractionError(format!(
                "page {index} is corrupt"
            )));
        }
        self.inner
            .pages
            .get(index)
            .cloned()
            .ok_or(BackendError::PageOutOfRange {
                index,
                count: self.inner.pages.len(),
            })
    }
}

/// A [`PdfBackend`] serving [`MemoryDocument`]s by path.
///
/// Opening a path that was never registered fails with
/// [`BackendError::OpenError`], which is how tests simulate an unreadable file.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    documents: HashMap<PathBuf, MemoryDocument>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(mut self, path: impl Into<PathBuf>, document: MemoryDocument) -> Self {
        self.documents.insert(path.into(), document);
        self
    }

    pub fn document(&self, path: &Path) -> Option<&MemoryDocument> {
        self.documents.get(path)
    }
}

impl PdfBackend for MemoryBackend {
    fn open(&self, path: &Path) -> Result<Box<dyn PdfDocument>, BackendError> {
        self.documents
            .get(path)
            .cloned()
            .map(|doc| Box::new(doc) as Box<dyn PdfDocument>)
            .ok_or_else(|| BackendError::OpenError(format!("no such document: {}", path.display())))
    }
}

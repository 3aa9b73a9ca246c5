use std::path::Path;

use mupdf::{Document, TextPageFlags};

use papermeta_core::{BackendError, PdfBackend, PdfDocument};

/// MuPDF-based implementation of [`PdfBackend`].
///
/// This crate isolates the AGPL-3.0 mupdf dependency so that the rest of
/// the workspace can be built and tested against in-memory documents.
///
/// Header and footer bands are kept by default: the title block of a paper
/// often sits in the top few percent of the first page. Enable exclusion
/// with [`with_header_exclusion`](MupdfBackend::with_header_exclusion) and
/// [`with_footer_exclusion`](MupdfBackend::with_footer_exclusion) for
/// documents with noisy running headers.
#[derive(Debug, Clone, Default)]
pub struct MupdfBackend {
    /// Fraction of page height from the bottom to drop (0.0–1.0).
    footer_exclusion_ratio: Option<f32>,
    /// Fraction of page height from the top to drop (0.0–1.0).
    header_exclusion_ratio: Option<f32>,
}

impl MupdfBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the footer exclusion ratio. Pass `0.0` to disable.
    pub fn with_footer_exclusion(mut self, ratio: f32) -> Self {
        self.footer_exclusion_ratio = (ratio > 0.0).then_some(ratio.min(1.0));
        self
    }

    /// Set the header exclusion ratio. Pass `0.0` to disable.
    pub fn with_header_exclusion(mut self, ratio: f32) -> Self {
        self.header_exclusion_ratio = (ratio > 0.0).then_some(ratio.min(1.0));
        self
    }
}

impl PdfBackend for MupdfBackend {
    fn open(&self, path: &Path) -> Result<Box<dyn PdfDocument>, BackendError> {
        let path_str = path
            .to_str()
            .ok_or_else(|| BackendError::OpenError("invalid path encoding".into()))?;

        let document =
            Document::open(path_str).map_err(|e| BackendError::OpenError(e.to_string()))?;
        let page_count = document
            .page_count()
            .map_err(|e| BackendError::OpenError(e.to_string()))?;

        tracing::debug!(path = %path.display(), page_count, "opened PDF");
        Ok(Box::new(MupdfDocument {
            document,
            page_count: usize::try_from(page_count).unwrap_or(0),
            footer_exclusion_ratio: self.footer_exclusion_ratio,
            header_exclusion_ratio: self.header_exclusion_ratio,
        }))
    }
}

/// An open MuPDF document. Pages are decoded on demand.
struct MupdfDocument {
    document: Document,
    page_count: usize,
    footer_exclusion_ratio: Option<f32>,
    header_exclusion_ratio: Option<f32>,
}

impl PdfDocument for MupdfDocument {
    fn page_count(&self) -> usize {
        self.page_count
    }

    fn page_text(&self, index: usize) -> Result<String, BackendError> {
        if index >= self.page_count {
            return Err(BackendError::PageOutOfRange {
                index,
                count: self.page_count,
            });
        }
        let page_no = i32::try_from(index).map_err(|e| BackendError::ExtractionError(e.to_string()))?;
        let page = self
            .document
            .load_page(page_no)
            .map_err(|e| BackendError::ExtractionError(e.to_string()))?;
        let text_page = page
            .to_text_page(TextPageFlags::empty())
            .map_err(|e| BackendError::ExtractionError(e.to_string()))?;

        let page_bounds = page
            .bounds()
            .map_err(|e| BackendError::ExtractionError(e.to_string()))?;
        let page_height = page_bounds.y1 - page_bounds.y0;
        let header_threshold = self
            .header_exclusion_ratio
            .map(|r| page_bounds.y0 + page_height * r);
        let footer_threshold = self
            .footer_exclusion_ratio
            .map(|r| page_bounds.y1 - page_height * r);

        // Block/line iteration keeps the visual line breaks the normalizer relies on.
        let mut text = String::new();
        for block in text_page.blocks() {
            let bounds = block.bounds();
            if header_threshold.is_some_and(|t| bounds.y1 <= t) {
                continue;
            }
            if footer_threshold.is_some_and(|t| bounds.y0 >= t) {
                continue;
            }
            for line in block.lines() {
                for c in line.chars() {
                    push_expanded(&mut text, c.char().unwrap_or('\u{FFFD}'));
                }
                text.push('\n');
            }
        }
        Ok(text)
    }
}

/// Append `c`, spelling out typographic ligatures (U+FB00–U+FB06).
fn push_expanded(out: &mut String, c: char) {
    match c {
        '\u{FB00}' => out.push_str("ff"),
        '\u{FB01}' => out.push_str("fi"),
        '\u{FB02}' => out.push_str("fl"),
        '\u{FB03}' => out.push_str("ffi"),
        '\u{FB04}' => out.push_str("ffl"),
        '\u{FB05}' | '\u{FB06}' => out.push_str("st"),
        other => out.push(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expand(s: &str) -> String {
        let mut out = String::new();
        s.chars().for_each(|c| push_expanded(&mut out, c));
        out
    }

    #[test]
    fn test_ligatures_are_expanded() {
        assert_eq!(expand("\u{FB01}nd e\u{FB03}cient \u{FB02}ow"), "find efficient flow");
        assert_eq!(expand("o\u{FB00}set \u{FB04}y \u{FB06}op"), "offset ffly stop");
        assert_eq!(expand("plain text"), "plain text");
    }

    #[test]
    fn test_exclusion_defaults_off() {
        let backend = MupdfBackend::new();
        assert!(backend.header_exclusion_ratio.is_none());
        assert!(backend.footer_exclusion_ratio.is_none());
    }

    #[test]
    fn test_exclusion_builders() {
        let backend = MupdfBackend::new()
            .with_header_exclusion(0.04)
            .with_footer_exclusion(1.5);
        assert_eq!(backend.header_exclusion_ratio, Some(0.04));
        assert_eq!(backend.footer_exclusion_ratio, Some(1.0));
        assert!(backend.with_header_exclusion(0.0).header_exclusion_ratio.is_none());
    }

    #[test]
    fn test_missing_file_is_open_error() {
        let result = MupdfBackend::new().open(Path::new("/nonexistent/paper.pdf"));
        assert!(matches!(result, Err(BackendError::OpenError(_))));
    }
}

use papermeta_core::{CleanedLines, PdfDocument, PipelineConfig, RawPage};

use crate::ParsingError;
use crate::normalize::TextNormalizer;

/// Text gathered from the leading pages of a document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Accumulation {
    /// Cleaned lines of every page read for header detection, in page order.
    pub header_lines: CleanedLines,
    /// Raw text of the first `max_summary_pages` pages, newline-joined.
    pub summary_text: String,
    /// Number of pages that fed `header_lines`.
    pub header_pages: usize,
    pub page_count: usize,
}

/// Pulls pages from a document until there is enough header text.
#[derive(Debug, Clone)]
pub struct PageAccumulator {
    normalizer: TextNormalizer,
    min_content_chars: usize,
    max_summary_pages: usize,
}

impl Default for PageAccumulator {
    fn default() -> Self {
        Self::from_config(&PipelineConfig::default())
    }
}

impl PageAccumulator {
    pub fn new(normalizer: TextNormalizer, min_content_chars: usize, max_summary_pages: usize) -> Self {
        Self {
            normalizer,
            min_content_chars,
            max_summary_pages,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(
            TextNormalizer::from_config(config),
            config.min_content_chars,
            config.max_summary_pages,
        )
    }

    /// Read page 0, then keep reading while the raw text gathered so far is
    /// shorter than `min_content_chars` and pages remain.
    ///
    /// The summary sample is assembled separately from the raw pages: pages
    /// already read for the header are reused, the rest are fetched up to the
    /// summary cap. A document whose pages never reach the threshold is read
    /// to the end and returned as is.
    pub fn accumulate(&self, document: &dyn PdfDocument) -> Result<Accumulation, ParsingError> {
        let page_count = document.page_count();
        if page_count == 0 {
            return Err(ParsingError::EmptyDocument);
        }

        let mut raw_pages: Vec<RawPage> = Vec::new();
        let mut header_lines = CleanedLines::new();
        let mut raw_chars = 0;
        let mut next_page = 0;

        loop {
            let page = read_page(document, next_page)?;
            next_page += 1;

            raw_chars += page.char_len();
            header_lines.extend(self.normalizer.normalize(&page.text));
            raw_pages.push(page);

            if raw_chars >= self.min_content_chars || next_page >= page_count {
                break;
            }
            tracing::debug!(
                raw_chars,
                min_content_chars = self.min_content_chars,
                next_page,
                "header text too short, reading another page"
            );
        }
        let header_pages = next_page;

        let summary_pages = self.max_summary_pages.min(page_count);
        while next_page < summary_pages {
            raw_pages.push(read_page(document, next_page)?);
            next_page += 1;
        }
        let summary_text = raw_pages
            .iter()
            .take(summary_pages)
            .map(|page| page.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        tracing::debug!(
            header_pages,
            header_lines = header_lines.len(),
            summary_pages,
            page_count,
            "pages accumulated"
        );

        Ok(Accumulation {
            header_lines,
            summary_text,
            header_pages,
            page_count,
        })
    }
}

fn read_page(document: &dyn PdfDocument, index: usize) -> Result<RawPage, ParsingError> {
    let text = document
        .page_text(index)
        .map_err(|source| ParsingError::Page {
            page: index,
            source,
        })?;
    Ok(RawPage { index, text })
}

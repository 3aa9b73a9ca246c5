use papermeta_core::{CleanedLines, PipelineConfig};

/// Filters raw page text down to content-bearing lines.
#[derive(Debug, Clone, Copy)]
pub struct TextNormalizer {
    min_line_chars: usize,
}

impl Default for TextNormalizer {
    fn default() -> Self {
        Self::new(papermeta_core::config::DEFAULT_MIN_LINE_CHARS)
    }
}

impl TextNormalizer {
    pub fn new(min_line_chars: usize) -> Self {
        Self { min_line_chars }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.min_line_chars)
    }

    pub fn min_line_chars(&self) -> usize {
        self.min_line_chars
    }

    pub fn normalize(&self, raw_text: &str) -> CleanedLines {
        normalize_lines(raw_text, self.min_line_chars)
    }
}

/// Split `raw_text` into trimmed lines, keeping only those strictly longer
/// than `min_line_chars` characters. Order is preserved.
///
/// Page numbers and running headers are usually short enough to fall out
/// here. A line of exactly `min_line_chars` characters is dropped.
pub fn normalize_lines(raw_text: &str, min_line_chars: usize) -> CleanedLines {
    let mut kept = Vec::new();
    for line in raw_text.lines() {
        let line = line.trim();
        let len = line.chars().count();
        if len > min_line_chars {
            kept.push(line.to_string());
        } else if len > 0 {
            tracing::trace!(len, min_line_chars, line, "skipping short line");
        }
    }
    kept
}

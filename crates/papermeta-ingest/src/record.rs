use std::path::Path;

use papermeta_core::filename::UNTITLED;
use papermeta_core::{
    AuthorsResult, DetectedDate, MetadataRecord, SummaryResult, TitleResult, fallback_stem,
    sanitize_filename,
};

pub const SIDECAR_EXTENSION: &str = "json";

/// Combines extraction results into a [`MetadataRecord`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordAssembler;

impl RecordAssembler {
    pub fn new() -> Self {
        Self
    }

    /// Build the record for `source_path`.
    ///
    /// An empty title is replaced by the sanitized file stem. The sidecar
    /// name is the sanitized title plus `.json`.
    pub fn assemble(
        &self,
        title: TitleResult,
        authors: AuthorsResult,
        date: Option<DetectedDate>,
        summary: SummaryResult,
        source_path: &Path,
    ) -> MetadataRecord {
        let title = if title.is_empty() {
            let stem = fallback_stem(source_path);
            tracing::info!(
                source = %source_path.display(),
                fallback = %stem,
                "no title extracted, using file name"
            );
            TitleResult {
                title: stem,
                line_number: 0,
            }
        } else {
            title
        };

        let destination_filename = format!(
            "{}.{SIDECAR_EXTENSION}",
            destination_stem(&title.title, source_path)
        );

        MetadataRecord {
            title,
            authors,
            date,
            summary,
            source_path: source_path.to_path_buf(),
            destination_filename,
        }
    }
}

/// Sanitized title, or the sanitized source stem when the title has no
/// usable characters, or [`UNTITLED`].
pub fn destination_stem(title: &str, source_path: &Path) -> String {
    let from_title = sanitize_filename(title);
    if !from_title.is_empty() {
        return from_title;
    }
    let from_source = fallback_stem(source_path);
    if !from_source.is_empty() {
        return from_source;
    }
    UNTITLED.to_string()
}

/// File name for a renamed copy: the stem of `destination` with the
/// extension of `source`.
pub fn copy_file_name(destination: &str, source: &Path) -> String {
    let stem = Path::new(destination)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    match source.extension() {
        Some(ext) => format!("{stem}.{}", ext.to_string_lossy()),
        None => stem,
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn title(s: &str) -> TitleResult {
        TitleResult {
            title: s.to_string(),
            line_number: 1,
        }
    }

    fn assemble(t: TitleResult, source: &str) -> MetadataRecord {
        RecordAssembler::new().assemble(
            t,
            AuthorsResult::default(),
            None,
            SummaryResult::default(),
            Path::new(source),
        )
    }

    #[test]
    fn test_destination_from_title() {
        let record = assemble(title("Attention Is All You Need"), "/papers/1706.03762.pdf");
        assert_eq!(record.destination_filename, "Attention_Is_All_You_Need.json");
        assert_eq!(record.title.title, "Attention Is All You Need");
        assert_eq!(record.source_path, PathBuf::from("/papers/1706.03762.pdf"));
    }

    #[test]
    fn test_empty_title_falls_back_to_stem() {
        let record = assemble(TitleResult::default(), "/papers/my paper (draft).pdf");
        assert_eq!(record.title.title, "my_paper_draft");
        assert_eq!(record.title.line_number, 0);
        assert_eq!(record.destination_filename, "my_paper_draft.json");
    }

    #[test]
    fn test_fallback_is_deterministic() {
        let a = assemble(title("   "), "/x/scan-0042.pdf");
        let b = assemble(TitleResult::default(), "/x/scan-0042.pdf");
        assert_eq!(a.destination_filename, "scan-0042.json");
        assert_eq!(a.destination_filename, b.destination_filename);
    }

    #[test]
    fn test_unsanitizable_title_uses_stem_for_file_name() {
        let record = assemble(title("深層学習"), "/x/deep.pdf");
        assert_eq!(record.title.title, "深層学習");
        assert_eq!(record.destination_filename, "deep.json");
    }

    #[test]
    fn test_nothing_usable_is_untitled() {
        assert_eq!(destination_stem("", Path::new("/x/数据.pdf")), "untitled");
    }

    #[test]
    fn test_inputs_are_carried_through() {
        let authors = AuthorsResult {
            authors_display: "Jane Doe".into(),
            authors_list: vec!["Jane Doe".into()],
            line_number: 2,
        };
        let date = DetectedDate {
            date_value: "2023-03-15".into(),
            source_line: "15 March 2023".into(),
        };
        let record = RecordAssembler::new().assemble(
            title("A Title"),
            authors.clone(),
            Some(date.clone()),
            SummaryResult {
                summary: "Short.".into(),
            },
            Path::new("a.pdf"),
        );
        assert_eq!(record.authors, authors);
        assert_eq!(record.date, Some(date));
        assert_eq!(record.summary.summary, "Short.");
    }

    #[test]
    fn test_copy_file_name() {
        assert_eq!(
            copy_file_name("Attention_Is_All_You_Need.json", Path::new("/in/1706.03762.pdf")),
            "Attention_Is_All_You_Need.pdf"
        );
        assert_eq!(copy_file_name("Notes.json", Path::new("/in/README")), "Notes");
    }
}

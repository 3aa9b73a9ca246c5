//! Single-document processing.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use papermeta_core::{BackendError, MetadataRecord, PdfBackend, PipelineConfig};
use papermeta_llm::{ChatModel, MetadataExtractor};
use papermeta_parsing::{
    Accumulation, DateDetector, HeaderBlock, HeaderSplitter, PageAccumulator, ParsingError,
};

use crate::ProcessError;
use crate::record::RecordAssembler;
use crate::sidecar::write_sidecar;

/// Header split of a document, computed without any model calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderPreview {
    pub path: PathBuf,
    pub page_count: usize,
    pub header_pages: usize,
    pub header: HeaderBlock,
}

/// Turns one PDF into a [`MetadataRecord`].
///
/// Pages are read on a blocking thread; the three model calls then run in
/// order on the async runtime. A pipeline holds no per-document state and
/// can be shared between workers behind an `Arc`.
pub struct Pipeline {
    backend: Arc<dyn PdfBackend>,
    accumulator: PageAccumulator,
    splitter: HeaderSplitter,
    extractor: MetadataExtractor,
    assembler: RecordAssembler,
    config: Arc<PipelineConfig>,
}

impl Pipeline {
    pub fn new(
        backend: Arc<dyn PdfBackend>,
        chat: Arc<dyn ChatModel>,
        config: Arc<PipelineConfig>,
    ) -> Self {
        Self {
            backend,
            accumulator: PageAccumulator::from_config(&config),
            splitter: HeaderSplitter::from_config(&config),
            extractor: MetadataExtractor::new(chat, &config.llm),
            assembler: RecordAssembler::new(),
            config,
        }
    }

    pub fn with_date_detector(mut self, detector: Arc<dyn DateDetector>) -> Self {
        self.splitter = self.splitter.with_detector(detector);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Extract the metadata record for `path`. Nothing is written.
    pub async fn process(&self, path: &Path) -> Result<MetadataRecord, ProcessError> {
        tracing::debug!(path = %path.display(), "processing document");
        let accumulation = self.read_pages(path).await?;
        let header = self.splitter.split(&accumulation.header_lines);
        tracing::debug!(
            path = %path.display(),
            date = header.date.as_ref().map(|d| d.date_value.as_str()).unwrap_or("-"),
            candidates = header.candidate_lines.len(),
            "header split"
        );

        let title = self.extractor.extract_title(&header.candidate_lines).await?;
        let authors = self.extractor.extract_authors(&header.candidate_lines).await?;
        let summary = self.extractor.extract_summary(&accumulation.summary_text).await?;

        let record = self
            .assembler
            .assemble(title, authors, header.date, summary, path);
        tracing::debug!(
            path = %path.display(),
            destination = %record.destination_filename,
            "record assembled"
        );
        Ok(record)
    }

    /// [`process`](Self::process), then write the sidecar into the
    /// configured output directory. See [`write_sidecar`] for how a
    /// destination already used by another document is handled.
    pub async fn process_and_write(&self, path: &Path) -> Result<(MetadataRecord, PathBuf), ProcessError> {
        let record = self.process(path).await?;
        let sidecar = write_sidecar(&self.config.output_dir, &record)?;
        // A name collision with another document moves the sidecar to a
        // suffixed name; the returned record reports where it went.
        let record = match sidecar.file_name().map(|n| n.to_string_lossy().into_owned()) {
            Some(name) if name != record.destination_filename => MetadataRecord {
                destination_filename: name,
                ..record
            },
            _ => record,
        };
        Ok((record, sidecar))
    }

    /// Read pages and split the header, without contacting the model.
    pub async fn preview(&self, path: &Path) -> Result<HeaderPreview, ProcessError> {
        let accumulation = self.read_pages(path).await?;
        Ok(HeaderPreview {
            path: path.to_path_buf(),
            page_count: accumulation.page_count,
            header_pages: accumulation.header_pages,
            header: self.splitter.split(&accumulation.header_lines),
        })
    }

    /// Open the document and accumulate its pages on a blocking thread.
    ///
    /// The open document never leaves the blocking task.
    async fn read_pages(&self, path: &Path) -> Result<Accumulation, ProcessError> {
        let backend = Arc::clone(&self.backend);
        let accumulator = self.accumulator.clone();
        let path = path.to_path_buf();

        tokio::task::spawn_blocking(move || {
            let document = backend
                .open(&path)
                .map_err(|source| ProcessError::DocumentUnreadable {
                    path: path.clone(),
                    source,
                })?;
            accumulator
                .accumulate(document.as_ref())
                .map_err(|err| match err {
                    ParsingError::EmptyDocument => ProcessError::DocumentUnreadable {
                        path: path.clone(),
                        source: BackendError::ExtractionError("document has no pages".into()),
                    },
                    ParsingError::Page { page, source } => ProcessError::PageDecode { page, source },
                })
        })
        .await
        .map_err(|e| ProcessError::Worker(e.to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use papermeta_core::{MemoryBackend, MemoryDocument};
    use papermeta_llm::{MockChat, MockReply};

    use super::*;

    const TITLE_REPLY: &str = r#"{"line_number": 1, "title": "Deep Residual Learning"}"#;
    const AUTHORS_REPLY: &str =
        r#"{"line_number": 2, "line": "Kaiming He, Xiangyu Zhang", "authors": ["Kaiming He", "Xiangyu Zhang"]}"#;
    const SUMMARY_REPLY: &str = r#"{"abstract": "Residual nets ease training."}"#;

    fn scripted_chat() -> Arc<MockChat> {
        Arc::new(
            MockChat::replying("{}")
                .on_system("title", MockReply::text(TITLE_REPLY))
                .on_system("authors", MockReply::text(AUTHORS_REPLY))
                .on_system("abstract", MockReply::text(SUMMARY_REPLY)),
        )
    }

    fn pipeline(backend: MemoryBackend, chat: Arc<MockChat>) -> Pipeline {
        Pipeline::new(Arc::new(backend), chat, Arc::new(PipelineConfig::default()))
    }

    const PAPER: &str = "Microsoft Research, 10 December 2015\n\
        Deep Residual Learning for Image Recognition\n\
        Kaiming He, Xiangyu Zhang\n\
        Abstract: deeper networks are harder to train.";

    #[tokio::test]
    async fn test_process_assembles_record() {
        let backend = MemoryBackend::new().with_document("/in/resnet.pdf", MemoryDocument::new([PAPER]));
        let chat = scripted_chat();
        let record = pipeline(backend, chat.clone())
            .process(Path::new("/in/resnet.pdf"))
            .await
            .unwrap();

        assert_eq!(record.title.title, "Deep Residual Learning");
        assert_eq!(record.authors.authors_list, vec!["Kaiming He", "Xiangyu Zhang"]);
        assert_eq!(record.summary.summary, "Residual nets ease training.");
        let date = record.date.unwrap();
        assert_eq!(date.date_value, "2015-12-10");
        assert_eq!(date.source_line, "Microsoft Research, 10 December 2015");
        assert_eq!(record.destination_filename, "Deep_Residual_Learning.json");

        let requests = chat.requests();
        assert_eq!(requests.len(), 3);
        // The date line is not sent as a candidate.
        assert!(!requests[0].user.contains("Microsoft Research"));
        assert!(requests[2].user.starts_with("Microsoft Research"));
    }

    #[tokio::test]
    async fn test_no_date_skips_title_and_authors() {
        let backend = MemoryBackend::new().with_document(
            "/in/undated paper.pdf",
            MemoryDocument::new(["A Paper Without Any Date\nSomebody Important"]),
        );
        let chat = scripted_chat();
        let record = pipeline(backend, chat.clone())
            .process(Path::new("/in/undated paper.pdf"))
            .await
            .unwrap();

        assert!(record.date.is_none());
        assert_eq!(record.title.title, "undated_paper");
        assert_eq!(record.destination_filename, "undated_paper.json");
        assert!(record.authors.authors_list.is_empty());
        // Only the summary was requested.
        assert_eq!(chat.call_count(), 1);
    }

    #[tokio::test]
    async fn test_unknown_document_is_unreadable() {
        let err = pipeline(MemoryBackend::new(), scripted_chat())
            .process(Path::new("/in/missing.pdf"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProcessError::DocumentUnreadable { .. }));
    }

    #[tokio::test]
    async fn test_zero_pages_is_unreadable() {
        let backend = MemoryBackend::new()
            .with_document("/in/empty.pdf", MemoryDocument::new(Vec::<String>::new()));
        let err = pipeline(backend, scripted_chat())
            .process(Path::new("/in/empty.pdf"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProcessError::DocumentUnreadable { .. }));
    }

    #[tokio::test]
    async fn test_broken_page_is_page_decode_error() {
        let doc = MemoryDocument::new(["tiny", "broken"]).with_broken_page(1);
        let backend = MemoryBackend::new().with_document("/in/broken.pdf", doc);
        let err = pipeline(backend, scripted_chat())
            .process(Path::new("/in/broken.pdf"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProcessError::PageDecode { page: 1, .. }));
    }

    #[tokio::test]
    async fn test_transport_failure_is_fatal() {
        let backend = MemoryBackend::new().with_document("/in/resnet.pdf", MemoryDocument::new([PAPER]));
        let chat = Arc::new(MockChat::new(MockReply::Fail("connection refused".into())));
        let err = pipeline(backend, chat)
            .process(Path::new("/in/resnet.pdf"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProcessError::Transport(_)));
    }

    #[tokio::test]
    async fn test_preview_makes_no_model_calls() {
        let backend = MemoryBackend::new().with_document("/in/resnet.pdf", MemoryDocument::new([PAPER]));
        let chat = scripted_chat();
        let preview = pipeline(backend, chat.clone())
            .preview(Path::new("/in/resnet.pdf"))
            .await
            .unwrap();
        assert_eq!(preview.page_count, 1);
        assert_eq!(preview.header.candidate_lines.len(), 3);
        assert_eq!(chat.call_count(), 0);
    }
}

use std::sync::Arc;

use papermeta_core::{AuthorsResult, LlmConfig, SummaryResult, TitleResult};

use crate::response::{self, ParseFailure};
use crate::{ChatError, ChatModel, ChatRequest};

pub const TITLE_PROMPT: &str = "You are a helpful assistant that extracts information from text. \
The user will provide the first lines of a document, which likely contain its title. \
Find the line or lines holding the full title of the paper. \
Return JSON of the form {\"line_number\": <1-based line where the title starts>, \"title\": \"<full title>\"}.";

pub const AUTHORS_PROMPT: &str = "You are a helpful assistant that extracts information from text. \
The user will provide the first lines of a document, one per line. \
Find the line most likely to contain the names of the authors. \
Return JSON of the form {\"line_number\": <1-based line number>, \"line\": \"<the line as written>\", \
\"authors\": [\"<first author>\", \"<second author>\"]}.";

pub const SUMMARY_PROMPT: &str = "You are a helpful assistant that extracts information from text. \
The user will provide a text document. Write a 1-2 paragraph abstract of it. \
Return JSON of the form {\"summary\": \"<abstract>\"}.";

/// Asks a [`ChatModel`] for the title, authors and summary of a document.
///
/// Each operation fails only when the model cannot be reached. A reply that
/// cannot be parsed is logged and turned into the empty result.
///
/// Empty input is never sent: with no candidate lines (no date found under
/// [`CandidatePolicy::AfterDate`](papermeta_core::CandidatePolicy::AfterDate))
/// the title and authors calls return their empty results without contacting
/// the model, and a blank summary text does the same for the summary call.
#[derive(Clone)]
pub struct MetadataExtractor {
    chat: Arc<dyn ChatModel>,
    title_model: String,
    authors_model: String,
    summary_model: String,
}

impl MetadataExtractor {
    pub fn new(chat: Arc<dyn ChatModel>, config: &LlmConfig) -> Self {
        Self {
            chat,
            title_model: config.title_model.clone(),
            authors_model: config.authors_model.clone(),
            summary_model: config.summary_model.clone(),
        }
    }

    /// Candidate lines are joined with single spaces. Returns the empty
    /// result without a model call when `candidate_lines` is empty.
    pub async fn extract_title(&self, candidate_lines: &[String]) -> Result<TitleResult, ChatError> {
        if candidate_lines.is_empty() {
            tracing::info!("no candidate lines, skipping title extraction");
            return Ok(TitleResult::default());
        }
        let request = ChatRequest::new(&self.title_model, TITLE_PROMPT, candidate_lines.join(" "));
        let reply = self.send(&request).await?;
        Ok(accept(response::parse_title(&reply)))
    }

    /// Candidate lines are joined with newlines. Returns the empty result
    /// without a model call when `candidate_lines` is empty.
    pub async fn extract_authors(&self, candidate_lines: &[String]) -> Result<AuthorsResult, ChatError> {
        if candidate_lines.is_empty() {
            tracing::info!("no candidate lines, skipping authors extraction");
            return Ok(AuthorsResult::default());
        }
        let request = ChatRequest::new(&self.authors_model, AUTHORS_PROMPT, candidate_lines.join("\n"));
        let reply = self.send(&request).await?;
        Ok(accept(response::parse_authors(&reply)))
    }

    pub async fn extract_summary(&self, text: &str) -> Result<SummaryResult, ChatError> {
        if text.trim().is_empty() {
            tracing::info!("document has no text, skipping summary");
            return Ok(SummaryResult::default());
        }
        let request = ChatRequest::new(&self.summary_model, SUMMARY_PROMPT, text);
        let reply = self.send(&request).await?;
        Ok(accept(response::parse_summary(&reply)))
    }

    async fn send(&self, request: &ChatRequest) -> Result<String, ChatError> {
        tracing::debug!(backend = self.chat.name(), model = %request.model, "asking model");
        self.chat.chat(request).await
    }
}

fn accept<T: Default>(parsed: Result<T, ParseFailure>) -> T {
    match parsed {
        Ok(value) => value,
        Err(failure) => {
            tracing::warn!(
                stage = %failure.stage,
                reason = %failure.reason,
                raw = %failure.raw,
                "could not parse model reply, using empty result"
            );
            T::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MockChat, MockReply};

    fn lines(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn extractor(mock: &Arc<MockChat>) -> MetadataExtractor {
        let config = LlmConfig {
            title_model: "title-model".into(),
            authors_model: "authors-model".into(),
            summary_model: "summary-model".into(),
            ..LlmConfig::default()
        };
        MetadataExtractor::new(mock.clone(), &config)
    }

    #[tokio::test]
    async fn test_title_request_and_reply() {
        let mock = Arc::new(MockChat::replying(
            "```json\n{\"line_number\": 1, \"title\": \"Attention Is All You Need\"}\n```",
        ));
        let title = extractor(&mock)
            .extract_title(&lines(&["Attention Is All", "You Need", "Ashish Vaswani"]))
            .await
            .unwrap();
        assert_eq!(title.title, "Attention Is All You Need");
        assert_eq!(title.line_number, 1);

        let requests = mock.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].model, "title-model");
        assert_eq!(requests[0].system, TITLE_PROMPT);
        assert_eq!(requests[0].user, "Attention Is All You Need Ashish Vaswani");
    }

    #[tokio::test]
    async fn test_authors_payload_is_newline_joined() {
        let mock = Arc::new(MockChat::replying(
            r#"{"line_number": 2, "line": "Jane Doe and John Roe", "authors": ["Jane Doe", "John Roe"]}"#,
        ));
        let authors = extractor(&mock)
            .extract_authors(&lines(&["A Title", "Jane Doe and John Roe"]))
            .await
            .unwrap();
        assert_eq!(authors.authors_list, vec!["Jane Doe", "John Roe"]);
        assert_eq!(authors.authors_display, "Jane Doe and John Roe");
        assert_eq!(authors.line_number, 2);
        assert_eq!(mock.requests()[0].user, "A Title\nJane Doe and John Roe");
        assert_eq!(mock.requests()[0].model, "authors-model");
    }

    #[tokio::test]
    async fn test_malformed_reply_yields_default() {
        let mock = Arc::new(MockChat::replying("{not json"));
        let ex = extractor(&mock);
        let candidates = lines(&["Some candidate line"]);
        assert_eq!(ex.extract_title(&candidates).await.unwrap(), TitleResult::default());
        assert_eq!(ex.extract_authors(&candidates).await.unwrap(), AuthorsResult::default());
        assert_eq!(ex.extract_summary("body text").await.unwrap(), SummaryResult::default());
        assert_eq!(mock.call_count(), 3);
    }

    #[tokio::test]
    async fn test_summary_from_abstract() {
        let mock = Arc::new(MockChat::replying(r#"{"abstract": "We study transformers."}"#));
        let summary = extractor(&mock).extract_summary("page one\npage two").await.unwrap();
        assert_eq!(summary.summary, "We study transformers.");
        assert_eq!(mock.requests()[0].system, SUMMARY_PROMPT);
        assert_eq!(mock.requests()[0].user, "page one\npage two");
    }

    #[tokio::test]
    async fn test_empty_inputs_skip_the_model() {
        let mock = Arc::new(MockChat::replying(r#"{"title": "never asked"}"#));
        let ex = extractor(&mock);
        assert!(ex.extract_title(&[]).await.unwrap().is_empty());
        assert!(ex.extract_authors(&[]).await.unwrap().authors_list.is_empty());
        assert!(ex.extract_summary("  \n ").await.unwrap().summary.is_empty());
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn test_transport_failure_propagates() {
        let mock = Arc::new(MockChat::new(MockReply::Fail("connection refused".into())));
        let err = extractor(&mock)
            .extract_title(&lines(&["A candidate line"]))
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::Unavailable(_)));
    }
}

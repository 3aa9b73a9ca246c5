//! Language-model side of metadata extraction.
//!
//! [`ChatModel`] is the seam to the model server. [`OllamaChat`] talks to a
//! local Ollama instance and [`RateLimitedChat`] spaces requests across
//! workers. [`MetadataExtractor`] builds the prompts and turns replies into
//! structured results via [`response`].
//!
//! The `test-support` feature exposes `MockChat`, a scripted model for tests
//! in dependent crates.

use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

pub mod extractor;
pub mod limiter;
#[cfg(any(test, feature = "test-support"))]
pub mod mock;
pub mod ollama;
pub mod response;

pub use extractor::MetadataExtractor;
pub use limiter::RateLimitedChat;
#[cfg(any(test, feature = "test-support"))]
pub use mock::{MockChat, MockReply};
pub use ollama::OllamaChat;
pub use response::{ParseFailure, Stage, normalize_reply, parse_authors, parse_summary, parse_title};

/// One system + user exchange with a named model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRequest {
    pub model: String,
    pub system: String,
    pub user: String,
}

impl ChatRequest {
    pub fn new(model: impl Into<String>, system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            system: system.into(),
            user: user.into(),
        }
    }
}

/// Failure of the chat transport itself. Malformed JSON inside a reply is
/// not a `ChatError`; see [`ParseFailure`].
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} returned HTTP {status}: {body}")]
    Status { url: String, status: u16, body: String },
    #[error("malformed chat response: {0}")]
    MalformedResponse(String),
    #[error("chat model unavailable: {0}")]
    Unavailable(String),
}

/// A language model that answers a single chat request with free text.
pub trait ChatModel: Send + Sync {
    /// Short label used in logs, e.g. `"ollama"`.
    fn name(&self) -> &str;

    fn chat<'a>(
        &'a self,
        request: &'a ChatRequest,
    ) -> Pin<Box<dyn Future<Output = Result<String, ChatError>> + Send + 'a>>;
}

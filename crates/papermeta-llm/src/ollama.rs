//! Ollama `/api/chat` client.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use papermeta_core::LlmConfig;
use serde::{Deserialize, Serialize};

use crate::{ChatError, ChatModel, ChatRequest};

/// Chat backend for a local or remote Ollama server.
pub struct OllamaChat {
    /// Base URL, e.g. `http://localhost:11434`.
    pub host: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl OllamaChat {
    pub fn new(host: impl Into<String>, timeout: Duration) -> Self {
        Self {
            host: host.into(),
            timeout,
            client: reqwest::Client::new(),
        }
    }

    pub fn from_config(config: &LlmConfig) -> Self {
        Self::new(config.host.clone(), Duration::from_secs(config.timeout_secs))
    }

    pub fn endpoint(&self) -> String {
        format!("{}/api/chat", self.host.trim_end_matches('/'))
    }

    /// Check that the server answers at all. Used by the CLI before a batch.
    pub async fn check_connectivity(&self) -> Result<(), ChatError> {
        let url = format!("{}/api/tags", self.host.trim_end_matches('/'));
        match self
            .client
            .get(&url)
            .timeout(Duration::from_secs(3))
            .send()
            .await
        {
            Ok(resp) if resp.status().is_success() => Ok(()),
            Ok(resp) => Err(ChatError::Status {
                url,
                status: resp.status().as_u16(),
                body: String::new(),
            }),
            Err(e) if e.is_connect() => Err(ChatError::Unavailable(format!(
                "cannot connect to Ollama at {} - is it running?",
                self.host
            ))),
            Err(source) => Err(ChatError::Http { url, source }),
        }
    }
}

#[derive(Serialize)]
struct ChatBody<'a> {
    model: &'a str,
    messages: [Message<'a>; 2],
    stream: bool,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponseBody {
    message: Option<ResponseMessage>,
    error: Option<String>,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// Pull `message.content` out of a non-streaming `/api/chat` response.
fn reply_content(body: &str) -> Result<String, ChatError> {
    let parsed: ChatResponseBody = serde_json::from_str(body)
        .map_err(|e| ChatError::MalformedResponse(format!("{e}: {body}")))?;
    if let Some(err) = parsed.error {
        return Err(ChatError::Unavailable(err));
    }
    parsed
        .message
        .and_then(|m| m.content)
        .ok_or_else(|| ChatError::MalformedResponse(format!("no message.content in {body}")))
}

impl ChatModel for OllamaChat {
    fn name(&self) -> &str {
        "ollama"
    }

    fn chat<'a>(
        &'a self,
        request: &'a ChatRequest,
    ) -> Pin<Box<dyn Future<Output = Result<String, ChatError>> + Send + 'a>> {
        Box::pin(async move {
            let url = self.endpoint();
            let body = ChatBody {
                model: &request.model,
                messages: [
                    Message {
                        role: "system",
                        content: &request.system,
                    },
                    Message {
                        role: "user",
                        content: &request.user,
                    },
                ],
                stream: false,
            };

            tracing::debug!(model = %request.model, url = %url, chars = request.user.len(), "chat request");
            let resp = self
                .client
                .post(&url)
                .json(&body)
                .timeout(self.timeout)
                .send()
                .await
                .map_err(|source| ChatError::Http {
                    url: url.clone(),
                    source,
                })?;

            let status = resp.status();
            let text = resp.text().await.map_err(|source| ChatError::Http {
                url: url.clone(),
                source,
            })?;
            if !status.is_success() {
                return Err(ChatError::Status {
                    url,
                    status: status.as_u16(),
                    body: text,
                });
            }
            reply_content(&text)
        })
    }
}

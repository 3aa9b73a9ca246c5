//! Mock chat model for testing.

use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::{ChatError, ChatModel, ChatRequest};

/// A scripted reply for [`MockChat`].
#[derive(Clone, Debug)]
pub enum MockReply {
    /// Return this text verbatim.
    Text(String),
    /// Fail with [`ChatError::Unavailable`].
    Fail(String),
}

impl MockReply {
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }
}

/// A hand-rolled mock implementing [`ChatModel`] for tests.
///
/// Replies are chosen in this order:
/// - the first scripted reply whose keyword occurs in the system prompt
///   (see [`on_system`](MockChat::on_system)), so title, authors and
///   summary calls can be answered independently;
/// - otherwise the next reply of the sequence, repeating the last one;
/// - otherwise the fallback.
///
/// Every request is recorded and can be inspected with
/// [`requests()`](MockChat::requests).
pub struct MockChat {
    keyed: Vec<(String, MockReply)>,
    sequence: Mutex<Vec<MockReply>>,
    fallback: MockReply,
    delay: Option<Duration>,
    requests: Mutex<Vec<ChatRequest>>,
    call_count: AtomicUsize,
}

impl MockChat {
    /// A mock that always answers with `reply`.
    pub fn new(reply: MockReply) -> Self {
        Self {
            keyed: Vec::new(),
            sequence: Mutex::new(Vec::new()),
            fallback: reply,
            delay: None,
            requests: Mutex::new(Vec::new()),
            call_count: AtomicUsize::new(0),
        }
    }

    /// A mock that always answers with the given text.
    pub fn replying(text: impl Into<String>) -> Self {
        Self::new(MockReply::text(text))
    }

    /// A mock that answers with `replies` in order, repeating the last one.
    pub fn with_sequence(mut replies: Vec<MockReply>) -> Self {
        let fallback = replies
            .last()
            .cloned()
            .unwrap_or_else(|| MockReply::Fail("no scripted reply".into()));
        replies.reverse();
        let mut mock = Self::new(fallback);
        mock.sequence = Mutex::new(replies);
        mock
    }

    /// Answer with `reply` whenever the system prompt contains `keyword`.
    pub fn on_system(mut self, keyword: impl Into<String>, reply: MockReply) -> Self {
        self.keyed.push((keyword.into(), reply));
        self
    }

    /// Simulate model latency per call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    fn next_reply(&self, request: &ChatRequest) -> MockReply {
        if let Some((_, reply)) = self
            .keyed
            .iter()
            .find(|(keyword, _)| request.system.contains(keyword.as_str()))
        {
            return reply.clone();
        }
        self.sequence
            .lock()
            .ok()
            .and_then(|mut seq| seq.pop())
            .unwrap_or_else(|| self.fallback.clone())
    }
}

impl ChatModel for MockChat {
    fn name(&self) -> &str {
        "mock"
    }

    fn chat<'a>(
        &'a self,
        request: &'a ChatRequest,
    ) -> Pin<Box<dyn Future<Output = Result<String, ChatError>> + Send + 'a>> {
        Box::pin(async move {
            self.call_count.fetch_add(1, Ordering::SeqCst);
            if let Ok(mut requests) = self.requests.lock() {
                requests.push(request.clone());
            }
            let reply = self.next_reply(request);

            if let Some(d) = self.delay {
                tokio::time::sleep(d).await;
            }

            match reply {
                MockReply::Text(text) => Ok(text),
                MockReply::Fail(msg) => Err(ChatError::Unavailable(msg)),
            }
        })
    }
}

//! Request spacing for a shared chat model.
//!
//! Batch workers share one [`RateLimitedChat`]; each request waits for a
//! governor permit via `until_ready()` before it is forwarded.

use std::future::Future;
use std::num::NonZeroU32;
use std::pin::Pin;
use std::sync::Arc;

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};

use crate::{ChatError, ChatModel, ChatRequest};

type DirectLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Wraps a [`ChatModel`] so that requests never exceed a [`Quota`].
pub struct RateLimitedChat {
    inner: Arc<dyn ChatModel>,
    limiter: DirectLimiter,
}

impl RateLimitedChat {
    pub fn new(inner: Arc<dyn ChatModel>, quota: Quota) -> Self {
        Self {
            inner,
            limiter: RateLimiter::direct(quota),
        }
    }

    pub fn per_minute(inner: Arc<dyn ChatModel>, requests: NonZeroU32) -> Self {
        Self::new(inner, Quota::per_minute(requests))
    }

    /// Wrap `inner` when a limit is configured; otherwise return it unchanged.
    pub fn wrap(inner: Arc<dyn ChatModel>, requests_per_minute: Option<u32>) -> Arc<dyn ChatModel> {
        match requests_per_minute.and_then(NonZeroU32::new) {
            Some(n) => {
                tracing::debug!(requests_per_minute = n.get(), model = inner.name(), "rate limiting chat model");
                Arc::new(Self::per_minute(inner, n))
            }
            None => inner,
        }
    }
}

impl ChatModel for RateLimitedChat {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn chat<'a>(
        &'a self,
        request: &'a ChatRequest,
    ) -> Pin<Box<dyn Future<Output = Result<String, ChatError>> + Send + 'a>> {
        Box::pin(async move {
            self.limiter.until_ready().await;
            self.inner.chat(request).await
        })
    }
}

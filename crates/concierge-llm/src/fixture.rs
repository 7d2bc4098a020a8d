use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::provider::{ChatRequest, ChatResponse, LlmProvider, ProviderError};

/// A deterministic provider for tests: returns canned responses in order,
/// or a fixed error, without touching the network. Grounded in
/// `skynet-agent::router`'s `AlwaysFail`/`AlwaysOk` test doubles.
pub struct FixtureProvider {
    responses: Vec<String>,
    cursor: AtomicUsize,
    fail_with: Option<String>,
}

impl FixtureProvider {
    /// Returns each string in `responses` in turn, cycling once exhausted.
    pub fn ok(responses: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            responses: responses.into_iter().map(Into::into).collect(),
            cursor: AtomicUsize::new(0),
            fail_with: None,
        }
    }

    /// Always returns `ProviderError::Unavailable(reason)`.
    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            responses: Vec::new(),
            cursor: AtomicUsize::new(0),
            fail_with: Some(reason.into()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.cursor.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmProvider for FixtureProvider {
    fn name(&self) -> &str {
        "fixture"
    }

    async fn send(&self, _req: &ChatRequest) -> Result<ChatResponse, ProviderError> {
        if let Some(reason) = &self.fail_with {
            self.cursor.fetch_add(1, Ordering::SeqCst);
            return Err(ProviderError::Unavailable(reason.clone()));
        }

        if self.responses.is_empty() {
            return Err(ProviderError::Unavailable("fixture has no responses queued".into()));
        }

        let i = self.cursor.fetch_add(1, Ordering::SeqCst);
        let content = self.responses[i % self.responses.len()].clone();
        Ok(ChatResponse {
            content,
            model: "fixture-model".into(),
            tokens_in: 0,
            tokens_out: 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dummy_request() -> ChatRequest {
        ChatRequest::single_turn("fixture-model", "system prompt", "hello")
    }

    #[tokio::test]
    async fn cycles_through_queued_responses() {
        let provider = FixtureProvider::ok(vec!["one", "two"]);
        let a = provider.send(&dummy_request()).await.unwrap();
        let b = provider.send(&dummy_request()).await.unwrap();
        let c = provider.send(&dummy_request()).await.unwrap();
        assert_eq!(a.content, "one");
        assert_eq!(b.content, "two");
        assert_eq!(c.content, "one");
    }

    #[tokio::test]
    async fn failing_provider_always_errs() {
        let provider = FixtureProvider::failing("simulated outage");
        let err = provider.send(&dummy_request()).await.unwrap_err();
        assert!(matches!(err, ProviderError::Unavailable(_)));
    }
}

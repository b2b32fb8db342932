//! LlmClient trait definition

use async_trait::async_trait;

use super::{CompletionRequest, CompletionResponse, LlmError};

/// Stateless LLM client - each call is independent
///
/// The analyzer builds a complete request per call; no conversation
/// state is kept between completions.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send a single completion request (blocking until complete)
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError>;
}

#[cfg(test)]
pub mod mock {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::llm::{StopReason, TokenUsage};

    /// Mock LLM client for unit tests - replays canned responses in order
    pub struct MockLlmClient {
        responses: Vec<Result<CompletionResponse, LlmError>>,
        call_count: AtomicUsize,
    }

    impl MockLlmClient {
        pub fn new(responses: Vec<Result<String, LlmError>>) -> Self {
            Self::from_responses(
                responses
                    .into_iter()
                    .map(|r| r.map(Self::complete_response))
                    .collect(),
            )
        }

        /// A client replaying full responses, for stop-reason scenarios
        pub fn from_responses(responses: Vec<Result<CompletionResponse, LlmError>>) -> Self {
            Self {
                responses,
                call_count: AtomicUsize::new(0),
            }
        }

        /// A client that always returns the same content
        pub fn always(content: impl Into<String>) -> Self {
            Self::new(vec![Ok(content.into())])
        }

        /// A response that ended normally
        pub fn complete_response(content: impl Into<String>) -> CompletionResponse {
            CompletionResponse {
                content: Some(content.into()),
                stop_reason: StopReason::EndTurn,
                usage: TokenUsage::default(),
            }
        }

        /// A response cut off at the token limit
        pub fn truncated_response(content: impl Into<String>) -> CompletionResponse {
            CompletionResponse {
                content: Some(content.into()),
                stop_reason: StopReason::MaxTokens,
                usage: TokenUsage::default(),
            }
        }

        pub fn call_count(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl LlmClient for MockLlmClient {
        async fn complete(&self, _request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
            let idx = self.call_count.fetch_add(1, Ordering::SeqCst);
            // `always` replays its single response forever
            let idx = idx.min(self.responses.len().saturating_sub(1));
            match self.responses.get(idx) {
                Some(Ok(response)) => Ok(response.clone()),
                Some(Err(e)) => Err(LlmError::InvalidResponse(e.to_string())),
                None => Err(LlmError::InvalidResponse("No more mock responses".to_string())),
            }
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[tokio::test]
        async fn test_mock_client_replays_in_order() {
            let client = MockLlmClient::new(vec![Ok("one".to_string()), Ok("two".to_string())]);

            let req = CompletionRequest {
                system_prompt: "Test".to_string(),
                messages: vec![],
                max_tokens: 100,
                json: false,
            };

            let resp = client.complete(req.clone()).await.unwrap();
            assert_eq!(resp.content, Some("one".to_string()));

            let resp = client.complete(req).await.unwrap();
            assert_eq!(resp.content, Some("two".to_string()));
            assert_eq!(client.call_count(), 2);
        }
    }
}

//! Embedding client with input normalization and retry.

use std::time::Duration;

use tracing::{debug, error, warn};

use crate::Embedding;
use crate::error::{EmbeddingError, Result};
use crate::preprocess::normalize_input;
use crate::provider::{EmbeddingProvider, EmbeddingRequest};

/// How often and how patiently to retry a failed embedding call.
///
/// The wait before attempt `n + 1` is `n * backoff_step`, so the default
/// policy sleeps 2s and then 4s before giving up on the third failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first.
    pub max_attempts: u32,

    /// Linear backoff increment.
    pub backoff_step: Duration,
}

impl RetryPolicy {
    /// Create a policy with the given attempt budget and backoff step.
    pub fn new(max_attempts: u32, backoff_step: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff_step,
        }
    }

    /// A policy that never retries.
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Delay to wait after the given 1-based attempt failed.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.backoff_step.saturating_mul(attempt)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(2))
    }
}

/// Turns free text into a fixed-length vector.
///
/// Input is normalized before it reaches the provider, transient provider
/// failures are retried per [`RetryPolicy`], and a response whose length
/// differs from the expected dimension is rejected. Failure is always
/// surfaced; the client never fabricates a vector.
pub struct EmbeddingClient<P> {
    provider: P,
    retry: RetryPolicy,
    dimension: usize,
    max_input_chars: Option<usize>,
}

impl<P> EmbeddingClient<P>
where
    P: EmbeddingProvider,
{
    /// Create a client expecting the provider's default dimension.
    pub fn new(provider: P) -> Self {
        let dimension = provider.default_dimension();
        Self {
            provider,
            retry: RetryPolicy::default(),
            dimension,
            max_input_chars: None,
        }
    }

    /// Set the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Set the expected embedding dimension.
    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.dimension = dimension;
        self
    }

    /// Reject normalized input longer than `limit` characters.
    pub fn with_max_input_chars(mut self, limit: usize) -> Self {
        self.max_input_chars = Some(limit);
        self
    }

    /// The dimension every returned vector has.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// The wrapped provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Embed `text`, retrying transient failures.
    pub async fn embed(&self, text: &str) -> Result<Embedding> {
        let input = normalize_input(text);
        if let Some(max_length) = self.max_input_chars {
            let length = input.chars().count();
            if length > max_length {
                error!("Embedding input of {length} characters exceeds limit of {max_length}");
                return Err(EmbeddingError::TextTooLong { length, max_length });
            }
        }
        let max_attempts = self.retry.max_attempts;

        let mut attempt = 1;
        loop {
            match self.embed_once(&input).await {
                Ok(embedding) => return Ok(embedding),
                Err(err) if !err.is_transient() => {
                    error!("Embedding failed with non-retryable error: {err}");
                    return Err(err);
                }
                Err(err) if attempt >= max_attempts => {
                    error!("Embedding failed after {attempt} attempts: {err}");
                    return Err(EmbeddingError::RetriesExhausted {
                        attempts: attempt,
                        source: Box::new(err),
                    });
                }
                Err(err) => {
                    let wait = self.retry.delay_after(attempt);
                    warn!(
                        "Embedding attempt {attempt}/{max_attempts} failed, retrying in {wait:?}: {err}"
                    );
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                }
            }
        }
    }

    async fn embed_once(&self, input: &str) -> Result<Embedding> {
        let response = self.provider.embed(EmbeddingRequest::new(input)).await?;
        if response.embedding.len() != self.dimension {
            return Err(EmbeddingError::DimensionMismatch {
                expected: self.dimension,
                actual: response.embedding.len(),
            });
        }
        debug!(
            "Embedded {} chars with {} ({})",
            input.len(),
            self.provider.name(),
            response.model
        );
        Ok(response.embedding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EMPTY_INPUT_PLACEHOLDER;
    use crate::provider::EmbeddingResponse;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays scripted outcomes and records every input it receives.
    struct ScriptedProvider {
        outcomes: Mutex<VecDeque<Result<Embedding>>>,
        inputs: Mutex<Vec<String>>,
    }

    impl ScriptedProvider {
        fn new(outcomes: Vec<Result<Embedding>>) -> Self {
            Self {
                outcomes: Mutex::new(outcomes.into()),
                inputs: Mutex::new(Vec::new()),
            }
        }

        fn inputs(&self) -> Vec<String> {
            self.inputs.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl EmbeddingProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        fn default_model(&self) -> &str {
            "scripted-model"
        }

        fn default_dimension(&self) -> usize {
            2
        }

        async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse> {
            self.inputs.lock().unwrap().push(request.text);
            let embedding = self
                .outcomes
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(vec![0.0, 1.0]))?;
            Ok(EmbeddingResponse {
                dimension: embedding.len(),
                embedding,
                model: "scripted-model".to_string(),
                tokens_used: None,
            })
        }

        fn is_available(&self) -> bool {
            true
        }
    }

    fn server_error() -> EmbeddingError {
        EmbeddingError::ApiRequest {
            status: 500,
            body: "upstream".to_string(),
        }
    }

    fn fast_retry() -> RetryPolicy {
        RetryPolicy::new(3, Duration::from_millis(1))
    }

    #[test]
    fn test_default_backoff_is_linear() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.delay_after(1), Duration::from_secs(2));
        assert_eq!(policy.delay_after(2), Duration::from_secs(4));
        assert_eq!(policy.delay_after(3), Duration::from_secs(6));
    }

    #[test]
    fn test_huge_backoff_saturates() {
        let policy = RetryPolicy::new(3, Duration::from_secs(u64::MAX));
        assert_eq!(policy.delay_after(2), Duration::MAX);
    }

    #[tokio::test]
    async fn test_empty_input_sends_placeholder() {
        let client = EmbeddingClient::new(ScriptedProvider::new(vec![]));
        client.embed("").await.unwrap();
        client.embed("   \n").await.unwrap();

        assert_eq!(
            client.provider().inputs(),
            vec![EMPTY_INPUT_PLACEHOLDER, EMPTY_INPUT_PLACEHOLDER]
        );
    }

    #[tokio::test]
    async fn test_recovers_after_transient_failures() {
        let provider = ScriptedProvider::new(vec![
            Err(server_error()),
            Err(server_error()),
            Ok(vec![0.6, 0.8]),
        ]);
        let client = EmbeddingClient::new(provider).with_retry(fast_retry());

        let embedding = client.embed("spec text").await.unwrap();
        assert_eq!(embedding, vec![0.6, 0.8]);
        assert_eq!(client.provider().inputs().len(), 3);
    }

    #[tokio::test]
    async fn test_exhaustion_surfaces_error() {
        let provider = ScriptedProvider::new(vec![
            Err(server_error()),
            Err(server_error()),
            Err(server_error()),
            Ok(vec![0.6, 0.8]),
        ]);
        let client = EmbeddingClient::new(provider).with_retry(fast_retry());

        let err = client.embed("spec text").await.unwrap_err();
        assert!(matches!(
            err,
            EmbeddingError::RetriesExhausted { attempts: 3, .. }
        ));
        assert_eq!(client.provider().inputs().len(), 3);
    }

    #[tokio::test]
    async fn test_non_transient_error_is_not_retried() {
        let provider = ScriptedProvider::new(vec![Err(EmbeddingError::ApiRequest {
            status: 401,
            body: "invalid key".to_string(),
        })]);
        let client = EmbeddingClient::new(provider).with_retry(fast_retry());

        let err = client.embed("spec text").await.unwrap_err();
        assert!(matches!(err, EmbeddingError::ApiRequest { status: 401, .. }));
        assert_eq!(client.provider().inputs().len(), 1);
    }

    #[tokio::test]
    async fn test_wrong_dimension_is_rejected() {
        let provider = ScriptedProvider::new(vec![Ok(vec![1.0, 0.0, 0.0])]);
        let client = EmbeddingClient::new(provider).with_retry(RetryPolicy::none());

        let err = client.embed("spec text").await.unwrap_err();
        assert!(matches!(
            err,
            EmbeddingError::DimensionMismatch {
                expected: 2,
                actual: 3
            }
        ));
    }

    #[tokio::test]
    async fn test_overlong_input_is_rejected_before_calling_provider() {
        let client = EmbeddingClient::new(ScriptedProvider::new(vec![]))
            .with_retry(fast_retry())
            .with_max_input_chars(10);

        let err = client.embed("  a spec ticket body  ").await.unwrap_err();
        assert!(matches!(
            err,
            EmbeddingError::TextTooLong {
                length: 18,
                max_length: 10
            }
        ));
        assert!(!err.is_transient());
        assert!(client.provider().inputs().is_empty());

        client.embed("  short  ").await.unwrap();
        assert_eq!(client.provider().inputs(), vec!["short"]);
    }
}

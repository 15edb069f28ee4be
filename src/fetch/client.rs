//! Upstream fetch client
//!
//! Issues a request through a [`Transport`], enforces the per-attempt
//! timeout, classifies each outcome and retries transient failures with
//! linear backoff. Every call resolves to a definite success or failure.

use super::retry::RetryPolicy;
use super::transport::{Transport, TransportError, TransportResponse, UpstreamRequest};
use crate::error::{FetchError, RETRYABLE_STATUSES};
use std::sync::Arc;
use tracing::{debug, info};

/// Body of a successful fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchSuccess {
    pub body: String,
    /// Attempts used, including the successful one
    pub attempts: u32,
}

/// Stateless across calls: each `fetch` owns its attempt counter.
#[derive(Clone)]
pub struct FetchClient {
    transport: Arc<dyn Transport>,
    policy: RetryPolicy,
}

impl FetchClient {
    pub fn new(transport: Arc<dyn Transport>, policy: RetryPolicy) -> Self {
        Self { transport, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Fetch `request`, retrying 5xx, timeouts and connection errors.
    pub async fn fetch(&self, request: &UpstreamRequest) -> Result<FetchSuccess, FetchError> {
        let result = self
            .policy
            .retry_async(
                |attempt| async move {
                    self.attempt(request, attempt)
                        .await
                        .map(|body| FetchSuccess { body, attempts: attempt })
                },
                FetchError::is_retryable,
            )
            .await;

        if let Ok(success) = &result {
            info!(
                host = request.url.host_str().unwrap_or_default(),
                attempts = success.attempts,
                bytes = success.body.len(),
                "Upstream fetch succeeded"
            );
        }
        result
    }

    async fn attempt(&self, request: &UpstreamRequest, attempt: u32) -> Result<String, FetchError> {
        let timeout = self.policy.attempt_timeout;
        debug!(attempt, path = request.url.path(), "Sending upstream request");

        match tokio::time::timeout(timeout, self.transport.get(request, timeout)).await {
            Err(_elapsed) => Err(FetchError::Timeout { attempts: attempt }),
            Ok(Err(TransportError::Timeout)) => Err(FetchError::Timeout { attempts: attempt }),
            Ok(Err(TransportError::Connection(message))) => Err(FetchError::Transport {
                message,
                attempts: attempt,
            }),
            Ok(Ok(response)) => classify_response(response, attempt),
        }
    }
}

/// Map a completed exchange to a body or a classified failure.
pub fn classify_response(response: TransportResponse, attempt: u32) -> Result<String, FetchError> {
    match response.status {
        200 if response.body.trim().is_empty() => Err(FetchError::EmptyBody),
        200 => Ok(response.body),
        status if RETRYABLE_STATUSES.contains(&status) => Err(FetchError::Server {
            status,
            attempts: attempt,
        }),
        status => Err(FetchError::Status { status }),
    }
}

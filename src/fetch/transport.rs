//! Transport seam between the fetch client and the network
//!
//! The fetch client owns retry and classification; a [`Transport`] only
//! performs one GET. Production code uses [`ReqwestTransport`]; tests
//! inject scripted transports.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Headers the upstream expects from a browser-originated request
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
pub const DEFAULT_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8,application/signed-exchange;v=b3;q=0.7";

/// A fully-formed GET request (query already encoded)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamRequest {
    pub url: Url,
    pub headers: Vec<(String, String)>,
}

impl UpstreamRequest {
    /// Request carrying the default browser headers
    pub fn new(url: Url) -> Self {
        Self {
            url,
            headers: vec![
                ("User-Agent".to_string(), DEFAULT_USER_AGENT.to_string()),
                ("Accept".to_string(), DEFAULT_ACCEPT.to_string()),
            ],
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// Status and body of one completed exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Failure below the HTTP layer
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    /// Connection reset, refused, DNS failure and the like
    #[error("connection error: {0}")]
    Connection(String),
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(
        &self,
        request: &UpstreamRequest,
        timeout: Duration,
    ) -> std::result::Result<TransportResponse, TransportError>;
}

/// `reqwest`-backed transport
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    http: Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self> {
        let http = Client::builder()
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self { http })
    }
}

fn map_reqwest_error(error: reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout
    } else {
        TransportError::Connection(error.to_string())
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn get(
        &self,
        request: &UpstreamRequest,
        timeout: Duration,
    ) -> std::result::Result<TransportResponse, TransportError> {
        let mut builder = self.http.get(request.url.clone()).timeout(timeout);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.send().await.map_err(map_reqwest_error)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(map_reqwest_error)?;

        Ok(TransportResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_carries_default_headers() {
        let url = Url::parse("https://example.org/x?a=1").unwrap();
        let request = UpstreamRequest::new(url).with_header("X-Trace", "abc");
        let names: Vec<&str> = request.headers.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["User-Agent", "Accept", "X-Trace"]);
        assert!(request.headers[1].1.contains("application/xml"));
    }

    #[tokio::test]
    async fn test_reqwest_transport_connection_refused() {
        // Port 9 on loopback is closed in test environments
        let transport = ReqwestTransport::new().unwrap();
        let request = UpstreamRequest::new(Url::parse("http://127.0.0.1:9/").unwrap());
        let err = transport
            .get(&request, Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            TransportError::Connection(_) | TransportError::Timeout
        ));
    }
}

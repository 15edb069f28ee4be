//! Upstream fetch layer
//!
//! - `transport`: one GET through an injectable [`Transport`]
//! - `retry`: linear backoff policy
//! - `client`: timeout, classification and retry around a transport

mod client;
mod retry;
mod transport;

pub use client::{classify_response, FetchClient, FetchSuccess};
pub use retry::RetryPolicy;
pub use transport::{
    ReqwestTransport, Transport, TransportError, TransportResponse, UpstreamRequest,
    DEFAULT_ACCEPT, DEFAULT_USER_AGENT,
};

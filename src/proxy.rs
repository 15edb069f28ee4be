//! HTTP proxy in front of the transaction registry
//!
//! Endpoints:
//! - GET /api/realtor  - Forward `serviceKey`, `LAWD_CD`, `DEAL_YMD`, `numOfRows`, `pageNo`
//!   upstream (with retry) and return the raw XML
//! - GET /api/debug    - DNS + TCP connectivity probe of the upstream host
//! - GET /api/health   - Health check

use crate::config::{Endpoint, PipelineConfig};
use crate::error::FetchError;
use crate::fetch::{FetchClient, UpstreamRequest};
use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use url::Url;

/// Connect timeout for the debug probe
pub const PROBE_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

const DEFAULT_NUM_OF_ROWS: &str = "100";
const DEFAULT_PAGE_NO: &str = "1";

// ============================================================================
// State
// ============================================================================

pub struct ProxyState {
    client: FetchClient,
    upstream: Url,
    probe_host: String,
    probe_port: u16,
}

impl ProxyState {
    /// Probe target defaults to the upstream URL's host and port.
    pub fn new(client: FetchClient, upstream: Url) -> Self {
        let probe_host = upstream.host_str().unwrap_or_default().to_string();
        let probe_port = upstream.port_or_known_default().unwrap_or(443);
        Self {
            client,
            upstream,
            probe_host,
            probe_port,
        }
    }

    pub fn with_probe_target(mut self, host: impl Into<String>, port: u16) -> Self {
        self.probe_host = host.into();
        self.probe_port = port;
        self
    }
}

/// Registry URL the proxy forwards to. A proxy endpoint is rejected so the
/// server never forwards to itself.
pub fn upstream_url(config: &PipelineConfig) -> anyhow::Result<Url> {
    match &config.endpoint {
        Endpoint::Direct(url) => Ok(url.clone()),
        Endpoint::Proxy(url) => anyhow::bail!(
            "REALTOR_PROXY_URL ({}) is set; the proxy must call the registry directly \
             (unset it and use REALTOR_API_BASE_URL)",
            url
        ),
    }
}

pub fn router(state: ProxyState) -> Router {
    Router::new()
        .route("/api/realtor", get(realtor))
        .route("/api/debug", get(debug_probe))
        .route("/api/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct RealtorQuery {
    #[serde(rename = "serviceKey")]
    pub service_key: Option<String>,
    #[serde(rename = "LAWD_CD")]
    pub lawd_cd: Option<String>,
    #[serde(rename = "DEAL_YMD")]
    pub deal_ymd: Option<String>,
    #[serde(rename = "numOfRows")]
    pub num_of_rows: Option<String>,
    #[serde(rename = "pageNo")]
    pub page_no: Option<String>,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

#[derive(Debug, Serialize)]
pub struct DnsProbe {
    pub success: bool,
    /// Milliseconds
    pub duration: u64,
    pub addresses: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct TcpProbe {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub ip: String,
}

#[derive(Debug, Serialize)]
pub struct DebugReport {
    pub host: String,
    pub port: u16,
    pub dns: Option<DnsProbe>,
    pub tcp: Option<TcpProbe>,
}

// ============================================================================
// Handlers
// ============================================================================

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn realtor(State(state): State<Arc<ProxyState>>, Query(query): Query<RealtorQuery>) -> Response {
    let (Some(service_key), Some(lawd_cd), Some(deal_ymd)) = (
        present(&query.service_key),
        present(&query.lawd_cd),
        present(&query.deal_ymd),
    ) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "Missing required parameters",
                "received": {
                    "hasServiceKey": present(&query.service_key).is_some(),
                    "hasLAWD_CD": present(&query.lawd_cd).is_some(),
                    "hasDEAL_YMD": present(&query.deal_ymd).is_some(),
                }
            })),
        )
            .into_response();
    };

    let mut url = state.upstream.clone();
    url.query_pairs_mut()
        .append_pair("serviceKey", service_key)
        .append_pair("LAWD_CD", lawd_cd)
        .append_pair("DEAL_YMD", deal_ymd)
        .append_pair("numOfRows", present(&query.num_of_rows).unwrap_or(DEFAULT_NUM_OF_ROWS))
        .append_pair("pageNo", present(&query.page_no).unwrap_or(DEFAULT_PAGE_NO));

    match state.client.fetch(&UpstreamRequest::new(url)).await {
        Ok(success) => {
            info!(lawd_cd, deal_ymd, attempts = success.attempts, "Proxied registry response");
            (
                [(header::CONTENT_TYPE, "application/xml; charset=utf-8")],
                success.body,
            )
                .into_response()
        }
        Err(err) => {
            warn!(lawd_cd, deal_ymd, error = %err, "Proxy request failed");
            error_response(&err)
        }
    }
}

/// JSON error body for a failed upstream fetch
pub fn error_response(err: &FetchError) -> Response {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let body = match err {
        FetchError::Server { status: code, .. } | FetchError::Status { status: code } => json!({
            "error": "API request failed",
            "status": code,
            "statusText": status.canonical_reason(),
        }),
        FetchError::EmptyBody => json!({ "error": "Empty response from API" }),
        FetchError::Timeout { .. } => json!({
            "error": "Request timeout",
            "message": "API request took too long after multiple attempts",
        }),
        FetchError::Transport { message, .. } => json!({
            "error": "Proxy failed",
            "message": message,
        }),
    };
    (status, Json(body)).into_response()
}

async fn debug_probe(State(state): State<Arc<ProxyState>>) -> Response {
    let mut report = DebugReport {
        host: state.probe_host.clone(),
        port: state.probe_port,
        dns: None,
        tcp: None,
    };

    let started = Instant::now();
    let addresses: Vec<IpAddr> =
        match tokio::net::lookup_host((state.probe_host.as_str(), state.probe_port)).await {
            Ok(resolved) => resolved
                .map(|addr| addr.ip())
                .filter(IpAddr::is_ipv4)
                .collect(),
            Err(e) => {
                warn!(host = %state.probe_host, error = %e, "DNS lookup failed");
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({
                        "error": "Debug failed",
                        "details": e.to_string(),
                        "partialResults": report,
                    })),
                )
                    .into_response();
            }
        };
    report.dns = Some(DnsProbe {
        success: true,
        duration: started.elapsed().as_millis() as u64,
        addresses: addresses.iter().map(ToString::to_string).collect(),
    });

    if let Some(ip) = addresses.first() {
        report.tcp = Some(probe_tcp(SocketAddr::new(*ip, state.probe_port), PROBE_CONNECT_TIMEOUT).await);
    }

    (StatusCode::OK, Json(report)).into_response()
}

/// Try one TCP connect; a timeout or refusal is reported, never raised.
pub async fn probe_tcp(addr: SocketAddr, timeout: Duration) -> TcpProbe {
    let started = Instant::now();
    let ip = addr.ip().to_string();
    match tokio::time::timeout(timeout, TcpStream::connect(addr)).await {
        Ok(Ok(_stream)) => TcpProbe {
            success: true,
            duration: Some(started.elapsed().as_millis() as u64),
            error: None,
            ip,
        },
        Ok(Err(e)) => TcpProbe {
            success: false,
            duration: None,
            error: Some(e.to_string()),
            ip,
        },
        Err(_) => TcpProbe {
            success: false,
            duration: None,
            error: Some(format!("Timeout ({}s)", timeout.as_secs())),
            ip,
        },
    }
}

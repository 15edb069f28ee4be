//! Registry proxy server
//!
//! Endpoints:
//! - GET /api/realtor  - Forward a trade query upstream and return the raw XML
//! - GET /api/debug    - Upstream DNS/TCP connectivity report
//! - GET /api/health   - Health check
//!
//! Usage:
//!   cargo run --features server --bin realtor_proxy
//!
//! Upstream URL, timeout and attempt count come from the same `REALTOR_*`
//! variables as the library; `PORT` selects the listen port (default 3000).
//! Startup fails if `REALTOR_PROXY_URL` is set.

use anyhow::{Context, Result};
use realtor_feed::fetch::{FetchClient, ReqwestTransport};
use realtor_feed::proxy::{router, upstream_url, ProxyState};
use realtor_feed::PipelineConfig;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "realtor_feed=info,tower_http=info".into()),
        )
        .init();

    let config = PipelineConfig::from_env().context("Loading proxy configuration")?;
    let client = FetchClient::new(Arc::new(ReqwestTransport::new()?), config.retry.clone());
    let upstream = upstream_url(&config).context("Resolving upstream registry URL")?;

    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let addr = format!("0.0.0.0:{}", port);

    let app = router(ProxyState::new(client, upstream.clone()));

    tracing::info!(%addr, %upstream, "realtor_proxy listening");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Binding {}", addr))?;
    axum::serve(listener, app).await.context("Serving proxy")?;
    Ok(())
}

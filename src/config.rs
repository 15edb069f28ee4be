//! Pipeline configuration
//!
//! Values come from the environment (after `dotenvy` has loaded any `.env`
//! file) or are set programmatically with the `with_*` builders.
//!
//! | Variable | Default |
//! |---|---|
//! | `REALTOR_API_KEY` | empty |
//! | `REALTOR_API_BASE_URL` | [`DEFAULT_UPSTREAM_URL`] |
//! | `REALTOR_PROXY_URL` | unset (direct calls) |
//! | `REALTOR_TIMEOUT_SECS` | 60 |
//! | `REALTOR_MAX_ATTEMPTS` | 3 |
//! | `REALTOR_NUM_OF_ROWS` | 100 |
//! | `REALTOR_FALLBACK` | `sample` |
//! | `REALTOR_REGIONS_FILE` | unset (built-in Seoul table) |

use crate::fallback::FallbackPolicy;
use crate::fetch::RetryPolicy;
use crate::regions::RegionTable;
use anyhow::{anyhow, Context, Result};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

/// Apartment trade endpoint of the public transaction registry
pub const DEFAULT_UPSTREAM_URL: &str =
    "https://apis.data.go.kr/1613000/RTMSDataSvcAptTrade/getRTMSDataSvcAptTrade";

pub const DEFAULT_NUM_OF_ROWS: u32 = 100;

/// Where requests are sent. Chosen by the caller, never sniffed at runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// Call the registry directly
    Direct(Url),
    /// Call a deployed proxy that forwards the same query parameters
    Proxy(Url),
}

impl Endpoint {
    pub fn url(&self) -> &Url {
        match self {
            Self::Direct(url) | Self::Proxy(url) => url,
        }
    }

    pub fn is_proxy(&self) -> bool {
        matches!(self, Self::Proxy(_))
    }
}

impl Default for Endpoint {
    fn default() -> Self {
        // Constant URL always parses
        Self::Direct(Url::parse(DEFAULT_UPSTREAM_URL).expect("default upstream URL is valid"))
    }
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Caller-supplied registry key, passed through untouched
    pub service_key: String,
    pub endpoint: Endpoint,
    pub retry: RetryPolicy,
    pub num_of_rows: u32,
    pub fallback: FallbackPolicy,
    pub regions_file: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            service_key: String::new(),
            endpoint: Endpoint::default(),
            retry: RetryPolicy::upstream_default(),
            num_of_rows: DEFAULT_NUM_OF_ROWS,
            fallback: FallbackPolicy::default(),
            regions_file: None,
        }
    }
}

impl PipelineConfig {
    /// Read configuration from process environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through `lookup`; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(key) = get("REALTOR_API_KEY") {
            config.service_key = key;
        }

        let base = get("REALTOR_API_BASE_URL").unwrap_or_else(|| DEFAULT_UPSTREAM_URL.to_string());
        config.endpoint = match get("REALTOR_PROXY_URL") {
            Some(proxy) => Endpoint::Proxy(
                Url::parse(&proxy).with_context(|| format!("Invalid REALTOR_PROXY_URL '{}'", proxy))?,
            ),
            None => Endpoint::Direct(
                Url::parse(&base).with_context(|| format!("Invalid REALTOR_API_BASE_URL '{}'", base))?,
            ),
        };

        let timeout_secs: u64 = parse_var(&get, "REALTOR_TIMEOUT_SECS")?.unwrap_or(60);
        let max_attempts: u32 = parse_var(&get, "REALTOR_MAX_ATTEMPTS")?.unwrap_or(3);
        config.retry = RetryPolicy::new(
            max_attempts,
            config.retry.base_delay,
            Duration::from_secs(timeout_secs),
        );

        if let Some(rows) = parse_var(&get, "REALTOR_NUM_OF_ROWS")? {
            config.num_of_rows = rows;
        }
        if let Some(fallback) = get("REALTOR_FALLBACK") {
            config.fallback = FallbackPolicy::from_str(&fallback).map_err(|e| anyhow!(e))?;
        }
        config.regions_file = get("REALTOR_REGIONS_FILE").map(PathBuf::from);

        Ok(config)
    }

    pub fn with_service_key(mut self, key: impl Into<String>) -> Self {
        self.service_key = key.into();
        self
    }

    pub fn with_endpoint(mut self, endpoint: Endpoint) -> Self {
        self.endpoint = endpoint;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_num_of_rows(mut self, rows: u32) -> Self {
        self.num_of_rows = rows;
        self
    }

    pub fn with_fallback(mut self, fallback: FallbackPolicy) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn with_regions_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.regions_file = Some(path.into());
        self
    }

    /// The configured region table, or the built-in one.
    pub fn load_regions(&self) -> Result<RegionTable> {
        match &self.regions_file {
            Some(path) => RegionTable::load_from_file(path),
            None => Ok(RegionTable::seoul()),
        }
    }
}

fn parse_var<T>(get: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| anyhow!("Invalid {} '{}': {}", key, raw, e))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.service_key, "");
        assert_eq!(config.endpoint.url().as_str(), DEFAULT_UPSTREAM_URL);
        assert!(!config.endpoint.is_proxy());
        assert_eq!(config.retry, RetryPolicy::upstream_default());
        assert_eq!(config.num_of_rows, 100);
        assert_eq!(config.fallback, FallbackPolicy::SampleDataset);
        assert!(config.regions_file.is_none());
    }

    #[test]
    fn test_env_overrides() {
        let config = PipelineConfig::from_lookup(lookup(&[
            ("REALTOR_API_KEY", "abc123"),
            ("REALTOR_PROXY_URL", "https://realtor.example.app/api/realtor"),
            ("REALTOR_TIMEOUT_SECS", "15"),
            ("REALTOR_MAX_ATTEMPTS", "5"),
            ("REALTOR_NUM_OF_ROWS", "50"),
            ("REALTOR_FALLBACK", "empty"),
            ("REALTOR_REGIONS_FILE", "/etc/realtor/regions.yaml"),
        ]))
        .unwrap();

        assert_eq!(config.service_key, "abc123");
        assert!(config.endpoint.is_proxy());
        assert_eq!(config.endpoint.url().path(), "/api/realtor");
        assert_eq!(config.retry.attempt_timeout, Duration::from_secs(15));
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.base_delay, Duration::from_millis(1_000));
        assert_eq!(config.num_of_rows, 50);
        assert_eq!(config.fallback, FallbackPolicy::Empty);
        assert_eq!(
            config.regions_file,
            Some(PathBuf::from("/etc/realtor/regions.yaml"))
        );
    }

    #[test]
    fn test_blank_values_are_unset() {
        let config =
            PipelineConfig::from_lookup(lookup(&[("REALTOR_PROXY_URL", "  "), ("REALTOR_TIMEOUT_SECS", "")]))
                .unwrap();
        assert!(!config.endpoint.is_proxy());
        assert_eq!(config.retry.attempt_timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_invalid_values_are_errors() {
        let err = PipelineConfig::from_lookup(lookup(&[("REALTOR_MAX_ATTEMPTS", "three")])).unwrap_err();
        assert!(err.to_string().contains("REALTOR_MAX_ATTEMPTS"));

        let err = PipelineConfig::from_lookup(lookup(&[("REALTOR_API_BASE_URL", "not a url")])).unwrap_err();
        assert!(err.to_string().contains("REALTOR_API_BASE_URL"));

        assert!(PipelineConfig::from_lookup(lookup(&[("REALTOR_FALLBACK", "loud")])).is_err());
    }

    #[test]
    fn test_builders_and_region_loading() {
        let config = PipelineConfig::default()
            .with_service_key("k")
            .with_num_of_rows(10)
            .with_fallback(FallbackPolicy::Empty);
        assert_eq!(config.service_key, "k");
        assert_eq!(config.num_of_rows, 10);
        assert_eq!(config.load_regions().unwrap().len(), 25);

        let missing = config.with_regions_file("/nonexistent/regions.yaml");
        assert!(missing.load_regions().is_err());
    }
}

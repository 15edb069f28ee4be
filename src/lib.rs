//! Realtor Feed - real-estate transaction records for map display
//!
//! Fetches monthly apartment trade records for a region from the public
//! transaction registry (directly or through a proxy), normalizes the
//! heterogeneous payloads into one canonical record, and falls back to a
//! small illustrative dataset whenever the real chain cannot deliver.
//!
//! ## Call chain
//! Region name -> district code -> FetchClient (retry) -> payload parse ->
//! Normalizer -> Vec<TransactionRecord>
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use realtor_feed::{PipelineConfig, RealtorPipeline};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let pipeline = RealtorPipeline::from_config(PipelineConfig::from_env()?)?;
//! let records = pipeline.fetch_region_data("강남구", Some(2024), Some(1)).await;
//! println!("{} records", records.len());
//! # Ok(())
//! # }
//! ```

// Error taxonomy
pub mod error;

// Reference data and canonical record
pub mod record;
pub mod regions;

// Deterministic hashing for synthetic coordinates
pub mod hash;

// Raw item -> canonical record
pub mod normalize;

// Upstream transport, retry and response parsing
pub mod fetch;
pub mod payload;

// Orchestration
pub mod config;
pub mod fallback;
pub mod pipeline;

// HTTP proxy in front of the registry (when enabled)
#[cfg(feature = "server")]
pub mod proxy;

pub use config::{Endpoint, PipelineConfig};
pub use error::{FetchError, PayloadError, PipelineError};
pub use fallback::FallbackPolicy;
pub use fetch::{FetchClient, RetryPolicy, Transport};
pub use normalize::Normalizer;
pub use pipeline::RealtorPipeline;
pub use record::{BuildingCategory, TransactionRecord};
pub use regions::{Centroid, Region, RegionTable};

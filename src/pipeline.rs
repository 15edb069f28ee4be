//! Pipeline orchestrator
//!
//! Region name → district code → upstream request → payload → normalized
//! records. Failures stay tagged inside [`RealtorPipeline::try_fetch_region_data`];
//! [`RealtorPipeline::fetch_region_data`] is the availability boundary that
//! swaps them for the configured fallback.

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::fetch::{FetchClient, ReqwestTransport, Transport, UpstreamRequest};
use crate::normalize::Normalizer;
use crate::payload::parse_response;
use crate::record::TransactionRecord;
use crate::regions::RegionTable;
use anyhow::Context;
use chrono::Datelike;
use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// First (and only) page requested from the upstream
const FIRST_PAGE: u32 = 1;

pub struct RealtorPipeline {
    client: FetchClient,
    normalizer: Normalizer,
    regions: Arc<RegionTable>,
    config: PipelineConfig,
}

impl RealtorPipeline {
    pub fn new(config: PipelineConfig, regions: Arc<RegionTable>, transport: Arc<dyn Transport>) -> Self {
        Self {
            client: FetchClient::new(transport, config.retry.clone()),
            normalizer: Normalizer::new(regions.clone()),
            regions,
            config,
        }
    }

    /// Build a pipeline over HTTP with the region table named by `config`.
    pub fn from_config(config: PipelineConfig) -> anyhow::Result<Self> {
        let regions = Arc::new(config.load_regions().context("Loading region table")?);
        let transport = Arc::new(ReqwestTransport::new()?);
        Ok(Self::new(config, regions, transport))
    }

    pub fn regions(&self) -> &RegionTable {
        &self.regions
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Records for one region and month. Never fails: any error is logged
    /// and replaced by the fallback policy's records.
    pub async fn fetch_region_data(
        &self,
        region_name: &str,
        year: Option<i32>,
        month: Option<u32>,
    ) -> Vec<TransactionRecord> {
        match self.try_fetch_region_data(region_name, year, month).await {
            Ok(records) => records,
            Err(err) => {
                warn!(
                    region = %region_name,
                    error = %err,
                    fallback = ?self.config.fallback,
                    "Region fetch failed, using fallback"
                );
                let code = self.regions.code_for(region_name).unwrap_or_default();
                self.config.fallback.records_for(region_name, code)
            }
        }
    }

    /// Records for one region and month, or the first failure on the way.
    pub async fn try_fetch_region_data(
        &self,
        region_name: &str,
        year: Option<i32>,
        month: Option<u32>,
    ) -> Result<Vec<TransactionRecord>, PipelineError> {
        let code = self
            .regions
            .code_for(region_name)
            .ok_or_else(|| PipelineError::UnknownRegion(region_name.to_string()))?;
        let ymd = deal_ymd(year, month);
        debug!(region = %region_name, code, deal_ymd = %ymd, "Fetching region");

        let request = self.build_request(code, &ymd);
        let success = self.client.fetch(&request).await?;
        let page = parse_response(&success.body)?;

        debug!(
            region = %region_name,
            num_of_rows = ?page.num_of_rows,
            page_no = ?page.page_no,
            total_count = ?page.total_count,
            items = page.items.len(),
            "Parsed response page"
        );
        if page.is_truncated() {
            warn!(
                region = %region_name,
                fetched = page.items.len(),
                total_count = ?page.total_count,
                "Upstream holds more records than the first page"
            );
        }

        let records: Vec<TransactionRecord> = page
            .items
            .iter()
            .map(|item| self.normalizer.normalize(item, region_name))
            .collect();
        info!(region = %region_name, deal_ymd = %ymd, records = records.len(), "Region fetched");
        Ok(records)
    }

    /// Fetch every region concurrently; results are concatenated in input order.
    pub async fn fetch_multiple_regions<S: AsRef<str>>(
        &self,
        region_names: &[S],
        year: Option<i32>,
        month: Option<u32>,
    ) -> Vec<TransactionRecord> {
        let fetches = region_names
            .iter()
            .map(|name| self.fetch_region_data(name.as_ref(), year, month));
        join_all(fetches).await.into_iter().flatten().collect()
    }

    /// Upstream request for a district code and `YYYYMM` month.
    pub fn build_request(&self, code: &str, deal_ymd: &str) -> UpstreamRequest {
        let mut url = self.config.endpoint.url().clone();
        url.query_pairs_mut()
            .append_pair("serviceKey", &self.config.service_key)
            .append_pair("LAWD_CD", code)
            .append_pair("DEAL_YMD", deal_ymd)
            .append_pair("numOfRows", &self.config.num_of_rows.to_string())
            .append_pair("pageNo", &FIRST_PAGE.to_string());
        UpstreamRequest::new(url)
    }
}

/// `YYYYMM` for the given month, defaulting to the current local year/month.
pub fn deal_ymd(year: Option<i32>, month: Option<u32>) -> String {
    let now = chrono::Local::now();
    format_deal_ymd(year.unwrap_or(now.year()), month.unwrap_or(now.month()))
}

/// `YYYYMM` with month overflow rolled into the year (month 13 → January next year).
pub fn format_deal_ymd(year: i32, month: u32) -> String {
    let total = i64::from(year) * 12 + i64::from(month) - 1;
    let (year, month) = (total.div_euclid(12), total.rem_euclid(12) + 1);
    format!("{:04}{:02}", year, month)
}

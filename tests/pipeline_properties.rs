//! End-to-end pipeline behavior over an in-memory transport
//!
//! Covers the externally observable properties: retry timing through the
//! full chain, fallback on every failure class, custom region tables loaded
//! from YAML, and normalization totality on arbitrary items.

use async_trait::async_trait;
use proptest::prelude::*;
use realtor_feed::fetch::{TransportError, TransportResponse, UpstreamRequest};
use realtor_feed::{
    BuildingCategory, Endpoint, FallbackPolicy, Normalizer, PipelineConfig, RealtorPipeline,
    RegionTable, RetryPolicy, Transport,
};
use serde_json::json;
use std::collections::VecDeque;
use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use url::Url;

// =============================================================================
// Test transport
// =============================================================================

struct Scripted {
    script: Mutex<VecDeque<Result<TransportResponse, TransportError>>>,
    seen: Mutex<Vec<(Instant, Url)>>,
}

impl Scripted {
    fn new(script: Vec<Result<TransportResponse, TransportError>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            seen: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> Vec<(Instant, Url)> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for Scripted {
    async fn get(
        &self,
        request: &UpstreamRequest,
        _timeout: Duration,
    ) -> Result<TransportResponse, TransportError> {
        self.seen
            .lock()
            .unwrap()
            .push((Instant::now(), request.url.clone()));
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Connection("no more responses".into())))
    }
}

const GANGNAM_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<response>
  <header><resultCode>000</resultCode><resultMsg>OK</resultMsg></header>
  <body>
    <items>
      <item>
        <aptNm>개포자이프레지던스</aptNm><buildYear>2023</buildYear>
        <dealAmount>   345,000</dealAmount><dealDay>21</dealDay><dealMonth>1</dealMonth>
        <dealYear>2024</dealYear><excluUseAr>84.9705</excluUseAr><floor>17</floor>
        <jibun>189</jibun><sggCd>11680</sggCd><umdNm>개포동</umdNm>
      </item>
    </items>
    <numOfRows>100</numOfRows><pageNo>1</pageNo><totalCount>240</totalCount>
  </body>
</response>"#;

fn ok(body: &str) -> Result<TransportResponse, TransportError> {
    Ok(TransportResponse::new(200, body))
}

fn pipeline(transport: Arc<Scripted>, regions: RegionTable) -> RealtorPipeline {
    let config = PipelineConfig::default().with_service_key("integration-key");
    RealtorPipeline::new(config, Arc::new(regions), transport)
}

// =============================================================================
// Fetch chain
// =============================================================================

#[tokio::test(start_paused = true)]
async fn transient_failures_recover_with_linear_backoff() {
    let transport = Scripted::new(vec![
        Ok(TransportResponse::new(503, "")),
        Ok(TransportResponse::new(503, "")),
        ok(GANGNAM_XML),
    ]);
    let p = pipeline(transport.clone(), RegionTable::seoul());

    let records = p.try_fetch_region_data("강남구", Some(2024), Some(1)).await.unwrap();
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.building_name, "개포자이프레지던스");
    assert_eq!(record.price, 345_000);
    assert_eq!(record.deal_date, "2024-01-21");
    assert_eq!(record.floor, 17);
    assert_eq!(record.lot, "189");
    assert_eq!(record.construction_year, Some(2023));
    assert_eq!(record.building_category, BuildingCategory::Apartment);

    let calls = transport.calls();
    assert_eq!(calls.len(), 3);
    assert!(calls[1].0 - calls[0].0 >= Duration::from_secs(1));
    assert!(calls[2].0 - calls[1].0 >= Duration::from_secs(2));
    assert!(calls[2].0 - calls[1].0 < Duration::from_millis(2_100));
}

#[tokio::test(start_paused = true)]
async fn every_failure_class_falls_back_to_sample_records() {
    let failures = vec![
        Ok(TransportResponse::new(404, "missing")),
        ok("   "),
        ok("<response><header>"),
        ok(r#"{"response":{"header":{"resultCode":"30","resultMsg":"SERVICE KEY IS NOT REGISTERED"}}}"#),
        ok("<OpenAPI_ServiceResponse><cmmMsgHeader><errMsg>SERVICE ERROR</errMsg>\
            <returnAuthMsg>SERVICE_KEY_IS_NOT_REGISTERED_ERROR</returnAuthMsg>\
            <returnReasonCode>30</returnReasonCode></cmmMsgHeader></OpenAPI_ServiceResponse>"),
    ];

    for failure in failures {
        let p = pipeline(Scripted::new(vec![failure]), RegionTable::seoul());
        let records = p.fetch_region_data("서초구", Some(2024), Some(2)).await;
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].address, "서초구 테헤란로 123");
        assert!(records.iter().all(|r| r.region_code == "11650"));
    }
}

#[tokio::test(start_paused = true)]
async fn proxy_endpoint_receives_the_same_query() {
    let transport = Scripted::new(vec![ok(GANGNAM_XML)]);
    let config = PipelineConfig::default()
        .with_service_key("k")
        .with_endpoint(Endpoint::Proxy(
            Url::parse("https://feed.example.app/api/realtor").unwrap(),
        ))
        .with_num_of_rows(50)
        .with_fallback(FallbackPolicy::Empty);
    let p = RealtorPipeline::new(config, Arc::new(RegionTable::seoul()), transport.clone());

    assert_eq!(p.fetch_region_data("강남구", Some(2023), Some(14)).await.len(), 1);

    let (_, url) = &transport.calls()[0];
    assert_eq!(url.host_str(), Some("feed.example.app"));
    assert_eq!(url.path(), "/api/realtor");
    let query: std::collections::HashMap<String, String> = url.query_pairs().into_owned().collect();
    assert_eq!(query["LAWD_CD"], "11680");
    assert_eq!(query["DEAL_YMD"], "202402");
    assert_eq!(query["numOfRows"], "50");
}

// =============================================================================
// Region tables
// =============================================================================

#[tokio::test(start_paused = true)]
async fn custom_region_table_from_yaml() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        "regions:\n  - name: 해운대구\n    code: \"26350\"\n    lat: 35.1631\n    lng: 129.1636"
    )
    .unwrap();

    let config = PipelineConfig::default().with_regions_file(file.path());
    let regions = config.load_regions().unwrap();
    assert_eq!(regions.code_for("해운대구"), Some("26350"));
    assert!(!regions.contains("강남구"));

    let transport = Scripted::new(vec![ok(GANGNAM_XML)]);
    let p = RealtorPipeline::new(config, Arc::new(regions), transport.clone());
    let records = p.fetch_region_data("해운대구", Some(2024), Some(1)).await;
    assert_eq!(records[0].region_code, "26350");

    // The built-in table is no longer consulted
    let fallback = p.fetch_region_data("강남구", Some(2024), Some(1)).await;
    assert_eq!(fallback[0].region_code, "");
    assert_eq!(transport.calls().len(), 1);
}

#[test]
fn with_retry_overrides_policy() {
    let policy = RetryPolicy::new(0, Duration::from_millis(5), Duration::from_secs(1));
    assert_eq!(policy.max_attempts, 1);
    let config = PipelineConfig::default().with_retry(policy.clone());
    assert_eq!(config.retry, policy);
}

// =============================================================================
// Normalization totality
// =============================================================================

fn scalar() -> impl Strategy<Value = serde_json::Value> {
    prop_oneof![
        Just(serde_json::Value::Null),
        any::<bool>().prop_map(serde_json::Value::from),
        any::<i64>().prop_map(serde_json::Value::from),
        any::<f64>().prop_map(|f| json!(f)),
        ".{0,12}".prop_map(serde_json::Value::from),
    ]
}

proptest! {
    #[test]
    fn normalize_is_total_and_bounded(
        fields in proptest::collection::hash_map(
            prop_oneof![
                Just("dealAmount".to_string()),
                Just("excluUseAr".to_string()),
                Just("floor".to_string()),
                Just("buildYear".to_string()),
                Just("umdNm".to_string()),
                Just("aptNm".to_string()),
                Just("latitude".to_string()),
                Just("오피스텔".to_string()),
                "[a-z]{1,6}",
            ],
            scalar(),
            0..8,
        )
    ) {
        let normalizer = Normalizer::new(Arc::new(RegionTable::seoul()));
        let raw = serde_json::Value::Object(fields.into_iter().collect());
        let record = normalizer.normalize(&raw, "종로구");

        prop_assert!(record.area_sqm >= 0.0);
        prop_assert!(record.latitude.is_finite());
        prop_assert!(record.longitude.is_finite());
        prop_assert_eq!(record.region_code.as_str(), "11110");
        prop_assert!(!record.id.is_empty());
    }
}

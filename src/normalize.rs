//! Record normalizer
//!
//! Converts one raw upstream item into a [`TransactionRecord`]. The upstream
//! publishes the same data under (at least) two naming schemes, so every
//! canonical field is resolved from an explicit, ordered list of candidate
//! keys: the first present, non-blank candidate wins.
//!
//! Normalization is total. Malformed values degrade to the field's default
//! and never abort record construction.

use crate::hash::unit_hash;
use crate::record::{BuildingCategory, TransactionRecord};
use crate::regions::{Centroid, RegionTable};
use serde_json::Value;
use std::sync::Arc;

/// Half-width of the box synthetic coordinates are placed in, in degrees.
pub const SYNTHETIC_SPREAD_DEG: f64 = 0.02;

// =============================================================================
// Alias table
// =============================================================================

/// Candidate upstream keys per canonical field, in resolution order.
pub mod aliases {
    pub const PRICE: &[&str] = &["dealAmount", "거래금액"];
    pub const DEAL_YEAR: &[&str] = &["dealYear", "년"];
    pub const DEAL_MONTH: &[&str] = &["dealMonth", "월"];
    pub const DEAL_DAY: &[&str] = &["dealDay", "일"];
    pub const DEAL_DATE: &[&str] = &["dealDate"];
    pub const AREA: &[&str] = &["excluUseAr", "전용면적", "area"];
    pub const FLOOR: &[&str] = &["floor", "층"];
    pub const CONSTRUCTION_YEAR: &[&str] = &["buildYear", "건축년도", "constructionYear"];
    pub const LEGAL_DISTRICT: &[&str] = &["umdNm", "법정동", "roadAddress"];
    pub const BUILDING_NAME: &[&str] = &["aptNm", "아파트", "연립다세대", "buildingName"];
    pub const LOT: &[&str] = &["jibun", "지번"];
    pub const SERIAL: &[&str] = &["일련번호", "serialNumber"];
    pub const LATITUDE: &[&str] = &["latitude", "lat"];
    pub const LONGITUDE: &[&str] = &["longitude", "lng", "lon"];
}

/// Indicator fields per category, checked in priority order.
const CATEGORY_INDICATORS: [(BuildingCategory, &[&str]); 3] = [
    (BuildingCategory::Apartment, &["아파트", "apartment", "aptNm"]),
    (
        BuildingCategory::OfficeResidence,
        &["오피스텔", "officetel", "offiNm"],
    ),
    (
        BuildingCategory::RowOrMultiplex,
        &["연립다세대", "multiFamily", "mhouseNm"],
    ),
];

// =============================================================================
// Raw record view
// =============================================================================

/// Read-only view over one loosely-typed upstream item.
///
/// Accepts the XML-derived form (all text) and the JSON form (numbers,
/// booleans) alike. Anything other than an object resolves every field as
/// absent.
#[derive(Debug, Clone, Copy)]
pub struct RawRecord<'a> {
    fields: Option<&'a serde_json::Map<String, Value>>,
}

impl<'a> RawRecord<'a> {
    pub fn new(value: &'a Value) -> Self {
        Self {
            fields: value.as_object(),
        }
    }

    /// First present candidate as trimmed text.
    pub fn text(&self, candidates: &[&str]) -> Option<String> {
        let fields = self.fields?;
        candidates
            .iter()
            .find_map(|key| fields.get(*key).and_then(scalar_text))
    }

    /// Whether any candidate is set (non-blank, non-false, non-zero).
    pub fn flag(&self, candidates: &[&str]) -> bool {
        let Some(fields) = self.fields else {
            return false;
        };
        candidates.iter().any(|key| match fields.get(*key) {
            Some(Value::Bool(b)) => *b,
            Some(Value::Number(n)) => n.as_f64().is_some_and(|v| v != 0.0),
            Some(other) => scalar_text(other).is_some(),
            None => false,
        })
    }
}

/// Text of a scalar value. XML elements carrying attributes arrive as
/// objects with a `#text` entry.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(number_text(n)),
        Value::Bool(true) => Some("true".to_string()),
        Value::Object(map) => map.get("#text").and_then(scalar_text),
        _ => None,
    }
}

/// Integral floats render without a fraction (`2024.0` → `"2024"`).
fn number_text(n: &serde_json::Number) -> String {
    match n.as_f64() {
        Some(f) if n.is_f64() && f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 => {
            format!("{}", f as i64)
        }
        _ => n.to_string(),
    }
}

// =============================================================================
// Total parsers
// =============================================================================

/// Keep ASCII digits only, then parse. `"164,000"` → 164000.
pub fn parse_price(text: &str) -> u64 {
    let digits: String = text.chars().filter(|c| c.is_ascii_digit()).collect();
    digits.parse().unwrap_or(0)
}

/// Longest numeric prefix after leading whitespace, e.g. `"5층"` → 5.
/// Floats also take an exponent (`"1e2"` → 100).
fn numeric_prefix(text: &str, allow_fraction: bool) -> Option<&str> {
    let s = text.trim_start();
    let bytes = s.as_bytes();
    let mut end = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));
    let mut digits = 0;
    let mut seen_dot = !allow_fraction;
    while let Some(&b) = bytes.get(end) {
        match b {
            b'0'..=b'9' => digits += 1,
            b'.' if !seen_dot => seen_dot = true,
            _ => break,
        }
        end += 1;
    }
    if digits == 0 {
        return None;
    }
    if allow_fraction && matches!(bytes.get(end), Some(b'e' | b'E')) {
        // Exponent only counts when at least one digit follows it
        let mut exp_end = end + 1 + usize::from(matches!(bytes.get(end + 1), Some(b'+' | b'-')));
        let exp_start = exp_end;
        while bytes.get(exp_end).is_some_and(u8::is_ascii_digit) {
            exp_end += 1;
        }
        if exp_end > exp_start {
            end = exp_end;
        }
    }
    Some(&s[..end])
}

pub fn parse_leading_int(text: &str) -> Option<i64> {
    numeric_prefix(text, false)?.parse().ok()
}

pub fn parse_leading_float(text: &str) -> Option<f64> {
    numeric_prefix(text, true)?
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

fn parse_coordinate(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Offset in `[-SPREAD, +SPREAD)` derived from `seed`.
pub fn synthetic_offset(seed: &str) -> f64 {
    (unit_hash(seed) - 0.5) * (SYNTHETIC_SPREAD_DEG * 2.0)
}

/// Deterministic point near `centroid` for an address/building pair.
pub fn synthesize_coordinate(centroid: Centroid, address: &str, building_name: &str) -> (f64, f64) {
    let lat = centroid.lat + synthetic_offset(&format!("{address}{building_name}lat"));
    let lng = centroid.lng + synthetic_offset(&format!("{address}{building_name}lng"));
    (lat, lng)
}

// =============================================================================
// Normalizer
// =============================================================================

/// Builds canonical records for a region using an injected region table.
#[derive(Debug, Clone)]
pub struct Normalizer {
    regions: Arc<RegionTable>,
}

impl Normalizer {
    pub fn new(regions: Arc<RegionTable>) -> Self {
        Self { regions }
    }

    pub fn regions(&self) -> &RegionTable {
        &self.regions
    }

    /// Normalize one raw item for `region_name`. Never fails.
    pub fn normalize(&self, raw: &Value, region_name: &str) -> TransactionRecord {
        let raw = RawRecord::new(raw);

        let legal_district = raw.text(aliases::LEGAL_DISTRICT).unwrap_or_default();
        let building_name = raw.text(aliases::BUILDING_NAME).unwrap_or_default();
        let lot = raw.text(aliases::LOT).unwrap_or_default();

        let area_sqm = raw
            .text(aliases::AREA)
            .and_then(|t| parse_leading_float(&t))
            .unwrap_or(0.0)
            .max(0.0);
        let floor = raw
            .text(aliases::FLOOR)
            .and_then(|t| parse_leading_int(&t))
            .and_then(|v| i32::try_from(v).ok())
            .unwrap_or(0);
        let price = raw.text(aliases::PRICE).map_or(0, |t| parse_price(&t));
        let construction_year = raw
            .text(aliases::CONSTRUCTION_YEAR)
            .and_then(|t| parse_leading_int(&t))
            .and_then(|v| i32::try_from(v).ok())
            .filter(|year| *year > 0);

        let (latitude, longitude) = match (
            raw.text(aliases::LATITUDE).and_then(|t| parse_coordinate(&t)),
            raw.text(aliases::LONGITUDE).and_then(|t| parse_coordinate(&t)),
        ) {
            (Some(lat), Some(lng)) => (lat, lng),
            _ => synthesize_coordinate(
                self.regions.centroid_or_default(region_name),
                &legal_district,
                &building_name,
            ),
        };

        TransactionRecord {
            id: record_id(raw.text(aliases::SERIAL)),
            region_code: self
                .regions
                .code_for(region_name)
                .unwrap_or_default()
                .to_string(),
            region_name: region_name.to_string(),
            address: legal_district.clone(),
            legal_district,
            lot,
            building_name,
            building_category: infer_category(&raw),
            area_sqm,
            floor,
            price,
            deal_date: deal_date(&raw),
            construction_year,
            latitude,
            longitude,
        }
    }
}

/// First category whose indicator is set; catch-all otherwise.
pub fn infer_category(raw: &RawRecord<'_>) -> BuildingCategory {
    CATEGORY_INDICATORS
        .iter()
        .find(|(_, keys)| raw.flag(keys))
        .map(|(category, _)| *category)
        .unwrap_or_default()
}

fn deal_date(raw: &RawRecord<'_>) -> String {
    match (
        raw.text(aliases::DEAL_YEAR),
        raw.text(aliases::DEAL_MONTH),
        raw.text(aliases::DEAL_DAY),
    ) {
        (Some(year), Some(month), Some(day)) => format!("{year}-{month:0>2}-{day:0>2}"),
        _ => raw.text(aliases::DEAL_DATE).unwrap_or_default(),
    }
}

fn record_id(serial: Option<String>) -> String {
    let base = serial.unwrap_or_else(|| chrono::Utc::now().timestamp_millis().to_string());
    format!("{}-{:08x}", base, rand::random::<u32>())
}

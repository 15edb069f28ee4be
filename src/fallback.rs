//! Fallback dataset and the policy that decides when callers receive it
//!
//! The pipeline favors availability: when the real chain cannot produce
//! records, callers get a small illustrative dataset instead of an error.

use crate::record::{BuildingCategory, TransactionRecord};
use serde::{Deserialize, Serialize};

/// What the orchestrator returns when a region fetch fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FallbackPolicy {
    /// Three illustrative records tagged with the requested region
    #[default]
    SampleDataset,
    /// No records at all
    Empty,
}

impl FallbackPolicy {
    pub fn records_for(&self, region_name: &str, region_code: &str) -> Vec<TransactionRecord> {
        match self {
            Self::SampleDataset => sample_dataset(region_name, region_code),
            Self::Empty => Vec::new(),
        }
    }
}

impl std::str::FromStr for FallbackPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sample" | "sample-dataset" => Ok(Self::SampleDataset),
            "empty" | "none" => Ok(Self::Empty),
            other => Err(format!("unknown fallback policy '{}'", other)),
        }
    }
}

struct SampleRow {
    id: &'static str,
    street: &'static str,
    building_name: &'static str,
    category: BuildingCategory,
    area_sqm: f64,
    floor: i32,
    price: u64,
    deal_date: &'static str,
    construction_year: i32,
    latitude: f64,
    longitude: f64,
}

const SAMPLE_ROWS: [SampleRow; 3] = [
    SampleRow {
        id: "1",
        street: "테헤란로 123",
        building_name: "역삼 아파트",
        category: BuildingCategory::Apartment,
        area_sqm: 84.5,
        floor: 5,
        price: 120_000,
        deal_date: "2024-01-15",
        construction_year: 2015,
        latitude: 37.5010,
        longitude: 127.0390,
    },
    SampleRow {
        id: "2",
        street: "강남대로 456",
        building_name: "강남 오피스텔",
        category: BuildingCategory::OfficeResidence,
        area_sqm: 45.2,
        floor: 10,
        price: 85_000,
        deal_date: "2024-01-20",
        construction_year: 2020,
        latitude: 37.4980,
        longitude: 127.0270,
    },
    SampleRow {
        id: "3",
        street: "선릉로 789",
        building_name: "선릉 연립다세대",
        category: BuildingCategory::RowOrMultiplex,
        area_sqm: 72.8,
        floor: 3,
        price: 95_000,
        deal_date: "2024-02-01",
        construction_year: 2018,
        latitude: 37.5040,
        longitude: 127.0490,
    },
];

/// The fixed sample records with `region_name` substituted into each address.
pub fn sample_dataset(region_name: &str, region_code: &str) -> Vec<TransactionRecord> {
    SAMPLE_ROWS
        .iter()
        .map(|row| TransactionRecord {
            id: row.id.to_string(),
            region_code: region_code.to_string(),
            region_name: region_name.to_string(),
            address: format!("{} {}", region_name, row.street),
            legal_district: "역삼동".to_string(),
            lot: String::new(),
            building_name: row.building_name.to_string(),
            building_category: row.category,
            area_sqm: row.area_sqm,
            floor: row.floor,
            price: row.price,
            deal_date: row.deal_date.to_string(),
            construction_year: Some(row.construction_year),
            latitude: row.latitude,
            longitude: row.longitude,
        })
        .collect()
}

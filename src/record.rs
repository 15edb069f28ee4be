//! Canonical transaction record
//!
//! The normalized shape every downstream consumer works with. Records are
//! built fresh per fetch and never mutated afterwards.

use serde::{Deserialize, Serialize};

/// Building classification inferred from which upstream fields are present
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BuildingCategory {
    Apartment,
    OfficeResidence,
    RowOrMultiplex,
    /// Catch-all when no indicator field is present
    SingleOrMultiUnit,
}

impl Default for BuildingCategory {
    fn default() -> Self {
        Self::SingleOrMultiUnit
    }
}

impl std::fmt::Display for BuildingCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Apartment => write!(f, "apartment"),
            Self::OfficeResidence => write!(f, "office-residence"),
            Self::RowOrMultiplex => write!(f, "row-or-multiplex"),
            Self::SingleOrMultiUnit => write!(f, "single-or-multi-unit"),
        }
    }
}

/// A single normalized real-estate transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    /// Opaque identifier; duplicates are tolerated
    pub id: String,
    pub region_code: String,
    pub region_name: String,
    /// Display address
    pub address: String,
    /// Neighborhood-level subdivision (법정동)
    pub legal_district: String,
    /// Lot/parcel number (지번)
    pub lot: String,
    pub building_name: String,
    pub building_category: BuildingCategory,
    /// Exclusive-use area in square meters
    pub area_sqm: f64,
    /// Negative for basement floors
    pub floor: i32,
    /// Deal price in units of 10,000 won
    pub price: u64,
    /// `YYYY-MM-DD`, or the upstream's own pre-formatted date, or empty
    pub deal_date: String,
    pub construction_year: Option<i32>,
    pub latitude: f64,
    pub longitude: f64,
}

//! Regional reference tables
//!
//! Region name → upstream district code (`LAWD_CD`) and region name →
//! centroid coordinate. The built-in table covers the 25 Seoul districts;
//! a replacement table can be loaded from YAML without code changes.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Centroid used when a region has no entry in the table (Seoul City Hall).
pub const FALLBACK_CENTROID: Centroid = Centroid {
    lat: 37.5665,
    lng: 126.9780,
};

/// A reference latitude/longitude for a region's approximate center
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Centroid {
    pub lat: f64,
    pub lng: f64,
}

/// One row of the reference table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub name: String,
    /// 5-digit legal district code used by the upstream registry
    pub code: String,
    #[serde(flatten)]
    pub centroid: Centroid,
}

/// On-disk shape of a region table file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionTableFile {
    pub regions: Vec<Region>,
}

/// Immutable lookup table, built once and shared by the normalizer and pipeline.
#[derive(Debug, Clone)]
pub struct RegionTable {
    regions: Vec<Region>,
    by_name: HashMap<String, usize>,
}

const SEOUL_DISTRICTS: [(&str, &str, f64, f64); 25] = [
    ("강남구", "11680", 37.5172, 127.0473),
    ("강동구", "11740", 37.5301, 127.1237),
    ("강북구", "11305", 37.6396, 127.0257),
    ("강서구", "11500", 37.5509, 126.8497),
    ("관악구", "11620", 37.4784, 126.9516),
    ("광진구", "11215", 37.5385, 127.0823),
    ("구로구", "11530", 37.4954, 126.8874),
    ("금천구", "11545", 37.4568, 126.8954),
    ("노원구", "11350", 37.6542, 127.0568),
    ("도봉구", "11320", 37.6688, 127.0471),
    ("동대문구", "11230", 37.5744, 127.0400),
    ("동작구", "11590", 37.5124, 126.9393),
    ("마포구", "11440", 37.5663, 126.9016),
    ("서대문구", "11410", 37.5791, 126.9368),
    ("서초구", "11650", 37.4837, 127.0324),
    ("성동구", "11200", 37.5633, 127.0371),
    ("성북구", "11290", 37.5891, 127.0182),
    ("송파구", "11710", 37.5145, 127.1066),
    ("양천구", "11470", 37.5169, 126.8660),
    ("영등포구", "11560", 37.5264, 126.8962),
    ("용산구", "11170", 37.5326, 126.9900),
    ("은평구", "11380", 37.6027, 126.9291),
    ("종로구", "11110", 37.5730, 126.9794),
    ("중구", "11140", 37.5641, 126.9979),
    ("중랑구", "11260", 37.6066, 127.0927),
];

impl RegionTable {
    /// Build a table from rows, rejecting malformed codes and duplicate names.
    pub fn new(regions: Vec<Region>) -> Result<Self> {
        let mut by_name = HashMap::with_capacity(regions.len());
        for (idx, region) in regions.iter().enumerate() {
            if region.code.len() != 5 || !region.code.bytes().all(|b| b.is_ascii_digit()) {
                bail!(
                    "region '{}' has invalid district code '{}' (expected 5 digits)",
                    region.name,
                    region.code
                );
            }
            if by_name.insert(region.name.clone(), idx).is_some() {
                bail!("duplicate region name '{}'", region.name);
            }
        }
        Ok(Self { regions, by_name })
    }

    /// The built-in Seoul table.
    pub fn seoul() -> Self {
        let regions = SEOUL_DISTRICTS
            .iter()
            .map(|(name, code, lat, lng)| Region {
                name: (*name).to_string(),
                code: (*code).to_string(),
                centroid: Centroid {
                    lat: *lat,
                    lng: *lng,
                },
            })
            .collect::<Vec<_>>();
        let by_name = regions
            .iter()
            .enumerate()
            .map(|(idx, r)| (r.name.clone(), idx))
            .collect();
        Self { regions, by_name }
    }

    /// Load a table from a YAML file.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).with_context(|| format!("Reading {}", path.display()))?;
        Self::from_yaml(&content).with_context(|| format!("Parsing {}", path.display()))
    }

    /// Parse a table from YAML text.
    pub fn from_yaml(content: &str) -> Result<Self> {
        let file: RegionTableFile = serde_yaml::from_str(content)?;
        Self::new(file.regions)
    }

    pub fn get(&self, name: &str) -> Option<&Region> {
        self.by_name.get(name).map(|&idx| &self.regions[idx])
    }

    pub fn code_for(&self, name: &str) -> Option<&str> {
        self.get(name).map(|r| r.code.as_str())
    }

    /// Centroid for `name`, or [`FALLBACK_CENTROID`] when the region is unknown.
    pub fn centroid_or_default(&self, name: &str) -> Centroid {
        self.get(name)
            .map(|r| r.centroid)
            .unwrap_or(FALLBACK_CENTROID)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Regions in table order
    pub fn iter(&self) -> impl Iterator<Item = &Region> {
        self.regions.iter()
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}

impl Default for RegionTable {
    fn default() -> Self {
        Self::seoul()
    }
}

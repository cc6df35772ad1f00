//! Core tree-record types for canopy.
//!
//! This module defines the fundamental data structures for representing
//! surveyed trees, whether they come from municipal inventories or
//! citizen photo surveys.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::geometry::Point;

/// Where a tree record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurveySource {
    /// A municipally published tree inventory.
    Inventory,
    /// A citizen photo survey measured via dendrometry.
    PhotoSurvey,
    /// A bulk import from another dataset.
    Import,
}

impl std::fmt::Display for SurveySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Inventory => write!(f, "inventory"),
            Self::PhotoSurvey => write!(f, "photo_survey"),
            Self::Import => write!(f, "import"),
        }
    }
}

/// A surveyed tree.
///
/// Positions are in a projected CRS (meters). The record hash identifies
/// the tree for deduplication: the same tree reported twice is stored once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeRecord {
    /// Unique identifier for this record (assigned by storage layer).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,

    /// When this record was created.
    pub timestamp: DateTime<Utc>,

    /// Botanical name of the species, e.g. "Ficus religiosa".
    pub botanical_name: String,

    /// Projected location of the trunk.
    pub location: Point,

    /// Canopy diameter in meters.
    pub canopy_dia_m: f64,

    /// Estimated CO2 sequestered, in kilograms.
    pub co2_sequestered_kg: f64,

    /// Tree height in meters, when measured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height_m: Option<f64>,

    /// BLAKE3 hash identifying this tree for deduplication.
    pub record_hash: String,

    /// How this record entered the system.
    pub source: SurveySource,
}

impl TreeRecord {
    /// Create a new tree record.
    ///
    /// Automatically computes the record hash and sets the timestamp to now.
    #[must_use]
    pub fn new(
        botanical_name: String,
        location: Point,
        canopy_dia_m: f64,
        co2_sequestered_kg: f64,
        source: SurveySource,
    ) -> Self {
        let record_hash = Self::compute_hash(&botanical_name, &location, canopy_dia_m);
        Self {
            id: None,
            timestamp: Utc::now(),
            botanical_name,
            location,
            canopy_dia_m,
            co2_sequestered_kg,
            height_m: None,
            record_hash,
            source,
        }
    }

    /// Compute the identity hash for a tree.
    ///
    /// Coordinates are quantized to millimeters so that re-submissions
    /// with floating-point noise still deduplicate.
    #[must_use]
    pub fn compute_hash(botanical_name: &str, location: &Point, canopy_dia_m: f64) -> String {
        let (qx, qy) = location.quantized_mm();
        let key = format!("{botanical_name}|{qx}|{qy}|{canopy_dia_m:.3}");
        blake3::hash(key.as_bytes()).to_hex().to_string()
    }

    /// Projected canopy area in square meters: `pi * (dia/2)^2`.
    #[must_use]
    pub fn canopy_area_sq_m(&self) -> f64 {
        let r = self.canopy_dia_m / 2.0;
        std::f64::consts::PI * r * r
    }

    /// Check if this record's identity matches the given hash.
    #[must_use]
    pub fn matches_hash(&self, hash: &str) -> bool {
        self.record_hash == hash
    }
}

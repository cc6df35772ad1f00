//! Road-network types for canopy.

use serde::{Deserialize, Serialize};

use crate::geometry::{Point, Polyline};

/// A road segment from the ingested network.
///
/// Segments carry a caller-assigned `segment_id` that is stable across
/// re-ingestion; scoring and routing refer to segments by that id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoadSegment {
    /// Storage row id (assigned by the storage layer).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,

    /// The dataset's unique segment identifier.
    pub segment_id: i64,

    /// The segment geometry in projected coordinates.
    pub geometry: Polyline,

    /// Typical traversal speed in km/h, when the dataset provides one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed_kmh: Option<f64>,
}

impl RoadSegment {
    /// Create a new road segment.
    #[must_use]
    pub const fn new(segment_id: i64, geometry: Polyline, speed_kmh: Option<f64>) -> Self {
        Self {
            id: None,
            segment_id,
            geometry,
            speed_kmh,
        }
    }

    /// Segment length in meters.
    #[must_use]
    pub fn length_m(&self) -> f64 {
        self.geometry.length()
    }

    /// Segment length in kilometers.
    #[must_use]
    pub fn length_km(&self) -> f64 {
        self.length_m() / 1000.0
    }

    /// Graph node keys for the two endpoints, quantized to millimeters.
    #[must_use]
    pub fn endpoint_keys(&self) -> ((i64, i64), (i64, i64)) {
        (
            self.geometry.start().quantized_mm(),
            self.geometry.end().quantized_mm(),
        )
    }

    /// Distance from a query point to this segment.
    #[must_use]
    pub fn distance_to(&self, p: &Point) -> f64 {
        self.geometry.distance_to_point(p)
    }
}

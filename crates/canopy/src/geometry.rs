//! Planar geometry primitives for projected (meter-based) coordinates.
//!
//! All geometry in canopy works in a projected CRS where coordinates are
//! meters. Geographic (lat/lon) input must be projected before ingestion.

use serde::{Deserialize, Serialize};

/// A point in a projected coordinate system, in meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Easting in meters.
    pub x: f64,
    /// Northing in meters.
    pub y: f64,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance(&self, other: &Self) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Quantize the coordinates to millimeters.
    ///
    /// Used to key graph nodes and dedup hashes, so that endpoints that
    /// differ only by floating-point noise collapse to the same node.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn quantized_mm(&self) -> (i64, i64) {
        (
            (self.x * 1000.0).round() as i64,
            (self.y * 1000.0).round() as i64,
        )
    }
}

/// A polyline in a projected coordinate system.
///
/// Road segments are represented as polylines with at least two vertices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polyline {
    vertices: Vec<Point>,
}

impl Polyline {
    /// Create a polyline from its vertices.
    ///
    /// Returns `None` if fewer than two vertices are given.
    #[must_use]
    pub fn new(vertices: Vec<Point>) -> Option<Self> {
        if vertices.len() < 2 {
            None
        } else {
            Some(Self { vertices })
        }
    }

    /// The vertices of this polyline.
    #[must_use]
    pub fn vertices(&self) -> &[Point] {
        &self.vertices
    }

    /// The first vertex.
    #[must_use]
    pub fn start(&self) -> Point {
        self.vertices[0]
    }

    /// The last vertex.
    #[must_use]
    pub fn end(&self) -> Point {
        self.vertices[self.vertices.len() - 1]
    }

    /// Total length in meters.
    #[must_use]
    pub fn length(&self) -> f64 {
        self.vertices
            .windows(2)
            .map(|w| w[0].distance(&w[1]))
            .sum()
    }

    /// Shortest distance from a point to this polyline.
    #[must_use]
    pub fn distance_to_point(&self, p: &Point) -> f64 {
        self.vertices
            .windows(2)
            .map(|w| segment_distance(&w[0], &w[1], p))
            .fold(f64::INFINITY, f64::min)
    }

    /// Approximate area of a round-capped buffer of radius `b` around
    /// this polyline: `2*b*L + pi*b^2`. Overlap at bends is ignored,
    /// which matches the per-segment treatment of near-straight roads.
    #[must_use]
    pub fn buffer_area(&self, b: f64) -> f64 {
        2.0 * b * self.length() + std::f64::consts::PI * b * b
    }

}

/// Distance from point `p` to the segment `a`-`b`.
fn segment_distance(a: &Point, b: &Point, p: &Point) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len_sq = dx * dx + dy * dy;
    if len_sq == 0.0 {
        return a.distance(p);
    }
    let t = (((p.x - a.x) * dx + (p.y - a.y) * dy) / len_sq).clamp(0.0, 1.0);
    let proj = Point::new(a.x + t * dx, a.y + t * dy);
    proj.distance(p)
}

/// A coordinate reference system identifier, e.g. `"EPSG:32643"`.
///
/// canopy does not re-project; it only checks that datasets agree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Crs(String);

impl Crs {
    /// Create a CRS from its authority string.
    #[must_use]
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// The authority string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Crs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

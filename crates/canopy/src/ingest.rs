//! GeoJSON ingestion for tree inventories and road networks.
//!
//! Tree inventories are FeatureCollections of Points with
//! `botanical_name`, `canopy_dia_m`, and `CO2_sequestered_kg` properties.
//! Road networks are FeatureCollections of LineStrings with a
//! `segment_id` property and an optional `speed_kmh`.
//!
//! Coordinates must be projected (meters). The collection may carry a
//! legacy `crs` member naming its CRS; otherwise the configured default
//! applies.

use std::path::Path;

use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::geometry::{Crs, Point, Polyline};
use crate::network::RoadSegment;
use crate::survey::{SurveySource, TreeRecord};

/// A parsed tree inventory.
#[derive(Debug, Clone)]
pub struct TreeDataset {
    /// The CRS the coordinates are in.
    pub crs: Crs,
    /// The parsed tree records.
    pub trees: Vec<TreeRecord>,
}

/// A parsed road network.
#[derive(Debug, Clone)]
pub struct RoadDataset {
    /// The CRS the coordinates are in.
    pub crs: Crs,
    /// The parsed road segments.
    pub segments: Vec<RoadSegment>,
}

/// Load a tree inventory from a GeoJSON file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or a feature is invalid.
pub fn load_trees(path: impl AsRef<Path>, default_crs: &str) -> Result<TreeDataset> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)?;
    let dataset = parse_trees(&text, path, default_crs)?;
    info!(
        path = %path.display(),
        trees = dataset.trees.len(),
        crs = %dataset.crs,
        "tree inventory loaded"
    );
    Ok(dataset)
}

/// Load a road network from a GeoJSON file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or a feature is invalid.
pub fn load_roads(path: impl AsRef<Path>, default_crs: &str) -> Result<RoadDataset> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)?;
    let dataset = parse_roads(&text, path, default_crs)?;
    info!(
        path = %path.display(),
        segments = dataset.segments.len(),
        crs = %dataset.crs,
        "road network loaded"
    );
    Ok(dataset)
}

// --- GeoJSON wire types ---

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    crs: Option<CrsMember>,
    features: Vec<Feature>,
}

/// The legacy GeoJSON `crs` member: `{"type": "name", "properties": {"name": ...}}`.
#[derive(Debug, Deserialize)]
struct CrsMember {
    properties: CrsProperties,
}

#[derive(Debug, Deserialize)]
struct CrsProperties {
    name: String,
}

#[derive(Debug, Deserialize)]
struct Feature {
    geometry: Geometry,
    #[serde(default)]
    properties: serde_json::Value,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum Geometry {
    Point { coordinates: Vec<f64> },
    LineString { coordinates: Vec<Vec<f64>> },
    #[serde(other)]
    Unsupported,
}

fn parse_collection(text: &str, path: &Path) -> Result<FeatureCollection> {
    let collection: FeatureCollection = serde_json::from_str(text)
        .map_err(|e| Error::ingest(path, format!("invalid GeoJSON: {e}")))?;
    if collection.kind != "FeatureCollection" {
        return Err(Error::ingest(
            path,
            format!("expected a FeatureCollection, got {}", collection.kind),
        ));
    }
    Ok(collection)
}

fn collection_crs(collection: &FeatureCollection, default_crs: &str) -> Crs {
    collection
        .crs
        .as_ref()
        .map_or_else(|| Crs::new(default_crs), |c| Crs::new(c.properties.name.clone()))
}

fn parse_trees(text: &str, path: &Path, default_crs: &str) -> Result<TreeDataset> {
    let collection = parse_collection(text, path)?;
    let crs = collection_crs(&collection, default_crs);

    let mut trees = Vec::with_capacity(collection.features.len());
    for (index, feature) in collection.features.into_iter().enumerate() {
        let location = match feature.geometry {
            Geometry::Point { coordinates } if coordinates.len() >= 2 => {
                Point::new(coordinates[0], coordinates[1])
            }
            Geometry::Point { .. } => {
                return Err(Error::ingest(
                    path,
                    format!("feature {index}: point needs two coordinates"),
                ));
            }
            _ => {
                return Err(Error::ingest(
                    path,
                    format!("feature {index}: tree inventory features must be Points"),
                ));
            }
        };

        let props: TreeProperties = serde_json::from_value(feature.properties)
            .map_err(|e| Error::ingest(path, format!("feature {index}: {e}")))?;

        if props.canopy_dia_m < 0.0 {
            return Err(Error::ingest(
                path,
                format!("feature {index}: canopy_dia_m must not be negative"),
            ));
        }

        let mut tree = TreeRecord::new(
            props.botanical_name,
            location,
            props.canopy_dia_m,
            props.co2_sequestered_kg,
            SurveySource::Inventory,
        );
        tree.height_m = props.height_m;
        debug!(index, hash = %tree.record_hash, "tree feature parsed");
        trees.push(tree);
    }

    Ok(TreeDataset { crs, trees })
}

#[derive(Debug, Deserialize)]
struct TreeProperties {
    botanical_name: String,
    canopy_dia_m: f64,
    #[serde(rename = "CO2_sequestered_kg")]
    co2_sequestered_kg: f64,
    #[serde(default)]
    height_m: Option<f64>,
}

fn parse_roads(text: &str, path: &Path, default_crs: &str) -> Result<RoadDataset> {
    let collection = parse_collection(text, path)?;
    let crs = collection_crs(&collection, default_crs);

    let mut segments = Vec::with_capacity(collection.features.len());
    for (index, feature) in collection.features.into_iter().enumerate() {
        let coordinates = match feature.geometry {
            Geometry::LineString { coordinates } => coordinates,
            _ => {
                return Err(Error::ingest(
                    path,
                    format!("feature {index}: road features must be LineStrings"),
                ));
            }
        };

        let vertices: Vec<Point> = coordinates
            .iter()
            .map(|c| {
                if c.len() >= 2 {
                    Ok(Point::new(c[0], c[1]))
                } else {
                    Err(Error::ingest(
                        path,
                        format!("feature {index}: coordinate needs two values"),
                    ))
                }
            })
            .collect::<Result<_>>()?;

        let geometry = Polyline::new(vertices).ok_or_else(|| {
            Error::ingest(
                path,
                format!("feature {index}: LineString needs at least two coordinates"),
            )
        })?;

        let props: RoadProperties = serde_json::from_value(feature.properties)
            .map_err(|e| Error::ingest(path, format!("feature {index}: {e}")))?;

        segments.push(RoadSegment::new(props.segment_id, geometry, props.speed_kmh));
    }

    Ok(RoadDataset { crs, segments })
}

#[derive(Debug, Deserialize)]
struct RoadProperties {
    segment_id: i64,
    #[serde(default)]
    speed_kmh: Option<f64>,
}

//! `canopy` - Citizen tree data for cooler, greener cities
//!
//! This library ingests municipal tree inventories and citizen photo
//! surveys, scores road segments by the green cover around them, and
//! routes vehicles and pedestrians along eco-friendly paths.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod cli;
pub mod config;
pub mod dendrometry;
pub mod error;
pub mod geometry;
pub mod ingest;
pub mod logging;
pub mod network;
pub mod routing;
pub mod scoring;
pub mod storage;
pub mod survey;

pub use config::Config;
pub use error::{Error, Result};
pub use geometry::{Crs, Point, Polyline};
pub use logging::init_logging;
pub use network::RoadSegment;
pub use routing::{Route, RouteProfile};
pub use scoring::SegmentScores;
pub use storage::{Storage, StorageStats};
pub use survey::{SurveySource, TreeRecord};

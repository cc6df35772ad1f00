//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

use crate::geometry::Point;

/// Parse an "X,Y" coordinate pair in projected meters.
fn parse_point(s: &str) -> Result<Point, String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("expected X,Y but got '{s}'"))?;
    let x: f64 = x
        .trim()
        .parse()
        .map_err(|_| format!("invalid easting: '{x}'"))?;
    let y: f64 = y
        .trim()
        .parse()
        .map_err(|_| format!("invalid northing: '{y}'"))?;
    Ok(Point::new(x, y))
}

/// Ingest commands.
#[derive(Debug, Subcommand)]
pub enum IngestCommand {
    /// Ingest a tree inventory from a GeoJSON file
    Trees {
        /// Path to the GeoJSON file
        path: PathBuf,
    },

    /// Ingest a road network from a GeoJSON file
    Roads {
        /// Path to the GeoJSON file
        path: PathBuf,
    },
}

/// Score command arguments.
#[derive(Debug, Args)]
pub struct ScoreCommand {
    /// Buffer radius in meters (overrides configuration)
    #[arg(short, long)]
    pub buffer: Option<f64>,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Route command arguments.
#[derive(Debug, Args)]
pub struct RouteCommand {
    /// Origin as "X,Y" in projected meters
    #[arg(long, value_parser = parse_point)]
    pub from: Point,

    /// Destination as "X,Y" in projected meters
    #[arg(long, value_parser = parse_point)]
    pub to: Point,

    /// Routing profile
    #[arg(short, long, value_enum, default_value = "vehicle")]
    pub profile: ProfileArg,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Analyze command arguments.
#[derive(Debug, Args)]
pub struct AnalyzeCommand {
    /// Segment ids making up the route, in order
    #[arg(short, long, required = true, num_args = 1.., value_delimiter = ',')]
    pub segments: Vec<i64>,

    /// Route length in kilometers
    #[arg(short, long)]
    pub length_km: f64,

    /// Travel time in minutes
    #[arg(short, long)]
    pub time_min: f64,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Measure command arguments.
#[derive(Debug, Args)]
pub struct MeasureCommand {
    /// Camera sensor width in millimeters
    #[arg(long)]
    pub sensor_width: f64,

    /// Camera focal length in millimeters
    #[arg(long)]
    pub focal_length: f64,

    /// Distance from camera to tree in meters
    #[arg(short, long)]
    pub distance: f64,

    /// Image width in pixels
    #[arg(short, long)]
    pub image_width: u32,

    /// Tree height in pixels
    #[arg(long)]
    pub height_px: u32,

    /// Canopy width in pixels
    #[arg(long)]
    pub canopy_px: Option<u32>,

    /// Trunk diameter at breast height in pixels
    #[arg(long)]
    pub dbh_px: Option<u32>,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Segment query commands.
#[derive(Debug, Subcommand)]
pub enum SegmentsCommand {
    /// Show the best-scoring segments
    Top {
        /// Number of segments to show
        #[arg(short = 'n', long, default_value = "10")]
        limit: usize,

        /// Composite score to rank by
        #[arg(short, long, value_enum, default_value = "eqs")]
        by: RankArg,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },
}

/// Status command arguments.
#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Routing profile argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ProfileArg {
    /// Vehicular routing, minimizes emissions alongside distance
    #[default]
    Vehicle,
    /// Pedestrian routing, maximizes serenity
    Pedestrian,
}

impl From<ProfileArg> for crate::routing::RouteProfile {
    fn from(arg: ProfileArg) -> Self {
        match arg {
            ProfileArg::Vehicle => Self::Vehicle,
            ProfileArg::Pedestrian => Self::Pedestrian,
        }
    }
}

/// Score-ranking argument for segment queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum RankArg {
    /// Static environmental quality score
    #[default]
    Eqs,
    /// Serenity score
    Serenity,
}

impl From<RankArg> for crate::storage::ScoreRank {
    fn from(arg: RankArg) -> Self {
        match arg {
            RankArg::Eqs => Self::StaticEqs,
            RankArg::Serenity => Self::Serenity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_point_ok() {
        let p = parse_point("100.5, 200").unwrap();
        assert!((p.x - 100.5).abs() < 1e-12);
        assert!((p.y - 200.0).abs() < 1e-12);
    }

    #[test]
    fn test_parse_point_errors() {
        assert!(parse_point("100.5").is_err());
        assert!(parse_point("abc,200").is_err());
        assert!(parse_point("100,xyz").is_err());
    }

    #[test]
    fn test_profile_arg_conversion() {
        assert_eq!(
            crate::routing::RouteProfile::from(ProfileArg::Vehicle),
            crate::routing::RouteProfile::Vehicle
        );
        assert_eq!(
            crate::routing::RouteProfile::from(ProfileArg::Pedestrian),
            crate::routing::RouteProfile::Pedestrian
        );
    }

    #[test]
    fn test_rank_arg_conversion() {
        assert_eq!(
            crate::storage::ScoreRank::from(RankArg::Eqs),
            crate::storage::ScoreRank::StaticEqs
        );
        assert_eq!(
            crate::storage::ScoreRank::from(RankArg::Serenity),
            crate::storage::ScoreRank::Serenity
        );
    }

    #[test]
    fn test_profile_arg_default() {
        assert_eq!(ProfileArg::default(), ProfileArg::Vehicle);
    }

    #[test]
    fn test_rank_arg_default() {
        assert_eq!(RankArg::default(), RankArg::Eqs);
    }

    #[test]
    fn test_ingest_command_debug() {
        let cmd = IngestCommand::Trees {
            path: PathBuf::from("trees.geojson"),
        };
        let debug_str = format!("{cmd:?}");
        assert!(debug_str.contains("Trees"));
        assert!(debug_str.contains("trees.geojson"));
    }

    #[test]
    fn test_route_command_debug() {
        let cmd = RouteCommand {
            from: Point::new(0.0, 0.0),
            to: Point::new(100.0, 100.0),
            profile: ProfileArg::Pedestrian,
            json: false,
        };
        let debug_str = format!("{cmd:?}");
        assert!(debug_str.contains("Pedestrian"));
    }

    #[test]
    fn test_measure_command_debug() {
        let cmd = MeasureCommand {
            sensor_width: 6.17,
            focal_length: 4.25,
            distance: 12.5,
            image_width: 4032,
            height_px: 1850,
            canopy_px: None,
            dbh_px: None,
            json: false,
        };
        let debug_str = format!("{cmd:?}");
        assert!(debug_str.contains("sensor_width"));
    }

    #[test]
    fn test_config_command_debug() {
        let cmd = ConfigCommand::Show { json: false };
        let debug_str = format!("{cmd:?}");
        assert!(debug_str.contains("Show"));
    }
}

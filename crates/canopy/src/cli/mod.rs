//! Command-line interface for canopy.
//!
//! This module provides the CLI structure and command definitions for the
//! `canopy` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    AnalyzeCommand, ConfigCommand, IngestCommand, MeasureCommand, ProfileArg, RankArg,
    RouteCommand, ScoreCommand, SegmentsCommand, StatusCommand,
};

/// canopy - Citizen tree data for cooler, greener cities
///
/// Ingests tree inventories and road networks, scores road segments by
/// their green cover, and finds eco-friendly routes for vehicles and
/// pedestrians.
#[derive(Debug, Parser)]
#[command(name = "canopy")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Ingest tree or road data
    #[command(subcommand)]
    Ingest(IngestCommand),

    /// Score road segments against the tree inventory
    Score(ScoreCommand),

    /// Find an eco-friendly route between two points
    Route(RouteCommand),

    /// Analyze the holistic cost of a known route
    Analyze(AnalyzeCommand),

    /// Measure a tree from a calibrated photograph
    Measure(MeasureCommand),

    /// Query scored segments
    #[command(subcommand)]
    Segments(SegmentsCommand),

    /// Show database status
    Status(StatusCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        if self.quiet {
            crate::logging::Verbosity::Quiet
        } else {
            match self.verbose {
                0 => crate::logging::Verbosity::Normal,
                1 => crate::logging::Verbosity::Verbose,
                _ => crate::logging::Verbosity::Trace,
            }
        }
    }
}

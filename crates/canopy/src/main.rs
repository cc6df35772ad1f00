//! `canopy` - CLI for citizen tree data and eco-routing
//!
//! This binary ingests tree and road datasets, scores road segments by
//! their green cover, and answers routing and measurement queries.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use anyhow::{Context, Result};
use clap::Parser;

use canopy::cli::{
    AnalyzeCommand, Cli, Command, ConfigCommand, IngestCommand, MeasureCommand, RouteCommand,
    ScoreCommand, SegmentsCommand, StatusCommand,
};
use canopy::dendrometry::{CameraSpec, PhotoSurvey};
use canopy::routing::{analyze_route, RoadNetwork};
use canopy::storage::Storage;
use canopy::{init_logging, ingest, scoring, Config, Error, SegmentScores};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    // Load configuration
    let config =
        Config::load_from(cli.config.clone()).context("could not load configuration")?;

    // Execute the command
    match cli.command {
        Command::Ingest(ingest_cmd) => handle_ingest(&config, &ingest_cmd),
        Command::Score(score_cmd) => handle_score(&config, &score_cmd),
        Command::Route(route_cmd) => handle_route(&config, &route_cmd),
        Command::Analyze(analyze_cmd) => handle_analyze(&config, &analyze_cmd),
        Command::Measure(measure_cmd) => handle_measure(&measure_cmd),
        Command::Segments(segments_cmd) => handle_segments(&config, &segments_cmd),
        Command::Status(status_cmd) => handle_status(&config, &status_cmd),
        Command::Config(config_cmd) => handle_config(&config, config_cmd),
    }
}

fn handle_ingest(
    config: &Config,
    cmd: &IngestCommand,
) -> Result<()> {
    let storage = Storage::open(config.database_path())?;

    match cmd {
        IngestCommand::Trees { path } => {
            let dataset = ingest::load_trees(path, &config.scoring.crs)?;
            storage.set_trees_crs(&dataset.crs)?;
            let summary = storage.insert_trees(&dataset.trees)?;
            println!(
                "Ingested {} trees ({} duplicates skipped) from {}",
                summary.inserted,
                summary.deduplicated,
                path.display()
            );
        }
        IngestCommand::Roads { path } => {
            let dataset = ingest::load_roads(path, &config.scoring.crs)?;
            storage.set_roads_crs(&dataset.crs)?;
            let written = storage.upsert_segments(&dataset.segments)?;
            println!("Ingested {} road segments from {}", written, path.display());
        }
    }
    Ok(())
}

fn handle_score(config: &Config, cmd: &ScoreCommand) -> Result<()> {
    let storage = Storage::open(config.database_path())?;

    // Both datasets must be in the same projected CRS.
    let trees_crs = storage.trees_crs()?;
    let roads_crs = storage.roads_crs()?;
    scoring::ensure_matching_crs(trees_crs.as_ref(), roads_crs.as_ref())?;

    let trees = storage.trees()?;
    let segments = storage.segments()?;
    if segments.is_empty() {
        return Err(Error::EmptyNetwork.into());
    }

    let mut scoring_config = config.scoring.clone();
    if let Some(buffer) = cmd.buffer {
        scoring_config.buffer_meters = buffer;
    }

    let scores = scoring::score_segments(&segments, &trees, &scoring_config);
    storage.save_scores(&scores)?;

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&scores)?);
    } else {
        println!(
            "Scored {} segments against {} trees (buffer: {} m)",
            scores.len(),
            trees.len(),
            scoring_config.buffer_meters
        );
        print_score_table(&scores);
    }
    Ok(())
}

fn handle_route(config: &Config, cmd: &RouteCommand) -> Result<()> {
    let storage = Storage::open(config.database_path())?;
    let segments = storage.segments()?;
    let scores = storage.scores()?;

    let network = RoadNetwork::new(segments, scores, config.routing.clone())?;
    let route = network.find_route(cmd.from, cmd.to, cmd.profile.into())?;

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&route)?);
    } else {
        println!("Route ({} profile)", route.profile);
        println!("------------------");
        println!(
            "Segments:      {}",
            route
                .segment_ids
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(" -> ")
        );
        println!("Length:        {:.2} km", route.length_km);
        println!("Time:          {:.1} min", route.time_min);
        println!("Holistic cost: {:.4}", route.breakdown.holistic_cost);
        println!("Avg eco score: {:.3}", route.breakdown.avg_eco_score);
        println!(
            "Emissions:     {:.3} kg CO2",
            route.breakdown.total_emissions_kg
        );
    }
    Ok(())
}

fn handle_analyze(
    config: &Config,
    cmd: &AnalyzeCommand,
) -> Result<()> {
    let storage = Storage::open(config.database_path())?;
    let scores = storage.scores_for(&cmd.segments)?;
    let eco_scores: Vec<f64> = scores.iter().map(|s| s.static_eqs).collect();

    let breakdown = analyze_route(&eco_scores, cmd.length_km, cmd.time_min, &config.routing);

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&breakdown)?);
    } else {
        println!("Route analysis");
        println!("--------------");
        println!("Length:          {:.2} km", cmd.length_km);
        println!("Time:            {:.1} min", cmd.time_min);
        println!("Avg speed:       {:.1} km/h", breakdown.avg_speed_kmh);
        println!("Avg eco score:   {:.3}", breakdown.avg_eco_score);
        println!("Emissions:       {:.3} kg CO2", breakdown.total_emissions_kg);
        println!("Distance cost:   {:.4}", breakdown.distance_cost);
        println!("Emissions cost:  {:.4}", breakdown.emissions_cost);
        println!("Eco reward:      {:.4}", breakdown.environmental_reward);
        println!("Holistic cost:   {:.4}", breakdown.holistic_cost);
    }
    Ok(())
}

fn handle_measure(cmd: &MeasureCommand) -> Result<()> {
    let survey = PhotoSurvey::new(
        CameraSpec::new(cmd.sensor_width, cmd.focal_length),
        cmd.distance,
        cmd.image_width,
    );
    let measurement = survey.measure_tree(cmd.height_px, cmd.canopy_px, cmd.dbh_px)?;

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&measurement)?);
    } else {
        println!("Tree measurement");
        println!("----------------");
        println!(
            "Scale factor: {:.6} m/px",
            measurement.scale_factor_m_per_px
        );
        println!("Height:       {:.2} m", measurement.height_m);
        if let Some(canopy) = measurement.canopy_dia_m {
            println!("Canopy dia:   {canopy:.2} m");
        }
        if let Some(dbh) = measurement.dbh_m {
            println!("DBH:          {:.3} m", dbh);
        }
    }
    Ok(())
}

fn handle_segments(
    config: &Config,
    cmd: &SegmentsCommand,
) -> Result<()> {
    let storage = Storage::open(config.database_path())?;

    match cmd {
        SegmentsCommand::Top { limit, by, json } => {
            let scores = storage.top_segments(*limit, (*by).into())?;
            if scores.is_empty() {
                return Err(Error::NotScored.into());
            }
            if *json {
                println!("{}", serde_json::to_string_pretty(&scores)?);
            } else {
                print_score_table(&scores);
            }
        }
    }
    Ok(())
}

fn handle_status(config: &Config, cmd: &StatusCommand) -> Result<()> {
    let storage = Storage::open(config.database_path())?;
    let stats = storage.stats()?;

    if cmd.json {
        let status = serde_json::json!({
            "database_path": config.database_path(),
            "trees_crs": storage.trees_crs()?.map(|c| c.to_string()),
            "roads_crs": storage.roads_crs()?.map(|c| c.to_string()),
            "stats": stats,
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        println!("canopy status");
        println!("-------------");
        println!("Database:         {}", config.database_path().display());
        println!("Trees:            {}", stats.tree_count);
        println!("Species:          {}", stats.species_count);
        println!("Road segments:    {}", stats.segment_count);
        println!("Scored segments:  {}", stats.scored_segments);
        if let Some(newest) = stats.newest_record {
            println!("Newest record:    {}", newest.to_rfc3339());
        }
        println!("Database size:    {} bytes", stats.db_size_bytes);
    }
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Storage]");
                println!("  Database path:    {}", config.database_path().display());
                println!();
                println!("[Scoring]");
                println!("  Buffer (m):       {}", config.scoring.buffer_meters);
                println!("  Expected CRS:     {}", config.scoring.crs);
                println!(
                    "  EQS weights:      canopy {} / co2 {} / bio {}",
                    config.scoring.eqs_canopy_weight,
                    config.scoring.eqs_co2_weight,
                    config.scoring.eqs_bio_weight
                );
                println!(
                    "  Serenity weights: canopy {} / bio {}",
                    config.scoring.serenity_canopy_weight, config.scoring.serenity_bio_weight
                );
                println!();
                println!("[Routing]");
                println!(
                    "  Cost weights:     distance {} / emissions {} / eco {}",
                    config.routing.distance_weight,
                    config.routing.emissions_weight,
                    config.routing.eco_weight
                );
                println!(
                    "  Emission model:   k1 {} / k2 {} / k3 {}",
                    config.routing.emission_k1,
                    config.routing.emission_k2,
                    config.routing.emission_k3
                );
                println!("  Default speed:    {} km/h", config.routing.default_speed_kmh);
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => println!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}

fn print_score_table(scores: &[SegmentScores]) {
    println!(
        "{:>10}  {:>10}  {:>10}  {:>8}  {:>8}  {:>8}",
        "segment", "canopy m2", "co2 kg", "species", "eqs", "serenity"
    );
    for s in scores {
        println!(
            "{:>10}  {:>10.1}  {:>10.1}  {:>8}  {:>8.3}  {:>8.3}",
            s.segment_id,
            s.canopy_area_sq_m,
            s.co2_total_kg,
            s.species_count,
            s.static_eqs,
            s.serenity
        );
    }
}

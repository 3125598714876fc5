// SPDX-License-Identifier: MIT
// Copyright (c) 2020 Austin Goudge
// Copyright (c) 2026 StarTuz

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};
use std::path::PathBuf;
use x_navdat_core::{AirportKind, NavDataManager};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to X-Plane root
    #[arg(short, long, env = "XPLANE_ROOT")]
    root: Option<PathBuf>,

    /// Path to the navigation database
    #[arg(short, long, default_value = "navdata.db")]
    db: PathBuf,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan the installation and build the navigation database
    Build {
        /// Re-parse files already recorded in the database
        #[arg(long)]
        force: bool,
    },
    /// Query airports
    Airports {
        /// ICAO substring
        #[arg(long)]
        icao: Option<String>,
        #[arg(long)]
        country: Option<String>,
        #[arg(long)]
        state: Option<String>,
        #[arg(long)]
        city: Option<String>,
        /// land, seaplane or heliport
        #[arg(long)]
        kind: Option<String>,
        #[arg(long)]
        min_elevation: Option<i64>,
        #[arg(long)]
        max_elevation: Option<i64>,
        /// Center latitude, longitude and radius in km
        #[arg(long, num_args = 3, value_names = ["LAT", "LON", "KM"], allow_negative_numbers = true)]
        near: Option<Vec<f64>>,
        #[arg(long, default_value_t = 100)]
        limit: usize,
        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },
    /// List the runways of an airport
    Runways {
        icao: String,
        #[arg(long)]
        surface: Option<i64>,
        #[arg(long)]
        min_width: Option<f64>,
        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        TermLogger::init(
            LevelFilter::Debug,
            Config::default(),
            TerminalMode::Mixed,
            ColorChoice::Auto,
        )?;
    }

    match &cli.command {
        Commands::Build { force } => {
            let root = cli
                .root
                .clone()
                .context("no X-Plane root given; use --root or XPLANE_ROOT")?;

            let mut manager = NavDataManager::new(&root);
            let found = manager.scan()?;
            println!("Found {found} apt.dat file(s) under {}", root.display());

            manager.connect(&cli.db)?;
            let stats = manager.parse_and_load(*force)?;

            println!(
                "Parsed {} file(s), skipped {} already ingested",
                stats.files_parsed, stats.files_skipped
            );
            println!(
                "  airports:         {:>8} ({} replaced by add-ons, {} without ICAO)",
                stats.airports, stats.airports_replaced, stats.airports_skipped
            );
            println!("  runways:          {:>8}", stats.runways);
            println!("  taxiway nodes:    {:>8}", stats.taxiway_nodes);
            println!("  taxiway edges:    {:>8}", stats.taxiway_edges);
            println!("  linear features:  {:>8}", stats.linear_features);
            println!("  feature nodes:    {:>8}", stats.linear_feature_nodes);
            println!("  startup spots:    {:>8}", stats.startup_locations);
            println!("Database written to {}", cli.db.display());
        }

        Commands::Airports {
            icao,
            country,
            state,
            city,
            kind,
            min_elevation,
            max_elevation,
            near,
            limit,
            json,
        } => {
            let manager = connect_existing(&cli)?;
            let query = manager.airport_query()?;

            let mut builder = query.airports().max_results(*limit);
            if let Some(icao) = icao {
                builder = builder.icao(icao.as_str());
            }
            if let Some(country) = country {
                builder = builder.country(country.as_str());
            }
            if let Some(state) = state {
                builder = builder.state(state.as_str());
            }
            if let Some(city) = city {
                builder = builder.city(city.as_str());
            }
            if let Some(kind) = kind {
                let kind = AirportKind::from_str(kind)
                    .context("--kind must be land, seaplane or heliport")?;
                builder = builder.kind(kind);
            }
            if min_elevation.is_some() || max_elevation.is_some() {
                builder = builder.elevation_range(
                    min_elevation.unwrap_or(i64::MIN),
                    max_elevation.unwrap_or(i64::MAX),
                );
            }
            if let Some(near) = near {
                builder = builder.near(near[0], near[1], near[2]);
            }

            let results = builder.execute()?;
            if *json {
                println!("{}", serde_json::to_string_pretty(&results)?);
            } else {
                println!(
                    "{:<5} {:<5} {:>6} {:<9} {:<18} {}",
                    "ICAO", "IATA", "ELEV", "KIND", "COUNTRY", "NAME"
                );
                for airport in &results {
                    println!(
                        "{:<5} {:<5} {:>6} {:<9} {:<18} {}",
                        airport.icao.as_deref().unwrap_or("-"),
                        airport.iata.as_deref().unwrap_or("-"),
                        airport
                            .elevation
                            .map(|e| e.to_string())
                            .unwrap_or_else(|| "-".to_string()),
                        airport.kind.map(|k| k.as_str()).unwrap_or("-"),
                        airport.country.as_deref().unwrap_or("-"),
                        airport.display_name(),
                    );
                }
                println!("{} airport(s)", results.len());
            }
        }

        Commands::Runways {
            icao,
            surface,
            min_width,
            json,
        } => {
            let manager = connect_existing(&cli)?;
            let query = manager.airport_query()?;

            let mut builder = query.runways().airport_icao(icao.as_str());
            if let Some(surface) = surface {
                builder = builder.surface(*surface);
            }
            if let Some(min_width) = min_width {
                builder = builder.min_width(*min_width);
            }

            let results = builder.execute()?;
            if *json {
                println!("{}", serde_json::to_string_pretty(&results)?);
            } else {
                for runway in &results {
                    println!(
                        "{:<9} width {:>6.1} m   surface {}   length {:>6.0} m",
                        runway.full_runway_name(),
                        runway.width.unwrap_or(0.0),
                        runway
                            .surface
                            .map(|s| s.to_string())
                            .unwrap_or_else(|| "-".to_string()),
                        runway.length_m(),
                    );
                }
                println!("{} runway(s) at {}", results.len(), icao);
            }
        }
    }

    Ok(())
}

/// Queries run against an existing database only; building is explicit.
fn connect_existing(cli: &Cli) -> Result<NavDataManager> {
    if !cli.db.exists() {
        bail!(
            "database {} not found; run `x-navdat build` first",
            cli.db.display()
        );
    }
    let root = cli.root.clone().unwrap_or_else(|| PathBuf::from("."));
    let mut manager = NavDataManager::new(root);
    manager.connect(&cli.db)?;
    Ok(manager)
}

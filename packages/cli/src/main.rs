#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line host for the safety map.
//!
//! Each subcommand drives one session entry point against the live
//! Overpass API and prints the result as text, HTML popup markup, or JSON.

use std::path::{Path, PathBuf};

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use safety_map_analysis::district::DistrictData;
use safety_map_analysis::{AppConfig, Session};
use safety_map_classify::ServiceCategory;
use safety_map_poi_models::Coordinates;
use safety_map_summary::{DistrictPopup, FeatureDot, HtmlRenderer, Renderer, TextRenderer};
use safety_map_visibility::Layer;
use serde::Serialize;

#[derive(Parser)]
#[command(name = "safety_map", about = "Emergency service coverage around named places")]
struct Cli {
    /// TOML config file replacing the built-in defaults
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Html,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// List the configured named locations
    Locations,
    /// Count emergency services within a radius of every location
    Proximity {
        /// Search radius in meters (defaults to the configured radius)
        #[arg(long)]
        radius: Option<f64>,
        /// Map zoom; feature dots are listed at or above the marker zoom
        #[arg(long)]
        zoom: Option<i32>,
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Find the nearest facility of a type to a location
    Nearest {
        /// Location key (e.g., "home")
        #[arg(long)]
        from: String,
        /// One of `hospital`, `police`, `fire_station`
        #[arg(long, value_parser = parse_service)]
        service: ServiceCategory,
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Load a district boundary and summarize emergency and tourism features
    District {
        /// `GeoJSON` boundary file; the first feature is the district
        #[arg(long)]
        boundary: PathBuf,
        /// Map zoom; markers are listed at or above the zoom threshold
        #[arg(long)]
        zoom: Option<i32>,
        /// Show the emergency layer
        #[arg(long, default_value_t = true, action = ArgAction::Set)]
        emergency: bool,
        /// Show the tourism layer
        #[arg(long, default_value_t = false, action = ArgAction::Set)]
        tourism: bool,
        /// Click position as `lat,lon`
        #[arg(long, value_parser = parse_point)]
        point: Option<Coordinates>,
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Show area and population density of the local unit at a point
    LocalUnit {
        /// `GeoJSON` file of local units keyed by `GaPa_NaPa`
        #[arg(long)]
        boundary: PathBuf,
        /// Position as `lat,lon`
        #[arg(long, value_parser = parse_point)]
        point: Coordinates,
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

fn parse_point(value: &str) -> Result<Coordinates, String> {
    let (lat, lon) = value
        .split_once(',')
        .ok_or_else(|| format!("expected 'lat,lon', got '{value}'"))?;
    let lat: f64 = lat.trim().parse().map_err(|e| format!("bad latitude: {e}"))?;
    let lon: f64 = lon.trim().parse().map_err(|e| format!("bad longitude: {e}"))?;
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
        return Err(format!("point out of range: {lat},{lon}"));
    }
    Ok(Coordinates::new(lat, lon))
}

fn parse_service(value: &str) -> Result<ServiceCategory, String> {
    value
        .parse::<ServiceCategory>()
        .ok()
        .filter(|category| category.is_tracked())
        .ok_or_else(|| format!("expected hospital, police or fire_station, got '{value}'"))
}

fn emit<T: Serialize + ?Sized>(
    format: OutputFormat,
    value: &T,
    render: impl Fn(&dyn Renderer) -> String,
) -> Result<(), serde_json::Error> {
    match format {
        OutputFormat::Text => println!("{}", render(&TextRenderer)),
        OutputFormat::Html => println!("{}", render(&HtmlRenderer)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
    }
    Ok(())
}

fn separator(format: OutputFormat) -> &'static str {
    match format {
        OutputFormat::Html => "<hr>",
        OutputFormat::Text | OutputFormat::Json => "\n\n",
    }
}

fn read(path: &Path) -> std::io::Result<String> {
    log::debug!("Reading {}", path.display());
    std::fs::read_to_string(path)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DistrictOutput<'a> {
    layers: &'a DistrictData,
    emergency_markers: Vec<FeatureDot>,
    tourism_markers: Vec<FeatureDot>,
    popup: Option<DistrictPopup>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    let config = AppConfig::load(cli.config.as_deref())?;
    let session = Session::connect(config);

    match cli.command {
        Commands::Locations => {
            println!("{:<12} {:<12} {:<24} NAME", "KEY", "CATEGORY", "POSITION");
            println!("{}", "-".repeat(80));
            for location in session.locations() {
                println!(
                    "{:<12} {:<12} {:<24} {}",
                    location.key,
                    location.category.to_string(),
                    location.coordinates.to_string(),
                    location.name
                );
            }
        }
        Commands::Proximity {
            radius,
            zoom,
            format,
        } => {
            if let Some(zoom) = zoom {
                session.on_zoom_changed(zoom);
            }
            let radius = radius.unwrap_or(session.config().proximity.default_radius_m);
            let Some(report) = session.run_proximity_analysis(radius).await? else {
                return Ok(());
            };
            let dots = session.proximity_dots();

            emit(format, report.as_ref(), |renderer| {
                let mut blocks: Vec<String> = report
                    .locations
                    .iter()
                    .map(|location| renderer.location(&location.summary))
                    .collect();
                blocks.push(renderer.region(&report.region));
                blocks.extend(dots.iter().map(|dot| renderer.feature_dot(dot)));
                blocks.join(separator(format))
            })?;
        }
        Commands::Nearest {
            from,
            service,
            format,
        } => {
            let Some(route) = session.run_nearest_route(&from, service).await? else {
                return Ok(());
            };
            emit(format, route.as_ref(), |renderer| {
                let [origin, facility] = route.waypoints;
                format!(
                    "{}{}Route: {origin} -> {facility}",
                    renderer.nearest(&route.popup),
                    separator(format)
                )
            })?;
        }
        Commands::District {
            boundary,
            zoom,
            emergency,
            tourism,
            point,
            format,
        } => {
            session.load_region(&read(&boundary)?)?;
            if let Some(zoom) = zoom {
                session.on_zoom_changed(zoom);
            }
            session.set_toggle(Layer::Emergency, emergency);
            session.set_toggle(Layer::Tourism, tourism);

            let Some((layers, changes)) = session.refresh_district().await? else {
                return Ok(());
            };
            log::debug!("Layer changes: {changes:?}");

            let output = DistrictOutput {
                layers: &layers,
                emergency_markers: session.district_markers(Layer::Emergency),
                tourism_markers: session.district_markers(Layer::Tourism),
                popup: point.and_then(|at| session.district_popup(at)),
            };

            emit(format, &output, |renderer| {
                let mut blocks: Vec<String> = output
                    .emergency_markers
                    .iter()
                    .chain(&output.tourism_markers)
                    .map(|dot| renderer.feature_dot(dot))
                    .collect();
                match (&output.popup, point) {
                    (Some(popup), _) => blocks.push(renderer.district(popup)),
                    (None, Some(at)) => blocks.push(format!("{at} is outside the district")),
                    (None, None) => {}
                }
                blocks.join(separator(format))
            })?;
        }
        Commands::LocalUnit {
            boundary,
            point,
            format,
        } => {
            session.load_local_units(&read(&boundary)?)?;
            session.set_toggle(Layer::LocalUnits, true);
            let stats = session.local_unit_popup(point);

            emit(format, &stats, |renderer| {
                stats.as_ref().map_or_else(
                    || format!("No local unit contains {point}"),
                    |stats| renderer.local_unit(stats),
                )
            })?;
        }
    }

    Ok(())
}

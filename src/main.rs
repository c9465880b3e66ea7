use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use catchment::isochrone::isochrone_wkt;
use catchment::routing::{reachability_wkt, route_wkt};
use catchment::zonation::load_collection;
use catchment::{AppConfig, Catchment};
use catchment_core::NetworkId;
use catchment_core::algo::{IsochroneLayers, IsochroneParams, ZonationConfig};
use catchment_core::model::{DataStatus, TopologyStatus};
use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use geo::Point;
use tracing::info;
use tracing_subscriber::EnvFilter;
use wkt::TryFromWkt;

/// Upper bound for background ingestion of one layer
const DEPLOY_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Parser, Debug)]
#[command(author, version, about = "Road network catchment analysis")]
struct Args {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(ClapArgs, Debug)]
struct NetworkArgs {
    /// Road layer as GeoJSON
    #[arg(long)]
    network: PathBuf,
    /// Coordinate system of the layer when it does not declare one (EPSG:4326 or EPSG:3857)
    #[arg(long)]
    crs: Option<String>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    Geojson,
    Wkt,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build the topology of a road layer and print the build report
    Topology {
        #[command(flatten)]
        network: NetworkArgs,
    },
    /// Shortest route between two coordinates
    Route {
        #[command(flatten)]
        network: NetworkArgs,
        /// Origin as `lon,lat` or WKT `POINT`
        #[arg(long, value_parser = parse_point)]
        from: Point<f64>,
        /// Destination as `lon,lat` or WKT `POINT`
        #[arg(long, value_parser = parse_point)]
        to: Point<f64>,
        #[arg(long, value_enum, default_value_t = Format::Geojson)]
        format: Format,
    },
    /// Edges reachable within a time budget
    Reach {
        #[command(flatten)]
        network: NetworkArgs,
        #[arg(long, value_parser = parse_point)]
        from: Point<f64>,
        /// Budget in minutes
        #[arg(long)]
        budget: f64,
        #[arg(long, value_enum, default_value_t = Format::Geojson)]
        format: Format,
    },
    /// Service-area polygon for a time budget
    Isochrone {
        #[command(flatten)]
        network: NetworkArgs,
        #[arg(long, value_parser = parse_point)]
        from: Point<f64>,
        /// Budget in minutes
        #[arg(long)]
        budget: f64,
        /// Layers to emit, e.g. `isochrone|buffer|point`
        #[arg(long, default_value = "isochrone|buffer|point")]
        layers: String,
        /// Alpha shape parameter in 1/metres
        #[arg(long)]
        alpha: Option<f64>,
        /// Corridor buffer in degrees
        #[arg(long)]
        buffer: Option<f64>,
        #[arg(long, value_enum, default_value_t = Format::Geojson)]
        format: Format,
    },
    /// Match candidate records against growing isochrones
    Zonation {
        #[command(flatten)]
        network: NetworkArgs,
        #[arg(long, value_parser = parse_point)]
        from: Point<f64>,
        /// In-zone record file (CSV or GeoJSON), repeatable
        #[arg(long = "in-zone")]
        in_zone: Vec<PathBuf>,
        /// Out-of-zone record file (CSV or GeoJSON), repeatable
        #[arg(long = "out-of-zone")]
        out_of_zone: Vec<PathBuf>,
        #[arg(long)]
        min_time: Option<f64>,
        #[arg(long)]
        max_time: Option<f64>,
        #[arg(long)]
        step: Option<f64>,
        /// Stop once more than this many in-zone records matched
        #[arg(long)]
        threshold: Option<usize>,
    },
}

fn parse_point(value: &str) -> Result<Point<f64>, String> {
    let trimmed = value.trim();
    if trimmed.to_ascii_uppercase().starts_with("POINT") {
        return Point::try_from_wkt_str(trimmed).map_err(|e| e.to_string());
    }

    let (lon, lat) = trimmed
        .split_once(',')
        .ok_or_else(|| format!("expected lon,lat but got {value:?}"))?;
    let lon: f64 = lon.trim().parse().map_err(|e| format!("bad longitude: {e}"))?;
    let lat: f64 = lat.trim().parse().map_err(|e| format!("bad latitude: {e}"))?;
    Ok(Point::new(lon, lat))
}

fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    let Some(path) = path else {
        return Ok(AppConfig::default());
    };
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    AppConfig::from_toml_str(&source).with_context(|| format!("parsing config {}", path.display()))
}

/// Uploads the layer, waits for ingestion and builds its topology
fn deploy(service: &Catchment, args: &NetworkArgs) -> Result<NetworkId> {
    let source = std::fs::read_to_string(&args.network)
        .with_context(|| format!("reading {}", args.network.display()))?;
    let document: serde_json::Value = serde_json::from_str(&source)
        .with_context(|| format!("parsing {}", args.network.display()))?;

    let name = args
        .network
        .file_stem()
        .map_or_else(|| "network".to_string(), |s| s.to_string_lossy().into_owned());
    let upload = service.upload_network(&name, "", &document, args.crs.as_deref())?;

    let status = service.await_deployment(upload.network, DEPLOY_TIMEOUT)?;
    if status != DataStatus::Deployed {
        bail!("ingestion of {name} ended with status {status:?}");
    }
    Ok(upload.network)
}

fn deploy_routable(service: &Catchment, args: &NetworkArgs) -> Result<NetworkId> {
    let network = deploy(service, args)?;
    service
        .build_topology(network)?
        .into_result()
        .context("topology build failed")?;
    Ok(network)
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn run(service: &Catchment, command: Command) -> Result<()> {
    match command {
        Command::Topology { network } => {
            let id = deploy(service, &network)?;
            let report = service.build_topology(id)?;
            print_json(&report)?;
            if report.status != TopologyStatus::Created {
                bail!("topology check failed");
            }
        }
        Command::Route {
            network,
            from,
            to,
            format,
        } => {
            let id = deploy_routable(service, &network)?;
            let route = service
                .find_route(id, from, to)?
                .ok_or_else(|| anyhow!("no route between {from:?} and {to:?}"))?;
            match format {
                Format::Geojson => print_json(&route.to_geojson()?)?,
                Format::Wkt => println!("{}", route_wkt(&route)),
            }
        }
        Command::Reach {
            network,
            from,
            budget,
            format,
        } => {
            let id = deploy_routable(service, &network)?;
            let reach = service
                .find_reachability(id, from, budget)?
                .ok_or_else(|| anyhow!("no vertex near {from:?}"))?;
            match format {
                Format::Geojson => print_json(&reach.to_geojson()?)?,
                Format::Wkt => println!("{}", reachability_wkt(&reach)),
            }
        }
        Command::Isochrone {
            network,
            from,
            budget,
            layers,
            alpha,
            buffer,
            format,
        } => {
            let id = deploy_routable(service, &network)?;
            let defaults = service.config().isochrone;
            let params = IsochroneParams {
                alpha: alpha.unwrap_or(defaults.alpha),
                buffer_distance: buffer.unwrap_or(defaults.buffer_distance),
                ..defaults
            };
            match format {
                Format::Geojson => {
                    let layers = IsochroneLayers::parse(&layers);
                    let collection = service
                        .isochrone_geojson(id, from, budget, Some(&params), layers)?
                        .ok_or_else(|| anyhow!("no vertex near {from:?}"))?;
                    print_json(&collection)?;
                }
                Format::Wkt => {
                    let isochrone = service
                        .generate_isochrone(id, from, budget, Some(&params))?
                        .ok_or_else(|| anyhow!("no vertex near {from:?}"))?;
                    println!("{}", isochrone_wkt(&isochrone));
                }
            }
        }
        Command::Zonation {
            network,
            from,
            in_zone,
            out_of_zone,
            min_time,
            max_time,
            step,
            threshold,
        } => {
            let collections = in_zone
                .iter()
                .map(|path| (path, true))
                .chain(out_of_zone.iter().map(|path| (path, false)))
                .map(|(path, flag)| {
                    load_collection(path, flag)
                        .with_context(|| format!("loading records {}", path.display()))
                })
                .collect::<Result<Vec<_>>>()?;
            info!(collections = collections.len(), "records loaded");

            let defaults = service.config().zonation;
            let range = ZonationConfig {
                min_time: min_time.unwrap_or(defaults.min_time),
                max_time: max_time.unwrap_or(defaults.max_time),
                step: step.unwrap_or(defaults.step),
                in_zone_threshold: threshold.unwrap_or(defaults.in_zone_threshold),
            };

            let id = deploy_routable(service, &network)?;
            let result = service
                .find_zonation(id, from, &collections, Some(&range))?
                .ok_or_else(|| anyhow!("no vertex near {from:?}"))?;
            print_json(&result.to_geojson()?)?;
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(args.config.as_deref())?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log.filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let service = Catchment::new(config)?;
    run(&service, args.command)
}

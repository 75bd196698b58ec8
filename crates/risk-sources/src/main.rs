//! Risko command line
//!
//! Usage:
//!   risko analyze "Kadikoy, Istanbul" --building-age 35 --detailed
//!   risko map --zoom 11 --bbox 40.8,28.5,41.3,29.5

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use risk_engine::map::{Bounds, MapCatalog, MapScene, MapView};
use risk_engine::report::DetailedReport;
use risk_sources::{AnalysisRequest, RiskPipeline, RiskoConfig};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "risko", about = "Hazard risk scoring for Turkish locations")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Score an address and print the result as JSON
    Analyze {
        address: String,

        /// Building age in years
        #[arg(long)]
        building_age: Option<u32>,

        /// Building type (recorded only)
        #[arg(long)]
        building_type: Option<String>,

        /// Include prioritized recommendations and narratives
        #[arg(long)]
        detailed: bool,

        /// Do not contact any upstream
        #[arg(long)]
        offline: bool,
    },
    /// Render the seeded map catalog as GeoJSON
    Map {
        #[arg(long, default_value_t = 6)]
        zoom: u8,

        /// Viewport as south,west,north,east
        #[arg(long)]
        bbox: Option<String>,
    },
}

fn parse_bbox(raw: &str) -> Result<Bounds> {
    let parts = raw
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .with_context(|| format!("invalid bbox '{}'", raw))?;
    let [south, west, north, east] = parts[..] else {
        bail!("bbox needs four values: south,west,north,east");
    };
    if south > north || west > east {
        bail!("bbox corners are reversed");
    }
    Ok(Bounds {
        south,
        west,
        north,
        east,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match args.command {
        Command::Analyze {
            address,
            building_age,
            building_type,
            detailed,
            offline,
        } => {
            let mut config = RiskoConfig::load()?;
            if offline {
                config = config.without_upstreams();
            }
            let pipeline = RiskPipeline::from_config(&config)?;
            let request = AnalysisRequest {
                address,
                building_age,
                building_type,
            };

            let outcome = pipeline.analyze(&request).await;
            info!(
                "{} -> {:.1} ({:?})",
                request.address, outcome.result.overall_score, outcome.mode
            );
            if let Some(notice) = &outcome.notice {
                info!("Notice: {}", notice);
            }

            let json = if detailed {
                serde_json::to_string_pretty(&DetailedReport::from_result(outcome.result))?
            } else {
                serde_json::to_string_pretty(&outcome)?
            };
            println!("{}", json);
        }
        Command::Map { zoom, bbox } => {
            let viewport = bbox.as_deref().map(parse_bbox).transpose()?;
            let catalog = MapCatalog::seeded();

            let mut view = MapView::new(zoom, None);
            view.set_viewport(viewport);
            let scene: &MapScene = view.refresh(catalog.points());
            info!(
                "Rendered {} of {} places at zoom {}",
                scene.markers.len(),
                catalog.points().len(),
                scene.zoom
            );
            println!("{}", serde_json::to_string_pretty(&scene.to_geojson())?);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bbox() {
        let b = parse_bbox("40.8, 28.5, 41.3, 29.5").unwrap();
        assert_eq!(b.south, 40.8);
        assert_eq!(b.east, 29.5);
        assert!(parse_bbox("1,2,3").is_err());
        assert!(parse_bbox("41,28,40,29").is_err());
        assert!(parse_bbox("a,b,c,d").is_err());
    }

    #[test]
    fn test_cli_parses_subcommands() {
        let args = Args::try_parse_from(["risko", "analyze", "Izmir", "--building-age", "40", "--offline"])
            .unwrap();
        assert!(matches!(
            args.command,
            Command::Analyze { building_age: Some(40), offline: true, .. }
        ));

        let args = Args::try_parse_from(["risko", "map", "--zoom", "13"]).unwrap();
        assert!(matches!(args.command, Command::Map { zoom: 13, bbox: None }));
    }
}

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use futures::StreamExt;
use georange::compute::validation::validate_radius;
use georange::compute::{GeoHash, Precision, query_bits};
use georange::{Circle, Distance, GeoIndex, Location, MemoryStore, circle_ranges};
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Encode a location as a geohash
    #[command(allow_negative_numbers = true)]
    Encode {
        lat: f64,
        lng: f64,
        #[arg(short, long, default_value_t = 10)]
        precision: usize,
    },

    /// Decode a geohash to the center and bounds of its cell
    Decode { geohash: String },

    /// Print the geohash ranges covering a circle
    #[command(allow_negative_numbers = true)]
    Ranges {
        lat: f64,
        lng: f64,
        /// Radius in meters
        radius: f64,
        #[arg(long)]
        json: bool,
    },

    /// Distance in meters between two locations
    #[command(allow_negative_numbers = true)]
    Distance {
        lat1: f64,
        lng1: f64,
        lat2: f64,
        lng2: f64,
    },

    /// Run a live query against an in-memory store fed from stdin
    ///
    /// Each input line is one of `set <key> <lat> <lng>`, `remove <key>`,
    /// `center <lat> <lng>`, `radius <meters>` or `snapshot`. Query events
    /// are printed as JSON lines.
    #[command(allow_negative_numbers = true)]
    Watch {
        lat: f64,
        lng: f64,
        /// Radius in meters
        radius: f64,
        #[arg(short, long, default_value_t = 10)]
        precision: usize,
    },
}

#[derive(Serialize)]
struct RangeOutput<'a> {
    start: &'a str,
    end: &'a str,
}

#[derive(Debug, PartialEq)]
enum WatchCommand {
    Set { key: String, location: Location },
    Remove { key: String },
    Center(Location),
    Radius(Distance),
    Snapshot,
}

impl WatchCommand {
    fn parse(line: &str) -> anyhow::Result<Option<Self>> {
        let parts: Vec<&str> = line.split_whitespace().collect();
        let command = match parts.as_slice() {
            [] => return Ok(None),
            ["set", key, lat, lng] => Self::Set {
                key: key.to_string(),
                location: parse_location(lat, lng)?,
            },
            ["remove", key] => Self::Remove {
                key: key.to_string(),
            },
            ["center", lat, lng] => Self::Center(parse_location(lat, lng)?),
            ["radius", meters] => Self::Radius(Distance::meters(
                meters
                    .parse::<f64>()
                    .with_context(|| format!("invalid radius {:?}", meters))?,
            )),
            ["snapshot"] => Self::Snapshot,
            _ => bail!("unrecognized command: {}", line.trim()),
        };
        Ok(Some(command))
    }
}

fn parse_location(lat: &str, lng: &str) -> anyhow::Result<Location> {
    let lat: f64 = lat
        .parse()
        .with_context(|| format!("invalid latitude {:?}", lat))?;
    let lng: f64 = lng
        .parse()
        .with_context(|| format!("invalid longitude {:?}", lng))?;
    Ok(Location::new(lat, lng)?)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "georange=info,info".into()),
        )
        .init();

    let args = Args::parse();

    match args.command {
        Command::Encode {
            lat,
            lng,
            precision,
        } => {
            let location = Location::new(lat, lng)?;
            println!("{}", GeoHash::encode(&location, Precision::new(precision)?));
        }
        Command::Decode { geohash } => {
            let hash: GeoHash = geohash.parse()?;
            let bounds = hash.bounds();
            println!("{}", bounds.center());
            println!(
                "lat {:.6}..{:.6}, lng {:.6}..{:.6}",
                bounds.min_lat, bounds.max_lat, bounds.min_lng, bounds.max_lng
            );
        }
        Command::Ranges {
            lat,
            lng,
            radius,
            json,
        } => {
            validate_radius(Distance::meters(radius))?;
            let circle = Circle::new(Location::new(lat, lng)?, Distance::meters(radius));
            let ranges = circle_ranges(&circle);
            if json {
                let output: Vec<RangeOutput> = ranges
                    .iter()
                    .map(|range| RangeOutput {
                        start: range.start(),
                        end: range.end(),
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else {
                info!("{} bits, {} ranges", query_bits(&circle), ranges.len());
                for range in ranges {
                    println!("{}", range);
                }
            }
        }
        Command::Distance {
            lat1,
            lng1,
            lat2,
            lng2,
        } => {
            let from = Location::new(lat1, lng1)?;
            let to = Location::new(lat2, lng2)?;
            println!("{:.3}", from.distance_to(&to).in_meters());
        }
        Command::Watch {
            lat,
            lng,
            radius,
            precision,
        } => watch(Location::new(lat, lng)?, Distance::meters(radius), precision).await?,
    }

    Ok(())
}

async fn watch(center: Location, radius: Distance, precision: usize) -> anyhow::Result<()> {
    let index = GeoIndex::<MemoryStore>::builder()
        .precision(precision)
        .build(MemoryStore::new())?;
    let mut query = index.query_at(center, radius)?;
    info!("Watching {}", query.circle());

    let mut events = query.events().context("event stream already taken")?;
    let printer = tokio::spawn(async move {
        while let Some(event) = events.next().await {
            match event {
                Ok(event) => match serde_json::to_string(&event) {
                    Ok(line) => println!("{}", line),
                    Err(e) => warn!("Failed to encode event: {}", e),
                },
                Err(e) => warn!("Query stopped: {}", e),
            }
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let command = match WatchCommand::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                warn!("{:#}", e);
                continue;
            }
        };

        let outcome = match command {
            WatchCommand::Set { key, location } => index.set_location(&key, location).await,
            WatchCommand::Remove { key } => index.remove_location(&key).await,
            WatchCommand::Center(location) => query.set_center(location),
            WatchCommand::Radius(radius) => query.set_radius(radius),
            WatchCommand::Snapshot => {
                println!("{}", serde_json::to_string(&query.snapshot())?);
                Ok(())
            }
        };
        if let Err(e) = outcome {
            warn!("{}", e);
        }
    }

    query.cancel().await?;
    printer.await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            WatchCommand::parse("set car-1 37.77 -122.41").unwrap(),
            Some(WatchCommand::Set {
                key: "car-1".into(),
                location: Location::new(37.77, -122.41).unwrap(),
            })
        );
        assert_eq!(
            WatchCommand::parse("  remove car-1 ").unwrap(),
            Some(WatchCommand::Remove {
                key: "car-1".into()
            })
        );
        assert_eq!(
            WatchCommand::parse("radius 250").unwrap(),
            Some(WatchCommand::Radius(Distance::meters(250.0)))
        );
        assert_eq!(
            WatchCommand::parse("snapshot").unwrap(),
            Some(WatchCommand::Snapshot)
        );
        assert_eq!(WatchCommand::parse("   ").unwrap(), None);
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(WatchCommand::parse("set car-1 95.0 0.0").is_err());
        assert!(WatchCommand::parse("center north 0.0").is_err());
        assert!(WatchCommand::parse("radius far").is_err());
        assert!(WatchCommand::parse("teleport car-1").is_err());
    }

    #[test]
    fn test_args_accept_negative_coordinates() {
        let args = Args::try_parse_from(["georange", "ranges", "-33.86", "151.2", "500"]).unwrap();
        assert!(matches!(args.command, Command::Ranges { lat, .. } if lat == -33.86));
    }
}

use anyhow::Context;
use bus_guide::articles::{dedupe_articles, extract_route_coordinates, save_articles};
use bus_guide::wiki_geosearch::{DEFAULT_SEARCH_LIMIT, DEFAULT_SEARCH_RADIUS_M, GeoSearchClient};
use clap::Parser;
use geojson::GeoJson;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Collects geotagged Wikipedia articles along a bus route",
    long_about = None
)]
struct Args {
    /// Route GeoJSON to sample
    #[arg(long, default_value = "routes/bus100.geojson")]
    route: PathBuf,
    /// Where the de-duplicated article list is written
    #[arg(long, default_value = "data/articles.json")]
    output: PathBuf,
    /// Search radius around each route point, in metres
    #[arg(long, default_value_t = DEFAULT_SEARCH_RADIUS_M)]
    radius: u32,
    /// Maximum articles per point and language
    #[arg(long, default_value_t = DEFAULT_SEARCH_LIMIT)]
    limit: u32,
    #[arg(long, value_delimiter = ',', default_value = "en,de")]
    languages: Vec<String>,
    /// Pause between API requests, in milliseconds
    #[arg(long, default_value_t = 100)]
    delay_ms: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let raw_route = tokio::fs::read_to_string(&args.route)
        .await
        .with_context(|| format!("Failed to read route {}", args.route.display()))?;
    let route: GeoJson = raw_route
        .parse()
        .with_context(|| format!("Failed to parse route {}", args.route.display()))?;

    let coordinates = extract_route_coordinates(&route);
    info!(
        "Collecting Wikipedia articles for {} route points in {:?}",
        coordinates.len(),
        args.languages
    );

    let client = GeoSearchClient::new()?;
    let delay = Duration::from_millis(args.delay_ms);
    let mut collected = vec![];

    for (index, point) in coordinates.iter().enumerate() {
        for lang in &args.languages {
            match client.geosearch(point, args.radius, args.limit, lang).await {
                Ok(articles) => collected.extend(articles),
                Err(err) => warn!(
                    "Error fetching {} articles for coordinates {}, {}: {}",
                    lang,
                    point.lat(),
                    point.lon(),
                    err
                ),
            }

            tokio::time::sleep(delay).await;
        }

        if (index + 1) % 25 == 0 {
            info!("Processed {}/{} route points", index + 1, coordinates.len());
        }
    }

    let unique = dedupe_articles(collected);

    save_articles(&args.output, &unique)?;

    info!(
        "Collected {} unique articles into {}",
        unique.len(),
        args.output.display()
    );

    Ok(())
}

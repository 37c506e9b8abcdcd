use anyhow::{Context, Result};
use clap::Parser;
use geojson_generic_feed::client::{entity_callback, status_callback, EntityCallbacks, FeedManager};
use geojson_generic_feed::config::Config;
use geojson_generic_feed::GenericFeed;
use std::path::PathBuf;

/// Get the default config file path (~/.config/geojson-feed/config.toml)
fn default_config_path() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home)
        .join(".config")
        .join("geojson-feed")
        .join("config.toml"))
}

#[derive(Parser, Debug)]
#[command(
    name = "geojson-feed",
    about = "Poll a GeoJSON feed and report added, updated and removed entries"
)]
struct Args {
    /// Config file (defaults to ~/.config/geojson-feed/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Feed URL
    #[arg(long)]
    url: Option<String>,

    /// Home latitude in degrees
    #[arg(long, allow_hyphen_values = true)]
    latitude: Option<f64>,

    /// Home longitude in degrees
    #[arg(long, allow_hyphen_values = true)]
    longitude: Option<f64>,

    /// Only report entries within this many kilometres of home
    #[arg(long, value_name = "KM")]
    radius: Option<f64>,

    /// Seconds between polls
    #[arg(long, value_name = "SECONDS")]
    interval: Option<u64>,

    /// Poll once and exit
    #[arg(long)]
    once: bool,
}

impl Args {
    fn apply(&self, mut config: Config) -> Config {
        if let Some(url) = &self.url {
            config.url = Some(url.clone());
        }
        if self.latitude.is_some() {
            config.latitude = self.latitude;
        }
        if self.longitude.is_some() {
            config.longitude = self.longitude;
        }
        if self.radius.is_some() {
            config.filter_radius_km = self.radius;
        }
        if let Some(interval) = self.interval {
            config.poll_interval_seconds = interval;
        }
        config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let config_path = match &args.config {
        Some(path) => path.clone(),
        None => default_config_path()?,
    };
    let config = args.apply(
        Config::load(&config_path)
            .with_context(|| format!("Failed to load config from {}", config_path.display()))?,
    );

    let url = config.feed_url().context("No usable feed URL")?;
    let home = config
        .home_coordinates()
        .context("No usable home coordinates")?;
    let radius = config.filter_radius()?;

    let session = reqwest::Client::builder()
        .user_agent(concat!("geojson-feed/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build HTTP client")?;

    let feed = GenericFeed::new(session, home, url.as_str(), radius)
        .with_fetch_options(config.fetch_options());

    let callbacks = EntityCallbacks {
        generate: entity_callback(|external_id| async move {
            tracing::info!(external_id = %external_id, "Entry added");
        }),
        update: entity_callback(|external_id| async move {
            tracing::debug!(external_id = %external_id, "Entry updated");
        }),
        remove: entity_callback(|external_id| async move {
            tracing::info!(external_id = %external_id, "Entry removed");
        }),
    };
    let on_status = status_callback(|update| async move {
        tracing::info!(
            status = %update.status,
            total = update.total,
            created = update.created,
            updated = update.updated,
            removed = update.removed,
            last_timestamp = ?update.last_timestamp,
            "Feed polled"
        );
    });

    let mut manager = FeedManager::with_feed(feed, callbacks, Some(on_status));
    tracing::info!(manager = %manager, "Starting");

    let mut interval = tokio::time::interval(config.poll_interval());
    loop {
        tokio::select! {
            _ = interval.tick() => {
                manager.update().await.context("Feed contained an invalid entry")?;
                if args.once {
                    for entry in manager.feed_entries().values() {
                        println!(
                            "{}\t{}\t{:.1} km\t{}",
                            entry.external_id(),
                            entry.title().unwrap_or("-"),
                            entry.distance_to_home(),
                            entry
                                .publication_date()
                                .map(|d| d.to_rfc3339())
                                .unwrap_or_else(|| "-".to_string()),
                        );
                    }
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted, shutting down");
                break;
            }
        }
    }

    Ok(())
}

// src/main.rs
use clap::Parser;
use log::{error, info};
use std::sync::Arc;
use std::time::Duration;

use vessel_tracker::cache::{CacheTtls, RegionalCache};
use vessel_tracker::config;
use vessel_tracker::feed::VesselFeedController;
use vessel_tracker::utils::{format_coord, setup_logging};
use vessel_tracker::websocket::{StreamClient, StreamClientSettings, StreamRequest};

/// Runs the live vessel feed against a tracker backend and logs snapshots.
#[derive(Debug, Parser)]
#[command(name = "vessel-tracker", version, about)]
struct Args {
    /// Region bucket to scope the feed to, e.g. "north-america".
    #[arg(long)]
    region: Option<String>,

    /// Vessels per page.
    #[arg(long)]
    page_size: Option<usize>,

    /// Skip the stream and poll over REST only.
    #[arg(long, default_value_t = false)]
    rest_only: bool,

    /// Seconds between logged snapshots.
    #[arg(long, default_value_t = 10)]
    snapshot_interval: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    setup_logging().expect("Failed to initialize logging");
    let args = Args::parse();

    let mut config = config::load_config()
        .map_err(|e| anyhow::anyhow!("configuration error: {}", e))?
        .as_ref()
        .clone();
    if args.region.is_some() {
        config.region = args.region.clone();
    }
    if let Some(page_size) = args.page_size {
        config.page_size = page_size;
    }
    let config = Arc::new(config);

    info!("Starting vessel tracker feed (region: {:?})", config.region);

    let cache = Arc::new(RegionalCache::new(CacheTtls::from_config(&config)));
    let client = Arc::new(StreamClient::new(
        StreamClientSettings::from_config(&config),
        StreamRequest {
            region: config.region.clone(),
            page: 1,
            page_size: config.page_size,
            vessel_type: config.vessel_type.clone(),
        },
    ));

    let controller = VesselFeedController::new(Arc::clone(&config), client, cache)?;
    if args.rest_only {
        info!("REST-only mode: skipping stream connect");
        if let Err(e) = controller.refresh_data().await {
            error!("Initial REST fetch failed: {}", e);
        }
    } else {
        controller.start();
    }

    let mut ticker = tokio::time::interval(Duration::from_secs(args.snapshot_interval.max(1)));
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let snapshot = controller.snapshot();
                info!(
                    "Feed: {} vessels (page {}/{}), {} via {}, last update {:?}",
                    snapshot.total_count,
                    snapshot.page,
                    snapshot.total_pages(),
                    snapshot.connection_status,
                    snapshot.connection_type,
                    snapshot.last_updated,
                );
                for vessel in snapshot.vessels.iter().take(5) {
                    info!(
                        "  #{} {} at {} ({} kn)",
                        vessel.id,
                        vessel.name,
                        format_coord(vessel.lat, vessel.lng),
                        vessel.speed_knots.unwrap_or(0.0),
                    );
                }
                if let Some(err) = snapshot.error {
                    error!("Feed error: {}", err);
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down");
                controller.shutdown();
                break;
            }
        }
    }

    Ok(())
}

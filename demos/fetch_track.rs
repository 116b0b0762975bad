//! Fetch vessel tracks by MMSI and print leg summaries.
//!
//! Run with: cargo run --example fetch_track --features http -- 244660000 [more MMSIs...]

use std::sync::Arc;
use std::time::Instant;

use vessel_track::{Feature, SegmentationConfig, TrackFetcher};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mmsis: Vec<u32> = std::env::args()
        .skip(1)
        .map(|arg| arg.parse())
        .collect::<Result<_, _>>()?;
    if mmsis.is_empty() {
        eprintln!("usage: fetch_track <mmsi> [mmsi...]");
        std::process::exit(2);
    }

    let fetcher = TrackFetcher::new()?;
    let config = SegmentationConfig::default();
    let start = Instant::now();

    let progress: vessel_track::http::ProgressCallback = Arc::new(|done, total| {
        eprintln!("  fetched {}/{}", done, total);
    });
    let results = fetcher.fetch_tracks(mmsis, Some(progress)).await;

    for result in results {
        let track = match (result.samples, result.error) {
            (Some(track), _) => track,
            (None, error) => {
                println!("{}: failed ({})", result.mmsi, error.unwrap_or_default());
                continue;
            }
        };

        let geojson = track.to_geojson(&config);
        println!("{}: {} positions, {} legs", result.mmsi, track.len(), geojson.legs().count());
        for feature in geojson.legs() {
            if let Feature::LineString { coordinates, properties } = feature {
                println!(
                    "  {} -> {}  {} pts  {:.2} kn  {} deg  {:.0}s",
                    properties.start_time,
                    properties.end_time,
                    coordinates.len(),
                    properties.avg_sog,
                    properties.avg_cog,
                    properties.duration
                );
            }
        }
    }

    println!("\nDone in {:.2}s", start.elapsed().as_secs_f64());
    Ok(())
}

//! Convert a MarineTraffic track XML file to GeoJSON.
//!
//! Run with: cargo run --example convert_track -- tests/fixtures/track.xml [config.json]
//!
//! The optional second argument is a (partial) segmentation config, e.g.
//! `{"points": true, "timeGapThreshold": 3600}`. Set `RUST_LOG=debug` to see
//! where legs are split.

use std::env;
use std::fs;
use std::process;

use vessel_track::{parse_track_xml, SegmentationConfig};

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("usage: {} <track.xml> [config.json]", args[0]);
        process::exit(2);
    }

    if let Err(e) = run(&args[1], args.get(2).map(String::as_str)) {
        eprintln!("error: {}", e);
        process::exit(1);
    }
}

fn run(track_path: &str, config_path: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let config = match config_path {
        Some(path) => SegmentationConfig::from_json(&fs::read_to_string(path)?)?,
        None => SegmentationConfig::default(),
    };

    let track = parse_track_xml(&fs::read_to_string(track_path)?)?;
    let geojson = track.to_geojson(&config);

    eprintln!(
        "{} positions -> {} legs, {} points",
        track.len(),
        geojson.legs().count(),
        geojson.points().count()
    );
    println!("{}", geojson.to_json_pretty()?);

    Ok(())
}

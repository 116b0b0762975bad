//! # Vessel Track
//!
//! Turns a vessel's position track into a GeoJSON `FeatureCollection`.
//!
//! This library provides:
//! - Track segmentation into legs (time gaps, split locations, speed filter)
//! - Per-leg aggregates: mean speed/course over ground, start/end time, duration
//! - Parsing of MarineTraffic track XML
//! - Rate-limited track fetching by MMSI
//!
//! ## Features
//!
//! - **`parallel`** - Enable parallel batch conversion with rayon
//! - **`http`** - Enable HTTP client for track fetching
//! - **`ffi`** - Enable FFI bindings for mobile platforms (iOS/Android)
//! - **`full`** - Enable all features
//!
//! ## Quick Start
//!
//! ```rust
//! use vessel_track::{parse_track_xml, SegmentationConfig};
//!
//! let xml = r#"<TRACK>
//!   <POS LON="1.51547" LAT="51.405472" SPEED="55" COURSE="148" TIMESTAMP="2013-08-29T00:03:00"/>
//!   <POS LON="1.517997" LAT="51.40287" SPEED="55" COURSE="148" TIMESTAMP="2013-08-29T00:05:00"/>
//! </TRACK>"#;
//!
//! let track = parse_track_xml(xml).unwrap();
//! let geojson = track.to_geojson(&SegmentationConfig::default());
//!
//! assert_eq!(geojson.features.len(), 1);
//! println!("{}", geojson.to_json().unwrap());
//! ```

use serde::{Deserialize, Serialize};

pub mod error;
pub mod geo_utils;
pub mod geojson;
pub mod parse;
pub mod sample_set;
pub mod segmentation;
pub mod stats;
pub mod timestamp;

pub use error::{Result, TrackError};
pub use geo_utils::distance_km;
pub use geojson::{Feature, FeatureCollection, LegProperties, PointProperties};
pub use parse::{parse_track_xml, parse_track_xml_bytes};
pub use sample_set::SampleSet;
pub use segmentation::{to_geojson, to_geojson_batch, SegmentationConfig, SplitLocation};
pub use timestamp::Timestamp;

// HTTP module for track fetching
#[cfg(feature = "http")]
pub mod http;

#[cfg(feature = "http")]
pub use http::{TrackFetcher, VesselTrackResult};

#[cfg(feature = "ffi")]
uniffi::setup_scaffolding!();

/// Initialize logging for Android (only used in FFI)
#[cfg(all(feature = "ffi", target_os = "android"))]
fn init_logging() {
    use android_logger::Config;
    use log::LevelFilter;

    android_logger::init_once(
        Config::default()
            .with_max_level(LevelFilter::Debug)
            .with_tag("VesselTrackRust"),
    );
}

#[cfg(all(feature = "ffi", not(target_os = "android")))]
fn init_logging() {
    // No-op on non-Android platforms
}

// ============================================================================
// Core Types
// ============================================================================

/// A GPS coordinate with latitude and longitude.
///
/// Serializes as the pair `[lat, lng]`.
///
/// # Example
/// ```
/// use vessel_track::GpsPoint;
/// let point = GpsPoint::new(51.405472, 1.51547); // off Ramsgate
/// assert_eq!(point.to_array(), [51.405472, 1.51547]);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct GpsPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GpsPoint {
    /// Create a new GPS point.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Check if the point has valid coordinates.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }

    /// `[lat, lng]`
    pub fn to_array(&self) -> [f64; 2] {
        [self.latitude, self.longitude]
    }
}

impl From<[f64; 2]> for GpsPoint {
    fn from(latlng: [f64; 2]) -> Self {
        Self::new(latlng[0], latlng[1])
    }
}

impl From<GpsPoint> for [f64; 2] {
    fn from(point: GpsPoint) -> Self {
        point.to_array()
    }
}

/// One position report of a vessel.
///
/// `speed` is speed over ground in knots, `course` course over ground in degrees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub latlng: GpsPoint,
    pub speed: f64,
    pub course: f64,
    pub timestamp: Timestamp,
}

impl Sample {
    /// Build a sample, parsing `timestamp`.
    ///
    /// Fails with [`TrackError::SourceData`] when the timestamp is not ISO 8601.
    pub fn new(latitude: f64, longitude: f64, speed: f64, course: f64, timestamp: &str) -> Result<Self> {
        Ok(Self {
            latlng: GpsPoint::new(latitude, longitude),
            speed,
            course,
            timestamp: Timestamp::parse(timestamp)?,
        })
    }
}

impl AsRef<Sample> for Sample {
    fn as_ref(&self) -> &Sample {
        self
    }
}

// ============================================================================
// FFI Exports (only when feature enabled)
// ============================================================================

#[cfg(feature = "ffi")]
mod ffi {
    use super::*;
    use log::{info, warn};

    /// A position sample as handed over by mobile code.
    #[derive(Debug, Clone, uniffi::Record)]
    pub struct FfiSample {
        pub latitude: f64,
        pub longitude: f64,
        pub speed: f64,
        pub course: f64,
        /// ISO 8601
        pub timestamp: String,
    }

    impl FfiSample {
        fn into_sample(self) -> Result<Sample> {
            Sample::new(self.latitude, self.longitude, self.speed, self.course, &self.timestamp)
        }
    }

    fn render(track: &SampleSet, config: &SegmentationConfig) -> Option<String> {
        if let Err(e) = config.validate() {
            warn!("[VesselTrackRust] {}", e);
            return None;
        }
        match track.to_geojson(config).to_json() {
            Ok(json) => Some(json),
            Err(e) => {
                warn!("[VesselTrackRust] {}", e);
                None
            }
        }
    }

    /// Great-circle distance between two points in kilometres.
    #[uniffi::export]
    pub fn ffi_distance_km(p1: GpsPoint, p2: GpsPoint) -> f64 {
        distance_km(&p1, &p2)
    }

    /// Convert samples to a GeoJSON string.
    /// Returns None if any timestamp is unparseable or the config is invalid.
    #[uniffi::export]
    pub fn ffi_track_to_geojson(samples: Vec<FfiSample>, config: SegmentationConfig) -> Option<String> {
        init_logging();
        info!("[VesselTrackRust] ffi_track_to_geojson called with {} samples", samples.len());

        let samples: Result<Vec<Sample>> = samples.into_iter().map(FfiSample::into_sample).collect();
        match samples {
            Ok(samples) => render(&SampleSet::from_samples(samples), &config),
            Err(e) => {
                warn!("[VesselTrackRust] {}", e);
                None
            }
        }
    }

    /// Parse track XML and convert it to a GeoJSON string.
    #[uniffi::export]
    pub fn ffi_track_xml_to_geojson(xml: String, config: SegmentationConfig) -> Option<String> {
        init_logging();
        info!("[VesselTrackRust] ffi_track_xml_to_geojson called with {} bytes", xml.len());

        match parse_track_xml(&xml) {
            Ok(track) => render(&track, &config),
            Err(e) => {
                warn!("[VesselTrackRust] {}", e);
                None
            }
        }
    }

    /// Get default segmentation configuration.
    #[uniffi::export]
    pub fn default_segmentation_config() -> SegmentationConfig {
        init_logging();
        SegmentationConfig::default()
    }

    /// Fetch a vessel's track by MMSI and convert it to a GeoJSON string.
    #[cfg(feature = "http")]
    #[uniffi::export]
    pub fn fetch_track_geojson(mmsi: u32, config: SegmentationConfig) -> Option<String> {
        init_logging();
        info!("[VesselTrackRust] fetch_track_geojson called for MMSI {}", mmsi);

        match crate::http::fetch_track_sync(mmsi) {
            Ok(track) => render(&track, &config),
            Err(e) => {
                warn!("[VesselTrackRust] MMSI {}: {}", mmsi, e);
                None
            }
        }
    }

}

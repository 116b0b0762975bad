//! # Track Segmentation
//!
//! Splits an ordered track into legs and renders them as GeoJSON.
//!
//! ## Algorithm
//!
//! A single forward pass over the samples:
//!
//! 1. **Split detection**: a sample forces a split when the time since the
//!    previous sample (retained or not) exceeds `time_gap_threshold`, or, only
//!    if the time rule did not fire, when it lies inside any split location's
//!    radius.
//! 2. **Speed filter**: samples slower than `speed_threshold` never join a leg
//!    and never become points. They still count as "previous sample" for the
//!    time-gap rule.
//! 3. **Flush**: the open leg is closed into a `LineString` when the current
//!    sample split or is the last one. The splitting sample itself belongs to
//!    the leg it closes.
//!
//! Points (when enabled) are emitted as samples are retained, so they appear
//! before the `LineString` of the leg containing them.
//!
//! The pass assumes the input is chronological. It does not sort.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TrackError};
use crate::geo_utils::distance_km;
use crate::geojson::{Feature, FeatureCollection};
use crate::timestamp::seconds_between;
use crate::{GpsPoint, Sample, SampleSet};

/// A geographic point that forces a leg boundary for any sample within
/// `radius_km` of it (a port, a lock, a mooring).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct SplitLocation {
    pub latitude: f64,
    pub longitude: f64,
    pub radius_km: f64,
}

impl SplitLocation {
    pub fn new(latitude: f64, longitude: f64, radius_km: f64) -> Self {
        Self {
            latitude,
            longitude,
            radius_km,
        }
    }

    pub fn center(&self) -> GpsPoint {
        GpsPoint::new(self.latitude, self.longitude)
    }

    /// True if `position` is strictly inside the radius.
    pub fn contains(&self, position: &GpsPoint) -> bool {
        distance_km(&self.center(), position) < self.radius_km
    }
}

/// Configuration for track segmentation.
///
/// Deserializes from partial JSON; omitted fields keep their defaults.
///
/// ```rust
/// use vessel_track::SegmentationConfig;
///
/// let config = SegmentationConfig::from_json(r#"{"timeGapThreshold": 3600}"#).unwrap();
/// assert_eq!(config.time_gap_threshold, 3600.0);
/// assert_eq!(config.speed_threshold, 0.51);
/// assert!(!config.emit_points);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct SegmentationConfig {
    /// Emit a `Point` feature for every retained sample.
    /// Default: false
    #[serde(alias = "points")]
    pub emit_points: bool,

    /// Samples slower than this (knots) are treated as not moving and dropped.
    /// Default: 0.51
    pub speed_threshold: f64,

    /// A gap longer than this (seconds) between consecutive samples starts a
    /// new leg. Zero or negative disables the rule.
    /// Default: 7200 (2 hours)
    #[serde(alias = "timeThreshold")]
    pub time_gap_threshold: f64,

    /// Locations that force a split when a sample comes within their radius.
    /// Default: none
    pub split_locations: Vec<SplitLocation>,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            emit_points: false,
            speed_threshold: 0.51,
            time_gap_threshold: 2.0 * 60.0 * 60.0,
            split_locations: Vec::new(),
        }
    }
}

impl SegmentationConfig {
    /// Parse a (possibly partial) JSON configuration and validate it.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| TrackError::config(format!("invalid configuration JSON: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the engine cannot meaningfully compare against.
    pub fn validate(&self) -> Result<()> {
        if !self.speed_threshold.is_finite() {
            return Err(TrackError::config("speedThreshold must be a finite number"));
        }
        if self.time_gap_threshold.is_nan() {
            return Err(TrackError::config("timeGapThreshold must be a number"));
        }
        for (i, loc) in self.split_locations.iter().enumerate() {
            if !loc.center().is_valid() {
                return Err(TrackError::config(format!(
                    "split location {} has invalid coordinates ({}, {})",
                    i, loc.latitude, loc.longitude
                )));
            }
            if !loc.radius_km.is_finite() || loc.radius_km < 0.0 {
                return Err(TrackError::config(format!(
                    "split location {} has invalid radius {}",
                    i, loc.radius_km
                )));
            }
        }
        Ok(())
    }

    pub fn with_points(mut self, emit_points: bool) -> Self {
        self.emit_points = emit_points;
        self
    }

    pub fn with_speed_threshold(mut self, knots: f64) -> Self {
        self.speed_threshold = knots;
        self
    }

    pub fn with_time_gap_threshold(mut self, seconds: f64) -> Self {
        self.time_gap_threshold = seconds;
        self
    }

    pub fn with_split_location(mut self, location: SplitLocation) -> Self {
        self.split_locations.push(location);
        self
    }

    fn time_gap_enabled(&self) -> bool {
        self.time_gap_threshold > 0.0
    }
}

/// Convert an ordered track into a GeoJSON `FeatureCollection`.
///
/// Pure function of its inputs. See the module docs for the splitting rules.
///
/// # Example
///
/// ```rust
/// use vessel_track::{Sample, SampleSet, SegmentationConfig, to_geojson};
///
/// let track = SampleSet::from_samples(vec![
///     Sample::new(51.405472, 1.51547, 5.5, 148.0, "2013-08-29T00:03:00").unwrap(),
///     Sample::new(51.40287, 1.517997, 5.5, 148.0, "2013-08-29T00:05:00").unwrap(),
///     Sample::new(51.400379, 1.520745, 5.3, 145.0, "2013-08-29T00:07:00").unwrap(),
/// ]);
///
/// let geojson = to_geojson(&track, &SegmentationConfig::default());
/// assert_eq!(geojson.features.len(), 1);
///
/// let with_points = to_geojson(&track, &SegmentationConfig::default().with_points(true));
/// assert_eq!(with_points.features.len(), 4);
/// ```
pub fn to_geojson<T>(samples: &T, config: &SegmentationConfig) -> FeatureCollection
where
    T: AsRef<[Sample]> + ?Sized,
{
    let samples: &[Sample] = samples.as_ref();
    let mut features = Vec::new();
    let mut leg: Vec<&Sample> = Vec::new();
    let mut previous: Option<&Sample> = None;
    let mut filtered = 0usize;

    for (i, sample) in samples.iter().enumerate() {
        let is_last = i == samples.len() - 1;
        let split = split_reason(previous, sample, config);
        match split {
            Some(SplitReason::TimeGap(gap)) => {
                debug!("[Segmentation] {:.0}s gap before {}", gap, sample.timestamp)
            }
            Some(SplitReason::Location(index)) => {
                debug!("[Segmentation] {} within split location {}", sample.timestamp, index)
            }
            None => {}
        }
        let split_here = split.is_some();

        if sample.speed >= config.speed_threshold {
            leg.push(sample);
            if config.emit_points {
                features.push(Feature::point(sample));
            }
        } else {
            filtered += 1;
        }

        if !leg.is_empty() && (split_here || is_last) {
            features.push(close_leg(&leg));
            leg.clear();
        }

        previous = Some(sample);
    }

    debug!(
        "[Segmentation] {} samples -> {} features ({} filtered below {} kn)",
        samples.len(),
        features.len(),
        filtered,
        config.speed_threshold
    );

    FeatureCollection::new(features)
}

/// Convert several independent tracks with the same configuration.
///
/// Output order matches input order. Runs in parallel with the `parallel` feature.
pub fn to_geojson_batch(tracks: &[SampleSet], config: &SegmentationConfig) -> Vec<FeatureCollection> {
    #[cfg(feature = "parallel")]
    let results: Vec<FeatureCollection> = {
        use rayon::prelude::*;
        tracks.par_iter().map(|t| to_geojson(t, config)).collect()
    };

    #[cfg(not(feature = "parallel"))]
    let results: Vec<FeatureCollection> = tracks.iter().map(|t| to_geojson(t, config)).collect();

    debug!("[Segmentation] batch converted {} tracks", results.len());

    results
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum SplitReason {
    TimeGap(f64),
    Location(usize),
}

fn split_reason(previous: Option<&Sample>, sample: &Sample, config: &SegmentationConfig) -> Option<SplitReason> {
    if config.time_gap_enabled() {
        if let Some(prev) = previous {
            let gap = seconds_between(&prev.timestamp, &sample.timestamp);
            if gap > config.time_gap_threshold {
                return Some(SplitReason::TimeGap(gap));
            }
        }
    }

    config
        .split_locations
        .iter()
        .position(|loc| loc.contains(&sample.latlng))
        .map(SplitReason::Location)
}

fn close_leg(leg: &[&Sample]) -> Feature {
    // Only called with at least one retained sample
    match Feature::line_string(leg) {
        Ok(feature) => feature,
        Err(e) => unreachable!("closing an empty leg: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(lat: f64, lng: f64, speed: f64, course: f64, ts: &str) -> Sample {
        Sample::new(lat, lng, speed, course, ts).unwrap()
    }

    fn three_samples() -> SampleSet {
        SampleSet::from_samples(vec![
            sample(51.405472, 1.51547, 5.5, 148.0, "2013-08-29T00:03:00"),
            sample(51.40287, 1.517997, 5.5, 148.0, "2013-08-29T00:05:00"),
            sample(51.400379, 1.520745, 5.3, 145.0, "2013-08-29T00:07:00"),
        ])
    }

    fn leg_lengths(fc: &FeatureCollection) -> Vec<usize> {
        fc.features
            .iter()
            .filter_map(|f| match f {
                Feature::LineString { coordinates, .. } => Some(coordinates.len()),
                Feature::Point { .. } => None,
            })
            .collect()
    }

    #[test]
    fn test_default_config() {
        let config = SegmentationConfig::default();
        assert!(!config.emit_points);
        assert_eq!(config.speed_threshold, 0.51);
        assert_eq!(config.time_gap_threshold, 7200.0);
        assert!(config.split_locations.is_empty());
    }

    #[test]
    fn test_config_from_partial_json() {
        let config = SegmentationConfig::from_json(r#"{"points": true, "speedThreshold": 5.31}"#).unwrap();
        assert!(config.emit_points);
        assert_eq!(config.speed_threshold, 5.31);
        assert_eq!(config.time_gap_threshold, 7200.0);

        let config = SegmentationConfig::from_json(
            r#"{"timeThreshold": 0, "splitLocations": [{"latitude": 51.4, "longitude": 1.5, "radiusKm": 2}]}"#,
        )
        .unwrap();
        assert_eq!(config.time_gap_threshold, 0.0);
        assert_eq!(config.split_locations, vec![SplitLocation::new(51.4, 1.5, 2.0)]);
    }

    #[test]
    fn test_config_validation() {
        assert!(matches!(
            SegmentationConfig::from_json(r#"{"speedThreshold": "fast"}"#),
            Err(TrackError::Config { .. })
        ));

        let bad_radius = SegmentationConfig::default().with_split_location(SplitLocation::new(51.4, 1.5, -1.0));
        assert!(matches!(bad_radius.validate(), Err(TrackError::Config { .. })));

        let bad_center = SegmentationConfig::default().with_split_location(SplitLocation::new(95.0, 1.5, 1.0));
        assert!(matches!(bad_center.validate(), Err(TrackError::Config { .. })));

        let nan_speed = SegmentationConfig::default().with_speed_threshold(f64::NAN);
        assert!(nan_speed.validate().is_err());

        assert!(SegmentationConfig::default().validate().is_ok());
    }

    #[test]
    fn test_single_leg_with_defaults() {
        let fc = to_geojson(&three_samples(), &SegmentationConfig::default());
        assert_eq!(fc.features.len(), 1);
        assert_eq!(fc.features[0].geometry_type(), "LineString");
        assert_eq!(leg_lengths(&fc), vec![3]);
    }

    #[test]
    fn test_points_precede_their_leg() {
        let fc = to_geojson(&three_samples(), &SegmentationConfig::default().with_points(true));
        let kinds: Vec<&str> = fc.features.iter().map(|f| f.geometry_type()).collect();
        assert_eq!(kinds, vec!["Point", "Point", "Point", "LineString"]);
    }

    #[test]
    fn test_speed_filter_drops_slow_samples() {
        let config = SegmentationConfig::default()
            .with_points(true)
            .with_speed_threshold(5.31);
        let fc = to_geojson(&three_samples(), &config);

        assert_eq!(fc.features.len(), 3);
        assert_eq!(fc.points().count(), 2);
        assert_eq!(leg_lengths(&fc), vec![2]);
    }

    #[test]
    fn test_all_samples_below_threshold() {
        let config = SegmentationConfig::default().with_speed_threshold(10.0);
        let fc = to_geojson(&three_samples(), &config);
        assert!(fc.features.is_empty());
    }

    #[test]
    fn test_empty_track() {
        let fc = to_geojson(&SampleSet::default(), &SegmentationConfig::default());
        assert!(fc.features.is_empty());
    }

    #[test]
    fn test_time_gap_sample_closes_previous_leg() {
        let mut track = three_samples();
        track.merge(vec![
            sample(1.0, 2.0, 4.4, 122.0, "2013-08-30T15:51:00"),
            sample(2.0, 3.0, 5.5, 122.0, "2013-08-30T16:01:01"),
        ]);

        // The sample after the gap ends the first leg
        let fc = to_geojson(&track, &SegmentationConfig::default());
        assert_eq!(leg_lengths(&fc), vec![4, 1]);

        match &fc.features[1] {
            Feature::LineString { properties, .. } => {
                assert_eq!(properties.duration, 0.0);
                assert_eq!(properties.start_time.as_str(), "2013-08-30T16:01:01");
            }
            other => panic!("expected LineString, got {:?}", other),
        }

        let disabled = SegmentationConfig::default().with_time_gap_threshold(0.0);
        assert_eq!(leg_lengths(&to_geojson(&track, &disabled)), vec![5]);

        let negative = SegmentationConfig::default().with_time_gap_threshold(-1.0);
        assert_eq!(leg_lengths(&to_geojson(&track, &negative)), vec![5]);
    }

    #[test]
    fn test_time_gap_counts_filtered_samples() {
        // The slow sample in the middle bridges the gap for the time rule
        let track = SampleSet::from_samples(vec![
            sample(0.0, 0.0, 5.0, 90.0, "2020-01-01T00:00:00"),
            sample(0.0, 0.1, 0.0, 90.0, "2020-01-01T01:30:00"),
            sample(0.0, 0.2, 5.0, 90.0, "2020-01-01T03:00:00"),
        ]);
        let fc = to_geojson(&track, &SegmentationConfig::default());
        assert_eq!(leg_lengths(&fc), vec![2]);
    }

    #[test]
    fn test_gap_on_filtered_sample_closes_leg() {
        let track = SampleSet::from_samples(vec![
            sample(0.0, 0.0, 5.0, 90.0, "2020-01-01T00:00:00"),
            sample(0.0, 0.1, 5.0, 90.0, "2020-01-01T00:10:00"),
            sample(0.0, 0.2, 0.0, 90.0, "2020-01-01T05:00:00"),
            sample(0.0, 0.3, 5.0, 90.0, "2020-01-01T05:10:00"),
            sample(0.0, 0.4, 5.0, 90.0, "2020-01-01T05:20:00"),
        ]);
        let fc = to_geojson(&track, &SegmentationConfig::default());
        assert_eq!(leg_lengths(&fc), vec![2, 2]);
    }

    #[test]
    fn test_split_location_forces_boundary() {
        let track = SampleSet::from_samples(vec![
            sample(0.0, 0.00, 5.0, 90.0, "2020-01-01T00:00:00"),
            sample(0.0, 0.05, 5.0, 90.0, "2020-01-01T00:10:00"),
            sample(0.0, 0.10, 5.0, 90.0, "2020-01-01T00:20:00"),
            sample(0.0, 0.15, 5.0, 90.0, "2020-01-01T00:30:00"),
            sample(0.0, 0.20, 5.0, 90.0, "2020-01-01T00:40:00"),
        ]);
        // ~11 km per 0.1 degree at the equator; 1 km radius only catches the middle sample
        let config = SegmentationConfig::default().with_split_location(SplitLocation::new(0.0, 0.10, 1.0));
        let fc = to_geojson(&track, &config);
        assert_eq!(leg_lengths(&fc), vec![3, 2]);
    }

    #[test]
    fn test_split_location_order_does_not_matter() {
        let track = SampleSet::from_samples(vec![
            sample(0.0, 0.00, 5.0, 90.0, "2020-01-01T00:00:00"),
            sample(0.0, 0.05, 5.0, 90.0, "2020-01-01T00:10:00"),
            sample(0.0, 0.10, 5.0, 90.0, "2020-01-01T00:20:00"),
            sample(0.0, 0.15, 5.0, 90.0, "2020-01-01T00:30:00"),
        ]);
        let a = SplitLocation::new(0.0, 0.05, 1.0);
        let b = SplitLocation::new(0.0, 0.10, 1.0);
        let far = SplitLocation::new(10.0, 10.0, 1.0);

        let ab = SegmentationConfig::default()
            .with_split_location(far)
            .with_split_location(a)
            .with_split_location(b);
        let ba = SegmentationConfig::default()
            .with_split_location(b)
            .with_split_location(a)
            .with_split_location(far);

        assert_eq!(to_geojson(&track, &ab), to_geojson(&track, &ba));
        assert_eq!(leg_lengths(&to_geojson(&track, &ab)), vec![2, 1, 1]);
    }

    #[test]
    fn test_split_radius_is_exclusive() {
        let loc = SplitLocation::new(0.0, 0.0, 0.0);
        assert!(!loc.contains(&GpsPoint::new(0.0, 0.0)));
        assert!(SplitLocation::new(0.0, 0.0, 0.1).contains(&GpsPoint::new(0.0, 0.0)));
    }

    #[test]
    fn test_time_gap_takes_precedence() {
        let track = SampleSet::from_samples(vec![
            sample(0.0, 0.0, 5.0, 90.0, "2020-01-01T00:00:00"),
            sample(0.0, 0.0, 5.0, 90.0, "2020-01-01T05:00:00"),
        ]);
        let config = SegmentationConfig::default().with_split_location(SplitLocation::new(0.0, 0.0, 1.0));
        assert_eq!(
            split_reason(Some(&track.samples()[0]), &track.samples()[1], &config),
            Some(SplitReason::TimeGap(18000.0))
        );
        assert_eq!(
            split_reason(None, &track.samples()[0], &config),
            Some(SplitReason::Location(0))
        );
    }

    #[test]
    fn test_batch_matches_single() {
        let tracks = vec![three_samples(), SampleSet::default(), three_samples()];
        let config = SegmentationConfig::default().with_points(true);
        let results = to_geojson_batch(&tracks, &config);

        assert_eq!(results.len(), 3);
        assert_eq!(results[0], to_geojson(&tracks[0], &config));
        assert!(results[1].features.is_empty());
    }

    #[test]
    fn test_accepts_plain_slices() {
        let samples = three_samples().into_samples();
        let fc = to_geojson(samples.as_slice(), &SegmentationConfig::default());
        assert_eq!(fc.features.len(), 1);
    }
}

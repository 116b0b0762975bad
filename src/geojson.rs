//! GeoJSON output model.
//!
//! Features are a sum type over the two geometries the engine emits. Both
//! serialize into the common GeoJSON envelope
//! `{"type": "Feature", "geometry": {...}, "properties": {...}}`, with
//! coordinates in GeoJSON `[lng, lat]` order.

use serde::Serialize;

use crate::error::{Result, TrackError};
use crate::geo_utils::{round_to, swap_coordinate_pair, swap_coordinates};
use crate::stats::mean_of_field;
use crate::timestamp::{seconds_between, Timestamp};
use crate::Sample;

/// Properties of a per-sample `Point` feature: every sample field but the position.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PointProperties {
    pub speed: f64,
    pub course: f64,
    pub timestamp: Timestamp,
}

/// Aggregated properties of one leg (`LineString` feature).
///
/// Key names are fixed for downstream consumers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegProperties {
    /// Mean speed over ground in knots, two decimals
    pub avg_sog: f64,
    /// Mean course over ground in degrees, nearest integer
    pub avg_cog: i64,
    #[serde(rename = "startTime")]
    pub start_time: Timestamp,
    #[serde(rename = "endTime")]
    pub end_time: Timestamp,
    /// Seconds between first and last sample of the leg
    pub duration: f64,
}

/// A GeoJSON feature emitted by the segmentation engine.
#[derive(Debug, Clone, PartialEq)]
pub enum Feature {
    Point {
        /// `[lng, lat]`
        coordinates: [f64; 2],
        properties: PointProperties,
    },
    LineString {
        /// `[lng, lat]` pairs in sample order
        coordinates: Vec<[f64; 2]>,
        properties: LegProperties,
    },
}

impl Feature {
    /// Point feature for a single retained sample.
    pub fn point(sample: &Sample) -> Self {
        Feature::Point {
            coordinates: swap_coordinate_pair(sample.latlng.to_array()),
            properties: PointProperties {
                speed: sample.speed,
                course: sample.course,
                timestamp: sample.timestamp.clone(),
            },
        }
    }

    /// LineString feature for a leg.
    ///
    /// Fails with [`TrackError::EmptyInput`] when `leg` is empty.
    pub fn line_string<S: AsRef<Sample>>(leg: &[S]) -> Result<Self> {
        let leg: Vec<&Sample> = leg.iter().map(|s| s.as_ref()).collect();

        let (first, last) = match (leg.first(), leg.last()) {
            (Some(first), Some(last)) => (*first, *last),
            _ => {
                return Err(TrackError::EmptyInput {
                    what: "leg".to_string(),
                })
            }
        };

        let avg_sog = mean_of_field(&leg, |s| s.speed)?;
        let avg_cog = mean_of_field(&leg, |s| s.course)?;

        let latlngs: Vec<[f64; 2]> = leg.iter().map(|s| s.latlng.to_array()).collect();

        Ok(Feature::LineString {
            coordinates: swap_coordinates(&latlngs),
            properties: LegProperties {
                avg_sog: round_to(avg_sog, 2),
                avg_cog: avg_cog.round() as i64,
                start_time: first.timestamp.clone(),
                end_time: last.timestamp.clone(),
                duration: seconds_between(&last.timestamp, &first.timestamp),
            },
        })
    }

    /// GeoJSON geometry type name.
    pub fn geometry_type(&self) -> &'static str {
        match self {
            Feature::Point { .. } => "Point",
            Feature::LineString { .. } => "LineString",
        }
    }

    pub fn is_line_string(&self) -> bool {
        matches!(self, Feature::LineString { .. })
    }

    pub fn is_point(&self) -> bool {
        matches!(self, Feature::Point { .. })
    }
}

// Serialization envelope shared by both variants
#[derive(Serialize)]
#[serde(tag = "type", rename = "Feature")]
struct FeatureEnvelope<'a> {
    geometry: GeometryRef<'a>,
    properties: PropertiesRef<'a>,
}

#[derive(Serialize)]
#[serde(tag = "type")]
enum GeometryRef<'a> {
    Point { coordinates: &'a [f64; 2] },
    LineString { coordinates: &'a [[f64; 2]] },
}

#[derive(Serialize)]
#[serde(untagged)]
enum PropertiesRef<'a> {
    Point(&'a PointProperties),
    Leg(&'a LegProperties),
}

impl Serialize for Feature {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let envelope = match self {
            Feature::Point {
                coordinates,
                properties,
            } => FeatureEnvelope {
                geometry: GeometryRef::Point { coordinates },
                properties: PropertiesRef::Point(properties),
            },
            Feature::LineString {
                coordinates,
                properties,
            } => FeatureEnvelope {
                geometry: GeometryRef::LineString {
                    coordinates: coordinates.as_slice(),
                },
                properties: PropertiesRef::Leg(properties),
            },
        };
        envelope.serialize(serializer)
    }
}

/// A GeoJSON `FeatureCollection` in emission order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(tag = "type", rename = "FeatureCollection")]
pub struct FeatureCollection {
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn new(features: Vec<Feature>) -> Self {
        Self { features }
    }

    /// Iterate the `LineString` features (legs) only.
    pub fn legs(&self) -> impl Iterator<Item = &Feature> {
        self.features.iter().filter(|f| f.is_line_string())
    }

    /// Iterate the `Point` features only.
    pub fn points(&self) -> impl Iterator<Item = &Feature> {
        self.features.iter().filter(|f| f.is_point())
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| TrackError::source_data(e.to_string()))
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| TrackError::source_data(e.to_string()))
    }
}

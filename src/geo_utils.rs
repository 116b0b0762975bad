//! # Geographic Utilities
//!
//! Numeric helpers shared by the segmentation engine and the GeoJSON output.
//!
//! ## Overview
//!
//! | Function | Description |
//! |----------|-------------|
//! | [`distance_km`] | Great-circle distance between two positions, in kilometers |
//! | [`swap_coordinate_pair`] | `[lat, lng]` to `[lng, lat]` |
//! | [`swap_coordinates`] | Swap a pair or any nesting of pair sequences |
//! | [`round_to`] | Round to a fixed number of decimals |
//!
//! ## Example
//!
//! ```rust
//! use vessel_track::{GpsPoint, geo_utils};
//!
//! let london = GpsPoint::new(51.5000, -0.1167);
//! let paris = GpsPoint::new(48.8667, 2.3333);
//!
//! let km = geo_utils::distance_km(&london, &paris);
//! assert!((km - 342.0).abs() < 1.0);
//!
//! // GeoJSON wants [lng, lat]
//! let line: Vec<[f64; 2]> = vec![[51.5, -0.1167], [48.8667, 2.3333]];
//! assert_eq!(geo_utils::swap_coordinates(&line), vec![[-0.1167, 51.5], [2.3333, 48.8667]]);
//! ```
//!
//! ## Algorithm Notes
//!
//! Distances use the haversine formula on a sphere with the WGS84 equatorial
//! radius (6 378 137 m). `geo`'s haversine works on the IUGG mean radius, so its
//! result is rescaled; the central angle is the same either way.

use geo::{Distance, Haversine, Point};

use crate::GpsPoint;

/// Sphere radius used for all distances, in meters.
pub const EARTH_RADIUS_M: f64 = 6_378_137.0;

/// Radius `geo::Haversine` computes with, in meters.
const GEO_MEAN_EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Decimal places used by [`round_to`] callers that have no stronger opinion.
pub const DEFAULT_PRECISION: i32 = 5;

// =============================================================================
// Distance Functions
// =============================================================================

/// Calculate the great-circle distance between two positions in kilometers.
///
/// # Example
///
/// ```rust
/// use vessel_track::{GpsPoint, geo_utils};
///
/// let amsterdam = GpsPoint::new(52.3500, 4.9167);
/// let paris = GpsPoint::new(48.8667, 2.3333);
///
/// let km = geo_utils::distance_km(&amsterdam, &paris);
/// assert!((km - 427.71).abs() < 1.0);
/// ```
#[inline]
pub fn distance_km(p1: &GpsPoint, p2: &GpsPoint) -> f64 {
    let point1 = Point::new(p1.longitude, p1.latitude);
    let point2 = Point::new(p2.longitude, p2.latitude);
    let mean_radius_m = Haversine::distance(point1, point2);
    mean_radius_m * (EARTH_RADIUS_M / GEO_MEAN_EARTH_RADIUS_M) / 1000.0
}

// =============================================================================
// Coordinate Order
// =============================================================================

/// Swap a `[lat, lng]` pair into GeoJSON `[lng, lat]` order (and back).
#[inline]
pub fn swap_coordinate_pair(pair: [f64; 2]) -> [f64; 2] {
    [pair[1], pair[0]]
}

/// Values whose coordinate pairs can be swapped in place of structure.
///
/// Implemented for a single pair and, recursively, for vectors and slices of
/// anything swappable, so a point, a polyline and a multi-polyline all go
/// through the same call.
pub trait SwapCoordinates {
    type Output;

    fn swap_coordinates(&self) -> Self::Output;
}

impl SwapCoordinates for [f64; 2] {
    type Output = [f64; 2];

    fn swap_coordinates(&self) -> [f64; 2] {
        swap_coordinate_pair(*self)
    }
}

impl<T: SwapCoordinates> SwapCoordinates for [T] {
    type Output = Vec<T::Output>;

    fn swap_coordinates(&self) -> Self::Output {
        self.iter().map(|v| v.swap_coordinates()).collect()
    }
}

impl<T: SwapCoordinates> SwapCoordinates for Vec<T> {
    type Output = Vec<T::Output>;

    fn swap_coordinates(&self) -> Self::Output {
        self.as_slice().swap_coordinates()
    }
}

/// Swap a coordinate pair or an arbitrarily nested sequence of pairs.
#[inline]
pub fn swap_coordinates<T: SwapCoordinates + ?Sized>(value: &T) -> T::Output {
    value.swap_coordinates()
}

// =============================================================================
// Rounding
// =============================================================================

/// Round `num` to `digits` decimal places (scale, round, unscale).
///
/// Halves round away from zero, which for the non-negative speeds and
/// courses this is used on is round-half-up.
///
/// ```rust
/// use vessel_track::geo_utils::{round_to, DEFAULT_PRECISION};
///
/// assert_eq!(round_to(5.4333333, 2), 5.43);
/// assert_eq!(round_to(1.234567, DEFAULT_PRECISION), 1.23457);
/// ```
#[inline]
pub fn round_to(num: f64, digits: i32) -> f64 {
    let pow = 10f64.powi(digits);
    (num * pow).round() / pow
}

// =============================================================================
// Unit Tests
// =============================================================================

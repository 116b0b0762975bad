//! Sample timestamps and time arithmetic.
//!
//! Track services deliver ISO 8601 strings, usually without a UTC offset
//! (`2013-08-29T00:03:00`). A [`Timestamp`] keeps the delivered text for output
//! and the parsed instant for comparison, so GeoJSON properties echo exactly
//! what the source sent.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Result, TrackError};

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// A parsed sample timestamp.
///
/// Equality, hashing and ordering use the instant only, so two spellings of
/// the same moment are the same key.
#[derive(Debug, Clone)]
pub struct Timestamp {
    instant: DateTime<Utc>,
    raw: String,
}

impl Timestamp {
    /// Parse an ISO 8601 timestamp. Offset-less values are taken as UTC.
    pub fn parse(text: &str) -> Result<Self> {
        let trimmed = text.trim();

        if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
            return Ok(Self {
                instant: dt.with_timezone(&Utc),
                raw: trimmed.to_string(),
            });
        }

        NAIVE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
            .map(|naive| Self {
                instant: naive.and_utc(),
                raw: trimmed.to_string(),
            })
            .ok_or_else(|| TrackError::source_data(format!("invalid timestamp '{}'", text)))
    }

    /// The instant in UTC.
    pub fn instant(&self) -> DateTime<Utc> {
        self.instant
    }

    /// The timestamp text as delivered by the source.
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

/// Absolute difference in seconds between two timestamps.
///
/// Order-independent: `seconds_between(a, b) == seconds_between(b, a)`.
pub fn seconds_between(a: &Timestamp, b: &Timestamp) -> f64 {
    let delta = a.instant - b.instant;
    match delta.num_microseconds() {
        Some(us) => (us as f64 / 1_000_000.0).abs(),
        None => delta.num_seconds().unsigned_abs() as f64,
    }
}

impl PartialEq for Timestamp {
    fn eq(&self, other: &Self) -> bool {
        self.instant == other.instant
    }
}

impl Eq for Timestamp {}

impl Hash for Timestamp {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.instant.hash(state);
    }
}

impl PartialOrd for Timestamp {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Timestamp {
    fn cmp(&self, other: &Self) -> Ordering {
        self.instant.cmp(&other.instant)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for Timestamp {
    type Err = TrackError;

    fn from_str(s: &str) -> Result<Self> {
        Timestamp::parse(s)
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Timestamp::parse(&text).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> Timestamp {
        Timestamp::parse(s).unwrap()
    }

    #[test]
    fn test_parse_naive_keeps_raw_text() {
        let t = ts("2013-08-29T00:03:00");
        assert_eq!(t.as_str(), "2013-08-29T00:03:00");
        assert_eq!(t.instant().to_rfc3339(), "2013-08-29T00:03:00+00:00");
    }

    #[test]
    fn test_parse_with_offset() {
        let a = ts("2013-08-29T02:03:00+02:00");
        let b = ts("2013-08-29T00:03:00Z");
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "2013-08-29T02:03:00+02:00");
    }

    #[test]
    fn test_parse_space_separator() {
        assert_eq!(ts("2013-08-29 00:03:00"), ts("2013-08-29T00:03:00"));
    }

    #[test]
    fn test_parse_invalid() {
        assert!(matches!(
            Timestamp::parse("yesterday"),
            Err(TrackError::SourceData { .. })
        ));
    }

    #[test]
    fn test_seconds_between_is_symmetric() {
        let a = ts("2013-08-29T00:03:00");
        let b = ts("2013-08-29T00:07:00");
        assert_eq!(seconds_between(&a, &b), 240.0);
        assert_eq!(seconds_between(&b, &a), 240.0);
        assert_eq!(seconds_between(&a, &a), 0.0);
    }

    #[test]
    fn test_seconds_between_fractional() {
        let a = ts("2013-08-29T00:00:00.500");
        let b = ts("2013-08-29T00:00:02");
        assert_eq!(seconds_between(&a, &b), 1.5);
    }

    #[test]
    fn test_serde_round_trip_preserves_text() {
        let t = ts("2013-08-30T16:01:01");
        let json = serde_json::to_string(&t).unwrap();
        assert_eq!(json, "\"2013-08-30T16:01:01\"");
        let back: Timestamp = serde_json::from_str(&json).unwrap();
        assert_eq!(back, t);
    }
}

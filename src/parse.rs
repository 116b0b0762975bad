//! MarineTraffic track XML parsing.
//!
//! The track service answers with a flat list of position reports:
//!
//! ```xml
//! <TRACK>
//!   <POS LON="1.51547" LAT="51.405472" SPEED="55" COURSE="148" TIMESTAMP="2013-08-29T00:03:00" />
//!   ...
//! </TRACK>
//! ```
//!
//! `SPEED` is in tenths of a knot and `COURSE` in whole degrees. Positions are
//! kept in document order.

use log::debug;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::{Result, TrackError};
use crate::sample_set::SampleSet;
use crate::timestamp::Timestamp;
use crate::{GpsPoint, Sample};

const TRACK_TAG: &[u8] = b"TRACK";
const POSITION_TAG: &[u8] = b"POS";

/// Parse a track XML document into a [`SampleSet`].
///
/// Fails with [`TrackError::SourceData`] if the root element is not `TRACK`,
/// if it holds no `POS` elements, or if any position is incomplete.
///
/// ```rust
/// use vessel_track::parse::parse_track_xml;
///
/// let xml = r#"<TRACK><POS LON="1.51547" LAT="51.405472" SPEED="55" COURSE="148" TIMESTAMP="2013-08-29T00:03:00"/></TRACK>"#;
/// let track = parse_track_xml(xml).unwrap();
/// assert_eq!(track.len(), 1);
/// assert_eq!(track.samples()[0].speed, 5.5);
/// ```
pub fn parse_track_xml(xml: &str) -> Result<SampleSet> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut depth = 0usize;
    let mut root_is_track = false;
    let mut samples = Vec::new();

    loop {
        let event = match reader.read_event() {
            Ok(event) => event,
            Err(e) => {
                return Err(TrackError::source_data(format!(
                    "invalid xml at byte {}: {}",
                    reader.buffer_position(),
                    e
                )))
            }
        };

        match event {
            Event::Start(e) => {
                visit_element(&e, depth, &mut root_is_track, &mut samples)?;
                depth += 1;
            }
            Event::Empty(e) => visit_element(&e, depth, &mut root_is_track, &mut samples)?,
            Event::End(_) => depth = depth.saturating_sub(1),
            Event::Eof => break,
            _ => {}
        }
    }

    if !root_is_track || samples.is_empty() {
        return Err(TrackError::source_data("unexpected xml contents"));
    }

    debug!("[parse] {} positions", samples.len());

    Ok(SampleSet::from_samples(samples))
}

/// Parse a raw response body. The body must be UTF-8.
pub fn parse_track_xml_bytes(body: &[u8]) -> Result<SampleSet> {
    let xml = std::str::from_utf8(body)
        .map_err(|e| TrackError::source_data(format!("track body is not UTF-8: {}", e)))?;
    parse_track_xml(xml)
}

fn visit_element(
    element: &BytesStart<'_>,
    depth: usize,
    root_is_track: &mut bool,
    samples: &mut Vec<Sample>,
) -> Result<()> {
    let name = element.name();
    if depth == 0 {
        *root_is_track = name.as_ref() == TRACK_TAG;
    } else if depth == 1 && *root_is_track && name.as_ref() == POSITION_TAG {
        let sample = parse_position(element, samples.len())?;
        samples.push(sample);
    }
    Ok(())
}

#[derive(Default)]
struct PositionAttributes {
    lat: Option<String>,
    lon: Option<String>,
    speed: Option<String>,
    course: Option<String>,
    timestamp: Option<String>,
}

fn parse_position(element: &BytesStart<'_>, index: usize) -> Result<Sample> {
    let mut attrs = PositionAttributes::default();

    for attr in element.attributes() {
        let attr = attr.map_err(|e| {
            TrackError::source_data(format!("position {}: bad attribute: {}", index, e))
        })?;
        let value = attr
            .unescape_value()
            .map_err(|e| TrackError::source_data(format!("position {}: {}", index, e)))?
            .into_owned();

        let key = attr.key.as_ref();
        if key.eq_ignore_ascii_case(b"LAT") {
            attrs.lat = Some(value);
        } else if key.eq_ignore_ascii_case(b"LON") {
            attrs.lon = Some(value);
        } else if key.eq_ignore_ascii_case(b"SPEED") {
            attrs.speed = Some(value);
        } else if key.eq_ignore_ascii_case(b"COURSE") {
            attrs.course = Some(value);
        } else if key.eq_ignore_ascii_case(b"TIMESTAMP") {
            attrs.timestamp = Some(value);
        }
    }

    let lat = number(attrs.lat.as_deref(), "LAT", index)?;
    let lon = number(attrs.lon.as_deref(), "LON", index)?;
    let speed_tenths = number(attrs.speed.as_deref(), "SPEED", index)?.trunc();
    let course = number(attrs.course.as_deref(), "COURSE", index)?.trunc();

    let timestamp = attrs
        .timestamp
        .as_deref()
        .ok_or_else(|| missing("TIMESTAMP", index))
        .and_then(|t| {
            Timestamp::parse(t)
                .map_err(|e| TrackError::source_data(format!("position {}: {}", index, e)))
        })?;

    Ok(Sample {
        latlng: GpsPoint::new(lat, lon),
        speed: speed_tenths / 10.0,
        course,
        timestamp,
    })
}

fn number(value: Option<&str>, name: &str, index: usize) -> Result<f64> {
    let text = value.ok_or_else(|| missing(name, index))?;
    text.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| {
            TrackError::source_data(format!(
                "position {}: {} is not a number ('{}')",
                index, name, text
            ))
        })
}

fn missing(name: &str, index: usize) -> TrackError {
    TrackError::source_data(format!("position {} has no {} attribute", index, name))
}

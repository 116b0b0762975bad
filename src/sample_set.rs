//! Ordered collections of track samples.
//!
//! A [`SampleSet`] is the sequence the segmentation engine walks. Its order is
//! the order samples were delivered in, which track services send
//! chronologically. Merging two sets keys samples by timestamp.

use std::borrow::Borrow;

use indexmap::IndexMap;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::geojson::FeatureCollection;
use crate::segmentation::{to_geojson, SegmentationConfig};
use crate::timestamp::Timestamp;
use crate::Sample;

/// An ordered sequence of position samples.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SampleSet {
    samples: Vec<Sample>,
}

impl SampleSet {
    /// Wrap samples in delivery order. No reordering or deduplication happens.
    pub fn from_samples(samples: Vec<Sample>) -> Self {
        Self { samples }
    }

    /// Merge `other` into this set, keyed by timestamp.
    ///
    /// On a timestamp collision the sample from `other` replaces the one already
    /// present. The set keeps its identity and its contents are replaced, so
    /// anything holding `&mut` to this set observes the merged samples.
    ///
    /// Resulting order is first-seen order across `self` then `other`: existing
    /// samples keep their positions, new timestamps are appended. The set is
    /// not re-sorted; call [`SampleSet::sort_chronologically`] when `other` may
    /// hold samples older than the ones already present.
    ///
    /// Accepts anything yielding samples or sample references: a `Vec<Sample>`,
    /// a slice, or another `&SampleSet`. Returns `self` for chaining.
    ///
    /// # Example
    ///
    /// ```rust
    /// use vessel_track::{Sample, SampleSet};
    ///
    /// let mut track = SampleSet::from_samples(vec![
    ///     Sample::new(51.405472, 1.51547, 5.5, 148.0, "2013-08-29T00:03:00").unwrap(),
    /// ]);
    /// let more = vec![
    ///     Sample::new(51.40287, 1.517997, 5.5, 148.0, "2013-08-29T00:05:00").unwrap(),
    /// ];
    ///
    /// let len = track.merge(&more).len();
    /// assert_eq!(len, 2);
    /// ```
    pub fn merge<I>(&mut self, other: I) -> &mut Self
    where
        I: IntoIterator,
        I::Item: Borrow<Sample>,
    {
        let before = self.samples.len();

        let mut by_timestamp: IndexMap<Timestamp, Sample> = self
            .samples
            .drain(..)
            .map(|s| (s.timestamp.clone(), s))
            .collect();

        for sample in other {
            let sample = sample.borrow();
            by_timestamp.insert(sample.timestamp.clone(), sample.clone());
        }

        self.samples.extend(by_timestamp.into_values());

        debug!(
            "[SampleSet] merged: {} -> {} samples",
            before,
            self.samples.len()
        );

        self
    }

    /// Stable sort by timestamp instant.
    pub fn sort_chronologically(&mut self) -> &mut Self {
        self.samples.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        self
    }

    /// The underlying samples, in iteration order.
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Sample> {
        self.samples.iter()
    }

    pub fn into_samples(self) -> Vec<Sample> {
        self.samples
    }

    /// Convert this track to GeoJSON. See [`to_geojson`].
    pub fn to_geojson(&self, config: &SegmentationConfig) -> FeatureCollection {
        to_geojson(self, config)
    }
}

impl From<Vec<Sample>> for SampleSet {
    fn from(samples: Vec<Sample>) -> Self {
        Self::from_samples(samples)
    }
}

impl AsRef<[Sample]> for SampleSet {
    fn as_ref(&self) -> &[Sample] {
        &self.samples
    }
}

impl<'a> IntoIterator for &'a SampleSet {
    type Item = &'a Sample;
    type IntoIter = std::slice::Iter<'a, Sample>;

    fn into_iter(self) -> Self::IntoIter {
        self.samples.iter()
    }
}

impl IntoIterator for SampleSet {
    type Item = Sample;
    type IntoIter = std::vec::IntoIter<Sample>;

    fn into_iter(self) -> Self::IntoIter {
        self.samples.into_iter()
    }
}

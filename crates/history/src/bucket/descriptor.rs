//! Bucket descriptors: `(index, range)` addresses of buckets.
//!
//! A descriptor identifies a bucket by its index relative to the epoch:
//! `start = index * duration`, `end = start + duration` (exclusive).
//!
//! # Example
//!
//! ```rust,ignore
//! use alopex_history::{HistoryBucketDescriptor, HistoryBucketRange};
//!
//! let descriptor = HistoryBucketDescriptor::for_timestamp(1_050.0, HistoryBucketRange::HundredMillis);
//! assert_eq!(descriptor.start(), 1_000.0);
//! assert_eq!(descriptor.next().start(), 1_100.0);
//! ```

use crate::bucket::range::HistoryBucketRange;
use crate::bucket::sampling::SamplingPeriod;
use crate::chunk::HistoryChunk;
use crate::error::{HistoryError, Result};
use crate::storage::TimeRange;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Maximum number of descriptors [`HistoryBucketDescriptor::for_range`] creates.
pub const MAX_SUPPORTED_DESCRIPTORS_COUNT: usize = 100;

/// Address of a bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryBucketDescriptor {
    index: i64,
    bucket_range: HistoryBucketRange,
}

impl HistoryBucketDescriptor {
    /// Creates the descriptor with the given index.
    pub const fn for_index(index: i64, bucket_range: HistoryBucketRange) -> Self {
        Self { index, bucket_range }
    }

    /// Creates the descriptor of the bucket containing the timestamp.
    pub fn for_timestamp(timestamp: f64, bucket_range: HistoryBucketRange) -> Self {
        Self::for_index(bucket_range.calculate_index(timestamp), bucket_range)
    }

    /// Creates the descriptor of the bucket containing the timestamp at the
    /// range of the sampling period.
    pub fn for_timestamp_and_period(timestamp: f64, sampling_period: SamplingPeriod) -> Self {
        Self::for_timestamp(timestamp, sampling_period.bucket_range())
    }

    /// Creates the descriptor starting exactly at `start`.
    pub fn for_start(start: f64, bucket_range: HistoryBucketRange) -> Result<Self> {
        if bucket_range.calculate_start(start) != start {
            return Err(HistoryError::NotAStart {
                timestamp: start,
                bucket_range,
            });
        }
        Ok(Self::for_timestamp(start, bucket_range))
    }

    /// Returns the descriptors from the bucket containing `start` up to
    /// `end`; a bucket starting exactly at `end` is included.
    ///
    /// Fails if more than [`MAX_SUPPORTED_DESCRIPTORS_COUNT`] buckets would
    /// be created.
    pub fn for_range(start: f64, end: f64, bucket_range: HistoryBucketRange) -> Result<Vec<Self>> {
        Self::for_range_with_limit(start, end, bucket_range, true, MAX_SUPPORTED_DESCRIPTORS_COUNT)
    }

    /// Like [`Self::for_range`], but excludes a bucket starting at `end`.
    pub fn for_range_excluding_end(start: f64, end: f64, bucket_range: HistoryBucketRange) -> Result<Vec<Self>> {
        Self::for_range_with_limit(start, end, bucket_range, false, MAX_SUPPORTED_DESCRIPTORS_COUNT)
    }

    /// [`Self::for_range`] with an explicit limit.
    pub fn for_range_with_limit(
        start: f64,
        end: f64,
        bucket_range: HistoryBucketRange,
        include_end: bool,
        max_descriptors_count: usize,
    ) -> Result<Vec<Self>> {
        let count = Self::range_count(start, end, bucket_range, include_end);
        if count > max_descriptors_count as u64 {
            return Err(HistoryError::TooManyDescriptors {
                estimated: count,
                max: max_descriptors_count,
                start,
                end,
                bucket_range,
            });
        }
        Ok(Self::range_unchecked(start, end, bucket_range, include_end))
    }

    /// Exact number of descriptors [`Self::range_unchecked`] produces.
    fn range_count(start: f64, end: f64, bucket_range: HistoryBucketRange, include_end: bool) -> u64 {
        let first = bucket_range.calculate_index(start);
        let mut last = bucket_range.calculate_index(end);
        if !include_end && bucket_range.calculate_start_for_index(last) == end {
            last -= 1;
        }
        if last < first {
            0
        } else {
            (last - first) as u64 + 1
        }
    }

    fn range_unchecked(start: f64, end: f64, bucket_range: HistoryBucketRange, include_end: bool) -> Vec<Self> {
        let mut descriptors = Vec::new();
        let mut descriptor = Self::for_timestamp(start, bucket_range);
        while descriptor.start() < end || (include_end && descriptor.start() == end) {
            descriptors.push(descriptor);
            descriptor = descriptor.next();
        }
        descriptors
    }

    /// Returns the minimal ordered list of descriptors covering every
    /// timestamp of the chunk.
    pub fn from_chunk(chunk: &HistoryChunk, sampling_period: SamplingPeriod) -> Vec<Self> {
        Self::from_timestamps(chunk.time_stamps(), sampling_period)
    }

    /// Returns the minimal ordered list of descriptors covering the sorted timestamps.
    pub fn from_timestamps(time_stamps: &[f64], sampling_period: SamplingPeriod) -> Vec<Self> {
        let bucket_range = sampling_period.bucket_range();
        let (first, last) = match (time_stamps.first(), time_stamps.last()) {
            (Some(first), Some(last)) => (*first, *last),
            _ => return Vec::new(),
        };

        let first_descriptor = Self::for_timestamp(first, bucket_range);
        if time_stamps.len() == 1 {
            return vec![first_descriptor];
        }

        let last_descriptor = Self::for_timestamp(last, bucket_range);
        if first_descriptor == last_descriptor {
            return vec![first_descriptor];
        }

        let distance = last_descriptor.index - first_descriptor.index;
        if distance == 1 {
            return vec![first_descriptor, last_descriptor];
        }

        if distance < MAX_SUPPORTED_DESCRIPTORS_COUNT as i64 {
            return Self::range_unchecked(first, last, bucket_range, true);
        }

        // sparse samples over a long span: only allocate where samples are
        let mut descriptors = vec![first_descriptor];
        let mut current = first_descriptor;
        for &time_stamp in time_stamps {
            if current.contains(time_stamp) {
                continue;
            }
            current = Self::for_timestamp(time_stamp, bucket_range);
            descriptors.push(current);
        }
        descriptors
    }

    /// Index relative to the epoch.
    pub const fn index(&self) -> i64 {
        self.index
    }

    /// Range of the bucket.
    pub const fn bucket_range(&self) -> HistoryBucketRange {
        self.bucket_range
    }

    /// Sampling period of the samples in the bucket.
    pub const fn sampling_period(&self) -> SamplingPeriod {
        self.bucket_range.sampling_period()
    }

    /// Start (inclusive).
    pub fn start(&self) -> f64 {
        self.bucket_range.calculate_start_for_index(self.index)
    }

    /// End (exclusive).
    pub fn end(&self) -> f64 {
        self.bucket_range.calculate_end_for_index(self.index)
    }

    /// Duration of the bucket.
    pub fn duration(&self) -> f64 {
        self.bucket_range.duration()
    }

    /// Center of the bucket.
    pub fn center(&self) -> f64 {
        self.start() + self.duration() / 2.0
    }

    /// Time range `[start, end)`.
    pub fn time_range(&self) -> TimeRange {
        TimeRange::new(self.start(), self.end())
    }

    /// Returns true if `start <= timestamp < end`.
    pub fn contains(&self, timestamp: f64) -> bool {
        timestamp >= self.start() && timestamp < self.end()
    }

    /// The following bucket.
    pub const fn next(&self) -> Self {
        Self::for_index(self.index + 1, self.bucket_range)
    }

    /// The preceding bucket.
    pub const fn previous(&self) -> Self {
        Self::for_index(self.index - 1, self.bucket_range)
    }

    /// The bucket `distance` buckets later. `distance` must be positive.
    pub fn next_by(&self, distance: i64) -> Result<Self> {
        if distance <= 0 {
            return Err(HistoryError::InvalidDistance(distance));
        }
        Ok(Self::for_index(self.index + distance, self.bucket_range))
    }

    /// The bucket `distance` buckets earlier. `distance` must be positive.
    pub fn previous_by(&self, distance: i64) -> Result<Self> {
        if distance <= 0 {
            return Err(HistoryError::InvalidDistance(distance));
        }
        Ok(Self::for_index(self.index - distance, self.bucket_range))
    }

    /// Number of buckets from `self` to `other` (`other.index - self.index`).
    pub fn distance_to(&self, other: &Self) -> Result<i64> {
        if self.bucket_range != other.bucket_range {
            return Err(HistoryError::BucketRangeMismatch {
                left: self.bucket_range,
                right: other.bucket_range,
            });
        }
        Ok(other.index - self.index)
    }

    /// The descriptors of the next finer range exactly spanning this bucket.
    ///
    /// Empty at the finest range.
    pub fn children(&self) -> Vec<Self> {
        match self.bucket_range.lower() {
            Some(lower) => Self::range_unchecked(self.start(), self.end(), lower, false),
            None => Vec::new(),
        }
    }

    /// The containing descriptor of the next coarser range.
    pub fn parent(&self) -> Option<Self> {
        self.bucket_range
            .upper()
            .map(|upper| Self::for_timestamp(self.start(), upper))
    }
}

impl PartialOrd for HistoryBucketDescriptor {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HistoryBucketDescriptor {
    fn cmp(&self, other: &Self) -> Ordering {
        self.bucket_range
            .cmp(&other.bucket_range)
            .then(self.index.cmp(&other.index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_timestamp() {
        let descriptor = HistoryBucketDescriptor::for_timestamp(1_050.0, HistoryBucketRange::HundredMillis);
        assert_eq!(descriptor.index(), 10);
        assert_eq!(descriptor.start(), 1_000.0);
        assert_eq!(descriptor.end(), 1_100.0);
        assert_eq!(descriptor.center(), 1_050.0);
        assert!(descriptor.contains(1_000.0));
        assert!(descriptor.contains(1_099.999));
        assert!(!descriptor.contains(1_100.0));
    }

    #[test]
    fn test_negative_timestamps() {
        let descriptor = HistoryBucketDescriptor::for_timestamp(-1.0, HistoryBucketRange::HundredMillis);
        assert_eq!(descriptor.index(), -1);
        assert_eq!(descriptor.start(), -100.0);
        assert_eq!(descriptor.end(), 0.0);
    }

    #[test]
    fn test_for_start() {
        assert!(HistoryBucketDescriptor::for_start(60_000.0, HistoryBucketRange::OneMinute).is_ok());
        match HistoryBucketDescriptor::for_start(60_001.0, HistoryBucketRange::OneMinute) {
            Err(HistoryError::NotAStart { timestamp, .. }) => assert_eq!(timestamp, 60_001.0),
            other => panic!("Expected NotAStart, got {:?}", other),
        }
    }

    #[test]
    fn test_neighbor_distances() {
        let descriptor = HistoryBucketDescriptor::for_index(5, HistoryBucketRange::OneMinute);
        assert_eq!(descriptor.next_by(3).unwrap().index(), 8);
        assert_eq!(descriptor.previous_by(5).unwrap().index(), 0);
        assert_eq!(descriptor.next_by(0), Err(HistoryError::InvalidDistance(0)));
        assert_eq!(descriptor.previous_by(-1), Err(HistoryError::InvalidDistance(-1)));
    }

    #[test]
    fn test_distance_to() {
        let a = HistoryBucketDescriptor::for_index(5, HistoryBucketRange::OneMinute);
        let b = HistoryBucketDescriptor::for_index(9, HistoryBucketRange::OneMinute);
        assert_eq!(a.distance_to(&b).unwrap(), 4);
        assert_eq!(b.distance_to(&a).unwrap(), -4);

        let other_range = HistoryBucketDescriptor::for_index(9, HistoryBucketRange::OneHour);
        assert!(matches!(
            a.distance_to(&other_range),
            Err(HistoryError::BucketRangeMismatch { .. })
        ));
    }

    #[test]
    fn test_children_span_parent() {
        for range in &HistoryBucketRange::ALL[1..] {
            let descriptor = HistoryBucketDescriptor::for_timestamp(1_500_000_000_000.0, *range);
            let children = descriptor.children();
            assert!(!children.is_empty());
            assert_eq!(children.first().unwrap().start(), descriptor.start());
            assert_eq!(children.last().unwrap().end(), descriptor.end());
            for child in &children {
                assert_eq!(child.parent(), Some(descriptor));
            }
        }

        let finest = HistoryBucketDescriptor::for_index(0, HistoryBucketRange::SMALLEST);
        assert!(finest.children().is_empty());
        let coarsest = HistoryBucketDescriptor::for_index(0, HistoryBucketRange::GREATEST);
        assert_eq!(coarsest.parent(), None);
    }

    #[test]
    fn test_for_range_includes_end() {
        let range = HistoryBucketRange::HundredMillis;
        let descriptors = HistoryBucketDescriptor::for_range(1_000.0, 1_200.0, range).unwrap();
        let starts: Vec<f64> = descriptors.iter().map(|d| d.start()).collect();
        assert_eq!(starts, vec![1_000.0, 1_100.0, 1_200.0]);

        let excluding = HistoryBucketDescriptor::for_range_excluding_end(1_000.0, 1_200.0, range).unwrap();
        assert_eq!(excluding.len(), 2);
    }

    #[test]
    fn test_for_range_limit() {
        let range = HistoryBucketRange::HundredMillis;
        let duration = range.duration();

        // the bucket starting at `end` is included: 101 buckets
        match HistoryBucketDescriptor::for_range(0.0, 100.0 * duration, range) {
            Err(HistoryError::TooManyDescriptors { estimated, max, .. }) => {
                assert_eq!(estimated, 101);
                assert_eq!(max, MAX_SUPPORTED_DESCRIPTORS_COUNT);
            }
            other => panic!("Expected TooManyDescriptors, got {:?}", other),
        }
        assert_eq!(
            HistoryBucketDescriptor::for_range_excluding_end(0.0, 100.0 * duration, range)
                .unwrap()
                .len(),
            100
        );

        // partial buckets on both ends count
        match HistoryBucketDescriptor::for_range(0.99 * duration, 100.4 * duration, range) {
            Err(HistoryError::TooManyDescriptors { estimated, .. }) => assert_eq!(estimated, 101),
            other => panic!("Expected TooManyDescriptors, got {:?}", other),
        }

        let descriptors = HistoryBucketDescriptor::for_range(0.5 * duration, 99.5 * duration, range).unwrap();
        assert_eq!(descriptors.len(), MAX_SUPPORTED_DESCRIPTORS_COUNT);
    }

    #[test]
    fn test_for_range_count_matches_descriptors() {
        let range = HistoryBucketRange::FiveSeconds;
        let duration = range.duration();
        for (start, end) in [(0.0, 0.0), (0.0, duration), (-1.5 * duration, 3.2 * duration), (10.0, 9.0)] {
            for include_end in [true, false] {
                let descriptors = HistoryBucketDescriptor::range_unchecked(start, end, range, include_end);
                assert_eq!(
                    HistoryBucketDescriptor::range_count(start, end, range, include_end),
                    descriptors.len() as u64
                );
            }
        }
    }

    #[test]
    fn test_from_timestamps_fast_paths() {
        let period = SamplingPeriod::EveryMillisecond;
        assert!(HistoryBucketDescriptor::from_timestamps(&[], period).is_empty());
        assert_eq!(HistoryBucketDescriptor::from_timestamps(&[1_000.0], period).len(), 1);
        assert_eq!(HistoryBucketDescriptor::from_timestamps(&[1_000.0, 1_099.0], period).len(), 1);
        assert_eq!(HistoryBucketDescriptor::from_timestamps(&[1_000.0, 1_100.0], period).len(), 2);

        let spanning = HistoryBucketDescriptor::from_timestamps(&[1_000.0, 1_550.0], period);
        assert_eq!(spanning.len(), 6);
        assert_eq!(spanning[0].start(), 1_000.0);
        assert_eq!(spanning[5].start(), 1_500.0);
    }

    #[test]
    fn test_from_timestamps_sparse_scan() {
        let period = SamplingPeriod::EveryMillisecond;
        let time_stamps = [0.0, 10.0, 50_000.0, 50_001.0, 1_000_000.0];
        let descriptors = HistoryBucketDescriptor::from_timestamps(&time_stamps, period);
        let indices: Vec<i64> = descriptors.iter().map(|d| d.index()).collect();
        assert_eq!(indices, vec![0, 500, 10_000]);
    }

    #[test]
    fn test_ordering() {
        let a = HistoryBucketDescriptor::for_index(10, HistoryBucketRange::HundredMillis);
        let b = HistoryBucketDescriptor::for_index(3, HistoryBucketRange::OneMinute);
        let c = HistoryBucketDescriptor::for_index(11, HistoryBucketRange::HundredMillis);
        let mut descriptors = vec![b, c, a];
        descriptors.sort();
        assert_eq!(descriptors, vec![a, c, b]);
    }
}

//! Buckets: a descriptor plus the chunk holding its samples.

use crate::bucket::descriptor::HistoryBucketDescriptor;
use crate::bucket::range::HistoryBucketRange;
use crate::bucket::sampling::SamplingPeriod;
use crate::chunk::HistoryChunk;
use crate::error::{HistoryError, Result};
use crate::model::{
    DecimalDataSeriesIndex, EnumDataSeriesIndex, HistoryEnumSet, ReferenceEntryDataSeriesIndex,
    ReferenceEntryId, Sample, Sentinel, TimestampIndex,
};
use crate::storage::TimeRange;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;

/// Samples of one descriptor.
///
/// Buckets are replaced as a whole on every store: a merge always produces
/// a new chunk and thus a new bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryBucket {
    descriptor: HistoryBucketDescriptor,
    chunk: HistoryChunk,
}

impl HistoryBucket {
    /// Creates a bucket.
    ///
    /// Fails if a non-empty chunk has samples outside of `[start, end)`.
    pub fn new(descriptor: HistoryBucketDescriptor, chunk: HistoryChunk) -> Result<Self> {
        if let (Some(first), Some(last)) = (chunk.first_time_stamp(), chunk.last_time_stamp()) {
            if first < descriptor.start() || last >= descriptor.end() {
                return Err(HistoryError::BucketBoundary {
                    first,
                    last,
                    start: descriptor.start(),
                    end: descriptor.end(),
                });
            }
        }
        Ok(Self { descriptor, chunk })
    }

    /// The address of the bucket.
    pub fn descriptor(&self) -> &HistoryBucketDescriptor {
        &self.descriptor
    }

    /// The samples of the bucket.
    pub fn chunk(&self) -> &HistoryChunk {
        &self.chunk
    }

    /// Consumes the bucket and returns its chunk.
    pub fn into_chunk(self) -> HistoryChunk {
        self.chunk
    }

    /// Start of the descriptor (inclusive).
    pub fn start(&self) -> f64 {
        self.descriptor.start()
    }

    /// End of the descriptor (exclusive).
    pub fn end(&self) -> f64 {
        self.descriptor.end()
    }

    /// Range of the descriptor.
    pub fn bucket_range(&self) -> HistoryBucketRange {
        self.descriptor.bucket_range()
    }

    /// Sampling period of the descriptor.
    pub fn sampling_period(&self) -> SamplingPeriod {
        self.descriptor.sampling_period()
    }

    /// Returns true if the chunk holds no samples.
    pub fn is_empty(&self) -> bool {
        self.chunk.is_empty()
    }

    /// Returns true if the bucket span overlaps the range.
    pub fn overlaps(&self, range: &TimeRange) -> bool {
        self.descriptor.time_range().overlaps(range)
    }

    /// Returns true if the timestamp lies within the bucket span.
    pub fn contains(&self, timestamp: f64) -> bool {
        self.descriptor.contains(timestamp)
    }
}

/// Finds the sample for `timestamp` in sorted buckets.
///
/// Returns a direct hit, or the preceding sample if it lies less than one
/// sampling distance before `timestamp`.
pub fn find<B: Borrow<HistoryBucket>>(buckets: &[B], timestamp: f64) -> Option<(&HistoryBucket, TimestampIndex)> {
    for bucket in buckets {
        let bucket = bucket.borrow();
        let chunk = bucket.chunk();

        let best = chunk.best_timestamp_index_for(timestamp);
        if let Some(index) = best.found() {
            return Some((bucket, index));
        }

        let near_index = best.near_index();
        if near_index == 0 || near_index > chunk.time_stamps_count() {
            continue;
        }

        let index = TimestampIndex::new(near_index - 1);
        let relevant = chunk.timestamp_center(index);
        let max_distance = bucket.bucket_range().distance();

        if relevant >= timestamp + max_distance {
            // later buckets only hold later samples
            return None;
        }
        if timestamp - relevant < max_distance {
            return Some((bucket, index));
        }
    }
    None
}

/// Decimal value at the timestamp (see [`find`]). NoValue if nothing is found.
pub fn find_decimal_value_at<B: Borrow<HistoryBucket>>(
    buckets: &[B],
    series: DecimalDataSeriesIndex,
    timestamp: f64,
) -> Sample<f64> {
    find(buckets, timestamp)
        .map(|(bucket, index)| bucket.chunk().decimal_value(series, index))
        .unwrap_or(Sample::NoValue)
}

/// Enum value at the timestamp (see [`find`]). NoValue if nothing is found.
pub fn find_enum_value_at<B: Borrow<HistoryBucket>>(
    buckets: &[B],
    series: EnumDataSeriesIndex,
    timestamp: f64,
) -> HistoryEnumSet {
    find(buckets, timestamp)
        .map(|(bucket, index)| bucket.chunk().enum_value(series, index))
        .unwrap_or(HistoryEnumSet::NO_VALUE)
}

/// Reference-entry id at the timestamp (see [`find`]). NoValue if nothing is found.
pub fn find_reference_entry_id_value_at<B: Borrow<HistoryBucket>>(
    buckets: &[B],
    series: ReferenceEntryDataSeriesIndex,
    timestamp: f64,
) -> ReferenceEntryId {
    find(buckets, timestamp)
        .map(|(bucket, index)| bucket.chunk().reference_entry_id(series, index))
        .unwrap_or(ReferenceEntryId::NO_VALUE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::HistoryChunkBuilder;
    use crate::model::HistoryConfiguration;

    fn chunk(rows: &[(f64, f64)]) -> HistoryChunk {
        let mut builder = HistoryChunkBuilder::new(HistoryConfiguration::default_for(1, 0, 0));
        for (timestamp, value) in rows {
            builder.add_decimal_values(*timestamp, [*value]).unwrap();
        }
        builder.build().unwrap()
    }

    #[test]
    fn test_boundaries_are_validated() {
        let descriptor = HistoryBucketDescriptor::for_timestamp(1_000.0, HistoryBucketRange::HundredMillis);

        assert!(HistoryBucket::new(descriptor, chunk(&[(1_000.0, 1.0), (1_099.0, 2.0)])).is_ok());
        assert!(HistoryBucket::new(descriptor, chunk(&[])).is_ok());

        match HistoryBucket::new(descriptor, chunk(&[(1_000.0, 1.0), (1_100.0, 2.0)])) {
            Err(HistoryError::BucketBoundary { last, end, .. }) => {
                assert_eq!(last, 1_100.0);
                assert_eq!(end, 1_100.0);
            }
            other => panic!("Expected BucketBoundary, got {:?}", other),
        }
        assert!(HistoryBucket::new(descriptor, chunk(&[(999.0, 1.0)])).is_err());
    }

    #[test]
    fn test_find_direct_and_preceding() {
        let descriptor = HistoryBucketDescriptor::for_timestamp(1_000.0, HistoryBucketRange::HundredMillis);
        let bucket = HistoryBucket::new(descriptor, chunk(&[(1_000.0, 1.0), (1_010.0, 2.0)])).unwrap();
        let buckets = vec![bucket];

        assert_eq!(find_decimal_value_at(&buckets, DecimalDataSeriesIndex::ZERO, 1_010.0), Sample::Value(2.0));
        // less than one millisecond after the sample
        assert_eq!(find_decimal_value_at(&buckets, DecimalDataSeriesIndex::ZERO, 1_010.5), Sample::Value(2.0));
        assert_eq!(find_decimal_value_at(&buckets, DecimalDataSeriesIndex::ZERO, 1_005.0), Sample::NoValue);
        assert_eq!(find_decimal_value_at(&buckets, DecimalDataSeriesIndex::ZERO, 999.0), Sample::NoValue);
        assert_eq!(
            find_enum_value_at(&buckets, EnumDataSeriesIndex::ZERO, 500.0),
            HistoryEnumSet::NO_VALUE
        );
    }

    #[test]
    fn test_overlaps() {
        let descriptor = HistoryBucketDescriptor::for_timestamp(1_000.0, HistoryBucketRange::HundredMillis);
        let bucket = HistoryBucket::new(descriptor, chunk(&[])).unwrap();
        assert!(bucket.overlaps(&TimeRange::new(1_050.0, 2_000.0)));
        assert!(!bucket.overlaps(&TimeRange::new(1_100.0, 2_000.0)));
        assert!(bucket.contains(1_000.0));
        assert!(!bucket.contains(1_100.0));
    }
}

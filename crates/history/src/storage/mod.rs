//! Storage contract and the in-memory implementation.
//!
//! # Architecture
//!
//! ```text
//! producer ──► HistoryStorageCache ──(window)──► WritableHistoryStorage::store_chunk
//!                                                  │ merge per descriptor
//!                                                  ▼
//!                                   InMemoryHistoryStorage (map + bookkeeping)
//!                                                  │ observers
//!                                                  ▼
//!                                   HistoryObserver(descriptor, HistoryUpdateInfo)
//! ```
//!
//! Buckets are immutable and handed out as `Arc<HistoryBucket>`. A store
//! replaces the bucket of its descriptor wholesale. Multi-descriptor stores
//! are applied per descriptor and are not atomic.

pub mod bookkeeping;
pub mod cache;
pub mod cleanup;
pub mod memory;
pub mod minmax;
pub mod timer;

pub use bookkeeping::InMemoryBookKeeping;
pub use cache::{CacheState, Clock, HistoryStorageCache, HistoryStorageCacheConfig, ManualClock, SystemClock};
pub use cleanup::{CleanupResult, HistoryCleanupService, MaxHistorySizeConfiguration};
pub use memory::{DeletionReport, InMemoryHistoryStorage, InMemoryHistoryStorageConfig};
pub use minmax::MinMaxValues;
pub use timer::FlushTimer;

use crate::bucket::{HistoryBucket, HistoryBucketDescriptor, SamplingPeriod};
use crate::chunk::HistoryChunk;
use crate::error::Result;
use crate::model::DecimalDataSeriesIndex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Time span in milliseconds: `start` inclusive, `end` exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    /// Start (inclusive).
    pub start: f64,
    /// End (exclusive).
    pub end: f64,
}

impl TimeRange {
    /// Creates a new time range.
    pub const fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    /// Returns true if both ranges share at least one instant.
    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Returns true if `start <= timestamp < end`.
    pub fn contains(&self, timestamp: f64) -> bool {
        self.start <= timestamp && timestamp < self.end
    }

    /// Length of the range.
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// Describes which part of the history changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryUpdateInfo {
    /// Sampling period of the changed buckets.
    pub sampling_period: SamplingPeriod,
    /// The changed time ranges.
    pub updated_time_ranges: Vec<TimeRange>,
}

impl HistoryUpdateInfo {
    /// Creates an update info.
    pub fn new(sampling_period: SamplingPeriod, updated_time_ranges: Vec<TimeRange>) -> Self {
        Self {
            sampling_period,
            updated_time_ranges,
        }
    }

    /// The complete span of a descriptor changed.
    pub fn from_descriptor(descriptor: &HistoryBucketDescriptor) -> Self {
        Self::new(descriptor.sampling_period(), vec![descriptor.time_range()])
    }

    /// The span from the first timestamp of a chunk up to one sampling
    /// distance past its last timestamp changed.
    pub fn from_chunk(chunk: &HistoryChunk, sampling_period: SamplingPeriod) -> Self {
        let ranges = match (chunk.first_time_stamp(), chunk.last_time_stamp()) {
            (Some(first), Some(last)) => vec![TimeRange::new(first, last + sampling_period.distance())],
            _ => Vec::new(),
        };
        Self::new(sampling_period, ranges)
    }
}

/// Callback invoked on every store, delete and clear.
pub type HistoryObserver = Box<dyn Fn(&HistoryBucketDescriptor, &HistoryUpdateInfo) + Send + Sync>;

/// Read access to stored buckets.
pub trait HistoryStorage: Send + Sync {
    /// Returns the bucket for the descriptor. A missing bucket is not an error.
    fn get(&self, descriptor: &HistoryBucketDescriptor) -> Option<Arc<HistoryBucket>>;

    /// Returns the buckets that exist for the descriptors, in order.
    fn get_all(&self, descriptors: &[HistoryBucketDescriptor]) -> Vec<Arc<HistoryBucket>> {
        descriptors
            .iter()
            .filter_map(|descriptor| self.get(descriptor))
            .collect()
    }

    /// Returns the stored buckets covering `[start, end]` at the sampling period.
    ///
    /// Fails if the span needs more than
    /// [`MAX_SUPPORTED_DESCRIPTORS_COUNT`](crate::bucket::MAX_SUPPORTED_DESCRIPTORS_COUNT)
    /// descriptors.
    fn query(&self, start: f64, end: f64, sampling_period: SamplingPeriod) -> Result<Vec<Arc<HistoryBucket>>> {
        let descriptors = HistoryBucketDescriptor::for_range(start, end, sampling_period.bucket_range())?;
        debug_assert!(
            descriptors
                .first()
                .zip(descriptors.last())
                .map_or(true, |(first, last)| first.start() <= start && last.end() >= end),
            "descriptors do not cover [{}, {}]",
            start,
            end
        );
        Ok(self.get_all(&descriptors))
    }

    /// Min/max of the decimal series over the time range.
    ///
    /// Fails with [`HistoryError::SeriesIndexOutOfRange`](crate::error::HistoryError::SeriesIndexOutOfRange)
    /// if a series index does not exist in the stored buckets.
    fn query_min_max(
        &self,
        time_range: &TimeRange,
        sampling_period: SamplingPeriod,
        series: &[DecimalDataSeriesIndex],
    ) -> Result<MinMaxValues> {
        let buckets = self.query(time_range.start, time_range.end, sampling_period)?;
        MinMaxValues::compute(&buckets, time_range, series)
    }
}

/// Write access to stored buckets.
pub trait WritableHistoryStorage: HistoryStorage {
    /// Stores the bucket, replacing an existing one with the same descriptor.
    fn store_bucket(&self, bucket: HistoryBucket, update_info: HistoryUpdateInfo) -> Result<()>;

    /// Deletes the bucket of the descriptor.
    fn delete(&self, descriptor: &HistoryBucketDescriptor) -> Result<()>;

    /// Merges the chunk into every bucket it touches.
    ///
    /// Missing buckets start out empty. The chunk wins on timestamp collisions.
    /// Descriptors are updated one after another; a failure leaves the
    /// descriptors before it updated.
    fn store_chunk(&self, chunk: &HistoryChunk, sampling_period: SamplingPeriod) -> Result<()> {
        if chunk.is_empty() {
            return Ok(());
        }

        let update_info = HistoryUpdateInfo::from_chunk(chunk, sampling_period);
        for descriptor in HistoryBucketDescriptor::from_chunk(chunk, sampling_period) {
            let existing = self.get(&descriptor);
            let base = match &existing {
                Some(bucket) => bucket.chunk().clone(),
                None => chunk.without_values(),
            };

            match base.merge(chunk, descriptor.start(), descriptor.end())? {
                Some(merged) => {
                    debug!(
                        "store {} rows into {:?} (existing: {})",
                        merged.time_stamps_count(),
                        descriptor,
                        existing.is_some()
                    );
                    self.store_bucket(HistoryBucket::new(descriptor, merged)?, update_info.clone())?;
                }
                None => debug!("nothing to store for {:?}", descriptor),
            }
        }
        Ok(())
    }
}

/// Change notification.
pub trait ObservableHistoryStorage {
    /// Registers an observer.
    fn observe(&self, observer: HistoryObserver);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_range() {
        let range = TimeRange::new(100.0, 200.0);
        assert!(range.contains(100.0));
        assert!(!range.contains(200.0));
        assert!(range.overlaps(&TimeRange::new(199.0, 300.0)));
        assert!(!range.overlaps(&TimeRange::new(200.0, 300.0)));
        assert_eq!(range.duration(), 100.0);
    }

    #[test]
    fn test_update_info_from_descriptor() {
        let descriptor =
            HistoryBucketDescriptor::for_timestamp(1_050.0, crate::bucket::HistoryBucketRange::HundredMillis);
        let info = HistoryUpdateInfo::from_descriptor(&descriptor);
        assert_eq!(info.sampling_period, SamplingPeriod::EveryMillisecond);
        assert_eq!(info.updated_time_ranges, vec![TimeRange::new(1_000.0, 1_100.0)]);
    }

    #[test]
    fn test_update_info_from_chunk_contains_last() {
        let mut builder = crate::chunk::HistoryChunkBuilder::new(crate::model::HistoryConfiguration::default_for(1, 0, 0));
        builder.add_decimal_values(1_000.0, [1.0]).unwrap();
        builder.add_decimal_values(1_200.0, [2.0]).unwrap();
        let chunk = builder.build().unwrap();

        let info = HistoryUpdateInfo::from_chunk(&chunk, SamplingPeriod::EveryHundredMillis);
        assert_eq!(info.updated_time_ranges, vec![TimeRange::new(1_000.0, 1_300.0)]);
        assert!(info.updated_time_ranges[0].contains(1_000.0));
        assert!(info.updated_time_ranges[0].contains(1_200.0));

        let empty = crate::chunk::HistoryChunkBuilder::new(crate::model::HistoryConfiguration::default_for(1, 0, 0))
            .build()
            .unwrap();
        assert!(HistoryUpdateInfo::from_chunk(&empty, SamplingPeriod::EverySecond)
            .updated_time_ranges
            .is_empty());
    }
}

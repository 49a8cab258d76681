//! Retention: keeps a fixed number of buckets per range.
//!
//! # Example
//!
//! ```rust,ignore
//! use alopex_history::{HistoryBucketRange, HistoryCleanupService, InMemoryHistoryStorage};
//!
//! let service = HistoryCleanupService::default();
//! let result = service.cleanup(&storage, HistoryBucketRange::HundredMillis, 5)?;
//! println!("deleted {} buckets", result.len());
//! ```

use crate::bucket::{HistoryBucketDescriptor, HistoryBucketRange};
use crate::error::Result;
use crate::storage::memory::InMemoryHistoryStorage;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Default number of buckets kept per range.
pub const DEFAULT_KEPT_BUCKET_COUNT: usize = 100;

/// How many buckets the cleanup keeps per range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaxHistorySizeConfiguration {
    /// Buckets kept per range. Default: 100.
    pub kept_bucket_count: usize,
}

impl Default for MaxHistorySizeConfiguration {
    fn default() -> Self {
        Self {
            kept_bucket_count: DEFAULT_KEPT_BUCKET_COUNT,
        }
    }
}

impl MaxHistorySizeConfiguration {
    /// Keeps the given number of buckets.
    pub const fn new(kept_bucket_count: usize) -> Self {
        Self { kept_bucket_count }
    }

    /// Keeps enough buckets of `bucket_range` to cover `duration` ms.
    pub fn for_duration(duration: f64, bucket_range: HistoryBucketRange) -> Self {
        Self::new((duration / bucket_range.duration()).ceil().max(0.0) as usize)
    }
}

/// Descriptors deleted by one cleanup run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupResult {
    /// Deleted descriptors, newest first per range.
    pub deleted_descriptors: Vec<HistoryBucketDescriptor>,
}

impl CleanupResult {
    /// Number of deleted descriptors.
    pub fn len(&self) -> usize {
        self.deleted_descriptors.len()
    }

    /// Returns true if nothing was deleted.
    pub fn is_empty(&self) -> bool {
        self.deleted_descriptors.is_empty()
    }
}

/// Deletes old buckets from an [`InMemoryHistoryStorage`].
#[derive(Debug, Clone, Copy, Default)]
pub struct HistoryCleanupService;

impl HistoryCleanupService {
    /// Creates the service.
    pub fn new() -> Self {
        Self
    }

    /// Keeps the latest `kept_bucket_count` buckets of the range.
    ///
    /// Counting starts at the latest bound, so gaps count as kept buckets.
    /// Everything from `latest - kept_bucket_count` backwards is deleted.
    /// `kept_bucket_count == 0` fails with [`HistoryError::InvalidDistance`](crate::HistoryError::InvalidDistance).
    pub fn cleanup(
        &self,
        storage: &InMemoryHistoryStorage,
        bucket_range: HistoryBucketRange,
        kept_bucket_count: usize,
    ) -> Result<CleanupResult> {
        let Some(latest) = storage.book_keeping().latest_bound(bucket_range) else {
            debug!("cleanup {:?}: nothing stored", bucket_range);
            return Ok(CleanupResult::default());
        };

        let first_to_delete = latest.previous_by(kept_bucket_count as i64)?;
        let report = storage.delete_and_before(&first_to_delete);
        debug!(
            "cleanup {:?}: kept {} up to {:?}, deleted {}",
            bucket_range,
            kept_bucket_count,
            latest,
            report.len()
        );

        Ok(CleanupResult {
            deleted_descriptors: report.deleted_descriptors,
        })
    }

    /// Runs [`Self::cleanup`] for every range with the configured max size.
    pub fn cleanup_all(&self, storage: &InMemoryHistoryStorage) -> Result<CleanupResult> {
        let kept_bucket_count = storage.max_size_configuration().kept_bucket_count;
        let mut result = CleanupResult::default();
        for bucket_range in HistoryBucketRange::ALL {
            let deleted = self.cleanup(storage, bucket_range, kept_bucket_count)?;
            result.deleted_descriptors.extend(deleted.deleted_descriptors);
        }
        Ok(result)
    }
}

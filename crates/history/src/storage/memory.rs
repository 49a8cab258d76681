//! In-memory bucket storage.
//!
//! # Example
//!
//! ```rust,ignore
//! use alopex_history::{HistoryStorage, InMemoryHistoryStorage, SamplingPeriod, WritableHistoryStorage};
//!
//! let storage = InMemoryHistoryStorage::default();
//! storage.store_chunk(&chunk, SamplingPeriod::EveryHundredMillis)?;
//! let buckets = storage.query(1_000.0, 1_020.0, SamplingPeriod::EveryHundredMillis)?;
//! ```

use crate::bucket::{HistoryBucket, HistoryBucketDescriptor, SamplingPeriod};
use crate::error::Result;
use crate::storage::bookkeeping::InMemoryBookKeeping;
use crate::storage::cleanup::MaxHistorySizeConfiguration;
use crate::storage::{
    HistoryObserver, HistoryStorage, HistoryUpdateInfo, ObservableHistoryStorage, WritableHistoryStorage,
};
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

/// Default natural sampling period: 100 ms.
pub const DEFAULT_NATURAL_SAMPLING_PERIOD: SamplingPeriod = SamplingPeriod::EveryHundredMillis;

/// Configuration of an [`InMemoryHistoryStorage`].
#[derive(Debug, Clone, PartialEq)]
pub struct InMemoryHistoryStorageConfig {
    /// Sampling period measured data is stored with.
    ///
    /// Changing it almost always requires clearing the storage.
    /// Default: [`SamplingPeriod::EveryHundredMillis`].
    pub natural_sampling_period: SamplingPeriod,

    /// Number of buckets the cleanup keeps per range. Default: 100.
    pub max_size: MaxHistorySizeConfiguration,
}

impl Default for InMemoryHistoryStorageConfig {
    fn default() -> Self {
        Self {
            natural_sampling_period: DEFAULT_NATURAL_SAMPLING_PERIOD,
            max_size: MaxHistorySizeConfiguration::default(),
        }
    }
}

impl InMemoryHistoryStorageConfig {
    /// Sets the natural sampling period.
    pub fn with_natural_sampling_period(mut self, sampling_period: SamplingPeriod) -> Self {
        self.natural_sampling_period = sampling_period;
        self
    }

    /// Sets the max size configuration.
    pub fn with_max_size(mut self, max_size: MaxHistorySizeConfiguration) -> Self {
        self.max_size = max_size;
        self
    }
}

/// Descriptors removed by [`InMemoryHistoryStorage::delete_and_before`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeletionReport {
    /// Deleted descriptors, newest first.
    pub deleted_descriptors: Vec<HistoryBucketDescriptor>,
}

impl DeletionReport {
    /// A report without deletions.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Number of deleted descriptors.
    pub fn len(&self) -> usize {
        self.deleted_descriptors.len()
    }

    /// Returns true if nothing was deleted.
    pub fn is_empty(&self) -> bool {
        self.deleted_descriptors.is_empty()
    }
}

#[derive(Debug, Default)]
struct StorageState {
    buckets: HashMap<HistoryBucketDescriptor, Arc<HistoryBucket>>,
    book_keeping: InMemoryBookKeeping,
}

/// Stores buckets in a map keyed by descriptor.
///
/// Readers and writers synchronize through an `RwLock`. Observers are
/// invoked after the lock is released, so they may read the storage.
/// Registering an observer from within an observer deadlocks.
pub struct InMemoryHistoryStorage {
    config: InMemoryHistoryStorageConfig,
    state: RwLock<StorageState>,
    observers: RwLock<Vec<HistoryObserver>>,
}

impl Default for InMemoryHistoryStorage {
    fn default() -> Self {
        Self::new(InMemoryHistoryStorageConfig::default())
    }
}

impl std::fmt::Debug for InMemoryHistoryStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryHistoryStorage")
            .field("config", &self.config)
            .field("bucket_count", &self.bucket_count())
            .finish()
    }
}

impl InMemoryHistoryStorage {
    /// Creates an empty storage.
    pub fn new(config: InMemoryHistoryStorageConfig) -> Self {
        Self {
            config,
            state: RwLock::new(StorageState::default()),
            observers: RwLock::new(Vec::new()),
        }
    }

    /// The configuration.
    pub fn config(&self) -> &InMemoryHistoryStorageConfig {
        &self.config
    }

    /// The natural sampling period.
    pub fn natural_sampling_period(&self) -> SamplingPeriod {
        self.config.natural_sampling_period
    }

    /// Max size configuration used by the cleanup.
    pub fn max_size_configuration(&self) -> MaxHistorySizeConfiguration {
        self.config.max_size
    }

    /// First timestamp at the natural sampling period, `None` if nothing is stored.
    pub fn start(&self) -> Option<f64> {
        let range = self.natural_sampling_period().bucket_range();
        let state = self.read();
        let descriptor = state.book_keeping.earliest_bound(range)?;
        state.buckets.get(&descriptor)?.chunk().first_time_stamp()
    }

    /// Last timestamp at the natural sampling period, `None` if nothing is stored.
    pub fn end(&self) -> Option<f64> {
        let range = self.natural_sampling_period().bucket_range();
        let state = self.read();
        let descriptor = state.book_keeping.latest_bound(range)?;
        state.buckets.get(&descriptor)?.chunk().last_time_stamp()
    }

    /// Number of stored buckets over all ranges.
    pub fn bucket_count(&self) -> usize {
        self.read().buckets.len()
    }

    /// All stored descriptors, sorted.
    pub fn keys(&self) -> Vec<HistoryBucketDescriptor> {
        let mut keys: Vec<_> = self.read().buckets.keys().copied().collect();
        keys.sort();
        keys
    }

    /// A snapshot of the bookkeeping.
    pub fn book_keeping(&self) -> InMemoryBookKeeping {
        self.read().book_keeping.clone()
    }

    /// Removes all buckets and notifies the observers once per removed descriptor.
    pub fn clear(&self) {
        let removed: Vec<HistoryBucketDescriptor> = {
            let mut state = self.write();
            state.book_keeping.clear();
            state.buckets.drain().map(|(descriptor, _)| descriptor).collect()
        };
        debug!("cleared {} buckets", removed.len());

        for descriptor in &removed {
            self.notify(descriptor, &HistoryUpdateInfo::from_descriptor(descriptor));
        }
    }

    /// Deletes the descriptor and every earlier descriptor of its range.
    ///
    /// Walks backwards from `descriptor` down to the earliest bound. The
    /// earliest bound is set to `descriptor.next()` afterwards.
    pub fn delete_and_before(&self, descriptor: &HistoryBucketDescriptor) -> DeletionReport {
        let mut removed = Vec::new();
        let report = {
            let mut state = self.write();
            let Some(earliest) = state.book_keeping.earliest_bound(descriptor.bucket_range()) else {
                return DeletionReport::empty();
            };
            if descriptor.start() < earliest.start() {
                return DeletionReport::empty();
            }

            let mut deleted = Vec::new();
            let mut current = *descriptor;
            while current.start() >= earliest.start() {
                state.book_keeping.remove(&current);
                if state.buckets.remove(&current).is_some() {
                    removed.push(current);
                }
                deleted.push(current);
                current = current.previous();
            }
            // removal ran newest to oldest, the bounds are repaired at the end
            state.book_keeping.set_earliest_bound(descriptor.next());

            DeletionReport {
                deleted_descriptors: deleted,
            }
        };
        debug!(
            "deleted {} descriptors up to {:?} ({} buckets)",
            report.len(),
            descriptor,
            removed.len()
        );

        for descriptor in &removed {
            self.notify(descriptor, &HistoryUpdateInfo::from_descriptor(descriptor));
        }
        report
    }

    fn notify(&self, descriptor: &HistoryBucketDescriptor, update_info: &HistoryUpdateInfo) {
        let observers = self.observers.read().unwrap_or_else(|err| err.into_inner());
        for observer in observers.iter() {
            observer(descriptor, update_info);
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, StorageState> {
        self.state.read().unwrap_or_else(|err| err.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, StorageState> {
        self.state.write().unwrap_or_else(|err| err.into_inner())
    }
}

impl HistoryStorage for InMemoryHistoryStorage {
    fn get(&self, descriptor: &HistoryBucketDescriptor) -> Option<Arc<HistoryBucket>> {
        self.read().buckets.get(descriptor).cloned()
    }
}

impl WritableHistoryStorage for InMemoryHistoryStorage {
    fn store_bucket(&self, bucket: HistoryBucket, update_info: HistoryUpdateInfo) -> Result<()> {
        let descriptor = *bucket.descriptor();
        {
            let mut state = self.write();
            state.buckets.insert(descriptor, Arc::new(bucket));
            state.book_keeping.store(descriptor);
        }
        self.notify(&descriptor, &update_info);
        Ok(())
    }

    fn delete(&self, descriptor: &HistoryBucketDescriptor) -> Result<()> {
        let removed = {
            let mut state = self.write();
            state.book_keeping.remove(descriptor);
            state.buckets.remove(descriptor).is_some()
        };
        if removed {
            self.notify(descriptor, &HistoryUpdateInfo::from_descriptor(descriptor));
        }
        Ok(())
    }
}

impl ObservableHistoryStorage for InMemoryHistoryStorage {
    fn observe(&self, observer: HistoryObserver) {
        self.observers
            .write()
            .unwrap_or_else(|err| err.into_inner())
            .push(observer);
    }
}

//! Alopex History - multi-resolution history storage for time-stamped samples
//!
//! This crate stores samples of decimal, enum and reference-entry series in
//! immutable columnar chunks, addressed by bucket descriptors at fourteen
//! resolutions from 1 ms up to 360 days.
//!
//! # Components
//!
//! - [`HistoryChunk`] / [`HistoryChunkBuilder`]: columnar rows with Pending / NoValue sentinels
//! - [`HistoryBucketDescriptor`]: `(index, range)` address of a bucket
//! - [`InMemoryHistoryStorage`]: bucket map with bookkeeping and observers
//! - [`HistoryStorageCache`]: time-windowed write coalescing
//! - [`search`](search::search): Exact / AndBefore sample lookup
//!
//! # Example
//!
//! ```rust,ignore
//! use alopex_history::{
//!     HistoryChunkBuilder, HistoryConfiguration, HistoryStorage, InMemoryHistoryStorage,
//!     SamplingPeriod, WritableHistoryStorage,
//! };
//!
//! let configuration = HistoryConfiguration::default_for(2, 0, 0);
//! let mut builder = HistoryChunkBuilder::new(configuration);
//! builder.add_decimal_values(1_000.0, [31.0, 10.0])?;
//! builder.add_decimal_values(1_100.0, [32.0, 11.0])?;
//! let chunk = builder.build()?;
//!
//! let storage = InMemoryHistoryStorage::default();
//! storage.store_chunk(&chunk, SamplingPeriod::EveryHundredMillis)?;
//!
//! let buckets = storage.query(1_000.0, 1_100.0, SamplingPeriod::EveryHundredMillis)?;
//! assert_eq!(buckets.len(), 1);
//! ```

#![deny(missing_docs)]

pub mod bucket;
pub mod chunk;
pub mod error;
pub mod model;
pub mod search;
pub mod storage;

pub use bucket::{
    HistoryBucket, HistoryBucketDescriptor, HistoryBucketRange, SamplingPeriod,
    MAX_SUPPORTED_DESCRIPTORS_COUNT,
};
pub use chunk::{
    CalculatedRow, HistoryChunk, HistoryChunkBuilder, HistoryValues, MeasuredRow, RecordingType,
};
pub use error::{HistoryError, Result};
pub use model::{
    DataSeriesId, DecimalDataSeriesIndex, EnumDataSeriesIndex, HistoryConfiguration,
    HistoryEnumOrdinal, HistoryEnumSet, ReferenceEntriesDataMap, ReferenceEntryData,
    ReferenceEntryDataSeriesIndex, ReferenceEntryId, ReferenceEntryIdsCount, Sample, Sentinel,
    TimestampIndex,
};
pub use search::{SearchConstraint, SearchResult};
pub use storage::{
    CacheState, HistoryCleanupService, HistoryObserver, HistoryStorage, HistoryStorageCache,
    HistoryStorageCacheConfig, HistoryUpdateInfo, InMemoryHistoryStorage,
    InMemoryHistoryStorageConfig, MaxHistorySizeConfiguration, ObservableHistoryStorage,
    TimeRange, WritableHistoryStorage,
};

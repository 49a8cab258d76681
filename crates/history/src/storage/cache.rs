//! Write coalescing in front of a writable storage.
//!
//! # Architecture
//!
//! ```text
//!            schedule_for_store(chunk)
//!  Idle ─────────────────────────────► Scheduled ──┐ merge further chunks
//!   ▲                                     │  ▲     │
//!   │ clear()                  window     │  └─────┘
//!   │                          elapsed    ▼
//!   └────────────────────────────────── Flushed ──► store_chunk(merged)
//! ```
//!
//! Chunks scheduled within one window are merged into a single chunk and
//! written with one store per touched descriptor. If the last flush is older
//! than the window the merged chunk is written right away, otherwise a
//! [`FlushTimer`] writes it when the window has elapsed.
//!
//! # Example
//!
//! ```rust,ignore
//! use alopex_history::{HistoryStorageCache, InMemoryHistoryStorage, SamplingPeriod};
//! use std::sync::Arc;
//!
//! let storage = Arc::new(InMemoryHistoryStorage::default());
//! let cache = HistoryStorageCache::new(Arc::clone(&storage));
//! cache.schedule_for_store(&chunk, SamplingPeriod::EveryHundredMillis)?;
//! cache.dispose();
//! ```

use crate::bucket::SamplingPeriod;
use crate::chunk::HistoryChunk;
use crate::error::{HistoryError, Result};
use crate::storage::timer::FlushTimer;
use crate::storage::WritableHistoryStorage;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, error};

/// Default coalescing window: 500 ms.
pub const DEFAULT_WINDOW: Duration = Duration::from_millis(500);

/// Source of the current time in milliseconds since the epoch.
pub trait Clock: Send + Sync {
    /// Current time (ms).
    fn now(&self) -> f64;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs_f64()
            * 1000.0
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    millis: AtomicU64,
}

impl ManualClock {
    /// Creates a clock at `now` ms.
    pub fn new(now: f64) -> Self {
        Self {
            millis: AtomicU64::new(now.to_bits()),
        }
    }

    /// Sets the current time.
    pub fn set(&self, now: f64) {
        self.millis.store(now.to_bits(), Ordering::SeqCst);
    }

    /// Moves the clock forward by `millis`.
    pub fn advance(&self, millis: f64) {
        self.set(self.now() + millis);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        f64::from_bits(self.millis.load(Ordering::SeqCst))
    }
}

/// Configuration of a [`HistoryStorageCache`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryStorageCacheConfig {
    /// Minimum time between two flushes. Default: 500 ms.
    pub window: Duration,
}

impl Default for HistoryStorageCacheConfig {
    fn default() -> Self {
        Self { window: DEFAULT_WINDOW }
    }
}

impl HistoryStorageCacheConfig {
    /// Sets the coalescing window.
    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }
}

/// Observable state of the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    /// Nothing scheduled since creation or the last clear.
    Idle,
    /// A merged chunk waits for the flush.
    Scheduled,
    /// The last scheduled chunk has been written.
    Flushed,
}

#[derive(Debug)]
struct Scheduled {
    chunk: HistoryChunk,
    sampling_period: SamplingPeriod,
}

#[derive(Debug)]
struct CacheInner {
    scheduled: Option<Scheduled>,
    last_flush: f64,
    flushed: bool,
    disposed: bool,
}

struct CacheShared<S> {
    storage: Arc<S>,
    clock: Arc<dyn Clock>,
    inner: Mutex<CacheInner>,
}

impl<S: WritableHistoryStorage> CacheShared<S> {
    fn lock(&self) -> MutexGuard<'_, CacheInner> {
        self.inner.lock().unwrap_or_else(|err| err.into_inner())
    }

    /// Writes the scheduled chunk. The caller holds the lock for the whole
    /// store, so `dispose` waits for a running flush.
    ///
    /// A failed store keeps the chunk scheduled.
    fn flush_locked(&self, inner: &mut CacheInner) -> Result<()> {
        if inner.disposed {
            return Err(HistoryError::Disposed);
        }
        inner.last_flush = self.clock.now();
        let Some(scheduled) = inner.scheduled.take() else {
            return Ok(());
        };

        debug!(
            "flushing {} rows at {:?}",
            scheduled.chunk.time_stamps_count(),
            scheduled.sampling_period
        );
        match self.storage.store_chunk(&scheduled.chunk, scheduled.sampling_period) {
            Ok(()) => {
                inner.flushed = true;
                Ok(())
            }
            Err(err) => {
                inner.scheduled = Some(scheduled);
                Err(err)
            }
        }
    }
}

/// Batches chunks and writes them at most once per window.
///
/// Flushes run while the cache lock is held: observers of the storage must
/// not call back into the cache.
pub struct HistoryStorageCache<S: WritableHistoryStorage + 'static> {
    shared: Arc<CacheShared<S>>,
    window: Duration,
    timer: FlushTimer,
}

impl<S: WritableHistoryStorage + 'static> std::fmt::Debug for HistoryStorageCache<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryStorageCache")
            .field("window", &self.window)
            .field("state", &self.state())
            .finish()
    }
}

impl<S: WritableHistoryStorage + 'static> HistoryStorageCache<S> {
    /// Creates a cache with the default window and the wall clock.
    pub fn new(storage: Arc<S>) -> Self {
        Self::with_config(storage, HistoryStorageCacheConfig::default(), Arc::new(SystemClock))
    }

    /// Creates a cache with an explicit configuration and clock.
    ///
    /// The last flush counts as having happened at creation.
    pub fn with_config(storage: Arc<S>, config: HistoryStorageCacheConfig, clock: Arc<dyn Clock>) -> Self {
        let shared = Arc::new(CacheShared {
            storage,
            inner: Mutex::new(CacheInner {
                scheduled: None,
                last_flush: clock.now(),
                flushed: false,
                disposed: false,
            }),
            clock,
        });

        let weak: Weak<CacheShared<S>> = Arc::downgrade(&shared);
        let timer = FlushTimer::new(move || {
            let Some(shared) = weak.upgrade() else {
                return;
            };
            let mut inner = shared.lock();
            match shared.flush_locked(&mut inner) {
                Ok(()) | Err(HistoryError::Disposed) => {}
                Err(err) => error!("Scheduled history flush failed: {:?}", err),
            }
        });

        Self {
            shared,
            window: config.window,
            timer,
        }
    }

    /// The coalescing window.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// The storage written to.
    pub fn storage(&self) -> &Arc<S> {
        &self.shared.storage
    }

    /// Schedules the chunk for storage.
    ///
    /// The chunk is merged into the already scheduled chunk, winning on
    /// timestamp collisions. A scheduled chunk with another sampling period
    /// or configuration is flushed first.
    pub fn schedule_for_store(&self, chunk: &HistoryChunk, sampling_period: SamplingPeriod) -> Result<()> {
        let mut inner = self.shared.lock();
        if inner.disposed {
            return Err(HistoryError::Disposed);
        }
        if chunk.is_empty() {
            return Ok(());
        }

        let switching = inner
            .scheduled
            .as_ref()
            .is_some_and(|scheduled| !compatible(scheduled, chunk, sampling_period));
        if switching {
            debug!("flushing scheduled chunk before switching to {:?}", sampling_period);
            self.shared.flush_locked(&mut inner)?;
        }

        let merged = match &inner.scheduled {
            Some(scheduled) => scheduled
                .chunk
                .merge(chunk, f64::NEG_INFINITY, f64::INFINITY)?
                .unwrap_or_else(|| chunk.clone()),
            None => chunk.clone(),
        };
        inner.scheduled = Some(Scheduled {
            chunk: merged,
            sampling_period,
        });

        let elapsed = self.shared.clock.now() - inner.last_flush;
        let window = self.window.as_secs_f64() * 1000.0;
        if elapsed >= window {
            self.timer.cancel();
            return self.shared.flush_locked(&mut inner);
        }

        self.timer
            .schedule(Duration::from_secs_f64((window - elapsed).max(0.0) / 1000.0));
        Ok(())
    }

    /// A copy of the chunk waiting for the flush.
    pub fn scheduled_chunk(&self) -> Option<HistoryChunk> {
        self.shared
            .lock()
            .scheduled
            .as_ref()
            .map(|scheduled| scheduled.chunk.clone())
    }

    /// Writes the scheduled chunk now.
    ///
    /// # Errors
    ///
    /// Returns [`HistoryError::Disposed`] after [`Self::dispose`], or the
    /// error of the storage. A chunk that failed to store stays scheduled
    /// and is retried with the next flush; [`Self::clear`] discards it.
    pub fn flush(&self) -> Result<()> {
        let mut inner = self.shared.lock();
        self.timer.cancel();
        self.shared.flush_locked(&mut inner)
    }

    /// Discards the scheduled chunk without writing it.
    pub fn clear(&self) {
        let mut inner = self.shared.lock();
        self.timer.cancel();
        inner.scheduled = None;
        inner.flushed = false;
    }

    /// Discards the scheduled chunk and stops all flushes.
    ///
    /// Waits for a running flush. Once this returns nothing is written
    /// anymore and every further call fails with [`HistoryError::Disposed`].
    pub fn dispose(&self) {
        let mut inner = self.shared.lock();
        self.timer.cancel();
        inner.scheduled = None;
        inner.disposed = true;
    }

    /// Returns true after [`Self::dispose`].
    pub fn is_disposed(&self) -> bool {
        self.shared.lock().disposed
    }

    /// Current state.
    pub fn state(&self) -> CacheState {
        let inner = self.shared.lock();
        if inner.scheduled.is_some() {
            CacheState::Scheduled
        } else if inner.flushed {
            CacheState::Flushed
        } else {
            CacheState::Idle
        }
    }
}

fn compatible(scheduled: &Scheduled, chunk: &HistoryChunk, sampling_period: SamplingPeriod) -> bool {
    scheduled.sampling_period == sampling_period
        && scheduled.chunk.recording_type() == chunk.recording_type()
        && (Arc::ptr_eq(scheduled.chunk.configuration(), chunk.configuration())
            || scheduled.chunk.configuration() == chunk.configuration())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bucket::{HistoryBucketDescriptor, SamplingPeriod};
    use crate::chunk::HistoryChunkBuilder;
    use crate::model::HistoryConfiguration;
    use crate::storage::{HistoryStorage, InMemoryHistoryStorage};

    const PERIOD: SamplingPeriod = SamplingPeriod::EveryHundredMillis;

    fn chunk(base: f64) -> HistoryChunk {
        let mut builder = HistoryChunkBuilder::new(HistoryConfiguration::default_for(3, 0, 0));
        for offset in 0..5 {
            let time_stamp = base + offset as f64;
            builder
                .add_decimal_values(time_stamp, (0..3).map(|series| series as f64 * 1000.0 + time_stamp))
                .unwrap();
        }
        builder.build().unwrap()
    }

    fn cache_with_clock() -> (HistoryStorageCache<InMemoryHistoryStorage>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(0.0));
        let cache = HistoryStorageCache::with_config(
            Arc::new(InMemoryHistoryStorage::default()),
            HistoryStorageCacheConfig::default().with_window(Duration::from_secs(60)),
            Arc::clone(&clock) as Arc<dyn Clock>,
        );
        (cache, clock)
    }

    #[test]
    fn test_config_default() {
        assert_eq!(HistoryStorageCacheConfig::default().window, Duration::from_millis(500));
    }

    #[test]
    fn test_schedule_merges_within_window() {
        let (cache, _clock) = cache_with_clock();
        assert_eq!(cache.state(), CacheState::Idle);
        assert!(cache.scheduled_chunk().is_none());

        cache.schedule_for_store(&chunk(700.0), PERIOD).unwrap();
        cache.schedule_for_store(&chunk(800.0), PERIOD).unwrap();

        assert_eq!(cache.state(), CacheState::Scheduled);
        assert_eq!(cache.scheduled_chunk().map(|chunk| chunk.time_stamps_count()), Some(10));
        assert!(cache
            .storage()
            .get(&HistoryBucketDescriptor::for_timestamp_and_period(700.0, PERIOD))
            .is_none());
    }

    #[test]
    fn test_flushes_immediately_after_window() {
        let (cache, clock) = cache_with_clock();
        clock.advance(60_000.0);

        cache.schedule_for_store(&chunk(700.0), PERIOD).unwrap();
        assert_eq!(cache.state(), CacheState::Flushed);
        assert!(cache.scheduled_chunk().is_none());

        let bucket = cache
            .storage()
            .get(&HistoryBucketDescriptor::for_timestamp_and_period(700.0, PERIOD))
            .unwrap();
        assert_eq!(bucket.chunk().time_stamps_count(), 5);
    }

    #[test]
    fn test_clear_discards() {
        let (cache, _clock) = cache_with_clock();
        cache.schedule_for_store(&chunk(700.0), PERIOD).unwrap();
        cache.clear();

        assert_eq!(cache.state(), CacheState::Idle);
        cache.flush().unwrap();
        assert_eq!(cache.storage().bucket_count(), 0);
    }

    #[test]
    fn test_dispose() {
        let (cache, _clock) = cache_with_clock();
        cache.schedule_for_store(&chunk(700.0), PERIOD).unwrap();
        cache.dispose();

        assert!(cache.is_disposed());
        assert!(cache.scheduled_chunk().is_none());
        match cache.schedule_for_store(&chunk(800.0), PERIOD) {
            Err(HistoryError::Disposed) => {}
            other => panic!("Expected Disposed, got {:?}", other),
        }
        assert_eq!(cache.flush(), Err(HistoryError::Disposed));
        assert_eq!(cache.storage().bucket_count(), 0);
    }

    #[test]
    fn test_failed_flush_keeps_chunk() {
        let (cache, clock) = cache_with_clock();
        let storage = Arc::clone(cache.storage());

        // a calculated bucket rejects measured rows
        let mut calculated = HistoryChunkBuilder::calculated(HistoryConfiguration::default_for(3, 0, 0));
        calculated
            .add_calculated_values(
                710.0,
                crate::chunk::CalculatedRow {
                    decimal_values: vec![crate::model::Sample::Value(1.0); 3],
                    decimal_min: vec![crate::model::Sample::Value(1.0); 3],
                    decimal_max: vec![crate::model::Sample::Value(1.0); 3],
                    ..Default::default()
                },
            )
            .unwrap();
        storage.store_chunk(&calculated.build().unwrap(), PERIOD).unwrap();

        cache.schedule_for_store(&chunk(700.0), PERIOD).unwrap();
        match cache.flush() {
            Err(HistoryError::RecordingTypeMismatch { .. }) => {}
            other => panic!("Expected RecordingTypeMismatch, got {:?}", other),
        }
        assert_eq!(cache.state(), CacheState::Scheduled);
        assert_eq!(cache.scheduled_chunk().map(|chunk| chunk.time_stamps_count()), Some(5));

        // the retry after the window fails the same way and keeps the chunk
        clock.advance(60_000.0);
        assert!(cache.schedule_for_store(&chunk(705.0), PERIOD).is_err());
        assert_eq!(cache.scheduled_chunk().map(|chunk| chunk.time_stamps_count()), Some(10));

        cache.clear();
        assert_eq!(cache.state(), CacheState::Idle);
    }

    #[test]
    fn test_switching_period_flushes_first() {
        let (cache, _clock) = cache_with_clock();
        cache.schedule_for_store(&chunk(700.0), PERIOD).unwrap();
        cache.schedule_for_store(&chunk(800.0), SamplingPeriod::EverySecond).unwrap();

        assert_eq!(cache.storage().bucket_count(), 1);
        assert_eq!(cache.scheduled_chunk().map(|chunk| chunk.time_stamps_count()), Some(5));
    }
}

//! Earliest/latest stored descriptor per bucket range.

use crate::bucket::{HistoryBucketDescriptor, HistoryBucketRange};
use crate::storage::TimeRange;
use std::collections::HashMap;
use tracing::debug;

/// Tracks the earliest and the latest descriptor stored for every range.
///
/// The earliest bound is a lower bound: buckets before it are known to be
/// absent, buckets after it may be missing. After every mutation
/// `earliest.start < latest.end` holds; a latest bound violating it is
/// dropped.
#[derive(Debug, Default, Clone)]
pub struct InMemoryBookKeeping {
    earliest: HashMap<HistoryBucketRange, HistoryBucketDescriptor>,
    latest: HashMap<HistoryBucketRange, HistoryBucketDescriptor>,
}

impl InMemoryBookKeeping {
    /// Creates empty bookkeeping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a stored descriptor.
    pub fn store(&mut self, descriptor: HistoryBucketDescriptor) {
        let range = descriptor.bucket_range();

        match self.earliest.get(&range) {
            Some(current) if current.start() <= descriptor.start() => {}
            _ => {
                self.earliest.insert(range, descriptor);
            }
        }
        match self.latest.get(&range) {
            Some(current) if current.end() >= descriptor.end() => {}
            _ => {
                self.latest.insert(range, descriptor);
            }
        }

        self.fix_bounds(range);
    }

    /// Records a removed descriptor.
    ///
    /// Removing a bound moves it one bucket inwards.
    pub fn remove(&mut self, descriptor: &HistoryBucketDescriptor) {
        let range = descriptor.bucket_range();

        if self.earliest.get(&range) == Some(descriptor) {
            self.earliest.insert(range, descriptor.next());
        }
        if self.latest.get(&range) == Some(descriptor) {
            self.latest.insert(range, descriptor.previous());
        }

        self.fix_bounds(range);
    }

    /// The earliest (possibly) stored descriptor.
    pub fn earliest_bound(&self, range: HistoryBucketRange) -> Option<HistoryBucketDescriptor> {
        self.earliest.get(&range).copied()
    }

    /// The latest stored descriptor.
    pub fn latest_bound(&self, range: HistoryBucketRange) -> Option<HistoryBucketDescriptor> {
        self.latest.get(&range).copied()
    }

    /// Overrides the earliest bound.
    pub fn set_earliest_bound(&mut self, descriptor: HistoryBucketDescriptor) {
        let range = descriptor.bucket_range();
        self.earliest.insert(range, descriptor);
        self.fix_bounds(range);
    }

    /// From the start of the earliest to the end of the latest bound.
    pub fn time_range(&self, range: HistoryBucketRange) -> Option<TimeRange> {
        let earliest = self.earliest_bound(range)?;
        let latest = self.latest_bound(range)?;
        Some(TimeRange::new(earliest.start(), latest.end()))
    }

    /// Forgets all bounds.
    pub fn clear(&mut self) {
        self.earliest.clear();
        self.latest.clear();
    }

    fn fix_bounds(&mut self, range: HistoryBucketRange) {
        let (Some(earliest), Some(latest)) = (self.earliest.get(&range), self.latest.get(&range)) else {
            return;
        };
        if earliest.start() >= latest.end() {
            debug!(
                "dropping latest bound {:?} behind earliest bound {:?}",
                latest, earliest
            );
            self.latest.remove(&range);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RANGE: HistoryBucketRange = HistoryBucketRange::HundredMillis;

    fn descriptor(index: i64) -> HistoryBucketDescriptor {
        HistoryBucketDescriptor::for_index(index, RANGE)
    }

    #[test]
    fn test_store_extends_bounds() {
        let mut bookkeeping = InMemoryBookKeeping::new();
        assert_eq!(bookkeeping.earliest_bound(RANGE), None);

        bookkeeping.store(descriptor(10));
        bookkeeping.store(descriptor(8));
        bookkeeping.store(descriptor(12));
        bookkeeping.store(descriptor(11));

        assert_eq!(bookkeeping.earliest_bound(RANGE), Some(descriptor(8)));
        assert_eq!(bookkeeping.latest_bound(RANGE), Some(descriptor(12)));
        assert_eq!(bookkeeping.time_range(RANGE), Some(TimeRange::new(800.0, 1_300.0)));
        assert_eq!(bookkeeping.earliest_bound(HistoryBucketRange::OneMinute), None);
    }

    #[test]
    fn test_remove_moves_bounds_inwards() {
        let mut bookkeeping = InMemoryBookKeeping::new();
        for index in 10..15 {
            bookkeeping.store(descriptor(index));
        }

        bookkeeping.remove(&descriptor(10));
        assert_eq!(bookkeeping.earliest_bound(RANGE), Some(descriptor(11)));

        bookkeeping.remove(&descriptor(14));
        assert_eq!(bookkeeping.latest_bound(RANGE), Some(descriptor(13)));

        bookkeeping.remove(&descriptor(12));
        assert_eq!(bookkeeping.earliest_bound(RANGE), Some(descriptor(11)));
        assert_eq!(bookkeeping.latest_bound(RANGE), Some(descriptor(13)));
    }

    #[test]
    fn test_removing_single_bucket_drops_latest() {
        let mut bookkeeping = InMemoryBookKeeping::new();
        bookkeeping.store(descriptor(5));
        bookkeeping.remove(&descriptor(5));

        assert_eq!(bookkeeping.earliest_bound(RANGE), Some(descriptor(6)));
        assert_eq!(bookkeeping.latest_bound(RANGE), None);
    }

    #[test]
    fn test_set_earliest_bound_repairs() {
        let mut bookkeeping = InMemoryBookKeeping::new();
        bookkeeping.store(descriptor(1));
        bookkeeping.store(descriptor(3));

        bookkeeping.set_earliest_bound(descriptor(4));
        assert_eq!(bookkeeping.earliest_bound(RANGE), Some(descriptor(4)));
        assert_eq!(bookkeeping.latest_bound(RANGE), None);

        bookkeeping.clear();
        assert_eq!(bookkeeping.earliest_bound(RANGE), None);
    }
}

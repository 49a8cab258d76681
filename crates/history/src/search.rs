//! Sample lookup over a list of buckets.
//!
//! # Example
//!
//! ```rust,ignore
//! use alopex_history::search::{search, SearchConstraint};
//!
//! let buckets = storage.query(start, end, SamplingPeriod::EveryHundredMillis)?;
//! if let Some(result) = search(&buckets, 1_050.0, SearchConstraint::AndBefore(100.0)) {
//!     println!("{:?}", result.chunk.decimal_value(series, result.timestamp_index));
//! }
//! ```

use crate::bucket::HistoryBucket;
use crate::chunk::HistoryChunk;
use crate::model::TimestampIndex;
use std::borrow::Borrow;

/// How close a sample has to be to the searched time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SearchConstraint {
    /// The sample timestamp must equal the searched time.
    Exact,
    /// The latest sample at or before the searched time, at most the given
    /// distance (ms) earlier.
    AndBefore(f64),
}

/// A found sample.
#[derive(Debug, Clone, Copy)]
pub struct SearchResult<'a> {
    /// Chunk holding the sample.
    pub chunk: &'a HistoryChunk,
    /// Row of the sample within the chunk.
    pub timestamp_index: TimestampIndex,
}

impl SearchResult<'_> {
    /// Timestamp of the found sample.
    pub fn time_stamp(&self) -> f64 {
        self.chunk.time_stamp(self.timestamp_index)
    }
}

/// Searches the sample for `time` in buckets sorted by time.
///
/// Buckets are visited newest first. Pending samples are never returned;
/// NoValue samples are. With [`SearchConstraint::AndBefore`] a Pending
/// sample is skipped by stepping backwards, down to `time - max_distance`.
pub fn search<B: Borrow<HistoryBucket>>(
    buckets: &[B],
    time: f64,
    constraint: SearchConstraint,
) -> Option<SearchResult<'_>> {
    match constraint {
        SearchConstraint::Exact => search_exact(buckets, time),
        SearchConstraint::AndBefore(max_distance) => search_and_before(buckets, time, time - max_distance),
    }
}

fn search_exact<B: Borrow<HistoryBucket>>(buckets: &[B], time: f64) -> Option<SearchResult<'_>> {
    for bucket in buckets.iter().rev() {
        let chunk = bucket.borrow().chunk();
        if let Some(timestamp_index) = chunk.best_timestamp_index_for(time).found() {
            if chunk.is_pending(timestamp_index) {
                return None;
            }
            return Some(SearchResult { chunk, timestamp_index });
        }
    }
    None
}

fn search_and_before<B: Borrow<HistoryBucket>>(
    buckets: &[B],
    time: f64,
    earliest_time_stamp: f64,
) -> Option<SearchResult<'_>> {
    for bucket in buckets.iter().rev() {
        let chunk = bucket.borrow().chunk();
        let best = chunk.best_timestamp_index_for(time);

        // rows at or before `time`
        let mut candidates = match best.found() {
            Some(index) => index.value() + 1,
            None => best.near_index(),
        };

        while candidates > 0 {
            let timestamp_index = TimestampIndex::new(candidates - 1);
            if chunk.time_stamp(timestamp_index) < earliest_time_stamp {
                return None;
            }
            if !chunk.is_pending(timestamp_index) {
                return Some(SearchResult { chunk, timestamp_index });
            }
            candidates -= 1;
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bucket::{HistoryBucketDescriptor, HistoryBucketRange};
    use crate::chunk::HistoryChunkBuilder;
    use crate::model::{HistoryConfiguration, Sample};

    fn bucket(rows: &[(f64, Sample<f64>)], index: i64) -> HistoryBucket {
        let mut builder = HistoryChunkBuilder::new(HistoryConfiguration::default_for(1, 0, 0));
        for (time_stamp, value) in rows {
            builder.add_decimal_values(*time_stamp, [*value]).unwrap();
        }
        HistoryBucket::new(
            HistoryBucketDescriptor::for_index(index, HistoryBucketRange::FiveSeconds),
            builder.build().unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_exact() {
        let buckets = [bucket(
            &[(100.0, Sample::Value(1.0)), (200.0, Sample::NoValue), (300.0, Sample::Pending)],
            0,
        )];

        let result = search(&buckets, 200.0, SearchConstraint::Exact).unwrap();
        assert_eq!(result.timestamp_index, TimestampIndex::new(1));
        assert_eq!(result.time_stamp(), 200.0);
        assert!(search(&buckets, 300.0, SearchConstraint::Exact).is_none());
        assert!(search(&buckets, 150.0, SearchConstraint::Exact).is_none());
    }

    #[test]
    fn test_and_before_stops_at_earliest() {
        let buckets = [bucket(&[(100.0, Sample::Value(1.0))], 0)];
        assert!(search(&buckets, 99.0, SearchConstraint::AndBefore(1_000.0)).is_none());
        assert!(search(&buckets, 100.0, SearchConstraint::AndBefore(0.0)).is_some());
        assert!(search(&buckets, 100.5, SearchConstraint::AndBefore(0.4)).is_none());
    }

    #[test]
    fn test_empty_input() {
        let buckets: [HistoryBucket; 0] = [];
        assert!(search(&buckets, 0.0, SearchConstraint::Exact).is_none());
    }
}

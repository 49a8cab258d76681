//! Integration tests for searching samples across buckets.

use alopex_history::bucket::{find, find_decimal_value_at};
use alopex_history::search::search;
use alopex_history::{
    DecimalDataSeriesIndex, HistoryBucket, HistoryBucketDescriptor, HistoryBucketRange,
    HistoryChunkBuilder, HistoryConfiguration, Sample, SearchConstraint, TimestampIndex,
};
use std::sync::Arc;

fn bucket(range: HistoryBucketRange, rows: &[(f64, Sample<f64>)]) -> HistoryBucket {
    let mut builder = HistoryChunkBuilder::new(HistoryConfiguration::default_for(1, 0, 0));
    for (time_stamp, value) in rows {
        builder.add_decimal_values(*time_stamp, [*value]).unwrap();
    }
    let descriptor = HistoryBucketDescriptor::for_timestamp(rows[0].0, range);
    HistoryBucket::new(descriptor, builder.build().unwrap()).unwrap()
}

/// 100: 1, 200: 2, 300: NoValue, 400: 4, 500: Pending
fn single_bucket() -> Vec<HistoryBucket> {
    vec![bucket(
        HistoryBucketRange::FiveSeconds,
        &[
            (100.0, Sample::Value(1.0)),
            (200.0, Sample::Value(2.0)),
            (300.0, Sample::NoValue),
            (400.0, Sample::Value(4.0)),
            (500.0, Sample::Pending),
        ],
    )]
}

fn found_index(buckets: &[HistoryBucket], time: f64, constraint: SearchConstraint) -> Option<usize> {
    search(buckets, time, constraint).map(|result| result.timestamp_index.value())
}

// ============================================================================
// AndBefore
// ============================================================================

#[test]
fn test_and_before_single_bucket() {
    let buckets = single_bucket();

    assert_eq!(found_index(&buckets, 101.0, SearchConstraint::AndBefore(1.0)), Some(0));
    assert_eq!(found_index(&buckets, 305.0, SearchConstraint::AndBefore(4.0)), None);
    assert_eq!(found_index(&buckets, 350.0, SearchConstraint::AndBefore(70.0)), Some(2));
    assert_eq!(found_index(&buckets, 400.0, SearchConstraint::AndBefore(0.0)), Some(3));
    assert_eq!(found_index(&buckets, 50.0, SearchConstraint::AndBefore(1_000.0)), None);
}

#[test]
fn test_and_before_skips_pending() {
    let buckets = single_bucket();

    assert_eq!(found_index(&buckets, 500.0, SearchConstraint::AndBefore(99.0)), None);
    assert_eq!(found_index(&buckets, 500.0, SearchConstraint::AndBefore(100.0)), Some(3));
    assert_eq!(found_index(&buckets, 600.0, SearchConstraint::AndBefore(1_000.0)), Some(3));
}

#[test]
fn test_and_before_returns_no_value() {
    let buckets = single_bucket();
    let result = search(&buckets, 300.0, SearchConstraint::AndBefore(0.0)).unwrap();
    assert_eq!(
        result.chunk.decimal_value(DecimalDataSeriesIndex::ZERO, result.timestamp_index),
        Sample::NoValue
    );
}

#[test]
fn test_and_before_multiple_buckets() {
    let range = HistoryBucketRange::HundredMillis;
    let first = bucket(range, &[(10.0, Sample::Value(100.0)), (20.0, Sample::NoValue)]);
    let second = bucket(range, &[(320.0, Sample::Pending)]);
    let buckets = vec![first.clone(), second];

    let result = search(&buckets, 99.0, SearchConstraint::AndBefore(100.0)).unwrap();
    assert_eq!(result.timestamp_index, TimestampIndex::new(1));
    assert_eq!(result.chunk, first.chunk());

    // the previous bucket is only visited after the pending sample
    let result = search(&buckets, 330.0, SearchConstraint::AndBefore(1_000.0)).unwrap();
    assert_eq!(result.time_stamp(), 20.0);

    assert!(search(&buckets, 30.0, SearchConstraint::AndBefore(0.0)).is_none());
    assert!(search(&buckets, 330.0, SearchConstraint::AndBefore(100.0)).is_none());
}

// ============================================================================
// Exact
// ============================================================================

#[test]
fn test_exact() {
    let buckets = single_bucket();

    assert_eq!(found_index(&buckets, 200.0, SearchConstraint::Exact), Some(1));
    assert_eq!(found_index(&buckets, 300.0, SearchConstraint::Exact), Some(2));
    assert_eq!(found_index(&buckets, 500.0, SearchConstraint::Exact), None);
    assert_eq!(found_index(&buckets, 201.0, SearchConstraint::Exact), None);
}

#[test]
fn test_search_accepts_shared_buckets() {
    let buckets: Vec<Arc<HistoryBucket>> = single_bucket().into_iter().map(Arc::new).collect();
    assert_eq!(
        search(&buckets, 400.0, SearchConstraint::Exact).map(|result| result.time_stamp()),
        Some(400.0)
    );
}

// ============================================================================
// Nearest-sample lookup
// ============================================================================

#[test]
fn test_find_within_one_distance() {
    // FiveSeconds stores samples every 10 ms
    let buckets = single_bucket();
    let series = DecimalDataSeriesIndex::ZERO;

    assert_eq!(find_decimal_value_at(&buckets, series, 200.0), Sample::Value(2.0));
    assert_eq!(find_decimal_value_at(&buckets, series, 205.0), Sample::Value(2.0));
    assert_eq!(find_decimal_value_at(&buckets, series, 250.0), Sample::NoValue);
    assert!(find(&buckets, 10.0).is_none());
}

//! Property tests for descriptor navigation, merging and the history-aware reducers.

use alopex_history::model::{max_history_aware, min_history_aware};
use alopex_history::{
    DecimalDataSeriesIndex, HistoryBucketDescriptor, HistoryBucketRange, HistoryChunk,
    HistoryChunkBuilder, HistoryConfiguration, Sample, TimestampIndex,
};
use proptest::prelude::*;
use std::collections::BTreeMap;

fn range_strategy() -> impl Strategy<Value = HistoryBucketRange> {
    prop::sample::select(HistoryBucketRange::ALL.to_vec())
}

fn sample_strategy() -> impl Strategy<Value = Sample<f64>> {
    prop_oneof![
        Just(Sample::Pending),
        Just(Sample::NoValue),
        (-1_000.0f64..1_000.0).prop_map(Sample::Value),
    ]
}

/// Rows with unique, sorted timestamps.
fn rows_strategy() -> impl Strategy<Value = BTreeMap<u32, i32>> {
    prop::collection::btree_map(0u32..5_000, -100i32..100, 0..40)
}

fn chunk(rows: &BTreeMap<u32, i32>) -> HistoryChunk {
    let mut builder = HistoryChunkBuilder::new(HistoryConfiguration::default_for(1, 0, 0));
    for (time_stamp, value) in rows {
        builder
            .add_decimal_values(f64::from(*time_stamp), [f64::from(*value)])
            .unwrap();
    }
    builder.build().unwrap()
}

proptest! {
    #[test]
    fn test_descriptor_contains_timestamp(timestamp in -1_000_000_000_000i64..1_000_000_000_000, range in range_strategy()) {
        let timestamp = timestamp as f64;
        let descriptor = HistoryBucketDescriptor::for_timestamp(timestamp, range);
        prop_assert!(descriptor.contains(timestamp));
        prop_assert!(descriptor.start() <= timestamp);
        prop_assert!(timestamp < descriptor.end());
    }

    #[test]
    fn test_descriptor_navigation(index in -1_000_000i64..1_000_000, distance in 1i64..1_000, range in range_strategy()) {
        let descriptor = HistoryBucketDescriptor::for_index(index, range);
        prop_assert_eq!(descriptor.next().previous(), descriptor);
        prop_assert_eq!(descriptor.next().start(), descriptor.end());

        let later = descriptor.next_by(distance).unwrap();
        prop_assert_eq!(descriptor.distance_to(&later).unwrap(), distance);
        prop_assert_eq!(later.previous_by(distance).unwrap(), descriptor);
    }

    #[test]
    fn test_children_span_parent(index in -100i64..100, range in range_strategy()) {
        let descriptor = HistoryBucketDescriptor::for_index(index, range);
        let children = descriptor.children();
        match range.lower() {
            None => prop_assert!(children.is_empty()),
            Some(lower) => {
                prop_assert!(!children.is_empty());
                prop_assert!(children.iter().all(|child| child.bucket_range() == lower));
                prop_assert_eq!(children[0].start(), descriptor.start());
                prop_assert_eq!(children[children.len() - 1].end(), descriptor.end());
                prop_assert_eq!(children[0].parent(), Some(descriptor));
            }
        }
    }

    #[test]
    fn test_merge_is_union_other_wins(left in rows_strategy(), right in rows_strategy()) {
        let merged = chunk(&left)
            .merge(&chunk(&right), f64::NEG_INFINITY, f64::INFINITY)
            .unwrap();

        let mut expected = left.clone();
        expected.extend(right.iter().map(|(time_stamp, value)| (*time_stamp, *value)));

        match merged {
            None => prop_assert!(expected.is_empty()),
            Some(merged) => {
                let time_stamps: Vec<f64> = expected.keys().map(|time_stamp| f64::from(*time_stamp)).collect();
                prop_assert_eq!(merged.time_stamps(), time_stamps.as_slice());
                for (row, value) in expected.values().enumerate() {
                    prop_assert_eq!(
                        merged.decimal_value(DecimalDataSeriesIndex::ZERO, TimestampIndex::new(row)),
                        Sample::Value(f64::from(*value))
                    );
                }
            }
        }
    }

    #[test]
    fn test_merge_respects_half_open_bounds(left in rows_strategy(), right in rows_strategy(), start in 0u32..2_500, length in 1u32..2_500) {
        let (start, end) = (f64::from(start), f64::from(start + length));
        if let Some(merged) = chunk(&left).merge(&chunk(&right), start, end).unwrap() {
            prop_assert!(merged.time_stamps().iter().all(|time_stamp| *time_stamp >= start && *time_stamp < end));
        }
    }

    #[test]
    fn test_pending_is_absorbed(sample in sample_strategy()) {
        prop_assert_eq!(max_history_aware(Sample::Pending, sample), sample);
        prop_assert_eq!(min_history_aware(sample, Sample::Pending), sample);
    }

    #[test]
    fn test_no_value_loses_against_values(value in -1_000.0f64..1_000.0) {
        prop_assert_eq!(max_history_aware(Sample::NoValue, Sample::Value(value)), Sample::Value(value));
        prop_assert_eq!(min_history_aware(Sample::Value(value), Sample::NoValue), Sample::Value(value));
    }

    #[test]
    fn test_min_not_above_max(first in sample_strategy(), second in sample_strategy()) {
        let min = min_history_aware(first, second);
        let max = max_history_aware(first, second);
        if let (Sample::Value(min), Sample::Value(max)) = (min, max) {
            prop_assert!(min <= max);
        }
        prop_assert_eq!(min.is_pending(), first.is_pending() && second.is_pending());
    }
}

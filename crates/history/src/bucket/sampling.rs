//! Sampling periods: the fixed distances between two samples.

use crate::bucket::range::HistoryBucketRange;
use serde::{Deserialize, Serialize};

const SECOND: f64 = 1_000.0;
const MINUTE: f64 = 60.0 * SECOND;
const HOUR: f64 = 60.0 * MINUTE;
const DAY: f64 = 24.0 * HOUR;

/// Distance between two samples, from 1 ms up to 360 days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SamplingPeriod {
    /// 1 ms.
    EveryMillisecond,
    /// 10 ms.
    EveryTenMillis,
    /// 100 ms.
    EveryHundredMillis,
    /// 1 s.
    EverySecond,
    /// 10 s.
    EveryTenSeconds,
    /// 1 min.
    EveryMinute,
    /// 10 min.
    EveryTenMinutes,
    /// 1 h.
    EveryHour,
    /// 6 h.
    Every6Hours,
    /// 24 h.
    Every24Hours,
    /// 5 days.
    Every5Days,
    /// 30 days.
    Every30Days,
    /// 90 days.
    Every90Days,
    /// 360 days.
    Every360Days,
}

impl SamplingPeriod {
    /// All periods, finest first.
    pub const ALL: [SamplingPeriod; 14] = [
        SamplingPeriod::EveryMillisecond,
        SamplingPeriod::EveryTenMillis,
        SamplingPeriod::EveryHundredMillis,
        SamplingPeriod::EverySecond,
        SamplingPeriod::EveryTenSeconds,
        SamplingPeriod::EveryMinute,
        SamplingPeriod::EveryTenMinutes,
        SamplingPeriod::EveryHour,
        SamplingPeriod::Every6Hours,
        SamplingPeriod::Every24Hours,
        SamplingPeriod::Every5Days,
        SamplingPeriod::Every30Days,
        SamplingPeriod::Every90Days,
        SamplingPeriod::Every360Days,
    ];

    /// Distance between two samples in milliseconds.
    pub fn distance(self) -> f64 {
        match self {
            SamplingPeriod::EveryMillisecond => 1.0,
            SamplingPeriod::EveryTenMillis => 10.0,
            SamplingPeriod::EveryHundredMillis => 100.0,
            SamplingPeriod::EverySecond => SECOND,
            SamplingPeriod::EveryTenSeconds => 10.0 * SECOND,
            SamplingPeriod::EveryMinute => MINUTE,
            SamplingPeriod::EveryTenMinutes => 10.0 * MINUTE,
            SamplingPeriod::EveryHour => HOUR,
            SamplingPeriod::Every6Hours => 6.0 * HOUR,
            SamplingPeriod::Every24Hours => DAY,
            SamplingPeriod::Every5Days => 5.0 * DAY,
            SamplingPeriod::Every30Days => 30.0 * DAY,
            SamplingPeriod::Every90Days => 90.0 * DAY,
            SamplingPeriod::Every360Days => 360.0 * DAY,
        }
    }

    /// The bucket range storing samples of this period.
    pub const fn bucket_range(self) -> HistoryBucketRange {
        HistoryBucketRange::find(self)
    }

    /// The next coarser period, `None` for the coarsest.
    pub fn above(self) -> Option<SamplingPeriod> {
        Self::ALL.get(self as usize + 1).copied()
    }

    /// The next finer period, `None` for the finest.
    pub fn below(self) -> Option<SamplingPeriod> {
        (self as usize).checked_sub(1).map(|index| Self::ALL[index])
    }
}

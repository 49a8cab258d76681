//! Bucket ranges: the fixed resolutions of the history.
//!
//! Each range stores the samples of exactly one [`SamplingPeriod`]; its
//! duration is `entries_count * distance`. Ranges are ordered finest first
//! and every range except the extremes has one lower and one upper neighbor.

use crate::bucket::sampling::SamplingPeriod;
use crate::error::{HistoryError, Result};
use crate::storage::TimeRange;
use serde::{Deserialize, Serialize};

/// Resolution of a bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum HistoryBucketRange {
    /// 100 samples every millisecond.
    HundredMillis,
    /// 500 samples every 10 ms.
    FiveSeconds,
    /// 600 samples every 100 ms.
    OneMinute,
    /// 600 samples every second.
    TenMinutes,
    /// 360 samples every 10 s.
    OneHour,
    /// 360 samples every minute.
    SixHours,
    /// 144 samples every 10 minutes.
    OneDay,
    /// 720 samples every hour.
    ThirtyDays,
    /// 360 samples every 6 hours.
    OneQuarter,
    /// 360 samples every 24 hours.
    OneYear,
    /// 360 samples every 5 days.
    FiveYears,
    /// 360 samples every 30 days.
    ThirtyYears,
    /// 360 samples every 90 days.
    NinetyYears,
    /// 720 samples every 360 days.
    SevenHundredTwentyYears,
}

impl HistoryBucketRange {
    /// All ranges, finest first.
    pub const ALL: [HistoryBucketRange; 14] = [
        HistoryBucketRange::HundredMillis,
        HistoryBucketRange::FiveSeconds,
        HistoryBucketRange::OneMinute,
        HistoryBucketRange::TenMinutes,
        HistoryBucketRange::OneHour,
        HistoryBucketRange::SixHours,
        HistoryBucketRange::OneDay,
        HistoryBucketRange::ThirtyDays,
        HistoryBucketRange::OneQuarter,
        HistoryBucketRange::OneYear,
        HistoryBucketRange::FiveYears,
        HistoryBucketRange::ThirtyYears,
        HistoryBucketRange::NinetyYears,
        HistoryBucketRange::SevenHundredTwentyYears,
    ];

    /// The finest range.
    pub const SMALLEST: HistoryBucketRange = HistoryBucketRange::HundredMillis;

    /// The coarsest range.
    pub const GREATEST: HistoryBucketRange = HistoryBucketRange::SevenHundredTwentyYears;

    /// Returns the range storing samples of the given period.
    pub const fn find(sampling_period: SamplingPeriod) -> HistoryBucketRange {
        match sampling_period {
            SamplingPeriod::EveryMillisecond => HistoryBucketRange::HundredMillis,
            SamplingPeriod::EveryTenMillis => HistoryBucketRange::FiveSeconds,
            SamplingPeriod::EveryHundredMillis => HistoryBucketRange::OneMinute,
            SamplingPeriod::EverySecond => HistoryBucketRange::TenMinutes,
            SamplingPeriod::EveryTenSeconds => HistoryBucketRange::OneHour,
            SamplingPeriod::EveryMinute => HistoryBucketRange::SixHours,
            SamplingPeriod::EveryTenMinutes => HistoryBucketRange::OneDay,
            SamplingPeriod::EveryHour => HistoryBucketRange::ThirtyDays,
            SamplingPeriod::Every6Hours => HistoryBucketRange::OneQuarter,
            SamplingPeriod::Every24Hours => HistoryBucketRange::OneYear,
            SamplingPeriod::Every5Days => HistoryBucketRange::FiveYears,
            SamplingPeriod::Every30Days => HistoryBucketRange::ThirtyYears,
            SamplingPeriod::Every90Days => HistoryBucketRange::NinetyYears,
            SamplingPeriod::Every360Days => HistoryBucketRange::SevenHundredTwentyYears,
        }
    }

    /// The sampling period of the samples in this range.
    pub const fn sampling_period(self) -> SamplingPeriod {
        SamplingPeriod::ALL[self as usize]
    }

    /// Number of samples a bucket of this range holds at its natural period.
    pub const fn entries_count(self) -> u32 {
        match self {
            HistoryBucketRange::HundredMillis => 100,
            HistoryBucketRange::FiveSeconds => 500,
            HistoryBucketRange::OneMinute => 600,
            HistoryBucketRange::TenMinutes => 600,
            HistoryBucketRange::OneHour => 360,
            HistoryBucketRange::SixHours => 360,
            HistoryBucketRange::OneDay => 6 * 24,
            HistoryBucketRange::ThirtyDays => 24 * 30,
            HistoryBucketRange::OneQuarter => 4 * 90,
            HistoryBucketRange::OneYear => 360,
            HistoryBucketRange::FiveYears => 72 * 5,
            HistoryBucketRange::ThirtyYears => 12 * 30,
            HistoryBucketRange::NinetyYears => 4 * 90,
            HistoryBucketRange::SevenHundredTwentyYears => 720,
        }
    }

    /// Distance between two samples (ms).
    pub fn distance(self) -> f64 {
        self.sampling_period().distance()
    }

    /// Duration of one bucket (ms).
    pub fn duration(self) -> f64 {
        self.distance() * self.entries_count() as f64
    }

    /// Index of the bucket containing the timestamp.
    pub fn calculate_index(self, timestamp: f64) -> i64 {
        (timestamp / self.duration()).floor() as i64
    }

    /// Start of the bucket containing the timestamp.
    pub fn calculate_start(self, timestamp: f64) -> f64 {
        self.calculate_start_for_index(self.calculate_index(timestamp))
    }

    /// End (exclusive) of the bucket containing the timestamp.
    pub fn calculate_end(self, timestamp: f64) -> f64 {
        self.calculate_end_for_index(self.calculate_index(timestamp))
    }

    /// Start (inclusive) of the bucket with the given index.
    pub fn calculate_start_for_index(self, index: i64) -> f64 {
        index as f64 * self.duration()
    }

    /// End (exclusive) of the bucket with the given index.
    pub fn calculate_end_for_index(self, index: i64) -> f64 {
        (index + 1) as f64 * self.duration()
    }

    /// Time range of the bucket containing the timestamp.
    pub fn calculate_time_range(self, timestamp: f64) -> TimeRange {
        let start = self.calculate_start(timestamp);
        TimeRange::new(start, start + self.duration())
    }

    /// Snaps a start that drifted by less than a quarter duration back onto
    /// the exact bucket start.
    pub fn round_start(self, start: f64) -> f64 {
        self.calculate_start(start + self.duration() / 4.0)
    }

    /// The next finer range, `None` for [`Self::SMALLEST`].
    pub fn lower(self) -> Option<HistoryBucketRange> {
        (self as usize).checked_sub(1).map(|index| Self::ALL[index])
    }

    /// The next coarser range, `None` for [`Self::GREATEST`].
    pub fn upper(self) -> Option<HistoryBucketRange> {
        Self::ALL.get(self as usize + 1).copied()
    }

    /// Number of lower-range samples aggregated into one sample of this range.
    pub fn down_sampling_factor(self) -> Result<u32> {
        let lower = self.lower().ok_or(HistoryError::NoLowerRange(self))?;
        Ok((self.distance() / lower.distance()).round() as u32)
    }
}

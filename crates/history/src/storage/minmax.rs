//! Min/max aggregation over stored buckets.

use crate::bucket::HistoryBucket;
use crate::error::{HistoryError, Result};
use crate::model::{max_history_aware, min_history_aware, DecimalDataSeriesIndex, Sample, TimestampIndex};
use crate::storage::TimeRange;
use std::borrow::Borrow;

/// Min and max of a set of decimal series within a time window.
///
/// A series without a concrete value in the window has neither min nor max.
#[derive(Debug, Clone, PartialEq)]
pub struct MinMaxValues {
    series: Vec<DecimalDataSeriesIndex>,
    min: Vec<Option<f64>>,
    max: Vec<Option<f64>>,
}

impl MinMaxValues {
    /// Folds the decimal min/max cells of every sample with
    /// `time_range.start <= timestamp <= time_range.end`.
    ///
    /// Measured chunks contribute their values, calculated chunks their
    /// min/max aggregates. Pending and NoValue cells are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`HistoryError::SeriesIndexOutOfRange`] if a series index is
    /// not below the decimal series count of one of the buckets.
    pub fn compute<B: Borrow<HistoryBucket>>(
        buckets: &[B],
        time_range: &TimeRange,
        series: &[DecimalDataSeriesIndex],
    ) -> Result<Self> {
        let mut min = vec![Sample::Pending; series.len()];
        let mut max = vec![Sample::Pending; series.len()];

        for bucket in buckets {
            let chunk = bucket.borrow().chunk();
            let count = chunk.decimal_data_series_count();
            if let Some(invalid) = series.iter().find(|series_index| series_index.as_usize() >= count) {
                return Err(HistoryError::SeriesIndexOutOfRange {
                    index: invalid.as_usize(),
                    count,
                });
            }
            for (row, &time_stamp) in chunk.time_stamps().iter().enumerate() {
                if time_stamp < time_range.start || time_stamp > time_range.end {
                    continue;
                }
                let index = TimestampIndex::new(row);
                for (slot, &series_index) in series.iter().enumerate() {
                    min[slot] = min_history_aware(min[slot], chunk.decimal_min(series_index, index));
                    max[slot] = max_history_aware(max[slot], chunk.decimal_max(series_index, index));
                }
            }
        }

        Ok(Self {
            series: series.to_vec(),
            min: min.into_iter().map(Sample::value).collect(),
            max: max.into_iter().map(Sample::value).collect(),
        })
    }

    /// The queried series, in query order.
    pub fn series(&self) -> &[DecimalDataSeriesIndex] {
        &self.series
    }

    /// Min of the series, `None` if it was not queried or has no value.
    pub fn min(&self, series: DecimalDataSeriesIndex) -> Option<f64> {
        self.slot(series).and_then(|slot| self.min[slot])
    }

    /// Max of the series, `None` if it was not queried or has no value.
    pub fn max(&self, series: DecimalDataSeriesIndex) -> Option<f64> {
        self.slot(series).and_then(|slot| self.max[slot])
    }

    fn slot(&self, series: DecimalDataSeriesIndex) -> Option<usize> {
        self.series.iter().position(|candidate| *candidate == series)
    }
}

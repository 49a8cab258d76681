//! The columnar chunk: timestamps plus one value matrix per series kind.

use crate::bucket::{HistoryBucket, HistoryBucketDescriptor, SamplingPeriod};
use crate::chunk::values::{ColumnsBuilder, HistoryValues};
use crate::error::{HistoryError, Result};
use crate::model::sentinel::decode_decimal;
use crate::model::{
    DecimalDataSeriesIndex, EnumDataSeriesIndex, HistoryConfiguration, HistoryEnumOrdinal,
    HistoryEnumSet, ReferenceEntriesDataMap, ReferenceEntryData, ReferenceEntryDataSeriesIndex,
    ReferenceEntryId, ReferenceEntryIdsCount, Sample, Sentinel, TimestampIndex,
};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Write as _};
use std::sync::Arc;

/// Origin of the samples of a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordingType {
    /// Raw input. No aggregate columns.
    Measured,
    /// Produced by down-sampling. Carries min/max, most-of-the-time and
    /// different-ids-count columns.
    Calculated,
}

/// Result of [`HistoryChunk::best_timestamp_index_for`].
///
/// Follows the binary search convention: a non-negative raw value is a
/// direct hit, a negative one is `-(insertion point) - 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BestTimestampIndex {
    raw: isize,
}

impl BestTimestampIndex {
    fn from_search(result: std::result::Result<usize, usize>) -> Self {
        let raw = match result {
            Ok(index) => index as isize,
            Err(insertion) => -(insertion as isize) - 1,
        };
        Self { raw }
    }

    /// The raw search result.
    pub fn raw(self) -> isize {
        self.raw
    }

    /// Returns true on an exact timestamp match.
    pub fn is_found(self) -> bool {
        self.raw >= 0
    }

    /// The index of the exact match, if any.
    pub fn found(self) -> Option<TimestampIndex> {
        self.is_found().then(|| TimestampIndex::new(self.raw as usize))
    }

    /// The index of the match, or the insertion point otherwise.
    pub fn near_index(self) -> usize {
        if self.raw >= 0 {
            self.raw as usize
        } else {
            (-(self.raw + 1)) as usize
        }
    }
}

/// Timestamps and values of a history.
///
/// Chunks are immutable. Every modifying operation returns a new chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryChunk {
    configuration: Arc<HistoryConfiguration>,
    time_stamps: Vec<f64>,
    values: HistoryValues,
    recording_type: RecordingType,
}

impl HistoryChunk {
    /// Creates a chunk and validates it.
    ///
    /// Timestamps must be strictly ascending and every matrix must have one
    /// row per timestamp and one column per configured series. Aggregate
    /// columns must be present exactly for calculated chunks.
    pub fn new(
        configuration: Arc<HistoryConfiguration>,
        time_stamps: Vec<f64>,
        values: HistoryValues,
        recording_type: RecordingType,
    ) -> Result<Self> {
        for (index, pair) in time_stamps.windows(2).enumerate() {
            // also catches NaN
            if !(pair[1] > pair[0]) {
                return Err(HistoryError::UnsortedTimestamps {
                    index: index + 1,
                    previous: pair[0],
                    current: pair[1],
                });
            }
        }

        values.check_dimensions(
            configuration.decimal_data_series_count(),
            configuration.enum_data_series_count(),
            configuration.reference_entry_data_series_count(),
            time_stamps.len(),
        )?;

        let consistent = match recording_type {
            RecordingType::Measured => !values.has_aggregates(),
            RecordingType::Calculated => values.has_all_aggregates(),
        };
        if !consistent {
            return Err(HistoryError::MissingAggregates(recording_type));
        }

        Ok(Self {
            configuration,
            time_stamps,
            values,
            recording_type,
        })
    }

    /// Builds a chunk from assembled columns. The columns are consistent by construction.
    pub(crate) fn from_columns(
        configuration: Arc<HistoryConfiguration>,
        recording_type: RecordingType,
        columns: ColumnsBuilder,
        data_map: Arc<ReferenceEntriesDataMap>,
    ) -> Result<Self> {
        let (time_stamps, values) = columns.finish(data_map);
        Self::new(configuration, time_stamps, values, recording_type)
    }

    pub(crate) fn columns(&self, capacity: usize) -> ColumnsBuilder {
        ColumnsBuilder::new(
            self.decimal_data_series_count(),
            self.enum_data_series_count(),
            self.reference_entry_data_series_count(),
            self.recording_type == RecordingType::Calculated,
            capacity,
        )
    }

    /// The series configuration.
    pub fn configuration(&self) -> &Arc<HistoryConfiguration> {
        &self.configuration
    }

    /// All columns.
    pub fn values(&self) -> &HistoryValues {
        &self.values
    }

    /// Measured or calculated.
    pub fn recording_type(&self) -> RecordingType {
        self.recording_type
    }

    /// Number of decimal series.
    pub fn decimal_data_series_count(&self) -> usize {
        self.configuration.decimal_data_series_count()
    }

    /// Number of enum series.
    pub fn enum_data_series_count(&self) -> usize {
        self.configuration.enum_data_series_count()
    }

    /// Number of reference-entry series.
    pub fn reference_entry_data_series_count(&self) -> usize {
        self.configuration.reference_entry_data_series_count()
    }

    /// Number of series of all kinds.
    pub fn total_data_series_count(&self) -> usize {
        self.configuration.total_data_series_count()
    }

    /// The ascending timestamps.
    pub fn time_stamps(&self) -> &[f64] {
        &self.time_stamps
    }

    /// Number of timestamps.
    pub fn time_stamps_count(&self) -> usize {
        self.time_stamps.len()
    }

    /// Returns true if the chunk holds no timestamps.
    pub fn is_empty(&self) -> bool {
        self.time_stamps.is_empty()
    }

    /// The first timestamp, `None` if empty.
    pub fn first_time_stamp(&self) -> Option<f64> {
        self.time_stamps.first().copied()
    }

    /// The last timestamp, `None` if empty.
    pub fn last_time_stamp(&self) -> Option<f64> {
        self.time_stamps.last().copied()
    }

    /// The timestamp at the index.
    ///
    /// # Panics
    ///
    /// Panics if the index is out of range.
    pub fn time_stamp(&self, index: TimestampIndex) -> f64 {
        self.time_stamps[index.as_usize()]
    }

    /// The timestamp a sample is associated with.
    ///
    /// For measured chunks this is the exact measurement time, for
    /// calculated chunks the center of the aggregated interval.
    pub fn timestamp_center(&self, index: TimestampIndex) -> f64 {
        self.time_stamp(index)
    }

    /// Start of the interval a sample covers.
    pub fn timestamp_start(&self, index: TimestampIndex, sampling_period: SamplingPeriod) -> f64 {
        match self.recording_type {
            RecordingType::Measured => self.timestamp_center(index),
            RecordingType::Calculated => self.timestamp_center(index) - sampling_period.distance() / 2.0,
        }
    }

    /// End of the interval a sample covers.
    pub fn timestamp_end(&self, index: TimestampIndex, sampling_period: SamplingPeriod) -> f64 {
        match self.recording_type {
            RecordingType::Measured => self.timestamp_center(index) + sampling_period.distance(),
            RecordingType::Calculated => self.timestamp_center(index) + sampling_period.distance() / 2.0,
        }
    }

    /// Binary search for the timestamp.
    pub fn best_timestamp_index_for(&self, time_stamp: f64) -> BestTimestampIndex {
        BestTimestampIndex::from_search(
            self.time_stamps
                .binary_search_by(|probe| probe.total_cmp(&time_stamp)),
        )
    }

    /// Returns true if the row is pending.
    ///
    /// Checks the first decimal series, then the first enum series, then the
    /// first reference-entry series. A chunk without series is never pending.
    pub fn is_pending(&self, index: TimestampIndex) -> bool {
        if self.decimal_data_series_count() > 0 {
            return self.decimal_value(DecimalDataSeriesIndex::ZERO, index).is_pending();
        }
        if self.enum_data_series_count() > 0 {
            return self.enum_value(EnumDataSeriesIndex::ZERO, index).is_pending();
        }
        if self.reference_entry_data_series_count() > 0 {
            return self
                .reference_entry_id(ReferenceEntryDataSeriesIndex::ZERO, index)
                .is_pending();
        }
        false
    }

    /// The decimal value.
    ///
    /// # Panics
    ///
    /// Panics if an index is out of range.
    pub fn decimal_value(&self, series: DecimalDataSeriesIndex, index: TimestampIndex) -> Sample<f64> {
        decode_decimal(
            self.values
                .decimal_history_values
                .values
                .get(series.as_usize(), index.as_usize()),
        )
    }

    /// The minimum of the aggregated interval. Measured chunks return the value.
    pub fn decimal_min(&self, series: DecimalDataSeriesIndex, index: TimestampIndex) -> Sample<f64> {
        match &self.values.decimal_history_values.min {
            Some(min) => decode_decimal(min.get(series.as_usize(), index.as_usize())),
            None => self.decimal_value(series, index),
        }
    }

    /// The maximum of the aggregated interval. Measured chunks return the value.
    pub fn decimal_max(&self, series: DecimalDataSeriesIndex, index: TimestampIndex) -> Sample<f64> {
        match &self.values.decimal_history_values.max {
            Some(max) => decode_decimal(max.get(series.as_usize(), index.as_usize())),
            None => self.decimal_value(series, index),
        }
    }

    /// Returns true if min/max columns are present.
    pub fn has_decimal_min_max_values(&self) -> bool {
        self.values.decimal_history_values.min.is_some() && self.values.decimal_history_values.max.is_some()
    }

    /// The enum bitset.
    pub fn enum_value(&self, series: EnumDataSeriesIndex, index: TimestampIndex) -> HistoryEnumSet {
        self.values
            .enum_history_values
            .values
            .get(series.as_usize(), index.as_usize())
    }

    /// The ordinal active for the longest time.
    ///
    /// Measured chunks return the lowest set ordinal of the bitset.
    pub fn enum_ordinal_most_time(&self, series: EnumDataSeriesIndex, index: TimestampIndex) -> HistoryEnumOrdinal {
        match &self.values.enum_history_values.most_of_the_time {
            Some(most_of_the_time) => most_of_the_time.get(series.as_usize(), index.as_usize()),
            None => self.enum_value(series, index).first_set_ordinal(),
        }
    }

    /// The reference-entry id.
    pub fn reference_entry_id(&self, series: ReferenceEntryDataSeriesIndex, index: TimestampIndex) -> ReferenceEntryId {
        self.values
            .reference_entry_history_values
            .ids
            .get(series.as_usize(), index.as_usize())
    }

    /// Number of different ids. Measured chunks report one (or the sentinel of the id).
    pub fn reference_entry_ids_count(
        &self,
        series: ReferenceEntryDataSeriesIndex,
        index: TimestampIndex,
    ) -> ReferenceEntryIdsCount {
        match &self.values.reference_entry_history_values.different_ids_count {
            Some(counts) => counts.get(series.as_usize(), index.as_usize()),
            None => match self.reference_entry_id(series, index).to_sample() {
                Sample::Pending => ReferenceEntryIdsCount::PENDING,
                Sample::NoValue => ReferenceEntryIdsCount::NO_VALUE,
                Sample::Value(_) => ReferenceEntryIdsCount::ONE,
            },
        }
    }

    /// The status bitset of a reference-entry cell.
    pub fn reference_entry_status(
        &self,
        series: ReferenceEntryDataSeriesIndex,
        index: TimestampIndex,
    ) -> HistoryEnumSet {
        self.values
            .reference_entry_history_values
            .statuses
            .get(series.as_usize(), index.as_usize())
    }

    /// The map resolving reference-entry ids.
    pub fn reference_entries_data_map(&self) -> &Arc<ReferenceEntriesDataMap> {
        &self.values.reference_entry_history_values.data_map
    }

    /// Resolves a reference-entry id.
    pub fn reference_entry_data(&self, id: ReferenceEntryId) -> Option<ReferenceEntryData> {
        self.reference_entries_data_map().get(id)
    }

    /// Returns true if any timestamp lies in `[start, end)`.
    pub fn contains_any(&self, start: f64, end: f64) -> bool {
        match (self.first_time_stamp(), self.last_time_stamp()) {
            (Some(first), Some(last)) => start < end && start <= last && end > first,
            _ => false,
        }
    }

    /// Returns the rows with timestamps in `[from, to]` (both inclusive).
    ///
    /// `None` if no timestamp lies in the range.
    pub fn range(&self, from: f64, to: f64) -> Option<HistoryChunk> {
        let (first, last) = (self.first_time_stamp()?, self.last_time_stamp()?);
        if from > last || to < first || from > to {
            return None;
        }
        if from <= first && to >= last {
            return Some(self.clone());
        }

        let start = self.best_timestamp_index_for(from).near_index();
        let end = {
            let best = self.best_timestamp_index_for(to);
            if best.is_found() {
                best.near_index() + 1
            } else {
                best.near_index()
            }
        };
        self.rows(start, end)
    }

    /// Returns the rows with timestamps in `[start, end)`.
    pub(crate) fn slice(&self, start: f64, end: f64) -> Option<HistoryChunk> {
        let (first, last) = (self.first_time_stamp()?, self.last_time_stamp()?);
        if start <= first && end > last {
            return Some(self.clone());
        }
        let (from, to) = self.index_span(start, end);
        self.rows(from, to)
    }

    /// Index span `[from, to)` of the timestamps in `[start, end)`.
    pub(crate) fn index_span(&self, start: f64, end: f64) -> (usize, usize) {
        let from = self.best_timestamp_index_for(start).near_index();
        let to = self.best_timestamp_index_for(end).near_index();
        (from, to.max(from))
    }

    fn rows(&self, from: usize, to: usize) -> Option<HistoryChunk> {
        if from >= to {
            return None;
        }
        let mut columns = self.columns(to - from);
        for row in from..to {
            // same layout, cannot fail
            columns.push_row_from(self.time_stamps[row], &self.values, row).ok()?;
        }
        Self::from_columns(
            Arc::clone(&self.configuration),
            self.recording_type,
            columns,
            Arc::clone(self.reference_entries_data_map()),
        )
        .ok()
    }

    /// A chunk with the same configuration and recording type but no rows.
    pub fn without_values(&self) -> HistoryChunk {
        let columns = self.columns(0);
        let (time_stamps, values) = columns.finish(Arc::new(ReferenceEntriesDataMap::Empty));
        HistoryChunk {
            configuration: Arc::clone(&self.configuration),
            time_stamps,
            values,
            recording_type: self.recording_type,
        }
    }

    /// Wraps the chunk into a bucket.
    pub fn to_bucket(self, descriptor: HistoryBucketDescriptor) -> Result<HistoryBucket> {
        HistoryBucket::new(descriptor, self)
    }

    /// The decimal values, one line per timestamp.
    ///
    /// Pending cells print as `?`, NoValue cells as `-`.
    pub fn decimal_values_as_matrix_string(&self) -> String {
        let mut out = String::new();
        for row in 0..self.time_stamps_count() {
            let line = (0..self.decimal_data_series_count())
                .map(|series| {
                    format_decimal(self.decimal_value(DecimalDataSeriesIndex::new(series), TimestampIndex::new(row)))
                })
                .collect::<Vec<_>>()
                .join(", ");
            out.push_str(&line);
            out.push('\n');
        }
        out
    }

    /// Verbose table of all rows with timestamps in `[from, to]`.
    pub fn dump(&self, from: Option<f64>, to: Option<f64>) -> String {
        let mut out = String::new();
        // writing into a String never fails
        let _ = writeln!(out, "Start: {:?}", self.first_time_stamp());
        let _ = writeln!(out, "End:   {:?}", self.last_time_stamp());
        let _ = writeln!(out, "Series counts:");
        let _ = writeln!(out, "  Decimals: {}", self.decimal_data_series_count());
        let _ = writeln!(out, "  Enums:    {}", self.enum_data_series_count());
        let _ = writeln!(out, "  RefId:    {}", self.reference_entry_data_series_count());
        let _ = writeln!(out, "RecordingType: {:?}", self.recording_type);
        let _ = writeln!(out, "---------------------------------------");

        for (row, time_stamp) in self.time_stamps.iter().enumerate() {
            if from.is_some_and(|from| *time_stamp < from) || to.is_some_and(|to| *time_stamp > to) {
                continue;
            }
            let index = TimestampIndex::new(row);
            let _ = write!(out, "{:>4} {:>16}", row, time_stamp);
            for series in 0..self.decimal_data_series_count() {
                let series = DecimalDataSeriesIndex::new(series);
                let _ = write!(out, " {:>8}", format_decimal(self.decimal_value(series, index)));
            }
            out.push_str(" |");
            for series in 0..self.enum_data_series_count() {
                let series = EnumDataSeriesIndex::new(series);
                let _ = write!(
                    out,
                    " {:?}/{:?}",
                    self.enum_value(series, index),
                    self.enum_ordinal_most_time(series, index)
                );
            }
            out.push_str(" |");
            for series in 0..self.reference_entry_data_series_count() {
                let series = ReferenceEntryDataSeriesIndex::new(series);
                let _ = write!(
                    out,
                    " {}/{}/{:?}",
                    self.reference_entry_id(series, index).value(),
                    self.reference_entry_ids_count(series, index).value(),
                    self.reference_entry_status(series, index)
                );
            }
            out.push('\n');
        }
        out
    }
}

fn format_decimal(sample: Sample<f64>) -> String {
    match sample {
        Sample::Pending => "?".to_string(),
        Sample::NoValue => "-".to_string(),
        Sample::Value(value) => format!("{:?}", value),
    }
}

impl fmt::Display for HistoryChunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.first_time_stamp(), self.last_time_stamp()) {
            (Some(first), Some(last)) => write!(
                f,
                "HistoryChunk({} - {}, time stamps: {}, total data series: {})",
                first,
                last,
                self.time_stamps_count(),
                self.total_data_series_count()
            ),
            _ => write!(
                f,
                "HistoryChunk(time stamps: 0, total data series: {})",
                self.total_data_series_count()
            ),
        }
    }
}

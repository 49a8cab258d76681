//! Combining chunks: merge, append and single-row inserts.

use crate::chunk::history_chunk::{HistoryChunk, RecordingType};
use crate::chunk::values::ColumnsBuilder;
use crate::error::{HistoryError, Result};
use crate::model::{
    HistoryEnumSet, ReferenceEntriesDataMap, ReferenceEntryData, ReferenceEntryId, Sample,
};
use std::sync::Arc;
use tracing::debug;

/// One measured row for [`HistoryChunk::with_added_values`].
#[derive(Debug, Clone, Default)]
pub struct MeasuredRow {
    /// One sample per decimal series.
    pub decimal_values: Vec<Sample<f64>>,
    /// One bitset per enum series.
    pub enum_values: Vec<HistoryEnumSet>,
    /// One id per reference-entry series.
    pub reference_entry_ids: Vec<ReferenceEntryId>,
    /// One status per reference-entry series.
    pub reference_entry_statuses: Vec<HistoryEnumSet>,
    /// Data for the ids of this row.
    pub reference_entry_data: Vec<ReferenceEntryData>,
}

impl HistoryChunk {
    /// Merges `other` into this chunk, keeping only timestamps in `[start, end)`.
    ///
    /// The timestamps of the result are the ascending union of both chunks.
    /// On an exact timestamp collision the row of `other` wins. Returns
    /// `None` if no timestamp of either chunk lies in the bounds.
    pub fn merge(&self, other: &HistoryChunk, start: f64, end: f64) -> Result<Option<HistoryChunk>> {
        if !(start < end) {
            return Err(HistoryError::InvalidBounds { start, end });
        }
        self.check_compatible(other)?;
        debug!("merge {} with {} in [{}, {})", self, other, start, end);

        if other.is_empty() || !other.contains_any(start, end) {
            return Ok(self.slice(start, end));
        }
        if self.is_empty() || !self.contains_any(start, end) {
            return Ok(other.slice(start, end));
        }
        if let (Some(last), Some(first)) = (self.last_time_stamp(), other.first_time_stamp()) {
            if last < first {
                return self.append(other, start, end);
            }
        }
        if let (Some(last), Some(first)) = (other.last_time_stamp(), self.first_time_stamp()) {
            if last < first {
                return other.append(self, start, end);
            }
        }

        let (mut mine, mine_end) = self.index_span(start, end);
        let (mut theirs, theirs_end) = other.index_span(start, end);
        let mut columns = self.columns((mine_end - mine) + (theirs_end - theirs));

        while mine < mine_end || theirs < theirs_end {
            let my_time = (mine < mine_end).then(|| self.time_stamps()[mine]);
            let their_time = (theirs < theirs_end).then(|| other.time_stamps()[theirs]);

            match (my_time, their_time) {
                (Some(my_time), Some(their_time)) if my_time == their_time => {
                    columns.push_row_from(their_time, other.values(), theirs)?;
                    mine += 1;
                    theirs += 1;
                }
                (Some(my_time), Some(their_time)) if my_time < their_time => {
                    columns.push_row_from(my_time, self.values(), mine)?;
                    mine += 1;
                }
                (_, Some(their_time)) => {
                    columns.push_row_from(their_time, other.values(), theirs)?;
                    theirs += 1;
                }
                (Some(my_time), None) => {
                    columns.push_row_from(my_time, self.values(), mine)?;
                    mine += 1;
                }
                (None, None) => break,
            }
        }

        if columns.len() == 0 {
            return Ok(None);
        }
        let data_map = self.merged_data_map(other);
        HistoryChunk::from_columns(
            Arc::clone(other.configuration()),
            self.recording_type(),
            columns,
            data_map,
        )
        .map(Some)
    }

    /// Appends `other`, which must start after the last timestamp of this chunk.
    ///
    /// Keeps only timestamps in `[start, end)`. Returns `None` if nothing remains.
    pub fn append(&self, other: &HistoryChunk, start: f64, end: f64) -> Result<Option<HistoryChunk>> {
        if !(start < end) {
            return Err(HistoryError::InvalidBounds { start, end });
        }
        self.check_compatible(other)?;
        if let (Some(last), Some(first)) = (self.last_time_stamp(), other.first_time_stamp()) {
            if !(first > last) {
                return Err(HistoryError::UnsortedTimestamps {
                    index: self.time_stamps_count(),
                    previous: last,
                    current: first,
                });
            }
        }

        let (mine, mine_end) = self.index_span(start, end);
        let (theirs, theirs_end) = other.index_span(start, end);
        if theirs == theirs_end {
            return Ok(self.slice(start, end));
        }

        let mut columns = self.columns((mine_end - mine) + (theirs_end - theirs));
        for row in mine..mine_end {
            columns.push_row_from(self.time_stamps()[row], self.values(), row)?;
        }
        for row in theirs..theirs_end {
            columns.push_row_from(other.time_stamps()[row], other.values(), row)?;
        }

        let data_map = self.merged_data_map(other);
        HistoryChunk::from_columns(
            Arc::clone(other.configuration()),
            self.recording_type(),
            columns,
            data_map,
        )
        .map(Some)
    }

    /// Inserts one measured row.
    ///
    /// A row with the same timestamp is replaced.
    pub fn with_added_values(&self, time_stamp: f64, row: MeasuredRow) -> Result<HistoryChunk> {
        if self.recording_type() != RecordingType::Measured {
            return Err(HistoryError::RecordingTypeMismatch {
                expected: RecordingType::Measured,
                actual: self.recording_type(),
            });
        }

        let mut single = ColumnsBuilder::new(
            self.decimal_data_series_count(),
            self.enum_data_series_count(),
            self.reference_entry_data_series_count(),
            false,
            1,
        );
        single.time_stamps.push(time_stamp);
        single.decimal.push_samples("decimal values", row.decimal_values)?;
        single.enums.push_row("enum values", &row.enum_values)?;
        single
            .reference_ids
            .push_row("reference entry ids", &row.reference_entry_ids)?;
        single
            .reference_statuses
            .push_row("reference entry statuses", &row.reference_entry_statuses)?;

        let data_map = if row.reference_entry_data.is_empty() {
            Arc::clone(self.reference_entries_data_map())
        } else {
            let added = row
                .reference_entry_data
                .into_iter()
                .fold(ReferenceEntriesDataMap::builder(), |builder, data| builder.add(data))
                .build();
            Arc::new(self.reference_entries_data_map().merge(&added))
        };
        let (_, single_values) = single.finish(Arc::clone(&data_map));

        let insert_at = self.best_timestamp_index_for(time_stamp);
        let mut columns = self.columns(self.time_stamps_count() + 1);
        for index in 0..insert_at.near_index() {
            columns.push_row_from(self.time_stamps()[index], self.values(), index)?;
        }
        columns.push_row_from(time_stamp, &single_values, 0)?;
        let resume = insert_at.near_index() + usize::from(insert_at.is_found());
        for index in resume..self.time_stamps_count() {
            columns.push_row_from(self.time_stamps()[index], self.values(), index)?;
        }

        HistoryChunk::from_columns(Arc::clone(self.configuration()), self.recording_type(), columns, data_map)
    }

    fn check_compatible(&self, other: &HistoryChunk) -> Result<()> {
        if self.configuration() != other.configuration() {
            return Err(HistoryError::ConfigurationMismatch(format!(
                "{} vs {} series",
                self.total_data_series_count(),
                other.total_data_series_count()
            )));
        }
        if self.recording_type() != other.recording_type() {
            return Err(HistoryError::RecordingTypeMismatch {
                expected: self.recording_type(),
                actual: other.recording_type(),
            });
        }
        Ok(())
    }

    fn merged_data_map(&self, other: &HistoryChunk) -> Arc<ReferenceEntriesDataMap> {
        let mine = self.reference_entries_data_map();
        let theirs = other.reference_entries_data_map();
        if Arc::ptr_eq(mine, theirs) || mine == theirs {
            return Arc::clone(theirs);
        }
        Arc::new(mine.merge(theirs))
    }
}

//! Row-wise construction of chunks.
//!
//! # Example
//!
//! ```rust,ignore
//! use alopex_history::{HistoryChunkBuilder, HistoryConfiguration};
//!
//! let mut builder = HistoryChunkBuilder::new(HistoryConfiguration::default_for(2, 0, 0));
//! builder.add_decimal_values(1_000.0, [31.0, 10.0])?;
//! builder.add_decimal_values(1_010.0, [32.0, 11.0])?;
//! let chunk = builder.build()?;
//! ```

use crate::chunk::history_chunk::{HistoryChunk, RecordingType};
use crate::chunk::values::ColumnsBuilder;
use crate::error::{HistoryError, Result};
use crate::model::{
    HistoryConfiguration, HistoryEnumOrdinal, HistoryEnumSet, ReferenceEntriesDataMap,
    ReferenceEntryId, ReferenceEntryIdsCount, Sample, Sentinel,
};
use std::sync::Arc;

/// One calculated row for [`HistoryChunkBuilder::add_calculated_values`].
#[derive(Debug, Clone, Default)]
pub struct CalculatedRow {
    /// Average per decimal series.
    pub decimal_values: Vec<Sample<f64>>,
    /// Minimum per decimal series.
    pub decimal_min: Vec<Sample<f64>>,
    /// Maximum per decimal series.
    pub decimal_max: Vec<Sample<f64>>,
    /// Union of the bitsets per enum series.
    pub enum_values: Vec<HistoryEnumSet>,
    /// Ordinal active for the longest time per enum series.
    pub enum_most_of_the_time: Vec<HistoryEnumOrdinal>,
    /// Most-of-the-time id per reference-entry series.
    pub reference_entry_ids: Vec<ReferenceEntryId>,
    /// Different ids per reference-entry series.
    pub reference_entry_ids_count: Vec<ReferenceEntryIdsCount>,
    /// Union of the statuses per reference-entry series.
    pub reference_entry_statuses: Vec<HistoryEnumSet>,
}

/// Builds a [`HistoryChunk`] one timestamp at a time.
///
/// Timestamps must be added in strictly ascending order. Cells that are not
/// provided are filled with Pending.
#[derive(Debug)]
pub struct HistoryChunkBuilder {
    configuration: Arc<HistoryConfiguration>,
    recording_type: RecordingType,
    columns: ColumnsBuilder,
    data_map: ReferenceEntriesDataMap,
}

impl HistoryChunkBuilder {
    /// Builder for a measured chunk.
    pub fn new(configuration: Arc<HistoryConfiguration>) -> Self {
        Self::with_recording_type(configuration, RecordingType::Measured)
    }

    /// Builder for a calculated chunk.
    pub fn calculated(configuration: Arc<HistoryConfiguration>) -> Self {
        Self::with_recording_type(configuration, RecordingType::Calculated)
    }

    fn with_recording_type(configuration: Arc<HistoryConfiguration>, recording_type: RecordingType) -> Self {
        let columns = ColumnsBuilder::new(
            configuration.decimal_data_series_count(),
            configuration.enum_data_series_count(),
            configuration.reference_entry_data_series_count(),
            recording_type == RecordingType::Calculated,
            16,
        );
        Self {
            configuration,
            recording_type,
            columns,
            data_map: ReferenceEntriesDataMap::Empty,
        }
    }

    /// Sets the map resolving reference-entry ids.
    pub fn with_data_map(mut self, data_map: ReferenceEntriesDataMap) -> Self {
        self.data_map = data_map;
        self
    }

    /// Number of rows added so far.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Returns true if no row was added yet.
    pub fn is_empty(&self) -> bool {
        self.columns.len() == 0
    }

    /// Adds decimal values. Enum and reference-entry cells are Pending.
    pub fn add_decimal_values<I>(&mut self, time_stamp: f64, decimal_values: I) -> Result<()>
    where
        I: IntoIterator,
        I::Item: Into<Sample<f64>>,
    {
        let enums = self.pending(self.configuration.enum_data_series_count());
        let references = self.pending(self.configuration.reference_entry_data_series_count());
        let statuses = self.pending(self.configuration.reference_entry_data_series_count());
        self.add_values_with_statuses(time_stamp, decimal_values, enums, references, statuses)
    }

    /// Adds one measured row without reference-entry statuses.
    pub fn add_values<I, E, R>(&mut self, time_stamp: f64, decimal_values: I, enum_values: E, reference_entry_ids: R) -> Result<()>
    where
        I: IntoIterator,
        I::Item: Into<Sample<f64>>,
        E: IntoIterator<Item = HistoryEnumSet>,
        R: IntoIterator<Item = ReferenceEntryId>,
    {
        let statuses = vec![HistoryEnumSet::NO_VALUE; self.configuration.reference_entry_data_series_count()];
        self.add_values_with_statuses(time_stamp, decimal_values, enum_values, reference_entry_ids, statuses)
    }

    /// Adds one measured row.
    pub fn add_values_with_statuses<I, E, R, S>(
        &mut self,
        time_stamp: f64,
        decimal_values: I,
        enum_values: E,
        reference_entry_ids: R,
        reference_entry_statuses: S,
    ) -> Result<()>
    where
        I: IntoIterator,
        I::Item: Into<Sample<f64>>,
        E: IntoIterator<Item = HistoryEnumSet>,
        R: IntoIterator<Item = ReferenceEntryId>,
        S: IntoIterator<Item = HistoryEnumSet>,
    {
        self.require(RecordingType::Measured)?;
        self.check_order(time_stamp)?;

        let decimal_values: Vec<Sample<f64>> = decimal_values.into_iter().map(Into::into).collect();
        let enum_values: Vec<HistoryEnumSet> = enum_values.into_iter().collect();
        let reference_entry_ids: Vec<ReferenceEntryId> = reference_entry_ids.into_iter().collect();
        let reference_entry_statuses: Vec<HistoryEnumSet> = reference_entry_statuses.into_iter().collect();

        let configuration = &self.configuration;
        check_len("decimal values", configuration.decimal_data_series_count(), decimal_values.len())?;
        check_len("enum values", configuration.enum_data_series_count(), enum_values.len())?;
        let references = configuration.reference_entry_data_series_count();
        check_len("reference entry ids", references, reference_entry_ids.len())?;
        check_len("reference entry statuses", references, reference_entry_statuses.len())?;

        let columns = &mut self.columns;
        columns.time_stamps.push(time_stamp);
        columns.decimal.push_samples("decimal values", decimal_values)?;
        columns.enums.push_row("enum values", &enum_values)?;
        columns.reference_ids.push_row("reference entry ids", &reference_entry_ids)?;
        columns
            .reference_statuses
            .push_row("reference entry statuses", &reference_entry_statuses)?;
        Ok(())
    }

    /// Adds one calculated row.
    pub fn add_calculated_values(&mut self, time_stamp: f64, row: CalculatedRow) -> Result<()> {
        self.require(RecordingType::Calculated)?;
        self.check_order(time_stamp)?;

        let configuration = &self.configuration;
        let decimals = configuration.decimal_data_series_count();
        let enums = configuration.enum_data_series_count();
        let references = configuration.reference_entry_data_series_count();
        check_len("decimal values", decimals, row.decimal_values.len())?;
        check_len("decimal min", decimals, row.decimal_min.len())?;
        check_len("decimal max", decimals, row.decimal_max.len())?;
        check_len("enum values", enums, row.enum_values.len())?;
        check_len("enum most of the time", enums, row.enum_most_of_the_time.len())?;
        check_len("reference entry ids", references, row.reference_entry_ids.len())?;
        check_len("reference entry ids count", references, row.reference_entry_ids_count.len())?;
        check_len("reference entry statuses", references, row.reference_entry_statuses.len())?;

        let columns = &mut self.columns;
        columns.time_stamps.push(time_stamp);
        columns.decimal.push_samples("decimal values", row.decimal_values)?;
        if let Some(min) = columns.decimal_min.as_mut() {
            min.push_samples("decimal min", row.decimal_min)?;
        }
        if let Some(max) = columns.decimal_max.as_mut() {
            max.push_samples("decimal max", row.decimal_max)?;
        }
        columns.enums.push_row("enum values", &row.enum_values)?;
        if let Some(most_of_the_time) = columns.most_of_the_time.as_mut() {
            most_of_the_time.push_row("enum most of the time", &row.enum_most_of_the_time)?;
        }
        columns.reference_ids.push_row("reference entry ids", &row.reference_entry_ids)?;
        if let Some(counts) = columns.reference_counts.as_mut() {
            counts.push_row("reference entry ids count", &row.reference_entry_ids_count)?;
        }
        columns
            .reference_statuses
            .push_row("reference entry statuses", &row.reference_entry_statuses)?;
        Ok(())
    }

    /// Finishes the chunk.
    pub fn build(self) -> Result<HistoryChunk> {
        HistoryChunk::from_columns(
            self.configuration,
            self.recording_type,
            self.columns,
            Arc::new(self.data_map),
        )
    }

    fn pending<T: Sentinel>(&self, count: usize) -> Vec<T> {
        vec![T::PENDING; count]
    }

    fn require(&self, recording_type: RecordingType) -> Result<()> {
        if self.recording_type != recording_type {
            return Err(HistoryError::RecordingTypeMismatch {
                expected: self.recording_type,
                actual: recording_type,
            });
        }
        Ok(())
    }

    fn check_order(&self, time_stamp: f64) -> Result<()> {
        if let Some(previous) = self.columns.time_stamps.last().copied() {
            if !(time_stamp > previous) {
                return Err(HistoryError::UnsortedTimestamps {
                    index: self.columns.len(),
                    previous,
                    current: time_stamp,
                });
            }
        }
        Ok(())
    }
}

fn check_len(column: &'static str, expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(HistoryError::ColumnLength { column, expected, actual });
    }
    Ok(())
}

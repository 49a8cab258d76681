//! Column storage of a chunk.
//!
//! Every column is a [`ValueMatrix`]: a flat row-major array with one row
//! per timestamp and one column per series of its kind
//! (`index = width * timestamp_index + series_index`).

use crate::error::{HistoryError, Result};
use crate::model::sentinel::{encode_decimal, DECIMAL_PENDING};
use crate::model::{
    HistoryEnumOrdinal, HistoryEnumSet, ReferenceEntriesDataMap, ReferenceEntryId,
    ReferenceEntryIdsCount, Sample, Sentinel,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A cell type that can be stored in a [`ValueMatrix`].
pub trait Cell: Copy + std::fmt::Debug {
    /// Cell used for rows a source chunk does not have.
    const FILL: Self;

    /// Bitwise identity; `NaN` equals `NaN`.
    fn same(&self, other: &Self) -> bool;
}

impl Cell for f64 {
    const FILL: Self = DECIMAL_PENDING;

    fn same(&self, other: &Self) -> bool {
        self.to_bits() == other.to_bits()
    }
}

macro_rules! sentinel_cell {
    ($($ty:ty),*) => {
        $(impl Cell for $ty {
            const FILL: Self = <$ty as Sentinel>::PENDING;

            fn same(&self, other: &Self) -> bool {
                self == other
            }
        })*
    };
}

sentinel_cell!(HistoryEnumSet, HistoryEnumOrdinal, ReferenceEntryId, ReferenceEntryIdsCount);

/// Flat row-major matrix.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValueMatrix<T> {
    width: usize,
    height: usize,
    data: Vec<T>,
}

impl<T: Cell> ValueMatrix<T> {
    /// Creates a matrix from its flat data.
    pub fn new(width: usize, height: usize, data: Vec<T>) -> Result<Self> {
        if data.len() != width * height {
            return Err(HistoryError::ColumnLength {
                column: "matrix",
                expected: width * height,
                actual: data.len(),
            });
        }
        Ok(Self { width, height, data })
    }

    /// A matrix without rows.
    pub fn empty(width: usize) -> Self {
        Self {
            width,
            height: 0,
            data: Vec::new(),
        }
    }

    /// Number of series.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Number of timestamps.
    pub fn height(&self) -> usize {
        self.height
    }

    /// The flat data.
    pub fn data(&self) -> &[T] {
        &self.data
    }

    /// The cell of `series` in `row`.
    ///
    /// # Panics
    ///
    /// Panics if either index is out of range.
    pub fn get(&self, series: usize, row: usize) -> T {
        assert!(
            series < self.width && row < self.height,
            "cell ({series}, {row}) out of range for {}x{} matrix",
            self.width,
            self.height
        );
        self.data[self.width * row + series]
    }

    /// All cells of one row.
    pub fn row(&self, row: usize) -> &[T] {
        &self.data[self.width * row..self.width * (row + 1)]
    }
}

impl<T: Cell> PartialEq for ValueMatrix<T> {
    fn eq(&self, other: &Self) -> bool {
        self.width == other.width
            && self.height == other.height
            && self.data.iter().zip(&other.data).all(|(a, b)| a.same(b))
    }
}

/// Decimal columns. `min`/`max` only exist for calculated chunks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecimalHistoryValues {
    /// Values (encoded sentinels).
    pub values: ValueMatrix<f64>,
    /// Minimum of the aggregated interval.
    pub min: Option<ValueMatrix<f64>>,
    /// Maximum of the aggregated interval.
    pub max: Option<ValueMatrix<f64>>,
}

/// Enum columns. `most_of_the_time` only exists for calculated chunks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnumHistoryValues {
    /// Bitsets.
    pub values: ValueMatrix<HistoryEnumSet>,
    /// Ordinal that was active for the longest time in the aggregated interval.
    pub most_of_the_time: Option<ValueMatrix<HistoryEnumOrdinal>>,
}

/// Reference-entry columns. `different_ids_count` only exists for calculated chunks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceEntryHistoryValues {
    /// Ids.
    pub ids: ValueMatrix<ReferenceEntryId>,
    /// Distinct ids of the aggregated interval.
    pub different_ids_count: Option<ValueMatrix<ReferenceEntryIdsCount>>,
    /// Status bitset per cell.
    pub statuses: ValueMatrix<HistoryEnumSet>,
    /// Resolves the ids.
    pub data_map: Arc<ReferenceEntriesDataMap>,
}

/// All columns of a chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryValues {
    /// Decimal columns.
    pub decimal_history_values: DecimalHistoryValues,
    /// Enum columns.
    pub enum_history_values: EnumHistoryValues,
    /// Reference-entry columns.
    pub reference_entry_history_values: ReferenceEntryHistoryValues,
}

impl HistoryValues {
    /// Number of rows. All columns share it once validated.
    pub fn height(&self) -> usize {
        self.decimal_history_values.values.height()
    }

    /// Returns true if any aggregate column is present.
    pub fn has_aggregates(&self) -> bool {
        self.decimal_history_values.min.is_some()
            || self.decimal_history_values.max.is_some()
            || self.enum_history_values.most_of_the_time.is_some()
            || self.reference_entry_history_values.different_ids_count.is_some()
    }

    /// Returns true if every aggregate column is present.
    pub fn has_all_aggregates(&self) -> bool {
        self.decimal_history_values.min.is_some()
            && self.decimal_history_values.max.is_some()
            && self.enum_history_values.most_of_the_time.is_some()
            && self.reference_entry_history_values.different_ids_count.is_some()
    }

    pub(crate) fn check_dimensions(&self, decimals: usize, enums: usize, references: usize, height: usize) -> Result<()> {
        let decimal = &self.decimal_history_values;
        check_matrix("decimal values", &decimal.values, decimals, height)?;
        if let Some(min) = &decimal.min {
            check_matrix("decimal min", min, decimals, height)?;
        }
        if let Some(max) = &decimal.max {
            check_matrix("decimal max", max, decimals, height)?;
        }

        let enumeration = &self.enum_history_values;
        check_matrix("enum values", &enumeration.values, enums, height)?;
        if let Some(most_of_the_time) = &enumeration.most_of_the_time {
            check_matrix("enum most of the time", most_of_the_time, enums, height)?;
        }

        let reference = &self.reference_entry_history_values;
        check_matrix("reference entry ids", &reference.ids, references, height)?;
        check_matrix("reference entry statuses", &reference.statuses, references, height)?;
        if let Some(count) = &reference.different_ids_count {
            check_matrix("reference entry ids count", count, references, height)?;
        }
        Ok(())
    }
}

fn check_matrix<T: Cell>(column: &'static str, matrix: &ValueMatrix<T>, width: usize, height: usize) -> Result<()> {
    if matrix.width() != width {
        return Err(HistoryError::ColumnLength {
            column,
            expected: width,
            actual: matrix.width(),
        });
    }
    if matrix.height() != height {
        return Err(HistoryError::ColumnLength {
            column,
            expected: height,
            actual: matrix.height(),
        });
    }
    Ok(())
}

/// Growable counterpart of [`ValueMatrix`].
#[derive(Debug)]
pub(crate) struct MatrixBuilder<T> {
    width: usize,
    data: Vec<T>,
}

impl<T: Cell> MatrixBuilder<T> {
    pub(crate) fn new(width: usize, capacity: usize) -> Self {
        Self {
            width,
            data: Vec::with_capacity(width * capacity),
        }
    }

    pub(crate) fn push_row(&mut self, column: &'static str, row: &[T]) -> Result<()> {
        if row.len() != self.width {
            return Err(HistoryError::ColumnLength {
                column,
                expected: self.width,
                actual: row.len(),
            });
        }
        self.data.extend_from_slice(row);
        Ok(())
    }

    pub(crate) fn push_fill_row(&mut self) {
        self.data.extend(std::iter::repeat(T::FILL).take(self.width));
    }

    pub(crate) fn build(self) -> ValueMatrix<T> {
        let height = if self.width == 0 { 0 } else { self.data.len() / self.width };
        ValueMatrix {
            width: self.width,
            height,
            data: self.data,
        }
    }
}

impl MatrixBuilder<f64> {
    pub(crate) fn push_samples(
        &mut self,
        column: &'static str,
        samples: impl IntoIterator<Item = Sample<f64>>,
    ) -> Result<()> {
        let before = self.data.len();
        self.data.extend(samples.into_iter().map(encode_decimal));
        let actual = self.data.len() - before;
        if actual != self.width {
            self.data.truncate(before);
            return Err(HistoryError::ColumnLength {
                column,
                expected: self.width,
                actual,
            });
        }
        Ok(())
    }
}

/// Row-wise assembly of all columns of a chunk.
///
/// Used by the chunk builder and by every operation that rebuilds a chunk
/// (merge, range, append, insert).
#[derive(Debug)]
pub(crate) struct ColumnsBuilder {
    pub(crate) time_stamps: Vec<f64>,
    pub(crate) decimal: MatrixBuilder<f64>,
    pub(crate) decimal_min: Option<MatrixBuilder<f64>>,
    pub(crate) decimal_max: Option<MatrixBuilder<f64>>,
    pub(crate) enums: MatrixBuilder<HistoryEnumSet>,
    pub(crate) most_of_the_time: Option<MatrixBuilder<HistoryEnumOrdinal>>,
    pub(crate) reference_ids: MatrixBuilder<ReferenceEntryId>,
    pub(crate) reference_counts: Option<MatrixBuilder<ReferenceEntryIdsCount>>,
    pub(crate) reference_statuses: MatrixBuilder<HistoryEnumSet>,
}

impl ColumnsBuilder {
    pub(crate) fn new(decimals: usize, enums: usize, references: usize, calculated: bool, capacity: usize) -> Self {
        Self {
            time_stamps: Vec::with_capacity(capacity),
            decimal: MatrixBuilder::new(decimals, capacity),
            decimal_min: calculated.then(|| MatrixBuilder::new(decimals, capacity)),
            decimal_max: calculated.then(|| MatrixBuilder::new(decimals, capacity)),
            enums: MatrixBuilder::new(enums, capacity),
            most_of_the_time: calculated.then(|| MatrixBuilder::new(enums, capacity)),
            reference_ids: MatrixBuilder::new(references, capacity),
            reference_counts: calculated.then(|| MatrixBuilder::new(references, capacity)),
            reference_statuses: MatrixBuilder::new(references, capacity),
        }
    }

    /// Copies one complete row of `values`.
    pub(crate) fn push_row_from(&mut self, time_stamp: f64, values: &HistoryValues, row: usize) -> Result<()> {
        self.time_stamps.push(time_stamp);

        let decimal = &values.decimal_history_values;
        self.decimal.push_row("decimal values", decimal.values.row(row))?;
        push_optional_row(&mut self.decimal_min, "decimal min", decimal.min.as_ref(), row)?;
        push_optional_row(&mut self.decimal_max, "decimal max", decimal.max.as_ref(), row)?;

        let enumeration = &values.enum_history_values;
        self.enums.push_row("enum values", enumeration.values.row(row))?;
        push_optional_row(
            &mut self.most_of_the_time,
            "enum most of the time",
            enumeration.most_of_the_time.as_ref(),
            row,
        )?;

        let reference = &values.reference_entry_history_values;
        self.reference_ids.push_row("reference entry ids", reference.ids.row(row))?;
        self.reference_statuses
            .push_row("reference entry statuses", reference.statuses.row(row))?;
        push_optional_row(
            &mut self.reference_counts,
            "reference entry ids count",
            reference.different_ids_count.as_ref(),
            row,
        )?;
        Ok(())
    }

    pub(crate) fn len(&self) -> usize {
        self.time_stamps.len()
    }

    pub(crate) fn finish(self, data_map: Arc<ReferenceEntriesDataMap>) -> (Vec<f64>, HistoryValues) {
        let values = HistoryValues {
            decimal_history_values: DecimalHistoryValues {
                values: self.decimal.build(),
                min: self.decimal_min.map(MatrixBuilder::build),
                max: self.decimal_max.map(MatrixBuilder::build),
            },
            enum_history_values: EnumHistoryValues {
                values: self.enums.build(),
                most_of_the_time: self.most_of_the_time.map(MatrixBuilder::build),
            },
            reference_entry_history_values: ReferenceEntryHistoryValues {
                ids: self.reference_ids.build(),
                different_ids_count: self.reference_counts.map(MatrixBuilder::build),
                statuses: self.reference_statuses.build(),
                data_map,
            },
        };
        let height = self.time_stamps.len();
        (self.time_stamps, values.with_height(height))
    }
}

impl HistoryValues {
    // Width-0 matrices cannot derive their height from the data.
    fn with_height(mut self, height: usize) -> Self {
        fn fix<T>(matrix: &mut ValueMatrix<T>, height: usize) {
            if matrix.width == 0 {
                matrix.height = height;
            }
        }
        fn fix_optional<T>(matrix: &mut Option<ValueMatrix<T>>, height: usize) {
            if let Some(matrix) = matrix {
                fix(matrix, height);
            }
        }

        let decimal = &mut self.decimal_history_values;
        fix(&mut decimal.values, height);
        fix_optional(&mut decimal.min, height);
        fix_optional(&mut decimal.max, height);
        let enumeration = &mut self.enum_history_values;
        fix(&mut enumeration.values, height);
        fix_optional(&mut enumeration.most_of_the_time, height);
        let reference = &mut self.reference_entry_history_values;
        fix(&mut reference.ids, height);
        fix(&mut reference.statuses, height);
        fix_optional(&mut reference.different_ids_count, height);
        self
    }
}

fn push_optional_row<T: Cell>(
    target: &mut Option<MatrixBuilder<T>>,
    column: &'static str,
    source: Option<&ValueMatrix<T>>,
    row: usize,
) -> Result<()> {
    match (target, source) {
        (Some(target), Some(source)) => target.push_row(column, source.row(row)),
        (Some(target), None) => {
            target.push_fill_row();
            Ok(())
        }
        (None, _) => Ok(()),
    }
}

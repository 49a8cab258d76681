//! Series configuration shared by all chunks of a history.
//!
//! A [`HistoryConfiguration`] lists the decimal, enum and reference-entry
//! series in column order. Chunks hold it behind an `Arc`; two chunks can be
//! merged only if their configurations are equal.

use crate::error::{HistoryError, Result};
use crate::model::enum_set::HistoryEnumOrdinal;
use crate::model::index::{
    DataSeriesId, DecimalDataSeriesIndex, EnumDataSeriesIndex, ReferenceEntryDataSeriesIndex,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

/// Unit of a decimal series.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HistoryUnit(Option<String>);

impl HistoryUnit {
    /// No unit.
    pub const NONE: Self = Self(None);

    /// Creates a unit.
    pub fn new(unit: impl Into<String>) -> Self {
        Self(Some(unit.into()))
    }

    /// Returns the unit text.
    pub fn as_str(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

/// One value of a [`HistoryEnum`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HistoryEnumValue {
    /// Ordinal of the value.
    pub ordinal: HistoryEnumOrdinal,
    /// Display key.
    pub key: String,
}

/// Describes the values of an enum series.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HistoryEnum {
    /// Name of the enum.
    pub name: String,
    /// The values, ordered by ordinal.
    pub values: Vec<HistoryEnumValue>,
}

impl HistoryEnum {
    /// Creates an enum whose ordinals are the positions of `keys`.
    pub fn create(name: impl Into<String>, keys: &[&str]) -> Self {
        Self {
            name: name.into(),
            values: keys
                .iter()
                .enumerate()
                .map(|(ordinal, key)| HistoryEnumValue {
                    ordinal: HistoryEnumOrdinal::new(ordinal as u32),
                    key: (*key).to_string(),
                })
                .collect(),
        }
    }

    /// The `false` / `true` enum.
    pub fn boolean() -> Self {
        Self::create("Boolean", &["false", "true"])
    }

    /// Returns the value for an ordinal.
    pub fn value(&self, ordinal: HistoryEnumOrdinal) -> Option<&HistoryEnumValue> {
        self.values.iter().find(|value| value.ordinal == ordinal)
    }
}

/// Configuration of a decimal series.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DecimalSeriesConfiguration {
    /// Series id.
    pub id: DataSeriesId,
    /// Display name.
    pub display_name: String,
    /// Unit of the values.
    pub unit: HistoryUnit,
}

/// Configuration of an enum series.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EnumSeriesConfiguration {
    /// Series id.
    pub id: DataSeriesId,
    /// Display name.
    pub display_name: String,
    /// The enum of the values.
    pub history_enum: HistoryEnum,
}

/// Configuration of a reference-entry series.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReferenceEntrySeriesConfiguration {
    /// Series id.
    pub id: DataSeriesId,
    /// Display name.
    pub display_name: String,
    /// Enum of the status column, if the series carries one.
    pub status_enum: Option<HistoryEnum>,
}

/// Column layout of a history.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HistoryConfiguration {
    decimal: Vec<DecimalSeriesConfiguration>,
    enums: Vec<EnumSeriesConfiguration>,
    reference_entries: Vec<ReferenceEntrySeriesConfiguration>,
}

impl HistoryConfiguration {
    /// Returns an empty builder.
    pub fn builder() -> HistoryConfigurationBuilder {
        HistoryConfigurationBuilder::default()
    }

    /// A configuration without any series.
    pub fn empty() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Generates a configuration with the given series counts.
    ///
    /// Ids are `index * 100` for decimals, `index * 1000` for enums and
    /// `index * 10000` for reference entries.
    pub fn default_for(decimals: usize, enums: usize, reference_entries: usize) -> Arc<Self> {
        let decimal = (0..decimals)
            .map(|index| DecimalSeriesConfiguration {
                id: DataSeriesId(index as i32 * 100),
                display_name: format!("Decimal {index}"),
                unit: HistoryUnit::NONE,
            })
            .collect();
        let enums = (0..enums)
            .map(|index| EnumSeriesConfiguration {
                id: DataSeriesId(index as i32 * 1000),
                display_name: format!("Enum {index}"),
                history_enum: HistoryEnum::boolean(),
            })
            .collect();
        let reference_entries = (0..reference_entries)
            .map(|index| ReferenceEntrySeriesConfiguration {
                id: DataSeriesId(index as i32 * 10000),
                display_name: format!("Reference Entry {index}"),
                status_enum: None,
            })
            .collect();

        Arc::new(Self {
            decimal,
            enums,
            reference_entries,
        })
    }

    /// Number of decimal series.
    pub fn decimal_data_series_count(&self) -> usize {
        self.decimal.len()
    }

    /// Number of enum series.
    pub fn enum_data_series_count(&self) -> usize {
        self.enums.len()
    }

    /// Number of reference-entry series.
    pub fn reference_entry_data_series_count(&self) -> usize {
        self.reference_entries.len()
    }

    /// Number of series of all kinds.
    pub fn total_data_series_count(&self) -> usize {
        self.decimal.len() + self.enums.len() + self.reference_entries.len()
    }

    /// Returns true if there is no series at all.
    pub fn is_empty(&self) -> bool {
        self.total_data_series_count() == 0
    }

    /// Decimal series configurations in column order.
    pub fn decimal_series(&self) -> &[DecimalSeriesConfiguration] {
        &self.decimal
    }

    /// Enum series configurations in column order.
    pub fn enum_series(&self) -> &[EnumSeriesConfiguration] {
        &self.enums
    }

    /// Reference-entry series configurations in column order.
    pub fn reference_entry_series(&self) -> &[ReferenceEntrySeriesConfiguration] {
        &self.reference_entries
    }

    /// Configuration of a decimal series, if the index exists.
    pub fn decimal(&self, index: DecimalDataSeriesIndex) -> Option<&DecimalSeriesConfiguration> {
        self.decimal.get(index.value())
    }

    /// Configuration of an enum series, if the index exists.
    pub fn enum_configuration(&self, index: EnumDataSeriesIndex) -> Option<&EnumSeriesConfiguration> {
        self.enums.get(index.value())
    }

    /// Configuration of a reference-entry series, if the index exists.
    pub fn reference_entry(
        &self,
        index: ReferenceEntryDataSeriesIndex,
    ) -> Option<&ReferenceEntrySeriesConfiguration> {
        self.reference_entries.get(index.value())
    }

    /// Index of the decimal series with the given id.
    pub fn decimal_index_of(&self, id: DataSeriesId) -> Option<DecimalDataSeriesIndex> {
        self.decimal
            .iter()
            .position(|series| series.id == id)
            .map(DecimalDataSeriesIndex::new)
    }

    /// Index of the enum series with the given id.
    pub fn enum_index_of(&self, id: DataSeriesId) -> Option<EnumDataSeriesIndex> {
        self.enums
            .iter()
            .position(|series| series.id == id)
            .map(EnumDataSeriesIndex::new)
    }

    /// Index of the reference-entry series with the given id.
    pub fn reference_entry_index_of(&self, id: DataSeriesId) -> Option<ReferenceEntryDataSeriesIndex> {
        self.reference_entries
            .iter()
            .position(|series| series.id == id)
            .map(ReferenceEntryDataSeriesIndex::new)
    }
}

/// Builder for [`HistoryConfiguration`].
#[derive(Debug, Default)]
pub struct HistoryConfigurationBuilder {
    configuration: HistoryConfiguration,
}

impl HistoryConfigurationBuilder {
    /// Adds a decimal series.
    pub fn decimal_data_series(
        mut self,
        id: DataSeriesId,
        display_name: impl Into<String>,
        unit: HistoryUnit,
    ) -> Self {
        self.configuration.decimal.push(DecimalSeriesConfiguration {
            id,
            display_name: display_name.into(),
            unit,
        });
        self
    }

    /// Adds an enum series.
    pub fn enum_data_series(
        mut self,
        id: DataSeriesId,
        display_name: impl Into<String>,
        history_enum: HistoryEnum,
    ) -> Self {
        self.configuration.enums.push(EnumSeriesConfiguration {
            id,
            display_name: display_name.into(),
            history_enum,
        });
        self
    }

    /// Adds a reference-entry series.
    pub fn reference_entry_data_series(
        mut self,
        id: DataSeriesId,
        display_name: impl Into<String>,
        status_enum: Option<HistoryEnum>,
    ) -> Self {
        self.configuration
            .reference_entries
            .push(ReferenceEntrySeriesConfiguration {
                id,
                display_name: display_name.into(),
                status_enum,
            });
        self
    }

    /// Finishes the configuration.
    ///
    /// Fails if an id is used twice within one series kind.
    pub fn build(self) -> Result<Arc<HistoryConfiguration>> {
        check_unique(self.configuration.decimal.iter().map(|series| series.id))?;
        check_unique(self.configuration.enums.iter().map(|series| series.id))?;
        check_unique(self.configuration.reference_entries.iter().map(|series| series.id))?;
        Ok(Arc::new(self.configuration))
    }
}

fn check_unique(ids: impl Iterator<Item = DataSeriesId>) -> Result<()> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(HistoryError::DuplicateSeriesId(id.value()));
        }
    }
    Ok(())
}

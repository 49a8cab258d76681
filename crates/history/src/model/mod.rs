//! Value model: sentinels, typed indices, enum sets, reference entries and
//! the series configuration.

pub mod config;
pub mod enum_set;
pub mod index;
pub mod reference;
pub mod sentinel;

pub use config::{
    DecimalSeriesConfiguration, EnumSeriesConfiguration, HistoryConfiguration,
    HistoryConfigurationBuilder, HistoryEnum, HistoryEnumValue, HistoryUnit,
    ReferenceEntrySeriesConfiguration,
};
pub use enum_set::{HistoryEnumOrdinal, HistoryEnumSet, ENUM_SET_BITS};
pub use index::{
    DataSeriesId, DecimalDataSeriesIndex, EnumDataSeriesIndex, ReferenceEntryDataSeriesIndex,
    TimestampIndex,
};
pub use reference::{
    GeneratedReferenceEntries, ReferenceEntriesDataMap, ReferenceEntriesDataMapBuilder,
    ReferenceEntryData, ReferenceEntryId, ReferenceEntryIdsCount, DEFAULT_GENERATED_CACHE_CAPACITY,
};
pub use sentinel::{max_history_aware, min_history_aware, Sample, Sentinel};

//! Typed indices for the axes of a chunk.
//!
//! Each axis has its own index type so a decimal series index cannot be
//! passed where a timestamp index or an enum series index is expected.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! axis_index {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(usize);

        impl $name {
            /// The first index.
            pub const ZERO: Self = Self(0);

            /// Creates a new index.
            pub const fn new(value: usize) -> Self {
                Self(value)
            }

            /// Returns the raw index.
            pub const fn value(self) -> usize {
                self.0
            }

            /// Returns the raw index for slice access.
            pub const fn as_usize(self) -> usize {
                self.0
            }

            /// Returns the following index.
            pub const fn next(self) -> Self {
                Self(self.0 + 1)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }
    };
}

axis_index!(
    /// Index of a decimal data series within a configuration.
    DecimalDataSeriesIndex
);

axis_index!(
    /// Index of an enum data series within a configuration.
    EnumDataSeriesIndex
);

axis_index!(
    /// Index of a reference-entry data series within a configuration.
    ReferenceEntryDataSeriesIndex
);

axis_index!(
    /// Index of a timestamp (row) within a chunk.
    TimestampIndex
);

/// Externally assigned identifier of a data series.
///
/// Unlike the indices this is not positional: it is chosen by the producer
/// and stays stable across configurations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DataSeriesId(pub i32);

impl DataSeriesId {
    /// Returns the raw id.
    pub const fn value(self) -> i32 {
        self.0
    }
}

impl fmt::Display for DataSeriesId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DataSeriesId({})", self.0)
    }
}

//! Enum ordinals and enum bitsets.
//!
//! An enum cell holds a [`HistoryEnumSet`]: a bitset of up to 30 ordinals.
//! Measured cells usually have exactly one bit set, calculated cells the
//! union of all ordinals seen in the aggregated interval.

use crate::model::sentinel::{Sample, Sentinel, NO_VALUE_MAGIC, PENDING_MAGIC};
use bitvec::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of usable bits in a [`HistoryEnumSet`].
pub const ENUM_SET_BITS: usize = 30;

/// Ordinal of an enum value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HistoryEnumOrdinal(u32);

impl HistoryEnumOrdinal {
    /// Ordinal of `false` for boolean enums.
    pub const BOOLEAN_FALSE: Self = Self(0);
    /// Ordinal of `true` for boolean enums.
    pub const BOOLEAN_TRUE: Self = Self(1);
    /// The greatest ordinal that fits into a [`HistoryEnumSet`].
    pub const MAX: Self = Self(ENUM_SET_BITS as u32 - 1);

    /// Creates a new ordinal.
    pub const fn new(ordinal: u32) -> Self {
        Self(ordinal)
    }

    /// Returns the raw ordinal.
    pub const fn value(self) -> u32 {
        self.0
    }
}

impl Sentinel for HistoryEnumOrdinal {
    const PENDING: Self = Self(PENDING_MAGIC);
    const NO_VALUE: Self = Self(NO_VALUE_MAGIC);
}

/// Bitset of enum ordinals.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HistoryEnumSet(u32);

impl HistoryEnumSet {
    /// Only ordinal 0.
    pub const FIRST: Self = Self(0b0001);
    /// Only ordinal 1.
    pub const SECOND: Self = Self(0b0010);
    /// Only ordinal 2.
    pub const THIRD: Self = Self(0b0100);
    /// Only ordinal 3.
    pub const FOURTH: Self = Self(0b1000);
    /// All 30 ordinals.
    pub const MAX: Self = Self((1 << ENUM_SET_BITS) - 1);
    /// `false` of a boolean enum.
    pub const BOOLEAN_FALSE: Self = Self::FIRST;
    /// `true` of a boolean enum.
    pub const BOOLEAN_TRUE: Self = Self::SECOND;

    /// Creates a bitset. Bits above the 30th are dropped.
    pub const fn new(bitset: u32) -> Self {
        Self(bitset & Self::MAX.0)
    }

    /// Creates a bitset with exactly the given ordinal set.
    ///
    /// Sentinel ordinals map to the matching sentinel sets.
    ///
    /// # Panics
    ///
    /// Panics if the ordinal is above [`HistoryEnumOrdinal::MAX`] and not a
    /// sentinel.
    pub fn for_enum_ordinal(ordinal: HistoryEnumOrdinal) -> Self {
        if ordinal.is_pending() {
            return Self::PENDING;
        }
        if ordinal.is_no_value() {
            return Self::NO_VALUE;
        }
        assert!(ordinal <= HistoryEnumOrdinal::MAX, "ordinal {} out of range", ordinal.0);
        Self::new(1 << ordinal.0)
    }

    /// Creates a bitset for the enum value with the given ordinal value.
    pub fn for_enum_value(ordinal: u32) -> Self {
        Self::for_enum_ordinal(HistoryEnumOrdinal::new(ordinal))
    }

    /// Returns the raw bits.
    pub const fn bitset(self) -> u32 {
        self.0
    }

    /// Returns true if the ordinal is part of this set.
    pub fn is_set(self, ordinal: HistoryEnumOrdinal) -> bool {
        if self.is_sentinel() || ordinal > HistoryEnumOrdinal::MAX {
            return false;
        }
        self.bits()[ordinal.0 as usize]
    }

    /// Returns the lowest set ordinal.
    ///
    /// Sentinel sets return the matching sentinel ordinal, the empty set
    /// returns [`HistoryEnumOrdinal::NO_VALUE`].
    pub fn first_set_ordinal(self) -> HistoryEnumOrdinal {
        if self.is_pending() {
            return HistoryEnumOrdinal::PENDING;
        }
        if self.is_no_value() {
            return HistoryEnumOrdinal::NO_VALUE;
        }
        match self.bits().first_one() {
            Some(ordinal) => HistoryEnumOrdinal::new(ordinal as u32),
            None => HistoryEnumOrdinal::NO_VALUE,
        }
    }

    /// Iterates the set ordinals in ascending order.
    pub fn set_ordinals(&self) -> impl Iterator<Item = HistoryEnumOrdinal> + '_ {
        let bits = if self.is_sentinel() {
            &self.bits()[..0]
        } else {
            self.bits()
        };
        bits.iter_ones().map(|ordinal| HistoryEnumOrdinal::new(ordinal as u32))
    }

    /// Number of set ordinals. Sentinels count as zero.
    pub fn bit_count(self) -> usize {
        if self.is_sentinel() {
            0
        } else {
            self.bits().count_ones()
        }
    }

    /// Union of both sets.
    ///
    /// Sentinels follow the history-aware rules: Pending is dropped in favor
    /// of the other side, NoValue in favor of a concrete set.
    pub fn union(self, other: Self) -> Self {
        match (self.to_sample(), other.to_sample()) {
            (Sample::Value(a), Sample::Value(b)) => Self(a.0 | b.0),
            (Sample::Pending, _) => other,
            (_, Sample::Pending) => self,
            (Sample::NoValue, _) => other,
            (_, Sample::NoValue) => self,
        }
    }

    fn is_sentinel(self) -> bool {
        self.is_pending() || self.is_no_value()
    }

    fn bits(&self) -> &BitSlice<u32, Lsb0> {
        &self.0.view_bits::<Lsb0>()[..ENUM_SET_BITS]
    }
}

impl Sentinel for HistoryEnumSet {
    const PENDING: Self = Self(PENDING_MAGIC);
    const NO_VALUE: Self = Self(NO_VALUE_MAGIC);
}

impl fmt::Debug for HistoryEnumSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_pending() {
            write!(f, "HistoryEnumSet(Pending)")
        } else if self.is_no_value() {
            write!(f, "HistoryEnumSet(NoValue)")
        } else {
            write!(f, "HistoryEnumSet({:#b})", self.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_set_ordinal_roundtrip() {
        for ordinal in [
            HistoryEnumOrdinal::NO_VALUE,
            HistoryEnumOrdinal::PENDING,
            HistoryEnumOrdinal::BOOLEAN_TRUE,
            HistoryEnumOrdinal::BOOLEAN_FALSE,
            HistoryEnumOrdinal::MAX,
        ] {
            assert_eq!(HistoryEnumSet::for_enum_ordinal(ordinal).first_set_ordinal(), ordinal);
        }
    }

    #[test]
    fn test_iterate_set_bits() {
        let single: Vec<_> = HistoryEnumSet::for_enum_value(7).set_ordinals().collect();
        assert_eq!(single, vec![HistoryEnumOrdinal::new(7)]);

        let pair: Vec<_> = HistoryEnumSet::new(0b101).set_ordinals().collect();
        assert_eq!(pair, vec![HistoryEnumOrdinal::new(0), HistoryEnumOrdinal::new(2)]);

        assert_eq!(HistoryEnumSet::PENDING.set_ordinals().count(), 0);
    }

    #[test]
    fn test_for_enum_ordinal_max() {
        assert_eq!(
            HistoryEnumSet::for_enum_ordinal(HistoryEnumOrdinal::MAX).bitset(),
            1 << 29
        );
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_for_enum_ordinal_above_max() {
        HistoryEnumSet::for_enum_value(30);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_for_enum_ordinal_wide_shift() {
        HistoryEnumSet::for_enum_value(40);
    }

    #[test]
    fn test_for_enum_value() {
        assert_eq!(HistoryEnumSet::for_enum_value(0), HistoryEnumSet::FIRST);
        assert_eq!(HistoryEnumSet::for_enum_value(1), HistoryEnumSet::SECOND);
        assert_eq!(HistoryEnumSet::for_enum_value(2), HistoryEnumSet::THIRD);
        assert_eq!(HistoryEnumSet::for_enum_value(3), HistoryEnumSet::FOURTH);
        assert_eq!(HistoryEnumSet::NO_VALUE.first_set_ordinal(), HistoryEnumOrdinal::NO_VALUE);
        assert_eq!(HistoryEnumSet::PENDING.first_set_ordinal(), HistoryEnumOrdinal::PENDING);
    }

    #[test]
    fn test_is_set() {
        let set = HistoryEnumSet::new(0b0101_0101);
        for ordinal in 0..9 {
            assert_eq!(set.is_set(HistoryEnumOrdinal::new(ordinal)), ordinal % 2 == 0 && ordinal < 8);
        }
        assert!(!HistoryEnumSet::FIRST.is_set(HistoryEnumOrdinal::new(1)));
        assert!(HistoryEnumSet::SECOND.is_set(HistoryEnumOrdinal::new(1)));
    }

    #[test]
    fn test_max() {
        let max = HistoryEnumSet::MAX;
        assert!(!max.is_pending());
        assert!(!max.is_no_value());
        for ordinal in 0..=28 {
            assert!(max.is_set(HistoryEnumOrdinal::new(ordinal)));
        }
        assert_eq!(max.bit_count(), ENUM_SET_BITS);
    }

    #[test]
    fn test_new_masks_sentinel_bits() {
        assert!(!HistoryEnumSet::new(u32::MAX).is_pending());
        assert_eq!(HistoryEnumSet::new(u32::MAX), HistoryEnumSet::MAX);
    }

    #[test]
    fn test_union() {
        assert_eq!(HistoryEnumSet::FIRST.union(HistoryEnumSet::THIRD), HistoryEnumSet::new(0b101));
        assert_eq!(HistoryEnumSet::PENDING.union(HistoryEnumSet::NO_VALUE), HistoryEnumSet::NO_VALUE);
        assert_eq!(HistoryEnumSet::NO_VALUE.union(HistoryEnumSet::SECOND), HistoryEnumSet::SECOND);
    }
}

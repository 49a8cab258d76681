//! Pending / NoValue semantics shared by every cell kind.
//!
//! A cell is in exactly one of three states:
//!
//! - **Pending**: no sample has been taken yet; one may still arrive.
//! - **NoValue**: a sample was taken, but the series had no valid value.
//! - **Value**: a concrete value.
//!
//! Columns store the states with reserved magic values (see [`Sentinel`]).
//! Reads decode them into [`Sample`], so a sentinel can never take part in
//! arithmetic by accident.

use serde::{Deserialize, Serialize};

/// Encoded decimal for "no value".
pub(crate) const DECIMAL_NO_VALUE: f64 = f64::NAN;

/// Encoded decimal for "pending".
pub(crate) const DECIMAL_PENDING: f64 = f64::MAX;

/// Reserved integer for "pending" in enum and reference-entry cells.
pub const PENDING_MAGIC: u32 = i32::MAX as u32;

/// Reserved integer for "no value" in enum and reference-entry cells.
pub const NO_VALUE_MAGIC: u32 = i32::MAX as u32 - 1;

/// A decoded cell.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Sample<T> {
    /// No sample taken yet.
    Pending,
    /// Sample taken without a valid value.
    NoValue,
    /// A concrete value.
    Value(T),
}

impl<T> Sample<T> {
    /// Returns true for [`Sample::Pending`].
    pub const fn is_pending(&self) -> bool {
        matches!(self, Sample::Pending)
    }

    /// Returns true for [`Sample::NoValue`].
    pub const fn is_no_value(&self) -> bool {
        matches!(self, Sample::NoValue)
    }

    /// Returns the concrete value, if any.
    pub fn value(self) -> Option<T> {
        match self {
            Sample::Value(value) => Some(value),
            Sample::Pending | Sample::NoValue => None,
        }
    }

    /// Maps the concrete value and keeps sentinels untouched.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Sample<U> {
        match self {
            Sample::Pending => Sample::Pending,
            Sample::NoValue => Sample::NoValue,
            Sample::Value(value) => Sample::Value(f(value)),
        }
    }
}

impl From<f64> for Sample<f64> {
    /// `NaN` converts to [`Sample::NoValue`].
    fn from(value: f64) -> Self {
        if value.is_nan() {
            Sample::NoValue
        } else {
            Sample::Value(value)
        }
    }
}

/// A cell type with reserved magic values for Pending and NoValue.
pub trait Sentinel: Copy + PartialEq {
    /// The reserved "pending" value.
    const PENDING: Self;

    /// The reserved "no value" value.
    const NO_VALUE: Self;

    /// Returns true if this is the "pending" value.
    fn is_pending(self) -> bool {
        self == Self::PENDING
    }

    /// Returns true if this is the "no value" value.
    fn is_no_value(self) -> bool {
        self == Self::NO_VALUE
    }

    /// Decodes the cell.
    fn to_sample(self) -> Sample<Self> {
        if self.is_pending() {
            Sample::Pending
        } else if self.is_no_value() {
            Sample::NoValue
        } else {
            Sample::Value(self)
        }
    }

    /// Encodes a decoded cell.
    fn from_sample(sample: Sample<Self>) -> Self {
        match sample {
            Sample::Pending => Self::PENDING,
            Sample::NoValue => Self::NO_VALUE,
            Sample::Value(value) => value,
        }
    }
}

pub(crate) fn decode_decimal(raw: f64) -> Sample<f64> {
    if raw.is_nan() {
        Sample::NoValue
    } else if raw == DECIMAL_PENDING {
        Sample::Pending
    } else {
        Sample::Value(raw)
    }
}

pub(crate) fn encode_decimal(sample: Sample<f64>) -> f64 {
    match sample {
        Sample::Pending => DECIMAL_PENDING,
        Sample::NoValue => DECIMAL_NO_VALUE,
        Sample::Value(value) if value.is_nan() => DECIMAL_NO_VALUE,
        Sample::Value(value) => value,
    }
}

/// Returns the larger sample.
///
/// Pending loses against everything, NoValue loses against concrete values.
pub fn max_history_aware<T: PartialOrd>(first: Sample<T>, second: Sample<T>) -> Sample<T> {
    fold_history_aware(first, second, |a, b| if b > a { b } else { a })
}

/// Returns the smaller sample.
///
/// Pending loses against everything, NoValue loses against concrete values.
pub fn min_history_aware<T: PartialOrd>(first: Sample<T>, second: Sample<T>) -> Sample<T> {
    fold_history_aware(first, second, |a, b| if b < a { b } else { a })
}

fn fold_history_aware<T>(first: Sample<T>, second: Sample<T>, pick: impl FnOnce(T, T) -> T) -> Sample<T> {
    match (first, second) {
        (Sample::Pending, other) | (other, Sample::Pending) => other,
        (Sample::NoValue, other) | (other, Sample::NoValue) => other,
        (Sample::Value(a), Sample::Value(b)) => Sample::Value(pick(a, b)),
    }
}

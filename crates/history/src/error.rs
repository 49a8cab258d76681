//! Error and Result types for history storage operations.

use crate::bucket::HistoryBucketRange;
use crate::chunk::RecordingType;
use thiserror::Error;

/// A convenience `Result` type for history operations.
pub type Result<T> = std::result::Result<T, HistoryError>;

/// The error type for history operations.
///
/// Every variant describes a violated contract. Absent data is never an
/// error: lookups return `Option` instead.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HistoryError {
    /// Two chunks with different series configurations were combined.
    #[error("Configuration mismatch: {0}")]
    ConfigurationMismatch(String),

    /// The recording types of two chunks do not match the operation.
    #[error("Recording type mismatch: expected {expected:?}, got {actual:?}")]
    RecordingTypeMismatch {
        /// Recording type the operation requires.
        expected: RecordingType,
        /// Recording type that was provided.
        actual: RecordingType,
    },

    /// A neighbor distance was zero or negative.
    #[error("Invalid distance: {0} (must be > 0)")]
    InvalidDistance(i64),

    /// A range would produce more descriptors than supported.
    #[error("Too many descriptors: {estimated} needed for [{start}, {end}] at {bucket_range:?} (max {max})")]
    TooManyDescriptors {
        /// Number of descriptors the range needs.
        estimated: u64,
        /// Maximum supported count.
        max: usize,
        /// Start of the requested range.
        start: f64,
        /// End of the requested range.
        end: f64,
        /// Bucket range the descriptors were requested for.
        bucket_range: HistoryBucketRange,
    },

    /// Descriptors of different bucket ranges were compared.
    #[error("Bucket range mismatch: {left:?} vs {right:?}")]
    BucketRangeMismatch {
        /// Range of the receiver.
        left: HistoryBucketRange,
        /// Range of the argument.
        right: HistoryBucketRange,
    },

    /// The chunk of a bucket does not fit into the descriptor.
    #[error("Chunk [{first}, {last}] exceeds bucket [{start}, {end})")]
    BucketBoundary {
        /// First timestamp of the chunk.
        first: f64,
        /// Last timestamp of the chunk.
        last: f64,
        /// Start of the descriptor (inclusive).
        start: f64,
        /// End of the descriptor (exclusive).
        end: f64,
    },

    /// The timestamp is not the exact start of a bucket.
    #[error("Timestamp {timestamp} is not a start of {bucket_range:?}")]
    NotAStart {
        /// Provided timestamp.
        timestamp: f64,
        /// Range that was checked.
        bucket_range: HistoryBucketRange,
    },

    /// The lower bound is not below the upper bound.
    #[error("Invalid bounds: start {start} must be < end {end}")]
    InvalidBounds {
        /// Lower bound.
        start: f64,
        /// Upper bound.
        end: f64,
    },

    /// Timestamps are not strictly ascending.
    #[error("Timestamps not strictly ascending at index {index}: {previous} >= {current}")]
    UnsortedTimestamps {
        /// Index of the offending timestamp.
        index: usize,
        /// Timestamp before the offending one.
        previous: f64,
        /// Offending timestamp.
        current: f64,
    },

    /// A column or row has the wrong number of cells.
    #[error("Column length mismatch for {column}: expected {expected}, got {actual}")]
    ColumnLength {
        /// Column name.
        column: &'static str,
        /// Expected cell count.
        expected: usize,
        /// Actual cell count.
        actual: usize,
    },

    /// A calculated chunk lacks its aggregate columns (or a measured chunk carries them).
    #[error("Aggregate columns for {0:?} chunk are inconsistent")]
    MissingAggregates(RecordingType),

    /// A series index is not below the series count of the chunk.
    #[error("Series index {index} out of range (series count {count})")]
    SeriesIndexOutOfRange {
        /// Requested series index.
        index: usize,
        /// Series count of the chunk.
        count: usize,
    },

    /// A data series id was registered twice.
    #[error("Duplicate data series id: {0}")]
    DuplicateSeriesId(i32),

    /// The finest bucket range has no lower neighbor.
    #[error("No lower bucket range for {0:?}")]
    NoLowerRange(HistoryBucketRange),

    /// The cache has been disposed.
    #[error("History storage cache has been disposed")]
    Disposed,
}

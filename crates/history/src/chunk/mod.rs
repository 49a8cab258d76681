//! Columnar sample storage.
//!
//! # Architecture
//!
//! A [`HistoryChunk`] owns the strictly ascending timestamps of its rows and
//! one [`ValueMatrix`] per column kind:
//!
//! ```text
//! timeStamps   [t0, t1, t2]
//! decimal      [d0@t0, d1@t0, d0@t1, d1@t1, d0@t2, d1@t2]
//! enum         [e0@t0, e0@t1, e0@t2]
//! refEntryIds  [r0@t0, r0@t1, r0@t2]  (+ statuses, + data map)
//! ```
//!
//! Calculated chunks additionally carry decimal min/max, enum
//! most-of-the-time and reference-entry different-ids-count matrices.
//! Chunks never change after construction; merge, range, append and insert
//! all build a new chunk.

pub mod builder;
pub mod history_chunk;
pub mod merge;
pub mod values;

pub use builder::{CalculatedRow, HistoryChunkBuilder};
pub use history_chunk::{BestTimestampIndex, HistoryChunk, RecordingType};
pub use merge::MeasuredRow;
pub use values::{
    DecimalHistoryValues, EnumHistoryValues, HistoryValues, ReferenceEntryHistoryValues, ValueMatrix,
};

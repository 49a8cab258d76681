//! Bucket addressing: sampling periods, bucket ranges, descriptors and buckets.
//!
//! # Architecture
//!
//! Every [`SamplingPeriod`] maps 1:1 to a [`HistoryBucketRange`]. A range
//! splits the time axis into buckets of fixed duration, addressed by a
//! [`HistoryBucketDescriptor`] holding the integral bucket index. Buckets of
//! neighboring ranges nest exactly: the children of a descriptor span its
//! interval without gaps.

pub mod descriptor;
pub mod history_bucket;
pub mod range;
pub mod sampling;

pub use descriptor::{HistoryBucketDescriptor, MAX_SUPPORTED_DESCRIPTORS_COUNT};
pub use history_bucket::{
    find, find_decimal_value_at, find_enum_value_at, find_reference_entry_id_value_at, HistoryBucket,
};
pub use range::HistoryBucketRange;
pub use sampling::SamplingPeriod;

//! # Storage Layer
//!
//! The three bucket-backed stores a relation aggregates, plus the thin
//! bucket adapter over the underlying B-tree engine:
//!
//! - [`bucket`]: named key/value buckets with ordered range cursors
//! - [`data`]: primary row bucket keyed by auto-incrementing row id
//! - [`index`]: per-index buckets of composite keys with empty values
//! - [`reverse`]: per-row record of exact index keys, used by deletes
//!
//! On disk every relation owns a family of buckets:
//!
//! ```text
//! rel/<relation>/meta              schema + row-id sequence
//! rel/<relation>/data              row id -> serialized row
//! rel/<relation>/indexes/<index>   composite keys, empty values
//! rel/<relation>/reverseIdx        row id -> {index -> key bytes}
//! ```

pub mod bucket;
pub mod data;
pub mod index;
pub mod reverse;

pub use bucket::{Bucket, BucketRange};
pub use data::{DataIter, DataStore};
pub use index::{IndexIter, IndexStore};
pub use reverse::ReverseIndexStore;

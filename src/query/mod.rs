//! # Predicate Algebra
//!
//! The small operator DSL callers filter with (`eq`, `ne`, `gt`, `lt`,
//! `ge`, `le`), and its compilation into per-field byte ranges that index
//! scans can honor directly.

pub mod op;
pub mod range;

pub use op::{apply, eq, ge, gt, le, lt, ne, Op, OpKind};
pub use range::{to_ranges, KeyRange};

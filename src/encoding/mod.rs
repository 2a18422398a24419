//! # Encoding Module
//!
//! Order-preserving key encoding for the relation store:
//!
//! - **Ordered codec**: byte-comparable encoding of heterogeneous values
//!   and composite keys, the single source of sort order for every range
//!   scan in the system.

pub mod ordered;

pub use ordered::tag;

//! # Thunder - Embedded Transactional Relation Store
//!
//! Thunder stores named relations (tables of column-name to value rows)
//! inside a transactional B-tree file, with secondary indexes, unique
//! constraints, composite indexes, projections, and a Datalog-style
//! recursive query layer on top.
//!
//! ## Quick Start
//!
//! ```ignore
//! use thunder::{row, ColumnDef, Database, RelationDef};
//! use thunder::query::eq;
//!
//! let db = Database::create("./app.thunder")?;
//! let tx = db.begin(true)?;
//! let mut users = tx.create_persistent(
//!     "users",
//!     RelationDef::new([
//!         ColumnDef::new("id"),
//!         ColumnDef::new("username").indexed(),
//!         ColumnDef::new("role"),
//!     ]),
//! )?;
//!
//! users.insert(row! { "id" => "1", "username" => "alice", "role" => "admin" })?;
//! for row in users.select(&[eq("username", "alice")])? {
//!     println!("{:?}", row?);
//! }
//! drop(users);
//! tx.commit()?;
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────┐
//! │        Selectors / Projections / Queries   │
//! ├───────────────────────────────────────────┤
//! │   Relation (planner + residual filtering)  │
//! ├──────────────┬──────────────┬─────────────┤
//! │  DataStore   │  IndexStore  │ ReverseIdx  │
//! ├──────────────┴──────────────┴─────────────┤
//! │   Ordered key encoding │ Value codec      │
//! ├───────────────────────────────────────────┤
//! │     Buckets over the B-tree engine (redb)  │
//! └───────────────────────────────────────────┘
//! ```
//!
//! ## Bucket Layout
//!
//! Every relation owns a family of buckets in the underlying file:
//!
//! ```text
//! rel/<relation>/meta              schema + row-id sequence
//! rel/<relation>/data              row id -> serialized row
//! rel/<relation>/indexes/<index>   composite keys, empty values
//! rel/<relation>/reverseIdx        row id -> {index -> key bytes}
//! ```
//!
//! ## Module Overview
//!
//! - [`types`]: the value domain and rows
//! - [`encoding`]: order-preserving composite-key codec
//! - [`codec`]: pluggable row payload serialization
//! - [`storage`]: data, index, and reverse-index stores over buckets
//! - [`query`]: predicate DSL and range compilation
//! - [`relation`]: persistent relations and the scan planner
//! - [`selector`]: the uniform row-source surface and projections
//! - [`recursive`]: recursive queries with fixed-point evaluation
//! - [`database`], [`transaction`]: the front end

mod macros;

pub mod codec;
pub mod database;
pub mod encoding;
pub mod query;
pub mod recursive;
pub mod relation;
pub mod schema;
pub mod selector;
pub mod storage;
pub mod transaction;
pub mod types;

pub use codec::{BincodeCodec, JsonCodec, MsgpackCodec, ValueCodec};
pub use database::Database;
pub use query::{eq, ge, gt, le, lt, ne, Op};
pub use recursive::{Query, RuleAtom};
pub use relation::Persistent;
pub use schema::{ColumnDef, IndexDef, RelationDef};
pub use selector::{Projection, RowIter, Selector};
pub use transaction::Tx;
pub use types::{Row, Value};

//! # Relation Schema
//!
//! Definition types callers build relations from, plus the persisted
//! metadata form. A relation has an ordered set of named columns with
//! per-column `indexed`/`unique` flags, and may add composite indexes
//! over several columns under a caller-supplied label.
//!
//! Single-column indexes are named after their column. `unique` implies
//! indexed: the uniqueness probe is an index lookup.
//!
//! ```rust,ignore
//! let def = RelationDef::new([
//!     ColumnDef::new("id"),
//!     ColumnDef::new("username").indexed(),
//!     ColumnDef::new("email").unique(),
//!     ColumnDef::new("country"),
//!     ColumnDef::new("city"),
//! ])
//! .with_index(IndexDef::new("loc", ["country", "city"]));
//! ```
//!
//! The validated definition is serialized through the injected value
//! codec into the relation's meta bucket and read back by
//! `load_persistent`.

use eyre::{ensure, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone)]
pub struct ColumnDef {
    name: String,
    indexed: bool,
    unique: bool,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            indexed: false,
            unique: false,
        }
    }

    pub fn indexed(mut self) -> Self {
        self.indexed = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone)]
pub struct IndexDef {
    name: String,
    columns: Vec<String>,
    unique: bool,
}

impl IndexDef {
    pub fn new<S: Into<String>>(name: impl Into<String>, columns: impl IntoIterator<Item = S>) -> Self {
        Self {
            name: name.into(),
            columns: columns.into_iter().map(Into::into).collect(),
            unique: false,
        }
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct RelationDef {
    columns: Vec<ColumnDef>,
    indexes: Vec<IndexDef>,
}

impl RelationDef {
    pub fn new(columns: impl IntoIterator<Item = ColumnDef>) -> Self {
        Self {
            columns: columns.into_iter().collect(),
            indexes: Vec::new(),
        }
    }

    /// Adds a composite index over several columns.
    pub fn with_index(mut self, index: IndexDef) -> Self {
        self.indexes.push(index);
        self
    }

    /// Validates the definition and lowers it to its persisted form.
    ///
    /// Index order is declaration order (single-column indexes first,
    /// composite indexes after), which also fixes how the planner breaks
    /// distance ties.
    pub fn into_meta(self) -> Result<RelationMeta> {
        ensure!(!self.columns.is_empty(), "relation declares no columns");
        let mut columns = Vec::with_capacity(self.columns.len());
        let mut indexes = Vec::new();
        for col in &self.columns {
            ensure!(
                !columns.contains(&col.name),
                "duplicate column '{}' in relation definition",
                col.name
            );
            columns.push(col.name.clone());
            if col.indexed || col.unique {
                indexes.push(IndexSpec {
                    name: col.name.clone(),
                    columns: vec![col.name.clone()],
                    unique: col.unique,
                });
            }
        }
        for index in self.indexes {
            ensure!(
                !columns.contains(&index.name),
                "index '{}' collides with a column name",
                index.name
            );
            ensure!(
                !indexes.iter().any(|spec| spec.name == index.name),
                "index '{}' declared twice",
                index.name
            );
            ensure!(
                !index.columns.is_empty(),
                "index '{}' declares no key columns",
                index.name
            );
            for col in &index.columns {
                ensure!(
                    columns.contains(col),
                    "index '{}' references unknown column '{}'",
                    index.name,
                    col
                );
            }
            indexes.push(IndexSpec {
                name: index.name,
                columns: index.columns,
                unique: index.unique,
            });
        }
        Ok(RelationMeta { columns, indexes })
    }
}

/// Persisted schema: column list plus declared indexes, in planner
/// tie-break order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationMeta {
    pub columns: Vec<String>,
    pub indexes: Vec<IndexSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexSpec {
    pub name: String,
    pub columns: Vec<String>,
    pub unique: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowers_column_flags_to_index_specs() {
        let meta = RelationDef::new([
            ColumnDef::new("id"),
            ColumnDef::new("username").indexed(),
            ColumnDef::new("email").unique(),
        ])
        .into_meta()
        .unwrap();

        assert_eq!(meta.columns, vec!["id", "username", "email"]);
        assert_eq!(meta.indexes.len(), 2);
        assert_eq!(meta.indexes[0].name, "username");
        assert!(!meta.indexes[0].unique);
        assert_eq!(meta.indexes[1].name, "email");
        assert!(meta.indexes[1].unique);
    }

    #[test]
    fn composite_indexes_follow_column_indexes() {
        let meta = RelationDef::new([
            ColumnDef::new("country"),
            ColumnDef::new("city"),
            ColumnDef::new("zip").indexed(),
        ])
        .with_index(IndexDef::new("loc", ["country", "city"]))
        .into_meta()
        .unwrap();

        assert_eq!(meta.indexes[0].name, "zip");
        assert_eq!(meta.indexes[1].name, "loc");
        assert_eq!(meta.indexes[1].columns, vec!["country", "city"]);
    }

    #[test]
    fn rejects_duplicate_columns_and_bad_indexes() {
        assert!(RelationDef::new([ColumnDef::new("a"), ColumnDef::new("a")])
            .into_meta()
            .is_err());

        assert!(
            RelationDef::new([ColumnDef::new("a")])
                .with_index(IndexDef::new("x", ["missing"]))
                .into_meta()
                .is_err()
        );

        assert!(
            RelationDef::new([ColumnDef::new("a"), ColumnDef::new("b")])
                .with_index(IndexDef::new("a", ["b"]))
                .into_meta()
                .is_err()
        );
    }
}

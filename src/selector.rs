//! # Selectors and Projections
//!
//! [`Selector`] is the uniform surface every row source exposes: a
//! persistent relation, a projection over one, or a recursive query.
//! [`Projection`] wraps a source and rewrites both directions: incoming
//! predicates are translated back to source column names, yielded rows
//! are renamed to the projected schema. Projections compose.

use crate::query::op::Op;
use crate::types::Row;
use eyre::{ensure, eyre, Result};
use hashbrown::HashMap;

/// Pull-based row stream; each item carries the row or the error the
/// producer hit for it.
pub struct RowIter<'a>(Box<dyn Iterator<Item = Result<Row>> + 'a>);

impl<'a> RowIter<'a> {
    pub fn new(inner: Box<dyn Iterator<Item = Result<Row>> + 'a>) -> Self {
        Self(inner)
    }
}

impl<'a> Iterator for RowIter<'a> {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next()
    }
}

impl std::fmt::Debug for RowIter<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RowIter").finish()
    }
}

pub trait Selector {
    fn name(&self) -> &str;

    fn columns(&self) -> &[String];

    fn select<'s>(&'s self, ops: &[Op]) -> Result<RowIter<'s>>;

    /// Renames columns. Mapping is source column → new name; columns not
    /// named keep their source names.
    fn project<'s>(&'s self, mapping: &HashMap<String, String>) -> Result<Projection<'s>>
    where
        Self: Sized,
    {
        Projection::new(self, mapping)
    }
}

pub struct Projection<'a> {
    source: &'a dyn Selector,
    name: String,
    columns: Vec<String>,
    renames: HashMap<String, String>,
    inverse: HashMap<String, String>,
}

impl std::fmt::Debug for Projection<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Projection")
            .field("name", &self.name)
            .field("columns", &self.columns)
            .field("renames", &self.renames)
            .field("inverse", &self.inverse)
            .finish()
    }
}

impl<'a> Projection<'a> {
    pub fn new(source: &'a dyn Selector, mapping: &HashMap<String, String>) -> Result<Self> {
        let source_columns = source.columns();
        for from in mapping.keys() {
            ensure!(
                source_columns.iter().any(|c| c == from),
                "projection renames unknown column '{}' of '{}'",
                from,
                source.name()
            );
        }
        let mut columns = Vec::with_capacity(source_columns.len());
        let mut inverse = HashMap::new();
        for col in source_columns {
            let projected = mapping.get(col).cloned().unwrap_or_else(|| col.clone());
            ensure!(
                !columns.contains(&projected),
                "projection produces duplicate column '{projected}'"
            );
            inverse.insert(projected.clone(), col.clone());
            columns.push(projected);
        }
        Ok(Self {
            source,
            name: source.name().to_string(),
            columns,
            renames: mapping.clone(),
            inverse,
        })
    }

    fn rename_row(&self, row: Row) -> Row {
        row.into_iter()
            .map(|(col, value)| match self.renames.get(&col) {
                Some(new) => (new.clone(), value),
                None => (col, value),
            })
            .collect()
    }
}

impl Selector for Projection<'_> {
    fn name(&self) -> &str {
        &self.name
    }

    fn columns(&self) -> &[String] {
        &self.columns
    }

    fn select<'s>(&'s self, ops: &[Op]) -> Result<RowIter<'s>> {
        let mut translated = Vec::with_capacity(ops.len());
        for op in ops {
            let source_field = self.inverse.get(&op.field).ok_or_else(|| {
                eyre!(
                    "field '{}' not found in columns of '{}'",
                    op.field,
                    self.name
                )
            })?;
            let mut op = op.clone();
            op.field = source_field.clone();
            translated.push(op);
        }
        let inner = self.source.select(&translated)?;
        Ok(RowIter::new(Box::new(
            inner.map(move |item| item.map(|row| self.rename_row(row))),
        )))
    }
}

//! # Persistent Relations
//!
//! A [`Persistent`] aggregates the three stores a relation writes to
//! (data, indexes, reverse index) together with its schema, all scoped
//! to one transaction. Inserts and deletes keep the stores aligned;
//! selects run through a small planner that turns the compiled per-field
//! ranges into either an index-driven scan or a full scan with residual
//! filtering.
//!
//! ## Planning
//!
//! 1. Compile predicates to per-field [`KeyRange`]s. An empty range
//!    short-circuits to an empty stream without touching storage.
//! 2. Collect declared indexes whose name carries a range. None: full
//!    scan, every range evaluated residually against each row.
//! 3. Otherwise scan the index with the smallest `distance()` (ties go
//!    to declaration order). The cursor enforces that index's range, so
//!    it is dropped from the residual set; every other range and every
//!    `ne` predicate is checked per row.
//!
//! A residual range whose field names a composite index is evaluated by
//! rebuilding the key tuple from the index's declared columns.

use crate::codec::ValueCodec;
use crate::encoding::ordered::{encode_key, encode_ranged};
use crate::query::op::{apply, Op, OpKind};
use crate::query::range::{to_ranges, KeyRange};
use crate::schema::{IndexSpec, RelationMeta};
use crate::selector::{RowIter, Selector};
use crate::storage::data::{DataIter, DataStore};
use crate::storage::index::{IndexIter, IndexStore};
use crate::storage::reverse::ReverseIndexStore;
use crate::types::{Row, Value};
use eyre::{bail, ensure, eyre, Result};
use hashbrown::HashMap;
use smallvec::SmallVec;

#[derive(Debug)]
pub struct Persistent<'txn, C: ValueCodec> {
    relation: String,
    columns: Vec<String>,
    indexes: Vec<IndexSpec>,
    data: DataStore<'txn, C>,
    index_store: IndexStore<'txn>,
    reverse: ReverseIndexStore<'txn, C>,
}

impl<'txn, C: ValueCodec> Persistent<'txn, C> {
    pub(crate) fn new(
        relation: &str,
        meta: RelationMeta,
        data: DataStore<'txn, C>,
        index_store: IndexStore<'txn>,
        reverse: ReverseIndexStore<'txn, C>,
    ) -> Self {
        Self {
            relation: relation.to_string(),
            columns: meta.columns,
            indexes: meta.indexes,
            data,
            index_store,
            reverse,
        }
    }

    /// Inserts a row. Every declared column must be present exactly
    /// once; unique indexes are probed before anything is written, so a
    /// constraint failure leaves the transaction untouched.
    pub fn insert(&mut self, row: Row) -> Result<()> {
        ensure!(
            row.len() == self.columns.len(),
            "row has {} fields but relation '{}' declares {}",
            row.len(),
            self.relation,
            self.columns.len()
        );
        for col in &self.columns {
            ensure!(
                row.contains_key(col),
                "row is missing column '{}' of relation '{}'",
                col,
                self.relation
            );
        }

        for spec in self.indexes.iter().filter(|spec| spec.unique) {
            let parts = key_values(spec, &row, &self.relation)?;
            let probe = KeyRange::point(encode_key(&parts));
            let mut hits = self.index_store.get(&spec.name, probe, spec.columns.len())?;
            if let Some(hit) = hits.next() {
                hit?;
                bail!(
                    "UNIQUE constraint violated on index '{}' in relation '{}'",
                    spec.name,
                    self.relation
                );
            }
        }

        let id_bytes = self.data.insert(&row)?;
        let mut recorded = HashMap::with_capacity(self.indexes.len());
        for spec in &self.indexes {
            let parts = key_values(spec, &row, &self.relation)?;
            let key_bytes = self.index_store.insert(&spec.name, &parts, &id_bytes)?;
            recorded.insert(spec.name.clone(), key_bytes);
        }
        self.reverse.insert(&id_bytes, &recorded)
    }

    /// Deletes every row matching the conjunction, returning how many
    /// were removed. Index entries are removed by the exact key bytes
    /// the reverse index recorded at insert time.
    pub fn delete(&mut self, ops: &[Op]) -> Result<usize> {
        let matched: Vec<(Vec<u8>, Row)> = self.entries(ops)?.collect::<Result<_>>()?;
        let mut deleted = 0;
        for (id, _) in matched {
            let recorded = self.reverse.get(&id)?;
            for (index_name, key_bytes) in &recorded {
                ensure!(
                    self.index_spec(index_name).is_some(),
                    "reverse index references unknown index '{}' in relation '{}'",
                    index_name,
                    self.relation
                );
                self.index_store.delete(index_name, key_bytes)?;
            }
            self.reverse.delete(&id)?;
            self.data.delete(&id)?;
            deleted += 1;
        }
        Ok(deleted)
    }

    /// Lazily yields every row matching the conjunction.
    pub fn select(&self, ops: &[Op]) -> Result<Rows<'_, 'txn, C>> {
        Ok(Rows {
            inner: self.entries(ops)?,
        })
    }

    fn index_spec(&self, name: &str) -> Option<&IndexSpec> {
        self.indexes.iter().find(|spec| spec.name == name)
    }

    fn entries(&self, ops: &[Op]) -> Result<Entries<'_, 'txn, C>> {
        let ranges = to_ranges(ops)?;
        if ranges.values().any(KeyRange::is_empty) {
            return Ok(Entries {
                rel: self,
                residual: HashMap::new(),
                ne_ops: Vec::new(),
                mode: Mode::Done,
            });
        }
        let ne_ops: Vec<Op> = ops
            .iter()
            .filter(|op| op.kind == OpKind::Ne)
            .cloned()
            .collect();

        let mut chosen: Option<&IndexSpec> = None;
        for spec in &self.indexes {
            if !ranges.contains_key(&spec.name) {
                continue;
            }
            match chosen {
                None => chosen = Some(spec),
                Some(best) => {
                    if ranges[&spec.name].distance() < ranges[&best.name].distance() {
                        chosen = Some(spec);
                    }
                }
            }
        }

        match chosen {
            None => Ok(Entries {
                rel: self,
                residual: ranges,
                ne_ops,
                mode: Mode::Scan(self.data.get(&KeyRange::unbounded())?),
            }),
            Some(spec) => {
                let mut residual = ranges;
                let range = residual
                    .remove(&spec.name)
                    .ok_or_else(|| eyre!("planner lost range for index '{}'", spec.name))?;
                let ids = self.index_store.get(&spec.name, range, spec.columns.len())?;
                Ok(Entries {
                    rel: self,
                    residual,
                    ne_ops,
                    mode: Mode::Index(ids),
                })
            }
        }
    }

    fn matches(&self, row: &Row, residual: &HashMap<String, KeyRange>, ne_ops: &[Op]) -> Result<bool> {
        for (field, range) in residual {
            let value = self.resolve_field(row, field)?;
            if !range.contains(&encode_ranged(&value)) {
                return Ok(false);
            }
        }
        for op in ne_ops {
            let value = self.resolve_field(row, &op.field)?;
            if !apply(&value, op)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// A predicate field is either a column of the row or the name of a
    /// composite index, in which case its key tuple is rebuilt from the
    /// index's declared columns.
    fn resolve_field(&self, row: &Row, field: &str) -> Result<Value> {
        if let Some(value) = row.get(field) {
            return Ok(value.clone());
        }
        if let Some(spec) = self.index_spec(field) {
            let parts = key_values(spec, row, &self.relation)?;
            return Ok(Value::Tuple(parts.into_vec()));
        }
        bail!(
            "field '{}' not found in columns of relation '{}'",
            field,
            self.relation
        )
    }
}

fn key_values(spec: &IndexSpec, row: &Row, relation: &str) -> Result<SmallVec<[Value; 4]>> {
    let mut parts = SmallVec::with_capacity(spec.columns.len());
    for col in &spec.columns {
        let value = row
            .get(col)
            .ok_or_else(|| eyre!("row is missing column '{col}' of relation '{relation}'"))?;
        parts.push(value.clone());
    }
    Ok(parts)
}

impl<C: ValueCodec> Selector for Persistent<'_, C> {
    fn name(&self) -> &str {
        &self.relation
    }

    fn columns(&self) -> &[String] {
        &self.columns
    }

    fn select<'s>(&'s self, ops: &[Op]) -> Result<RowIter<'s>> {
        Ok(RowIter::new(Box::new(Persistent::select(self, ops)?)))
    }
}

enum Mode<'s, C: ValueCodec> {
    Done,
    Scan(DataIter<'s, C>),
    Index(IndexIter<'s>),
}

/// Matching `(encoded row id, row)` pairs; the shared engine behind
/// `select` and `delete`.
struct Entries<'s, 'txn, C: ValueCodec> {
    rel: &'s Persistent<'txn, C>,
    residual: HashMap<String, KeyRange>,
    ne_ops: Vec<Op>,
    mode: Mode<'s, C>,
}

impl<C: ValueCodec> Iterator for Entries<'_, '_, C> {
    type Item = Result<(Vec<u8>, Row)>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = match &mut self.mode {
                Mode::Done => return None,
                Mode::Scan(rows) => match rows.next()? {
                    Ok(entry) => entry,
                    Err(e) => return Some(Err(e)),
                },
                Mode::Index(ids) => {
                    let id = match ids.next()? {
                        Ok(id) => id,
                        Err(e) => return Some(Err(e)),
                    };
                    match self.rel.data.get_by_id(&id) {
                        Err(e) => return Some(Err(e)),
                        Ok(None) => {
                            return Some(Err(eyre!(
                                "index entry references missing row in relation '{}'",
                                self.rel.relation
                            )))
                        }
                        Ok(Some(row)) => (id, row),
                    }
                }
            };
            match self.rel.matches(&entry.1, &self.residual, &self.ne_ops) {
                Err(e) => return Some(Err(e)),
                Ok(false) => continue,
                Ok(true) => return Some(Ok(entry)),
            }
        }
    }
}

/// Lazy stream of matching rows.
pub struct Rows<'s, 'txn, C: ValueCodec> {
    inner: Entries<'s, 'txn, C>,
}

impl<C: ValueCodec> Iterator for Rows<'_, '_, C> {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        Some(self.inner.next()?.map(|(_, row)| row))
    }
}

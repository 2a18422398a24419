//! # Recursive Queries
//!
//! A [`Query`] is a named virtual relation: declared output columns and
//! a body that is a union of conjunctive rules. Each rule is an ordered
//! list of atoms joined on shared column names; an atom is either any
//! [`Selector`] or a reference to the query being defined
//! ([`RuleAtom::SelfRef`]), with a renaming of the query's output
//! columns into rule-local names.
//!
//! ## Evaluation
//!
//! Semi-naïve fixed point, fully materialized:
//!
//! - `R0` = union of the rules without self references.
//! - Each step re-evaluates every recursive rule substituting the
//!   previous step's newly added tuples for one self occurrence at a
//!   time and the full accumulated set for the others.
//! - New tuples are whatever the step produced that was not already
//!   accumulated; iteration stops when a step adds nothing.
//!
//! Tuples are deduplicated by the order-preserving encoding of the
//! output columns, and accumulated in an ordered map, so result order is
//! deterministic and an encoded key never appears twice. Non-recursive
//! queries evaluate in a single union-of-joins pass.
//!
//! Joins are hash joins: build a table on the smaller side keyed by the
//! encoded shared-column tuple, probe with the larger side, emit the
//! union of both sides' columns. Source atoms are materialized once per
//! evaluation.

use crate::encoding::ordered::encode_key;
use crate::query::op::{apply, Op};
use crate::selector::{RowIter, Selector};
use crate::types::{Row, Value};
use eyre::{bail, ensure, eyre, Result};
use std::collections::BTreeMap;

pub enum RuleAtom<'a> {
    /// Any row source: a relation, a projection, another query.
    Source(Box<dyn Selector + 'a>),
    /// The query being defined, with output columns renamed into
    /// rule-local names (unmapped columns keep their names).
    SelfRef(hashbrown::HashMap<String, String>),
}

impl<'a> RuleAtom<'a> {
    pub fn source(selector: impl Selector + 'a) -> Self {
        RuleAtom::Source(Box::new(selector))
    }

    pub fn self_ref<K, V>(mapping: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        RuleAtom::SelfRef(
            mapping
                .into_iter()
                .map(|(from, to)| (from.into(), to.into()))
                .collect(),
        )
    }
}

pub struct Rule<'a> {
    atoms: Vec<RuleAtom<'a>>,
}

pub struct Query<'a> {
    name: String,
    columns: Vec<String>,
    recursive: bool,
    rules: Vec<Rule<'a>>,
}

/// A materialized atom: its column list and its rows.
type Table = (Vec<String>, Vec<Row>);

impl<'a> Query<'a> {
    pub fn new(name: impl Into<String>, columns: &[&str], recursive: bool) -> Self {
        Self {
            name: name.into(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            recursive,
            rules: Vec::new(),
        }
    }

    /// Adds one conjunctive rule to the union.
    pub fn rule(&mut self, atoms: Vec<RuleAtom<'a>>) -> Result<()> {
        ensure!(!atoms.is_empty(), "rule for query '{}' has no body", self.name);
        for atom in &atoms {
            if let RuleAtom::SelfRef(mapping) = atom {
                ensure!(
                    self.recursive,
                    "query '{}' is not recursive but a rule references it",
                    self.name
                );
                for from in mapping.keys() {
                    ensure!(
                        self.columns.contains(from),
                        "rule renames unknown output column '{}' of query '{}'",
                        from,
                        self.name
                    );
                }
                let local = self.self_columns(mapping);
                for (i, col) in local.iter().enumerate() {
                    ensure!(
                        !local[..i].contains(col),
                        "rule maps two output columns of query '{}' to '{}'",
                        self.name,
                        col
                    );
                }
            }
        }
        self.rules.push(Rule { atoms });
        Ok(())
    }

    /// Evaluates to the fixed point and filters with `ops`. Predicates
    /// must name output columns; they are applied after materialization.
    pub fn select(&self, ops: &[Op]) -> Result<RowIter<'_>> {
        let rows = self.fixed_point()?;
        let mut out = Vec::new();
        'rows: for row in rows.into_values() {
            for op in ops {
                let Some(value) = row.get(&op.field) else {
                    bail!(
                        "field '{}' not found in columns of query '{}'",
                        op.field,
                        self.name
                    );
                };
                if !apply(value, op)? {
                    continue 'rows;
                }
            }
            out.push(row);
        }
        Ok(RowIter::new(Box::new(out.into_iter().map(Ok))))
    }

    fn fixed_point(&self) -> Result<BTreeMap<Vec<u8>, Row>> {
        // Source atoms are static for the duration of an evaluation:
        // materialize each exactly once.
        let mut sources: Vec<Vec<Option<Table>>> = Vec::with_capacity(self.rules.len());
        for rule in &self.rules {
            let mut tables = Vec::with_capacity(rule.atoms.len());
            for atom in &rule.atoms {
                tables.push(match atom {
                    RuleAtom::Source(selector) => {
                        let rows: Vec<Row> = selector.select(&[])?.collect::<Result<_>>()?;
                        Some((selector.columns().to_vec(), rows))
                    }
                    RuleAtom::SelfRef(_) => None,
                });
            }
            sources.push(tables);
        }

        let is_recursive: Vec<bool> = self
            .rules
            .iter()
            .map(|rule| rule.atoms.iter().any(|a| matches!(a, RuleAtom::SelfRef(_))))
            .collect();

        let mut all: BTreeMap<Vec<u8>, Row> = BTreeMap::new();
        for (ri, rule) in self.rules.iter().enumerate() {
            if is_recursive[ri] {
                continue;
            }
            for row in self.eval_rule(rule, &sources[ri], None, &[], &[])? {
                all.entry(self.output_key(&row)?).or_insert(row);
            }
        }

        if !is_recursive.iter().any(|r| *r) {
            return Ok(all);
        }

        let mut delta: Vec<Row> = all.values().cloned().collect();
        while !delta.is_empty() {
            let full: Vec<Row> = all.values().cloned().collect();
            let mut next_delta: Vec<Row> = Vec::new();
            for (ri, rule) in self.rules.iter().enumerate() {
                if !is_recursive[ri] {
                    continue;
                }
                for (pos, atom) in rule.atoms.iter().enumerate() {
                    if !matches!(atom, RuleAtom::SelfRef(_)) {
                        continue;
                    }
                    for row in self.eval_rule(rule, &sources[ri], Some(pos), &delta, &full)? {
                        let key = self.output_key(&row)?;
                        if !all.contains_key(&key) {
                            all.insert(key, row.clone());
                            next_delta.push(row);
                        }
                    }
                }
            }
            delta = next_delta;
        }
        Ok(all)
    }

    /// Joins the rule's atoms left to right and projects to the output
    /// columns. `delta_pos` names the self occurrence that reads the
    /// previous step's new tuples; every other self occurrence reads the
    /// full accumulated set.
    fn eval_rule(
        &self,
        rule: &Rule<'a>,
        sources: &[Option<Table>],
        delta_pos: Option<usize>,
        delta: &[Row],
        full: &[Row],
    ) -> Result<Vec<Row>> {
        let mut acc: Option<Table> = None;
        for (i, atom) in rule.atoms.iter().enumerate() {
            let table = match (atom, &sources[i]) {
                (RuleAtom::Source(_), Some(table)) => table.clone(),
                (RuleAtom::SelfRef(mapping), _) => {
                    let rows = if delta_pos == Some(i) { delta } else { full };
                    let renamed = rows
                        .iter()
                        .map(|row| rename_row(row, mapping))
                        .collect::<Vec<_>>();
                    (self.self_columns(mapping), renamed)
                }
                (RuleAtom::Source(_), None) => {
                    bail!("rule atom {i} of query '{}' was not materialized", self.name)
                }
            };
            acc = Some(match acc {
                None => table,
                Some(joined) => hash_join(joined, table)?,
            });
        }
        let Some((columns, rows)) = acc else {
            return Ok(Vec::new());
        };
        for col in &self.columns {
            ensure!(
                columns.contains(col),
                "rule for query '{}' does not produce output column '{}'",
                self.name,
                col
            );
        }
        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let mut projected = Row::with_capacity(self.columns.len());
            for col in &self.columns {
                let value = row.get(col).ok_or_else(|| {
                    eyre!(
                        "rule for query '{}' does not produce output column '{}'",
                        self.name,
                        col
                    )
                })?;
                projected.insert(col.clone(), value.clone());
            }
            out.push(projected);
        }
        Ok(out)
    }

    fn self_columns(&self, mapping: &hashbrown::HashMap<String, String>) -> Vec<String> {
        self.columns
            .iter()
            .map(|col| mapping.get(col).cloned().unwrap_or_else(|| col.clone()))
            .collect()
    }

    fn output_key(&self, row: &Row) -> Result<Vec<u8>> {
        let mut values: Vec<Value> = Vec::with_capacity(self.columns.len());
        for col in &self.columns {
            let value = row
                .get(col)
                .ok_or_else(|| eyre!("query '{}' row is missing column '{col}'", self.name))?;
            values.push(value.clone());
        }
        Ok(encode_key(&values))
    }
}

impl Selector for Query<'_> {
    fn name(&self) -> &str {
        &self.name
    }

    fn columns(&self) -> &[String] {
        &self.columns
    }

    fn select<'s>(&'s self, ops: &[Op]) -> Result<RowIter<'s>> {
        Query::select(self, ops)
    }
}

fn rename_row(row: &Row, mapping: &hashbrown::HashMap<String, String>) -> Row {
    row.iter()
        .map(|(col, value)| {
            let name = mapping.get(col).cloned().unwrap_or_else(|| col.clone());
            (name, value.clone())
        })
        .collect()
}

/// Hash join on the columns both sides share, in build/probe order by
/// cardinality. Output columns are the union, left side's first.
fn hash_join(left: Table, right: Table) -> Result<Table> {
    let (left_columns, left_rows) = left;
    let (right_columns, right_rows) = right;
    let shared: Vec<String> = left_columns
        .iter()
        .filter(|col| right_columns.contains(*col))
        .cloned()
        .collect();
    let mut out_columns = left_columns.clone();
    for col in &right_columns {
        if !out_columns.contains(col) {
            out_columns.push(col.clone());
        }
    }

    let build_left = left_rows.len() <= right_rows.len();
    let (build, probe) = if build_left {
        (&left_rows, &right_rows)
    } else {
        (&right_rows, &left_rows)
    };

    let mut table: hashbrown::HashMap<Vec<u8>, Vec<usize>> = hashbrown::HashMap::new();
    for (i, row) in build.iter().enumerate() {
        table.entry(join_key(row, &shared)?).or_default().push(i);
    }

    let mut out = Vec::new();
    for probe_row in probe.iter() {
        let key = join_key(probe_row, &shared)?;
        let Some(hits) = table.get(&key) else {
            continue;
        };
        for &i in hits {
            let (left_row, right_row) = if build_left {
                (&build[i], probe_row)
            } else {
                (probe_row, &build[i])
            };
            let mut merged = left_row.clone();
            for (col, value) in right_row.iter() {
                merged.insert(col.clone(), value.clone());
            }
            out.push(merged);
        }
    }
    Ok((out_columns, out))
}

fn join_key(row: &Row, shared: &[String]) -> Result<Vec<u8>> {
    let mut values: Vec<Value> = Vec::with_capacity(shared.len());
    for col in shared {
        let value = row
            .get(col)
            .ok_or_else(|| eyre!("row is missing join column '{col}'"))?;
        values.push(value.clone());
    }
    Ok(encode_key(&values))
}

//! Field predicates: an operator, a field name, and a comparison value.
//!
//! Constructors mirror the caller-facing DSL; `apply` is the typed
//! fallback evaluation used where a predicate cannot be expressed as a
//! byte range (`ne`) or where no index is involved.

use crate::types::{compare, Value};
use eyre::Result;
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
    Eq,
    Ne,
    Gt,
    Lt,
    Ge,
    Le,
}

#[derive(Debug, Clone)]
pub struct Op {
    pub field: String,
    pub value: Value,
    pub kind: OpKind,
}

impl Op {
    fn new(field: impl Into<String>, value: impl Into<Value>, kind: OpKind) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
            kind,
        }
    }
}

pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Op {
    Op::new(field, value, OpKind::Eq)
}

pub fn ne(field: impl Into<String>, value: impl Into<Value>) -> Op {
    Op::new(field, value, OpKind::Ne)
}

pub fn gt(field: impl Into<String>, value: impl Into<Value>) -> Op {
    Op::new(field, value, OpKind::Gt)
}

pub fn lt(field: impl Into<String>, value: impl Into<Value>) -> Op {
    Op::new(field, value, OpKind::Lt)
}

pub fn ge(field: impl Into<String>, value: impl Into<Value>) -> Op {
    Op::new(field, value, OpKind::Ge)
}

pub fn le(field: impl Into<String>, value: impl Into<Value>) -> Op {
    Op::new(field, value, OpKind::Le)
}

/// Evaluates `op` against a concrete field value.
///
/// Fails when the value and the operand are of different types.
pub fn apply(value: &Value, op: &Op) -> Result<bool> {
    let ord = compare(value, &op.value)?;
    Ok(match op.kind {
        OpKind::Eq => ord == Ordering::Equal,
        OpKind::Ne => ord != Ordering::Equal,
        OpKind::Gt => ord == Ordering::Greater,
        OpKind::Lt => ord == Ordering::Less,
        OpKind::Ge => ord != Ordering::Less,
        OpKind::Le => ord != Ordering::Greater,
    })
}

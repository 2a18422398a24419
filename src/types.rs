//! # Runtime Value Representation
//!
//! `Value` is the tagged union rows are made of: signed and unsigned
//! integers at every width, both float widths, text, blobs, and ordered
//! tuples of these. Rows are plain column-name → `Value` maps.
//!
//! ## Comparison Semantics
//!
//! - Same-variant values compare in their native order.
//! - Floats compare by IEEE total order; `-0.0` and `+0.0` are equal.
//! - Tuples compare lexicographically, element by element, then by length.
//! - Cross-variant comparison is an error, never a silent coercion.

use eyre::{bail, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A row: mapping from column name to value.
pub type Row = hashbrown::HashMap<String, Value>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    Text(String),
    Blob(Vec<u8>),
    Tuple(Vec<Value>),
}

impl Value {
    /// Short type label used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::I8(_) => "i8",
            Value::I16(_) => "i16",
            Value::I32(_) => "i32",
            Value::I64(_) => "i64",
            Value::U8(_) => "u8",
            Value::U16(_) => "u16",
            Value::U32(_) => "u32",
            Value::U64(_) => "u64",
            Value::F32(_) => "f32",
            Value::F64(_) => "f64",
            Value::Text(_) => "text",
            Value::Blob(_) => "blob",
            Value::Tuple(_) => "tuple",
        }
    }
}

/// Compares two values of the same type.
///
/// Floats use `total_cmp`, with `-0.0` normalized so it equals `+0.0`,
/// matching the order the key encoding produces.
pub fn compare(a: &Value, b: &Value) -> Result<Ordering> {
    match (a, b) {
        (Value::I8(x), Value::I8(y)) => Ok(x.cmp(y)),
        (Value::I16(x), Value::I16(y)) => Ok(x.cmp(y)),
        (Value::I32(x), Value::I32(y)) => Ok(x.cmp(y)),
        (Value::I64(x), Value::I64(y)) => Ok(x.cmp(y)),
        (Value::U8(x), Value::U8(y)) => Ok(x.cmp(y)),
        (Value::U16(x), Value::U16(y)) => Ok(x.cmp(y)),
        (Value::U32(x), Value::U32(y)) => Ok(x.cmp(y)),
        (Value::U64(x), Value::U64(y)) => Ok(x.cmp(y)),
        (Value::F32(x), Value::F32(y)) => Ok(norm_f32(*x).total_cmp(&norm_f32(*y))),
        (Value::F64(x), Value::F64(y)) => Ok(norm_f64(*x).total_cmp(&norm_f64(*y))),
        (Value::Text(x), Value::Text(y)) => Ok(x.cmp(y)),
        (Value::Blob(x), Value::Blob(y)) => Ok(x.cmp(y)),
        (Value::Tuple(x), Value::Tuple(y)) => {
            for (ex, ey) in x.iter().zip(y.iter()) {
                match compare(ex, ey)? {
                    Ordering::Equal => continue,
                    other => return Ok(other),
                }
            }
            Ok(x.len().cmp(&y.len()))
        }
        _ => bail!("cannot compare {} with {}", a.type_name(), b.type_name()),
    }
}

fn norm_f32(v: f32) -> f32 {
    if v == 0.0 {
        0.0
    } else {
        v
    }
}

fn norm_f64(v: f64) -> f64 {
    if v == 0.0 {
        0.0
    } else {
        v
    }
}

macro_rules! value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v)
                }
            }
        )*
    };
}

value_from! {
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    f32 => F32,
    f64 => F64,
    String => Text,
    Vec<Value> => Tuple,
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Blob(v)
    }
}

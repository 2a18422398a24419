//! # Order-Preserving Key Encoding
//!
//! This module provides byte-comparable encoding for composite keys. All
//! encoded keys can be compared with a single `memcmp`: for any two
//! supported values of the same type, `a < b` iff `encode(a) < encode(b)`
//! lexicographically. Every range-scan policy in the store is stated in
//! terms of the byte order produced here.
//!
//! ## Type Tag Scheme
//!
//! Each encoded value starts with a tag byte:
//!
//! ```text
//! 0x10-0x13  signed integers (i8, i16, i32, i64)
//! 0x14-0x17  unsigned integers (u8, u16, u32, u64)
//! 0x20-0x21  floats (f32, f64)
//! 0x28-0x29  text, blob
//! 0x30       nested tuple
//! ```
//!
//! Values of different types never compare against each other upstream,
//! so the tag bytes only need to keep the type spaces disjoint.
//!
//! ## Integer Encoding
//!
//! Unsigned integers encode as fixed-width big-endian. Signed integers
//! flip the sign bit of the two's-complement big-endian representation,
//! which maps the value range onto the unsigned range monotonically:
//! `i64::MIN → 0x00…`, `-1 → 0x7F FF…`, `0 → 0x80 00…`, `i64::MAX → 0xFF…`.
//!
//! ## Float Encoding
//!
//! IEEE 754 bit manipulation preserves ordering:
//! - `-0.0` is normalized to `+0.0` before encoding
//! - negative floats: invert all bits
//! - non-negative floats: flip the sign bit
//!
//! ## Text and Blob Encoding
//!
//! Byte payloads use escape encoding so embedded zero bytes cannot
//! terminate the value early:
//!
//! ```text
//! 0x00 -> 0x00 0xFF   (escape)
//! terminator: 0x00 0x00
//! ```
//!
//! The terminator sorts below every payload byte, so a string sorts
//! before any of its extensions.
//!
//! ## Composite Keys
//!
//! A composite key is the flat concatenation of its elements' encodings
//! with no separator; every element encoding is self-delimiting, so
//! decoding recovers the elements and their byte offsets. A *nested*
//! tuple value (a tuple appearing as one element) is bracketed with a tag
//! and a terminator byte strictly below every type tag, so a shorter
//! tuple sorts before any longer tuple sharing its prefix.

use crate::types::Value;
use eyre::{bail, ensure, Result};
use smallvec::SmallVec;

pub mod tag {
    pub const TUPLE_END: u8 = 0x01;

    pub const I8: u8 = 0x10;
    pub const I16: u8 = 0x11;
    pub const I32: u8 = 0x12;
    pub const I64: u8 = 0x13;

    pub const U8: u8 = 0x14;
    pub const U16: u8 = 0x15;
    pub const U32: u8 = 0x16;
    pub const U64: u8 = 0x17;

    pub const F32: u8 = 0x20;
    pub const F64: u8 = 0x21;

    pub const TEXT: u8 = 0x28;
    pub const BLOB: u8 = 0x29;

    pub const TUPLE: u8 = 0x30;
}

/// Appends the encoding of a single value to `buf`.
pub fn encode_value(value: &Value, buf: &mut Vec<u8>) {
    match value {
        Value::I8(v) => {
            buf.push(tag::I8);
            buf.push((*v as u8) ^ 0x80);
        }
        Value::I16(v) => {
            buf.push(tag::I16);
            buf.extend_from_slice(&((*v as u16) ^ 0x8000).to_be_bytes());
        }
        Value::I32(v) => {
            buf.push(tag::I32);
            buf.extend_from_slice(&((*v as u32) ^ 0x8000_0000).to_be_bytes());
        }
        Value::I64(v) => {
            buf.push(tag::I64);
            buf.extend_from_slice(&((*v as u64) ^ 0x8000_0000_0000_0000).to_be_bytes());
        }
        Value::U8(v) => {
            buf.push(tag::U8);
            buf.push(*v);
        }
        Value::U16(v) => {
            buf.push(tag::U16);
            buf.extend_from_slice(&v.to_be_bytes());
        }
        Value::U32(v) => {
            buf.push(tag::U32);
            buf.extend_from_slice(&v.to_be_bytes());
        }
        Value::U64(v) => {
            buf.push(tag::U64);
            buf.extend_from_slice(&v.to_be_bytes());
        }
        Value::F32(v) => {
            buf.push(tag::F32);
            let normalized = if *v == 0.0 { 0.0f32 } else { *v };
            let bits = normalized.to_bits();
            let mapped = if bits & 0x8000_0000 != 0 {
                !bits
            } else {
                bits ^ 0x8000_0000
            };
            buf.extend_from_slice(&mapped.to_be_bytes());
        }
        Value::F64(v) => {
            buf.push(tag::F64);
            let normalized = if *v == 0.0 { 0.0f64 } else { *v };
            let bits = normalized.to_bits();
            let mapped = if bits & 0x8000_0000_0000_0000 != 0 {
                !bits
            } else {
                bits ^ 0x8000_0000_0000_0000
            };
            buf.extend_from_slice(&mapped.to_be_bytes());
        }
        Value::Text(v) => {
            buf.push(tag::TEXT);
            encode_terminated(v.as_bytes(), buf);
        }
        Value::Blob(v) => {
            buf.push(tag::BLOB);
            encode_terminated(v, buf);
        }
        Value::Tuple(elems) => {
            buf.push(tag::TUPLE);
            for e in elems {
                encode_value(e, buf);
            }
            buf.push(tag::TUPLE_END);
        }
    }
}

/// Encodes a single value into a fresh buffer.
pub fn encode_single(value: &Value) -> Vec<u8> {
    let mut buf = Vec::new();
    encode_value(value, &mut buf);
    buf
}

/// Encodes a composite key: the flat concatenation of element encodings.
pub fn encode_key(parts: &[Value]) -> Vec<u8> {
    let mut buf = Vec::new();
    for p in parts {
        encode_value(p, &mut buf);
    }
    buf
}

/// Encodes a value for use as a range endpoint or containment probe.
///
/// A top-level tuple is flattened into composite-key form so that it
/// lives in the same byte space as the index keys built by `encode_key`;
/// anything else encodes as a single element.
pub fn encode_ranged(value: &Value) -> Vec<u8> {
    match value {
        Value::Tuple(parts) => encode_key(parts),
        other => encode_single(other),
    }
}

/// Decodes one value from the front of `bytes`, returning it together
/// with the number of bytes consumed.
pub fn decode_value(bytes: &[u8]) -> Result<(Value, usize)> {
    ensure!(!bytes.is_empty(), "truncated key encoding");
    let t = bytes[0];
    let rest = &bytes[1..];
    match t {
        tag::I8 => {
            ensure!(!rest.is_empty(), "truncated i8 key encoding");
            Ok((Value::I8((rest[0] ^ 0x80) as i8), 2))
        }
        tag::I16 => {
            let raw = fixed::<2>(rest, "i16")?;
            Ok((Value::I16((u16::from_be_bytes(raw) ^ 0x8000) as i16), 3))
        }
        tag::I32 => {
            let raw = fixed::<4>(rest, "i32")?;
            Ok((
                Value::I32((u32::from_be_bytes(raw) ^ 0x8000_0000) as i32),
                5,
            ))
        }
        tag::I64 => {
            let raw = fixed::<8>(rest, "i64")?;
            Ok((
                Value::I64((u64::from_be_bytes(raw) ^ 0x8000_0000_0000_0000) as i64),
                9,
            ))
        }
        tag::U8 => {
            ensure!(!rest.is_empty(), "truncated u8 key encoding");
            Ok((Value::U8(rest[0]), 2))
        }
        tag::U16 => {
            let raw = fixed::<2>(rest, "u16")?;
            Ok((Value::U16(u16::from_be_bytes(raw)), 3))
        }
        tag::U32 => {
            let raw = fixed::<4>(rest, "u32")?;
            Ok((Value::U32(u32::from_be_bytes(raw)), 5))
        }
        tag::U64 => {
            let raw = fixed::<8>(rest, "u64")?;
            Ok((Value::U64(u64::from_be_bytes(raw)), 9))
        }
        tag::F32 => {
            let raw = fixed::<4>(rest, "f32")?;
            let mapped = u32::from_be_bytes(raw);
            let bits = if mapped & 0x8000_0000 != 0 {
                mapped ^ 0x8000_0000
            } else {
                !mapped
            };
            Ok((Value::F32(f32::from_bits(bits)), 5))
        }
        tag::F64 => {
            let raw = fixed::<8>(rest, "f64")?;
            let mapped = u64::from_be_bytes(raw);
            let bits = if mapped & 0x8000_0000_0000_0000 != 0 {
                mapped ^ 0x8000_0000_0000_0000
            } else {
                !mapped
            };
            Ok((Value::F64(f64::from_bits(bits)), 9))
        }
        tag::TEXT => {
            let (payload, n) = decode_terminated(rest)?;
            let text = String::from_utf8(payload)
                .map_err(|_| eyre::eyre!("key encoding holds invalid utf-8 text"))?;
            Ok((Value::Text(text), 1 + n))
        }
        tag::BLOB => {
            let (payload, n) = decode_terminated(rest)?;
            Ok((Value::Blob(payload), 1 + n))
        }
        tag::TUPLE => {
            let mut elems = Vec::new();
            let mut pos = 0;
            loop {
                ensure!(pos < rest.len(), "truncated tuple key encoding");
                if rest[pos] == tag::TUPLE_END {
                    return Ok((Value::Tuple(elems), 1 + pos + 1));
                }
                let (v, n) = decode_value(&rest[pos..])?;
                elems.push(v);
                pos += n;
            }
        }
        other => bail!("invalid key tag 0x{other:02x}"),
    }
}

/// A decoded composite key: the element values plus the byte offset at
/// which each element's encoding starts.
#[derive(Debug)]
pub struct DecodedKey {
    pub values: SmallVec<[Value; 4]>,
    pub offsets: SmallVec<[usize; 4]>,
}

/// Decodes a composite key produced by [`encode_key`].
pub fn decode_key(bytes: &[u8]) -> Result<DecodedKey> {
    let mut values = SmallVec::new();
    let mut offsets = SmallVec::new();
    let mut pos = 0;
    while pos < bytes.len() {
        offsets.push(pos);
        let (v, n) = decode_value(&bytes[pos..])?;
        values.push(v);
        pos += n;
    }
    Ok(DecodedKey { values, offsets })
}

fn fixed<const N: usize>(bytes: &[u8], what: &str) -> Result<[u8; N]> {
    ensure!(bytes.len() >= N, "truncated {what} key encoding");
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes[..N]);
    Ok(out)
}

fn encode_terminated(payload: &[u8], buf: &mut Vec<u8>) {
    for &b in payload {
        if b == 0x00 {
            buf.push(0x00);
            buf.push(0xFF);
        } else {
            buf.push(b);
        }
    }
    buf.push(0x00);
    buf.push(0x00);
}

fn decode_terminated(bytes: &[u8]) -> Result<(Vec<u8>, usize)> {
    let mut out = Vec::new();
    let mut pos = 0;
    loop {
        ensure!(pos < bytes.len(), "unterminated key encoding");
        let b = bytes[pos];
        if b != 0x00 {
            out.push(b);
            pos += 1;
            continue;
        }
        ensure!(pos + 1 < bytes.len(), "unterminated key encoding");
        match bytes[pos + 1] {
            0x00 => return Ok((out, pos + 2)),
            0xFF => {
                out.push(0x00);
                pos += 2;
            }
            other => bail!("invalid escape byte 0x{other:02x} in key encoding"),
        }
    }
}

//! # Key Ranges and Predicate Compilation
//!
//! A [`KeyRange`] is a half-open-capable interval over codec-encoded
//! bytes with per-endpoint inclusivity. [`to_ranges`] fuses a conjunction
//! of operators into one range per field by interval intersection; the
//! fold is commutative and associative, so predicate order never changes
//! the result.
//!
//! `ne` cannot be expressed as a single interval: it registers its field
//! with the full range (so index selection still sees the field) and is
//! enforced later by residual evaluation.

use crate::encoding::ordered::encode_ranged;
use crate::query::op::{Op, OpKind};
use eyre::Result;
use hashbrown::HashMap;
use std::ops::Bound;

#[derive(Debug, Clone, Default)]
pub struct KeyRange {
    pub start: Option<Vec<u8>>,
    pub end: Option<Vec<u8>>,
    pub include_start: bool,
    pub include_end: bool,
}

impl KeyRange {
    /// The unbounded range: contains every key.
    pub fn unbounded() -> Self {
        Self {
            start: None,
            end: None,
            include_start: true,
            include_end: true,
        }
    }

    /// The degenerate range containing exactly `key`.
    pub fn point(key: Vec<u8>) -> Self {
        Self {
            start: Some(key.clone()),
            end: Some(key),
            include_start: true,
            include_end: true,
        }
    }

    /// True iff `key` lies inside the range, honoring inclusivity.
    pub fn contains(&self, key: &[u8]) -> bool {
        if let Some(start) = &self.start {
            match key.cmp(start.as_slice()) {
                std::cmp::Ordering::Less => return false,
                std::cmp::Ordering::Equal if !self.include_start => return false,
                _ => {}
            }
        }
        self.below_end(key)
    }

    /// True iff `key` has not passed the upper endpoint. The stop
    /// condition for ordered scans: once this turns false it stays false.
    pub fn below_end(&self, key: &[u8]) -> bool {
        match &self.end {
            None => true,
            Some(end) => match key.cmp(end.as_slice()) {
                std::cmp::Ordering::Less => true,
                std::cmp::Ordering::Equal => self.include_end,
                std::cmp::Ordering::Greater => false,
            },
        }
    }

    /// True iff no key can satisfy the range.
    pub fn is_empty(&self) -> bool {
        match (&self.start, &self.end) {
            (Some(start), Some(end)) => match start.cmp(end) {
                std::cmp::Ordering::Greater => true,
                std::cmp::Ordering::Equal => !(self.include_start && self.include_end),
                std::cmp::Ordering::Less => false,
            },
            _ => false,
        }
    }

    /// Cursor bounds for engines that take `RangeBounds` directly.
    pub fn as_bounds(&self) -> (Bound<&[u8]>, Bound<&[u8]>) {
        let start = match &self.start {
            None => Bound::Unbounded,
            Some(k) if self.include_start => Bound::Included(k.as_slice()),
            Some(k) => Bound::Excluded(k.as_slice()),
        };
        let end = match &self.end {
            None => Bound::Unbounded,
            Some(k) if self.include_end => Bound::Included(k.as_slice()),
            Some(k) => Bound::Excluded(k.as_slice()),
        };
        (start, end)
    }

    /// A byte string approximating the span between the endpoints,
    /// compared by byte order; a shorter distance means a narrower range.
    ///
    /// The approximation treats the first eight bytes of each endpoint as
    /// a big-endian magnitude, with missing endpoints pinned to the
    /// extremes. Exact only in that an equality range yields zero and
    /// wider ranges never yield less than narrower ones sharing an
    /// endpoint; that is all index selection needs.
    pub fn distance(&self) -> [u8; 8] {
        let lo = match &self.start {
            None => 0,
            Some(key) => Self::magnitude(key),
        };
        let hi = match &self.end {
            None => u64::MAX,
            Some(key) => Self::magnitude(key),
        };
        hi.saturating_sub(lo).to_be_bytes()
    }

    fn magnitude(key: &[u8]) -> u64 {
        let mut raw = [0u8; 8];
        for (i, b) in key.iter().take(8).enumerate() {
            raw[i] = *b;
        }
        u64::from_be_bytes(raw)
    }

    fn narrow_start(&mut self, key: Vec<u8>, inclusive: bool) {
        let replace = match &self.start {
            None => true,
            Some(current) => match key.cmp(current) {
                std::cmp::Ordering::Greater => true,
                std::cmp::Ordering::Equal => self.include_start && !inclusive,
                std::cmp::Ordering::Less => false,
            },
        };
        if replace {
            self.start = Some(key);
            self.include_start = inclusive;
        }
    }

    fn narrow_end(&mut self, key: Vec<u8>, inclusive: bool) {
        let replace = match &self.end {
            None => true,
            Some(current) => match key.cmp(current) {
                std::cmp::Ordering::Less => true,
                std::cmp::Ordering::Equal => self.include_end && !inclusive,
                std::cmp::Ordering::Greater => false,
            },
        };
        if replace {
            self.end = Some(key);
            self.include_end = inclusive;
        }
    }
}

/// Compiles a conjunction of operators into per-field key ranges.
pub fn to_ranges(ops: &[Op]) -> Result<HashMap<String, KeyRange>> {
    let mut ranges: HashMap<String, KeyRange> = HashMap::new();
    for op in ops {
        let range = ranges
            .entry(op.field.clone())
            .or_insert_with(KeyRange::unbounded);
        let key = encode_ranged(&op.value);
        match op.kind {
            OpKind::Eq => {
                range.narrow_start(key.clone(), true);
                range.narrow_end(key, true);
            }
            OpKind::Gt => range.narrow_start(key, false),
            OpKind::Ge => range.narrow_start(key, true),
            OpKind::Lt => range.narrow_end(key, false),
            OpKind::Le => range.narrow_end(key, true),
            // Not expressible as one interval; the field keeps whatever
            // range its other operators produce and the operator itself
            // is enforced residually.
            OpKind::Ne => {}
        }
    }
    Ok(ranges)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::ordered::encode_single;
    use crate::query::op::{eq, ge, gt, le, lt, ne};
    use crate::types::Value;

    fn enc(v: i64) -> Vec<u8> {
        encode_single(&Value::I64(v))
    }

    #[test]
    fn eq_produces_point_range() {
        let ranges = to_ranges(&[eq("ts", 10i64)]).unwrap();
        let r = &ranges["ts"];
        assert_eq!(r.start.as_deref(), Some(enc(10).as_slice()));
        assert_eq!(r.end.as_deref(), Some(enc(10).as_slice()));
        assert!(r.include_start && r.include_end);
        assert!(!r.is_empty());
        assert_eq!(r.distance(), [0u8; 8]);
    }

    #[test]
    fn conjunction_intersects_per_field() {
        let ranges = to_ranges(&[ge("ts", 15i64), lt("ts", 35i64), ge("ts", 10i64)]).unwrap();
        let r = &ranges["ts"];
        assert_eq!(r.start.as_deref(), Some(enc(15).as_slice()));
        assert!(r.include_start);
        assert_eq!(r.end.as_deref(), Some(enc(35).as_slice()));
        assert!(!r.include_end);
    }

    #[test]
    fn intersection_is_order_insensitive() {
        let a = to_ranges(&[gt("x", 1i64), le("x", 9i64), ge("x", 3i64)]).unwrap();
        let b = to_ranges(&[ge("x", 3i64), gt("x", 1i64), le("x", 9i64)]).unwrap();
        let ra = &a["x"];
        let rb = &b["x"];
        assert_eq!(ra.start, rb.start);
        assert_eq!(ra.end, rb.end);
        assert_eq!(ra.include_start, rb.include_start);
        assert_eq!(ra.include_end, rb.include_end);
    }

    #[test]
    fn exclusive_beats_inclusive_at_same_endpoint() {
        let ranges = to_ranges(&[ge("x", 5i64), gt("x", 5i64)]).unwrap();
        assert!(!ranges["x"].include_start);
        let ranges = to_ranges(&[le("x", 5i64), lt("x", 5i64)]).unwrap();
        assert!(!ranges["x"].include_end);
    }

    #[test]
    fn contradiction_yields_empty_range() {
        let ranges = to_ranges(&[gt("x", 9i64), lt("x", 3i64)]).unwrap();
        assert!(ranges["x"].is_empty());

        let ranges = to_ranges(&[eq("x", 5i64), gt("x", 5i64)]).unwrap();
        assert!(ranges["x"].is_empty());
    }

    #[test]
    fn ne_registers_field_with_full_range() {
        let ranges = to_ranges(&[ne("x", 5i64)]).unwrap();
        let r = &ranges["x"];
        assert!(r.start.is_none() && r.end.is_none());
        assert!(r.contains(&enc(5)));
    }

    #[test]
    fn contains_honors_inclusivity() {
        let ranges = to_ranges(&[ge("x", 2i64), lt("x", 4i64)]).unwrap();
        let r = &ranges["x"];
        assert!(r.contains(&enc(2)));
        assert!(r.contains(&enc(3)));
        assert!(!r.contains(&enc(4)));
        assert!(!r.contains(&enc(1)));
    }

    #[test]
    fn distance_orders_narrow_before_wide() {
        let narrow = to_ranges(&[eq("a", 1i64)]).unwrap();
        let wide = to_ranges(&[ge("b", 0i64)]).unwrap();
        assert!(narrow["a"].distance() < wide["b"].distance());
    }
}

//! Secondary index storage.
//!
//! Each declared index owns one bucket of composite keys with empty
//! values. A composite key is the flat encoding of the index's key
//! columns followed by the encoded row id, so entries order first by key
//! tuple and then by row id, and a range over key tuples maps directly
//! onto a byte-prefix range over the bucket.

use crate::encoding::ordered::{decode_key, encode_key};
use crate::query::range::KeyRange;
use crate::storage::bucket::{Bucket, BucketRange};
use crate::types::Value;
use eyre::{bail, Result};
use hashbrown::HashMap;

#[derive(Debug)]
pub struct IndexStore<'txn> {
    relation: String,
    buckets: HashMap<String, Bucket<'txn>>,
}

impl<'txn> IndexStore<'txn> {
    pub fn new(relation: &str, buckets: HashMap<String, Bucket<'txn>>) -> Self {
        Self {
            relation: relation.to_string(),
            buckets,
        }
    }

    /// Stores the entry for `key_parts` and `id_bytes`, returning the
    /// exact key bytes written (recorded in the reverse index so deletes
    /// can remove the entry without re-deriving it).
    pub fn insert(&mut self, name: &str, key_parts: &[Value], id_bytes: &[u8]) -> Result<Vec<u8>> {
        let mut key = encode_key(key_parts);
        key.extend_from_slice(id_bytes);
        let relation = &self.relation;
        let Some(bucket) = self.buckets.get_mut(name) else {
            bail!("index '{name}' not found in relation '{relation}'");
        };
        bucket.put(&key, &[])?;
        Ok(key)
    }

    /// Removes the exact entry `key_bytes`.
    pub fn delete(&mut self, name: &str, key_bytes: &[u8]) -> Result<()> {
        let relation = &self.relation;
        let Some(bucket) = self.buckets.get_mut(name) else {
            bail!("index '{name}' not found in relation '{relation}'");
        };
        bucket.delete(key_bytes)
    }

    /// Scans the index over `range`, yielding the encoded row id of each
    /// entry whose leading key components fall inside the range. `width`
    /// is the number of key columns; entries with any other component
    /// count are skipped.
    pub fn get(&self, name: &str, range: KeyRange, width: usize) -> Result<IndexIter<'_>> {
        let Some(bucket) = self.buckets.get(name) else {
            bail!("index '{name}' not found in relation '{}'", self.relation);
        };
        let inner = bucket.scan_from(range.start.as_deref())?;
        Ok(IndexIter {
            inner,
            range,
            width,
            done: false,
        })
    }
}

/// Cursor over encoded row ids drawn from one index bucket.
///
/// Stops as soon as a leading key component passes the range's upper
/// endpoint; everything after it in the bucket is out of range too.
pub struct IndexIter<'a> {
    inner: BucketRange<'a>,
    range: KeyRange,
    width: usize,
    done: bool,
}

impl Iterator for IndexIter<'_> {
    type Item = Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            let (key, _) = match self.inner.next()? {
                Ok(kv) => kv,
                Err(e) => return Some(Err(e)),
            };
            let decoded = match decode_key(&key) {
                Ok(decoded) => decoded,
                Err(e) => return Some(Err(e)),
            };
            if decoded.values.len() != self.width + 1 {
                continue;
            }
            if !matches!(decoded.values[self.width], Value::U64(_)) {
                continue;
            }
            let id_offset = decoded.offsets[self.width];
            let prefix = &key[..id_offset];
            if !self.range.below_end(prefix) {
                self.done = true;
                return None;
            }
            if !self.range.contains(prefix) {
                continue;
            }
            return Some(Ok(key[id_offset..].to_vec()));
        }
    }
}

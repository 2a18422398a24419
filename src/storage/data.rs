//! Primary row storage.
//!
//! Rows live in the relation's data bucket keyed by the order-preserving
//! encoding of a monotonically increasing `u64` row id, so cursor order
//! equals insertion order. The sequence counter is persisted in the meta
//! bucket and is never rewound: deleted ids are not reused.

use crate::codec::ValueCodec;
use crate::encoding::ordered::encode_single;
use crate::query::range::KeyRange;
use crate::storage::bucket::{Bucket, BucketRange};
use crate::types::{Row, Value};
use eyre::{ensure, Result};

pub(crate) const SEQ_KEY: &[u8] = b"seq";

#[derive(Debug)]
pub struct DataStore<'txn, C: ValueCodec> {
    bucket: Bucket<'txn>,
    meta: Bucket<'txn>,
    codec: C,
}

impl<'txn, C: ValueCodec> DataStore<'txn, C> {
    pub fn new(bucket: Bucket<'txn>, meta: Bucket<'txn>, codec: C) -> Self {
        Self {
            bucket,
            meta,
            codec,
        }
    }

    /// Allocates the next row id, stores the serialized row under its
    /// encoding, and returns the encoded id.
    pub fn insert(&mut self, row: &Row) -> Result<Vec<u8>> {
        let id = self.next_sequence()?;
        let id_bytes = encode_single(&Value::U64(id));
        let payload = self.codec.marshal(row)?;
        self.bucket.put(&id_bytes, &payload)?;
        Ok(id_bytes)
    }

    /// Cursor scan over the primary bucket honoring `range`.
    pub fn get(&self, range: &KeyRange) -> Result<DataIter<'_, C>> {
        Ok(DataIter {
            inner: self.bucket.range(range.as_bounds())?,
            codec: self.codec.clone(),
        })
    }

    /// Point lookup by encoded row id.
    pub fn get_by_id(&self, id: &[u8]) -> Result<Option<Row>> {
        match self.bucket.get(id)? {
            Some(payload) => Ok(Some(self.codec.unmarshal(&payload)?)),
            None => Ok(None),
        }
    }

    pub fn delete(&mut self, id: &[u8]) -> Result<()> {
        self.bucket.delete(id)
    }

    fn next_sequence(&mut self) -> Result<u64> {
        let last = match self.meta.get(SEQ_KEY)? {
            Some(raw) => {
                ensure!(
                    raw.len() == 8,
                    "corrupt sequence entry in bucket '{}'",
                    self.meta.name()
                );
                let mut bytes = [0u8; 8];
                bytes.copy_from_slice(&raw);
                u64::from_be_bytes(bytes)
            }
            None => 0,
        };
        let next = last + 1;
        self.meta.put(SEQ_KEY, &next.to_be_bytes())?;
        Ok(next)
    }
}

/// Cursor over `(encoded row id, row)` pairs.
pub struct DataIter<'a, C: ValueCodec> {
    inner: BucketRange<'a>,
    codec: C,
}

impl<C: ValueCodec> Iterator for DataIter<'_, C> {
    type Item = Result<(Vec<u8>, Row)>;

    fn next(&mut self) -> Option<Self::Item> {
        let (key, value) = match self.inner.next()? {
            Ok(kv) => kv,
            Err(e) => return Some(Err(e)),
        };
        Some(self.codec.unmarshal::<Row>(&value).map(|row| (key, row)))
    }
}

//! Reverse index storage.
//!
//! For every live row the reverse bucket records the exact index key
//! bytes written on its behalf, keyed by encoded row id. Deletes read
//! this record to remove index entries by exact key; recomputing keys
//! from field values would break if value encodings were ever
//! normalized.

use crate::codec::ValueCodec;
use crate::storage::bucket::Bucket;
use eyre::Result;
use hashbrown::HashMap;

/// Index name → exact stored key bytes.
pub type IndexKeys = HashMap<String, Vec<u8>>;

#[derive(Debug)]
pub struct ReverseIndexStore<'txn, C: ValueCodec> {
    bucket: Bucket<'txn>,
    codec: C,
}

impl<'txn, C: ValueCodec> ReverseIndexStore<'txn, C> {
    pub fn new(bucket: Bucket<'txn>, codec: C) -> Self {
        Self { bucket, codec }
    }

    pub fn insert(&mut self, id: &[u8], keys: &IndexKeys) -> Result<()> {
        let payload = self.codec.marshal(keys)?;
        self.bucket.put(id, &payload)
    }

    /// A missing record for a live row means the stores disagree.
    pub fn get(&self, id: &[u8]) -> Result<IndexKeys> {
        match self.bucket.get(id)? {
            Some(payload) => self.codec.unmarshal(&payload),
            None => eyre::bail!(
                "reverse index entry missing for row in bucket '{}'",
                self.bucket.name()
            ),
        }
    }

    pub fn delete(&mut self, id: &[u8]) -> Result<()> {
        self.bucket.delete(id)
    }
}

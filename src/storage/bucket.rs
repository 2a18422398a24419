//! Bucket adapter over the underlying B-tree engine.
//!
//! A [`Bucket`] wraps one redb table under a path-style name and exposes
//! the contract the stores need: point get/put/delete and ordered range
//! cursors over raw `&[u8]` keys. Buckets opened inside a read-only
//! transaction reject mutation. Cursors copy key and value bytes out of
//! the engine's access guards; dropping a cursor releases its resources.

use eyre::{bail, Result};
use redb::ReadableTable;
use std::ops::Bound;

pub struct Bucket<'txn> {
    name: String,
    inner: Inner<'txn>,
}

impl<'txn> std::fmt::Debug for Bucket<'txn> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bucket").field("name", &self.name).finish()
    }
}

enum Inner<'txn> {
    Write(redb::Table<'txn, &'static [u8], &'static [u8]>),
    Read(redb::ReadOnlyTable<&'static [u8], &'static [u8]>),
}

impl<'txn> Bucket<'txn> {
    pub(crate) fn write(
        name: &str,
        table: redb::Table<'txn, &'static [u8], &'static [u8]>,
    ) -> Self {
        Self {
            name: name.to_string(),
            inner: Inner::Write(table),
        }
    }

    pub(crate) fn read(
        name: &str,
        table: redb::ReadOnlyTable<&'static [u8], &'static [u8]>,
    ) -> Self {
        Self {
            name: name.to_string(),
            inner: Inner::Read(table),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let guard = match &self.inner {
            Inner::Write(table) => table.get(key)?,
            Inner::Read(table) => table.get(key)?,
        };
        Ok(guard.map(|g| g.value().to_vec()))
    }

    pub fn put(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        match &mut self.inner {
            Inner::Write(table) => {
                table.insert(key, value)?;
                Ok(())
            }
            Inner::Read(_) => bail!("bucket '{}' is read-only", self.name),
        }
    }

    /// Removes `key`. Idempotent: deleting an absent key is not an error.
    pub fn delete(&mut self, key: &[u8]) -> Result<()> {
        match &mut self.inner {
            Inner::Write(table) => {
                table.remove(key)?;
                Ok(())
            }
            Inner::Read(_) => bail!("bucket '{}' is read-only", self.name),
        }
    }

    /// Ordered cursor over `bounds`.
    pub fn range(&self, bounds: (Bound<&[u8]>, Bound<&[u8]>)) -> Result<BucketRange<'_>> {
        let inner: RawRange<'_> = match &self.inner {
            Inner::Write(table) => Box::new(table.range::<&[u8]>(bounds)?.map(
                |item| -> Result<(Vec<u8>, Vec<u8>)> {
                    let (key, value) = item?;
                    Ok((key.value().to_vec(), value.value().to_vec()))
                },
            )),
            Inner::Read(table) => Box::new(table.range::<&[u8]>(bounds)?.map(
                |item| -> Result<(Vec<u8>, Vec<u8>)> {
                    let (key, value) = item?;
                    Ok((key.value().to_vec(), value.value().to_vec()))
                },
            )),
        };
        Ok(BucketRange { inner })
    }

    /// Ordered cursor from `start` (inclusive) to the end of the bucket;
    /// from the first key when `start` is `None`.
    pub fn scan_from(&self, start: Option<&[u8]>) -> Result<BucketRange<'_>> {
        let lower = match start {
            Some(key) => Bound::Included(key),
            None => Bound::Unbounded,
        };
        self.range((lower, Bound::Unbounded))
    }
}

type RawRange<'a> = Box<dyn Iterator<Item = Result<(Vec<u8>, Vec<u8>)>> + 'a>;

/// Pull-based cursor yielding owned `(key, value)` pairs.
pub struct BucketRange<'a> {
    inner: RawRange<'a>,
}

impl Iterator for BucketRange<'_> {
    type Item = Result<(Vec<u8>, Vec<u8>)>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }
}

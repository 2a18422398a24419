//! # Transactions
//!
//! A [`Tx`] wraps one transaction of the underlying B-tree engine,
//! writable or read-only, and hands out relation handles scoped to it.
//! Every bucket a relation touches is opened through the transaction, so
//! commit and rollback cover all three stores together; relation handles
//! and their iterators borrow the transaction and cannot outlive it.

use crate::codec::ValueCodec;
use crate::recursive::Query;
use crate::relation::Persistent;
use crate::schema::{RelationDef, RelationMeta};
use crate::storage::bucket::Bucket;
use crate::storage::data::DataStore;
use crate::storage::index::IndexStore;
use crate::storage::reverse::ReverseIndexStore;
use eyre::{ensure, eyre, Result};
use hashbrown::HashMap;
use redb::TableDefinition;

pub(crate) const SCHEMA_KEY: &[u8] = b"schema";

pub struct Tx<C: ValueCodec> {
    inner: TxInner,
    codec: C,
}

enum TxInner {
    Write(redb::WriteTransaction),
    Read(redb::ReadTransaction),
}

impl<C: ValueCodec> Tx<C> {
    pub(crate) fn write(txn: redb::WriteTransaction, codec: C) -> Self {
        Self {
            inner: TxInner::Write(txn),
            codec,
        }
    }

    pub(crate) fn read(txn: redb::ReadTransaction, codec: C) -> Self {
        Self {
            inner: TxInner::Read(txn),
            codec,
        }
    }

    pub fn writable(&self) -> bool {
        matches!(self.inner, TxInner::Write(_))
    }

    /// Creates a relation: validates and persists its schema, then
    /// opens the backing buckets. Fails if the relation already exists.
    pub fn create_persistent(&self, name: &str, def: RelationDef) -> Result<Persistent<'_, C>> {
        ensure!(
            self.writable(),
            "cannot create relation '{name}' in a read-only transaction"
        );
        let meta = def.into_meta()?;
        let mut meta_bucket = self.open_bucket(&meta_bucket_name(name))?;
        ensure!(
            meta_bucket.get(SCHEMA_KEY)?.is_none(),
            "relation '{name}' already exists"
        );
        meta_bucket.put(SCHEMA_KEY, &self.codec.marshal(&meta)?)?;
        self.assemble(name, meta, meta_bucket)
    }

    /// Opens an existing relation by reading its persisted schema.
    pub fn load_persistent(&self, name: &str) -> Result<Persistent<'_, C>> {
        let meta_bucket = self
            .open_bucket_opt(&meta_bucket_name(name))?
            .ok_or_else(|| eyre!("relation '{name}' not found"))?;
        let raw = meta_bucket
            .get(SCHEMA_KEY)?
            .ok_or_else(|| eyre!("relation '{name}' not found"))?;
        let meta: RelationMeta = self.codec.unmarshal(&raw)?;
        self.assemble(name, meta, meta_bucket)
    }

    /// Creates a virtual relation defined by rules. Purely in-memory;
    /// nothing is persisted.
    pub fn create_query<'q>(&self, name: &str, columns: &[&str], recursive: bool) -> Query<'q> {
        Query::new(name, columns, recursive)
    }

    pub fn commit(self) -> Result<()> {
        match self.inner {
            TxInner::Write(txn) => txn.commit()?,
            TxInner::Read(_) => {}
        }
        Ok(())
    }

    pub fn rollback(self) -> Result<()> {
        match self.inner {
            TxInner::Write(txn) => txn.abort()?,
            TxInner::Read(_) => {}
        }
        Ok(())
    }

    fn assemble<'s>(
        &'s self,
        name: &str,
        meta: RelationMeta,
        meta_bucket: Bucket<'s>,
    ) -> Result<Persistent<'s, C>> {
        let data_bucket = self.open_bucket(&data_bucket_name(name))?;
        let reverse_bucket = self.open_bucket(&reverse_bucket_name(name))?;
        let mut index_buckets = HashMap::with_capacity(meta.indexes.len());
        for spec in &meta.indexes {
            index_buckets.insert(
                spec.name.clone(),
                self.open_bucket(&index_bucket_name(name, &spec.name))?,
            );
        }
        Ok(Persistent::new(
            name,
            meta,
            DataStore::new(data_bucket, meta_bucket, self.codec.clone()),
            IndexStore::new(name, index_buckets),
            ReverseIndexStore::new(reverse_bucket, self.codec.clone()),
        ))
    }

    fn open_bucket(&self, name: &str) -> Result<Bucket<'_>> {
        self.open_bucket_opt(name)?
            .ok_or_else(|| eyre!("bucket '{name}' does not exist"))
    }

    /// Opens a bucket. In a write transaction the bucket is created on
    /// first open; in a read-only transaction a missing bucket is `None`.
    fn open_bucket_opt(&self, name: &str) -> Result<Option<Bucket<'_>>> {
        match &self.inner {
            TxInner::Write(txn) => {
                let table = txn.open_table(TableDefinition::<&[u8], &[u8]>::new(name))?;
                Ok(Some(Bucket::write(name, table)))
            }
            TxInner::Read(txn) => {
                match txn.open_table(TableDefinition::<&[u8], &[u8]>::new(name)) {
                    Ok(table) => Ok(Some(Bucket::read(name, table))),
                    Err(redb::TableError::TableDoesNotExist(_)) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            }
        }
    }
}

fn meta_bucket_name(relation: &str) -> String {
    format!("rel/{relation}/meta")
}

fn data_bucket_name(relation: &str) -> String {
    format!("rel/{relation}/data")
}

fn reverse_bucket_name(relation: &str) -> String {
    format!("rel/{relation}/reverseIdx")
}

fn index_bucket_name(relation: &str, index: &str) -> String {
    format!("rel/{relation}/indexes/{index}")
}

//! # Database Front End
//!
//! [`Database`] owns the underlying B-tree file and the value codec, and
//! hands out transactions. The codec is fixed when the database is
//! opened and threaded through every handle; a database must be reopened
//! with the codec it was written with.
//!
//! ```rust,ignore
//! let db = Database::create("./app.thunder")?;
//! let tx = db.begin(true)?;
//! let mut users = tx.create_persistent("users", def)?;
//! users.insert(row! { "id" => "1", "username" => "alice" })?;
//! drop(users);
//! tx.commit()?;
//! ```

use crate::codec::{JsonCodec, ValueCodec};
use crate::transaction::Tx;
use eyre::{eyre, Result};
use std::path::{Path, PathBuf};

pub struct Database<C: ValueCodec = JsonCodec> {
    db: redb::Database,
    codec: C,
}

impl Database<JsonCodec> {
    /// Creates (or opens) a database file with the default JSON codec.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        Self::builder().path(path).create()
    }

    /// Opens an existing database file with the default JSON codec.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::builder().path(path).open()
    }

    pub fn builder() -> DatabaseBuilder<JsonCodec> {
        DatabaseBuilder {
            path: None,
            codec: JsonCodec,
        }
    }
}

impl<C: ValueCodec> Database<C> {
    /// Begins a transaction. At most one writable transaction exists at
    /// a time; read-only transactions proceed in parallel against the
    /// last committed state.
    pub fn begin(&self, writable: bool) -> Result<Tx<C>> {
        if writable {
            Ok(Tx::write(self.db.begin_write()?, self.codec.clone()))
        } else {
            Ok(Tx::read(self.db.begin_read()?, self.codec.clone()))
        }
    }
}

pub struct DatabaseBuilder<C: ValueCodec> {
    path: Option<PathBuf>,
    codec: C,
}

impl<C: ValueCodec> DatabaseBuilder<C> {
    pub fn path(mut self, path: impl AsRef<Path>) -> Self {
        self.path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Swaps the value codec the database will marshal payloads with.
    pub fn codec<C2: ValueCodec>(self, codec: C2) -> DatabaseBuilder<C2> {
        DatabaseBuilder {
            path: self.path,
            codec,
        }
    }

    pub fn create(self) -> Result<Database<C>> {
        let path = self.path.ok_or_else(|| eyre!("database path not set"))?;
        Ok(Database {
            db: redb::Database::create(path)?,
            codec: self.codec,
        })
    }

    pub fn open(self) -> Result<Database<C>> {
        let path = self.path.ok_or_else(|| eyre!("database path not set"))?;
        Ok(Database {
            db: redb::Database::open(path)?,
            codec: self.codec,
        })
    }
}

//! # Persistence Tests
//!
//! Schemas and rows survive reopening the database file, under each of
//! the shipped value codecs.

use tempfile::TempDir;
use thunder::query::eq;
use thunder::{
    row, BincodeCodec, ColumnDef, Database, MsgpackCodec, RelationDef, Row, Value, ValueCodec,
};

fn users_def() -> RelationDef {
    RelationDef::new([
        ColumnDef::new("id"),
        ColumnDef::new("username").indexed(),
        ColumnDef::new("role"),
    ])
}

fn write_users<C: ValueCodec>(db: &Database<C>) {
    let tx = db.begin(true).unwrap();
    let mut users = tx.create_persistent("users", users_def()).unwrap();
    users
        .insert(row! { "id" => "1", "username" => "alice", "role" => "admin" })
        .unwrap();
    users
        .insert(row! { "id" => "2", "username" => "bob", "role" => "user" })
        .unwrap();
    drop(users);
    tx.commit().unwrap();
}

fn read_alice<C: ValueCodec>(db: &Database<C>) -> Vec<Row> {
    let tx = db.begin(false).unwrap();
    let users = tx.load_persistent("users").unwrap();
    users
        .select(&[eq("username", "alice")])
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap()
}

#[test]
fn reopened_database_serves_persisted_rows() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("test.thunder");

    let db = Database::create(&path).unwrap();
    write_users(&db);
    drop(db);

    let db = Database::open(&path).unwrap();
    let rows = read_alice(&db);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["role"], Value::Text("admin".into()));
}

#[test]
fn loaded_relation_accepts_further_writes() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("test.thunder");

    let db = Database::create(&path).unwrap();
    write_users(&db);

    let tx = db.begin(true).unwrap();
    let mut users = tx.load_persistent("users").unwrap();
    users
        .insert(row! { "id" => "3", "username" => "carol", "role" => "user" })
        .unwrap();
    // The loaded schema still enforces its indexes.
    let rows = users
        .select(&[eq("username", "carol")])
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    assert_eq!(rows.len(), 1);
    drop(users);
    tx.commit().unwrap();
}

#[test]
fn msgpack_codec_roundtrips_through_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("test.thunder");

    let db = Database::builder()
        .path(&path)
        .codec(MsgpackCodec)
        .create()
        .unwrap();
    write_users(&db);
    drop(db);

    let db = Database::builder()
        .path(&path)
        .codec(MsgpackCodec)
        .open()
        .unwrap();
    assert_eq!(read_alice(&db).len(), 1);
}

#[test]
fn bincode_codec_roundtrips_through_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("test.thunder");

    let db = Database::builder()
        .path(&path)
        .codec(BincodeCodec)
        .create()
        .unwrap();
    write_users(&db);
    drop(db);

    let db = Database::builder()
        .path(&path)
        .codec(BincodeCodec)
        .open()
        .unwrap();
    assert_eq!(read_alice(&db).len(), 1);
}

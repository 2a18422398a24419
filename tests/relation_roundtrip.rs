//! # Relation Round-Trip Tests
//!
//! Insert/select/delete against a relation with a secondary index, and
//! the visibility rules across commit, rollback, and read-only
//! transactions.

use tempfile::TempDir;
use thunder::query::eq;
use thunder::{row, ColumnDef, Database, RelationDef, Row, Value};

fn test_db() -> (TempDir, Database) {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::create(dir.path().join("test.thunder")).unwrap();
    (dir, db)
}

fn users_def() -> RelationDef {
    RelationDef::new([
        ColumnDef::new("id"),
        ColumnDef::new("username").indexed(),
        ColumnDef::new("role"),
    ])
}

fn collect(rows: thunder::relation::Rows<'_, '_, thunder::JsonCodec>) -> Vec<Row> {
    rows.collect::<Result<Vec<_>, _>>().unwrap()
}

#[test]
fn insert_select_delete_roundtrip() {
    let (_dir, db) = test_db();
    let tx = db.begin(true).unwrap();
    let mut users = tx.create_persistent("users", users_def()).unwrap();

    users
        .insert(row! { "id" => "1", "username" => "alice", "role" => "admin" })
        .unwrap();

    let rows = collect(users.select(&[eq("username", "alice")]).unwrap());
    assert_eq!(rows.len(), 1, "indexed select should find the row");
    assert_eq!(rows[0]["role"], Value::Text("admin".into()));
    assert_eq!(rows[0]["id"], Value::Text("1".into()));

    let deleted = users.delete(&[eq("id", "1")]).unwrap();
    assert_eq!(deleted, 1);

    let rows = collect(users.select(&[eq("username", "alice")]).unwrap());
    assert!(rows.is_empty(), "deleted row should be gone from the index");

    let rows = collect(users.select(&[]).unwrap());
    assert!(rows.is_empty(), "deleted row should be gone from the data store");
}

#[test]
fn delete_restores_preinsert_state_across_all_stores() {
    let (_dir, db) = test_db();
    let tx = db.begin(true).unwrap();
    let mut users = tx.create_persistent("users", users_def()).unwrap();

    users
        .insert(row! { "id" => "1", "username" => "alice", "role" => "admin" })
        .unwrap();
    users.delete(&[eq("id", "1")]).unwrap();

    // Re-inserting the same username must not trip over stale index or
    // reverse-index entries, and must get a fresh row id.
    users
        .insert(row! { "id" => "2", "username" => "alice", "role" => "user" })
        .unwrap();

    let rows = collect(users.select(&[eq("username", "alice")]).unwrap());
    assert_eq!(rows.len(), 1, "exactly one live index entry should remain");
    assert_eq!(rows[0]["id"], Value::Text("2".into()));
}

#[test]
fn committed_rows_visible_to_later_transactions() {
    let (_dir, db) = test_db();

    let tx = db.begin(true).unwrap();
    let mut users = tx.create_persistent("users", users_def()).unwrap();
    users
        .insert(row! { "id" => "1", "username" => "alice", "role" => "admin" })
        .unwrap();
    drop(users);
    tx.commit().unwrap();

    let tx = db.begin(false).unwrap();
    let users = tx.load_persistent("users").unwrap();
    let rows = collect(users.select(&[eq("username", "alice")]).unwrap());
    assert_eq!(rows.len(), 1, "committed row should be visible to a reader");
}

#[test]
fn rollback_discards_all_three_stores_together() {
    let (_dir, db) = test_db();

    let tx = db.begin(true).unwrap();
    let mut users = tx.create_persistent("users", users_def()).unwrap();
    users
        .insert(row! { "id" => "1", "username" => "alice", "role" => "admin" })
        .unwrap();
    drop(users);
    tx.rollback().unwrap();

    let tx = db.begin(false).unwrap();
    let err = tx.load_persistent("users").unwrap_err();
    assert!(
        err.to_string().contains("not found"),
        "rolled-back relation should not exist: {err}"
    );
}

#[test]
fn writes_in_transaction_visible_to_its_own_reads() {
    let (_dir, db) = test_db();
    let tx = db.begin(true).unwrap();
    let mut users = tx.create_persistent("users", users_def()).unwrap();

    for i in 0..3 {
        users
            .insert(row! {
                "id" => i.to_string(),
                "username" => format!("user{i}"),
                "role" => "member",
            })
            .unwrap();
        let rows = collect(users.select(&[]).unwrap());
        assert_eq!(rows.len(), i as usize + 1);
    }
}

#[test]
fn insert_validates_schema_before_touching_storage() {
    let (_dir, db) = test_db();
    let tx = db.begin(true).unwrap();
    let mut users = tx.create_persistent("users", users_def()).unwrap();

    let err = users
        .insert(row! { "id" => "1", "username" => "alice" })
        .unwrap_err();
    assert!(err.to_string().contains("2 fields"), "{err}");

    let err = users
        .insert(row! { "id" => "1", "username" => "alice", "nickname" => "al" })
        .unwrap_err();
    assert!(err.to_string().contains("missing column 'role'"), "{err}");

    let rows = collect(users.select(&[]).unwrap());
    assert!(rows.is_empty(), "failed inserts must not write rows");
}

#[test]
fn create_persistent_rejects_duplicates_and_readonly() {
    let (_dir, db) = test_db();

    let tx = db.begin(true).unwrap();
    let users = tx.create_persistent("users", users_def()).unwrap();
    drop(users);
    let err = tx.create_persistent("users", users_def()).unwrap_err();
    assert!(err.to_string().contains("already exists"), "{err}");
    tx.commit().unwrap();

    let tx = db.begin(false).unwrap();
    let err = tx.create_persistent("other", users_def()).unwrap_err();
    assert!(err.to_string().contains("read-only"), "{err}");
}

#[test]
fn select_surfaces_unknown_predicate_fields_per_row() {
    let (_dir, db) = test_db();
    let tx = db.begin(true).unwrap();
    let mut users = tx.create_persistent("users", users_def()).unwrap();
    users
        .insert(row! { "id" => "1", "username" => "alice", "role" => "admin" })
        .unwrap();

    let mut rows = users.select(&[eq("nope", "x")]).unwrap();
    let err = rows.next().unwrap().unwrap_err();
    assert!(
        err.to_string().contains("field 'nope' not found in columns"),
        "{err}"
    );
}

//! # Unique Constraint Tests
//!
//! Unique indexes are probed before any write, so a violated insert
//! leaves the relation exactly as it was.

use tempfile::TempDir;
use thunder::query::eq;
use thunder::{row, ColumnDef, Database, IndexDef, RelationDef, Row, Value};

fn test_db() -> (TempDir, Database) {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::create(dir.path().join("test.thunder")).unwrap();
    (dir, db)
}

fn all_rows(rel: &thunder::Persistent<'_, thunder::JsonCodec>) -> Vec<Row> {
    rel.select(&[]).unwrap().collect::<Result<Vec<_>, _>>().unwrap()
}

#[test]
fn duplicate_unique_value_is_rejected() {
    let (_dir, db) = test_db();
    let tx = db.begin(true).unwrap();
    let mut users = tx
        .create_persistent(
            "users",
            RelationDef::new([ColumnDef::new("id"), ColumnDef::new("email").unique()]),
        )
        .unwrap();

    users
        .insert(row! { "id" => "1", "email" => "a@x" })
        .unwrap();
    let err = users
        .insert(row! { "id" => "2", "email" => "a@x" })
        .unwrap_err();
    assert!(
        err.to_string().contains("UNIQUE constraint violated on index 'email'"),
        "{err}"
    );

    let rows = all_rows(&users);
    assert_eq!(rows.len(), 1, "store must show only the first row");
    assert_eq!(rows[0]["id"], Value::Text("1".into()));
}

#[test]
fn unique_value_reusable_after_delete() {
    let (_dir, db) = test_db();
    let tx = db.begin(true).unwrap();
    let mut users = tx
        .create_persistent(
            "users",
            RelationDef::new([ColumnDef::new("id"), ColumnDef::new("email").unique()]),
        )
        .unwrap();

    users
        .insert(row! { "id" => "1", "email" => "a@x" })
        .unwrap();
    users.delete(&[eq("id", "1")]).unwrap();
    users
        .insert(row! { "id" => "2", "email" => "a@x" })
        .unwrap();

    let rows = all_rows(&users);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["id"], Value::Text("2".into()));
}

#[test]
fn unique_index_doubles_as_secondary_index() {
    let (_dir, db) = test_db();
    let tx = db.begin(true).unwrap();
    let mut users = tx
        .create_persistent(
            "users",
            RelationDef::new([ColumnDef::new("id"), ColumnDef::new("email").unique()]),
        )
        .unwrap();

    users
        .insert(row! { "id" => "1", "email" => "a@x" })
        .unwrap();
    users
        .insert(row! { "id" => "2", "email" => "b@x" })
        .unwrap();

    let rows = users
        .select(&[eq("email", "b@x")])
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["id"], Value::Text("2".into()));
}

#[test]
fn composite_unique_constrains_the_whole_tuple() {
    let (_dir, db) = test_db();
    let tx = db.begin(true).unwrap();
    let mut seats = tx
        .create_persistent(
            "seats",
            RelationDef::new([
                ColumnDef::new("flight"),
                ColumnDef::new("seat"),
                ColumnDef::new("passenger"),
            ])
            .with_index(IndexDef::new("assignment", ["flight", "seat"]).unique()),
        )
        .unwrap();

    seats
        .insert(row! { "flight" => "TH123", "seat" => "4A", "passenger" => "alice" })
        .unwrap();
    // Same flight, different seat: fine.
    seats
        .insert(row! { "flight" => "TH123", "seat" => "4B", "passenger" => "bob" })
        .unwrap();

    let err = seats
        .insert(row! { "flight" => "TH123", "seat" => "4A", "passenger" => "carol" })
        .unwrap_err();
    assert!(
        err.to_string().contains("UNIQUE constraint violated on index 'assignment'"),
        "{err}"
    );
    assert_eq!(all_rows(&seats).len(), 2);
}

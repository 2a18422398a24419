//! # Range Scan Tests
//!
//! Ordering comparisons over an integer index, residual `ne` filtering,
//! and the empty-range short circuit.

use tempfile::TempDir;
use thunder::query::{eq, ge, gt, le, lt, ne};
use thunder::{row, ColumnDef, Database, RelationDef, Value};

fn events_db() -> (TempDir, Database) {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::create(dir.path().join("test.thunder")).unwrap();
    (dir, db)
}

fn payloads(rows: Vec<thunder::Row>) -> Vec<String> {
    rows.into_iter()
        .map(|row| match &row["payload"] {
            Value::Text(s) => s.clone(),
            other => panic!("unexpected payload {other:?}"),
        })
        .collect()
}

fn setup<'tx>(
    tx: &'tx thunder::Tx<thunder::JsonCodec>,
) -> thunder::Persistent<'tx, thunder::JsonCodec> {
    let mut events = tx
        .create_persistent(
            "events",
            RelationDef::new([ColumnDef::new("ts").indexed(), ColumnDef::new("payload")]),
        )
        .unwrap();
    for ts in [10i64, 20, 30, 40] {
        events
            .insert(row! { "ts" => ts, "payload" => format!("p{ts}") })
            .unwrap();
    }
    events
}

fn select(
    events: &thunder::Persistent<'_, thunder::JsonCodec>,
    ops: &[thunder::Op],
) -> Vec<String> {
    payloads(
        events
            .select(ops)
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap(),
    )
}

#[test]
fn half_open_range_yields_interior_in_ascending_order() {
    let (_dir, db) = events_db();
    let tx = db.begin(true).unwrap();
    let events = setup(&tx);

    assert_eq!(select(&events, &[ge("ts", 15i64), lt("ts", 35i64)]), ["p20", "p30"]);
}

#[test]
fn endpoint_inclusivity_is_honored() {
    let (_dir, db) = events_db();
    let tx = db.begin(true).unwrap();
    let events = setup(&tx);

    assert_eq!(select(&events, &[ge("ts", 20i64), le("ts", 30i64)]), ["p20", "p30"]);
    assert_eq!(select(&events, &[gt("ts", 20i64), lt("ts", 30i64)]), Vec::<String>::new());
    assert_eq!(select(&events, &[gt("ts", 20i64)]), ["p30", "p40"]);
    assert_eq!(select(&events, &[le("ts", 10i64)]), ["p10"]);
}

#[test]
fn negative_values_order_below_positive() {
    let (_dir, db) = events_db();
    let tx = db.begin(true).unwrap();
    let mut events = setup(&tx);
    events
        .insert(row! { "ts" => -5i64, "payload" => "p-5" })
        .unwrap();

    assert_eq!(select(&events, &[lt("ts", 15i64)]), ["p-5", "p10"]);
}

#[test]
fn ne_filters_residually_inside_an_index_scan() {
    let (_dir, db) = events_db();
    let tx = db.begin(true).unwrap();
    let events = setup(&tx);

    assert_eq!(
        select(&events, &[ge("ts", 15i64), ne("ts", 30i64)]),
        ["p20", "p40"]
    );
}

#[test]
fn contradictory_predicates_yield_empty_stream() {
    let (_dir, db) = events_db();
    let tx = db.begin(true).unwrap();
    let events = setup(&tx);

    assert_eq!(select(&events, &[gt("ts", 30i64), lt("ts", 20i64)]), Vec::<String>::new());
    assert_eq!(
        select(&events, &[eq("ts", 20i64), eq("ts", 30i64)]),
        Vec::<String>::new()
    );
}

#[test]
fn cross_type_predicate_on_index_matches_nothing() {
    let (_dir, db) = events_db();
    let tx = db.begin(true).unwrap();
    let events = setup(&tx);

    // A text probe lives in a disjoint byte space from integer keys.
    assert_eq!(select(&events, &[eq("ts", "20")]), Vec::<String>::new());
}

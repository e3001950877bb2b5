#![allow(dead_code)]

use oxide_bind::Session;
use oxide_bind_derive::Record;
use oxide_bind_duckdb::{DuckDbExecutor, DIALECT};

#[derive(Debug, Default, Clone, PartialEq, Record)]
pub struct Item {
    pub id: i64,
    pub name: String,
    pub note: Option<String>,
}

pub fn item(id: i64, name: &str, note: Option<&str>) -> Item {
    Item {
        id,
        name: name.to_owned(),
        note: note.map(str::to_owned),
    }
}

/// Fresh in-memory database with an empty `items` table.
pub fn setup() -> (DuckDbExecutor, Session) {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let db = DuckDbExecutor::open_in_memory()
        .unwrap_or_else(|e| panic!("Failed to open DuckDB: {e}"));
    let session = Session::new(DIALECT);
    session
        .write("CREATE TABLE items (id BIGINT PRIMARY KEY, name VARCHAR NOT NULL, note VARCHAR)")
        .exec(&db)
        .unwrap_or_else(|e| panic!("Failed to create table: {e}"));
    (db, session)
}

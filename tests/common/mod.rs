#![allow(dead_code)]

use datatable::prelude::*;
use rusqlite::Connection;

/// Customers Alice, Bob (no address) and Charlie.
pub fn setup_db() -> Connection {
    let conn = Connection::open_in_memory().expect("Failed to create in-memory database");
    conn.execute_batch(
        "CREATE TABLE country (id INTEGER PRIMARY KEY, code TEXT NOT NULL);
         CREATE TABLE address (id INTEGER PRIMARY KEY, city TEXT NOT NULL, rent REAL, country_id INTEGER);
         CREATE TABLE customer (id INTEGER PRIMARY KEY, name TEXT NOT NULL, balance REAL, address_id INTEGER);

         INSERT INTO country VALUES (1, 'FR'), (2, 'DE');
         INSERT INTO address VALUES (10, 'Paris', 800, 1), (11, 'Berlin', 600, 2);
         INSERT INTO customer VALUES (1, 'Alice', 100, 10), (2, 'Bob', 50, NULL), (3, 'Charlie', 10, 11);",
    )
    .expect("Failed to create tables");
    conn
}

/// [`setup_db`] plus Dave and Eve, five customers in total.
pub fn setup_ledger_db() -> Connection {
    let conn = setup_db();
    conn.execute_batch("INSERT INTO customer VALUES (4, 'Dave', 5, 10), (5, 'Eve', 1, 11);")
        .expect("Failed to seed customers");
    conn
}

pub fn schema() -> Schema {
    Schema::new()
        .with(
            EntityMeta::new("Customer", "customer")
                .identifier("id")
                .field("name")
                .field("balance")
                .association(Association::new("address", "Address", "address_id")),
        )
        .with(
            EntityMeta::new("Address", "address")
                .identifier("id")
                .field("city")
                .field("rent")
                .association(Association::new("country", "Country", "country_id")),
        )
        .with(EntityMeta::new("Country", "country").identifier("id").field("code"))
}

pub fn adapter(conn: Connection) -> OrmAdapter<SqliteBackend> {
    OrmAdapter::new(SqliteBackend::new(conn, schema()))
}

/// Columns `id`, `name`, `city` (`address.city`).
pub fn customer_table() -> DataTable {
    let mut table = DataTable::new("customers", "Customer");
    table
        .add(ColumnSpec::new("id"))
        .and_then(|t| t.add(ColumnSpec::new("name")))
        .and_then(|t| t.add(ColumnSpec::new("city").field("address.city")))
        .expect("valid columns");
    table
}

/// [`customer_table`] plus a numeric `balance` and a hidden `country`.
pub fn ledger_table() -> DataTable {
    let mut table = customer_table();
    table
        .add(ColumnSpec::new("balance").kind(ColumnKind::Numeric))
        .and_then(|t| t.add(ColumnSpec::new("country").field("address.country.code").visible(false)))
        .expect("valid columns");
    table
}

/// Names in the rows of an envelope, in order.
pub fn names(envelope: &Envelope) -> Vec<String> {
    envelope
        .data
        .iter()
        .map(|row| row["name"].as_str().unwrap_or_default().to_string())
        .collect()
}

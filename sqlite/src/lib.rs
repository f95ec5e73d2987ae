//! SQLite backend for datatable
//!
//! Renders assembled queries with SQLite placeholders, runs them over a
//! [`rusqlite::Connection`], and hydrates records one identifier at a time.
//!
//! ```no_run
//! use datatable_core::{OrmAdapter, Schema};
//! use datatable_sqlite::SqliteBackend;
//!
//! let conn = rusqlite::Connection::open_in_memory().unwrap();
//! let adapter = OrmAdapter::new(SqliteBackend::new(conn, Schema::new()));
//! # let _ = adapter;
//! ```

mod backend;
mod hydrate;

pub use backend::SqliteBackend;

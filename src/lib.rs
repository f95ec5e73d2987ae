//! # datatable
//!
//! Server-side paging, filtering, sorting and aggregation for interactive
//! data grids.
//!
//! A [`DataTable`] lists the columns of a grid over one root entity. Each
//! request is validated into a [`RequestState`]; the [`OrmAdapter`] assembles
//! the filtered, count, id and summary queries from one join graph, runs them
//! on a [`Backend`], and hands back a [`ResultSet`] whose rows are hydrated
//! lazily.
//!
//! ## Quick Start
//!
//! ```rust
//! use datatable::prelude::*;
//!
//! # fn main() -> datatable::Result<()> {
//! let conn = rusqlite::Connection::open_in_memory()?;
//! conn.execute_batch(
//!     "CREATE TABLE customer (id INTEGER PRIMARY KEY, name TEXT);
//!      INSERT INTO customer VALUES (1, 'Alice'), (2, 'Bob');",
//! )?;
//!
//! let schema = Schema::new().with(EntityMeta::new("Customer", "customer").identifier("id").field("name"));
//! let adapter = OrmAdapter::new(SqliteBackend::new(conn, schema));
//!
//! let mut table = DataTable::new("customers", "Customer");
//! table.add(ColumnSpec::new("id"))?.add(ColumnSpec::new("name"))?;
//!
//! let state = RequestState::builder()
//!     .length(1)
//!     .order("name", OrderDirection::Desc)
//!     .build(table.columns())?;
//! let envelope = table.get_data(&adapter, &state)?.into_envelope(1);
//!
//! assert_eq!(envelope.total_records, 2);
//! assert_eq!(envelope.data[0]["name"], "Bob");
//! # Ok(())
//! # }
//! ```
//!
//! ## Configuration
//!
//! Tables and entity metadata can be declared in `datatable.toml`, see
//! [`config`].

pub mod config;

pub use datatable_core::*;
pub use datatable_sqlite::SqliteBackend;

pub use config::{Config, ConfigError};

pub mod prelude {
    pub use crate::config::Config;
    pub use datatable_core::{
        Adapter, Association, Backend, BatchAction, ColumnKind, ColumnSpec, DataTable, DataTableError, EntityMeta,
        Envelope, JoinType, OrderDirection, OrmAdapter, Record, Reply, RequestParams, RequestState, ResultSet, Row,
        RowOutcome, Schema, TableOptions, Value,
    };
    pub use datatable_sqlite::SqliteBackend;
}

//! Query assembly and result streaming engine behind server-side data tables.
//!
//! A [`DataTable`] describes the columns of a grid over one root entity. For
//! each [`RequestState`] the [`QueryAssembler`] resolves dotted field paths
//! into joins, rewrites the advanced filter expression, and derives the count,
//! id and summary queries from a single join graph. An [`Adapter`] runs them
//! against a [`Backend`] and hands back a [`ResultSet`] whose rows are produced
//! lazily by a [`RowStream`].

pub mod adapter;
pub mod assembler;
pub mod backend;
pub mod column;
pub mod dialect;
pub mod error;
pub mod pipeline;
pub mod record;
pub mod resolver;
pub mod result;
pub mod rewriter;
pub mod schema;
pub mod sql;
pub mod state;
pub mod table;
pub mod tracing;
pub mod value;

// Re-export key types and traits
pub use adapter::{Adapter, AdapterQuery, OrmAdapter, RecordCursor};
pub use assembler::{Assembled, QueryAssembler, SummaryQuery};
pub use backend::{Backend, JoinType, Query};
pub use column::{AggregateFunction, ColumnKind, ColumnSpec, Columns, TransformContext};
pub use dialect::Dialect;
pub use error::{DataTableError, Result};
pub use pipeline::{PropertyMap, ROW_ID_KEY, Row, RowOutcome, RowStream};
pub use record::Record;
pub use resolver::{AliasEntry, AssemblyContext, ResolvedField, SelectColumnSet};
pub use result::{Aggregate, Envelope, ResultSet, Summary};
pub use rewriter::rewrite;
pub use schema::{Association, EntityMeta, MetadataProvider, Schema};
pub use sql::{Chunk, Sql, Token};
pub use state::{OrderClause, OrderDirection, RequestParams, RequestState, RequestStateBuilder};
pub use table::{BatchAction, DataTable, GroupedBatchActions, Reply, TableOptions};
pub use value::Value;

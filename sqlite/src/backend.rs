use std::time::{Duration, Instant};

use datatable_core::{
    Backend, DataTableError, Dialect, MetadataProvider, Query, Record, Result, Schema, Sql, Value,
};
use rusqlite::{Connection, ErrorCode, params_from_iter};

/// Virtual machine instructions between two deadline checks.
const PROGRESS_OPS: i32 = 1_000;

/// [`Backend`] over a rusqlite connection and an in-memory [`Schema`].
#[derive(Debug)]
pub struct SqliteBackend {
    conn: Connection,
    schema: Schema,
    timeout: Option<Duration>,
}

/// Raw rows of one statement: column labels plus values.
pub(crate) struct Rows {
    pub labels: Vec<String>,
    pub values: Vec<Vec<Value>>,
}

/// Clears the progress handler when the call returns.
struct Deadline<'c> {
    conn: &'c Connection,
}

impl Drop for Deadline<'_> {
    fn drop(&mut self) {
        self.conn.progress_handler(0, None::<fn() -> bool>);
    }
}

impl SqliteBackend {
    pub fn new(conn: Connection, schema: Schema) -> Self {
        Self {
            conn,
            schema,
            timeout: None,
        }
    }

    /// Aborts any single statement running longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn into_inner(self) -> (Connection, Schema) {
        (self.conn, self.schema)
    }

    fn arm_deadline(&self) -> Option<Deadline<'_>> {
        let deadline = Instant::now() + self.timeout?;
        self.conn
            .progress_handler(PROGRESS_OPS, Some(move || Instant::now() >= deadline));
        Some(Deadline { conn: &self.conn })
    }

    fn map_error(err: rusqlite::Error) -> DataTableError {
        if err.sqlite_error_code() == Some(ErrorCode::OperationInterrupted) {
            DataTableError::Execution("statement interrupted after exceeding its deadline".into())
        } else {
            DataTableError::from(err)
        }
    }

    /// Runs `sql` and collects at most `limit` rows.
    pub(crate) fn rows(&self, sql: &Sql, limit: Option<usize>) -> Result<Rows> {
        let (text, params) = sql.build(Dialect::SQLite);
        datatable_core::datatable_trace_query!(&text, params.len());

        let _deadline = self.arm_deadline();
        let mut stmt = self.conn.prepare(&text).map_err(Self::map_error)?;
        let labels: Vec<String> = stmt.column_names().into_iter().map(str::to_string).collect();
        let width = labels.len();

        let mut values = Vec::new();
        let mut rows = stmt.query(params_from_iter(params)).map_err(Self::map_error)?;
        while let Some(row) = rows.next().map_err(Self::map_error)? {
            if limit.is_some_and(|limit| values.len() >= limit) {
                break;
            }
            let mut cells = Vec::with_capacity(width);
            for index in 0..width {
                cells.push(Value::from(row.get_ref(index).map_err(Self::map_error)?));
            }
            values.push(cells);
        }

        Ok(Rows { labels, values })
    }
}

impl Backend for SqliteBackend {
    fn metadata(&self) -> &dyn MetadataProvider {
        &self.schema
    }

    fn fetch_scalar(&self, query: &Query) -> Result<Value> {
        let rows = self.rows(&query.to_sql(), Some(1))?;
        Ok(rows
            .values
            .into_iter()
            .next()
            .and_then(|row| row.into_iter().next())
            .unwrap_or_default())
    }

    fn fetch_column(&self, query: &Query) -> Result<Vec<Value>> {
        let rows = self.rows(&query.to_sql(), None)?;
        Ok(rows
            .values
            .into_iter()
            .filter_map(|row| row.into_iter().next())
            .collect())
    }

    fn fetch_row(&self, query: &Query) -> Result<Option<Vec<(String, Value)>>> {
        let rows = self.rows(&query.to_sql(), Some(1))?;
        let labels = rows.labels;
        Ok(rows
            .values
            .into_iter()
            .next()
            .map(|row| labels.into_iter().zip(row).collect()))
    }

    fn hydrate(&self, entity: &str, id: &Value, relations: &[String]) -> Result<Option<Record>> {
        let meta = self.schema.metadata_for(entity)?;
        let Some(mut record) = self.load(meta, meta.single_identifier()?, id)? else {
            return Ok(None);
        };
        for path in relations {
            self.attach(&mut record, meta, path)?;
        }
        Ok(Some(record))
    }
}

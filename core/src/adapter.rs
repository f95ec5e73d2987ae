//! Adapters turn a table definition plus request state into a [`ResultSet`].
//!
//! The provided [`Adapter::get_data`] drives every adapter the same way:
//! prepare (counts, summary, identifier), map columns to readable property
//! paths, open the record cursor, and wrap it in a [`RowStream`].

use crate::{
    assembler::{Assembled, QueryAssembler, SummaryQuery},
    backend::{Backend, Query},
    column::{AggregateFunction, ColumnSpec},
    error::{DataTableError, Result},
    pipeline::{PropertyMap, RowStream},
    record::Record,
    result::{ResultSet, Summary},
    state::RequestState,
    table::DataTable,
    value::Value,
};

/// Lazy sequence of hydrated records.
pub type RecordCursor<'s> = Box<dyn Iterator<Item = Result<Record>> + 's>;

/// Per-request scratch state an adapter fills while preparing.
#[derive(Debug)]
pub struct AdapterQuery<'t> {
    table: &'t DataTable,
    state: &'t RequestState,
    total_rows: Option<u64>,
    filtered_rows: Option<u64>,
    summary: Option<Summary>,
    identifier_property_path: Option<String>,
    error: Option<String>,
}

impl<'t> AdapterQuery<'t> {
    pub fn new(table: &'t DataTable, state: &'t RequestState) -> Self {
        Self {
            table,
            state,
            total_rows: None,
            filtered_rows: None,
            summary: None,
            identifier_property_path: None,
            error: None,
        }
    }

    pub fn table(&self) -> &'t DataTable {
        self.table
    }

    pub fn state(&self) -> &'t RequestState {
        self.state
    }

    pub fn total_rows(&self) -> Option<u64> {
        self.total_rows
    }

    pub fn set_total_rows(&mut self, rows: u64) {
        self.total_rows = Some(rows);
    }

    pub fn filtered_rows(&self) -> Option<u64> {
        self.filtered_rows
    }

    pub fn set_filtered_rows(&mut self, rows: u64) {
        self.filtered_rows = Some(rows);
    }

    pub fn summary(&self) -> Option<&Summary> {
        self.summary.as_ref()
    }

    pub fn set_summary(&mut self, summary: Summary) {
        self.summary = Some(summary);
    }

    pub fn identifier_property_path(&self) -> Option<&str> {
        self.identifier_property_path.as_deref()
    }

    pub fn set_identifier_property_path(&mut self, path: impl Into<String>) {
        self.identifier_property_path = Some(path.into());
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Records a degraded sub-query. The first message wins.
    pub fn record_error(&mut self, message: impl Into<String>) {
        if self.error.is_none() {
            self.error = Some(message.into());
        }
    }
}

/// Data source of a [`DataTable`].
pub trait Adapter {
    /// Whatever `prepare_query` hands over to `results`.
    type Prepared;

    /// Builds the queries of the request and sets both row counts, the
    /// summary when requested, and the identifier property path.
    fn prepare_query(&self, query: &mut AdapterQuery<'_>) -> Result<Self::Prepared>;

    /// Property path on the hydrated record that holds `column`'s value.
    fn map_property_path(
        &self,
        query: &AdapterQuery<'_>,
        prepared: &Self::Prepared,
        column: &ColumnSpec,
    ) -> Option<String>;

    /// Opens the record cursor of the paged query.
    fn results<'s>(&'s self, query: &AdapterQuery<'_>, prepared: Self::Prepared) -> RecordCursor<'s>;

    /// Filtered row count of `state`.
    fn count(&self, table: &DataTable, state: &RequestState) -> Result<u64>;

    /// Distinct identifiers of the filtered rows. Ordered when `limit` is
    /// set. Backend failures give an empty list.
    fn ids(&self, table: &DataTable, state: &RequestState, limit: Option<u64>) -> Result<Vec<Value>>;

    /// Column -> readable property path, in column order. An explicit
    /// property path on the column takes precedence.
    fn property_map<'t>(&self, query: &AdapterQuery<'t>, prepared: &Self::Prepared) -> PropertyMap<'t> {
        let mut map = PropertyMap::default();
        for column in query.table().columns() {
            let path = match column.explicit_property_path() {
                Some(path) => Some(path.to_string()),
                None => self.map_property_path(query, prepared, column),
            };
            map.push(column, path);
        }
        map
    }

    fn get_data<'s>(&'s self, table: &'s DataTable, state: &'s RequestState) -> Result<ResultSet<'s>> {
        let mut query = AdapterQuery::new(table, state);
        let prepared = self.prepare_query(&mut query)?;

        let (Some(total), Some(filtered)) = (query.total_rows, query.filtered_rows) else {
            return Err(DataTableError::Contract("Adapter did not set row counts"));
        };

        let properties = self.property_map(&query, &prepared);
        let records = self.results(&query, prepared);
        let rows = RowStream::new(records, properties)
            .identifier(query.identifier_property_path.take())
            .export(state.is_export())
            .loading_marker(table.options().loading_marker.clone())
            .transform(table.transformer().cloned());

        Ok(ResultSet::new(rows, total, filtered)
            .with_summary(query.summary.take())
            .with_error(query.error.take()))
    }
}

/// Adapter over a relational [`Backend`]: queries come from the
/// [`QueryAssembler`], records are hydrated one identifier at a time.
#[derive(Debug, Clone)]
pub struct OrmAdapter<B> {
    backend: B,
}

/// Prepared state of [`OrmAdapter`].
#[derive(Debug, Clone)]
pub struct OrmPrepared {
    pub assembled: Assembled,
    pub root_alias: String,
    pub paged: Query,
}

impl<B: Backend> OrmAdapter<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn into_inner(self) -> B {
        self.backend
    }

    /// Configured root alias, else the entity's short name.
    fn root_alias(&self, table: &DataTable) -> Result<String> {
        match &table.options().root_alias {
            Some(alias) => Ok(alias.clone()),
            None => Ok(self.backend.metadata().metadata_for(table.entity())?.short_name()),
        }
    }

    pub fn assemble(&self, table: &DataTable, state: &RequestState) -> Result<(Assembled, String)> {
        let root_alias = self.root_alias(table)?;
        let assembled = QueryAssembler::new(self.backend.metadata(), table.entity(), root_alias.clone(), table.columns())
            .selection_join(table.options().selection_join)
            .assemble(state)?;
        Ok((assembled, root_alias))
    }

    fn fetch_count(&self, query: &Query) -> Result<u64> {
        let value = self.backend.fetch_scalar(query)?;
        Ok(value.as_i64().map_or(0, |n| n.max(0) as u64))
    }

    /// Count that degrades to 0, recording the failure on `query`.
    fn degraded_count(&self, count: &Query, query: &mut AdapterQuery<'_>) -> u64 {
        match self.fetch_count(count) {
            Ok(rows) => rows,
            Err(err) => {
                crate::datatable_trace_fault!("count", &err);
                query.record_error(err.to_string());
                0
            }
        }
    }

    /// Aggregates keyed by column name. Failures give an empty summary.
    fn summary(&self, summary: &SummaryQuery) -> Summary {
        let row = match self.backend.fetch_row(&summary.query) {
            Ok(Some(row)) => row,
            Ok(None) => return Summary::new(),
            Err(err) => {
                crate::datatable_trace_fault!("summary", &err);
                return Summary::new();
            }
        };

        let mut out = Summary::new();
        for (alias, column, function) in &summary.columns {
            let value = row
                .iter()
                .find(|(label, _)| label == alias)
                .and_then(|(_, value)| value.as_f64());
            let entry = out.entry(column.clone()).or_default();
            match function {
                AggregateFunction::Sum => entry.sum = value,
                AggregateFunction::Avg => entry.avg = value,
            }
        }
        out
    }
}

impl<B: Backend> Adapter for OrmAdapter<B> {
    type Prepared = OrmPrepared;

    fn prepare_query(&self, query: &mut AdapterQuery<'_>) -> Result<OrmPrepared> {
        let table = query.table();
        let state = query.state();
        let (assembled, root_alias) = self.assemble(table, state)?;

        let total = self.degraded_count(&assembled.total, query);
        query.set_total_rows(total);
        let filtered = self.degraded_count(&assembled.count, query);
        query.set_filtered_rows(filtered);

        if let Some(summary) = &assembled.summary {
            query.set_summary(self.summary(summary));
        }

        let meta = self.backend.metadata().metadata_for(table.entity())?;
        query.set_identifier_property_path(meta.single_identifier()?);

        let paged = assembled.paged(state.start(), state.length());
        Ok(OrmPrepared {
            assembled,
            root_alias,
            paged,
        })
    }

    fn map_property_path(
        &self,
        query: &AdapterQuery<'_>,
        prepared: &OrmPrepared,
        column: &ColumnSpec,
    ) -> Option<String> {
        if let Some(resolved) = prepared.assembled.overlay.get(column.name()) {
            // foreign-key shortcut: the value sits on the root row under its column
            if resolved.alias == prepared.root_alias {
                let is_field = self
                    .backend
                    .metadata()
                    .metadata_for(query.table().entity())
                    .is_ok_and(|meta| meta.has_field(&resolved.property));
                if !is_field {
                    return Some(resolved.column.clone());
                }
            }
            return Some(resolved.property.clone());
        }

        let path = column.field_path()?;
        let prefix = format!("{}.", prepared.root_alias);
        Some(path.strip_prefix(&prefix).unwrap_or(path).to_string())
    }

    fn results<'s>(&'s self, query: &AdapterQuery<'_>, prepared: OrmPrepared) -> RecordCursor<'s> {
        Box::new(HydratingCursor {
            backend: &self.backend,
            entity: query.table().entity().to_string(),
            relations: prepared.assembled.relations,
            paged: Some(prepared.paged),
            ids: Vec::new().into_iter(),
        })
    }

    fn count(&self, table: &DataTable, state: &RequestState) -> Result<u64> {
        let (assembled, _) = self.assemble(table, state)?;
        self.fetch_count(&assembled.count)
    }

    fn ids(&self, table: &DataTable, state: &RequestState, limit: Option<u64>) -> Result<Vec<Value>> {
        let (assembled, _) = self.assemble(table, state)?;
        match self.backend.fetch_column(&assembled.ids_query(limit)) {
            Ok(ids) => Ok(ids),
            Err(err) => {
                crate::datatable_trace_fault!("ids", &err);
                Ok(Vec::new())
            }
        }
    }
}

/// Runs the paged id query on first pull, then hydrates one record per id.
struct HydratingCursor<'s, B> {
    backend: &'s B,
    entity: String,
    relations: Vec<String>,
    paged: Option<Query>,
    ids: std::vec::IntoIter<Value>,
}

impl<B: Backend> Iterator for HydratingCursor<'_, B> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(paged) = self.paged.take() {
            match self.backend.fetch_column(&paged) {
                Ok(ids) => self.ids = ids.into_iter(),
                Err(err) => return Some(Err(err)),
            }
        }

        while let Some(id) = self.ids.next() {
            match self.backend.hydrate(&self.entity, &id, &self.relations) {
                Ok(Some(record)) => return Some(Ok(record)),
                // deleted between the id query and hydration
                Ok(None) => continue,
                Err(err) => return Some(Err(err)),
            }
        }
        None
    }
}

//! Lazy row production: hydrated records in, transformed JSON rows out.

use std::sync::Arc;

use crate::{
    adapter::RecordCursor,
    column::{ColumnSpec, TransformContext},
    error::Result,
    record::Record,
};

/// Key carrying the row identifier for the grid widget.
pub const ROW_ID_KEY: &str = "DT_RowId";

/// Default placeholder emitted for hidden columns in display context.
pub const LOADING_MARKER: &str = r#"<i class="fas fa-circle-notch fa-spin"></i>"#;

/// One output row, keyed by column name in column order.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// Result of the whole-row transform.
#[derive(Debug, Clone, PartialEq)]
pub enum RowOutcome {
    Keep(Row),
    Skip,
}

impl From<Option<Row>> for RowOutcome {
    fn from(row: Option<Row>) -> Self {
        row.map_or(RowOutcome::Skip, RowOutcome::Keep)
    }
}

/// Whole-row transform: `(row, record) -> row | skip`.
pub type RowTransform = Arc<dyn Fn(Row, &Record) -> RowOutcome + Send + Sync>;

/// Column -> property path readable on the hydrated record, in column order.
#[derive(Debug, Clone, Default)]
pub struct PropertyMap<'c> {
    entries: Vec<(&'c ColumnSpec, Option<String>)>,
}

impl<'c> PropertyMap<'c> {
    pub fn push(&mut self, column: &'c ColumnSpec, path: Option<String>) {
        self.entries.push((column, path));
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(c, _)| c.name() == column)
            .and_then(|(_, path)| path.as_deref())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'c ColumnSpec, Option<&str>)> {
        self.entries.iter().map(|(c, path)| (*c, path.as_deref()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Iterator over output rows. Pulls one record per row from its cursor,
/// stops after the first error.
pub struct RowStream<'s> {
    records: RecordCursor<'s>,
    properties: PropertyMap<'s>,
    identifier: Option<String>,
    export: bool,
    loading_marker: String,
    transform: Option<RowTransform>,
    finished: bool,
}

impl<'s> RowStream<'s> {
    pub fn new(records: RecordCursor<'s>, properties: PropertyMap<'s>) -> Self {
        Self {
            records,
            properties,
            identifier: None,
            export: false,
            loading_marker: LOADING_MARKER.to_string(),
            transform: None,
            finished: false,
        }
    }

    /// Property path of the identifier, emitted under [`ROW_ID_KEY`].
    pub fn identifier(mut self, path: Option<String>) -> Self {
        self.identifier = path.filter(|p| !p.is_empty());
        self
    }

    pub fn export(mut self, export: bool) -> Self {
        self.export = export;
        self
    }

    pub fn loading_marker(mut self, marker: impl Into<String>) -> Self {
        self.loading_marker = marker.into();
        self
    }

    pub fn transform(mut self, transform: Option<RowTransform>) -> Self {
        self.transform = transform;
        self
    }

    fn read(record: &Record, path: Option<&str>) -> serde_json::Value {
        path.and_then(|p| record.read(p))
            .map_or(serde_json::Value::Null, |v| v.to_json())
    }

    fn build_row(&self, record: &Record) -> Row {
        let mut row = Row::new();
        if let Some(identifier) = &self.identifier {
            row.insert(ROW_ID_KEY.to_string(), Self::read(record, Some(identifier)));
        }

        for (column, path) in self.properties.iter() {
            if self.export {
                if column.is_identifier() || (column.is_visible() && column.is_exportable()) {
                    let value = Self::read(record, path);
                    row.insert(
                        column.name().to_string(),
                        column.apply_transform(value, record, TransformContext::EXPORT),
                    );
                }
            } else if column.is_identifier() || column.is_visible() {
                let value = Self::read(record, path);
                row.insert(
                    column.name().to_string(),
                    column.apply_transform(value, record, TransformContext::DISPLAY),
                );
            } else {
                row.insert(
                    column.name().to_string(),
                    serde_json::Value::String(self.loading_marker.clone()),
                );
            }
        }
        row
    }
}

impl Iterator for RowStream<'_> {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.finished {
            let record = match self.records.next() {
                None => {
                    self.finished = true;
                    return None;
                }
                Some(Err(err)) => {
                    crate::datatable_trace_fault!("stream", &err);
                    self.finished = true;
                    return Some(Err(err));
                }
                Some(Ok(record)) => record,
            };

            let row = self.build_row(&record);
            match &self.transform {
                Some(transform) => match transform(row, &record) {
                    RowOutcome::Keep(row) => return Some(Ok(row)),
                    RowOutcome::Skip => continue,
                },
                None => return Some(Ok(row)),
            }
        }
        None
    }
}

impl std::iter::FusedIterator for RowStream<'_> {}

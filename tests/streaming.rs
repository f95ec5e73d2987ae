mod common;

use std::cell::Cell;
use std::sync::Arc;

use common::{customer_table, names, schema, setup_ledger_db};
use datatable::prelude::*;
use datatable::{MetadataProvider, Query};
use serde_json::json;

/// Delegates to SQLite but fails the n-th hydration.
struct FlakyBackend {
    inner: SqliteBackend,
    fail_at: usize,
    hydrated: Cell<usize>,
}

impl Backend for FlakyBackend {
    fn metadata(&self) -> &dyn MetadataProvider {
        self.inner.metadata()
    }

    fn fetch_scalar(&self, query: &Query) -> datatable::Result<Value> {
        self.inner.fetch_scalar(query)
    }

    fn fetch_column(&self, query: &Query) -> datatable::Result<Vec<Value>> {
        self.inner.fetch_column(query)
    }

    fn fetch_row(&self, query: &Query) -> datatable::Result<Option<Vec<(String, Value)>>> {
        self.inner.fetch_row(query)
    }

    fn hydrate(&self, entity: &str, id: &Value, relations: &[String]) -> datatable::Result<Option<Record>> {
        let n = self.hydrated.get() + 1;
        self.hydrated.set(n);
        if n == self.fail_at {
            return Err(DataTableError::Execution("connection reset".into()));
        }
        self.inner.hydrate(entity, id, relations)
    }
}

fn flaky(fail_at: usize) -> OrmAdapter<FlakyBackend> {
    OrmAdapter::new(FlakyBackend {
        inner: SqliteBackend::new(setup_ledger_db(), schema()),
        fail_at,
        hydrated: Cell::new(0),
    })
}

fn all_rows(table: &DataTable) -> RequestState {
    RequestState::builder()
        .length(-1)
        .order("name", OrderDirection::Asc)
        .build(table.columns())
        .unwrap()
}

#[test]
fn mid_stream_fault_becomes_an_error_envelope() {
    let adapter = flaky(3);
    let table = customer_table();
    let state = all_rows(&table);

    let envelope = table.get_data(&adapter, &state).unwrap().into_envelope(2);
    assert!(envelope.data.is_empty());
    assert_eq!(envelope.total_records, 5);
    assert_eq!(envelope.total_display_records, 5);
    assert_eq!(envelope.error.as_deref(), Some("Execution error: connection reset"));
    // streaming stopped at the fault
    assert_eq!(adapter.backend().hydrated.get(), 3);

    let body = serde_json::to_value(&envelope).unwrap();
    assert_eq!(body["error"], "Execution error: connection reset");
    assert_eq!(body["data"], json!([]));
}

#[test]
fn rows_are_pulled_on_demand() {
    let adapter = flaky(usize::MAX);
    let table = customer_table();
    let state = all_rows(&table);

    let mut rows = table.get_data(&adapter, &state).unwrap().into_rows();
    assert_eq!(adapter.backend().hydrated.get(), 0);
    let first = rows.next().unwrap().unwrap();
    assert_eq!(first["name"], "Alice");
    assert_eq!(adapter.backend().hydrated.get(), 1);
    assert_eq!(rows.count(), 4);
}

#[test]
fn skipping_every_row_keeps_the_counts() {
    let adapter = common::adapter(setup_ledger_db());
    let mut table = customer_table();
    table.set_transformer(Arc::new(|_row: Row, _record: &Record| RowOutcome::Skip));
    let state = all_rows(&table);

    let envelope = table.get_data(&adapter, &state).unwrap().into_envelope(1);
    assert!(envelope.data.is_empty());
    assert_eq!(envelope.total_display_records, 5);
    assert!(envelope.error.is_none());
}

#[test]
fn row_transform_replaces_and_filters() {
    let adapter = common::adapter(setup_ledger_db());
    let mut table = customer_table();
    table.set_transformer(Arc::new(|mut row: Row, record: &Record| {
        if record.read("address.city").is_none() {
            return RowOutcome::Skip;
        }
        row.insert("rent".into(), record.read("address.rent").map_or(json!(null), Value::to_json));
        RowOutcome::Keep(row)
    }));
    let state = all_rows(&table);

    let envelope = table.get_data(&adapter, &state).unwrap().into_envelope(1);
    assert_eq!(names(&envelope), ["Alice", "Charlie", "Dave", "Eve"]);
    assert_eq!(envelope.data[0]["rent"], json!(800.0));
}

#[test]
fn column_transforms_see_the_context() {
    let adapter = common::adapter(setup_ledger_db());
    let mut table = DataTable::new("customers", "Customer");
    table.add(ColumnSpec::new("id")).unwrap();
    table
        .add(ColumnSpec::new("name").transform(|value, record, ctx| {
            let name = value.as_str().unwrap_or_default().to_string();
            if ctx.export {
                json!(name.to_uppercase())
            } else {
                json!(format!("{name} #{}", record.read("id").map(Value::to_string).unwrap_or_default()))
            }
        }))
        .unwrap();

    let display = all_rows(&table);
    let envelope = table.get_data(&adapter, &display).unwrap().into_envelope(1);
    assert_eq!(envelope.data[0]["name"], "Alice #1");

    let export = RequestState::builder()
        .length(1)
        .exporter("xlsx")
        .order("name", OrderDirection::Asc)
        .build(table.columns())
        .unwrap();
    let envelope = table.get_data(&adapter, &export).unwrap().into_envelope(1);
    assert_eq!(envelope.data[0]["name"], "ALICE");
}

mod common;

use common::{adapter, customer_table, ledger_table, names, setup_db, setup_ledger_db};
use datatable::prelude::*;
use serde_json::json;

#[test]
fn first_page_sorted_by_name() {
    let adapter = adapter(setup_db());
    let table = customer_table();
    let state = RequestState::builder()
        .draw(7)
        .start(0)
        .length(2)
        .order("name", OrderDirection::Asc)
        .build(table.columns())
        .unwrap();

    let (assembled, root) = adapter.assemble(&table, &state).unwrap();
    assert_eq!(root, "customer");
    assert_eq!(assembled.filtered.joins.len(), 1);
    assert_eq!(assembled.filtered.joins[0].alias, "customer_address");
    assert_eq!(assembled.filtered.joins[0].join_type, JoinType::Left);

    let envelope = table.get_data(&adapter, &state).unwrap().into_envelope(state.draw());
    assert_eq!(envelope.draw, 7);
    assert_eq!(envelope.total_records, 3);
    assert_eq!(envelope.total_display_records, 3);
    assert_eq!(names(&envelope), ["Alice", "Bob"]);
    assert_eq!(
        serde_json::Value::Object(envelope.data[1].clone()),
        json!({ "DT_RowId": 2, "id": 2, "name": "Bob", "city": null })
    );
    assert_eq!(envelope.data[0]["city"], "Paris");
}

#[test]
fn second_page_and_descending_order() {
    let adapter = adapter(setup_db());
    let table = customer_table();
    let state = RequestState::builder()
        .start(2)
        .length(2)
        .order("name", OrderDirection::Asc)
        .build(table.columns())
        .unwrap();
    let envelope = table.get_data(&adapter, &state).unwrap().into_envelope(1);
    assert_eq!(names(&envelope), ["Charlie"]);

    let state = RequestState::builder()
        .length(-1)
        .order("city", OrderDirection::Desc)
        .order("name", OrderDirection::Asc)
        .build(table.columns())
        .unwrap();
    let envelope = table.get_data(&adapter, &state).unwrap().into_envelope(1);
    // NULL city sorts last when descending
    assert_eq!(names(&envelope), ["Alice", "Charlie", "Bob"]);
}

#[test]
fn unlimited_length_matches_a_large_page() {
    let adapter = adapter(setup_ledger_db());
    let table = ledger_table();
    let unlimited = RequestState::builder()
        .length(-1)
        .order("balance", OrderDirection::Desc)
        .build(table.columns())
        .unwrap();
    let large = RequestState::builder()
        .length(50)
        .order("balance", OrderDirection::Desc)
        .build(table.columns())
        .unwrap();

    let a = table.get_data(&adapter, &unlimited).unwrap().into_envelope(1);
    let b = table.get_data(&adapter, &large).unwrap().into_envelope(1);
    assert_eq!(a.data, b.data);
    assert_eq!(names(&a), ["Alice", "Bob", "Charlie", "Dave", "Eve"]);
}

#[test]
fn offset_without_limit() {
    let adapter = adapter(setup_ledger_db());
    let table = ledger_table();
    let state = RequestState::builder()
        .start(3)
        .length(-1)
        .order("name", OrderDirection::Asc)
        .build(table.columns())
        .unwrap();
    let envelope = table.get_data(&adapter, &state).unwrap().into_envelope(1);
    assert_eq!(names(&envelope), ["Dave", "Eve"]);
    assert_eq!(envelope.total_display_records, 5);
}

#[test]
fn hidden_columns_carry_the_loading_marker() {
    let adapter = adapter(setup_db());
    let table = ledger_table();
    let state = RequestState::builder().build(table.columns()).unwrap();
    let envelope = table.get_data(&adapter, &state).unwrap().into_envelope(1);

    assert_eq!(envelope.data[0]["country"], r#"<i class="fas fa-circle-notch fa-spin"></i>"#);
    // hidden columns are not joined for selection
    let (assembled, _) = adapter.assemble(&table, &state).unwrap();
    assert_eq!(assembled.filtered.joins.len(), 1);
}

#[test]
fn export_skips_hidden_and_unexportable_columns() {
    let adapter = adapter(setup_db());
    let mut table = ledger_table();
    table.add(ColumnSpec::new("secret").field("address.rent").exportable(false)).unwrap();
    let state = RequestState::builder()
        .exporter("csv")
        .order("name", OrderDirection::Asc)
        .build(table.columns())
        .unwrap();
    let envelope = table.get_data(&adapter, &state).unwrap().into_envelope(1);

    let keys: Vec<_> = envelope.data[0].keys().map(String::as_str).collect();
    assert_eq!(keys, ["DT_RowId", "id", "name", "city", "balance"]);
}

#[test]
fn request_params_drive_the_table() {
    let adapter = adapter(setup_db());
    let table = customer_table();
    let params: RequestParams = serde_json::from_value(json!({
        "_dt": "customers",
        "draw": 3,
        "start": 0,
        "length": 1,
        "order": [{ "column": 1, "dir": "desc" }],
        "columns": [
            { "data": "id", "search": { "value": "" } },
            { "data": "name", "search": { "value": "" } },
            { "data": "city", "search": { "value": "" } }
        ],
        "search": { "value": "" }
    }))
    .unwrap();

    let state = table.parse_request(&params).unwrap();
    let Reply::Data(envelope) = table.handle(&adapter, &state).unwrap() else {
        panic!("expected data");
    };
    assert_eq!(names(&envelope), ["Charlie"]);

    let body = serde_json::to_value(&envelope).unwrap();
    assert_eq!(body["draw"], 3);
    assert_eq!(body["totalRecords"], 3);
    assert_eq!(body["recordsSummary"], serde_json::Value::Null);
    assert_eq!(body.get("error"), Some(&serde_json::Value::Null));
}

#[test]
fn invalid_requests_fail_fast() {
    let table = customer_table();
    assert!(matches!(
        RequestState::builder().start(-1).build(table.columns()),
        Err(DataTableError::InvalidRequest(_))
    ));
    assert!(matches!(
        RequestState::builder().length(-2).build(table.columns()),
        Err(DataTableError::InvalidRequest(_))
    ));
    assert!(matches!(
        RequestState::builder().order("missing", OrderDirection::Asc).build(table.columns()),
        Err(DataTableError::UnknownColumn(_))
    ));
}

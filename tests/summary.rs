mod common;

use common::{adapter, ledger_table, setup_ledger_db};
use datatable::prelude::*;
use serde_json::json;

#[test]
fn summary_covers_every_filtered_row() {
    let adapter = adapter(setup_ledger_db());
    let table = ledger_table();
    let state = RequestState::builder()
        .length(1)
        .filter("#balance# >= 50")
        .summary(true)
        .build(table.columns())
        .unwrap();

    let result = table.get_data(&adapter, &state).unwrap();
    assert_eq!(result.filtered_rows(), 2);
    let summary = result.summary().unwrap();
    assert_eq!(summary["balance"].sum, Some(150.0));
    assert_eq!(summary["balance"].avg, Some(75.0));
    // text columns are not aggregated
    assert!(!summary.contains_key("name"));

    let envelope = result.into_envelope(4);
    assert_eq!(envelope.data.len(), 1);
    let body = serde_json::to_value(&envelope).unwrap();
    assert_eq!(body["recordsSummary"], json!({ "balance": { "sum": 150.0, "avg": 75.0 } }));
}

#[test]
fn computed_columns_aggregate_over_the_whole_expression() {
    let adapter = adapter(setup_ledger_db());
    let mut table = ledger_table();
    table
        .add(
            ColumnSpec::new("double_balance")
                .kind(ColumnKind::Numeric)
                .order_field("customer.balance + customer.balance"),
        )
        .unwrap();
    let state = RequestState::builder()
        .filter("#balance# >= 50")
        .summary(true)
        .build(table.columns())
        .unwrap();

    let result = table.get_data(&adapter, &state).unwrap();
    let summary = result.summary().unwrap();
    assert_eq!(summary["double_balance"].sum, Some(300.0));
    assert_eq!(summary["double_balance"].avg, Some(150.0));
    assert_eq!(summary["balance"].sum, Some(150.0));
    assert!(result.error().is_none());
}

#[test]
fn summary_follows_joined_filters() {
    let adapter = adapter(setup_ledger_db());
    let table = ledger_table();
    let state = RequestState::builder()
        .filter("@address.country.code@ = 'FR'")
        .summary(true)
        .build(table.columns())
        .unwrap();

    let result = table.get_data(&adapter, &state).unwrap();
    // Alice and Dave live in Paris
    let aggregate = result.summary().unwrap()["balance"];
    assert_eq!(aggregate.sum, Some(105.0));
    assert_eq!(aggregate.avg, Some(52.5));
}

#[test]
fn summary_is_null_unless_requested() {
    let adapter = adapter(setup_ledger_db());
    let table = ledger_table();
    let state = RequestState::builder().build(table.columns()).unwrap();

    let envelope = table.get_data(&adapter, &state).unwrap().into_envelope(1);
    assert!(envelope.records_summary.is_none());
    let body = serde_json::to_value(&envelope).unwrap();
    assert_eq!(body["recordsSummary"], serde_json::Value::Null);
}

#[test]
fn empty_selection_has_no_aggregates() {
    let adapter = adapter(setup_ledger_db());
    let table = ledger_table();
    let state = RequestState::builder()
        .filter("#balance# > 1000")
        .summary(true)
        .build(table.columns())
        .unwrap();

    let result = table.get_data(&adapter, &state).unwrap();
    assert_eq!(result.filtered_rows(), 0);
    let aggregate = result.summary().unwrap()["balance"];
    assert_eq!(aggregate.sum, None);
    assert_eq!(aggregate.avg, None);
}

mod common;

use common::{adapter, customer_table, setup_db};
use datatable::prelude::*;
use serde_json::json;

fn echo(name: &str) -> BatchAction {
    BatchAction::new(name, |ids: Vec<Value>, prompt: Option<&str>| json!({ "ids": ids, "prompt": prompt }))
}

fn table() -> DataTable {
    let mut table = customer_table();
    table
        .add_batch_action(echo("archive").label("Archive").group(1))
        .add_batch_action(echo("export_all").without_selection(true).dropdown(true));
    table
}

fn run(table: &DataTable, state: RequestState) -> serde_json::Value {
    let adapter = adapter(setup_db());
    match table.handle(&adapter, &state).unwrap() {
        Reply::Batch(body) => body,
        Reply::Data(_) => panic!("expected a batch reply"),
    }
}

#[test]
fn no_selection_means_every_filtered_row() {
    let table = table();
    let state = RequestState::builder()
        .length(1)
        .filter("#city# IS NOT NULL")
        .batch_action("archive")
        .build(table.columns())
        .unwrap();

    let body = run(&table, state);
    let mut ids: Vec<i64> = body["ids"].as_array().unwrap().iter().filter_map(|v| v.as_i64()).collect();
    ids.sort_unstable();
    // paging does not narrow the selection
    assert_eq!(ids, [1, 3]);
    assert_eq!(body["prompt"], serde_json::Value::Null);
}

#[test]
fn explicit_ids_and_prompt_pass_through() {
    let table = table();
    let state = RequestState::builder()
        .batch_action("archive")
        .batch_ids(vec![Value::Integer(2)])
        .batch_action_prompt("why not")
        .build(table.columns())
        .unwrap();

    assert_eq!(run(&table, state), json!({ "ids": [2], "prompt": "why not" }));
}

#[test]
fn actions_without_selection_get_no_ids() {
    let table = table();
    let state = RequestState::builder()
        .batch_action("export_all")
        .batch_ids(vec![Value::Integer(1)])
        .build(table.columns())
        .unwrap();

    assert_eq!(run(&table, state)["ids"], json!([]));
}

#[test]
fn unknown_actions_are_rejected() {
    let table = table();
    let adapter = adapter(setup_db());
    let state = RequestState::builder()
        .batch_action("purge")
        .build(table.columns())
        .unwrap();

    let err = table.handle(&adapter, &state).unwrap_err();
    assert!(matches!(err, DataTableError::UnknownBatchAction(ref name) if name == "purge"));
}

#[test]
fn grouping_separates_dropdown_actions() {
    let table = table();
    let grouped = table.grouped_batch_actions();
    assert!(grouped.groups[&0].is_empty());
    assert_eq!(grouped.groups[&1][0].label, "Archive");
    assert_eq!(grouped.dropdown.len(), 1);
    assert_eq!(grouped.dropdown[0].name, "export_all");
}

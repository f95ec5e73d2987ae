//! Table definitions: columns, options, hooks and batch actions of one grid.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{
    adapter::Adapter,
    backend::JoinType,
    column::{ColumnSpec, Columns},
    error::{DataTableError, Result},
    pipeline::{LOADING_MARKER, RowTransform},
    result::{Envelope, ResultSet},
    state::{RequestParams, RequestState},
    value::Value,
};

const fn default_page_length() -> i64 {
    10
}

fn default_loading_marker() -> String {
    LOADING_MARKER.to_string()
}

/// Per-table options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableOptions {
    /// Root alias of the main query; defaults to the entity's short name
    #[serde(default)]
    pub root_alias: Option<String>,

    /// Rows per page when the request carries no length; -1 for all
    #[serde(default = "default_page_length")]
    pub page_length: i64,

    /// Emitted in place of hidden columns
    #[serde(default = "default_loading_marker")]
    pub loading_marker: String,

    /// Join type of the selection paths of visible columns
    #[serde(default)]
    pub selection_join: JoinType,
}

impl Default for TableOptions {
    fn default() -> Self {
        Self {
            root_alias: None,
            page_length: default_page_length(),
            loading_marker: default_loading_marker(),
            selection_join: JoinType::default(),
        }
    }
}

/// Callback of a batch action: `(ids, prompt) -> response`.
pub type BatchCallback = Arc<dyn Fn(Vec<Value>, Option<&str>) -> serde_json::Value + Send + Sync>;

/// Bulk operation over selected (or all filtered) rows.
#[derive(Clone)]
pub struct BatchAction {
    pub name: String,
    pub label: String,
    pub group: u32,
    pub dropdown: bool,
    /// Runs without ids instead of on the selection
    pub without_selection: bool,
    callback: BatchCallback,
}

impl BatchAction {
    pub fn new<F>(name: impl Into<String>, callback: F) -> Self
    where
        F: Fn(Vec<Value>, Option<&str>) -> serde_json::Value + Send + Sync + 'static,
    {
        let name = name.into();
        Self {
            label: name.clone(),
            name,
            group: 0,
            dropdown: false,
            without_selection: false,
            callback: Arc::new(callback),
        }
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn group(mut self, group: u32) -> Self {
        self.group = group;
        self
    }

    pub fn dropdown(mut self, dropdown: bool) -> Self {
        self.dropdown = dropdown;
        self
    }

    pub fn without_selection(mut self, without_selection: bool) -> Self {
        self.without_selection = without_selection;
        self
    }

    pub fn run(&self, ids: Vec<Value>, prompt: Option<&str>) -> serde_json::Value {
        (self.callback)(ids, prompt)
    }
}

impl std::fmt::Debug for BatchAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchAction")
            .field("name", &self.name)
            .field("label", &self.label)
            .field("group", &self.group)
            .field("dropdown", &self.dropdown)
            .field("without_selection", &self.without_selection)
            .finish_non_exhaustive()
    }
}

/// Batch actions laid out for the toolbar. Group 0 is always present.
#[derive(Debug, Default)]
pub struct GroupedBatchActions<'t> {
    pub groups: BTreeMap<u32, Vec<&'t BatchAction>>,
    pub dropdown: Vec<&'t BatchAction>,
}

/// Outcome of [`DataTable::handle`].
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Response of a batch action callback
    Batch(serde_json::Value),
    Data(Envelope),
}

/// A grid over one root entity.
pub struct DataTable {
    name: String,
    entity: String,
    columns: Columns,
    options: TableOptions,
    transformer: Option<RowTransform>,
    batch_actions: Vec<BatchAction>,
}

impl DataTable {
    pub fn new(name: impl Into<String>, entity: impl Into<String>) -> Self {
        Self::with_options(name, entity, TableOptions::default())
    }

    pub fn with_options(name: impl Into<String>, entity: impl Into<String>, options: TableOptions) -> Self {
        Self {
            name: name.into(),
            entity: entity.into(),
            columns: Columns::new(),
            options,
            transformer: None,
            batch_actions: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn entity(&self) -> &str {
        &self.entity
    }

    /// Registers a column. Names are unique.
    pub fn add(&mut self, column: ColumnSpec) -> Result<&mut Self> {
        self.columns.add(column)?;
        Ok(self)
    }

    pub fn remove(&mut self, name: &str) -> Result<ColumnSpec> {
        self.columns.remove(name)
    }

    pub fn columns(&self) -> &Columns {
        &self.columns
    }

    pub fn options(&self) -> &TableOptions {
        &self.options
    }

    pub fn transformer(&self) -> Option<&RowTransform> {
        self.transformer.as_ref()
    }

    /// Installs the whole-row transform.
    pub fn set_transformer(&mut self, transformer: RowTransform) -> &mut Self {
        self.transformer = Some(transformer);
        self
    }

    pub fn add_batch_action(&mut self, action: BatchAction) -> &mut Self {
        self.batch_actions.retain(|a| a.name != action.name);
        self.batch_actions.push(action);
        self
    }

    pub fn batch_actions(&self) -> &[BatchAction] {
        &self.batch_actions
    }

    /// Dropdown actions apart, the rest bucketed by group in ascending order.
    pub fn grouped_batch_actions(&self) -> GroupedBatchActions<'_> {
        let mut grouped = GroupedBatchActions::default();
        grouped.groups.insert(0, Vec::new());
        for action in &self.batch_actions {
            if action.dropdown {
                grouped.dropdown.push(action);
            } else {
                grouped.groups.entry(action.group).or_default().push(action);
            }
        }
        grouped
    }

    /// Validates raw widget parameters against this table's columns.
    pub fn parse_request(&self, params: &RequestParams) -> Result<RequestState> {
        RequestState::from_params(params, &self.columns, self.options.page_length)
    }

    pub fn get_data<'s, A: Adapter>(&'s self, adapter: &'s A, state: &'s RequestState) -> Result<ResultSet<'s>> {
        adapter.get_data(self, state)
    }

    pub fn get_count<A: Adapter>(&self, adapter: &A, state: &RequestState) -> Result<u64> {
        adapter.count(self, state)
    }

    pub fn get_ids<A: Adapter>(&self, adapter: &A, state: &RequestState, limit: Option<u64>) -> Result<Vec<Value>> {
        adapter.ids(self, state, limit)
    }

    /// Runs the requested batch action, or fetches the page and drains it
    /// into an envelope.
    ///
    /// A batch action works on the explicit selection of the request, or on
    /// every filtered id when nothing was selected.
    pub fn handle<A: Adapter>(&self, adapter: &A, state: &RequestState) -> Result<Reply> {
        if let Some(name) = state.batch_action() {
            let action = self
                .batch_actions
                .iter()
                .find(|a| a.name == name)
                .ok_or_else(|| DataTableError::UnknownBatchAction(name.to_string()))?;

            let ids = if action.without_selection {
                Vec::new()
            } else if !state.batch_ids().is_empty() {
                state.batch_ids().to_vec()
            } else {
                self.get_ids(adapter, state, None)?
            };
            return Ok(Reply::Batch(action.run(ids, state.batch_action_prompt())));
        }

        Ok(Reply::Data(self.get_data(adapter, state)?.into_envelope(state.draw())))
    }
}

impl std::fmt::Debug for DataTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataTable")
            .field("name", &self.name)
            .field("entity", &self.entity)
            .field("columns", &self.columns)
            .field("options", &self.options)
            .field("transformer", &self.transformer.is_some())
            .field("batch_actions", &self.batch_actions)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn tables_are_shareable() {
        assert_send_sync::<DataTable>();
    }

    #[test]
    fn options_defaults() {
        let options: TableOptions = serde_json::from_value(json!({ "rootAlias": "c" })).unwrap();
        assert_eq!(options.root_alias.as_deref(), Some("c"));
        assert_eq!(options.page_length, 10);
        assert_eq!(options.loading_marker, LOADING_MARKER);
        assert_eq!(options.selection_join, JoinType::Left);
    }

    #[test]
    fn duplicate_columns_are_rejected() {
        let mut table = DataTable::new("customers", "Customer");
        table.add(ColumnSpec::new("name")).unwrap();
        assert!(matches!(
            table.add(ColumnSpec::new("name")),
            Err(DataTableError::DuplicateColumn(name)) if name == "name"
        ));
    }

    #[test]
    fn batch_actions_are_grouped() {
        let mut table = DataTable::new("customers", "Customer");
        let noop = |_: Vec<Value>, _: Option<&str>| serde_json::Value::Null;
        table
            .add_batch_action(BatchAction::new("archive", noop).group(2))
            .add_batch_action(BatchAction::new("export", noop).dropdown(true))
            .add_batch_action(BatchAction::new("delete", noop).group(1))
            .add_batch_action(BatchAction::new("tag", noop).group(2));

        let grouped = table.grouped_batch_actions();
        let groups: Vec<_> = grouped
            .groups
            .iter()
            .map(|(group, actions)| (*group, actions.iter().map(|a| a.name.as_str()).collect::<Vec<_>>()))
            .collect();
        assert_eq!(
            groups,
            [(0, vec![]), (1, vec!["delete"]), (2, vec!["archive", "tag"])]
        );
        assert_eq!(grouped.dropdown.len(), 1);
        assert_eq!(grouped.dropdown[0].name, "export");
    }

    #[test]
    fn parse_request_uses_page_length() {
        let mut table = DataTable::with_options(
            "customers",
            "Customer",
            TableOptions {
                page_length: 25,
                ..TableOptions::default()
            },
        );
        table.add(ColumnSpec::new("id")).unwrap();
        let state = table.parse_request(&RequestParams::default()).unwrap();
        assert_eq!(state.length(), Some(25));
    }
}

//! Parsed and validated state of one grid request.

use serde::{Deserialize, Serialize};

use crate::{
    column::Columns,
    error::{DataTableError, Result},
    value::Value,
};

/// Sort direction for ORDER BY clauses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderDirection {
    #[default]
    Asc,
    Desc,
}

impl OrderDirection {
    /// Parses `asc`/`desc` case-insensitively. Anything else sorts ascending.
    pub fn parse(s: &str) -> Self {
        if s.eq_ignore_ascii_case("desc") {
            OrderDirection::Desc
        } else {
            OrderDirection::Asc
        }
    }
}

/// Sort directive on a named column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderClause {
    pub column: String,
    pub direction: OrderDirection,
}

/// Immutable request state. Column references are validated against the
/// table's columns when built.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestState {
    draw: u64,
    start: u64,
    length: Option<u64>,
    order_by: Vec<OrderClause>,
    search_columns: Vec<(String, String)>,
    global_search: Option<String>,
    filter: Option<String>,
    wants_summary: bool,
    exporter: Option<String>,
    batch_action: Option<String>,
    batch_ids: Vec<Value>,
    batch_action_prompt: Option<String>,
}

impl RequestState {
    pub fn builder() -> RequestStateBuilder {
        RequestStateBuilder::default()
    }

    pub fn draw(&self) -> u64 {
        self.draw
    }

    pub fn start(&self) -> u64 {
        self.start
    }

    /// Page size; `None` means no limit.
    pub fn length(&self) -> Option<u64> {
        self.length
    }

    pub fn order_by(&self) -> &[OrderClause] {
        &self.order_by
    }

    /// Per-column search terms in request order.
    pub fn search_columns(&self) -> &[(String, String)] {
        &self.search_columns
    }

    pub fn global_search(&self) -> Option<&str> {
        self.global_search.as_deref()
    }

    /// Advanced filter expression with `#column#` / `@path@` placeholders.
    pub fn filter(&self) -> Option<&str> {
        self.filter.as_deref()
    }

    pub fn wants_summary(&self) -> bool {
        self.wants_summary
    }

    pub fn exporter(&self) -> Option<&str> {
        self.exporter.as_deref()
    }

    pub fn is_export(&self) -> bool {
        self.exporter.is_some()
    }

    pub fn batch_action(&self) -> Option<&str> {
        self.batch_action.as_deref()
    }

    pub fn batch_ids(&self) -> &[Value] {
        &self.batch_ids
    }

    pub fn batch_action_prompt(&self) -> Option<&str> {
        self.batch_action_prompt.as_deref()
    }

    /// Builds the state from raw widget parameters. Column indexes in
    /// `order[]` and `columns[]` are positions in `columns`.
    pub fn from_params(params: &RequestParams, columns: &Columns, default_length: i64) -> Result<Self> {
        let mut builder = RequestState::builder()
            .draw(params.draw)
            .start(params.start)
            .length(params.length.unwrap_or(default_length))
            .summary(params.show_summary)
            .batch_ids(params.batch_ids.clone());

        for order in &params.order {
            let column = columns.at(order.column)?;
            builder = builder.order(column.name(), OrderDirection::parse(&order.dir));
        }

        for (index, column) in params.columns.iter().enumerate() {
            let term = column.search.value.trim();
            if term.is_empty() {
                continue;
            }
            builder = builder.search(columns.at(index)?.name(), term);
        }

        if !params.search.value.trim().is_empty() {
            builder = builder.global_search(params.search.value.trim());
        }
        if let Some(dql) = &params.dql {
            builder = builder.filter(dql.clone());
        }
        if let Some(exporter) = &params.exporter {
            builder = builder.exporter(exporter.clone());
        }
        if let Some(action) = &params.batch_action {
            builder = builder.batch_action(action.clone());
        }
        if let Some(prompt) = &params.batch_action_prompt {
            builder = builder.batch_action_prompt(prompt.clone());
        }

        builder.build(columns)
    }
}

/// Builder for [`RequestState`].
#[derive(Debug, Clone, Default)]
pub struct RequestStateBuilder {
    draw: u64,
    start: i64,
    length: Option<i64>,
    order_by: Vec<(String, OrderDirection)>,
    search_columns: Vec<(String, String)>,
    global_search: Option<String>,
    filter: Option<String>,
    wants_summary: bool,
    exporter: Option<String>,
    batch_action: Option<String>,
    batch_ids: Vec<Value>,
    batch_action_prompt: Option<String>,
}

impl RequestStateBuilder {
    pub fn draw(mut self, draw: u64) -> Self {
        self.draw = draw;
        self
    }

    pub fn start(mut self, start: i64) -> Self {
        self.start = start;
        self
    }

    /// Page size; `-1` removes the limit.
    pub fn length(mut self, length: i64) -> Self {
        self.length = Some(length);
        self
    }

    pub fn order(mut self, column: impl Into<String>, direction: OrderDirection) -> Self {
        self.order_by.push((column.into(), direction));
        self
    }

    pub fn search(mut self, column: impl Into<String>, term: impl Into<String>) -> Self {
        self.search_columns.push((column.into(), term.into()));
        self
    }

    pub fn global_search(mut self, term: impl Into<String>) -> Self {
        self.global_search = Some(term.into());
        self
    }

    pub fn filter(mut self, expression: impl Into<String>) -> Self {
        self.filter = Some(expression.into());
        self
    }

    pub fn summary(mut self, wants_summary: bool) -> Self {
        self.wants_summary = wants_summary;
        self
    }

    pub fn exporter(mut self, name: impl Into<String>) -> Self {
        self.exporter = Some(name.into());
        self
    }

    pub fn batch_action(mut self, name: impl Into<String>) -> Self {
        self.batch_action = Some(name.into());
        self
    }

    pub fn batch_ids(mut self, ids: Vec<Value>) -> Self {
        self.batch_ids = ids;
        self
    }

    pub fn batch_action_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.batch_action_prompt = Some(prompt.into());
        self
    }

    pub fn build(self, columns: &Columns) -> Result<RequestState> {
        if self.start < 0 {
            return Err(DataTableError::InvalidRequest(format!(
                "start must be >= 0, got {}",
                self.start
            )));
        }
        let length = match self.length {
            None | Some(-1) => None,
            Some(n) if n < -1 => {
                return Err(DataTableError::InvalidRequest(format!(
                    "length must be >= -1, got {n}"
                )));
            }
            Some(n) => Some(n as u64),
        };

        let mut order_by = Vec::with_capacity(self.order_by.len());
        for (column, direction) in self.order_by {
            columns.get(&column)?;
            order_by.push(OrderClause { column, direction });
        }
        for (column, _) in &self.search_columns {
            columns.get(column)?;
        }

        Ok(RequestState {
            draw: self.draw,
            start: self.start as u64,
            length,
            order_by,
            search_columns: self.search_columns,
            global_search: self.global_search.filter(|s| !s.trim().is_empty()),
            filter: self.filter,
            wants_summary: self.wants_summary,
            exporter: self.exporter,
            batch_action: self.batch_action,
            batch_ids: self.batch_ids,
            batch_action_prompt: self.batch_action_prompt,
        })
    }
}

// ==================== wire parameters ====================

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SearchParam {
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct OrderParam {
    pub column: usize,
    pub dir: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ColumnParam {
    pub data: Option<String>,
    pub name: Option<String>,
    pub search: SearchParam,
}

/// Raw request body sent by the grid widget.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RequestParams {
    /// Name of the table the request targets
    #[serde(rename = "_dt")]
    pub table: Option<String>,
    pub draw: u64,
    pub start: i64,
    pub length: Option<i64>,
    pub order: Vec<OrderParam>,
    pub columns: Vec<ColumnParam>,
    pub search: SearchParam,
    pub dql: Option<String>,
    pub show_summary: bool,
    #[serde(rename = "_exporter")]
    pub exporter: Option<String>,
    pub batch_action: Option<String>,
    pub batch_ids: Vec<Value>,
    pub batch_action_prompt: Option<String>,
}

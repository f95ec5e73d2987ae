//! Column definitions and the ordered column registry.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{
    error::{DataTableError, Result},
    record::Record,
    sql::{Sql, Token},
    value::Value,
};

/// Name of the column that is always emitted, whatever its visibility.
pub const IDENTIFIER_COLUMN: &str = "id";

/// Data kind of a column. Drives searching and aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    #[default]
    Generic,
    Text,
    Numeric,
    Boolean,
    Date,
}

/// Aggregates produced for the summary row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregateFunction {
    Sum,
    Avg,
}

impl AggregateFunction {
    pub const ALL: [AggregateFunction; 2] = [AggregateFunction::Sum, AggregateFunction::Avg];

    pub const fn name(&self) -> &'static str {
        match self {
            AggregateFunction::Sum => "SUM",
            AggregateFunction::Avg => "AVG",
        }
    }
}

impl ColumnKind {
    pub const fn is_aggregatable(&self) -> bool {
        matches!(self, ColumnKind::Numeric)
    }

    /// `SUM(expr)` / `AVG(expr)` for aggregatable kinds.
    pub fn aggregation_expression(&self, function: AggregateFunction, expr: &str) -> Option<Sql> {
        if !self.is_aggregatable() {
            return None;
        }
        Some(Sql::func(function.name(), Sql::raw(expr.to_string())))
    }

    /// Predicate matching `term` against `expr`, or `None` when the term
    /// cannot apply to this kind (a non-numeric term on a numeric column).
    pub fn search_predicate(&self, expr: &str, term: &str) -> Option<Sql> {
        let term = term.trim();
        if term.is_empty() {
            return None;
        }
        match self {
            ColumnKind::Numeric => {
                let value = match term.parse::<i64>() {
                    Ok(i) => Value::Integer(i),
                    Err(_) => Value::Real(term.parse::<f64>().ok().filter(|f| f.is_finite())?),
                };
                Some(
                    Sql::raw(expr.to_string())
                        .push(Token::EQ)
                        .append(Sql::param(value)),
                )
            }
            ColumnKind::Boolean => {
                let flag = match term.to_ascii_lowercase().as_str() {
                    "1" | "true" | "yes" | "on" => 1,
                    "0" | "false" | "no" | "off" => 0,
                    _ => return None,
                };
                Some(Sql::raw(expr.to_string()).push(Token::EQ).append(Sql::number(flag)))
            }
            ColumnKind::Generic | ColumnKind::Text | ColumnKind::Date => Some(like_predicate(expr, term)),
        }
    }
}

/// `LOWER(expr) LIKE ? ESCAPE '\'` with `%`, `_` and `\` escaped in the term.
pub(crate) fn like_predicate(expr: &str, term: &str) -> Sql {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.to_lowercase().chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');

    Sql::func("LOWER", Sql::raw(expr.to_string()))
        .push(Token::LIKE)
        .append(Sql::param(pattern))
        .push(Token::ESCAPE)
        .append(Sql::raw("'\\'"))
}

/// Flags handed to column transforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransformContext {
    pub display: bool,
    pub export: bool,
}

impl TransformContext {
    pub const DISPLAY: TransformContext = TransformContext {
        display: true,
        export: false,
    };
    pub const EXPORT: TransformContext = TransformContext {
        display: false,
        export: true,
    };
}

/// Per-column value transform: `(value, record, context) -> value`.
pub type ColumnTransform =
    Arc<dyn Fn(serde_json::Value, &Record, TransformContext) -> serde_json::Value + Send + Sync>;

/// One column of a table. Immutable once registered.
#[derive(Clone)]
pub struct ColumnSpec {
    name: String,
    field: Option<String>,
    property_path: Option<String>,
    order_field: Option<String>,
    kind: ColumnKind,
    visible: bool,
    orderable: bool,
    searchable: bool,
    exportable: bool,
    transform: Option<ColumnTransform>,
}

impl std::fmt::Debug for ColumnSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ColumnSpec")
            .field("name", &self.name)
            .field("field", &self.field)
            .field("order_field", &self.order_field)
            .field("kind", &self.kind)
            .field("visible", &self.visible)
            .field("orderable", &self.orderable)
            .field("searchable", &self.searchable)
            .field("exportable", &self.exportable)
            .field("transform", &self.transform.is_some())
            .finish()
    }
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field: None,
            property_path: None,
            order_field: None,
            kind: ColumnKind::Generic,
            visible: true,
            orderable: true,
            searchable: true,
            exportable: true,
            transform: None,
        }
    }

    // ==================== builder methods ====================

    /// Dotted field path, optionally prefixed with the root alias.
    pub fn field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    /// Explicit property path on the hydrated record, bypassing mapping.
    pub fn property_path(mut self, path: impl Into<String>) -> Self {
        self.property_path = Some(path.into());
        self
    }

    /// Alias-qualified expression used for ordering and `#name#` filters.
    pub fn order_field(mut self, expr: impl Into<String>) -> Self {
        self.order_field = Some(expr.into());
        self
    }

    pub fn kind(mut self, kind: ColumnKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    pub fn orderable(mut self, orderable: bool) -> Self {
        self.orderable = orderable;
        self
    }

    pub fn searchable(mut self, searchable: bool) -> Self {
        self.searchable = searchable;
        self
    }

    pub fn exportable(mut self, exportable: bool) -> Self {
        self.exportable = exportable;
        self
    }

    pub fn transform<F>(mut self, transform: F) -> Self
    where
        F: Fn(serde_json::Value, &Record, TransformContext) -> serde_json::Value
            + Send
            + Sync
            + 'static,
    {
        self.transform = Some(Arc::new(transform));
        self
    }

    // ==================== accessors ====================

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn field_path(&self) -> Option<&str> {
        self.field.as_deref()
    }

    pub fn explicit_property_path(&self) -> Option<&str> {
        self.property_path.as_deref()
    }

    pub fn order_field_override(&self) -> Option<&str> {
        self.order_field.as_deref()
    }

    pub fn column_kind(&self) -> ColumnKind {
        self.kind
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn is_orderable(&self) -> bool {
        self.orderable
    }

    pub fn is_searchable(&self) -> bool {
        self.searchable
    }

    pub fn is_exportable(&self) -> bool {
        self.exportable
    }

    pub fn is_identifier(&self) -> bool {
        self.name == IDENTIFIER_COLUMN
    }

    /// Applies the configured transform, or passes the value through.
    pub fn apply_transform(
        &self,
        value: serde_json::Value,
        record: &Record,
        context: TransformContext,
    ) -> serde_json::Value {
        match &self.transform {
            Some(transform) => transform(value, record, context),
            None => value,
        }
    }
}

/// Ordered column registry with unique names.
#[derive(Debug, Clone, Default)]
pub struct Columns {
    columns: Vec<ColumnSpec>,
}

impl Columns {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, column: ColumnSpec) -> Result<()> {
        if self.by_name(column.name()).is_some() {
            return Err(DataTableError::DuplicateColumn(column.name().to_string()));
        }
        self.columns.push(column);
        Ok(())
    }

    pub fn remove(&mut self, name: &str) -> Result<ColumnSpec> {
        let index = self
            .index_of(name)
            .ok_or_else(|| DataTableError::UnknownColumn(name.to_string()))?;
        Ok(self.columns.remove(index))
    }

    pub fn by_name(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn get(&self, name: &str) -> Result<&ColumnSpec> {
        self.by_name(name)
            .ok_or_else(|| DataTableError::UnknownColumn(name.to_string()))
    }

    pub fn at(&self, index: usize) -> Result<&ColumnSpec> {
        self.columns
            .get(index)
            .ok_or_else(|| DataTableError::UnknownColumn(format!("#{index}")))
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ColumnSpec> {
        self.columns.iter()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl<'a> IntoIterator for &'a Columns {
    type Item = &'a ColumnSpec;
    type IntoIter = std::slice::Iter<'a, ColumnSpec>;

    fn into_iter(self) -> Self::IntoIter {
        self.columns.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::Dialect;

    #[test]
    fn duplicate_names_are_rejected() {
        let mut columns = Columns::new();
        columns.add(ColumnSpec::new("name")).unwrap();
        let err = columns.add(ColumnSpec::new("name")).unwrap_err();
        assert!(matches!(err, DataTableError::DuplicateColumn(n) if n == "name"));
        assert_eq!(columns.len(), 1);
    }

    #[test]
    fn remove_and_lookup() {
        let mut columns = Columns::new();
        columns.add(ColumnSpec::new("id")).unwrap();
        columns.add(ColumnSpec::new("name")).unwrap();
        assert_eq!(columns.at(1).unwrap().name(), "name");
        columns.remove("id").unwrap();
        assert_eq!(columns.index_of("name"), Some(0));
        assert!(matches!(
            columns.remove("id"),
            Err(DataTableError::UnknownColumn(_))
        ));
    }

    #[test]
    fn only_numeric_aggregates() {
        assert!(ColumnKind::Numeric.is_aggregatable());
        assert!(ColumnKind::Text.aggregation_expression(AggregateFunction::Sum, "c.x").is_none());
        let sql = ColumnKind::Numeric
            .aggregation_expression(AggregateFunction::Avg, "c.amount")
            .unwrap();
        assert_eq!(sql.sql(Dialect::SQLite), "AVG(c.amount)");
    }

    #[test]
    fn search_predicates() {
        let like = ColumnKind::Text.search_predicate("c.name", "50%_Off").unwrap();
        let (text, params) = like.build(Dialect::SQLite);
        assert_eq!(text, r"LOWER(c.name) LIKE ? ESCAPE '\'");
        assert_eq!(params[0], &Value::Text(r"%50\%\_off%".into()));

        let eq = ColumnKind::Numeric.search_predicate("c.amount", "42").unwrap();
        assert_eq!(eq.sql(Dialect::SQLite), "c.amount = ?");
        assert!(ColumnKind::Numeric.search_predicate("c.amount", "abc").is_none());
        assert!(ColumnKind::Text.search_predicate("c.name", "  ").is_none());
    }

    #[test]
    fn non_finite_numbers_are_not_searched() {
        for term in ["NaN", "inf", "-inf", "infinity", "1e999"] {
            assert!(ColumnKind::Numeric.search_predicate("c.amount", term).is_none(), "{term}");
        }
        let real = ColumnKind::Numeric.search_predicate("c.amount", "2.5").unwrap();
        assert_eq!(real.build(Dialect::SQLite).1[0], &Value::Real(2.5));
    }

    #[test]
    fn transform_defaults_to_identity() {
        let record = Record::new("Customer");
        let plain = ColumnSpec::new("name");
        assert_eq!(
            plain.apply_transform(serde_json::json!("x"), &record, TransformContext::DISPLAY),
            serde_json::json!("x")
        );

        let upper = ColumnSpec::new("name").transform(|value, _, ctx| {
            if ctx.export {
                value
            } else {
                serde_json::json!(value.as_str().unwrap_or_default().to_uppercase())
            }
        });
        assert_eq!(
            upper.apply_transform(serde_json::json!("x"), &record, TransformContext::DISPLAY),
            serde_json::json!("X")
        );
    }
}

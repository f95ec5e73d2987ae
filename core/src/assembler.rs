//! Builds the filtered, count, id, paged and summary queries of a request
//! from one join graph.

use hashbrown::HashMap;

use crate::{
    backend::{JoinType, Query},
    column::{AggregateFunction, ColumnSpec, Columns},
    error::Result,
    resolver::{AssemblyContext, ResolvedField},
    rewriter::rewrite,
    schema::MetadataProvider,
    sql::{Sql, Token},
    state::{OrderDirection, RequestState},
};

/// Root alias of the summary query's separate join graph.
pub const SUMMARY_ROOT_ALIAS: &str = "top";

/// Aggregate query plus the `(alias, column name, function)` of every
/// selected aggregate.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryQuery {
    pub query: Query,
    pub columns: Vec<(String, String, AggregateFunction)>,
}

/// Output of one assembly pass.
#[derive(Debug, Clone)]
pub struct Assembled {
    /// Base query with every filter applied, selecting the resolved fields
    pub filtered: Query,
    /// `COUNT(DISTINCT id)` before search and filter predicates
    pub total: Query,
    /// `COUNT(DISTINCT id)` of the filtered query
    pub count: Query,
    /// `DISTINCT id` of the filtered query, unordered and unbounded
    pub ids: Query,
    /// Ordering of the filtered query
    pub order: Vec<(String, OrderDirection)>,
    pub summary: Option<SummaryQuery>,
    /// `<root>.<identifier>`
    pub identifier: String,
    /// Association paths to hydrate with each record
    pub relations: Vec<String>,
    /// Column name -> field resolved in this pass
    pub overlay: HashMap<String, ResolvedField>,
}

impl Assembled {
    /// Id query with ordering and the paging window applied.
    pub fn paged(&self, start: u64, length: Option<u64>) -> Query {
        self.ordered_ids().window(start, length)
    }

    /// Id extraction for batch operations. A limit applies the ordering;
    /// without one, ids come back in backend order.
    pub fn ids_query(&self, limit: Option<u64>) -> Query {
        match limit {
            Some(limit) => self.ordered_ids().window(0, Some(limit)),
            None => self.ids.clone(),
        }
    }

    fn ordered_ids(&self) -> Query {
        self.order
            .iter()
            .fold(self.ids.clone(), |query, (expr, direction)| {
                query.order_by(expr.clone(), *direction)
            })
    }
}

/// Derives the queries of a request from the table's columns.
pub struct QueryAssembler<'a> {
    provider: &'a dyn MetadataProvider,
    entity: &'a str,
    root_alias: String,
    selection_join: JoinType,
    columns: &'a Columns,
}

impl<'a> QueryAssembler<'a> {
    pub fn new(
        provider: &'a dyn MetadataProvider,
        entity: &'a str,
        root_alias: impl Into<String>,
        columns: &'a Columns,
    ) -> Self {
        Self {
            provider,
            entity,
            root_alias: root_alias.into(),
            selection_join: JoinType::Left,
            columns,
        }
    }

    /// Join type for the primary selection paths of visible columns.
    pub fn selection_join(mut self, join_type: JoinType) -> Self {
        self.selection_join = join_type;
        self
    }

    pub fn assemble(&self, state: &RequestState) -> Result<Assembled> {
        let mut ctx = AssemblyContext::new(self.provider, self.entity, self.root_alias.clone())?
            .with_default_join(self.selection_join);
        let identifier = ctx.identifier_expr()?;

        for column in self.columns {
            if column.is_visible() || column.is_identifier() {
                ctx.field_for(column)?;
            }
        }

        let mut order = Vec::with_capacity(state.order_by().len());
        for clause in state.order_by() {
            let column = self.columns.get(&clause.column)?;
            if !column.is_orderable() {
                continue;
            }
            let resolved = ctx.field_for(column)?;
            let expr = column
                .order_field_override()
                .map(str::to_string)
                .or_else(|| resolved.map(|f| f.expr()));
            if let Some(expr) = expr {
                order.push((expr, clause.direction));
            }
        }

        let filter = match state.filter() {
            Some(expression) => rewrite(expression, self.columns, &mut ctx)?,
            None => None,
        };

        let mut predicates = Vec::new();
        if let Some(filter) = filter {
            predicates.push(Sql::raw(filter));
        }
        if let Some(term) = state.global_search() {
            let mut alternatives = Vec::new();
            for column in self.columns {
                if !column.is_visible() || !column.is_searchable() {
                    continue;
                }
                if let Some(predicate) = search_expr(&mut ctx, column)?
                    .and_then(|expr| column.column_kind().search_predicate(&expr, term))
                {
                    alternatives.push(predicate);
                }
            }
            if !alternatives.is_empty() {
                predicates.push(Sql::join(alternatives, Token::OR));
            }
        }
        for (name, term) in state.search_columns() {
            let column = self.columns.get(name)?;
            if !column.is_searchable() {
                continue;
            }
            if let Some(predicate) = search_expr(&mut ctx, column)?
                .and_then(|expr| column.column_kind().search_predicate(&expr, term))
            {
                predicates.push(predicate);
            }
        }

        let root = ctx.root();
        let relations = ctx.relation_paths();
        let (joins, selects, overlay) = ctx.into_parts();

        let base = Query::new(root.name.clone(), root.table.clone(), self.root_alias.clone());
        let base = joins.iter().cloned().fold(base, Query::join);
        let count_expr = || Sql::func("COUNT", Sql::token(Token::DISTINCT).append(Sql::raw(identifier.clone())));

        let total = base.clone().select(count_expr());
        let filtered_base = predicates.into_iter().fold(base, Query::and_where);

        let filtered = selects
            .expressions()
            .fold(filtered_base.clone(), |query, expr| query.select(Sql::raw(expr)));
        let filtered = order
            .iter()
            .fold(filtered, |query, (expr, direction)| query.order_by(expr.clone(), *direction));
        let count = filtered_base.clone().select(count_expr());
        let ids = filtered_base.select(Sql::raw(identifier.clone())).distinct(true);

        let summary = if state.wants_summary() {
            Some(self.summary(&ids, &overlay)?)
        } else {
            None
        };

        crate::datatable_trace_assembly!(self.entity, joins.len(), summary.is_some());

        Ok(Assembled {
            filtered,
            total,
            count,
            ids,
            order,
            summary,
            identifier,
            relations,
            overlay,
        })
    }

    /// Aggregates over visible aggregatable columns on a join graph rooted
    /// at `top`, restricted to the ids of the filtered query.
    fn summary(&self, ids: &Query, overlay: &HashMap<String, ResolvedField>) -> Result<SummaryQuery> {
        let mut ctx = AssemblyContext::new(self.provider, self.entity, SUMMARY_ROOT_ALIAS)?;
        let mut selects = Vec::new();
        let mut columns = Vec::new();

        for column in self.columns {
            if !column.is_visible() || !column.column_kind().is_aggregatable() {
                continue;
            }
            let requalified = column
                .order_field_override()
                .and_then(|expr| requalify(expr, &self.root_alias, SUMMARY_ROOT_ALIAS));
            let expr = match requalified {
                Some(expr) => expr,
                None => {
                    let path = match overlay.get(column.name()) {
                        Some(resolved) => resolved.property.clone(),
                        None => match column.field_path() {
                            Some(path) => path.to_string(),
                            None => continue,
                        },
                    };
                    ctx.resolve(&path, JoinType::Left)?.expr()
                }
            };

            for function in AggregateFunction::ALL {
                if let Some(aggregate) = column.column_kind().aggregation_expression(function, &expr) {
                    let alias = format!("{}_{}", function.name(), column.name());
                    selects.push(aggregate.alias(alias.clone()));
                    columns.push((alias, column.name().to_string(), function));
                }
            }
        }

        let root = ctx.root();
        let top_id = format!("{SUMMARY_ROOT_ALIAS}.{}", root.single_identifier()?);
        let mut query = Query::new(root.name.clone(), root.table.clone(), SUMMARY_ROOT_ALIAS);
        for join in ctx.joins() {
            query = query.join(join.clone());
        }
        query = selects.into_iter().fold(query, Query::select);
        query = query.and_where(
            Sql::raw(top_id)
                .push(Token::IN)
                .append(ids.to_sql().parens()),
        );

        Ok(SummaryQuery { query, columns })
    }
}

/// Rewrites every `from.` qualifier in `expr` to `to.`. `None` when `from`
/// qualifies nothing.
fn requalify(expr: &str, from: &str, to: &str) -> Option<String> {
    let prefix = format!("{from}.");
    let mut out = String::with_capacity(expr.len());
    let mut last = 0;
    for (pos, _) in expr.match_indices(&prefix) {
        let bounded = expr[..pos]
            .chars()
            .next_back()
            .is_none_or(|c| !(c.is_alphanumeric() || c == '_'));
        if bounded {
            out.push_str(&expr[last..pos]);
            out.push_str(to);
            out.push('.');
            last = pos + prefix.len();
        }
    }
    if last == 0 {
        return None;
    }
    out.push_str(&expr[last..]);
    Some(out)
}

/// Expression a search term is matched against: the resolved field, else
/// the configured order field.
fn search_expr(ctx: &mut AssemblyContext<'_>, column: &ColumnSpec) -> Result<Option<String>> {
    let resolved = ctx.field_for(column)?;
    Ok(resolved
        .map(|f| f.expr())
        .or_else(|| column.order_field_override().map(str::to_string)))
}

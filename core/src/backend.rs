//! Backend contract: an abstract, cloneable query and the executor trait.

use serde::{Deserialize, Serialize};

use crate::{
    dialect::Dialect,
    error::Result,
    record::Record,
    resolver::AliasEntry,
    schema::MetadataProvider,
    sql::{Sql, Token},
    state::OrderDirection,
    value::Value,
};

/// Join flavor of an association step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinType {
    Inner,
    #[default]
    Left,
}

impl JoinType {
    /// Combines two requests for the same join path. `Left` wins.
    pub const fn merge(self, requested: JoinType) -> JoinType {
        match (self, requested) {
            (JoinType::Inner, JoinType::Inner) => JoinType::Inner,
            _ => JoinType::Left,
        }
    }

    const fn token(self) -> Token {
        match self {
            JoinType::Inner => Token::INNER,
            JoinType::Left => Token::LEFT,
        }
    }
}

/// A query under construction: root entity, joins, predicates, ordering and
/// paging window. Cloned freely to derive count, id and summary queries.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub entity: String,
    pub table: String,
    pub root_alias: String,
    pub selects: Vec<Sql>,
    pub distinct: bool,
    pub joins: Vec<AliasEntry>,
    pub predicates: Vec<Sql>,
    pub order_by: Vec<(String, OrderDirection)>,
    pub offset: Option<u64>,
    pub limit: Option<u64>,
}

impl Query {
    pub fn new(entity: impl Into<String>, table: impl Into<String>, root_alias: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            table: table.into(),
            root_alias: root_alias.into(),
            selects: Vec::new(),
            distinct: false,
            joins: Vec::new(),
            predicates: Vec::new(),
            order_by: Vec::new(),
            offset: None,
            limit: None,
        }
    }

    pub fn select(mut self, expr: Sql) -> Self {
        self.selects.push(expr);
        self
    }

    pub fn distinct(mut self, distinct: bool) -> Self {
        self.distinct = distinct;
        self
    }

    pub fn join(mut self, entry: AliasEntry) -> Self {
        self.joins.push(entry);
        self
    }

    pub fn and_where(mut self, predicate: Sql) -> Self {
        if !predicate.is_empty() {
            self.predicates.push(predicate);
        }
        self
    }

    pub fn order_by(mut self, expr: impl Into<String>, direction: OrderDirection) -> Self {
        self.order_by.push((expr.into(), direction));
        self
    }

    /// Sets the paging window. `limit: None` leaves the query unbounded.
    pub fn window(mut self, offset: u64, limit: Option<u64>) -> Self {
        self.offset = (offset > 0).then_some(offset);
        self.limit = limit;
        self
    }

    /// Renders the statement.
    ///
    /// Aliases and alias-qualified expressions are emitted raw; table names
    /// are quoted. An offset without a limit renders `LIMIT -1`.
    pub fn to_sql(&self) -> Sql {
        let mut sql = Sql::token(Token::SELECT);
        if self.distinct {
            sql.push_mut(Token::DISTINCT);
        }
        if self.selects.is_empty() {
            sql.append_mut(Sql::raw(format!("{}.*", self.root_alias)));
        } else {
            sql.append_mut(Sql::join(self.selects.iter().cloned(), Token::COMMA));
        }

        sql.push_mut(Token::FROM);
        sql.append_mut(Sql::ident(self.table.clone()).alias_raw(self.root_alias.clone()));

        for join in &self.joins {
            sql.push_mut(join.join_type.token());
            sql.push_mut(Token::JOIN);
            sql.append_mut(Sql::ident(join.table.clone()).alias_raw(join.alias.clone()));
            sql.push_mut(Token::ON);
            sql.append_mut(Sql::raw(format!("{}.{}", join.alias, join.referenced_column)));
            sql.push_mut(Token::EQ);
            sql.append_mut(Sql::raw(format!("{}.{}", join.parent_alias, join.join_column)));
        }

        if !self.predicates.is_empty() {
            sql.push_mut(Token::WHERE);
            sql.append_mut(Sql::join(
                self.predicates.iter().cloned().map(Sql::parens),
                Token::AND,
            ));
        }

        if !self.order_by.is_empty() {
            sql.push_mut(Token::ORDER);
            sql.push_mut(Token::BY);
            let terms = self.order_by.iter().map(|(expr, direction)| {
                Sql::raw(expr.clone()).push(match direction {
                    OrderDirection::Asc => Token::ASC,
                    OrderDirection::Desc => Token::DESC,
                })
            });
            sql.append_mut(Sql::join(terms, Token::COMMA));
        }

        match (self.limit, self.offset) {
            (Some(limit), offset) => {
                sql.push_mut(Token::LIMIT);
                sql.append_mut(Sql::number(limit as i64));
                if let Some(offset) = offset {
                    sql.push_mut(Token::OFFSET);
                    sql.append_mut(Sql::number(offset as i64));
                }
            }
            (None, Some(offset)) => {
                sql.push_mut(Token::LIMIT);
                sql.append_mut(Sql::number(-1));
                sql.push_mut(Token::OFFSET);
                sql.append_mut(Sql::number(offset as i64));
            }
            (None, None) => {}
        }

        sql
    }

    /// Rendered text, for diagnostics.
    pub fn describe(&self, dialect: Dialect) -> String {
        self.to_sql().sql(dialect)
    }
}

/// Relational store the adapter runs queries against.
pub trait Backend {
    fn metadata(&self) -> &dyn MetadataProvider;

    /// First column of the first row.
    fn fetch_scalar(&self, query: &Query) -> Result<Value>;

    /// First column of every row.
    fn fetch_column(&self, query: &Query) -> Result<Vec<Value>>;

    /// First row as `(column label, value)` pairs.
    fn fetch_row(&self, query: &Query) -> Result<Option<Vec<(String, Value)>>>;

    /// Loads one entity by identifier together with the to-one association
    /// paths listed in `relations` (`address`, `address.country`).
    fn hydrate(&self, entity: &str, id: &Value, relations: &[String]) -> Result<Option<Record>>;
}

impl<B: Backend + ?Sized> Backend for &B {
    fn metadata(&self) -> &dyn MetadataProvider {
        (**self).metadata()
    }

    fn fetch_scalar(&self, query: &Query) -> Result<Value> {
        (**self).fetch_scalar(query)
    }

    fn fetch_column(&self, query: &Query) -> Result<Vec<Value>> {
        (**self).fetch_column(query)
    }

    fn fetch_row(&self, query: &Query) -> Result<Option<Vec<(String, Value)>>> {
        (**self).fetch_row(query)
    }

    fn hydrate(&self, entity: &str, id: &Value, relations: &[String]) -> Result<Option<Record>> {
        (**self).hydrate(entity, id, relations)
    }
}

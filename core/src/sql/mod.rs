mod chunk;
mod tokens;

use std::borrow::Cow;

pub use chunk::*;
use core::fmt::Write;
use smallvec::SmallVec;
pub use tokens::*;

use crate::{
    dialect::{Dialect, write_placeholder},
    value::Value,
};

/// SQL fragment builder with flat chunk storage.
///
/// Uses `SmallVec<[Chunk; 8]>` for inline storage of typical SQL fragments
/// without heap allocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sql {
    pub chunks: SmallVec<[Chunk; 8]>,
}

impl Sql {
    // ==================== constructors ====================

    /// Creates an empty SQL fragment
    #[inline]
    pub const fn empty() -> Self {
        Self {
            chunks: SmallVec::new_const(),
        }
    }

    /// Creates SQL with a single token
    #[inline]
    pub fn token(t: Token) -> Self {
        Self {
            chunks: smallvec::smallvec![Chunk::Token(t)],
        }
    }

    /// Creates SQL with a quoted identifier
    #[inline]
    pub fn ident(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            chunks: smallvec::smallvec![Chunk::Ident(name.into())],
        }
    }

    /// Creates SQL with raw text (unquoted)
    #[inline]
    pub fn raw(text: impl Into<Cow<'static, str>>) -> Self {
        Self {
            chunks: smallvec::smallvec![Chunk::Raw(text.into())],
        }
    }

    /// Creates SQL with a single integer literal.
    #[inline]
    pub fn number(value: i64) -> Self {
        Self {
            chunks: smallvec::smallvec![Chunk::Number(value)],
        }
    }

    /// Creates SQL with a single parameter value
    #[inline]
    pub fn param(value: impl Into<Value>) -> Self {
        Self {
            chunks: smallvec::smallvec![Chunk::Param(value.into())],
        }
    }

    /// Creates SQL for a function call: NAME(args)
    /// Subqueries are automatically wrapped in parentheses: NAME((SELECT ...))
    #[inline]
    pub fn func(name: &'static str, args: Sql) -> Self {
        let args = if args.is_subquery() {
            args.parens()
        } else {
            args
        };
        Sql::raw(format!("{name}(")).append(args).push(Token::RPAREN)
    }

    // ==================== builder methods ====================

    /// Append another SQL fragment (flat extend)
    #[inline]
    pub fn append(mut self, other: impl Into<Sql>) -> Self {
        self.append_mut(other);
        self
    }

    #[inline]
    pub fn append_mut(&mut self, other: impl Into<Sql>) {
        let other = other.into();

        if self.chunks.is_empty() {
            self.chunks = other.chunks;
            return;
        }
        if other.chunks.is_empty() {
            return;
        }

        self.chunks.extend(other.chunks);
    }

    /// Push a single chunk
    #[inline]
    pub fn push(mut self, chunk: impl Into<Chunk>) -> Self {
        self.chunks.push(chunk.into());
        self
    }

    #[inline]
    pub fn push_mut(&mut self, chunk: impl Into<Chunk>) {
        self.chunks.push(chunk.into());
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    // ==================== combinators ====================

    /// Joins multiple SQL fragments with a separator
    pub fn join<T>(sqls: T, separator: Token) -> Sql
    where
        T: IntoIterator<Item = Sql>,
    {
        let mut iter = sqls.into_iter();
        let Some(mut result) = iter.next() else {
            return Sql::empty();
        };

        let (lower, _) = iter.size_hint();
        result.chunks.reserve(lower * 2);

        for other in iter {
            result.chunks.push(Chunk::Token(separator));
            result.chunks.extend(other.chunks);
        }
        result
    }

    /// Wrap in parentheses: (self)
    #[inline]
    pub fn parens(self) -> Self {
        Sql::token(Token::LPAREN).append(self).push(Token::RPAREN)
    }

    /// Check if this SQL fragment is a subquery (starts with SELECT)
    #[inline]
    pub fn is_subquery(&self) -> bool {
        matches!(self.chunks.first(), Some(Chunk::Token(Token::SELECT)))
    }

    /// Creates an aliased version: self AS "name"
    pub fn alias(self, name: impl Into<Cow<'static, str>>) -> Sql {
        self.push(Token::AS).push(Chunk::Ident(name.into()))
    }

    /// Creates an aliased version with an unquoted alias: self AS name
    pub fn alias_raw(self, name: impl Into<Cow<'static, str>>) -> Sql {
        self.push(Token::AS).push(Chunk::Raw(name.into()))
    }

    // ==================== output methods ====================

    /// Returns the SQL string with dialect-appropriate placeholders.
    pub fn sql(&self, dialect: Dialect) -> String {
        self.build(dialect).0
    }

    /// Generates the SQL string and collects parameter references in a single pass.
    pub fn build(&self, dialect: Dialect) -> (String, SmallVec<[&Value; 8]>) {
        let sql_cap = self.chunks.len().saturating_mul(8).max(128);
        let mut buf = String::with_capacity(sql_cap);
        let mut params: SmallVec<[&Value; 8]> = SmallVec::new();

        for (i, chunk) in self.chunks.iter().enumerate() {
            match chunk {
                Chunk::Param(value) => {
                    params.push(value);
                    write_placeholder(dialect, &mut buf);
                }
                _ => chunk.write(&mut buf),
            }

            if self.needs_space(i) {
                let _ = buf.write_char(' ');
            }
        }

        (buf, params)
    }

    /// Simplified spacing logic
    fn needs_space(&self, index: usize) -> bool {
        let Some(next) = self.chunks.get(index + 1) else {
            return false;
        };

        chunk_needs_space(&self.chunks[index], next)
    }
}

/// Canonical spacing logic for SQL chunk rendering.
pub(crate) fn chunk_needs_space(current: &Chunk, next: &Chunk) -> bool {
    // Function heads like "COUNT(" and trailing-space raw text
    if let Chunk::Raw(text) = current {
        if text.ends_with(' ') || text.ends_with('(') {
            return false;
        }
    }

    if let Chunk::Raw(text) = next {
        if text.starts_with(' ') {
            return false;
        }
    }

    match (current, next) {
        // No space before closing/separator punctuation
        (_, Chunk::Token(Token::RPAREN | Token::COMMA | Token::SEMI | Token::DOT)) => false,
        // No space after opening punctuation
        (Chunk::Token(Token::LPAREN | Token::DOT), _) => false,
        // Space after comma
        (Chunk::Token(Token::COMMA), _) => true,
        // Space after closing paren if next is word-like (e.g., ") FROM")
        (Chunk::Token(Token::RPAREN), next) => next.is_word_like(),
        // Space before opening paren if preceded by word-like (e.g., "IN (")
        (current, Chunk::Token(Token::LPAREN)) => current.is_word_like(),
        // Space around comparison operators
        (Chunk::Token(t), _) if t.is_operator() => true,
        (_, Chunk::Token(t)) if t.is_operator() => true,
        // Space between all word-like chunks
        _ => current.is_word_like() && next.is_word_like(),
    }
}

// ==================== trait implementations ====================

impl From<&'static str> for Sql {
    fn from(s: &'static str) -> Self {
        Sql::raw(s)
    }
}

impl From<String> for Sql {
    fn from(s: String) -> Self {
        Sql::raw(s)
    }
}

impl From<Token> for Sql {
    fn from(value: Token) -> Self {
        Sql::token(value)
    }
}

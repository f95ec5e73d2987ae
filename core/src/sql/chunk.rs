use std::borrow::Cow;

use crate::{sql::tokens::Token, value::Value};

/// A SQL chunk represents a part of an SQL statement.
///
/// - `Token` - SQL keywords and operators (SELECT, FROM, =, etc.)
/// - `Ident` - Quoted identifiers ("table_name")
/// - `Raw` - Unquoted raw SQL text (aliases, qualified fields, filter text)
/// - `Number` - Unsigned integer literal (LIMIT/OFFSET)
/// - `Param` - Bound parameter value
#[derive(Debug, Clone, PartialEq)]
pub enum Chunk {
    /// SQL keywords and operators: SELECT, FROM, WHERE, =, AND, etc.
    Token(Token),

    /// Quoted identifier. Renders as: "name"
    Ident(Cow<'static, str>),

    /// Raw SQL text, rendered as-is
    Raw(Cow<'static, str>),

    /// Integer literal, rendered inline
    Number(i64),

    /// Parameter value. Renders as: ? or $n depending on dialect
    Param(Value),
}

impl Chunk {
    /// Creates a quoted identifier from a runtime string
    #[inline]
    pub fn ident(name: impl Into<Cow<'static, str>>) -> Self {
        Self::Ident(name.into())
    }

    /// Creates raw SQL text from a runtime string
    #[inline]
    pub fn raw(text: impl Into<Cow<'static, str>>) -> Self {
        Self::Raw(text.into())
    }

    /// Write chunk content to buffer. Params are handled by the caller.
    pub(crate) fn write(&self, buf: &mut impl core::fmt::Write) {
        match self {
            Chunk::Token(token) => {
                let _ = buf.write_str(token.as_str());
            }
            Chunk::Ident(name) => {
                let _ = buf.write_char('"');
                let _ = buf.write_str(&name.replace('"', "\"\""));
                let _ = buf.write_char('"');
            }
            Chunk::Raw(text) => {
                let _ = buf.write_str(text);
            }
            Chunk::Number(n) => {
                let _ = write!(buf, "{n}");
            }
            Chunk::Param(_) => {
                let _ = buf.write_char('?');
            }
        }
    }

    /// Check if this chunk is "word-like" (needs space separation from other word-like chunks)
    #[inline]
    pub(crate) const fn is_word_like(&self) -> bool {
        match self {
            Chunk::Token(t) => !matches!(
                t,
                Token::LPAREN
                    | Token::RPAREN
                    | Token::COMMA
                    | Token::SEMI
                    | Token::DOT
                    | Token::EQ
                    | Token::NE
                    | Token::LT
                    | Token::GT
                    | Token::LE
                    | Token::GE
            ),
            Chunk::Ident(_) | Chunk::Raw(_) | Chunk::Number(_) | Chunk::Param(_) => true,
        }
    }
}

// ==================== From implementations ====================

impl From<Token> for Chunk {
    #[inline]
    fn from(value: Token) -> Self {
        Self::Token(value)
    }
}

impl From<Value> for Chunk {
    #[inline]
    fn from(value: Value) -> Self {
        Self::Param(value)
    }
}

//! SQL dialect used when rendering placeholders.

use core::fmt::Write;

/// SQL dialect for database-specific rendering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Dialect {
    /// SQLite - uses `?` positional placeholders
    #[default]
    SQLite,
}

/// Writes the placeholder for the next bound parameter.
#[inline]
pub(crate) fn write_placeholder(dialect: Dialect, buf: &mut impl Write) {
    match dialect {
        Dialect::SQLite => {
            let _ = buf.write_char('?');
        }
    }
}

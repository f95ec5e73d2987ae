//! Advanced filter expressions with `#column#` and `@dotted.path@`
//! placeholders, rewritten into alias-qualified predicate text.

use std::sync::LazyLock;

use regex::Regex;

use crate::{
    backend::JoinType,
    column::Columns,
    error::{DataTableError, Result},
    resolver::AssemblyContext,
};

/// Block comments, and line comments not preceded by `:` (keeps `http://`).
static COMMENTS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)/\*[\s\S]*?\*/|([^\\:]|^)//.*$").expect("valid regex"));

static PATH_TOKEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"@([^@\s]+)@").expect("valid regex"));

static LEFTOVER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#[A-Za-z0-9_.]+#|@[^@\s]+@").expect("valid regex"));

/// One lexical unit of a filter: string literal, placeholder, number,
/// word or dotted field, operator, whitespace.
static TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"'(?:[^']|'')*'",
        r"|#[A-Za-z0-9_.]+#|@[^@\s]+@",
        r"|\d+(?:\.\d+)?",
        r"|[A-Za-z_][A-Za-z0-9_]*(?:\.[A-Za-z_][A-Za-z0-9_]*)?",
        r"|--|/\*|<>|!=|<=|>=|\|\||[=<>+\-*/%(),]",
        r"|\s+",
    ))
    .expect("valid regex")
});

const ID_TOKEN: &str = "#id#";

/// Bare words a filter may use as operators or constants.
const KEYWORDS: &[&str] = &[
    "AND", "BETWEEN", "CASE", "ELSE", "END", "ESCAPE", "FALSE", "GLOB", "IN", "IS", "LIKE", "NOT", "NULL", "OR",
    "THEN", "TRUE", "WHEN",
];

/// Scalar functions a filter may call.
const FUNCTIONS: &[&str] = &[
    "ABS", "COALESCE", "DATE", "DATETIME", "IFNULL", "INSTR", "JULIANDAY", "LENGTH", "LOWER", "LTRIM", "NULLIF",
    "REPLACE", "ROUND", "RTRIM", "STRFTIME", "SUBSTR", "TIME", "TRIM", "UPPER",
];

fn unexpected(expression: &str, pos: usize) -> DataTableError {
    let near: String = expression[pos..].chars().take(24).collect();
    DataTableError::UnsafeFilter(format!("unexpected '{}'", near.trim_end()))
}

/// Checks that `expression` is a single predicate built from literals,
/// placeholders, qualified fields, operators, [`KEYWORDS`] and calls to
/// [`FUNCTIONS`]. Returns the aliases named by qualified fields.
fn check_syntax(expression: &str) -> Result<Vec<String>> {
    let mut tokens = Vec::new();
    let mut end = 0;
    for m in TOKEN.find_iter(expression) {
        if m.start() != end {
            return Err(unexpected(expression, end));
        }
        end = m.end();
        if !m.as_str().trim().is_empty() {
            tokens.push((m.start(), m.as_str()));
        }
    }
    if end != expression.len() {
        return Err(unexpected(expression, end));
    }

    let mut depth = 0usize;
    let mut aliases = Vec::new();
    for (i, &(pos, token)) in tokens.iter().enumerate() {
        match token {
            "(" => depth += 1,
            ")" => depth = depth.checked_sub(1).ok_or_else(|| unexpected(expression, pos))?,
            "--" | "/*" => return Err(unexpected(expression, pos)),
            _ if token.starts_with(|c: char| c.is_ascii_alphabetic() || c == '_') => {
                if let Some((alias, _)) = token.split_once('.') {
                    aliases.push(alias.to_string());
                    continue;
                }
                let word = token.to_ascii_uppercase();
                let known = match tokens.get(i + 1) {
                    Some(&(_, "(")) => FUNCTIONS,
                    _ => KEYWORDS,
                };
                if !known.contains(&word.as_str()) {
                    return Err(unexpected(expression, pos));
                }
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err(DataTableError::UnsafeFilter("unbalanced parentheses".into()));
    }
    Ok(aliases)
}

/// Removes comments and surrounding whitespace.
pub fn strip_comments(expression: &str) -> String {
    COMMENTS.replace_all(expression, "$1").trim().to_string()
}

/// Rewrites `expression` against `columns`, registering any joins it needs
/// in `ctx`. Returns `None` when nothing but comments or whitespace is left.
///
/// Only a restricted predicate grammar is accepted: literals, placeholders,
/// operators, a fixed set of keywords and scalar functions. Anything else
/// fails with [`DataTableError::UnsafeFilter`] before any join is registered.
/// Qualified fields typed directly must name the root alias or a join alias.
///
/// Column placeholders use, in order: the column's configured order field,
/// the field already resolved for it in this pass, or a fresh left-joined
/// resolution of its field path.
pub fn rewrite(expression: &str, columns: &Columns, ctx: &mut AssemblyContext<'_>) -> Result<Option<String>> {
    let mut rewritten = strip_comments(expression);
    if rewritten.is_empty() {
        return Ok(None);
    }
    let qualified = check_syntax(&rewritten)?;

    for column in columns {
        let token = format!("#{}#", column.name());
        if !rewritten.contains(&token) {
            continue;
        }
        let replacement = if let Some(expr) = column.order_field_override() {
            expr.to_string()
        } else if let Some(resolved) = ctx.overlay_for(column.name()) {
            resolved.expr()
        } else {
            let path = match column.field_path() {
                Some(path) => path.to_string(),
                None if ctx.root().has_field(column.name()) => column.name().to_string(),
                None => continue,
            };
            let resolved = ctx.resolve(&path, JoinType::Left)?;
            let expr = resolved.expr();
            ctx.set_overlay(column.name(), resolved);
            expr
        };
        rewritten = rewritten.replace(&token, &replacement);
    }

    if rewritten.contains(ID_TOKEN) {
        let id = ctx.identifier_expr()?;
        rewritten = rewritten.replace(ID_TOKEN, &id);
    }

    let paths: Vec<(String, String)> = PATH_TOKEN
        .captures_iter(&rewritten)
        .map(|c| (c[0].to_string(), c[1].to_string()))
        .collect();
    for (token, path) in paths {
        if !rewritten.contains(&token) {
            continue;
        }
        let resolved = ctx.resolve(&path, JoinType::Left)?;
        rewritten = rewritten.replace(&token, &resolved.expr());
    }

    if let Some(leftover) = LEFTOVER.find(&rewritten) {
        return Err(DataTableError::UnresolvedPlaceholder(leftover.as_str().to_string()));
    }

    for alias in qualified {
        if alias != ctx.root_alias() && !ctx.joins().iter().any(|join| join.alias == alias) {
            return Err(DataTableError::UnsafeFilter(format!("unknown alias '{alias}'")));
        }
    }

    Ok(Some(rewritten))
}

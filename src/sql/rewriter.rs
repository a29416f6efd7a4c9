//! Reference Rewriter
//!
//! Applies a filter predicate to arbitrary SQL by replacing each reference to
//! the base table with a filtered derived table:
//!
//! ```text
//! FROM dataset d  ->  FROM (SELECT * FROM dataset WHERE <predicate>) AS d
//! ```
//!
//! This is a textual transform over a fixed set of reference shapes, not a
//! parse. Shapes handled, in processing order: `FROM dataset`, `JOIN
//! dataset`, and comma-separated table lists `, dataset`; each with an
//! optional alias (`AS d` or `d`). Clause keywords are never taken as an
//! alias. String literals, quoted identifiers and comments are left alone.

use crate::sql::BASE_TABLE;
use lazy_static::lazy_static;
use regex::{Captures, Regex};
use tracing::{debug, warn};

const RESERVED_AFTER_TABLE: &[&str] = &[
    "WHERE", "GROUP", "ORDER", "LIMIT", "OFFSET", "FETCH", "HAVING", "QUALIFY", "WINDOW",
    "JOIN", "INNER", "LEFT", "RIGHT", "FULL", "OUTER", "CROSS", "NATURAL", "SEMI", "ANTI",
    "POSITIONAL", "ASOF", "LATERAL", "ON", "USING", "UNION", "EXCEPT", "INTERSECT", "MINUS",
    "SELECT", "FROM", "WITH", "AS", "AND", "OR", "NOT", "SAMPLE", "TABLESAMPLE", "PIVOT",
    "UNPIVOT", "VALUES", "INTO", "SET", "RETURNING", "FOR",
];

lazy_static! {
    static ref FROM_REFERENCE: Regex = Regex::new(
        r"(?i)\b(?P<kw>FROM)(?P<ws>\s+)(?P<table>dataset)\b(?P<alias>\s+(?:AS\s+)?(?P<name>[A-Za-z_][A-Za-z0-9_]*))?"
    )
    .unwrap();
    static ref JOIN_REFERENCE: Regex = Regex::new(
        r"(?i)\b(?P<kw>JOIN)(?P<ws>\s+)(?P<table>dataset)\b(?P<alias>\s+(?:AS\s+)?(?P<name>[A-Za-z_][A-Za-z0-9_]*))?"
    )
    .unwrap();
    static ref LIST_REFERENCE: Regex = Regex::new(
        r"(?i)(?P<kw>,)(?P<ws>\s*)(?P<table>dataset)\b(?P<alias>\s+(?:AS\s+)?(?P<name>[A-Za-z_][A-Za-z0-9_]*))?"
    )
    .unwrap();
    static ref CLAUSE_KEYWORD: Regex =
        Regex::new(r"(?i)\b(SELECT|FROM|JOIN|WHERE|GROUP|ORDER|HAVING|LIMIT|ON|USING|UNION)\b")
            .unwrap();
    static ref BASE_TABLE_WORD: Regex = Regex::new(r"(?i)\bdataset\b").unwrap();
}

/// Where a reference pattern may legally appear
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Context {
    Anywhere,
    /// Only inside a FROM/JOIN table list, never a select list or GROUP BY
    TableList,
}

/// Rewrite every base table reference in `sql` so the predicate applies.
///
/// Returns the input unchanged when the predicate is blank or the base
/// table is never referenced. Rewriting twice with the same predicate does
/// not nest derived tables.
pub fn inject_filter(sql: &str, predicate: &str) -> String {
    let predicate = predicate.trim();
    if predicate.is_empty() || !references_base_table(sql) {
        return sql.to_string();
    }

    let mut rewritten_refs = 0;
    let mut current = sql.to_string();
    for (pattern, context) in [
        (&*FROM_REFERENCE, Context::Anywhere),
        (&*JOIN_REFERENCE, Context::Anywhere),
        (&*LIST_REFERENCE, Context::TableList),
    ] {
        let (next, count) = rewrite_pass(&current, pattern, context, predicate);
        current = next;
        rewritten_refs += count;
    }

    let already_filtered = sql.contains(&format!("FROM {} WHERE {})", BASE_TABLE, predicate));
    if rewritten_refs == 0 && !already_filtered {
        warn!(
            "Base table referenced in a form the rewriter does not handle; filter not applied: {}",
            sql
        );
    } else {
        debug!("Injected filter into {} table reference(s)", rewritten_refs);
    }
    current
}

/// True when `dataset` appears as a word outside literals and comments
pub fn references_base_table(sql: &str) -> bool {
    let masked = masked_spans(sql);
    BASE_TABLE_WORD
        .find_iter(sql)
        .any(|m| !in_spans(&masked, m.start()))
}

/// The derived table substituted for a base table reference
pub fn derived_table(predicate: &str, alias: &str) -> String {
    format!(
        "(SELECT * FROM {} WHERE {}) AS {}",
        BASE_TABLE, predicate, alias
    )
}

fn rewrite_pass(sql: &str, pattern: &Regex, context: Context, predicate: &str) -> (String, usize) {
    let masked = masked_spans(sql);
    let mut out = String::with_capacity(sql.len() + predicate.len() + 48);
    let mut last = 0;
    let mut count = 0;

    for caps in pattern.captures_iter(sql) {
        let (Some(whole), Some(table)) = (caps.get(0), caps.name("table")) else {
            continue;
        };
        if !should_rewrite(sql, &caps, &masked, context, predicate) {
            continue;
        }

        let kw = caps.name("kw").map_or("", |m| m.as_str());
        let ws = caps.name("ws").map_or("", |m| m.as_str());
        let alias_text = caps.name("alias").map_or("", |m| m.as_str());
        let name = caps.name("name").map(|m| m.as_str());

        out.push_str(&sql[last..whole.start()]);
        out.push_str(kw);
        out.push_str(if ws.is_empty() { " " } else { ws });
        match name {
            Some(alias) if !is_reserved(alias) => {
                out.push_str(&derived_table(predicate, alias));
            }
            _ => {
                out.push_str(&derived_table(predicate, table.as_str()));
                // A clause keyword was captured in the alias slot; keep it
                out.push_str(alias_text);
            }
        }
        last = whole.end();
        count += 1;
    }

    out.push_str(&sql[last..]);
    (out, count)
}

fn should_rewrite(
    sql: &str,
    caps: &Captures<'_>,
    masked: &[(usize, usize)],
    context: Context,
    predicate: &str,
) -> bool {
    let (Some(whole), Some(table)) = (caps.get(0), caps.name("table")) else {
        return false;
    };
    if in_spans(masked, table.start()) {
        return false;
    }

    // `dataset.col` or `dataset(` is a column or function, not a table
    if caps.name("alias").is_none() {
        if let Some(next) = sql[table.end()..].chars().next() {
            if next == '.' || next == '(' {
                return false;
            }
        }
    }

    // Already our derived table with this exact predicate
    let before = sql[..whole.start()].trim_end();
    let after = &sql[table.end()..];
    if before.ends_with("(SELECT *") && after.starts_with(&format!(" WHERE {})", predicate)) {
        return false;
    }

    match context {
        Context::Anywhere => true,
        Context::TableList => clause_keyword_before(sql, whole.start(), masked)
            .map(|kw| kw.eq_ignore_ascii_case("FROM") || kw.eq_ignore_ascii_case("JOIN"))
            .unwrap_or(false),
    }
}

/// Last clause keyword before `pos` at the same parenthesis depth as `pos`
fn clause_keyword_before<'a>(
    sql: &'a str,
    pos: usize,
    masked: &[(usize, usize)],
) -> Option<&'a str> {
    let preceding = &sql[..pos];
    let keywords: Vec<_> = CLAUSE_KEYWORD
        .find_iter(preceding)
        .filter(|m| !in_spans(masked, m.start()))
        .collect();

    let mut depth: i32 = 0;
    let mut next = 0;
    let mut seen: Vec<(i32, &'a str)> = Vec::with_capacity(keywords.len());
    for (i, byte) in preceding.bytes().enumerate() {
        while next < keywords.len() && keywords[next].start() == i {
            seen.push((depth, keywords[next].as_str()));
            next += 1;
        }
        if in_spans(masked, i) {
            continue;
        }
        match byte {
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                // A closed group's keywords never govern its siblings
                seen.retain(|(d, _)| *d <= depth);
            }
            _ => {}
        }
    }

    seen.iter()
        .rev()
        .find(|(d, _)| *d == depth)
        .map(|(_, kw)| *kw)
}

fn is_reserved(word: &str) -> bool {
    RESERVED_AFTER_TABLE
        .iter()
        .any(|kw| kw.eq_ignore_ascii_case(word))
}

fn in_spans(spans: &[(usize, usize)], pos: usize) -> bool {
    spans.iter().any(|(start, end)| pos >= *start && pos < *end)
}

/// Byte ranges of string literals, quoted identifiers and comments
fn masked_spans(sql: &str) -> Vec<(usize, usize)> {
    let bytes = sql.as_bytes();
    let mut spans = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let start = i;
        match bytes[i] {
            quote @ (b'\'' | b'"') => {
                i += 1;
                while i < bytes.len() {
                    if bytes[i] == quote {
                        // Doubled quote is an escaped quote
                        if i + 1 < bytes.len() && bytes[i + 1] == quote {
                            i += 2;
                            continue;
                        }
                        break;
                    }
                    i += 1;
                }
                i = (i + 1).min(bytes.len());
                spans.push((start, i));
            }
            b'-' if bytes.get(i + 1) == Some(&b'-') => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
                spans.push((start, i));
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i += 2;
                while i < bytes.len() && !(bytes[i] == b'*' && bytes.get(i + 1) == Some(&b'/')) {
                    i += 1;
                }
                i = (i + 2).min(bytes.len());
                spans.push((start, i));
            }
            _ => i += 1,
        }
    }

    spans
}

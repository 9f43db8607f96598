//! Rendering of listing results

use discovery_collection::{Entity, Identifier};
use serde::Serialize;
use serde_json::{json, Value};
use std::fmt::Write;

/// Text table: one `id<TAB>name` line per row, after a summary line
pub(crate) fn page_text<T>(page: usize, page_size: usize, total: usize, rows: &[T]) -> String
where
    T: Entity + Serialize,
{
    let mut out = String::new();
    let first = page.saturating_mul(page_size);
    if rows.is_empty() {
        let _ = writeln!(out, "page {page}: no rows ({total} total)");
    } else {
        let last = first.saturating_add(rows.len() - 1);
        let _ = writeln!(out, "page {page}: rows {first}-{last} of {total}");
    }
    for row in rows {
        let name = serde_json::to_value(row)
            .ok()
            .and_then(|value| value.get("name").and_then(Value::as_str).map(str::to_string))
            .unwrap_or_default();
        let _ = writeln!(out, "{}\t{name}", row.id());
    }
    out
}

/// JSON document with paging metadata and the raw rows
///
/// # Errors
/// Fails if a row cannot be serialized.
pub(crate) fn page_json<T: Serialize>(
    page: usize,
    page_size: usize,
    total: usize,
    rows: &[T],
) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&json!({
        "page": page,
        "page_size": page_size,
        "total": total,
        "rows": rows,
    }))
}

/// One id per line
pub(crate) fn ids_text(ids: &[Identifier]) -> String {
    ids.iter().fold(String::new(), |mut out, id| {
        let _ = writeln!(out, "{id}");
        out
    })
}

/// JSON array of ids
pub(crate) fn ids_json(ids: &[Identifier]) -> serde_json::Result<String> {
    serde_json::to_string(ids)
}

//! INSERT compilation.

use std::fmt::Write;

use crate::builder::invalid_document;
use crate::document::Document;
use crate::error::Result;
use crate::sql::{CompiledQuery, check_ident, check_table};

/// Compiles `INSERT INTO table ("c1", "c2") VALUES ($1, $2) RETURNING *`,
/// values in document order. Empty documents fail with `InvalidDocument`.
pub fn compile_insert(table: &str, document: &Document) -> Result<CompiledQuery> {
    check_table(table)?;
    if document.is_empty() {
        return Err(invalid_document(document, table));
    }

    let mut columns = String::new();
    let mut placeholders = String::new();
    let mut params = Vec::with_capacity(document.len());

    for (idx, (name, value)) in document.iter().enumerate() {
        check_ident(name)?;
        if idx > 0 {
            columns.push_str(", ");
            placeholders.push_str(", ");
        }
        let _ = write!(columns, "\"{name}\"");
        let _ = write!(placeholders, "${}", idx + 1);
        params.push(value.clone());
    }

    let sql = format!("INSERT INTO {table} ({columns}) VALUES ({placeholders}) RETURNING *");
    Ok(CompiledQuery::new(sql, params))
}

//! DELETE compilation.

use std::fmt::Write;

use crate::builder::invalid_filter;
use crate::document::Document;
use crate::error::Result;
use crate::sql::{CompiledQuery, check_ident, check_table};

/// Compiles `DELETE FROM table WHERE f = $1 AND ...` with every filter value
/// bound as a positional parameter. Empty filters fail with `InvalidFilter`
/// rather than deleting the whole table.
pub fn compile_delete(table: &str, filter: &Document) -> Result<CompiledQuery> {
    check_table(table)?;
    if filter.is_empty() {
        return Err(invalid_filter(filter, table));
    }

    let mut conditions = String::new();
    let mut params = Vec::with_capacity(filter.len());
    for (idx, (name, value)) in filter.iter().enumerate() {
        check_ident(name)?;
        if idx > 0 {
            conditions.push_str(" AND ");
        }
        let _ = write!(conditions, "{name} = ${}", idx + 1);
        params.push(value.clone());
    }

    let sql = format!("DELETE FROM {table} WHERE {conditions}");
    Ok(CompiledQuery::new(sql, params))
}

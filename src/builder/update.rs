//! UPDATE compilation.

use std::fmt::Write;

use crate::builder::{invalid_document, invalid_filter};
use crate::document::Document;
use crate::error::Result;
use crate::sql::{CompiledQuery, check_ident, check_table};

/// Compiles `UPDATE table SET "c" = $1, ... WHERE f = $k AND ... RETURNING *`.
///
/// Document parameters are numbered before filter parameters, in that fixed
/// order. Both inputs must be non-empty; the error names which one failed.
pub fn compile_update(table: &str, filter: &Document, document: &Document) -> Result<CompiledQuery> {
    check_table(table)?;
    if filter.is_empty() {
        return Err(invalid_filter(filter, table));
    }
    if document.is_empty() {
        return Err(invalid_document(document, table));
    }

    let mut params = Vec::with_capacity(document.len() + filter.len());

    let mut assignments = String::new();
    for (idx, (name, value)) in document.iter().enumerate() {
        check_ident(name)?;
        if idx > 0 {
            assignments.push_str(", ");
        }
        let _ = write!(assignments, "\"{name}\" = ${}", idx + 1);
        params.push(value.clone());
    }

    let mut conditions = String::new();
    for (idx, (name, value)) in filter.iter().enumerate() {
        check_ident(name)?;
        if idx > 0 {
            conditions.push_str(" AND ");
        }
        let _ = write!(conditions, "{name} = ${}", document.len() + idx + 1);
        params.push(value.clone());
    }

    let sql = format!("UPDATE {table} SET {assignments} WHERE {conditions} RETURNING *");
    Ok(CompiledQuery::new(sql, params))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RelqError;
    use crate::values::Value;

    #[test]
    fn document_params_precede_filter_params() {
        let compiled = compile_update(
            "users",
            &Document::new().set("id", 1),
            &Document::new().set("name", "y"),
        )
        .unwrap();
        assert_eq!(
            compiled.sql,
            "UPDATE users SET \"name\" = $1 WHERE id = $2 RETURNING *"
        );
        assert_eq!(
            compiled.params,
            vec![Value::Text("y".into()), Value::Bigint(1)]
        );
    }

    #[test]
    fn multi_column_update() {
        let compiled = compile_update(
            "users",
            &Document::new().set("tenant", "a").set("id", 7),
            &Document::new().set("name", "y").set("age", 30),
        )
        .unwrap();
        assert_eq!(
            compiled.sql,
            "UPDATE users SET \"name\" = $1, \"age\" = $2 \
             WHERE tenant = $3 AND id = $4 RETURNING *"
        );
        assert_eq!(compiled.params.len(), 4);
    }

    #[test]
    fn empty_inputs_name_the_failing_side() {
        let err =
            compile_update("users", &Document::new(), &Document::new().set("a", 1)).unwrap_err();
        assert!(matches!(err, RelqError::InvalidFilter { .. }));

        let err =
            compile_update("users", &Document::new().set("id", 1), &Document::new()).unwrap_err();
        assert!(matches!(err, RelqError::InvalidDocument { .. }));
    }
}

//! ORDER BY / LIMIT / OFFSET compilation.
//!
//! Sort fields and directions are identifiers, not values, so they are
//! validated and spliced; limit and skip consume parameter slots, continuing
//! whatever numbering the caller's cursor has reached.

use std::fmt::Write;

use crate::error::{RelqError, Result};
use crate::query::QueryOptions;
use crate::sql::{ParamCursor, check_ident};
use crate::values::Value;

/// Sort direction for one ORDER BY entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum SortDirection {
    #[serde(rename = "ASC")]
    Asc,
    #[serde(rename = "DESC")]
    Desc,
}

impl SortDirection {
    pub fn as_sql(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// A compiled statement tail plus the values it binds.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct TailFragment {
    pub sql: String,
    pub params: Vec<Value>,
}

/// Compiles the fixed-order tail clauses: ORDER BY, then LIMIT, then OFFSET.
/// Absent clauses are omitted without leaving stray separators.
pub(crate) fn compile_tail(options: &QueryOptions, cursor: &mut ParamCursor) -> Result<TailFragment> {
    let mut clauses: Vec<String> = Vec::new();
    let mut params = Vec::new();

    if !options.sort.is_empty() {
        let mut entries = Vec::with_capacity(options.sort.len());
        for (field, direction) in &options.sort {
            check_ident(field)?;
            entries.push(format!("{field} {}", direction.as_sql()));
        }
        clauses.push(format!("ORDER BY {}", entries.join(", ")));
    }

    if let Some(limit) = options.limit {
        let mut clause = String::new();
        let _ = write!(clause, "LIMIT ${}", cursor.take());
        clauses.push(clause);
        params.push(count_param(limit)?);
    }

    if let Some(skip) = options.skip {
        let mut clause = String::new();
        let _ = write!(clause, "OFFSET ${}", cursor.take());
        clauses.push(clause);
        params.push(count_param(skip)?);
    }

    Ok(TailFragment {
        sql: clauses.join(" "),
        params,
    })
}

// LIMIT/OFFSET bind as bigint, so counts above i64::MAX cannot be represented.
fn count_param(count: u64) -> Result<Value> {
    let count = i64::try_from(count).map_err(|_| RelqError::InvalidFilter {
        received: count.to_string(),
        expected: "a row count within the signed 64-bit range".to_string(),
    })?;
    Ok(Value::Bigint(count))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clause_order_is_fixed() {
        let options = QueryOptions::new()
            .sort("name", SortDirection::Asc)
            .sort("age", SortDirection::Desc)
            .limit(10)
            .skip(20);
        let mut cursor = ParamCursor::new();
        let tail = compile_tail(&options, &mut cursor).unwrap();
        assert_eq!(tail.sql, "ORDER BY name ASC, age DESC LIMIT $1 OFFSET $2");
        assert_eq!(tail.params, vec![Value::Bigint(10), Value::Bigint(20)]);
    }

    #[test]
    fn continues_the_caller_counter() {
        let options = QueryOptions::new().limit(5).skip(3);
        let mut cursor = ParamCursor::new();
        cursor.take();
        cursor.take();
        let tail = compile_tail(&options, &mut cursor).unwrap();
        assert_eq!(tail.sql, "LIMIT $3 OFFSET $4");
    }

    #[test]
    fn absent_clauses_are_omitted() {
        let mut cursor = ParamCursor::new();
        let tail = compile_tail(&QueryOptions::new(), &mut cursor).unwrap();
        assert_eq!(tail.sql, "");
        assert!(tail.params.is_empty());

        let mut cursor = ParamCursor::new();
        let tail = compile_tail(&QueryOptions::new().skip(7), &mut cursor).unwrap();
        assert_eq!(tail.sql, "OFFSET $1");
    }

    #[test]
    fn counts_beyond_bigint_range_are_rejected() {
        let options = QueryOptions::new().limit(u64::MAX);
        let mut cursor = ParamCursor::new();
        assert!(matches!(
            compile_tail(&options, &mut cursor),
            Err(RelqError::InvalidFilter { .. })
        ));

        let options = QueryOptions::new().skip(i64::MAX as u64 + 1);
        let mut cursor = ParamCursor::new();
        assert!(matches!(
            compile_tail(&options, &mut cursor),
            Err(RelqError::InvalidFilter { .. })
        ));

        let options = QueryOptions::new().limit(i64::MAX as u64);
        let mut cursor = ParamCursor::new();
        let tail = compile_tail(&options, &mut cursor).unwrap();
        assert_eq!(tail.params, vec![Value::Bigint(i64::MAX)]);
    }

    #[test]
    fn sort_fields_are_validated() {
        let options = QueryOptions::new().sort("name; --", SortDirection::Asc);
        let mut cursor = ParamCursor::new();
        assert!(matches!(
            compile_tail(&options, &mut cursor),
            Err(RelqError::InvalidIdentifier(_))
        ));
    }
}

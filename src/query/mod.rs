//! Select compilation: options, filters, tails, and relationship expansion.

pub mod filter;
pub mod relation;
pub mod tail;

pub use filter::{Comparison, Filter, FilterFragment};
pub use relation::{Cardinality, Relationship, compile_relationship_query};
pub use tail::SortDirection;

use crate::error::Result;
use crate::query::tail::compile_tail;
use crate::sql::{CompiledQuery, ParamCursor, check_ident, check_table};

/// Options for a select: filter, relationship expansion, sort, pagination,
/// column projection, and the debug switch.
///
/// `debug` is a caller-visible contract: it makes
/// [`Executor::select`](crate::Executor::select) return the compiled SQL text
/// alongside the rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOptions {
    pub filter: Option<Filter>,
    pub relationships: Vec<Relationship>,
    pub sort: Vec<(String, SortDirection)>,
    pub limit: Option<u64>,
    pub skip: Option<u64>,
    pub columns: Vec<String>,
    pub debug: bool,
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Adds one relationship edge to expand from the root table.
    pub fn relationship(mut self, relationship: Relationship) -> Self {
        self.relationships.push(relationship);
        self
    }

    /// Appends one sort entry; entries compile in the order supplied.
    pub fn sort(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.sort.push((field.into(), direction));
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = Some(skip);
        self
    }

    /// Projects an explicit column list instead of `*` (flat selects only;
    /// relationship queries always expand the full row).
    pub fn columns(mut self, columns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }
}

/// Compiles a select against `table` (optionally `schema.table` qualified).
///
/// With relationships present, dispatches to the relationship compiler; the
/// schema portion of the table reference scopes the expansion (defaulting to
/// `public`). Otherwise emits a flat select aliased as `table_data`, filter
/// parameters numbered before tail parameters.
pub fn compile_select(table: &str, options: &QueryOptions) -> Result<CompiledQuery> {
    check_table(table)?;

    if !options.relationships.is_empty() {
        let schema = table.split_once('.').map(|(s, _)| s).unwrap_or("public");
        return compile_relationship_query(schema, &options.relationships, options);
    }

    let columns = if options.columns.is_empty() {
        "*".to_string()
    } else {
        for column in &options.columns {
            check_ident(column)?;
        }
        options.columns.join(", ")
    };

    let mut cursor = ParamCursor::new();
    let mut params = Vec::new();
    let mut sql = format!("SELECT {columns} FROM {table} AS table_data");

    if let Some(filter) = &options.filter {
        let fragment = filter.compile("table_data", &mut cursor)?;
        if !fragment.sql.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&fragment.sql);
            params.extend(fragment.params);
        }
    }

    let tail = compile_tail(options, &mut cursor)?;
    if !tail.sql.is_empty() {
        sql.push(' ');
        sql.push_str(&tail.sql);
        params.extend(tail.params);
    }

    Ok(CompiledQuery::new(sql, params))
}

//! DML statement builders.
//!
//! Each builder validates its inputs synchronously, before any I/O, and
//! returns a [`CompiledQuery`](crate::sql::CompiledQuery) with every value
//! bound as a positional parameter.

mod delete;
mod insert;
mod update;

pub use delete::compile_delete;
pub use insert::compile_insert;
pub use update::compile_update;

use crate::document::Document;
use crate::error::RelqError;

pub(crate) fn invalid_document(document: &Document, table: &str) -> RelqError {
    RelqError::InvalidDocument {
        received: document.to_json().to_string(),
        expected: format!("a non-empty object of column values for {table:?}"),
    }
}

pub(crate) fn invalid_filter(filter: &Document, table: &str) -> RelqError {
    RelqError::InvalidFilter {
        received: filter.to_json().to_string(),
        expected: format!("a non-empty object of column equalities for {table:?}"),
    }
}

//! Compiled statement representation and positional-parameter bookkeeping.

use crate::error::{RelqError, Result};
use crate::values::Value;

/// SQL text plus its ordered positional parameter values.
///
/// Invariant: every `$k` placeholder in `sql` has a corresponding
/// `params[k - 1]`, and placeholder numbers are strictly increasing and
/// contiguous within one statement.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    /// The statement text with `$N` placeholders.
    pub sql: String,
    /// Bind values in placeholder order.
    pub params: Vec<Value>,
}

impl CompiledQuery {
    pub fn new(sql: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }
}

/// Positional placeholder counter threaded through one compilation pass.
///
/// Owned by a single compilation call; sibling and child compilers share the
/// same cursor so parameter numbers never collide. Never shared across
/// concurrent compilations.
#[derive(Debug)]
pub struct ParamCursor {
    next: usize,
}

impl ParamCursor {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    /// Consumes one parameter slot, returning its placeholder number.
    pub fn take(&mut self) -> usize {
        let n = self.next;
        self.next += 1;
        n
    }

    /// The number the next placeholder will receive.
    pub fn peek(&self) -> usize {
        self.next
    }
}

impl Default for ParamCursor {
    fn default() -> Self {
        Self::new()
    }
}

/// Validates a single identifier segment before it is spliced into SQL text.
///
/// Identifiers are interpolated, never parameterized, so anything outside
/// `[A-Za-z_][A-Za-z0-9_]*` is rejected up front. Callers holding an
/// introspected schema can additionally allow-list names via
/// [`SchemaInfo::check_columns`](crate::schema::SchemaInfo::check_columns).
pub fn check_ident(name: &str) -> Result<&str> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };
    if valid {
        Ok(name)
    } else {
        Err(RelqError::InvalidIdentifier(name.to_string()))
    }
}

/// Validates a table reference, optionally qualified as `schema.table`.
pub fn check_table(name: &str) -> Result<&str> {
    match name.split_once('.') {
        Some((schema, table)) => {
            check_ident(schema)?;
            check_ident(table)?;
        }
        None => {
            check_ident(name)?;
        }
    }
    Ok(name)
}

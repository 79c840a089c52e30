use thiserror::Error;

/// Errors produced while compiling or executing queries.
///
/// Compilation errors (`InvalidDocument`, `InvalidFilter`, `UnknownOperator`,
/// `InvalidIdentifier`) are raised synchronously, before any I/O. Execution
/// errors wrap the driver failure message; a failure inside
/// [`Executor::transaction`](crate::Executor::transaction) always rolls the
/// transaction back before surfacing.
#[derive(Debug, Error)]
pub enum RelqError {
    /// A DML builder received an empty or malformed document.
    #[error("invalid document: received {received}, expected {expected}")]
    InvalidDocument { received: String, expected: String },

    /// A builder received an empty or malformed filter.
    #[error("invalid filter: received {received}, expected {expected}")]
    InvalidFilter { received: String, expected: String },

    /// A filter condition used an operator key outside the supported set.
    #[error("unknown operator: {0}")]
    UnknownOperator(String),

    /// A table, column, or schema name failed identifier validation.
    #[error("invalid identifier: {0:?}")]
    InvalidIdentifier(String),

    /// A transaction step failed; the transaction was rolled back.
    #[error("transaction failed: {0}")]
    Transaction(String),

    /// A driver-level failure outside a transaction.
    #[error("execution failed: {0}")]
    Execution(String),
}

impl RelqError {
    pub(crate) fn execution(err: impl std::fmt::Display) -> Self {
        Self::Execution(err.to_string())
    }

    pub(crate) fn transaction(err: impl std::fmt::Display) -> Self {
        Self::Transaction(err.to_string())
    }
}

/// Result type for compilation and execution operations.
pub type Result<T> = std::result::Result<T, RelqError>;

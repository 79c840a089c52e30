//! Observability hooks for the execution layer.
//!
//! With the `tracing` feature enabled, every statement and transaction
//! lifecycle step becomes a `tracing` event; without it the macros expand to
//! nothing, so call sites stay unconditional.

/// Records a compiled statement as a debug event: SQL text plus how many
/// values it binds. Parameter values themselves are never logged.
///
/// ```ignore
/// relq_trace_query!(&query.sql, query.params.len());
/// ```
#[macro_export]
macro_rules! relq_trace_query {
    ($sql:expr, $param_count:expr) => {
        #[cfg(feature = "tracing")]
        ::tracing::debug!(sql = %$sql, params = $param_count, "relq.query");
    };
}

/// Records a transaction lifecycle step (`"begin"`, `"commit"`,
/// `"rollback"`) as an info event.
///
/// ```ignore
/// relq_trace_tx!("begin");
/// relq_trace_tx!("rollback");
/// ```
#[macro_export]
macro_rules! relq_trace_tx {
    ($event:literal) => {
        #[cfg(feature = "tracing")]
        ::tracing::info!(event = $event, driver = "postgres.tokio", "relq.transaction");
    };
}

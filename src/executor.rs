//! Async execution wrapper over [`tokio_postgres::Client`].
//!
//! Compilation is pure; this module is the only place I/O happens. Plain
//! selects run on the client directly; DML entry points and
//! [`Executor::transaction`] run inside a driver transaction, committing on
//! success and rolling back on any failure, so a transaction is never left
//! open. Pooling is delegated to the driver layer: one executor wraps one
//! connection, and a transaction holds it for its full duration.

use smallvec::SmallVec;
use tokio_postgres::types::ToSql;
use tokio_postgres::{Client, GenericClient, Row};

use crate::builder::{compile_delete, compile_insert, compile_update};
use crate::document::Document;
use crate::error::{RelqError, Result};
use crate::query::{QueryOptions, compile_select};
use crate::relq_trace_query;
use crate::relq_trace_tx;
use crate::row::{row_to_json, unwrap_aggregate};
use crate::sql::CompiledQuery;
use crate::transaction::Transaction;

/// Rows from a select, normalized to JSON objects.
///
/// `sql` carries the compiled statement text when the query ran with
/// `debug = true`.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectOutput {
    pub rows: Vec<serde_json::Value>,
    pub sql: Option<String>,
}

/// Async PostgreSQL execution wrapper.
pub struct Executor {
    client: Client,
}

impl Executor {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Access to the underlying client for raw driver calls.
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Runs a compiled statement and returns the raw driver rows.
    pub async fn execute(&self, query: &CompiledQuery) -> Result<Vec<Row>> {
        run_query(&self.client, query).await
    }

    /// Compiles and runs a select.
    ///
    /// Relationship queries unwrap their single JSON-aggregate cell into the
    /// row vector; flat queries normalize each driver row to a JSON object.
    pub async fn select(&self, table: &str, options: &QueryOptions) -> Result<SelectOutput> {
        select_on(&self.client, table, options).await
    }

    /// Compiles and runs an insert inside a transaction, returning the
    /// inserted row.
    pub async fn insert(
        &mut self,
        table: &str,
        document: &Document,
    ) -> Result<Option<serde_json::Value>> {
        let compiled = compile_insert(table, document)?;
        self.transaction(async |tx| tx.run_returning(&compiled).await)
            .await
    }

    /// Compiles and runs an update inside a transaction, returning the first
    /// updated row.
    pub async fn update(
        &mut self,
        table: &str,
        filter: &Document,
        document: &Document,
    ) -> Result<Option<serde_json::Value>> {
        let compiled = compile_update(table, filter, document)?;
        self.transaction(async |tx| tx.run_returning(&compiled).await)
            .await
    }

    /// Compiles and runs a delete inside a transaction, returning the number
    /// of rows removed.
    pub async fn delete(&mut self, table: &str, filter: &Document) -> Result<u64> {
        let compiled = compile_delete(table, filter)?;
        self.transaction(async |tx| tx.run_count(&compiled).await)
            .await
    }

    /// Runs `work` inside a transaction.
    ///
    /// `Ok` commits; `Err` rolls back and propagates. Commit failures surface
    /// as [`RelqError::Transaction`]. Either way the transaction is closed
    /// before this returns.
    pub async fn transaction<F, R>(&mut self, work: F) -> Result<R>
    where
        F: AsyncFnOnce(&Transaction<'_>) -> Result<R>,
    {
        let tx = self
            .client
            .transaction()
            .await
            .map_err(RelqError::transaction)?;
        relq_trace_tx!("begin");
        let handle = Transaction::new(tx);

        match work(&handle).await {
            Ok(value) => {
                handle.commit().await?;
                relq_trace_tx!("commit");
                Ok(value)
            }
            Err(err) => {
                // Preserve the work error even if the rollback itself fails.
                let _ = handle.rollback().await;
                relq_trace_tx!("rollback");
                Err(err)
            }
        }
    }
}

impl std::fmt::Debug for Executor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Executor").finish_non_exhaustive()
    }
}

pub(crate) async fn run_query<C>(client: &C, query: &CompiledQuery) -> Result<Vec<Row>>
where
    C: GenericClient,
{
    relq_trace_query!(&query.sql, query.params.len());
    let params = param_refs(query);
    client
        .query(&query.sql, &params[..])
        .await
        .map_err(RelqError::execution)
}

pub(crate) async fn run_count<C>(client: &C, query: &CompiledQuery) -> Result<u64>
where
    C: GenericClient,
{
    relq_trace_query!(&query.sql, query.params.len());
    let params = param_refs(query);
    client
        .execute(&query.sql, &params[..])
        .await
        .map_err(RelqError::execution)
}

pub(crate) async fn select_on<C>(
    client: &C,
    table: &str,
    options: &QueryOptions,
) -> Result<SelectOutput>
where
    C: GenericClient,
{
    let compiled = compile_select(table, options)?;
    let raw = run_query(client, &compiled).await?;
    let rows = if options.relationships.is_empty() {
        raw.iter().map(row_to_json).collect::<Result<Vec<_>>>()?
    } else {
        unwrap_aggregate(&raw)?
    };
    Ok(SelectOutput {
        rows,
        sql: options.debug.then_some(compiled.sql),
    })
}

fn param_refs(query: &CompiledQuery) -> SmallVec<[&(dyn ToSql + Sync); 8]> {
    let mut refs: SmallVec<[&(dyn ToSql + Sync); 8]> =
        SmallVec::with_capacity(query.params.len());
    refs.extend(query.params.iter().map(|p| p as &(dyn ToSql + Sync)));
    refs
}

//! Transaction handle passed to [`Executor::transaction`] work closures.
//!
//! [`Executor::transaction`]: crate::Executor::transaction

use std::cell::RefCell;

use tokio_postgres::{Row, Transaction as TokioPgTransaction};

use crate::builder::{compile_delete, compile_insert, compile_update};
use crate::document::Document;
use crate::error::{RelqError, Result};
use crate::executor::{SelectOutput, run_count, run_query, select_on};
use crate::query::QueryOptions;
use crate::row::row_to_json;
use crate::sql::CompiledQuery;

/// One open transaction. Every statement run through this handle executes on
/// the same connection; commit and rollback are driven by
/// [`Executor::transaction`](crate::Executor::transaction) and consume the
/// inner driver transaction exactly once.
pub struct Transaction<'conn> {
    tx: RefCell<Option<TokioPgTransaction<'conn>>>,
}

impl<'conn> Transaction<'conn> {
    pub(crate) fn new(tx: TokioPgTransaction<'conn>) -> Self {
        Self {
            tx: RefCell::new(Some(tx)),
        }
    }

    /// Runs a compiled statement, returning the raw driver rows.
    pub async fn execute(&self, query: &CompiledQuery) -> Result<Vec<Row>> {
        let tx_ref = self.tx.borrow();
        let tx = tx_ref.as_ref().expect("transaction already consumed");
        run_query(tx, query).await
    }

    /// Compiles and runs a select within the transaction.
    pub async fn select(&self, table: &str, options: &QueryOptions) -> Result<SelectOutput> {
        let tx_ref = self.tx.borrow();
        let tx = tx_ref.as_ref().expect("transaction already consumed");
        select_on(tx, table, options).await
    }

    /// Compiles and runs an insert, returning the inserted row.
    pub async fn insert(
        &self,
        table: &str,
        document: &Document,
    ) -> Result<Option<serde_json::Value>> {
        let compiled = compile_insert(table, document)?;
        self.run_returning(&compiled).await
    }

    /// Compiles and runs an update, returning the first updated row.
    pub async fn update(
        &self,
        table: &str,
        filter: &Document,
        document: &Document,
    ) -> Result<Option<serde_json::Value>> {
        let compiled = compile_update(table, filter, document)?;
        self.run_returning(&compiled).await
    }

    /// Compiles and runs a delete, returning the number of rows removed.
    pub async fn delete(&self, table: &str, filter: &Document) -> Result<u64> {
        let compiled = compile_delete(table, filter)?;
        self.run_count(&compiled).await
    }

    pub(crate) async fn run_returning(
        &self,
        query: &CompiledQuery,
    ) -> Result<Option<serde_json::Value>> {
        let rows = self.execute(query).await?;
        rows.first().map(row_to_json).transpose()
    }

    pub(crate) async fn run_count(&self, query: &CompiledQuery) -> Result<u64> {
        let tx_ref = self.tx.borrow();
        let tx = tx_ref.as_ref().expect("transaction already consumed");
        run_count(tx, query).await
    }

    pub(crate) async fn commit(&self) -> Result<()> {
        let tx = self
            .tx
            .borrow_mut()
            .take()
            .expect("transaction already consumed");
        tx.commit().await.map_err(RelqError::transaction)
    }

    pub(crate) async fn rollback(&self) -> Result<()> {
        let tx = self
            .tx
            .borrow_mut()
            .take()
            .expect("transaction already consumed");
        tx.rollback().await.map_err(RelqError::transaction)
    }
}

impl std::fmt::Debug for Transaction<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("is_active", &self.tx.borrow().is_some())
            .finish()
    }
}

//! # relq
//!
//! A runtime relational query compiler for PostgreSQL.
//!
//! `relq` turns declarative, data-shaped query descriptions — a table name, a
//! filter, sort/pagination options, and an optional tree of foreign-key
//! relationships — into parameterized SQL plus an ordered value list, and
//! executes them over [`tokio_postgres`] with transaction-scoped
//! commit/rollback semantics. Relationship expansion compiles into a single
//! statement of correlated `jsonb_agg` subqueries, so nested results cost one
//! round trip instead of an N+1 fan-out.
//!
//! Compilation is pure and synchronous: builders can be used standalone, and
//! identical input always compiles to byte-identical SQL.
//!
//! ```no_run
//! use relq::prelude::*;
//! use tokio_postgres::NoTls;
//!
//! #[tokio::main]
//! async fn main() -> relq::Result<()> {
//!     let (client, connection) =
//!         tokio_postgres::connect("host=localhost user=postgres", NoTls)
//!             .await
//!             .map_err(|e| RelqError::Execution(e.to_string()))?;
//!     tokio::spawn(async move {
//!         if let Err(e) = connection.await {
//!             eprintln!("connection error: {e}");
//!         }
//!     });
//!
//!     let mut db = Executor::new(client);
//!
//!     let options = QueryOptions::new()
//!         .filter(Filter::new().compare("age", Comparison::Gte, 21))
//!         .relationship(Relationship::one_to_many("posts", "author_id", "users", "id"))
//!         .sort("name", SortDirection::Asc)
//!         .limit(20);
//!     let users = db.select("app.users", &options).await?;
//!     println!("{} users", users.rows.len());
//!
//!     db.insert("app.users", &Document::new().set("name", "Ada")).await?;
//!     Ok(())
//! }
//! ```

pub mod builder;
pub mod document;
pub mod error;
pub mod executor;
pub mod query;
pub mod row;
pub mod schema;
pub mod sql;
pub mod tracing;
pub mod transaction;
pub mod values;

pub use builder::{compile_delete, compile_insert, compile_update};
pub use document::Document;
pub use error::{RelqError, Result};
pub use executor::{Executor, SelectOutput};
pub use query::{
    Cardinality, Comparison, Filter, QueryOptions, Relationship, SortDirection, compile_select,
};
pub use row::row_to_json;
pub use schema::{ColumnInfo, ForeignKeyEdge, SchemaInfo};
pub use sql::{CompiledQuery, ParamCursor};
pub use transaction::Transaction;
pub use values::Value;

/// Commonly used types in one import.
pub mod prelude {
    pub use crate::builder::{compile_delete, compile_insert, compile_update};
    pub use crate::document::Document;
    pub use crate::error::{RelqError, Result};
    pub use crate::executor::{Executor, SelectOutput};
    pub use crate::query::{
        Cardinality, Comparison, Filter, QueryOptions, Relationship, SortDirection,
        compile_select,
    };
    pub use crate::schema::{ColumnInfo, ForeignKeyEdge, SchemaInfo};
    pub use crate::sql::{CompiledQuery, ParamCursor};
    pub use crate::transaction::Transaction;
    pub use crate::values::Value;
}

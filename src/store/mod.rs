//! Storage resource: the statement-executing collaborator this layer runs
//! against. Shared and externally owned; never pooled or cached here.

mod config;
mod postgres;

pub use config::StoreConfig;
pub use postgres::PgStorage;

use crate::error::StoreError;
use crate::sql::Params;
use async_trait::async_trait;
use serde_json::{Map, Value};

/// One result row, column name to value.
pub type Row = Map<String, Value>;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExecOutcome {
    /// Identifier generated for an inserted row, when the statement yields one.
    pub last_insert_id: Option<Value>,
}

/// Executes statements with named `$name` parameters.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn execute(&self, sql: &str, params: &Params) -> Result<ExecOutcome, StoreError>;

    /// Runs a query and hands each row to `on_row`. A row that cannot be read
    /// arrives as `Err`; a statement that fails as a whole returns `Err` here.
    async fn for_each_row(
        &self,
        sql: &str,
        params: &Params,
        on_row: &mut (dyn FnMut(Result<Row, StoreError>) + Send),
    ) -> Result<(), StoreError>;
}

//! PostgreSQL storage over a shared sqlx pool.

use crate::error::StoreError;
use crate::sql::{to_positional, Params, PgBindValue};
use crate::store::{ExecOutcome, Row, Storage, StoreConfig};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgArguments, PgPoolOptions, PgRow};
use sqlx::query::Query;
use sqlx::{PgPool, Postgres};

#[derive(Clone)]
pub struct PgStorage {
    pool: PgPool,
}

impl PgStorage {
    pub fn new(pool: PgPool) -> Self {
        PgStorage { pool }
    }

    pub async fn connect(config: &StoreConfig) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.database_url)
            .await?;
        Ok(PgStorage { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn bind_all<'q>(
    mut query: Query<'q, Postgres, PgArguments>,
    binds: Vec<PgBindValue>,
) -> Query<'q, Postgres, PgArguments> {
    for b in binds {
        query = match b {
            PgBindValue::Bool(v) => query.bind(v),
            PgBindValue::I64(v) => query.bind(v),
            PgBindValue::F64(v) => query.bind(v),
            PgBindValue::String(v) => query.bind(v),
            PgBindValue::Json(v) => query.bind(sqlx::types::Json(v)),
        };
    }
    query
}

#[async_trait]
impl Storage for PgStorage {
    async fn execute(&self, sql: &str, params: &Params) -> Result<ExecOutcome, StoreError> {
        let (sql, binds) = to_positional(sql, params)?;
        tracing::debug!(sql = %sql, params = ?binds, "execute");
        let row = bind_all(sqlx::query(&sql), binds)
            .fetch_optional(&self.pool)
            .await?;
        let last_insert_id = match row {
            Some(r) => first_column(&r)?,
            None => None,
        };
        Ok(ExecOutcome { last_insert_id })
    }

    async fn for_each_row(
        &self,
        sql: &str,
        params: &Params,
        on_row: &mut (dyn FnMut(Result<Row, StoreError>) + Send),
    ) -> Result<(), StoreError> {
        let (sql, binds) = to_positional(sql, params)?;
        tracing::debug!(sql = %sql, params = ?binds, "query");
        let rows = bind_all(sqlx::query(&sql), binds)
            .fetch_all(&self.pool)
            .await?;
        for r in &rows {
            on_row(row_to_json(r));
        }
        Ok(())
    }
}

fn first_column(row: &PgRow) -> Result<Option<Value>, StoreError> {
    use sqlx::{Column as _, Row as _};
    match row.columns().first() {
        Some(col) => Ok(Some(cell_to_value(row, col.name())?)),
        None => Ok(None),
    }
}

fn row_to_json(row: &PgRow) -> Result<Row, StoreError> {
    use sqlx::{Column as _, Row as _};
    let mut map = Row::new();
    for col in row.columns() {
        let name = col.name();
        map.insert(name.to_string(), cell_to_value(row, name)?);
    }
    Ok(map)
}

/// Decode one cell. A non-null cell of a type this layer does not map is a
/// row-level decode error.
fn cell_to_value(row: &PgRow, name: &str) -> Result<Value, StoreError> {
    use sqlx::{Row as _, ValueRef as _};
    let raw = row.try_get_raw(name)?;
    if raw.is_null() {
        return Ok(Value::Null);
    }
    if let Ok(n) = row.try_get::<i16, _>(name) {
        return Ok(Value::Number(n.into()));
    }
    if let Ok(n) = row.try_get::<i32, _>(name) {
        return Ok(Value::Number(n.into()));
    }
    if let Ok(n) = row.try_get::<i64, _>(name) {
        return Ok(Value::Number(n.into()));
    }
    if let Ok(n) = row.try_get::<f32, _>(name) {
        if let Some(n) = serde_json::Number::from_f64(n as f64) {
            return Ok(Value::Number(n));
        }
    }
    if let Ok(n) = row.try_get::<f64, _>(name) {
        if let Some(n) = serde_json::Number::from_f64(n) {
            return Ok(Value::Number(n));
        }
    }
    if let Ok(b) = row.try_get::<bool, _>(name) {
        return Ok(Value::Bool(b));
    }
    if let Ok(s) = row.try_get::<String, _>(name) {
        return Ok(Value::String(s));
    }
    if let Ok(u) = row.try_get::<uuid::Uuid, _>(name) {
        return Ok(Value::String(u.to_string()));
    }
    if let Ok(d) = row.try_get::<chrono::DateTime<chrono::Utc>, _>(name) {
        return Ok(Value::String(d.to_rfc3339()));
    }
    if let Ok(d) = row.try_get::<chrono::NaiveDateTime, _>(name) {
        return Ok(Value::String(d.format("%Y-%m-%dT%H:%M:%S%.f").to_string()));
    }
    if let Ok(d) = row.try_get::<chrono::NaiveDate, _>(name) {
        return Ok(Value::String(d.format("%Y-%m-%d").to_string()));
    }
    if let Ok(j) = row.try_get::<serde_json::Value, _>(name) {
        return Ok(j);
    }
    Err(StoreError::Decode {
        column: name.to_string(),
        reason: "unsupported column type".into(),
    })
}

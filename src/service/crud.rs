//! Insert/update dispatch and selection for registered record types.

use crate::error::{AppError, ConfigError, StoreError};
use crate::record::Record;
use crate::schema::{Schema, SchemaRegistry};
use crate::service::mapper::{is_unset, RecordMapper};
use crate::sql::{self, compile, Conditions, WhereClause};
use crate::store::{Row, Storage};
use serde_json::Value;

pub struct CrudService;

impl CrudService {
    /// Persist `instance`: INSERT when its key is unset, UPDATE otherwise.
    /// After an insert the generated key is written back onto the instance.
    pub async fn sync<R: Record>(
        registry: &SchemaRegistry,
        storage: &dyn Storage,
        instance: &mut R,
    ) -> Result<(), AppError> {
        let schema = registry.verified::<R>(false)?;
        let key = schema
            .primary_key()
            .map(|pk| RecordMapper::get(pk, &*instance))
            .filter(|k| !is_unset(k));
        match key {
            None => Self::insert(&schema, storage, instance).await,
            Some(key) => Self::update(registry, storage, instance, key).await,
        }
    }

    async fn insert<R: Record>(schema: &Schema, storage: &dyn Storage, instance: &mut R) -> Result<(), AppError> {
        let q = sql::insert(schema, RecordMapper::updatable_params(schema, instance)?);
        tracing::debug!(table = %schema.table_name, "sync: insert");
        let outcome = storage.execute(&q.sql, &q.params).await?;
        let Some(pk) = schema.primary_key() else {
            return Ok(());
        };
        let id = outcome.last_insert_id.ok_or_else(|| StoreError::Rejected(format!(
            "insert into {} returned no identifier",
            schema.table_name
        )))?;
        if !RecordMapper::set(pk, instance, &id) {
            return Err(StoreError::Decode {
                column: pk.column.name.clone(),
                reason: format!("generated identifier {} does not fit property '{}'", id, pk.property),
            }
            .into());
        }
        Ok(())
    }

    async fn update<R: Record>(
        registry: &SchemaRegistry,
        storage: &dyn Storage,
        instance: &mut R,
        key: Value,
    ) -> Result<(), AppError> {
        let schema = registry.verified::<R>(true)?;
        let pk = schema
            .primary_key()
            .ok_or_else(|| ConfigError::MissingPrimaryKey {
                table: schema.table_name.clone(),
            })?;
        let values = RecordMapper::updatable_params(&schema, instance)?;
        let Some(q) = sql::update(&schema, pk, values, key) else {
            tracing::debug!(table = %schema.table_name, "sync: nothing to update");
            return Ok(());
        };
        tracing::debug!(table = %schema.table_name, "sync: update");
        storage.execute(&q.sql, &q.params).await?;
        Ok(())
    }

    /// Every row matching `conditions` (all rows for `None`), as instances.
    /// Rows that fail to read are skipped.
    pub async fn select_all<R: Record>(
        registry: &SchemaRegistry,
        storage: &dyn Storage,
        conditions: Option<&Conditions>,
    ) -> Result<Vec<R>, AppError> {
        let schema = registry.verified::<R>(false)?;
        let clause = match conditions {
            Some(c) => compile(&schema, c)?,
            None => WhereClause::empty(),
        };
        Self::select_where(&schema, storage, clause).await
    }

    /// The instance whose key equals `key`, if any.
    pub async fn select_by_key<R: Record>(
        registry: &SchemaRegistry,
        storage: &dyn Storage,
        key: Value,
    ) -> Result<Option<R>, AppError> {
        let schema = registry.verified::<R>(true)?;
        let pk = schema
            .primary_key()
            .ok_or_else(|| ConfigError::MissingPrimaryKey {
                table: schema.table_name.clone(),
            })?;
        let clause = compile(&schema, &Conditions::new().equals(pk.property.clone(), key))?;
        Ok(Self::select_where(&schema, storage, clause).await?.into_iter().next())
    }

    async fn select_where<R: Record>(
        schema: &Schema,
        storage: &dyn Storage,
        clause: WhereClause,
    ) -> Result<Vec<R>, AppError> {
        let q = sql::select(schema, clause);
        let mut out = Vec::new();
        let mut skipped = 0usize;
        storage
            .for_each_row(&q.sql, &q.params, &mut |row: Result<Row, StoreError>| {
                match row.and_then(|r| RecordMapper::hydrate::<R>(schema, &r)) {
                    Ok(instance) => out.push(instance),
                    Err(e) => {
                        skipped += 1;
                        tracing::warn!(table = %schema.table_name, error = %e, "skipping unreadable row");
                    }
                }
            })
            .await?;
        if skipped > 0 {
            tracing::debug!(table = %schema.table_name, returned = out.len(), skipped, "select finished with skipped rows");
        }
        Ok(out)
    }
}

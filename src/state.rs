//! Shared handle for record operations: the read-only schema registry plus the
//! storage resource, cheap to clone into request handlers.

use crate::error::AppError;
use crate::record::Record;
use crate::schema::SchemaRegistry;
use crate::service::{CrudService, RecordMapper};
use crate::sql::Conditions;
use crate::store::Storage;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;

#[derive(Clone)]
pub struct DataMapper {
    pub registry: Arc<SchemaRegistry>,
    pub storage: Arc<dyn Storage>,
}

impl DataMapper {
    /// Freezes `registry`; register every record type before calling this.
    pub fn new(registry: SchemaRegistry, storage: Arc<dyn Storage>) -> Self {
        DataMapper {
            registry: Arc::new(registry),
            storage,
        }
    }

    pub fn create_from_object<R: Record>(&self, input: &Map<String, Value>) -> Result<R, AppError> {
        let schema = self.registry.verified::<R>(false)?;
        Ok(RecordMapper::from_object(&schema, input)?)
    }

    pub async fn sync<R: Record>(&self, instance: &mut R) -> Result<(), AppError> {
        CrudService::sync(&self.registry, self.storage.as_ref(), instance).await
    }

    pub async fn select_all<R: Record>(&self, conditions: Option<&Conditions>) -> Result<Vec<R>, AppError> {
        CrudService::select_all(&self.registry, self.storage.as_ref(), conditions).await
    }

    pub async fn select_by_key<R: Record>(&self, key: impl Into<Value>) -> Result<Option<R>, AppError> {
        CrudService::select_by_key(&self.registry, self.storage.as_ref(), key.into()).await
    }
}

/// Operations available on every registered record type.
#[async_trait]
pub trait ActiveRecord: Record + Sized {
    fn create_from_object(mapper: &DataMapper, input: &Map<String, Value>) -> Result<Self, AppError>;

    async fn sync(&mut self, mapper: &DataMapper) -> Result<(), AppError>;

    async fn select_all(mapper: &DataMapper, conditions: Option<&Conditions>) -> Result<Vec<Self>, AppError>;
}

#[async_trait]
impl<R: Record> ActiveRecord for R {
    fn create_from_object(mapper: &DataMapper, input: &Map<String, Value>) -> Result<Self, AppError> {
        mapper.create_from_object(input)
    }

    async fn sync(&mut self, mapper: &DataMapper) -> Result<(), AppError> {
        mapper.sync(self).await
    }

    async fn select_all(mapper: &DataMapper, conditions: Option<&Conditions>) -> Result<Vec<Self>, AppError> {
        mapper.select_all(conditions).await
    }
}

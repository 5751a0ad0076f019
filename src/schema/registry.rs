//! Schema registry: binds each record type to its table and ordered field map.
//! Populated once at startup, shared read-only afterwards.

use crate::error::ConfigError;
use crate::record::{accessor_table, Record};
use crate::schema::ColumnDescriptor;
use crate::sql::is_identifier;
use std::any::{type_name, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

/// One declared property and the column backing it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Field {
    pub property: String,
    pub column: ColumnDescriptor,
}

impl Field {
    pub fn new(property: impl Into<String>, column: ColumnDescriptor) -> Self {
        Field {
            property: property.into(),
            column,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Schema {
    pub record: &'static str,
    pub table_name: String,
    /// Declaration order is preserved; statements list columns in this order.
    pub fields: Vec<Field>,
}

impl Schema {
    pub fn field(&self, property: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.property == property)
    }

    /// The primary-key field. With several flagged fields the last declared
    /// wins here; [`Schema::verify`] rejects such schemas before any query.
    pub fn primary_key(&self) -> Option<&Field> {
        self.fields.iter().rev().find(|f| f.column.primary_key)
    }

    /// Every field except the primary key, in declaration order.
    pub fn updatable_fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter().filter(|f| !f.column.primary_key)
    }

    /// Checks run before any statement is built. `require_pk` is set for
    /// updates and key lookups.
    pub fn verify(&self, require_pk: bool) -> Result<(), ConfigError> {
        if self.table_name.is_empty() {
            return Err(ConfigError::MissingTable(self.record));
        }
        if !is_identifier(&self.table_name) {
            return Err(ConfigError::InvalidIdentifier(self.table_name.clone()));
        }
        if self.fields.is_empty() {
            return Err(ConfigError::NoFields {
                table: self.table_name.clone(),
            });
        }
        if let Some(bad) = self.fields.iter().find(|f| !is_identifier(&f.column.name)) {
            return Err(ConfigError::InvalidIdentifier(bad.column.name.clone()));
        }
        let keys: Vec<String> = self
            .fields
            .iter()
            .filter(|f| f.column.primary_key)
            .map(|f| f.property.clone())
            .collect();
        if keys.len() > 1 {
            return Err(ConfigError::MultiplePrimaryKeys {
                table: self.table_name.clone(),
                properties: keys,
            });
        }
        if require_pk && keys.is_empty() {
            return Err(ConfigError::MissingPrimaryKey {
                table: self.table_name.clone(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct SchemaRegistry {
    schemas: HashMap<TypeId, Arc<Schema>>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a table and field map to `R`. Registering the same schema again
    /// is a no-op; a different one fails.
    pub fn register<R: Record>(
        &mut self,
        table_name: impl Into<String>,
        fields: Vec<Field>,
    ) -> Result<(), ConfigError> {
        let schema = Schema {
            record: type_name::<R>(),
            table_name: table_name.into(),
            fields,
        };
        if let Some(existing) = self.schemas.get(&TypeId::of::<R>()) {
            if **existing == schema {
                return Ok(());
            }
            return Err(ConfigError::AlreadyRegistered(type_name::<R>()));
        }
        tracing::info!(
            record = schema.record,
            table = %schema.table_name,
            fields = schema.fields.len(),
            "registered schema"
        );
        self.schemas.insert(TypeId::of::<R>(), Arc::new(schema));
        Ok(())
    }

    pub fn schema<R: Record>(&self) -> Result<Arc<Schema>, ConfigError> {
        self.schemas
            .get(&TypeId::of::<R>())
            .cloned()
            .ok_or(ConfigError::NotRegistered(type_name::<R>()))
    }

    /// Schema for `R` after [`Schema::verify`] and a check that every declared
    /// property has an accessor on `R`.
    pub fn verified<R: Record>(&self, require_pk: bool) -> Result<Arc<Schema>, ConfigError> {
        let schema = self.schema::<R>()?;
        schema.verify(require_pk)?;
        let accessors = accessor_table::<R>();
        if let Some(f) = schema
            .fields
            .iter()
            .find(|f| !accessors.contains_key(f.property.as_str()))
        {
            return Err(ConfigError::MissingAccessor {
                table: schema.table_name.clone(),
                property: f.property.clone(),
            });
        }
        Ok(schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{convert, Accessor};
    use crate::schema::ColumnType;
    use serde_json::{json, Value};

    #[derive(Default)]
    struct Reading {
        id: Option<i64>,
        level: Option<f64>,
    }

    impl Record for Reading {
        fn accessors() -> Vec<Accessor<Self>> {
            vec![
                Accessor::new("id", |r: &Self| json!(r.id), |r: &mut Self, v: &Value| {
                    convert::integer(v).map(|x| r.id = x).is_some()
                }),
                Accessor::new("level", |r: &Self| json!(r.level), |r: &mut Self, v: &Value| {
                    convert::number(v).map(|x| r.level = x).is_some()
                }),
            ]
        }
    }

    fn fields() -> Vec<Field> {
        vec![
            Field::new("id", ColumnDescriptor::new("id", ColumnType::Number).primary_key()),
            Field::new("level", ColumnDescriptor::new("level", ColumnType::Number)),
        ]
    }

    #[test]
    fn unregistered_type_is_a_config_error() {
        let reg = SchemaRegistry::new();
        assert!(matches!(
            reg.verified::<Reading>(false),
            Err(ConfigError::NotRegistered(_))
        ));
    }

    #[test]
    fn register_is_idempotent_but_rejects_conflicts() {
        let mut reg = SchemaRegistry::new();
        reg.register::<Reading>("readings", fields()).unwrap();
        reg.register::<Reading>("readings", fields()).unwrap();
        assert_eq!(
            reg.register::<Reading>("other", fields()),
            Err(ConfigError::AlreadyRegistered(type_name::<Reading>()))
        );
        let schema = reg.verified::<Reading>(true).unwrap();
        assert_eq!(schema.primary_key().unwrap().property, "id");
        assert_eq!(schema.updatable_fields().count(), 1);
    }

    #[test]
    fn verification_failures() {
        let mut reg = SchemaRegistry::new();
        reg.register::<Reading>("", fields()).unwrap();
        assert!(matches!(reg.verified::<Reading>(false), Err(ConfigError::MissingTable(_))));

        let mut reg = SchemaRegistry::new();
        reg.register::<Reading>("readings", vec![]).unwrap();
        assert!(matches!(reg.verified::<Reading>(false), Err(ConfigError::NoFields { .. })));

        let mut reg = SchemaRegistry::new();
        reg.register::<Reading>(
            "readings",
            vec![Field::new("level", ColumnDescriptor::new("level", ColumnType::Number))],
        )
        .unwrap();
        assert!(reg.verified::<Reading>(false).is_ok());
        assert!(matches!(
            reg.verified::<Reading>(true),
            Err(ConfigError::MissingPrimaryKey { .. })
        ));

        let mut reg = SchemaRegistry::new();
        reg.register::<Reading>(
            "readings",
            vec![
                Field::new("id", ColumnDescriptor::new("id", ColumnType::Number).primary_key()),
                Field::new("level", ColumnDescriptor::new("level", ColumnType::Number).primary_key()),
            ],
        )
        .unwrap();
        match reg.verified::<Reading>(false) {
            Err(ConfigError::MultiplePrimaryKeys { properties, .. }) => {
                assert_eq!(properties, vec!["id".to_string(), "level".to_string()])
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn missing_accessor_and_bad_identifier() {
        let mut reg = SchemaRegistry::new();
        let mut f = fields();
        f.push(Field::new("note", ColumnDescriptor::new("note", ColumnType::String)));
        reg.register::<Reading>("readings", f).unwrap();
        assert!(matches!(
            reg.verified::<Reading>(false),
            Err(ConfigError::MissingAccessor { property, .. }) if property == "note"
        ));

        let mut reg = SchemaRegistry::new();
        reg.register::<Reading>("readings; drop", fields()).unwrap();
        assert!(matches!(
            reg.verified::<Reading>(false),
            Err(ConfigError::InvalidIdentifier(_))
        ));
    }
}

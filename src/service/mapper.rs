//! Moves values between record instances, raw rows, caller input and
//! statement parameters, going through each type's accessor table.

use crate::error::{QueryError, StoreError, ValidationErrors};
use crate::record::{accessor_table, coerce_number, Record};
use crate::schema::{ColumnType, Field, Schema};
use crate::service::RequestValidator;
use crate::sql::{param_name, Params};
use crate::store::Row;
use serde_json::{Map, Value};

pub struct RecordMapper;

impl RecordMapper {
    /// New instance from a row. Columns the schema does not declare are
    /// ignored; declared ones missing from the row stay unset.
    pub fn hydrate<R: Record>(schema: &Schema, row: &Row) -> Result<R, StoreError> {
        let accessors = accessor_table::<R>();
        let mut instance = R::default();
        for field in &schema.fields {
            let (Some(v), Some(acc)) = (row.get(&field.column.name), accessors.get(field.property.as_str())) else {
                continue;
            };
            if !(acc.set)(&mut instance, v) {
                return Err(StoreError::Decode {
                    column: field.column.name.clone(),
                    reason: format!("value does not fit property '{}'", field.property),
                });
            }
        }
        Ok(instance)
    }

    /// Validate `input` and build an instance from it. Every violation is
    /// reported; no instance is returned when there is any.
    pub fn from_object<R: Record>(schema: &Schema, input: &Map<String, Value>) -> Result<R, ValidationErrors> {
        RequestValidator::validate(schema, input)?;
        let accessors = accessor_table::<R>();
        let mut instance = R::default();
        let mut errors = ValidationErrors::default();
        for field in &schema.fields {
            let (Some(v), Some(acc)) = (input.get(&field.property), accessors.get(field.property.as_str())) else {
                continue;
            };
            if !(acc.set)(&mut instance, &normalize(field, v)) {
                errors.push(&field.property, format!("{} has a value of the wrong type", field.property));
            }
        }
        if errors.is_empty() {
            Ok(instance)
        } else {
            Err(errors)
        }
    }

    /// Parameters for the named non-key properties, keyed by their write
    /// parameter name. The key property is skipped.
    pub fn write_params<R: Record>(schema: &Schema, instance: &R, properties: &[&str]) -> Result<Params, QueryError> {
        let accessors = accessor_table::<R>();
        let mut params = Params::new();
        for property in properties {
            let field = schema.field(property).ok_or_else(|| QueryError::UnknownField {
                field: property.to_string(),
                table: schema.table_name.clone(),
            })?;
            if field.column.primary_key {
                continue;
            }
            let value = accessors
                .get(field.property.as_str())
                .map(|acc| (acc.get)(instance))
                .unwrap_or(Value::Null);
            params.insert(param_name(field).to_string(), value);
        }
        Ok(params)
    }

    /// Write parameters for every non-key field.
    pub(crate) fn updatable_params<R: Record>(schema: &Schema, instance: &R) -> Result<Params, QueryError> {
        let properties: Vec<&str> = schema.updatable_fields().map(|f| f.property.as_str()).collect();
        Self::write_params(schema, instance, &properties)
    }

    pub(crate) fn get<R: Record>(field: &Field, instance: &R) -> Value {
        accessor_table::<R>()
            .get(field.property.as_str())
            .map(|acc| (acc.get)(instance))
            .unwrap_or(Value::Null)
    }

    pub(crate) fn set<R: Record>(field: &Field, instance: &mut R, value: &Value) -> bool {
        accessor_table::<R>()
            .get(field.property.as_str())
            .map(|acc| (acc.set)(instance, value))
            .unwrap_or(false)
    }
}

/// Number-typed input given as a numeric string is stored as a number.
fn normalize(field: &Field, v: &Value) -> Value {
    match (field.column.column_type, v) {
        (ColumnType::Number, Value::String(_)) => coerce_number(v)
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .unwrap_or_else(|| v.clone()),
        _ => v.clone(),
    }
}

/// Whether a key value means "not yet persisted": null, zero, empty string or false.
pub(crate) fn is_unset(key: &Value) -> bool {
    match key {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}

//! Input validation against declared column types and nullability.

use crate::error::ValidationErrors;
use crate::record::coerce_number;
use crate::schema::{ColumnType, Field, Schema};
use serde_json::{Map, Value};

pub struct RequestValidator;

impl RequestValidator {
    /// Check every non-key field of `input`. All violations are collected;
    /// a null value counts as absent.
    pub fn validate(schema: &Schema, input: &Map<String, Value>) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        for field in schema.updatable_fields() {
            let prop = field.property.as_str();
            match input.get(prop).filter(|v| !v.is_null()) {
                None if !field.column.nullable => {
                    errors.push(prop, format!("{} is required", prop));
                }
                None => {}
                Some(v) => {
                    if let Some(message) = type_violation(field, v) {
                        errors.push(prop, message);
                    }
                }
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

fn type_violation(field: &Field, v: &Value) -> Option<String> {
    let prop = &field.property;
    match field.column.column_type {
        ColumnType::Number if coerce_number(v).is_none() => Some(format!("{} must be a number", prop)),
        ColumnType::Boolean if !v.is_boolean() => Some(format!("{} must be true or false", prop)),
        _ => None,
    }
}

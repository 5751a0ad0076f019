//! Table declarations loaded from JSON, for registering schemas from config
//! instead of code.

use crate::case::to_snake_case;
use crate::error::ConfigError;
use crate::record::Record;
use crate::schema::{ColumnDescriptor, ColumnType, Field, SchemaRegistry};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDecl {
    pub property: String,
    /// Defaults to the snake_case form of `property`.
    #[serde(default)]
    pub column: Option<String>,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    #[serde(default = "default_true")]
    pub nullable: bool,
    #[serde(default)]
    pub primary_key: bool,
}

fn default_true() -> bool {
    true
}

/// `{ "tableName": "...", "fields": [ { "property": ..., "type": ... }, ... ] }`
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableDecl {
    pub table_name: String,
    pub fields: Vec<FieldDecl>,
}

impl TableDecl {
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(s).map_err(|e| ConfigError::Load(e.to_string()))
    }

    pub fn into_fields(self) -> (String, Vec<Field>) {
        let fields = self
            .fields
            .into_iter()
            .map(|f| {
                let column = f.column.unwrap_or_else(|| to_snake_case(&f.property));
                Field::new(
                    f.property,
                    ColumnDescriptor {
                        name: column,
                        column_type: f.column_type,
                        nullable: f.nullable,
                        primary_key: f.primary_key,
                    },
                )
            })
            .collect();
        (self.table_name, fields)
    }
}

impl SchemaRegistry {
    pub fn register_decl<R: Record>(&mut self, decl: TableDecl) -> Result<(), ConfigError> {
        let (table, fields) = decl.into_fields();
        self.register::<R>(table, fields)
    }
}

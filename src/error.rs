//! Typed errors and HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Schema declaration mistakes. Never retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("no schema registered for record type {0}")]
    NotRegistered(&'static str),
    #[error("record type {0} has an empty table name")]
    MissingTable(&'static str),
    #[error("table {table} declares no fields")]
    NoFields { table: String },
    #[error("invalid identifier: '{0}'")]
    InvalidIdentifier(String),
    #[error("table {table} declares more than one primary key: {properties:?}")]
    MultiplePrimaryKeys { table: String, properties: Vec<String> },
    #[error("table {table} has no primary key")]
    MissingPrimaryKey { table: String },
    #[error("table {table}: property '{property}' has no accessor on the record type")]
    MissingAccessor { table: String, property: String },
    #[error("record type {0} is already registered with a different schema")]
    AlreadyRegistered(&'static str),
    #[error("declaration load: {0}")]
    Load(String),
}

/// Condition input that cannot be turned into a WHERE clause.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("unknown field '{field}' for table {table}")]
    UnknownField { field: String, table: String },
    #[error("unsupported operator '{0}'")]
    UnsupportedOperator(String),
    #[error("invalid operand for '{operator}' on '{field}': {reason}")]
    InvalidOperand {
        operator: String,
        field: String,
        reason: String,
    },
    #[error("malformed conditions: {0}")]
    Malformed(String),
    #[error("parameter name collision: ${0}")]
    ParamCollision(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldViolation {
    pub field: String,
    pub message: String,
}

/// Every violation found while validating one input object.
#[derive(Error, Debug, Clone, Default, PartialEq, Eq)]
#[error("validation failed: {}", .0.iter().map(|v| v.message.as_str()).collect::<Vec<_>>().join("; "))]
pub struct ValidationErrors(pub Vec<FieldViolation>);

impl ValidationErrors {
    pub fn push(&mut self, field: &str, message: String) {
        self.0.push(FieldViolation {
            field: field.to_string(),
            message,
        });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|v| v.field.as_str())
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
    #[error("statement references unbound parameter ${0}")]
    UnboundParameter(String),
    #[error("cannot decode column '{column}': {reason}")]
    Decode { column: String, reason: String },
    #[error("rejected: {0}")]
    Rejected(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Query(#[from] QueryError),
    #[error(transparent)]
    Validation(#[from] ValidationErrors),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::Store(StoreError::Db(e))
    }
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error"),
            AppError::Query(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            AppError::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "validation_error"),
            AppError::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, "database_error"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let details = match &self {
            AppError::Validation(v) => serde_json::to_value(&v.0).ok(),
            _ => None,
        };
        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message: self.to_string(),
                details,
            },
        };
        (status, Json(body)).into_response()
    }
}

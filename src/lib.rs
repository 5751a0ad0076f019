//! recordmap: declarative record-to-table mapping.
//!
//! A record type is registered once with its table and field map; inserts,
//! updates, filtered selects and input validation are derived from that
//! registration.

pub mod case;
pub mod error;
pub mod record;
pub mod schema;
pub mod service;
pub mod sql;
pub mod state;
pub mod store;

pub use error::{AppError, ConfigError, FieldViolation, QueryError, StoreError, ValidationErrors};
pub use record::{convert, Accessor, Record};
pub use schema::{ColumnDescriptor, ColumnType, Field, Schema, SchemaRegistry, TableDecl};
pub use service::{CrudService, RecordMapper, RequestValidator};
pub use sql::{compile, Condition, Conditions, Operator, Params, WhereClause};
pub use state::{ActiveRecord, DataMapper};
pub use store::{ExecOutcome, PgStorage, Row, Storage, StoreConfig};

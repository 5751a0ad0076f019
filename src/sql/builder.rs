//! Builds parameterized INSERT, UPDATE and SELECT from a verified schema.
//! Identifiers come from the schema only; values are always named parameters.

use crate::schema::{ColumnType, Field, Schema};
use crate::sql::{Params, WhereClause};
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

pub struct QueryBuf {
    pub sql: String,
    pub params: Params,
}

/// Quote identifier for PostgreSQL (safe: only from schema).
pub(crate) fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// Plain SQL identifier: letter or underscore, then letters, digits, underscores.
pub fn is_identifier(s: &str) -> bool {
    static IDENT: OnceLock<Regex> = OnceLock::new();
    IDENT
        .get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern"))
        .is_match(s)
}

/// Parameter name a field's value is written under.
pub fn param_name(field: &Field) -> &str {
    &field.column.name
}

/// Output expression for a column. Number columns come back as `col::text`
/// so any numeric storage type (including NUMERIC) decodes as a string the
/// setters can parse.
fn output_column(field: &Field) -> String {
    let q = quoted(&field.column.name);
    match field.column.column_type {
        ColumnType::Number => format!("{}::text AS {}", q, q),
        _ => q,
    }
}

fn column_list(schema: &Schema) -> String {
    schema
        .fields
        .iter()
        .map(output_column)
        .collect::<Vec<_>>()
        .join(", ")
}

/// INSERT over every non-key column. With a declared key, the generated
/// value is returned via `RETURNING`.
pub fn insert(schema: &Schema, values: Params) -> QueryBuf {
    let table = quoted(&schema.table_name);
    let fields: Vec<&Field> = schema.updatable_fields().collect();
    let mut sql = if fields.is_empty() {
        format!("INSERT INTO {} DEFAULT VALUES", table)
    } else {
        let cols: Vec<String> = fields.iter().map(|f| quoted(&f.column.name)).collect();
        let placeholders: Vec<String> = fields.iter().map(|f| format!("${}", param_name(f))).collect();
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table,
            cols.join(", "),
            placeholders.join(", ")
        )
    };
    if let Some(pk) = schema.primary_key() {
        sql.push_str(&format!(" RETURNING {}", output_column(pk)));
    }
    QueryBuf { sql, params: values }
}

/// UPDATE every non-key column of the row identified by `key`.
/// `None` when the schema has nothing besides the key to set.
pub fn update(schema: &Schema, pk: &Field, mut values: Params, key: Value) -> Option<QueryBuf> {
    let sets: Vec<String> = schema
        .updatable_fields()
        .map(|f| format!("{} = ${}", quoted(&f.column.name), param_name(f)))
        .collect();
    if sets.is_empty() {
        return None;
    }
    values.insert(param_name(pk).to_string(), key);
    let sql = format!(
        "UPDATE {} SET {} WHERE {} = ${}",
        quoted(&schema.table_name),
        sets.join(", "),
        quoted(&pk.column.name),
        param_name(pk)
    );
    Some(QueryBuf { sql, params: values })
}

/// SELECT all declared columns, filtered by `clause`, ordered by key when there is one.
/// The ORDER BY column is table-qualified so it sorts on the stored value,
/// not on a `::text` output alias.
pub fn select(schema: &Schema, clause: WhereClause) -> QueryBuf {
    let table = quoted(&schema.table_name);
    let order_clause = schema
        .primary_key()
        .map(|pk| format!(" ORDER BY {}.{}", table, quoted(&pk.column.name)))
        .unwrap_or_default();
    let sql = format!(
        "SELECT {} FROM {}{}{}",
        column_list(schema),
        table,
        clause.to_suffix(),
        order_clause
    );
    QueryBuf {
        sql,
        params: clause.params,
    }
}

//! Shared fixtures: an `Observation` record type and an in-memory storage that
//! understands the statement shapes this crate generates.

#![allow(dead_code)]

use async_trait::async_trait;
use recordmap::{
    convert, Accessor, ColumnDescriptor, ColumnType, DataMapper, ExecOutcome, Field, Params, Record, Row,
    SchemaRegistry, Storage, StoreError,
};
use regex::Regex;
use serde_json::{json, Value};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Observation {
    pub id: Option<i64>,
    pub station_key: Option<String>,
    pub value: Option<f64>,
    pub verified: Option<bool>,
}

impl Record for Observation {
    fn accessors() -> Vec<Accessor<Self>> {
        vec![
            Accessor::new("id", |r: &Self| json!(r.id), |r: &mut Self, v: &Value| {
                convert::integer(v).map(|x| r.id = x).is_some()
            }),
            Accessor::new("stationKey", |r: &Self| json!(r.station_key), |r: &mut Self, v: &Value| {
                convert::string(v).map(|x| r.station_key = x).is_some()
            }),
            Accessor::new("value", |r: &Self| json!(r.value), |r: &mut Self, v: &Value| {
                convert::number(v).map(|x| r.value = x).is_some()
            }),
            Accessor::new("verified", |r: &Self| json!(r.verified), |r: &mut Self, v: &Value| {
                convert::boolean(v).map(|x| r.verified = x).is_some()
            }),
        ]
    }
}

pub fn observation_fields() -> Vec<Field> {
    vec![
        Field::new("id", ColumnDescriptor::new("id", ColumnType::Number).primary_key()),
        Field::new("stationKey", ColumnDescriptor::new("station_key", ColumnType::String).required()),
        Field::new("value", ColumnDescriptor::new("value", ColumnType::Number).required()),
        Field::new("verified", ColumnDescriptor::new("verified", ColumnType::Boolean)),
    ]
}

pub fn registry() -> SchemaRegistry {
    let mut registry = SchemaRegistry::new();
    registry
        .register::<Observation>("observations", observation_fields())
        .unwrap();
    registry
}

pub fn mapper() -> (DataMapper, Arc<MemoryStorage>) {
    let storage = Arc::new(MemoryStorage::default());
    (DataMapper::new(registry(), storage.clone()), storage)
}

#[derive(Default)]
struct State {
    tables: HashMap<String, Vec<Result<Row, String>>>,
    next_id: i64,
    log: Vec<(String, Params)>,
    fail_next: Option<String>,
}

/// Keeps rows per table. Write parameters are named after their columns, so an
/// INSERT's parameters are the row itself.
#[derive(Default)]
pub struct MemoryStorage {
    state: Mutex<State>,
}

impl MemoryStorage {
    pub fn statements(&self) -> Vec<(String, Params)> {
        self.state.lock().unwrap().log.clone()
    }

    pub fn rows(&self, table: &str) -> Vec<Row> {
        let state = self.state.lock().unwrap();
        state
            .tables
            .get(table)
            .map(|rows| rows.iter().filter_map(|r| r.clone().ok()).collect())
            .unwrap_or_default()
    }

    pub fn seed(&self, table: &str, row: Value) {
        let row = row.as_object().cloned().unwrap();
        self.state
            .lock()
            .unwrap()
            .tables
            .entry(table.to_string())
            .or_default()
            .push(Ok(row));
    }

    /// A row that fails when read.
    pub fn seed_unreadable(&self, table: &str, reason: &str) {
        self.state
            .lock()
            .unwrap()
            .tables
            .entry(table.to_string())
            .or_default()
            .push(Err(reason.to_string()));
    }

    pub fn fail_next(&self, reason: &str) {
        self.state.lock().unwrap().fail_next = Some(reason.to_string());
    }
}

fn capture(re: &str, sql: &str) -> Option<String> {
    Regex::new(re).unwrap().captures(sql).map(|c| c[1].to_string())
}

fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

fn param<'a>(params: &'a Params, name: &str) -> &'a Value {
    params.get(name).unwrap_or_else(|| panic!("unbound parameter ${}", name))
}

/// Evaluate a WHERE clause made of the fragments the condition compiler emits.
fn matches_where(row: &Row, where_sql: &str, params: &Params) -> bool {
    if where_sql.contains("1 = 0") {
        return false;
    }
    let predicate = Regex::new(
        r#""(\w+)" (?:(>=|<=|=|>|<) \$([\w.]+)|BETWEEN \$([\w.]+) AND \$([\w.]+)|IN \(([^)]*)\)|(IS NULL))"#,
    )
    .unwrap();
    let matched = predicate.captures_iter(where_sql).all(|c| {
        let cell = row.get(&c[1]).cloned().unwrap_or(Value::Null);
        if c.get(7).is_some() {
            return cell.is_null();
        }
        if let Some(op) = c.get(2) {
            let ord = compare(&cell, param(params, &c[3]));
            return match op.as_str() {
                "=" => ord == Some(Ordering::Equal),
                ">" => ord == Some(Ordering::Greater),
                "<" => ord == Some(Ordering::Less),
                ">=" => matches!(ord, Some(Ordering::Greater | Ordering::Equal)),
                "<=" => matches!(ord, Some(Ordering::Less | Ordering::Equal)),
                _ => false,
            };
        }
        if let (Some(lo), Some(hi)) = (c.get(4), c.get(5)) {
            return matches!(
                compare(&cell, param(params, lo.as_str())),
                Some(Ordering::Greater | Ordering::Equal)
            ) && matches!(
                compare(&cell, param(params, hi.as_str())),
                Some(Ordering::Less | Ordering::Equal)
            );
        }
        let list = c.get(6).map(|m| m.as_str()).unwrap_or("");
        list.split(", ").any(|p| {
            compare(&cell, param(params, p.trim_start_matches('$'))) == Some(Ordering::Equal)
        })
    });
    matched
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn execute(&self, sql: &str, params: &Params) -> Result<ExecOutcome, StoreError> {
        let mut state = self.state.lock().unwrap();
        state.log.push((sql.to_string(), params.clone()));
        if let Some(reason) = state.fail_next.take() {
            return Err(StoreError::Rejected(reason));
        }
        if sql.starts_with("INSERT INTO") {
            let table = capture(r#"^INSERT INTO "(\w+)""#, sql).unwrap();
            let mut row: Row = params.clone().into_iter().collect();
            let mut last_insert_id = None;
            if let Some(pk) = capture(r#"RETURNING "(\w+)""#, sql) {
                state.next_id += 1;
                let id = json!(state.next_id);
                row.insert(pk, id.clone());
                last_insert_id = Some(id);
            }
            state.tables.entry(table).or_default().push(Ok(row));
            return Ok(ExecOutcome { last_insert_id });
        }
        if sql.starts_with("UPDATE") {
            let table = capture(r#"^UPDATE "(\w+)""#, sql).unwrap();
            let pk = capture(r#"WHERE "(\w+)" = \$\w+$"#, sql).unwrap();
            let key_param = capture(r#"WHERE "\w+" = \$(\w+)$"#, sql).unwrap();
            let key = param(params, &key_param).clone();
            if let Some(rows) = state.tables.get_mut(&table) {
                for row in rows.iter_mut().flatten() {
                    if row.get(&pk).and_then(|v| compare(v, &key)) == Some(Ordering::Equal) {
                        for (name, value) in params {
                            if *name != key_param {
                                row.insert(name.clone(), value.clone());
                            }
                        }
                    }
                }
            }
            return Ok(ExecOutcome::default());
        }
        Err(StoreError::Rejected(format!("unsupported statement: {}", sql)))
    }

    async fn for_each_row(
        &self,
        sql: &str,
        params: &Params,
        on_row: &mut (dyn FnMut(Result<Row, StoreError>) + Send),
    ) -> Result<(), StoreError> {
        let rows = {
            let mut state = self.state.lock().unwrap();
            state.log.push((sql.to_string(), params.clone()));
            if let Some(reason) = state.fail_next.take() {
                return Err(StoreError::Rejected(reason));
            }
            let table = capture(r#"FROM "(\w+)""#, sql).unwrap();
            state.tables.get(&table).cloned().unwrap_or_default()
        };
        let where_sql = capture(r"WHERE (.*?)(?: ORDER BY|$)", sql).unwrap_or_default();
        for row in rows {
            match row {
                Ok(r) if matches_where(&r, &where_sql, params) => on_row(Ok(r)),
                Ok(_) => {}
                Err(reason) => on_row(Err(StoreError::Decode {
                    column: "*".into(),
                    reason,
                })),
            }
        }
        Ok(())
    }
}

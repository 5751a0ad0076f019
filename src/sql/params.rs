//! Named parameters to positional binds: `$name` and `$name.suffix`
//! placeholders become `$1..$n` and values convert from serde_json::Value to types sqlx can bind.
//!
//! Null values are written as a `NULL` literal instead of a bind, so the
//! column's own type applies rather than the bind's.

use crate::error::StoreError;
use crate::sql::Params;
use regex::{Captures, Regex};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::OnceLock;

/// A value that can be bound to a PostgreSQL query. Converts from serde_json::Value.
#[derive(Clone, Debug, PartialEq)]
pub enum PgBindValue {
    Bool(bool),
    I64(i64),
    F64(f64),
    String(String),
    Json(Value),
}

impl PgBindValue {
    /// `None` for JSON null, which is never bound.
    pub fn from_json(v: &Value) -> Option<Self> {
        Some(match v {
            Value::Null => return None,
            Value::Bool(b) => PgBindValue::Bool(*b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    PgBindValue::I64(i)
                } else if let Some(f) = n.as_f64() {
                    PgBindValue::F64(f)
                } else {
                    PgBindValue::String(n.to_string())
                }
            }
            Value::String(s) => PgBindValue::String(s.clone()),
            Value::Array(_) | Value::Object(_) => PgBindValue::Json(v.clone()),
        })
    }
}

fn placeholder() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| Regex::new(r"\$([A-Za-z_][A-Za-z0-9_]*(?:\.[A-Za-z0-9_]+)?)").expect("placeholder pattern"))
}

/// Rewrite `$name` placeholders to `$1..$n` in order of first appearance and
/// return the bind values in that order. A name used twice binds once.
pub fn to_positional(sql: &str, params: &Params) -> Result<(String, Vec<PgBindValue>), StoreError> {
    let mut order: HashMap<String, usize> = HashMap::new();
    let mut binds = Vec::new();
    let mut missing: Option<String> = None;
    let rewritten = placeholder().replace_all(sql, |caps: &Captures<'_>| {
        let name = &caps[1];
        if let Some(n) = order.get(name) {
            return format!("${}", n);
        }
        match params.get(name) {
            Some(v) => {
                let Some(bind) = PgBindValue::from_json(v) else {
                    return "NULL".to_string();
                };
                binds.push(bind);
                let n = binds.len();
                order.insert(name.to_string(), n);
                format!("${}", n)
            }
            None => {
                missing.get_or_insert_with(|| name.to_string());
                caps[0].to_string()
            }
        }
    });
    if let Some(name) = missing {
        return Err(StoreError::UnboundParameter(name));
    }
    Ok((rewritten.into_owned(), binds))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rewrites_in_order_of_appearance() {
        let params = Params::from([
            ("value.lo".to_string(), json!(10)),
            ("value.hi".to_string(), json!(20.5)),
            ("station_key".to_string(), json!("A")),
        ]);
        let (sql, binds) = to_positional(
            "SELECT * FROM \"t\" WHERE \"station_key\" = $station_key AND \"value\" BETWEEN $value.lo AND $value.hi",
            &params,
        )
        .unwrap();
        assert_eq!(
            sql,
            "SELECT * FROM \"t\" WHERE \"station_key\" = $1 AND \"value\" BETWEEN $2 AND $3"
        );
        assert_eq!(
            binds,
            vec![
                PgBindValue::String("A".into()),
                PgBindValue::I64(10),
                PgBindValue::F64(20.5)
            ]
        );
    }

    #[test]
    fn repeated_name_binds_once() {
        let params = Params::from([("a".to_string(), json!(true))]);
        let (sql, binds) = to_positional("$a OR $a", &params).unwrap();
        assert_eq!(sql, "$1 OR $1");
        assert_eq!(binds, vec![PgBindValue::Bool(true)]);
    }

    #[test]
    fn unbound_name_is_an_error() {
        let err = to_positional("\"x\" = $x", &Params::new()).unwrap_err();
        assert!(matches!(err, StoreError::UnboundParameter(n) if n == "x"));
    }

    #[test]
    fn nulls_are_inlined() {
        let params = Params::from([
            ("a".to_string(), Value::Null),
            ("b".to_string(), json!("x")),
        ]);
        let (sql, binds) = to_positional("VALUES ($a, $b)", &params).unwrap();
        assert_eq!(sql, "VALUES (NULL, $1)");
        assert_eq!(binds, vec![PgBindValue::String("x".into())]);
    }

    #[test]
    fn json_conversion() {
        assert_eq!(PgBindValue::from_json(&Value::Null), None);
        assert_eq!(PgBindValue::from_json(&json!([1])), Some(PgBindValue::Json(json!([1]))));
    }
}

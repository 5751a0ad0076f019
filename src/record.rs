//! Record types: the capability trait a mapped struct implements and the
//! property accessor table that lets the mapper read and write its fields
//! without knowing the concrete struct.

use serde_json::Value;
use std::collections::HashMap;

/// A struct persisted as rows of one table.
///
/// `Default` is the empty-instance factory. `accessors` lists one entry per
/// mapped property; the property names must match the ones registered in the
/// [`SchemaRegistry`](crate::schema::SchemaRegistry).
pub trait Record: Default + Send + Sync + 'static {
    fn accessors() -> Vec<Accessor<Self>>;
}

/// Get/set pair for one property.
///
/// `set` returns `false` when the value does not fit the property's Rust
/// type; the instance is left untouched in that case.
pub struct Accessor<R> {
    pub property: &'static str,
    pub get: fn(&R) -> Value,
    pub set: fn(&mut R, &Value) -> bool,
}

impl<R> Accessor<R> {
    pub fn new(property: &'static str, get: fn(&R) -> Value, set: fn(&mut R, &Value) -> bool) -> Self {
        Accessor { property, get, set }
    }
}

impl<R> Clone for Accessor<R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<R> Copy for Accessor<R> {}

/// Accessors keyed by property name.
pub(crate) fn accessor_table<R: Record>() -> HashMap<&'static str, Accessor<R>> {
    R::accessors().into_iter().map(|a| (a.property, a)).collect()
}

/// Numeric coercion used for `Number` columns: JSON numbers, and strings that
/// parse to a finite number.
pub fn coerce_number(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    }
}

/// Conversions for accessor setters. Each returns `None` when the value does
/// not fit, `Some(None)` for JSON null.
pub mod convert {
    use super::coerce_number;
    use serde_json::Value;

    pub fn number(v: &Value) -> Option<Option<f64>> {
        if v.is_null() {
            return Some(None);
        }
        coerce_number(v).map(Some)
    }

    pub fn integer(v: &Value) -> Option<Option<i64>> {
        match v {
            Value::Null => Some(None),
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
                .map(Some),
            Value::String(s) => s.trim().parse::<i64>().ok().map(Some),
            _ => None,
        }
    }

    pub fn string(v: &Value) -> Option<Option<String>> {
        match v {
            Value::Null => Some(None),
            Value::String(s) => Some(Some(s.clone())),
            Value::Number(n) => Some(Some(n.to_string())),
            Value::Bool(b) => Some(Some(b.to_string())),
            _ => None,
        }
    }

    pub fn boolean(v: &Value) -> Option<Option<bool>> {
        match v {
            Value::Null => Some(None),
            Value::Bool(b) => Some(Some(*b)),
            _ => None,
        }
    }
}

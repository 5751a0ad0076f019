//! Caller conditions and their compilation into a WHERE clause.
//!
//! Input shape, per property: a scalar (equality), a list of scalars (`IN`),
//! or a single-key object `{ "<operator>": value }`. Fragments are joined with
//! `AND` in input order.

use crate::error::QueryError;
use crate::schema::Schema;
use crate::sql::operator::{in_list, Operator};
use crate::sql::WhereClause;
use serde_json::Value;

#[derive(Clone, Debug, PartialEq)]
pub enum Condition {
    Equals(Value),
    AnyOf(Vec<Value>),
    Compare(Operator, Value),
}

impl Condition {
    pub fn from_json(property: &str, v: &Value) -> Result<Self, QueryError> {
        Ok(match v {
            Value::Array(items) => Condition::AnyOf(items.clone()),
            Value::Object(obj) => {
                let mut entries = obj.iter();
                match (entries.next(), entries.next()) {
                    (Some((name, operand)), None) => Condition::Compare(name.parse()?, operand.clone()),
                    _ => {
                        return Err(QueryError::InvalidOperand {
                            operator: obj.keys().cloned().collect::<Vec<_>>().join(","),
                            field: property.to_string(),
                            reason: "expected exactly one operator per field".into(),
                        })
                    }
                }
            }
            scalar => Condition::Equals(scalar.clone()),
        })
    }
}

/// Property name to condition, kept in insertion order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Conditions(Vec<(String, Condition)>);

impl Conditions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, property: impl Into<String>, condition: Condition) -> Self {
        self.0.push((property.into(), condition));
        self
    }

    pub fn equals(self, property: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with(property, Condition::Equals(value.into()))
    }

    pub fn any_of(self, property: impl Into<String>, values: Vec<Value>) -> Self {
        self.with(property, Condition::AnyOf(values))
    }

    pub fn compare(self, property: impl Into<String>, op: Operator, value: impl Into<Value>) -> Self {
        self.with(property, Condition::Compare(op, value.into()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Condition)> {
        self.0.iter().map(|(p, c)| (p.as_str(), c))
    }

    /// Parse the JSON condition format. Operator names are checked here, so an
    /// unsupported one fails before any statement exists.
    pub fn from_json(v: &Value) -> Result<Self, QueryError> {
        let obj = v
            .as_object()
            .ok_or_else(|| QueryError::Malformed("conditions must be a JSON object".into()))?;
        let mut out = Conditions::new();
        for (property, cond) in obj {
            out = out.with(property.clone(), Condition::from_json(property, cond)?);
        }
        Ok(out)
    }
}

/// Compile conditions against a schema. Every property must be declared on it.
pub fn compile(schema: &Schema, conditions: &Conditions) -> Result<WhereClause, QueryError> {
    let mut clause = WhereClause::empty();
    for (property, condition) in conditions.iter() {
        let field = schema.field(property).ok_or_else(|| QueryError::UnknownField {
            field: property.to_string(),
            table: schema.table_name.clone(),
        })?;
        let fragment = match condition {
            Condition::Equals(v) => Operator::Eq.apply(field, v)?,
            Condition::AnyOf(values) => in_list(field, values)?,
            Condition::Compare(op, v) => op.apply(field, v)?,
        };
        clause = clause.and(fragment)?;
    }
    Ok(clause)
}

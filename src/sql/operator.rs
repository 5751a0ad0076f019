//! Comparison operators usable in conditions. The set is closed.

use crate::error::QueryError;
use crate::schema::Field;
use super::builder::quoted;
use crate::sql::WhereClause;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
    Between,
}

impl Operator {
    pub const ALL: [Operator; 6] = [
        Operator::Eq,
        Operator::Gt,
        Operator::Gte,
        Operator::Lt,
        Operator::Lte,
        Operator::Between,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Operator::Eq => "eq",
            Operator::Gt => "gt",
            Operator::Gte => "gte",
            Operator::Lt => "lt",
            Operator::Lte => "lte",
            Operator::Between => "between",
        }
    }

    fn symbol(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Gt => ">",
            Operator::Gte => ">=",
            Operator::Lt => "<",
            Operator::Lte => "<=",
            Operator::Between => "BETWEEN",
        }
    }

    /// Build the fragment for `field <op> value`. A binary operator binds
    /// `$col`; `between` binds `$col.lo` and `$col.hi`. `eq` with null is
    /// `IS NULL`; every other operand must be a non-null scalar.
    pub fn apply(&self, field: &Field, value: &Value) -> Result<WhereClause, QueryError> {
        let col = &field.column.name;
        match self {
            Operator::Eq if value.is_null() => Ok(is_null(field)),
            Operator::Between => {
                let (lo, hi) = match value.as_array().map(Vec::as_slice) {
                    Some([lo, hi]) if is_bindable(lo) && is_bindable(hi) => (lo, hi),
                    _ => return Err(self.invalid(field, "expected a two-element [low, high] list of non-null scalars")),
                };
                let lo_name = derived_name(col, "lo");
                let hi_name = derived_name(col, "hi");
                let sql = format!("{} BETWEEN ${} AND ${}", quoted(col), lo_name, hi_name);
                Ok(WhereClause::fragment(
                    sql,
                    [(lo_name, lo.clone()), (hi_name, hi.clone())],
                ))
            }
            _ => {
                if !is_bindable(value) {
                    return Err(self.invalid(field, "expected a non-null scalar value"));
                }
                let sql = format!("{} {} ${}", quoted(col), self.symbol(), col);
                Ok(WhereClause::fragment(sql, [(col.clone(), value.clone())]))
            }
        }
    }

    fn invalid(&self, field: &Field, reason: &str) -> QueryError {
        QueryError::InvalidOperand {
            operator: self.name().to_string(),
            field: field.property.clone(),
            reason: reason.to_string(),
        }
    }
}

impl FromStr for Operator {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Operator::ALL
            .into_iter()
            .find(|op| op.name() == s)
            .ok_or_else(|| QueryError::UnsupportedOperator(s.to_string()))
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// `col IN ($col.0, $col.1, ...)`, one parameter per element in input order.
/// An empty list matches nothing.
pub fn in_list(field: &Field, values: &[Value]) -> Result<WhereClause, QueryError> {
    let col = &field.column.name;
    if values.is_empty() {
        return Ok(WhereClause::bare("1 = 0".into()));
    }
    if !values.iter().all(is_bindable) {
        return Err(QueryError::InvalidOperand {
            operator: "in".into(),
            field: field.property.clone(),
            reason: "list elements must be non-null scalars".into(),
        });
    }
    let names: Vec<String> = (0..values.len()).map(|i| derived_name(col, &i.to_string())).collect();
    let placeholders: Vec<String> = names.iter().map(|n| format!("${}", n)).collect();
    let sql = format!("{} IN ({})", quoted(col), placeholders.join(", "));
    Ok(WhereClause::fragment(sql, names.into_iter().zip(values.iter().cloned())))
}

/// `col IS NULL`.
pub fn is_null(field: &Field) -> WhereClause {
    WhereClause::bare(format!("{} IS NULL", quoted(&field.column.name)))
}

/// `col.suffix`. Identifiers never contain `.`, so a derived name cannot
/// equal any column's own parameter name.
fn derived_name(col: &str, suffix: &str) -> String {
    format!("{}.{}", col, suffix)
}

fn is_bindable(v: &Value) -> bool {
    !matches!(v, Value::Null | Value::Array(_) | Value::Object(_))
}

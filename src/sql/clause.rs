//! Compiled WHERE clauses: SQL fragment plus named parameters.

use crate::error::QueryError;
use serde_json::Value;
use std::collections::BTreeMap;

/// Named statement parameters, referenced in SQL as `$name`.
pub type Params = BTreeMap<String, Value>;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct WhereClause {
    pub sql: String,
    pub params: Params,
}

impl WhereClause {
    pub fn empty() -> Self {
        Self::default()
    }

    pub(crate) fn fragment(sql: String, params: impl IntoIterator<Item = (String, Value)>) -> Self {
        WhereClause {
            sql,
            params: params.into_iter().collect(),
        }
    }

    /// Fragment with no parameters.
    pub(crate) fn bare(sql: String) -> Self {
        WhereClause {
            sql,
            params: Params::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.sql.is_empty()
    }

    /// AND-compose two clauses. A parameter name present in both is an error.
    pub fn and(mut self, other: WhereClause) -> Result<Self, QueryError> {
        if other.is_empty() {
            return Ok(self);
        }
        for (name, value) in other.params {
            if self.params.contains_key(&name) {
                return Err(QueryError::ParamCollision(name));
            }
            self.params.insert(name, value);
        }
        if self.sql.is_empty() {
            self.sql = other.sql;
        } else {
            self.sql = format!("{} AND {}", self.sql, other.sql);
        }
        Ok(self)
    }

    /// `" WHERE <sql>"`, or nothing for an empty clause.
    pub fn to_suffix(&self) -> String {
        if self.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.sql)
        }
    }
}

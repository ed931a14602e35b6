//! Record trait and index filter types

use std::collections::HashMap;

use serde::Serialize;
use serde::de::DeserializeOwned;

/// A value stored in the index side table
#[derive(Debug, Clone, PartialEq)]
pub enum IndexValue {
    String(String),
    Int(i64),
    Bool(bool),
}

impl IndexValue {
    /// Convert to a SQLite value for binding
    pub(crate) fn to_sql_value(&self) -> rusqlite::types::Value {
        match self {
            Self::String(s) => rusqlite::types::Value::Text(s.clone()),
            Self::Int(i) => rusqlite::types::Value::Integer(*i),
            Self::Bool(b) => rusqlite::types::Value::Integer(i64::from(*b)),
        }
    }
}

impl From<&str> for IndexValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for IndexValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for IndexValue {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<bool> for IndexValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

/// Comparison operator for a [`Filter`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl FilterOp {
    pub(crate) fn as_sql(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Lt => "<",
            Self::Lte => "<=",
        }
    }
}

/// Filter on an indexed field
#[derive(Debug, Clone)]
pub struct Filter {
    pub field: String,
    pub op: FilterOp,
    pub value: IndexValue,
}

impl Filter {
    /// Equality filter shorthand
    pub fn eq(field: impl Into<String>, value: impl Into<IndexValue>) -> Self {
        Self {
            field: field.into(),
            op: FilterOp::Eq,
            value: value.into(),
        }
    }
}

/// A type that can be persisted in a [`crate::Store`]
pub trait Record: Serialize + DeserializeOwned + Send + 'static {
    /// Unique identifier within the collection
    fn id(&self) -> &str;

    /// Last update timestamp (Unix milliseconds)
    fn updated_at(&self) -> i64;

    /// Collection (table namespace) for this record type
    fn collection_name() -> &'static str;

    /// Fields to index for filtering
    fn indexed_fields(&self) -> HashMap<String, IndexValue>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bool_index_binds_as_integer() {
        assert_eq!(
            IndexValue::Bool(true).to_sql_value(),
            rusqlite::types::Value::Integer(1)
        );
        assert_eq!(
            IndexValue::Bool(false).to_sql_value(),
            rusqlite::types::Value::Integer(0)
        );
    }

    #[test]
    fn test_filter_eq_shorthand() {
        let filter = Filter::eq("status", "open");
        assert_eq!(filter.field, "status");
        assert_eq!(filter.op, FilterOp::Eq);
        assert_eq!(filter.value, IndexValue::String("open".to_string()));
    }
}

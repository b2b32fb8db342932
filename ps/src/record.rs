//! Record trait and index types
//!
//! A `Record` is anything the store can persist: it carries a stable id,
//! an update timestamp, a collection name, and the fields it wants
//! indexed for filtered queries.

use std::collections::HashMap;

use serde::{Deserialize, Serialize, de::DeserializeOwned};

/// Current time as Unix milliseconds
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// A value that can be stored in an index and filtered on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum IndexValue {
    String(String),
    Int(i64),
    Bool(bool),
}

impl std::fmt::Display for IndexValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::String(s) => write!(f, "{}", s),
            Self::Int(i) => write!(f, "{}", i),
            Self::Bool(b) => write!(f, "{}", b),
        }
    }
}

/// A persistable record
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Unique identifier within the collection
    fn id(&self) -> &str;

    /// Last update timestamp (Unix milliseconds)
    fn updated_at(&self) -> i64;

    /// Collection this record type lives in
    fn collection_name() -> &'static str;

    /// Fields exposed for filtered queries
    fn indexed_fields(&self) -> HashMap<String, IndexValue> {
        HashMap::new()
    }
}

/// Filter operation for queries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Ne,
    Gt,
    Lt,
}

/// A single query filter against an indexed field
#[derive(Debug, Clone)]
pub struct Filter {
    pub field: String,
    pub op: FilterOp,
    pub value: IndexValue,
}

impl Filter {
    /// Create an equality filter
    pub fn eq(field: impl Into<String>, value: IndexValue) -> Self {
        Self {
            field: field.into(),
            op: FilterOp::Eq,
            value,
        }
    }

    /// Check whether a set of indexed fields satisfies this filter
    pub fn matches(&self, fields: &HashMap<String, IndexValue>) -> bool {
        let Some(actual) = fields.get(&self.field) else {
            return false;
        };

        match self.op {
            FilterOp::Eq => actual == &self.value,
            FilterOp::Ne => actual != &self.value,
            FilterOp::Gt => match (actual, &self.value) {
                (IndexValue::Int(a), IndexValue::Int(b)) => a > b,
                (IndexValue::String(a), IndexValue::String(b)) => a > b,
                _ => false,
            },
            FilterOp::Lt => match (actual, &self.value) {
                (IndexValue::Int(a), IndexValue::Int(b)) => a < b,
                (IndexValue::String(a), IndexValue::String(b)) => a < b,
                _ => false,
            },
        }
    }
}

//! Keyspace value type

use super::{MemberSet, ScoredSet};

#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    String(String),
    Set(MemberSet),
    SortedSet(ScoredSet),
}

impl Value {
    pub fn as_string(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }
}

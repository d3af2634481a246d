//! Keyspace data structures backing the in-memory store
//!
//! - `MemberSet`: unordered set of unique strings
//! - `ScoredSet`: set ordered by score, then member
//! - `Value`: union of the types a key can hold

mod set;
mod sorted_set;
mod value;

pub use set::MemberSet;
pub use sorted_set::ScoredSet;
pub use value::Value;

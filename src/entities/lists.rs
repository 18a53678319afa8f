//! JSON-backed list columns.
//!
//! Service areas, supported waste types and voucher assignments are small lists
//! that are always read together with their owner, so they live in a JSON column
//! instead of a join table.

use sea_orm::FromJsonQueryResult;
use serde::{Deserialize, Serialize};

/// A list of free-text values stored as a JSON array
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct StringList(pub Vec<String>);

impl StringList {
    /// Case-insensitive membership test
    #[must_use]
    pub fn contains_ignore_case(&self, value: &str) -> bool {
        self.0.iter().any(|item| item.eq_ignore_ascii_case(value))
    }

    /// Returns true when the list has no entries
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<String>> for StringList {
    fn from(value: Vec<String>) -> Self {
        Self(value)
    }
}

/// A list of record ids stored as a JSON array
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct IdList(pub Vec<i64>);

impl IdList {
    /// Returns true when `id` is in the list
    #[must_use]
    pub fn contains(&self, id: i64) -> bool {
        self.0.contains(&id)
    }

    /// Returns true when the list has no entries
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<i64>> for IdList {
    fn from(value: Vec<i64>) -> Self {
        Self(value)
    }
}

//! Row representation
//!
//! A Row is one record of a table: a map of column name to cell text, plus the
//! row's position in the backing sheet. The position is derived from the last
//! read or write acknowledgement; it is not an identifier and is never
//! serialized with the fields. Re-resolve rows by predicate instead of holding
//! on to a row number across operations.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A map of column names to cell values
pub type Fields = HashMap<String, String>;

/// A record in a table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
    /// Cell values keyed by column name. A missing key means "absent",
    /// which is distinct from an empty string.
    #[serde(flatten)]
    pub fields: Fields,

    /// 1-based sheet position, set by the engine only
    #[serde(skip)]
    row_number: Option<u32>,
}

impl Row {
    /// Create an empty row with no position
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style field setter
    pub fn with(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(column.into(), value.into());
        self
    }

    /// Set a field value
    pub fn set(&mut self, column: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.fields.insert(column.into(), value.into());
        self
    }

    /// Get a field value
    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields.get(column).map(String::as_str)
    }

    /// Remove a field, making it absent
    pub fn remove(&mut self, column: &str) -> Option<String> {
        self.fields.remove(column)
    }

    /// The sheet position this row was read from or written to
    pub fn row_number(&self) -> Option<u32> {
        self.row_number
    }

    /// Merge `updates` over this row's fields
    pub fn merge(&mut self, updates: Fields) {
        self.fields.extend(updates);
    }

    pub(crate) fn at(mut self, row_number: u32) -> Self {
        self.row_number = Some(row_number);
        self
    }
}

impl From<Fields> for Row {
    fn from(fields: Fields) -> Self {
        Self {
            fields,
            row_number: None,
        }
    }
}

impl<K, V> FromIterator<(K, V)> for Row
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::from(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect::<Fields>(),
        )
    }
}

//! Row filters
//!
//! A small textual filter language for picking rows without writing a
//! closure, used by the CLI and by callers that receive conditions as data:
//!
//! | Syntax      | Matches rows where                         |
//! |-------------|--------------------------------------------|
//! | `col=val`   | the cell equals `val`                      |
//! | `col!=val`  | the cell differs from `val`                |
//! | `col~=val`  | the cell contains `val`, ignoring case     |
//! | `col?`      | the cell is non-empty                      |
//! | `col!`      | the cell is empty or absent                |
//!
//! An absent cell compares as the empty string. Several filters combine with
//! AND.

use crate::storage::row::Row;
use std::fmt;
use std::str::FromStr;

/// How a filter compares a cell
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    Equals(String),
    NotEquals(String),
    Contains(String),
    NonEmpty,
    Empty,
}

/// A condition on one column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub column: String,
    pub condition: Condition,
}

/// Why a filter string was rejected
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid filter '{input}': {reason}")]
pub struct FilterParseError {
    pub input: String,
    pub reason: &'static str,
}

impl Filter {
    pub fn new(column: impl Into<String>, condition: Condition) -> Self {
        Self {
            column: column.into(),
            condition,
        }
    }

    /// Shorthand for an equality filter
    pub fn equals(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(column, Condition::Equals(value.into()))
    }

    /// Evaluate against a row
    pub fn matches(&self, row: &Row) -> bool {
        let cell = row.get(&self.column).unwrap_or("");
        match &self.condition {
            Condition::Equals(value) => cell == value,
            Condition::NotEquals(value) => cell != value,
            Condition::Contains(value) => cell.to_lowercase().contains(&value.to_lowercase()),
            Condition::NonEmpty => !cell.is_empty(),
            Condition::Empty => cell.is_empty(),
        }
    }

    /// Turn into a predicate accepted by the database operations
    pub fn into_predicate(self) -> impl Fn(&Row) -> bool + Send + Sync + 'static {
        move |row: &Row| self.matches(row)
    }

    /// Predicate matching rows that satisfy every filter.
    ///
    /// No filters matches every row.
    pub fn all(filters: Vec<Filter>) -> impl Fn(&Row) -> bool + Send + Sync + 'static {
        move |row: &Row| filters.iter().all(|f| f.matches(row))
    }
}

impl FromStr for Filter {
    type Err = FilterParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let fail = |reason| FilterParseError {
            input: input.to_string(),
            reason,
        };

        let (column, condition) = match input.find('=') {
            Some(eq) => {
                let value = input[eq + 1..].to_string();
                let head = &input[..eq];
                if let Some(column) = head.strip_suffix('!') {
                    (column, Condition::NotEquals(value))
                } else if let Some(column) = head.strip_suffix('~') {
                    (column, Condition::Contains(value))
                } else {
                    (head, Condition::Equals(value))
                }
            }
            None => {
                if let Some(column) = input.strip_suffix('?') {
                    (column, Condition::NonEmpty)
                } else if let Some(column) = input.strip_suffix('!') {
                    (column, Condition::Empty)
                } else {
                    return Err(fail("expected col=value, col!=value, col~=value, col? or col!"));
                }
            }
        };

        let column = column.trim();
        if column.is_empty() {
            return Err(fail("missing column name"));
        }
        Ok(Filter::new(column, condition))
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.condition {
            Condition::Equals(v) => write!(f, "{}={}", self.column, v),
            Condition::NotEquals(v) => write!(f, "{}!={}", self.column, v),
            Condition::Contains(v) => write!(f, "{}~={}", self.column, v),
            Condition::NonEmpty => write!(f, "{}?", self.column),
            Condition::Empty => write!(f, "{}!", self.column),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> Row {
        Row::new()
            .with("id", "1")
            .with("email", "Ada@Example.com")
            .with("invited_by", "")
    }

    #[test]
    fn test_parse() {
        assert_eq!("id=1".parse::<Filter>().unwrap(), Filter::equals("id", "1"));
        assert_eq!(
            "id!=1".parse::<Filter>().unwrap().condition,
            Condition::NotEquals("1".into())
        );
        assert_eq!(
            " email ~=example".parse::<Filter>().unwrap(),
            Filter::new("email", Condition::Contains("example".into()))
        );
        assert_eq!("email?".parse::<Filter>().unwrap().condition, Condition::NonEmpty);
        assert_eq!("email!".parse::<Filter>().unwrap().condition, Condition::Empty);

        // Everything after the first '=' is the value
        assert_eq!(
            "note=a=b".parse::<Filter>().unwrap().condition,
            Condition::Equals("a=b".into())
        );
        assert_eq!("id=".parse::<Filter>().unwrap().condition, Condition::Equals(String::new()));
    }

    #[test]
    fn test_parse_errors() {
        assert!("id".parse::<Filter>().is_err());
        assert!("=1".parse::<Filter>().is_err());
        assert!("?".parse::<Filter>().is_err());

        let err = "nope".parse::<Filter>().unwrap_err();
        assert!(err.to_string().contains("'nope'"));
    }

    #[test]
    fn test_matches() {
        let row = user();
        assert!(Filter::equals("id", "1").matches(&row));
        assert!(!Filter::equals("id", "2").matches(&row));
        assert!("id!=2".parse::<Filter>().unwrap().matches(&row));
        assert!("email~=example".parse::<Filter>().unwrap().matches(&row));
        assert!("email?".parse::<Filter>().unwrap().matches(&row));
        assert!("invited_by!".parse::<Filter>().unwrap().matches(&row));
        // Absent compares as empty
        assert!("nickname!".parse::<Filter>().unwrap().matches(&row));
        assert!(Filter::equals("nickname", "").matches(&row));
    }

    #[test]
    fn test_all_combines_with_and() {
        let row = user();
        let both = Filter::all(vec![Filter::equals("id", "1"), "email?".parse().unwrap()]);
        assert!(both(&row));

        let one_fails = Filter::all(vec![Filter::equals("id", "1"), Filter::equals("email", "x")]);
        assert!(!one_fails(&row));

        assert!(Filter::all(Vec::new())(&row));
    }

    #[test]
    fn test_display_reparses() {
        for text in ["id=1", "id!=1", "email~=x", "email?", "email!"] {
            let filter: Filter = text.parse().unwrap();
            assert_eq!(filter.to_string(), text);
        }
    }
}

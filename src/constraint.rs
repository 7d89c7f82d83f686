//! Column constraints and their enforcement
//!
//! Constraints are declared per call, not stored with the table: the code
//! issuing an insert or update decides which columns must be present, unique,
//! and so on for that operation.
//!
//! ```
//! use sheetdb::{Constraint, Constraints};
//!
//! let constraints = Constraints::new()
//!     .required("id")
//!     .unique("email")
//!     .rule("code", Constraint::pattern("[A-Z0-9]{8}").unwrap());
//! assert_eq!(constraints.len(), 3);
//! ```
//!
//! Enforcement runs against the in-memory row set read inside the write
//! section, before anything is sent to the backend.

use crate::storage::row::Row;
use regex::Regex;
use std::collections::BTreeSet;

/// A rule on one column's value
#[derive(Debug, Clone)]
pub enum Constraint {
    /// Value must be present and not blank
    Required,
    /// No other row may hold the same non-empty value
    Unique,
    /// Value may be at most this many characters
    MaxLength(usize),
    /// Non-empty value must match the whole pattern
    Pattern(Regex),
}

impl Constraint {
    /// Compile a pattern rule; the pattern is anchored at both ends
    pub fn pattern(pattern: &str) -> Result<Self, regex::Error> {
        Regex::new(&format!("^(?:{})$", pattern)).map(Constraint::Pattern)
    }
}

/// The set of column rules for one operation
#[derive(Debug, Clone, Default)]
pub struct Constraints {
    rules: Vec<(String, Constraint)>,
}

impl Constraints {
    /// No constraints
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a rule for a column
    pub fn rule(mut self, column: impl Into<String>, constraint: Constraint) -> Self {
        self.rules.push((column.into(), constraint));
        self
    }

    pub fn required(self, column: impl Into<String>) -> Self {
        self.rule(column, Constraint::Required)
    }

    pub fn unique(self, column: impl Into<String>) -> Self {
        self.rule(column, Constraint::Unique)
    }

    pub fn max_length(self, column: impl Into<String>, max: usize) -> Self {
        self.rule(column, Constraint::MaxLength(max))
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Rules in declaration order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Constraint)> {
        self.rules.iter().map(|(c, r)| (c.as_str(), r))
    }
}

/// A constraint violation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("column '{column}' is required")]
    MissingRequired { column: String },

    #[error("column '{column}' must be unique: '{value}' is already used by row {row_number}")]
    UniqueViolation {
        column: String,
        value: String,
        row_number: u32,
    },

    #[error("column '{column}' value '{value}' is longer than {max} characters")]
    TooLong {
        column: String,
        value: String,
        max: usize,
    },

    #[error("column '{column}' value '{value}' does not match {pattern}")]
    PatternMismatch {
        column: String,
        value: String,
        pattern: String,
    },

    #[error("column '{column}' is not in the table header")]
    UnknownColumn { column: String },

    #[error("row has no non-empty values")]
    EmptyRow,
}

impl ValidationError {
    /// The column the violation is about, if any
    pub fn column(&self) -> Option<&str> {
        match self {
            ValidationError::MissingRequired { column }
            | ValidationError::UniqueViolation { column, .. }
            | ValidationError::TooLong { column, .. }
            | ValidationError::PatternMismatch { column, .. }
            | ValidationError::UnknownColumn { column } => Some(column),
            ValidationError::EmptyRow => None,
        }
    }
}

/// Check a candidate row against the rules and the table's other rows.
///
/// Rows sharing the candidate's row number are the candidate itself (an
/// update) and are skipped by uniqueness checks. Rules are evaluated in
/// declaration order; the first violation is returned.
pub fn enforce_constraints(
    existing: &[Row],
    candidate: &Row,
    constraints: &Constraints,
) -> Result<(), ValidationError> {
    for (column, constraint) in constraints.iter() {
        let value = candidate.get(column);
        match constraint {
            Constraint::Required => {
                if value.map_or(true, |v| v.trim().is_empty()) {
                    return Err(ValidationError::MissingRequired {
                        column: column.to_string(),
                    });
                }
            }
            Constraint::Unique => {
                let Some(value) = value.filter(|v| !v.is_empty()) else {
                    continue;
                };
                let conflict = existing.iter().find(|row| {
                    !is_same_row(row, candidate) && row.get(column) == Some(value)
                });
                if let Some(row) = conflict {
                    return Err(ValidationError::UniqueViolation {
                        column: column.to_string(),
                        value: value.to_string(),
                        row_number: row.row_number().unwrap_or_default(),
                    });
                }
            }
            Constraint::MaxLength(max) => {
                if let Some(v) = value.filter(|v| v.chars().count() > *max) {
                    return Err(ValidationError::TooLong {
                        column: column.to_string(),
                        value: v.to_string(),
                        max: *max,
                    });
                }
            }
            Constraint::Pattern(regex) => {
                if let Some(v) = value.filter(|v| !v.is_empty() && !regex.is_match(v)) {
                    return Err(ValidationError::PatternMismatch {
                        column: column.to_string(),
                        value: v.to_string(),
                        pattern: regex.as_str().to_string(),
                    });
                }
            }
        }
    }
    Ok(())
}

/// Reject fields that have no column in the header
pub fn check_columns(candidate: &Row, columns: &[String]) -> Result<(), ValidationError> {
    let known: BTreeSet<&str> = columns
        .iter()
        .map(String::as_str)
        .filter(|c| !c.is_empty())
        .collect();
    let unknown = candidate
        .fields
        .keys()
        .filter(|k| !known.contains(k.as_str()))
        .min();
    match unknown {
        Some(column) => Err(ValidationError::UnknownColumn {
            column: column.clone(),
        }),
        None => Ok(()),
    }
}

fn is_same_row(row: &Row, candidate: &Row) -> bool {
    candidate.row_number().is_some() && row.row_number() == candidate.row_number()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users() -> Vec<Row> {
        vec![
            Row::new().with("id", "1").with("email", "a@x.com").at(2),
            Row::new().with("id", "2").with("email", "b@x.com").at(3),
            Row::new().with("id", "3").with("email", "").at(4),
        ]
    }

    #[test]
    fn test_unique_violation_names_column_and_row() {
        let candidate = Row::new().with("id", "9").with("email", "b@x.com");
        let err = enforce_constraints(&users(), &candidate, &Constraints::new().unique("email"))
            .unwrap_err();
        assert_eq!(
            err,
            ValidationError::UniqueViolation {
                column: "email".into(),
                value: "b@x.com".into(),
                row_number: 3,
            }
        );
        assert_eq!(err.column(), Some("email"));
    }

    #[test]
    fn test_update_does_not_conflict_with_itself() {
        let candidate = Row::new().with("id", "1").with("email", "a@x.com").at(2);
        assert!(enforce_constraints(&users(), &candidate, &Constraints::new().unique("email")).is_ok());

        let moved = Row::new().with("id", "1").with("email", "b@x.com").at(2);
        assert!(enforce_constraints(&users(), &moved, &Constraints::new().unique("email")).is_err());
    }

    #[test]
    fn test_empty_values_skip_uniqueness() {
        let candidate = Row::new().with("id", "9").with("email", "");
        assert!(enforce_constraints(&users(), &candidate, &Constraints::new().unique("email")).is_ok());
    }

    #[test]
    fn test_required() {
        let constraints = Constraints::new().required("email");
        let missing = Row::new().with("id", "9");
        let blank = Row::new().with("id", "9").with("email", "  ");
        let present = Row::new().with("email", "c@x.com");

        assert!(matches!(
            enforce_constraints(&[], &missing, &constraints),
            Err(ValidationError::MissingRequired { .. })
        ));
        assert!(enforce_constraints(&[], &blank, &constraints).is_err());
        assert!(enforce_constraints(&[], &present, &constraints).is_ok());
    }

    #[test]
    fn test_max_length_and_pattern() {
        let constraints = Constraints::new()
            .max_length("name", 4)
            .rule("code", Constraint::pattern("[A-Z0-9]{4}").unwrap());

        let ok = Row::new().with("name", "Ada").with("code", "AB12");
        assert!(enforce_constraints(&[], &ok, &constraints).is_ok());

        let long = Row::new().with("name", "Grace");
        assert!(matches!(
            enforce_constraints(&[], &long, &constraints),
            Err(ValidationError::TooLong { max: 4, .. })
        ));

        // Anchored: a matching substring is not enough
        let partial = Row::new().with("code", "AB12-extra");
        assert!(matches!(
            enforce_constraints(&[], &partial, &constraints),
            Err(ValidationError::PatternMismatch { .. })
        ));
    }

    #[test]
    fn test_first_violation_in_declaration_order() {
        let constraints = Constraints::new().required("name").unique("email");
        let candidate = Row::new().with("email", "a@x.com");
        let err = enforce_constraints(&users(), &candidate, &constraints).unwrap_err();
        assert_eq!(err.column(), Some("name"));
    }

    #[test]
    fn test_check_columns() {
        let columns = vec!["id".to_string(), "email".to_string()];
        assert!(check_columns(&Row::new().with("id", "1"), &columns).is_ok());

        let err = check_columns(&Row::new().with("id", "1").with("zz", "x").with("nick", "y"), &columns)
            .unwrap_err();
        assert_eq!(err, ValidationError::UnknownColumn { column: "nick".into() });

        let unnamed = vec!["id".to_string(), String::new()];
        assert!(check_columns(&Row::new().with("", "x"), &unnamed).is_err());
    }
}

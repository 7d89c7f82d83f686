//! Reference types for A1 notation
//!
//! Indices are 1-based, matching what spreadsheet users see: column `A` is 1,
//! row `1` is the first row.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Highest column index addressable with three letters (`ZZZ`)
pub const MAX_COLUMN: u32 = 18_278;

/// Upper bound on row indices accepted by the parser
pub const MAX_ROW: u32 = 10_000_000;

/// One corner of an area. Either part may be missing: `A` is a whole column,
/// `5` a whole row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellRef {
    pub column: Option<u32>,
    pub row: Option<u32>,
}

impl CellRef {
    pub fn new(column: u32, row: u32) -> Self {
        Self {
            column: Some(column),
            row: Some(row),
        }
    }

    pub fn column(column: u32) -> Self {
        Self {
            column: Some(column),
            row: None,
        }
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(col) = self.column {
            f.write_str(&column_letters(col))?;
        }
        if let Some(row) = self.row {
            write!(f, "{}", row)?;
        }
        Ok(())
    }
}

/// A cell or a rectangular span of cells
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Area {
    pub start: CellRef,
    pub end: Option<CellRef>,
}

impl Area {
    pub fn cell(cell: CellRef) -> Self {
        Self {
            start: cell,
            end: None,
        }
    }

    pub fn span(start: CellRef, end: CellRef) -> Self {
        Self {
            start,
            end: Some(end),
        }
    }

    /// Inclusive row bounds, or `None` when the area is unbounded in rows
    /// (e.g. `A:C`) or only one corner carries a row.
    pub fn row_span(&self) -> Option<(u32, u32)> {
        let first = self.start.row?;
        match self.end {
            None => Some((first, first)),
            Some(end) => {
                let last = end.row?;
                Some((first.min(last), first.max(last)))
            }
        }
    }

    /// Inclusive column bounds, or `None` when unbounded in columns.
    pub fn column_span(&self) -> Option<(u32, u32)> {
        let first = self.start.column?;
        match self.end {
            None => Some((first, first)),
            Some(end) => {
                let last = end.column?;
                Some((first.min(last), first.max(last)))
            }
        }
    }
}

impl fmt::Display for Area {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.start)?;
        if let Some(end) = self.end {
            write!(f, ":{}", end)?;
        }
        Ok(())
    }
}

/// A full range reference: optional sheet qualifier plus optional area.
///
/// A reference with a sheet and no area addresses the whole sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeRef {
    pub sheet: Option<String>,
    pub area: Option<Area>,
}

impl RangeRef {
    /// Reference to every cell of a sheet
    pub fn whole_sheet(sheet: impl Into<String>) -> Self {
        Self {
            sheet: Some(sheet.into()),
            area: None,
        }
    }

    /// Reference to one row, columns `first_column..=last_column`
    pub fn row(sheet: impl Into<String>, row: u32, first_column: u32, last_column: u32) -> Self {
        Self {
            sheet: Some(sheet.into()),
            area: Some(Area::span(
                CellRef::new(first_column, row),
                CellRef::new(last_column, row),
            )),
        }
    }

    /// Reference to whole columns `first_column..=last_column`
    pub fn columns(sheet: impl Into<String>, first_column: u32, last_column: u32) -> Self {
        Self {
            sheet: Some(sheet.into()),
            area: Some(Area::span(
                CellRef::column(first_column),
                CellRef::column(last_column),
            )),
        }
    }

    /// The row index when the reference covers exactly one row
    pub fn single_row(&self) -> Option<u32> {
        match self.area?.row_span()? {
            (first, last) if first == last => Some(first),
            _ => None,
        }
    }
}

impl fmt::Display for RangeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.sheet, &self.area) {
            // A bare sheet name would read as a column reference, so quote it
            (Some(sheet), None) => f.write_str(&force_quote(sheet)),
            (Some(sheet), Some(area)) => write!(f, "{}!{}", quote_sheet_name(sheet), area),
            (None, Some(area)) => write!(f, "{}", area),
            (None, None) => Ok(()),
        }
    }
}

/// Convert a 1-based column index to letters (`1` -> `A`, `27` -> `AA`)
pub fn column_letters(index: u32) -> String {
    let mut n = index;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

/// Convert column letters to a 1-based index. Case-insensitive.
///
/// Returns `None` for empty input, non-letters, or indices past [`MAX_COLUMN`].
pub fn column_index(letters: &str) -> Option<u32> {
    if letters.is_empty() {
        return None;
    }
    let mut index: u32 = 0;
    for c in letters.chars() {
        if !c.is_ascii_alphabetic() {
            return None;
        }
        let digit = (c.to_ascii_uppercase() as u8 - b'A') as u32 + 1;
        index = index.checked_mul(26)?.checked_add(digit)?;
        if index > MAX_COLUMN {
            return None;
        }
    }
    Some(index)
}

/// Quote a sheet name for use in a range, if it needs quoting.
///
/// Names made of letters, digits and underscores that cannot be mistaken for
/// a cell reference are left bare, matching what the Sheets API echoes back.
pub fn quote_sheet_name(name: &str) -> String {
    if needs_quoting(name) {
        force_quote(name)
    } else {
        name.to_string()
    }
}

fn force_quote(name: &str) -> String {
    format!("'{}'", name.replace('\'', "''"))
}

fn needs_quoting(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return true;
    };
    if !(first.is_ascii_alphabetic() || first == '_') {
        return true;
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return true;
    }
    looks_like_cell(name)
}

/// `AB12`-shaped names collide with cell references
fn looks_like_cell(name: &str) -> bool {
    let split = name
        .find(|c: char| c.is_ascii_digit())
        .unwrap_or(name.len());
    let (letters, digits) = name.split_at(split);
    !digits.is_empty()
        && digits.chars().all(|c| c.is_ascii_digit())
        && column_index(letters).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_letters() {
        assert_eq!(column_letters(1), "A");
        assert_eq!(column_letters(26), "Z");
        assert_eq!(column_letters(27), "AA");
        assert_eq!(column_letters(702), "ZZ");
        assert_eq!(column_letters(703), "AAA");
    }

    #[test]
    fn test_column_index() {
        assert_eq!(column_index("A"), Some(1));
        assert_eq!(column_index("c"), Some(3));
        assert_eq!(column_index("AA"), Some(27));
        assert_eq!(column_index("ZZZ"), Some(MAX_COLUMN));
        assert_eq!(column_index("AAAA"), None);
        assert_eq!(column_index(""), None);
        assert_eq!(column_index("A1"), None);
    }

    #[test]
    fn test_quote_sheet_name() {
        assert_eq!(quote_sheet_name("users"), "users");
        assert_eq!(quote_sheet_name("My Sheet"), "'My Sheet'");
        assert_eq!(quote_sheet_name("Bob's"), "'Bob''s'");
        assert_eq!(quote_sheet_name("A1"), "'A1'");
        assert_eq!(quote_sheet_name("2024"), "'2024'");
    }

    #[test]
    fn test_display() {
        assert_eq!(RangeRef::row("users", 5, 1, 3).to_string(), "users!A5:C5");
        assert_eq!(RangeRef::whole_sheet("users").to_string(), "'users'");
        assert_eq!(RangeRef::columns("My Sheet", 1, 2).to_string(), "'My Sheet'!A:B");
    }

    #[test]
    fn test_single_row() {
        assert_eq!(RangeRef::row("users", 7, 1, 4).single_row(), Some(7));
        assert_eq!(RangeRef::columns("users", 1, 4).single_row(), None);
        assert_eq!(RangeRef::whole_sheet("users").single_row(), None);

        let multi = RangeRef {
            sheet: None,
            area: Some(Area::span(CellRef::new(1, 2), CellRef::new(3, 4))),
        };
        assert_eq!(multi.single_row(), None);
        assert_eq!(multi.area.and_then(|a| a.row_span()), Some((2, 4)));
    }
}

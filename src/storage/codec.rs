//! Row codec
//!
//! On the wire a row is a flat list of cells whose position says which column
//! it belongs to; in memory it is a [`Row`] keyed by column name. The column
//! list always comes from the table's header, read in the same operation.

use super::row::Row;
use crate::backend::{same_sheet, UpdatedData};
use crate::{Error, Result};
use a1ref::RangeRef;

/// Row number of the header
pub const HEADER_ROW: u32 = 1;

/// Row number of the first data row
pub const FIRST_DATA_ROW: u32 = 2;

/// A row as the backend acknowledged it after a write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdatedRow {
    pub values: Vec<String>,
    pub row_number: u32,
}

/// Project a row onto `columns`.
///
/// Absent fields and unnamed columns become `None`, which the backend treats
/// as "leave the cell as it is".
pub fn row_to_values(row: &Row, columns: &[String]) -> Vec<Option<String>> {
    columns
        .iter()
        .map(|column| {
            if column.is_empty() {
                None
            } else {
                row.get(column).map(str::to_string)
            }
        })
        .collect()
}

/// Zip column names with positional values into a row at `row_number`.
///
/// Columns past the end of `values` are absent, not empty.
pub fn values_to_row(values: &[String], columns: &[String], row_number: u32) -> Row {
    columns
        .iter()
        .zip(values)
        .filter(|(column, _)| !column.is_empty())
        .map(|(column, value)| (column.clone(), value.clone()))
        .collect::<Row>()
        .at(row_number)
}

/// Recover the written row's number and persisted cells from a write
/// acknowledgement.
///
/// The acknowledged range must name `sheet_name` (ignoring case) or no sheet,
/// start at column A and cover exactly one data row. Anything else is reported as a
/// malformed response rather than guessed at.
pub fn process_updated_data(
    updated: &UpdatedData,
    sheet_name: &str,
    sent_values: &[Option<String>],
) -> Result<UpdatedRow> {
    let reference = a1ref::parse(&updated.range)
        .map_err(|e| Error::malformed(format!("unparseable updated range: {}", e)))?;

    if let Some(sheet) = reference.sheet.as_deref() {
        if !same_sheet(sheet, sheet_name) {
            return Err(Error::malformed(format!(
                "updated range '{}' is on sheet '{}', expected '{}'",
                updated.range, sheet, sheet_name
            )));
        }
    }

    let area = reference.area.ok_or_else(|| {
        Error::malformed(format!("updated range '{}' does not address cells", updated.range))
    })?;

    if let Some(column) = area.start.column.filter(|c| *c != 1) {
        return Err(Error::malformed(format!(
            "updated range '{}' starts at column {}, expected A",
            updated.range,
            a1ref::column_letters(column)
        )));
    }

    let row_number = reference.single_row().ok_or_else(|| {
        Error::malformed(format!(
            "updated range '{}' does not address exactly one row",
            updated.range
        ))
    })?;

    if row_number < FIRST_DATA_ROW {
        return Err(Error::malformed(format!(
            "updated range '{}' points at the header row",
            updated.range
        )));
    }

    let values = match updated.values.as_deref() {
        None => persisted_from_sent(sent_values),
        Some([]) => Vec::new(),
        Some([row]) => row.clone(),
        Some(rows) => {
            return Err(Error::malformed(format!(
                "updated range '{}' returned {} rows of values",
                updated.range,
                rows.len()
            )))
        }
    };

    Ok(UpdatedRow { values, row_number })
}

/// What a row of sent cells reads back as: `None` cells empty, trailing
/// empties dropped
fn persisted_from_sent(sent: &[Option<String>]) -> Vec<String> {
    let mut values: Vec<String> = sent.iter().map(|v| v.clone().unwrap_or_default()).collect();
    while values.last().is_some_and(|v| v.is_empty()) {
        values.pop();
    }
    values
}

/// Range covering a whole table
pub(crate) fn table_range(table: &str) -> String {
    RangeRef::whole_sheet(table).to_string()
}

/// Range covering one row across `width` columns starting at A
pub(crate) fn row_range(table: &str, row_number: u32, width: usize) -> String {
    RangeRef::row(table, row_number, 1, width.max(1) as u32).to_string()
}

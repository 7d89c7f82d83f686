//! Spreadsheet backends
//!
//! The engine persists everything through the [`Backend`] trait, which mirrors
//! the handful of remote calls it needs: read a range, append a row, overwrite
//! a range, apply structural updates, and describe the spreadsheet's sheets.
//!
//! Ranges are A1 strings (see the `a1ref` crate). Cells travel as text; a
//! `None` cell in a write means "leave this cell as it is".
//!
//! Two implementations ship with the crate:
//!
//! - [`SheetsBackend`]: the Google Sheets v4 REST API
//! - [`MemoryBackend`]: an in-process spreadsheet with the same observable
//!   behavior, for tests and local development

mod memory;
mod sheets;

pub use memory::MemoryBackend;
pub use sheets::SheetsBackend;

use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// What the backend reports back after an append or update
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UpdatedData {
    /// A1 reference of the cells that were written, e.g. `users!A5:C5`
    pub range: String,
    /// The written cells as persisted. `None` when the backend omitted them,
    /// which the Sheets API does for rows with no non-empty cell.
    pub values: Option<Vec<Vec<String>>>,
}

/// Structural (non-value) changes to a spreadsheet
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StructuralRequest {
    /// Delete rows `start_index..end_index` (0-based, end exclusive)
    DeleteRows {
        sheet_id: i64,
        start_index: u32,
        end_index: u32,
    },
}

/// Properties of one sheet (tab)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetProperties {
    pub title: String,
    pub sheet_id: i64,
    pub row_count: u32,
    pub column_count: u32,
}

/// Spreadsheet-level metadata
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpreadsheetMetadata {
    pub sheets: Vec<SheetProperties>,
}

impl SpreadsheetMetadata {
    /// Look up a sheet by its title. An exact match wins over one that
    /// differs only in case.
    pub fn sheet(&self, title: &str) -> Option<&SheetProperties> {
        self.sheets
            .iter()
            .find(|s| s.title == title)
            .or_else(|| self.sheets.iter().find(|s| same_sheet(&s.title, title)))
    }
}

/// Sheet titles are resolved without regard to case in A1 ranges
pub fn same_sheet(a: &str, b: &str) -> bool {
    a == b || a.to_lowercase() == b.to_lowercase()
}

/// A remote tabular store addressed by A1 ranges within one spreadsheet
#[async_trait]
pub trait Backend: Send + Sync {
    /// Read the values in `range`. Trailing empty cells and rows are omitted.
    async fn get_values(&self, range: &str) -> Result<Vec<Vec<String>>>;

    /// Append one row after the last non-empty row of the table at `range`
    async fn append(&self, range: &str, values: Vec<Option<String>>) -> Result<UpdatedData>;

    /// Overwrite the cells starting at `range` with one row of values
    async fn update(&self, range: &str, values: Vec<Option<String>>) -> Result<UpdatedData>;

    /// Apply structural updates, in order
    async fn batch_update(&self, requests: Vec<StructuralRequest>) -> Result<()>;

    /// Describe the spreadsheet's sheets
    async fn spreadsheet_metadata(&self) -> Result<SpreadsheetMetadata>;
}

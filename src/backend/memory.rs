//! In-memory spreadsheet backend
//!
//! Behaves like the Sheets API as far as the engine can observe:
//!
//! - reads omit trailing empty cells and trailing empty rows
//! - appends land after the last non-empty row of the sheet
//! - write acknowledgements carry an A1 range and the persisted cells, and
//!   omit the cells entirely when the written row is blank
//! - deleting a row shifts every row below it up by one
//! - sheet titles in ranges match regardless of case
//!
//! Every call yields to the scheduler once before touching state, so
//! concurrent callers interleave the way they would against a remote service.

use super::{same_sheet, Backend, SheetProperties, SpreadsheetMetadata, StructuralRequest, UpdatedData};
use crate::{Error, Result};
use a1ref::{Area, RangeRef};
use async_trait::async_trait;
use std::sync::{Mutex, MutexGuard};

/// Default grid size reported for a sheet, as for a freshly created tab
const DEFAULT_GRID_ROWS: u32 = 1000;
const DEFAULT_GRID_COLUMNS: u32 = 26;

#[derive(Debug, Default)]
struct State {
    sheets: Vec<Sheet>,
    next_sheet_id: i64,
    offline: bool,
    writes: usize,
}

#[derive(Debug)]
struct Sheet {
    title: String,
    sheet_id: i64,
    rows: Vec<Vec<String>>,
}

impl Sheet {
    /// Number of rows up to and including the last non-empty one
    fn used_rows(&self) -> usize {
        self.rows
            .iter()
            .rposition(|row| row.iter().any(|c| !c.is_empty()))
            .map(|i| i + 1)
            .unwrap_or(0)
    }

    /// Write one row of cells at 1-based `row`/`column`; `None` keeps the cell
    fn write_row(&mut self, row: u32, column: u32, values: &[Option<String>]) {
        let r = row as usize - 1;
        if self.rows.len() <= r {
            self.rows.resize_with(r + 1, Vec::new);
        }
        let cells = &mut self.rows[r];
        let first = column as usize - 1;
        if cells.len() < first + values.len() {
            cells.resize(first + values.len(), String::new());
        }
        for (offset, value) in values.iter().enumerate() {
            if let Some(v) = value {
                cells[first + offset] = v.clone();
            }
        }
    }

    /// The persisted cells of a written row, as the API echoes them
    fn echo(&self, row: u32, column: u32, width: usize) -> Option<Vec<Vec<String>>> {
        let cells = self.rows.get(row as usize - 1)?;
        let first = column as usize - 1;
        let written: Vec<String> = (first..first + width)
            .map(|i| cells.get(i).cloned().unwrap_or_default())
            .collect();
        let trimmed = trim_trailing(written);
        if trimmed.is_empty() {
            None
        } else {
            Some(vec![trimmed])
        }
    }
}

/// A spreadsheet held in process memory
#[derive(Debug, Default)]
pub struct MemoryBackend {
    state: Mutex<State>,
}

impl MemoryBackend {
    /// Create an empty spreadsheet with no sheets
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style variant of [`MemoryBackend::add_sheet`]
    pub fn with_sheet(self, title: &str, header: &[&str]) -> Self {
        self.add_sheet(title, header);
        self
    }

    /// Add a sheet whose first row is `header`; returns its sheet id
    pub fn add_sheet(&self, title: &str, header: &[&str]) -> i64 {
        let mut state = self.lock();
        let sheet_id = state.next_sheet_id;
        state.next_sheet_id += 1;
        let rows = if header.is_empty() {
            Vec::new()
        } else {
            vec![header.iter().map(|h| h.to_string()).collect()]
        };
        state.sheets.push(Sheet {
            title: title.to_string(),
            sheet_id,
            rows,
        });
        sheet_id
    }

    /// Simulate an outage: every call fails with a backend error while set
    pub fn set_offline(&self, offline: bool) {
        self.lock().offline = offline;
    }

    /// Number of value or structural writes served so far
    pub fn writes(&self) -> usize {
        self.lock().writes
    }

    /// Raw cells of a sheet, header included
    pub fn snapshot(&self, title: &str) -> Option<Vec<Vec<String>>> {
        let state = self.lock();
        state
            .sheets
            .iter()
            .find(|s| s.title == title)
            .map(|s| s.rows.clone())
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // State is plain data; a panic elsewhere cannot leave it half-updated
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Common preamble of every call: yield, then check availability
    async fn enter(&self) -> Result<MutexGuard<'_, State>> {
        tokio::task::yield_now().await;
        let state = self.lock();
        if state.offline {
            return Err(Error::BackendUnavailable {
                message: "memory backend is offline".to_string(),
                status: None,
            });
        }
        Ok(state)
    }
}

fn bad_request(message: impl Into<String>) -> Error {
    Error::BackendUnavailable {
        message: message.into(),
        status: Some(400),
    }
}

fn parse(range: &str) -> Result<RangeRef> {
    a1ref::parse(range).map_err(|e| bad_request(format!("Unable to parse range: {}", e)))
}

fn find_sheet<'a>(state: &'a mut State, sheet: Option<&str>) -> Result<&'a mut Sheet> {
    let found = match sheet {
        Some(title) => {
            let index = state
                .sheets
                .iter()
                .position(|s| s.title == title)
                .or_else(|| state.sheets.iter().position(|s| same_sheet(&s.title, title)));
            index.and_then(|i| state.sheets.get_mut(i))
        }
        None => state.sheets.first_mut(),
    };
    found.ok_or_else(|| Error::TableNotFound {
        table: sheet.unwrap_or_default().to_string(),
    })
}

/// Inclusive 1-based (rows, columns) bounds addressed by an area
fn bounds(area: Option<Area>) -> ((u32, u32), (u32, u32)) {
    let Some(area) = area else {
        return ((1, u32::MAX), (1, u32::MAX));
    };
    let span = |start: Option<u32>, end: Option<Option<u32>>| match end {
        None => match start {
            Some(v) => (v, v),
            None => (1, u32::MAX),
        },
        Some(end) => (start.unwrap_or(1), end.unwrap_or(u32::MAX)),
    };
    let rows = span(area.start.row, area.end.map(|e| e.row));
    let columns = span(area.start.column, area.end.map(|e| e.column));
    (rows, columns)
}

fn trim_trailing(mut cells: Vec<String>) -> Vec<String> {
    while cells.last().is_some_and(|c| c.is_empty()) {
        cells.pop();
    }
    cells
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn get_values(&self, range: &str) -> Result<Vec<Vec<String>>> {
        let parsed = parse(range)?;
        let mut state = self.enter().await?;
        let sheet = find_sheet(&mut state, parsed.sheet.as_deref())?;
        let ((first_row, last_row), (first_col, last_col)) = bounds(parsed.area);

        let mut values: Vec<Vec<String>> = sheet
            .rows
            .iter()
            .enumerate()
            .map(|(i, row)| (i as u32 + 1, row))
            .filter(|(n, _)| *n >= first_row && *n <= last_row)
            .map(|(_, row)| {
                let cells = row
                    .iter()
                    .enumerate()
                    .map(|(i, c)| (i as u32 + 1, c))
                    .filter(|(n, _)| *n >= first_col && *n <= last_col)
                    .map(|(_, c)| c.clone())
                    .collect();
                trim_trailing(cells)
            })
            .collect();

        while values.last().is_some_and(|row| row.is_empty()) {
            values.pop();
        }
        Ok(values)
    }

    async fn append(&self, range: &str, values: Vec<Option<String>>) -> Result<UpdatedData> {
        let parsed = parse(range)?;
        let mut state = self.enter().await?;
        state.writes += 1;
        let sheet = find_sheet(&mut state, parsed.sheet.as_deref())?;

        let row = sheet.used_rows() as u32 + 1;
        let column = parsed.area.and_then(|a| a.start.column).unwrap_or(1);
        let appended: Vec<Option<String>> = values
            .into_iter()
            .map(|v| Some(v.unwrap_or_default()))
            .collect();
        sheet.write_row(row, column, &appended);

        let width = appended.len().max(1) as u32;
        Ok(UpdatedData {
            range: RangeRef::row(sheet.title.clone(), row, column, column + width - 1).to_string(),
            values: sheet.echo(row, column, appended.len()),
        })
    }

    async fn update(&self, range: &str, values: Vec<Option<String>>) -> Result<UpdatedData> {
        let parsed = parse(range)?;
        let start = parsed
            .area
            .map(|a| a.start)
            .ok_or_else(|| bad_request("update range needs a start cell"))?;
        let row = start
            .row
            .ok_or_else(|| bad_request("update range needs a start row"))?;
        let column = start.column.unwrap_or(1);

        let mut state = self.enter().await?;
        state.writes += 1;
        let sheet = find_sheet(&mut state, parsed.sheet.as_deref())?;
        sheet.write_row(row, column, &values);

        let width = values.len().max(1) as u32;
        Ok(UpdatedData {
            range: RangeRef::row(sheet.title.clone(), row, column, column + width - 1).to_string(),
            values: sheet.echo(row, column, values.len()),
        })
    }

    async fn batch_update(&self, requests: Vec<StructuralRequest>) -> Result<()> {
        let mut state = self.enter().await?;
        state.writes += 1;
        for request in requests {
            match request {
                StructuralRequest::DeleteRows {
                    sheet_id,
                    start_index,
                    end_index,
                } => {
                    if start_index >= end_index {
                        return Err(bad_request("deleteDimension range is empty"));
                    }
                    let sheet = state
                        .sheets
                        .iter_mut()
                        .find(|s| s.sheet_id == sheet_id)
                        .ok_or_else(|| bad_request(format!("No grid with id: {}", sheet_id)))?;
                    let len = sheet.rows.len();
                    let start = (start_index as usize).min(len);
                    let end = (end_index as usize).min(len);
                    sheet.rows.drain(start..end);
                }
            }
        }
        Ok(())
    }

    async fn spreadsheet_metadata(&self) -> Result<SpreadsheetMetadata> {
        let state = self.enter().await?;
        let sheets = state
            .sheets
            .iter()
            .map(|s| SheetProperties {
                title: s.title.clone(),
                sheet_id: s.sheet_id,
                row_count: (s.rows.len() as u32).max(DEFAULT_GRID_ROWS),
                column_count: (s.rows.iter().map(Vec::len).max().unwrap_or(0) as u32)
                    .max(DEFAULT_GRID_COLUMNS),
            })
            .collect();
        Ok(SpreadsheetMetadata { sheets })
    }
}

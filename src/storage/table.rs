//! Table - one sheet read as a header plus records
//!
//! Tables are analogous to tables in a relational database. Each table is a
//! sheet whose first row names the columns:
//!
//! ```text
//!      A      B          C
//!   1  id     email      invited_by     <- header (row 1)
//!   2  1      a@x.com                   <- first data row (row 2)
//!   3  2      b@x.com    1
//! ```
//!
//! A table is read whole on every operation and never cached. When a header
//! name repeats, only its first column belongs to the table.

use super::codec::{self, FIRST_DATA_ROW};
use super::row::Row;
use crate::backend::Backend;
use crate::validation::validate_table_name;
use crate::Result;
use std::collections::HashSet;
use tracing::{debug, warn};

/// A snapshot of one sheet
#[derive(Debug, Clone)]
pub struct Table {
    /// Sheet title
    pub name: String,
    /// Header cells in sheet order; empty names mark unnamed columns
    pub columns: Vec<String>,
    /// Data rows in sheet order, each tagged with its row number
    pub rows: Vec<Row>,
}

impl Table {
    /// Read a whole table from the backend
    pub async fn open<B: Backend + ?Sized>(backend: &B, name: &str) -> Result<Self> {
        validate_table_name(name)?;

        let mut values = backend.get_values(&codec::table_range(name)).await?.into_iter();
        let columns = header_columns(name, values.next().unwrap_or_default());
        let rows: Vec<Row> = values
            .enumerate()
            .map(|(i, cells)| codec::values_to_row(&cells, &columns, FIRST_DATA_ROW + i as u32))
            .collect();

        debug!(
            table = name,
            columns = columns.len(),
            rows = rows.len(),
            "opened table"
        );

        Ok(Self {
            name: name.to_string(),
            columns,
            rows,
        })
    }

    /// Number of data rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// First row matching the predicate
    pub fn find<P>(&self, predicate: P) -> Option<&Row>
    where
        P: Fn(&Row) -> bool,
    {
        self.rows.iter().find(|row| predicate(row))
    }

    /// First row matching the predicate, with its row number
    pub fn find_numbered<P>(&self, predicate: P) -> Option<(u32, &Row)>
    where
        P: Fn(&Row) -> bool,
    {
        self.rows
            .iter()
            .enumerate()
            .find(|(_, row)| predicate(row))
            .map(|(i, row)| (FIRST_DATA_ROW + i as u32, row))
    }

}

/// Trim header cells and blank out repeated names.
///
/// Only the first column with a given name is mapped; later ones are treated
/// as unnamed, so their cells are never read into a row or written back.
fn header_columns(table: &str, header: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    header
        .into_iter()
        .enumerate()
        .map(|(i, cell)| {
            let column = cell.trim().to_string();
            if column.is_empty() || seen.insert(column.clone()) {
                column
            } else {
                warn!(
                    table,
                    column = %column,
                    position = %a1ref::column_letters(i as u32 + 1),
                    "duplicate header name ignored"
                );
                String::new()
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use crate::Error;

    #[tokio::test]
    async fn test_open_reads_header_and_rows() {
        let backend = MemoryBackend::new().with_sheet("users", &["id", " email "]);
        backend
            .append("users!A1", vec![Some("1".into()), Some("a@x.com".into())])
            .await
            .unwrap();
        backend.append("users!A1", vec![Some("2".into())]).await.unwrap();

        let table = Table::open(&backend, "users").await.unwrap();
        assert_eq!(table.columns, vec!["id", "email"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows[0].row_number(), Some(2));
        assert_eq!(table.rows[0].get("email"), Some("a@x.com"));
        assert_eq!(table.rows[1].row_number(), Some(3));
        assert_eq!(table.rows[1].get("email"), None);

        let found = table.find(|r| r.get("id") == Some("2")).unwrap();
        assert_eq!(found.row_number(), Some(3));

        let (number, row) = table.find_numbered(|r| r.get("id") == Some("2")).unwrap();
        assert_eq!(number, 3);
        assert_eq!(row.get("id"), Some("2"));
        assert!(table.find_numbered(|r| r.get("id") == Some("9")).is_none());
    }

    #[tokio::test]
    async fn test_duplicate_header_names_keep_first_column() {
        let backend = MemoryBackend::new().with_sheet("notes", &["id", "note", " note"]);
        backend
            .append("notes!A1", vec![Some("1".into()), Some("a".into()), Some("b".into())])
            .await
            .unwrap();

        let table = Table::open(&backend, "notes").await.unwrap();
        assert_eq!(table.columns, vec!["id", "note", ""]);
        assert_eq!(table.rows[0].get("note"), Some("a"));
        assert_eq!(table.rows[0].fields.len(), 2);
    }

    #[tokio::test]
    async fn test_open_empty_sheet() {
        let backend = MemoryBackend::new().with_sheet("blank", &[]);
        let table = Table::open(&backend, "blank").await.unwrap();
        assert!(table.columns.is_empty());
        assert!(table.is_empty());
    }

    #[tokio::test]
    async fn test_open_rejects_bad_names() {
        let backend = MemoryBackend::new();
        assert!(matches!(
            Table::open(&backend, "a/b").await,
            Err(Error::InvalidTableName { .. })
        ));
        assert!(matches!(
            Table::open(&backend, "missing").await,
            Err(Error::TableNotFound { .. })
        ));
    }
}

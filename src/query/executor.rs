//! Operation execution
//!
//! Each function reads the target table fresh from the backend. The mutating
//! ones are the bodies of write sections: the caller must hold the write gate
//! while they run (see [`crate::storage::coordinator`]).

use crate::backend::{Backend, StructuralRequest};
use crate::constraint::{check_columns, enforce_constraints, Constraints, ValidationError};
use crate::storage::codec::{self, HEADER_ROW};
use crate::storage::row::{Fields, Row};
use crate::storage::table::Table;
use crate::{Error, Result};
use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use tracing::info;

pub async fn count_rows<B: Backend + ?Sized>(backend: &B, table: &str) -> Result<usize> {
    Ok(Table::open(backend, table).await?.len())
}

pub async fn find_rows<B, P>(backend: &B, table: &str, predicate: P) -> Result<Vec<Row>>
where
    B: Backend + ?Sized,
    P: Fn(&Row) -> bool,
{
    let table = Table::open(backend, table).await?;
    Ok(table.rows.into_iter().filter(|row| predicate(row)).collect())
}

pub async fn find_row<B, P>(backend: &B, table: &str, predicate: P) -> Result<Option<Row>>
where
    B: Backend + ?Sized,
    P: Fn(&Row) -> bool,
{
    let table = Table::open(backend, table).await?;
    Ok(table.rows.into_iter().find(|row| predicate(row)))
}

/// Look up rows for a batch of keys in one read.
///
/// Duplicate keys collapse, the first row carrying a key wins, and keys no
/// row carries are left out of the map.
pub async fn find_key_rows<B, K, F, I>(
    backend: &B,
    table: &str,
    key_selector: F,
    keys: I,
) -> Result<HashMap<K, Row>>
where
    B: Backend + ?Sized,
    K: Eq + Hash,
    F: Fn(&Row) -> K,
    I: IntoIterator<Item = K>,
{
    let wanted: HashSet<K> = keys.into_iter().collect();
    let mut found = HashMap::with_capacity(wanted.len());
    if wanted.is_empty() {
        return Ok(found);
    }

    let table = Table::open(backend, table).await?;
    for row in table.rows {
        let key = key_selector(&row);
        if wanted.contains(&key) && !found.contains_key(&key) {
            found.insert(key, row);
            if found.len() == wanted.len() {
                break;
            }
        }
    }
    Ok(found)
}

pub(crate) async fn insert_row<B: Backend + ?Sized>(
    backend: &B,
    table: &str,
    row: Row,
    constraints: &Constraints,
) -> Result<Row> {
    let current = Table::open(backend, table).await?;

    // Drop any row number the caller carried over from a read
    let candidate = Row::from(row.fields);
    check_columns(&candidate, &current.columns).map_err(|e| Error::validation(table, e))?;
    if candidate.fields.values().all(|v| v.is_empty()) {
        return Err(Error::validation(table, ValidationError::EmptyRow));
    }
    enforce_constraints(&current.rows, &candidate, constraints)
        .map_err(|e| Error::validation(table, e))?;

    let values = codec::row_to_values(&candidate, &current.columns);
    let range = codec::row_range(table, HEADER_ROW, current.columns.len());
    let updated = backend.append(&range, values.clone()).await?;
    let written = codec::process_updated_data(&updated, table, &values)?;

    info!(table, row_number = written.row_number, "inserted row");
    Ok(codec::values_to_row(&written.values, &current.columns, written.row_number))
}

pub(crate) async fn update_row<B, P>(
    backend: &B,
    table: &str,
    predicate: P,
    updates: Fields,
    constraints: &Constraints,
) -> Result<Row>
where
    B: Backend + ?Sized,
    P: Fn(&Row) -> bool,
{
    let current = Table::open(backend, table).await?;
    let (row_number, existing) = current
        .find_numbered(&predicate)
        .ok_or_else(|| Error::RowNotFound {
            table: table.to_string(),
        })?;

    let mut candidate = existing.clone();
    candidate.merge(updates);
    check_columns(&candidate, &current.columns).map_err(|e| Error::validation(table, e))?;
    enforce_constraints(&current.rows, &candidate, constraints)
        .map_err(|e| Error::validation(table, e))?;

    let values = codec::row_to_values(&candidate, &current.columns);
    let range = codec::row_range(table, row_number, current.columns.len());
    let updated = backend.update(&range, values.clone()).await?;
    let written = codec::process_updated_data(&updated, table, &values)?;
    if written.row_number != row_number {
        return Err(Error::malformed(format!(
            "update of row {} was acknowledged for row {}",
            row_number, written.row_number
        )));
    }

    info!(table, row_number, "updated row");
    Ok(codec::values_to_row(&written.values, &current.columns, row_number))
}

/// Delete the first matching row; returns it as it was before deletion
pub(crate) async fn delete_row<B, P>(backend: &B, table: &str, predicate: P) -> Result<Row>
where
    B: Backend + ?Sized,
    P: Fn(&Row) -> bool,
{
    let current = Table::open(backend, table).await?;
    let (row_number, existing) = current
        .find_numbered(&predicate)
        .ok_or_else(|| Error::RowNotFound {
            table: table.to_string(),
        })?;

    let metadata = backend.spreadsheet_metadata().await?;
    let sheet = metadata.sheet(table).ok_or_else(|| Error::TableNotFound {
        table: table.to_string(),
    })?;

    backend
        .batch_update(vec![StructuralRequest::DeleteRows {
            sheet_id: sheet.sheet_id,
            start_index: row_number - 1,
            end_index: row_number,
        }])
        .await?;

    info!(table, row_number, "deleted row");
    Ok(existing.clone())
}

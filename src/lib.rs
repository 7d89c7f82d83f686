//! SheetDB - spreadsheet-backed table storage
//!
//! Treats each sheet of one spreadsheet as a table: the first row names the
//! columns and every row below it is a record. Reads fetch the table fresh;
//! writes are checked against caller-declared constraints and serialized
//! through one process-wide gate, since the backend has no transactions.
//!
//! # Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        SheetDB Database                         │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────────────────────────────────────────────────┐│
//! │  │                       CRUD Facade                           ││
//! │  │  (count, find, find by keys, insert, update, delete)        ││
//! │  └───────────┬──────────────────────────────────┬──────────────┘│
//! │              │ reads                            │ writes        │
//! │              │                                  ▼               │
//! │              │                  ┌──────────────────────────────┐│
//! │              │                  │  Write Coordinator (gate)    ││
//! │              │                  └──────────────┬───────────────┘│
//! │              ▼                                 ▼                │
//! │  ┌─────────────────────────────────────────────────────────────┐│
//! │  │                     Storage Layer                           ││
//! │  │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────────┐  ││
//! │  │  │   Table     │  │   Row       │  │   Constraint        │  ││
//! │  │  │   Reader    │  │   Codec     │  │   Enforcer          │  ││
//! │  │  └──────┬──────┘  └──────┬──────┘  └─────────────────────┘  ││
//! │  └─────────┼────────────────┼──────────────────────────────────┘│
//! │            ▼                ▼                                   │
//! │  ┌─────────────────────────────────────────────────────────────┐│
//! │  │                    Backend trait                            ││
//! │  │  (Sheets REST API, or in-memory for tests)                  ││
//! │  └─────────────────────────────────────────────────────────────┘│
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use sheetdb::{Constraints, Database, MemoryBackend, Row};
//!
//! # async fn demo() -> sheetdb::Result<()> {
//! let db = Database::new(MemoryBackend::new().with_sheet("users", &["id", "email"]));
//! let row = db
//!     .insert_row(
//!         "users",
//!         Row::new().with("id", "1").with("email", "a@x.com"),
//!         Constraints::new().unique("email"),
//!     )
//!     .await?;
//! assert_eq!(row.row_number(), Some(2));
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod config;
pub mod constraint;
pub mod error;
pub mod query;
pub mod storage;
pub mod validation;

pub use error::{Error, Result};

pub use backend::{Backend, MemoryBackend, SheetProperties, SheetsBackend};
pub use config::Config;
pub use constraint::{Constraint, Constraints, ValidationError};
pub use query::filter::Filter;
pub use storage::coordinator::WriteCoordinator;
pub use storage::row::{Fields, Row};
pub use storage::table::Table;

use query::executor;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

/// The main database handle
///
/// Cheap to clone; clones share the backend. Every handle in the process
/// shares the same write gate.
pub struct Database<B: Backend + ?Sized> {
    backend: Arc<B>,
    coordinator: WriteCoordinator,
}

impl<B: Backend + ?Sized> Clone for Database<B> {
    fn clone(&self) -> Self {
        Self {
            backend: self.backend.clone(),
            coordinator: self.coordinator.clone(),
        }
    }
}

impl Database<SheetsBackend> {
    /// Connect to the spreadsheet named in `config`
    pub fn connect(config: &Config) -> Result<Self> {
        Ok(Self::new(SheetsBackend::new(config)?))
    }
}

impl<B: Backend + 'static> Database<B> {
    pub fn new(backend: B) -> Self {
        Self::from_arc(Arc::new(backend))
    }
}

impl<B: Backend + ?Sized + 'static> Database<B> {
    /// Wrap an already shared backend
    pub fn from_arc(backend: Arc<B>) -> Self {
        Self {
            backend,
            coordinator: WriteCoordinator::global(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Read a table whole, header included
    pub async fn open_table(&self, table: &str) -> Result<Table> {
        Table::open(&*self.backend, table).await
    }

    /// Properties of every sheet in the spreadsheet
    pub async fn list_tables(&self) -> Result<Vec<SheetProperties>> {
        Ok(self.backend.spreadsheet_metadata().await?.sheets)
    }

    /// Number of data rows; the header is not counted
    pub async fn count_rows(&self, table: &str) -> Result<usize> {
        executor::count_rows(&*self.backend, table).await
    }

    /// Every row matching `predicate`, in sheet order
    pub async fn find_rows<P>(&self, table: &str, predicate: P) -> Result<Vec<Row>>
    where
        P: Fn(&Row) -> bool,
    {
        executor::find_rows(&*self.backend, table, predicate).await
    }

    /// The first row matching `predicate`
    pub async fn find_row<P>(&self, table: &str, predicate: P) -> Result<Option<Row>>
    where
        P: Fn(&Row) -> bool,
    {
        executor::find_row(&*self.backend, table, predicate).await
    }

    /// Rows for a batch of keys, read in one pass.
    ///
    /// Keys no row carries are absent from the result. When several rows
    /// carry the same key, the first one wins.
    pub async fn find_key_rows<K, F, I>(
        &self,
        table: &str,
        key_selector: F,
        keys: I,
    ) -> Result<HashMap<K, Row>>
    where
        K: Eq + Hash,
        F: Fn(&Row) -> K,
        I: IntoIterator<Item = K>,
    {
        executor::find_key_rows(&*self.backend, table, key_selector, keys).await
    }

    /// Append a row after checking `constraints` against the current rows.
    ///
    /// Returns the row as the backend stored it, with its row number.
    pub async fn insert_row(&self, table: &str, row: Row, constraints: Constraints) -> Result<Row> {
        let backend = self.backend.clone();
        let name = table.to_string();
        self.coordinator
            .run("insert", table, async move {
                executor::insert_row(&*backend, &name, row, &constraints).await
            })
            .await
    }

    /// Merge `updates` into the first row matching `predicate` and write it
    /// back in place.
    ///
    /// Fails with [`Error::RowNotFound`] when nothing matches. Uniqueness is
    /// checked against every row except the one being updated.
    pub async fn update_row<P>(
        &self,
        table: &str,
        predicate: P,
        updates: Fields,
        constraints: Constraints,
    ) -> Result<Row>
    where
        P: Fn(&Row) -> bool + Send + 'static,
    {
        let backend = self.backend.clone();
        let name = table.to_string();
        self.coordinator
            .run("update", table, async move {
                executor::update_row(&*backend, &name, predicate, updates, &constraints).await
            })
            .await
    }

    /// Delete the first row matching `predicate`; rows below it move up.
    ///
    /// Returns the deleted row as it was.
    pub async fn delete_row<P>(&self, table: &str, predicate: P) -> Result<Row>
    where
        P: Fn(&Row) -> bool + Send + 'static,
    {
        let backend = self.backend.clone();
        let name = table.to_string();
        self.coordinator
            .run("delete", table, async move {
                executor::delete_row(&*backend, &name, predicate).await
            })
            .await
    }
}

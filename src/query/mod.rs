//! Query layer for SheetDB
//!
//! Row lookups, the write operations run inside the gate, and textual
//! filters.

pub(crate) mod executor;
pub mod filter;

pub use filter::{Condition, Filter, FilterParseError};

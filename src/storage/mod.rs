//! Storage layer for SheetDB
//!
//! Maps sheets onto tables of rows and serializes every write.

pub mod codec;
pub mod coordinator;
pub mod row;
pub mod table;

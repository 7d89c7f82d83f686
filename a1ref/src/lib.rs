//! a1ref - A1 range references
//!
//! Parses and formats the range notation used by spreadsheet APIs to address
//! cells, e.g. in the write acknowledgements the Sheets API returns.
//!
//! # Syntax Overview
//!
//! ```text
//! Sheet1!A5:C5          one row of three cells on Sheet1
//! 'Invite Codes'!B2     quoted sheet name (spaces, punctuation)
//! 'Bob''s'!A1           a quote inside a quoted name is doubled
//! users!$A$1:$C$1       absolute markers are accepted and ignored
//! users!A:C             whole columns
//! 'users'               the whole sheet
//! ```
//!
//! Indices are 1-based. Parsing is strict: anything that does not match the
//! grammar, including trailing content such as a second sheet qualifier, is
//! an error rather than a best-effort guess.

mod error;
mod parser;
mod reference;

pub use error::ParseError;
pub use reference::*;

/// Parse an A1 reference string
pub fn parse(input: &str) -> Result<RangeRef, ParseError> {
    parser::parse_range(input)
}

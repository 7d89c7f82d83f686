//! A1 reference parser using nom
//!
//! Grammar:
//!
//! ```text
//! range   := sheet '!' area | quoted          (whole sheet)  | area
//! sheet   := quoted | [A-Za-z0-9_.]+
//! quoted  := '\'' ( "''" | [^'] )+ '\''
//! area    := cell ( ':' cell )?
//! cell    := '$'? letters? '$'? digits?       (at least one part)
//! ```

use nom::{
    IResult,
    branch::alt,
    bytes::complete::{tag, take_while1},
    character::complete::{alpha1, char, digit1, none_of},
    combinator::{map, map_opt, opt},
    error::{Error as NomError, ErrorKind},
    multi::many1,
    sequence::{delimited, preceded, tuple},
};

use crate::error::ParseError;
use crate::reference::{column_index, Area, CellRef, RangeRef, MAX_ROW};

/// Parse a complete range reference, rejecting trailing content
pub fn parse_range(input: &str) -> Result<RangeRef, ParseError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ParseError::new("empty reference", input));
    }

    match range(trimmed) {
        Ok(("", parsed)) => Ok(parsed),
        Ok((rest, _)) => Err(ParseError::new(
            format!("unexpected trailing content '{}'", rest),
            input,
        )
        .with_position(trimmed.len() - rest.len())),
        Err(_) => Err(ParseError::new("does not match A1 notation", input)),
    }
}

// ============================================================================
// Range
// ============================================================================

fn range(input: &str) -> IResult<&str, RangeRef> {
    alt((
        map(tuple((sheet_name, char('!'), area)), |(sheet, _, area)| RangeRef {
            sheet: Some(sheet),
            area: Some(area),
        }),
        map(quoted_sheet, RangeRef::whole_sheet),
        map(area, |area| RangeRef {
            sheet: None,
            area: Some(area),
        }),
    ))(input)
}

// ============================================================================
// Sheet names
// ============================================================================

fn sheet_name(input: &str) -> IResult<&str, String> {
    alt((
        quoted_sheet,
        map(
            take_while1(|c: char| c.is_alphanumeric() || c == '_' || c == '.'),
            |s: &str| s.to_string(),
        ),
    ))(input)
}

fn quoted_sheet(input: &str) -> IResult<&str, String> {
    delimited(
        char('\''),
        map(
            many1(alt((map(tag("''"), |_| '\''), none_of("'")))),
            |chars| chars.into_iter().collect(),
        ),
        char('\''),
    )(input)
}

// ============================================================================
// Areas and cells
// ============================================================================

fn area(input: &str) -> IResult<&str, Area> {
    let (input, start) = cell(input)?;
    let (input, end) = opt(preceded(char(':'), cell))(input)?;
    Ok((input, Area { start, end }))
}

fn cell(input: &str) -> IResult<&str, CellRef> {
    let (input, column) = opt(preceded(opt(char('$')), map_opt(alpha1, column_index)))(input)?;
    let (input, row) = opt(preceded(opt(char('$')), map_opt(digit1, row_index)))(input)?;

    if column.is_none() && row.is_none() {
        return Err(nom::Err::Error(NomError::new(input, ErrorKind::Verify)));
    }

    Ok((input, CellRef { column, row }))
}

fn row_index(digits: &str) -> Option<u32> {
    digits
        .parse::<u32>()
        .ok()
        .filter(|row| (1..=MAX_ROW).contains(row))
}

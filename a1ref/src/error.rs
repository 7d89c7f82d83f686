//! Error types for A1 reference parsing

use std::fmt;

/// Error that occurred while parsing an A1 reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub message: String,
    pub input: String,
    pub position: Option<usize>,
}

impl ParseError {
    pub fn new(message: impl Into<String>, input: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            input: input.into(),
            position: None,
        }
    }

    pub fn with_position(mut self, pos: usize) -> Self {
        self.position = Some(pos);
        self
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid A1 reference '{}': {}", self.input, self.message)?;
        if let Some(pos) = self.position {
            write!(f, " at position {}", pos)?;
        }
        Ok(())
    }
}

impl std::error::Error for ParseError {}

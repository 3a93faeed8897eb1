//! Error types for HAML parsing.

use thiserror::Error;

/// Errors raised while parsing a HAML template.
#[derive(Debug, Error)]
pub enum HamlError {
    /// Indentation that is not a whole number of two-space steps, uses tabs,
    /// or jumps more than one level past its parent.
    #[error("Inconsistent indentation on line {line}: {message}")]
    Indentation { message: String, line: usize },

    /// Content nested under a node that cannot take children.
    #[error("Illegal nesting on line {line}: {message}")]
    IllegalNesting { message: String, line: usize },

    /// An attribute hash, paren group or object reference that never closes.
    #[error("Unbalanced brackets in attributes starting on line {line}")]
    UnclosedAttributes { line: usize },

    /// Any other malformed line.
    #[error("Syntax error on line {line}: {message}")]
    Syntax { message: String, line: usize },
}

impl HamlError {
    /// The 1-based source line the error points at.
    pub fn line(&self) -> usize {
        match self {
            HamlError::Indentation { line, .. }
            | HamlError::IllegalNesting { line, .. }
            | HamlError::UnclosedAttributes { line }
            | HamlError::Syntax { line, .. } => *line,
        }
    }
}

pub type ParseResult<T> = Result<T, HamlError>;

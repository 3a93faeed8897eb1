//! Error types for HAML to ERB conversion.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConvertError {
    /// The template could not be parsed.
    #[error(transparent)]
    Haml(#[from] haml2erb_parser::HamlError),

    /// An `#{...}` interpolation ran past the end of its text.
    #[error("Unclosed interpolation: reached end of input inside #{{...}}")]
    UnclosedInterpolation,
}

impl ConvertError {
    /// The source line the error points at, when known.
    pub fn line(&self) -> Option<usize> {
        match self {
            ConvertError::Haml(err) => Some(err.line()),
            ConvertError::UnclosedInterpolation => None,
        }
    }
}

pub type ConvertResult<T> = Result<T, ConvertError>;

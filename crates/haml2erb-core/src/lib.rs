/*
 * lib.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! HAML to ERB conversion.
//!
//! The pipeline parses a HAML template into a typed tree
//! (`haml2erb-parser`), walks it with the [`emitter`], and builds attribute
//! strings with the [`attributes`] module, which classifies every attribute
//! value as static HTML or embedded code. `#{…}` interpolations are
//! rewritten by the [`interpolation`] scanner.
//!
//! ```
//! let erb = haml2erb_core::convert("%p= user.name").unwrap();
//! assert_eq!(erb, "<p><%= user.name %></p>\n");
//! ```
//!
//! The [`convert_file`] and [`convert_directory`] drivers wrap the pipeline
//! for batch migration: per-file results instead of errors, atomic output
//! writes, optional validation and dry runs.

pub mod attributes;
pub mod convert;
pub mod diagnostics;
pub mod emitter;
pub mod error;
pub mod html;
pub mod interpolation;
pub mod literal;
mod scan;
pub mod validate;

pub use convert::{
    convert, convert_and_validate, convert_directory, convert_file, convert_with_diagnostics,
    find_templates, ConvertOptions, FileConversion, FileError,
};
pub use diagnostics::{Diagnostic, Diagnostics};
pub use error::{ConvertError, ConvertResult};
pub use validate::{validate, ValidationError, ValidationReport};

pub use haml2erb_parser::{parse, HamlError};

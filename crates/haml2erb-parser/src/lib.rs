/*
 * lib.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! HAML parsing for the haml2erb converter.
//!
//! This crate turns HAML source text into the typed AST consumed by
//! `haml2erb-core`. It covers the template constructs the converter
//! understands: tags with shorthand and attribute groups, output and silent
//! scripts, filters, doctypes, comments and plain text.
//!
//! ```
//! let doc = haml2erb_parser::parse("%p hello").unwrap();
//! assert_eq!(doc.children.len(), 1);
//! ```

pub mod ast;
mod error;
mod parser;

pub use error::{HamlError, ParseResult};
pub use parser::parse;

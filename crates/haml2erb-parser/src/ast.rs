/*
 * ast.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Abstract syntax tree for HAML templates.
//!
//! The parser produces a [`Document`] whose nodes form an exhaustive enum;
//! the converter dispatches on node kind with no fallback arm. Each payload
//! struct records the 1-based source line it started on so downstream
//! diagnostics can point back into the template.

use hashlink::LinkedHashMap;

/// A parsed HAML template.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub children: Vec<Node>,
}

/// A node in the template tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// An element line (`%p`, `.box`, `#main`).
    Tag(Tag),

    /// An output script line (`= expr`).
    Script(Script),

    /// A silent script line (`- expr`).
    SilentScript(SilentScript),

    /// A filter block (`:javascript`, `:css`, ...).
    Filter(Filter),

    /// A doctype line (`!!!`).
    Doctype(Doctype),

    /// An HTML comment line (`/ text`).
    Comment(Comment),

    /// Plain text content (may contain `#{}` interpolation).
    Plain(Plain),

    /// A HAML-only comment (`-#`); produces no output.
    HamlComment,
}

/// An element with its attribute sources and children.
///
/// `attributes` carries the statically-resolved pairs the parser folded in
/// from the `.class`/`#id` shorthand run, in source order. The raw curly and
/// paren attribute hashes are kept verbatim in `dynamic_attributes` for the
/// attribute builder to classify.
#[derive(Debug, Clone, PartialEq)]
pub struct Tag {
    pub name: String,
    pub attributes: LinkedHashMap<String, String>,
    pub dynamic_attributes: DynamicAttributes,
    /// Raw text between `[` and `]`, e.g. `@item, :row`.
    pub object_ref: Option<String>,
    /// Inline content following the tag head.
    pub value: Option<String>,
    /// When true, `value` is an expression; when false, plain text.
    pub parse: bool,
    pub self_closing: bool,
    pub line: usize,
    pub children: Vec<Node>,
}

/// The two raw attribute hash fragments a tag may carry.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DynamicAttributes {
    /// Curly form: `%div{ key: value }`.
    pub old: Option<String>,
    /// Paren form: `%div(key: value)`.
    pub new: Option<String>,
}

impl DynamicAttributes {
    pub fn is_empty(&self) -> bool {
        self.old.is_none() && self.new.is_none()
    }
}

/// An output script node. With children it opens an embedded-code block.
#[derive(Debug, Clone, PartialEq)]
pub struct Script {
    pub text: String,
    pub line: usize,
    pub children: Vec<Node>,
}

/// A silent script node.
#[derive(Debug, Clone, PartialEq)]
pub struct SilentScript {
    pub text: String,
    /// First word of `text` when it is a control-flow keyword.
    pub keyword: Option<String>,
    pub line: usize,
    pub children: Vec<Node>,
}

impl SilentScript {
    /// True for keywords that continue an open block at the opener's depth.
    pub fn is_continuation(&self) -> bool {
        matches!(
            self.keyword.as_deref(),
            Some("else" | "elsif" | "when" | "rescue" | "ensure")
        )
    }
}

/// A filter block with its raw, dedented body.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub name: String,
    pub text: String,
    pub line: usize,
}

/// A doctype declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct Doctype {
    pub kind: DoctypeKind,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DoctypeKind {
    /// `!!! XML`, with an optional encoding word.
    Xml { encoding: Option<String> },
    /// Every other form (`!!!`, `!!! 5`, `!!! Strict`, ...).
    Html,
}

/// An HTML comment. A bare `/` line may wrap nested children instead of text.
#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
    pub text: String,
    pub line: usize,
    pub children: Vec<Node>,
}

/// A plain text line.
#[derive(Debug, Clone, PartialEq)]
pub struct Plain {
    pub text: String,
    pub line: usize,
}

/*
 * diagnostics.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Conversion warnings as a return channel.
//!
//! The emitter and attribute builder never abort on a recoverable oddity
//! (void elements with content, double-splat attributes, unknown filters);
//! they record a [`Diagnostic`] and fall back. Callers decide where the
//! records go: the file driver attaches them to per-file results and the
//! plain `convert` façade forwards them to the ambient `tracing` sink.

use serde::Serialize;

/// A single conversion warning.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub message: String,
    /// 1-based template source line, when the node carries one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
}

/// Collector threaded through a single conversion.
#[derive(Debug, Default)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.items.push(Diagnostic {
            message: message.into(),
            line: None,
        });
    }

    pub fn warn_at(&mut self, message: impl Into<String>, line: usize) {
        self.items.push(Diagnostic {
            message: message.into(),
            line: Some(line),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[Diagnostic] {
        &self.items
    }

    pub fn into_items(self) -> Vec<Diagnostic> {
        self.items
    }
}

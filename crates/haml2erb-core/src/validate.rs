/*
 * validate.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Well-formedness checking for produced ERB.
//!
//! The converter's output obeys a narrow grammar: every embedded-code tag is
//! closed on the line it opens, and block openers pair with exactly one
//! `<% end %>`. The checker walks the text once, collects every violation
//! with its line, and never aborts early — callers report the whole list.

use crate::emitter::opens_block;
use serde::Serialize;

/// One problem found in the ERB text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationError {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
}

/// The checked text together with everything wrong with it.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub erb: String,
    pub errors: Vec<ValidationError>,
}

impl ValidationReport {
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Check `erb` and report every problem found.
pub fn validate(erb: &str) -> ValidationReport {
    let mut errors = Vec::new();
    // Stack of (opening code, line) for blocks awaiting an end.
    let mut open_blocks: Vec<(String, usize)> = Vec::new();

    for (idx, line) in erb.lines().enumerate() {
        let line_no = idx + 1;
        let mut rest = line;
        while let Some(start) = rest.find("<%") {
            let after = &rest[start + 2..];
            match after.find("%>") {
                None => {
                    errors.push(ValidationError {
                        message: "embedded code tag is never closed".to_string(),
                        line: Some(line_no),
                    });
                    rest = "";
                    break;
                }
                Some(end) => {
                    let code = after[..end].trim_start_matches('=').trim();
                    classify_code(code, line_no, &mut open_blocks, &mut errors);
                    rest = &after[end + 2..];
                }
            }
        }
    }

    for (code, line) in open_blocks {
        errors.push(ValidationError {
            message: format!("block opened by \"{}\" is never closed", code),
            line: Some(line),
        });
    }

    ValidationReport {
        erb: erb.to_string(),
        errors,
    }
}

fn classify_code(
    code: &str,
    line_no: usize,
    open_blocks: &mut Vec<(String, usize)>,
    errors: &mut Vec<ValidationError>,
) {
    let first = code.split_whitespace().next().unwrap_or("");
    match first {
        "end" => {
            if open_blocks.pop().is_none() {
                errors.push(ValidationError {
                    message: "\"end\" without an open block".to_string(),
                    line: Some(line_no),
                });
            }
        }
        "else" | "elsif" | "when" | "rescue" | "ensure" => {
            if open_blocks.is_empty() {
                errors.push(ValidationError {
                    message: format!("\"{}\" outside an open block", first),
                    line: Some(line_no),
                });
            }
        }
        _ => {
            if opens_block(code) {
                open_blocks.push((code.to_string(), line_no));
            }
        }
    }
}

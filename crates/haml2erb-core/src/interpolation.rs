/*
 * interpolation.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Rewrites `#{expr}` interpolations into `<%= expr %>` output tags.
//!
//! The scan is a single left-to-right pass. An interpolation opener preceded
//! by an odd run of backslashes is escaped: one backslash is dropped and the
//! opener survives as literal text. Interpolation bodies are brace-balanced
//! and string-literal aware, so `#{items.sum { |i| i.price }}` and quotes
//! containing braces both come through intact.

use crate::error::{ConvertError, ConvertResult};
use crate::html::escape_attribute;
use crate::scan;

/// One piece of a scanned text: literal content or an interpolation body.
enum Segment {
    Literal(String),
    Code(String),
}

/// Rewrite interpolations, leaving literal text untouched. Used for tag
/// content and plain text lines.
pub fn rewrite(text: &str) -> ConvertResult<String> {
    let mut out = String::with_capacity(text.len());
    for segment in segments(text)? {
        match segment {
            Segment::Literal(lit) => out.push_str(&lit),
            Segment::Code(code) => out.push_str(&output_tag(&code)),
        }
    }
    Ok(out)
}

/// Rewrite interpolations inside an attribute value: literal text is
/// attribute-escaped, interpolation bodies pass through verbatim so the
/// embedded code stays executable.
pub fn rewrite_attribute(text: &str) -> ConvertResult<String> {
    let mut out = String::with_capacity(text.len());
    for segment in segments(text)? {
        match segment {
            Segment::Literal(lit) => out.push_str(&escape_attribute(&lit)),
            Segment::Code(code) => out.push_str(&output_tag(&code)),
        }
    }
    Ok(out)
}

fn output_tag(code: &str) -> String {
    format!("<%= {} %>", code)
}

/// Split `text` into literal and code segments.
fn segments(text: &str) -> ConvertResult<Vec<Segment>> {
    let chars: Vec<char> = text.chars().collect();
    let mut parts = Vec::new();
    let mut literal = String::new();
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == '#' && chars.get(i + 1) == Some(&'{') {
            let backslashes = literal.chars().rev().take_while(|&c| c == '\\').count();
            if backslashes % 2 == 1 {
                // Escaped opener: drop one backslash, keep "#{" literally,
                // and do not scan a body.
                literal.pop();
                literal.push_str("#{");
                i += 2;
                continue;
            }
            let end = scan::skip_interpolation(&chars, i + 2)
                .ok_or(ConvertError::UnclosedInterpolation)?;
            if !literal.is_empty() {
                parts.push(Segment::Literal(std::mem::take(&mut literal)));
            }
            parts.push(Segment::Code(chars[i + 2..end - 1].iter().collect()));
            i = end;
        } else {
            literal.push(chars[i]);
            i += 1;
        }
    }
    if !literal.is_empty() {
        parts.push(Segment::Literal(literal));
    }
    Ok(parts)
}

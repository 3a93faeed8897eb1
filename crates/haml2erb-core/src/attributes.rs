/*
 * attributes.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Builds the attribute string for a tag from its four sources: shorthand
//! class/id (already folded into the static map by the parser), the static
//! portion of the attribute hashes, dynamic hash entries, and the object
//! reference.
//!
//! Class and id fragments from all sources merge into single attributes, in
//! source order: shorthand, static hash, dynamic hash, object reference.
//! Every other entry renders to its own clause. A whole hash fragment is
//! first offered to the static-literal recognizer; when that reports
//! "dynamic" the fragment is re-scanned key by key so the static keys still
//! inline as plain HTML and only the dynamic values become embedded code.

use crate::diagnostics::Diagnostics;
use crate::error::ConvertResult;
use crate::html::{escape_attribute, is_boolean_attribute};
use crate::interpolation;
use crate::literal::{self, Key, Value};
use crate::scan;
use haml2erb_parser::ast::DynamicAttributes;
use hashlink::LinkedHashMap;

/// Build the rendered attribute string: empty, or a single leading space
/// followed by space-joined clauses with `class`/`id` first.
pub fn build(
    static_attrs: &LinkedHashMap<String, String>,
    dynamic_attrs: &DynamicAttributes,
    object_ref: Option<&str>,
    line: usize,
    diagnostics: &mut Diagnostics,
) -> ConvertResult<String> {
    let mut set = AttributeSet::default();

    for (name, value) in static_attrs {
        if name == "class" {
            set.classes.extend(value.split_whitespace().map(str::to_string));
        } else if name == "id" {
            set.ids.push(value.clone());
        } else {
            set.clauses
                .push(format!("{}=\"{}\"", name, escape_attribute(value)));
        }
    }

    for text in [dynamic_attrs.old.as_deref(), dynamic_attrs.new.as_deref()]
        .into_iter()
        .flatten()
    {
        process_hash(text, None, &mut set, line, diagnostics)?;
    }

    if let Some(reference) = object_ref {
        let (class_code, id_code) = object_ref_fragments(reference);
        set.classes.push(class_code);
        set.ids.push(id_code);
    }

    Ok(set.render())
}

#[derive(Debug, Default)]
struct AttributeSet {
    classes: Vec<String>,
    ids: Vec<String>,
    clauses: Vec<String>,
}

impl AttributeSet {
    fn add_fragment(&mut self, name: &str, fragment: String) {
        if name == "class" {
            self.classes.push(fragment);
        } else {
            self.ids.push(fragment);
        }
    }

    fn render(&self) -> String {
        let mut clauses: Vec<String> = Vec::new();
        if !self.classes.is_empty() {
            let merged: Vec<String> = self.classes.iter().map(|f| escape_fragment(f)).collect();
            clauses.push(format!("class=\"{}\"", merged.join(" ")));
        }
        if !self.ids.is_empty() {
            let merged: Vec<String> = self.ids.iter().map(|f| escape_fragment(f)).collect();
            clauses.push(format!("id=\"{}\"", merged.join(" ")));
        }
        clauses.extend(self.clauses.iter().cloned());
        if clauses.is_empty() {
            String::new()
        } else {
            format!(" {}", clauses.join(" "))
        }
    }
}

/// Class/id fragments that are already embedded code pass through verbatim;
/// re-encoding them would corrupt the code. Everything else is escaped.
fn escape_fragment(fragment: &str) -> String {
    if fragment.contains("<%") {
        fragment.to_string()
    } else {
        escape_attribute(fragment)
    }
}

fn is_merged(name: &str) -> bool {
    name == "class" || name == "id"
}

/// The emitted attribute name for a hash key: symbol keys have underscores
/// rewritten to hyphens, string keys pass through, and nested keys pick up
/// their parent's name as a dash prefix.
fn attribute_name(key: &Key, prefix: Option<&str>) -> String {
    let base = if key.symbol {
        key.name.replace('_', "-")
    } else {
        key.name.clone()
    };
    match prefix {
        Some(p) => format!("{}-{}", p, base),
        None => base,
    }
}

/// Process one raw hash fragment: whole-fragment static parse first, by-key
/// scan as the fallback.
fn process_hash(
    text: &str,
    prefix: Option<&str>,
    set: &mut AttributeSet,
    line: usize,
    diagnostics: &mut Diagnostics,
) -> ConvertResult<()> {
    if let Some(entries) = literal::parse_hash(text) {
        for (key, value) in &entries {
            emit_static(key, value, prefix, set);
        }
        return Ok(());
    }
    scan_entries(text, prefix, set, line, diagnostics)
}

/// Emit one fully-static entry according to the attribute semantics table.
fn emit_static(key: &Key, value: &Value, prefix: Option<&str>, set: &mut AttributeSet) {
    let name = attribute_name(key, prefix);

    if is_merged(&name) {
        match value {
            Value::Seq(items) => {
                for item in items {
                    if let Some(text) = item.as_scalar_text() {
                        set.add_fragment(&name, text);
                    }
                }
            }
            Value::Map(entries) => {
                for (sub_key, sub_value) in entries {
                    emit_static(sub_key, sub_value, Some(&name), set);
                }
            }
            other => {
                if let Some(text) = other.as_scalar_text() {
                    set.add_fragment(&name, text);
                }
            }
        }
        return;
    }

    match value {
        Value::Map(entries) => {
            for (sub_key, sub_value) in entries {
                emit_static(sub_key, sub_value, Some(&name), set);
            }
        }
        Value::Seq(items) => {
            let json = serde_json::Value::Array(items.iter().map(Value::to_json).collect());
            let rendered =
                serde_json::to_string(&json).expect("literal JSON is always serializable");
            set.clauses
                .push(format!("{}=\"{}\"", name, escape_attribute(&rendered)));
        }
        Value::Bool(true) => {
            if is_boolean_attribute(&name) {
                set.clauses.push(name);
            } else {
                set.clauses.push(format!("{}=\"true\"", name));
            }
        }
        Value::Bool(false) => {
            if !is_boolean_attribute(&name) {
                set.clauses.push(format!("{}=\"false\"", name));
            }
        }
        scalar => {
            if let Some(text) = scalar.as_scalar_text() {
                set.clauses
                    .push(format!("{}=\"{}\"", name, escape_attribute(&text)));
            }
        }
    }
}

/// By-key fallback: parse one key, capture one balanced value, classify,
/// repeat. Runs whenever the whole fragment is not static.
fn scan_entries(
    text: &str,
    prefix: Option<&str>,
    set: &mut AttributeSet,
    line: usize,
    diagnostics: &mut Diagnostics,
) -> ConvertResult<()> {
    let chars: Vec<char> = text.chars().collect();
    let mut i = 0;
    let mut warned_splat = false;
    loop {
        while i < chars.len() && (chars[i].is_whitespace() || chars[i] == ',') {
            i += 1;
        }
        if i >= chars.len() {
            break;
        }

        if chars[i] == '*' && chars.get(i + 1) == Some(&'*') {
            if !warned_splat {
                diagnostics.warn_at(
                    "Double splat attributes are not supported and were skipped",
                    line,
                );
                warned_splat = true;
            }
            i += 2;
            match scan::scan_value(&chars, i) {
                Some(end) => i = end,
                None => break,
            }
            continue;
        }

        let Some((key, after_key)) = scan_key(&chars, i) else {
            diagnostics.warn_at(
                format!("Could not interpret attribute hash entry near \"{}\"", snippet(&chars, i)),
                line,
            );
            break;
        };
        i = after_key;
        while i < chars.len() && chars[i].is_whitespace() {
            i += 1;
        }
        let Some(end) = scan::scan_value(&chars, i) else {
            diagnostics.warn_at("Unterminated string in attribute hash", line);
            break;
        };
        let value_text: String = chars[i..end].iter().collect();
        i = end;
        classify_entry(&key, value_text.trim(), prefix, set, line, diagnostics)?;
    }
    Ok(())
}

/// Classify one by-key value and emit it.
fn classify_entry(
    key: &Key,
    value_text: &str,
    prefix: Option<&str>,
    set: &mut AttributeSet,
    line: usize,
    diagnostics: &mut Diagnostics,
) -> ConvertResult<()> {
    let name = attribute_name(key, prefix);

    // Literal nil drops the attribute entirely.
    if value_text == "nil" {
        return Ok(());
    }

    if value_text.starts_with('{') {
        if let Some(Value::Map(entries)) = literal::parse_value(value_text) {
            for (sub_key, sub_value) in &entries {
                emit_static(sub_key, sub_value, Some(&name), set);
            }
        } else {
            let inner = value_text
                .strip_prefix('{')
                .and_then(|s| s.strip_suffix('}'))
                .unwrap_or(value_text);
            scan_entries(inner, Some(&name), set, line, diagnostics)?;
        }
        return Ok(());
    }

    if value_text.starts_with('[') {
        if let Some(seq @ Value::Seq(_)) = literal::parse_value(value_text) {
            emit_static(key, &seq, prefix, set);
        } else {
            emit_dynamic(&name, value_text, set);
        }
        return Ok(());
    }

    if let Some((quote, inner)) = whole_string_literal(value_text) {
        let unescaped = unescape_string(&inner, quote);
        if unescaped.contains("#{") {
            if is_merged(&name) {
                set.add_fragment(&name, interpolation::rewrite(&unescaped)?);
            } else {
                set.clauses.push(format!(
                    "{}=\"{}\"",
                    name,
                    interpolation::rewrite_attribute(&unescaped)?
                ));
            }
        } else if is_merged(&name) {
            set.add_fragment(&name, unescaped);
        } else {
            set.clauses
                .push(format!("{}=\"{}\"", name, escape_attribute(&unescaped)));
        }
        return Ok(());
    }

    if let Some(value) = literal::parse_value(value_text) {
        emit_static(key, &value, prefix, set);
        return Ok(());
    }

    emit_dynamic(&name, value_text, set);
    Ok(())
}

/// A value that needs runtime evaluation: boolean attributes become a
/// conditional-presence tag, class/id become code fragments, everything
/// else becomes an embedded output value.
fn emit_dynamic(name: &str, expr: &str, set: &mut AttributeSet) {
    if is_merged(name) {
        set.add_fragment(name, format!("<%= {} %>", expr));
    } else if is_boolean_attribute(name) {
        set.clauses
            .push(format!("<%= '{}' if ({}) %>", name, expr));
    } else {
        set.clauses.push(format!("{}=\"<%= {} %>\"", name, expr));
    }
}

/// Parse one hash key starting at `i`. Returns the key and the index just
/// past its separator (`:` or `=>`).
fn scan_key(chars: &[char], start: usize) -> Option<(Key, usize)> {
    let mut i = start;
    match chars[i] {
        ':' => {
            i += 1;
            let (name, after) = if matches!(chars.get(i), Some('"') | Some('\'')) {
                let end = scan::skip_string(chars, i)?;
                (chars[i + 1..end - 1].iter().collect::<String>(), end)
            } else {
                scan_ident(chars, i)?
            };
            i = after;
            while i < chars.len() && chars[i].is_whitespace() {
                i += 1;
            }
            if chars.get(i) == Some(&'=') && chars.get(i + 1) == Some(&'>') {
                Some((Key { name, symbol: true }, i + 2))
            } else {
                None
            }
        }
        '"' | '\'' => {
            let end = scan::skip_string(chars, i)?;
            let name: String = chars[i + 1..end - 1].iter().collect();
            i = end;
            if chars.get(i) == Some(&':') {
                return Some((
                    Key {
                        name,
                        symbol: false,
                    },
                    i + 1,
                ));
            }
            while i < chars.len() && chars[i].is_whitespace() {
                i += 1;
            }
            if chars.get(i) == Some(&'=') && chars.get(i + 1) == Some(&'>') {
                Some((
                    Key {
                        name,
                        symbol: false,
                    },
                    i + 2,
                ))
            } else {
                None
            }
        }
        c if c.is_ascii_alphabetic() || c == '_' => {
            let (name, after) = scan_ident(chars, i)?;
            if chars.get(after) == Some(&':') {
                Some((Key { name, symbol: true }, after + 1))
            } else {
                None
            }
        }
        _ => None,
    }
}

fn scan_ident(chars: &[char], start: usize) -> Option<(String, usize)> {
    let mut i = start;
    match chars.get(i) {
        Some(c) if c.is_ascii_alphabetic() || *c == '_' => {}
        _ => return None,
    }
    while matches!(chars.get(i), Some(c) if c.is_ascii_alphanumeric() || *c == '_') {
        i += 1;
    }
    if matches!(chars.get(i), Some('?') | Some('!')) {
        i += 1;
    }
    Some((chars[start..i].iter().collect(), i))
}

fn snippet(chars: &[char], start: usize) -> String {
    chars[start..].iter().take(24).collect()
}

/// True when the entire value is a single string literal; returns the quote
/// character and the raw inner text. `"a" + b` fails the check because the
/// closing quote is not the end of the value.
fn whole_string_literal(value: &str) -> Option<(char, String)> {
    let chars: Vec<char> = value.chars().collect();
    let quote = *chars.first()?;
    if quote != '"' && quote != '\'' {
        return None;
    }
    let end = scan::skip_string(&chars, 0)?;
    if end != chars.len() {
        return None;
    }
    Some((quote, chars[1..end - 1].iter().collect()))
}

/// Unescape the two supported sequences for the value's quote style plus
/// `\\`; anything else stays raw.
fn unescape_string(inner: &str, quote: char) -> String {
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some(next) if next == quote => out.push(quote),
            Some(next) => {
                out.push('\\');
                out.push(next);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// Expand a `[obj]` or `[obj, :prefix]` reference into class and id code
/// fragments derived from the object's class name and primary key.
fn object_ref_fragments(reference: &str) -> (String, String) {
    let chars: Vec<char> = reference.chars().collect();
    let split = scan::scan_value(&chars, 0).unwrap_or(chars.len());
    let (object, prefix) = if split < chars.len() && chars[split] == ',' {
        (
            chars[..split].iter().collect::<String>(),
            Some(chars[split + 1..].iter().collect::<String>()),
        )
    } else {
        (reference.to_string(), None)
    };
    let object = object.trim();
    let prefix = prefix.map(|p| {
        p.trim()
            .trim_start_matches(':')
            .trim_matches(|c| c == '"' || c == '\'')
            .to_string()
    });

    match prefix {
        Some(p) => (
            format!("<%= \"{}_\" + {}.class.name.underscore %>", p, object),
            format!(
                "<%= \"{}_\" + {}.class.name.underscore + '_' + {}.to_key.first.to_s %>",
                p, object, object
            ),
        ),
        None => (
            format!("<%= {}.class.name.underscore %>", object),
            format!(
                "<%= {}.class.name.underscore + '_' + {}.to_key.first.to_s %>",
                object, object
            ),
        ),
    }
}

/*
 * emitter.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Walks the HAML AST and emits ERB text.
//!
//! Indentation is two spaces per nesting level and every emitted construct
//! ends at a line boundary. Silent scripts that open a Ruby block get their
//! `<% end %>` at the opener's depth; mid-block continuations (re-parented
//! by the parser) also emit at the opener's depth rather than one level in.

use crate::attributes;
use crate::diagnostics::Diagnostics;
use crate::error::ConvertResult;
use crate::html::is_void_element;
use crate::interpolation;
use haml2erb_parser::ast::{
    Comment, Doctype, DoctypeKind, Document, Filter, Node, Script, SilentScript, Tag,
};
use once_cell::sync::Lazy;
use regex::Regex;

/// `... do` or `... do |a, b|` at the end of a line opens a block.
static ENDS_WITH_DO: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bdo(\s*\|[^|]*\|)?\s*$").unwrap());

/// True when a chunk of embedded Ruby opens a block that a later `end`
/// must close.
pub(crate) fn opens_block(code: &str) -> bool {
    let trimmed = code.trim();
    let first = trimmed.split_whitespace().next().unwrap_or("");
    matches!(
        first,
        "if" | "unless" | "case" | "begin" | "while" | "until" | "for"
    ) || ENDS_WITH_DO.is_match(trimmed)
}

/// Render a whole document at depth zero.
pub fn emit_document(doc: &Document, diagnostics: &mut Diagnostics) -> ConvertResult<String> {
    let mut out = String::new();
    for child in &doc.children {
        emit_node(child, 0, &mut out, diagnostics)?;
    }
    Ok(out)
}

fn indent(depth: usize) -> String {
    "  ".repeat(depth)
}

fn emit_node(
    node: &Node,
    depth: usize,
    out: &mut String,
    diagnostics: &mut Diagnostics,
) -> ConvertResult<()> {
    match node {
        Node::Tag(tag) => emit_tag(tag, depth, out, diagnostics),
        Node::Script(script) => emit_script(script, depth, out, diagnostics),
        Node::SilentScript(script) => emit_silent_script(script, depth, out, diagnostics),
        Node::Filter(filter) => emit_filter(filter, depth, out, diagnostics),
        Node::Doctype(doctype) => {
            emit_doctype(doctype, depth, out);
            Ok(())
        }
        Node::Comment(comment) => emit_comment(comment, depth, out, diagnostics),
        Node::Plain(plain) => {
            out.push_str(&indent(depth));
            out.push_str(&interpolation::rewrite(&plain.text)?);
            out.push('\n');
            Ok(())
        }
        Node::HamlComment => Ok(()),
    }
}

fn emit_tag(
    tag: &Tag,
    depth: usize,
    out: &mut String,
    diagnostics: &mut Diagnostics,
) -> ConvertResult<()> {
    let attrs = attributes::build(
        &tag.attributes,
        &tag.dynamic_attributes,
        tag.object_ref.as_deref(),
        tag.line,
        diagnostics,
    )?;
    let void = is_void_element(&tag.name);
    let pad = indent(depth);
    out.push_str(&format!("{}<{}{}>", pad, tag.name, attrs));

    let value = tag.value.as_deref().unwrap_or("");
    if tag.self_closing || (void && tag.children.is_empty() && value.is_empty()) {
        out.push('\n');
    } else if !value.is_empty() {
        let content = format_inline_value(value, tag.parse)?;
        if void {
            diagnostics.warn_at(
                format!("Void element <{}> has inline content", tag.name),
                tag.line,
            );
            out.push('\n');
            out.push_str(&pad);
            out.push_str(&content);
            out.push('\n');
        } else {
            out.push_str(&content);
            out.push_str(&format!("</{}>\n", tag.name));
        }
    } else if !tag.children.is_empty() {
        if void {
            diagnostics.warn_at(
                format!(
                    "Void element <{}> has nested children; emitting them as siblings",
                    tag.name
                ),
                tag.line,
            );
            out.push('\n');
            for child in &tag.children {
                emit_node(child, depth + 1, out, diagnostics)?;
            }
        } else {
            out.push('\n');
            for child in &tag.children {
                emit_node(child, depth + 1, out, diagnostics)?;
            }
            out.push_str(&format!("{}</{}>\n", pad, tag.name));
        }
    } else {
        out.push_str(&format!("</{}>\n", tag.name));
    }
    Ok(())
}

/// Render inline tag content. A parsed value that is a double-quoted string
/// with interpolation inlines as text with output tags; any other parsed
/// value becomes one output tag; plain text goes through the interpolation
/// scanner.
fn format_inline_value(value: &str, parse: bool) -> ConvertResult<String> {
    if parse {
        if let Some(inner) = double_quoted_with_interpolation(value) {
            return interpolation::rewrite(&unescape_quotes(&inner));
        }
        return Ok(format!("<%= {} %>", value));
    }
    interpolation::rewrite(value)
}

/// When `value` is exactly one double-quoted string literal containing
/// interpolation, return its raw inner text.
fn double_quoted_with_interpolation(value: &str) -> Option<String> {
    let chars: Vec<char> = value.chars().collect();
    if chars.first() != Some(&'"') {
        return None;
    }
    let end = crate::scan::skip_string(&chars, 0)?;
    if end != chars.len() {
        return None;
    }
    let inner: String = chars[1..end - 1].iter().collect();
    inner.contains("#{").then_some(inner)
}

/// Unescape `\"` and `\\` only; other escape sequences pass through raw.
fn unescape_quotes(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

fn emit_script(
    script: &Script,
    depth: usize,
    out: &mut String,
    diagnostics: &mut Diagnostics,
) -> ConvertResult<()> {
    let pad = indent(depth);
    if !script.children.is_empty() {
        out.push_str(&format!("{}<%= {} %>\n", pad, script.text));
        for child in &script.children {
            emit_node(child, depth + 1, out, diagnostics)?;
        }
        out.push_str(&format!("{}<% end %>\n", pad));
        return Ok(());
    }
    if let Some(inner) = double_quoted_with_interpolation(&script.text) {
        out.push_str(&pad);
        out.push_str(&interpolation::rewrite(&unescape_quotes(&inner))?);
        out.push('\n');
        return Ok(());
    }
    out.push_str(&format!("{}<%= {} %>\n", pad, script.text));
    Ok(())
}

fn emit_silent_script(
    script: &SilentScript,
    depth: usize,
    out: &mut String,
    diagnostics: &mut Diagnostics,
) -> ConvertResult<()> {
    let pad = indent(depth);
    out.push_str(&format!("{}<% {} %>\n", pad, script.text));
    for child in &script.children {
        let child_depth = match child {
            Node::SilentScript(nested) if nested.is_continuation() => depth,
            _ => depth + 1,
        };
        emit_node(child, child_depth, out, diagnostics)?;
    }
    if !script.children.is_empty() && opens_block(&script.text) {
        out.push_str(&format!("{}<% end %>\n", pad));
    }
    Ok(())
}

fn emit_filter(
    filter: &Filter,
    depth: usize,
    out: &mut String,
    diagnostics: &mut Diagnostics,
) -> ConvertResult<()> {
    let pad = indent(depth);
    match filter.name.as_str() {
        "javascript" => emit_wrapped_filter(filter, "<script>", "</script>", depth, out),
        "css" => emit_wrapped_filter(filter, "<style>", "</style>", depth, out),
        "plain" | "erb" => {
            for line in filter.text.lines() {
                push_line(out, &pad, line);
            }
            Ok(())
        }
        "ruby" => {
            for line in filter.text.lines() {
                if !line.trim().is_empty() {
                    out.push_str(&format!("{}<% {} %>\n", pad, line));
                }
            }
            Ok(())
        }
        other => {
            diagnostics.warn_at(format!("Unknown filter \"{}\"", other), filter.line);
            out.push_str(&format!("{}<!-- Unknown filter: {} -->\n", pad, other));
            for line in filter.text.lines() {
                push_line(out, &pad, line);
            }
            Ok(())
        }
    }
}

/// `:javascript` and `:css` bodies nest one level inside their wrapper tags
/// and still honor interpolation.
fn emit_wrapped_filter(
    filter: &Filter,
    open: &str,
    close: &str,
    depth: usize,
    out: &mut String,
) -> ConvertResult<()> {
    let pad = indent(depth);
    let inner_pad = indent(depth + 1);
    out.push_str(&format!("{}{}\n", pad, open));
    for line in filter.text.lines() {
        if line.trim().is_empty() {
            out.push('\n');
        } else {
            out.push_str(&inner_pad);
            out.push_str(&interpolation::rewrite(line)?);
            out.push('\n');
        }
    }
    out.push_str(&format!("{}{}\n", pad, close));
    Ok(())
}

fn push_line(out: &mut String, pad: &str, line: &str) {
    if line.trim().is_empty() {
        out.push('\n');
    } else {
        out.push_str(pad);
        out.push_str(line);
        out.push('\n');
    }
}

fn emit_doctype(doctype: &Doctype, depth: usize, out: &mut String) {
    let pad = indent(depth);
    match &doctype.kind {
        DoctypeKind::Xml { encoding } => {
            out.push_str(&format!(
                "{}<?xml version=\"1.0\" encoding=\"{}\"?>\n",
                pad,
                encoding.as_deref().unwrap_or("UTF-8")
            ));
        }
        // Old SGML doctype variants all collapse to the HTML5 doctype.
        DoctypeKind::Html => {
            out.push_str(&pad);
            out.push_str("<!DOCTYPE html>\n");
        }
    }
}

fn emit_comment(
    comment: &Comment,
    depth: usize,
    out: &mut String,
    diagnostics: &mut Diagnostics,
) -> ConvertResult<()> {
    let pad = indent(depth);
    if comment.children.is_empty() {
        if comment.text.is_empty() {
            out.push_str(&format!("{}<!-- -->\n", pad));
        } else {
            out.push_str(&format!("{}<!-- {} -->\n", pad, comment.text));
        }
        return Ok(());
    }
    out.push_str(&format!("{}<!--\n", pad));
    for child in &comment.children {
        emit_node(child, depth + 1, out, diagnostics)?;
    }
    out.push_str(&format!("{}-->\n", pad));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use haml2erb_parser::parse;

    fn emit(source: &str) -> String {
        let doc = parse(source).unwrap();
        let mut diagnostics = Diagnostics::new();
        emit_document(&doc, &mut diagnostics).unwrap()
    }

    #[test]
    fn test_opens_block() {
        assert!(opens_block("if user.admin?"));
        assert!(opens_block("items.each do |item|"));
        assert!(opens_block("items.each do"));
        assert!(opens_block("while queue.any?"));
        assert!(!opens_block("x = compute(a, b)"));
        assert!(!opens_block("download"));
        assert!(!opens_block("else"));
    }

    #[test]
    fn test_empty_tag() {
        assert_eq!(emit("%div"), "<div></div>\n");
    }

    #[test]
    fn test_void_self_closing() {
        assert_eq!(emit("%br/"), "<br>\n");
        assert_eq!(emit("%br"), "<br>\n");
    }

    #[test]
    fn test_nested_indentation() {
        assert_eq!(
            emit("%ul\n  %li one\n  %li two"),
            "<ul>\n  <li>one</li>\n  <li>two</li>\n</ul>\n"
        );
    }

    #[test]
    fn test_inline_script_value() {
        assert_eq!(emit("%p= user.name"), "<p><%= user.name %></p>\n");
    }

    #[test]
    fn test_parsed_string_with_interpolation_inlines() {
        assert_eq!(
            emit("%p= \"Hi #{name}!\""),
            "<p>Hi <%= name %>!</p>\n"
        );
    }

    #[test]
    fn test_parsed_plain_string_stays_code() {
        assert_eq!(emit("%p= \"hello\""), "<p><%= \"hello\" %></p>\n");
    }

    #[test]
    fn test_block_script_gets_end() {
        assert_eq!(
            emit("= form_for @user do |f|\n  %p field"),
            "<%= form_for @user do |f| %>\n  <p>field</p>\n<% end %>\n"
        );
    }

    #[test]
    fn test_if_else_block_layout() {
        let out = emit("- if a\n  %p A\n- else\n  %p B");
        assert_eq!(
            out,
            "<% if a %>\n  <p>A</p>\n<% else %>\n  <p>B</p>\n<% end %>\n"
        );
    }

    #[test]
    fn test_case_when_layout() {
        let out = emit("- case kind\n- when :a\n  %p A\n- when :b\n  %p B");
        assert_eq!(
            out,
            "<% case kind %>\n<% when :a %>\n  <p>A</p>\n<% when :b %>\n  <p>B</p>\n<% end %>\n"
        );
    }

    #[test]
    fn test_block_keyword_without_children_emits_no_end() {
        assert_eq!(emit("- if logged_in?"), "<% if logged_in? %>\n");
    }

    #[test]
    fn test_each_block_gets_end() {
        assert_eq!(
            emit("- items.each do |item|\n  %li= item"),
            "<% items.each do |item| %>\n  <li><%= item %></li>\n<% end %>\n"
        );
    }

    #[test]
    fn test_plain_silent_script_no_end() {
        assert_eq!(emit("- total = 0"), "<% total = 0 %>\n");
    }

    #[test]
    fn test_void_with_inline_content_warns_and_moves_content() {
        let doc = parse("%br hello").unwrap();
        let mut diagnostics = Diagnostics::new();
        let out = emit_document(&doc, &mut diagnostics).unwrap();
        assert_eq!(out, "<br>\nhello\n");
        assert_eq!(diagnostics.items().len(), 1);
        assert!(diagnostics.items()[0].message.contains("<br>"));
    }

    #[test]
    fn test_void_with_children_warns_and_emits_siblings() {
        let doc = parse("%img\n  %p caption").unwrap();
        let mut diagnostics = Diagnostics::new();
        let out = emit_document(&doc, &mut diagnostics).unwrap();
        assert_eq!(out, "<img>\n  <p>caption</p>\n");
        assert_eq!(diagnostics.items().len(), 1);
    }

    #[test]
    fn test_doctypes() {
        assert_eq!(emit("!!! XML"), "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        assert_eq!(
            emit("!!! XML iso-8859-1"),
            "<?xml version=\"1.0\" encoding=\"iso-8859-1\"?>\n"
        );
        assert_eq!(emit("!!! Strict"), "<!DOCTYPE html>\n");
        assert_eq!(emit("!!!"), "<!DOCTYPE html>\n");
    }

    #[test]
    fn test_comment() {
        assert_eq!(emit("/ cached fragment"), "<!-- cached fragment -->\n");
    }

    #[test]
    fn test_comment_with_children() {
        assert_eq!(
            emit("/\n  %p old browsers"),
            "<!--\n  <p>old browsers</p>\n-->\n"
        );
    }

    #[test]
    fn test_javascript_filter() {
        assert_eq!(
            emit(":javascript\n  alert(\"#{message}\");"),
            "<script>\n  alert(\"<%= message %>\");\n</script>\n"
        );
    }

    #[test]
    fn test_css_filter_nested() {
        assert_eq!(
            emit("%head\n  :css\n    .a { color: red; }"),
            "<head>\n  <style>\n    .a { color: red; }\n  </style>\n</head>\n"
        );
    }

    #[test]
    fn test_ruby_filter() {
        assert_eq!(
            emit(":ruby\n  total = 0\n\n  total += 1"),
            "<% total = 0 %>\n<% total += 1 %>\n"
        );
    }

    #[test]
    fn test_plain_filter_kept_verbatim() {
        assert_eq!(
            emit(":plain\n  keep #{this} raw"),
            "keep #{this} raw\n"
        );
    }

    #[test]
    fn test_unknown_filter_warns_with_comment() {
        let doc = parse(":markdown\n  # Title").unwrap();
        let mut diagnostics = Diagnostics::new();
        let out = emit_document(&doc, &mut diagnostics).unwrap();
        assert_eq!(out, "<!-- Unknown filter: markdown -->\n# Title\n");
        assert!(diagnostics.items()[0].message.contains("markdown"));
    }

    #[test]
    fn test_plain_text_interpolated() {
        assert_eq!(emit("Hello #{name}"), "Hello <%= name %>\n");
    }

    #[test]
    fn test_haml_comment_emits_nothing() {
        assert_eq!(emit("-# internal note\n  %p hidden"), "");
    }
}

/*
 * parser.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Line-oriented HAML parser.
//!
//! HAML nests by indentation, two spaces per level. The parser walks the
//! template a line at a time, dispatching on the first character(s) of each
//! line, and recurses for indented children. Attribute groups (`{…}`, `(…)`,
//! `[…]`) may span lines; continuation lines are merged into the logical tag
//! line before the group is captured.
//!
//! Mid-block continuation lines (`- else`, `- when …`, `- rescue`) are
//! re-parented under the preceding silent script at the same depth, so the
//! emitter can place them at the opener's indentation and close the whole
//! block with a single `end`.

use crate::ast::{
    Comment, Doctype, DoctypeKind, Document, DynamicAttributes, Filter, Node, Plain, Script,
    SilentScript, Tag,
};
use crate::error::{HamlError, ParseResult};
use hashlink::LinkedHashMap;

/// Ruby control-flow keywords that may start a silent script line.
const CONTROL_KEYWORDS: &[&str] = &[
    "if", "unless", "case", "begin", "while", "until", "for", "else", "elsif", "when", "rescue",
    "ensure",
];

/// Parse a HAML template into a [`Document`].
pub fn parse(source: &str) -> ParseResult<Document> {
    let mut parser = Parser::new(source);
    let children = parser.parse_nodes(0)?;
    Ok(Document { children })
}

struct Parser<'a> {
    lines: Vec<&'a str>,
    /// Index of the next unconsumed line.
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            lines: source.lines().collect(),
            pos: 0,
        }
    }

    /// Parse consecutive nodes at exactly `depth`, stopping at the first
    /// shallower line.
    fn parse_nodes(&mut self, depth: usize) -> ParseResult<Vec<Node>> {
        let mut nodes: Vec<Node> = Vec::new();
        while let Some((idx, line_depth)) = self.peek_depth()? {
            if line_depth < depth {
                break;
            }
            if line_depth > depth {
                return Err(HamlError::Indentation {
                    message: format!(
                        "line is indented {} levels, but at most {} expected",
                        line_depth, depth
                    ),
                    line: idx + 1,
                });
            }
            let node = self.parse_node(idx, depth)?;
            match node {
                Node::SilentScript(script) if script.is_continuation() => {
                    let keyword = script.keyword.clone().unwrap_or_default();
                    let line = script.line;
                    match nodes.last_mut() {
                        Some(Node::SilentScript(opener)) => {
                            opener.children.push(Node::SilentScript(script));
                        }
                        _ => {
                            return Err(HamlError::Syntax {
                                message: format!(
                                    "'{}' must follow an open control block at the same indentation",
                                    keyword
                                ),
                                line,
                            });
                        }
                    }
                }
                other => nodes.push(other),
            }
        }
        Ok(nodes)
    }

    /// Parse the single node starting at line `idx` (known to sit at `depth`),
    /// including any indented children it owns.
    fn parse_node(&mut self, idx: usize, depth: usize) -> ParseResult<Node> {
        self.pos = idx + 1;
        let line_no = idx + 1;
        let line: &'a str = self.lines[idx];
        let content = &line[depth * 2..];

        if let Some(rest) = content.strip_prefix("!!!") {
            let rest = rest.trim();
            let kind = if rest == "XML" || rest.starts_with("XML ") {
                let encoding = rest["XML".len()..].trim();
                DoctypeKind::Xml {
                    encoding: (!encoding.is_empty()).then(|| encoding.to_string()),
                }
            } else {
                DoctypeKind::Html
            };
            self.ensure_no_children(depth, "a doctype")?;
            return Ok(Node::Doctype(Doctype { kind, line: line_no }));
        }

        if content.starts_with("-#") {
            self.skip_block(depth);
            return Ok(Node::HamlComment);
        }

        if let Some(rest) = content.strip_prefix('-') {
            let text = rest.trim().to_string();
            if text.is_empty() {
                return Err(HamlError::Syntax {
                    message: "silent script line has no code".to_string(),
                    line: line_no,
                });
            }
            let keyword = control_keyword(&text);
            let children = self.parse_children(depth)?;
            return Ok(Node::SilentScript(SilentScript {
                text,
                keyword,
                line: line_no,
                children,
            }));
        }

        if content.starts_with('=') || content.starts_with('~') {
            let text = content[1..].trim().to_string();
            if text.is_empty() {
                return Err(HamlError::Syntax {
                    message: "there's no expression to evaluate".to_string(),
                    line: line_no,
                });
            }
            let children = self.parse_children(depth)?;
            return Ok(Node::Script(Script {
                text,
                line: line_no,
                children,
            }));
        }

        if let Some(rest) = content.strip_prefix('/') {
            let text = rest.trim().to_string();
            let children = self.parse_children(depth)?;
            return Ok(Node::Comment(Comment {
                text,
                line: line_no,
                children,
            }));
        }

        if let Some(rest) = content.strip_prefix(':') {
            let name = rest.trim().to_string();
            if name.is_empty() || !name.chars().all(is_ident_char) {
                return Err(HamlError::Syntax {
                    message: format!("invalid filter name \"{}\"", rest.trim()),
                    line: line_no,
                });
            }
            let text = self.capture_filter_body(depth);
            return Ok(Node::Filter(Filter {
                name,
                text,
                line: line_no,
            }));
        }

        if content.starts_with('%') || content.starts_with('.') || content.starts_with('#') {
            return self.parse_tag(content, line_no, depth);
        }

        let text = if let Some(rest) = content.strip_prefix('\\') {
            rest.to_string()
        } else {
            content.to_string()
        };
        self.ensure_no_children(depth, "plain text")?;
        Ok(Node::Plain(Plain {
            text: text.trim_end().to_string(),
            line: line_no,
        }))
    }

    /// Parse a tag line: name, shorthand run, attribute groups, closing
    /// marker and inline content.
    fn parse_tag(&mut self, content: &str, line_no: usize, depth: usize) -> ParseResult<Node> {
        let mut chars: Vec<char> = content.chars().collect();
        let mut i = 0;

        let mut name = String::from("div");
        if chars.first() == Some(&'%') {
            i = 1;
            let start = i;
            while i < chars.len() && is_tag_name_char(chars[i]) {
                i += 1;
            }
            if i == start {
                return Err(HamlError::Syntax {
                    message: "missing tag name after '%'".to_string(),
                    line: line_no,
                });
            }
            name = chars[start..i].iter().collect();
        }

        let mut classes: Vec<String> = Vec::new();
        let mut id: Option<String> = None;
        while matches!(chars.get(i), Some('.') | Some('#')) {
            let marker = chars[i];
            i += 1;
            let start = i;
            while i < chars.len() && is_ident_char(chars[i]) {
                i += 1;
            }
            if i == start {
                return Err(HamlError::Syntax {
                    message: "classes and ids must have names".to_string(),
                    line: line_no,
                });
            }
            let word: String = chars[start..i].iter().collect();
            if marker == '.' {
                classes.push(word);
            } else {
                // Repeated #id shorthand: the last one wins.
                id = Some(word);
            }
        }

        let mut dynamic_attributes = DynamicAttributes::default();
        let mut object_ref: Option<String> = None;
        loop {
            match chars.get(i) {
                Some('{') => {
                    let inner = self.scan_group(&mut chars, &mut i, '{', '}', line_no)?;
                    if dynamic_attributes.old.replace(inner).is_some() {
                        return Err(HamlError::Syntax {
                            message: "a tag may carry at most one {...} attribute hash".to_string(),
                            line: line_no,
                        });
                    }
                }
                Some('(') => {
                    let inner = self.scan_group(&mut chars, &mut i, '(', ')', line_no)?;
                    if dynamic_attributes.new.replace(inner).is_some() {
                        return Err(HamlError::Syntax {
                            message: "a tag may carry at most one (...) attribute group"
                                .to_string(),
                            line: line_no,
                        });
                    }
                }
                Some('[') => {
                    let inner = self.scan_group(&mut chars, &mut i, '[', ']', line_no)?;
                    if object_ref.replace(inner).is_some() {
                        return Err(HamlError::Syntax {
                            message: "a tag may carry at most one object reference".to_string(),
                            line: line_no,
                        });
                    }
                }
                _ => break,
            }
        }

        let mut self_closing = false;
        if chars.get(i) == Some(&'/') {
            self_closing = true;
            i += 1;
        }

        let rest: String = chars[i..].iter().collect();
        let (value, parse) = if let Some(expr) = rest
            .strip_prefix("!=")
            .or_else(|| rest.strip_prefix("&="))
            .or_else(|| rest.strip_prefix('='))
        {
            let expr = expr.trim();
            if expr.is_empty() {
                return Err(HamlError::Syntax {
                    message: "there's no expression to evaluate".to_string(),
                    line: line_no,
                });
            }
            (Some(expr.to_string()), true)
        } else {
            let text = rest.strip_prefix(' ').unwrap_or(&rest).trim_end();
            if text.is_empty() {
                (None, false)
            } else {
                (Some(text.to_string()), false)
            }
        };

        if self_closing && value.is_some() {
            return Err(HamlError::IllegalNesting {
                message: "self-closing tags can't have content".to_string(),
                line: line_no,
            });
        }

        let children = if self_closing {
            self.ensure_no_children(depth, "a self-closing tag")?;
            Vec::new()
        } else if value.is_some() {
            self.ensure_no_children(depth, "a tag with inline content")?;
            Vec::new()
        } else {
            self.parse_children(depth)?
        };

        let mut attributes = LinkedHashMap::new();
        if !classes.is_empty() {
            attributes.insert("class".to_string(), classes.join(" "));
        }
        if let Some(id) = id {
            attributes.insert("id".to_string(), id);
        }

        Ok(Node::Tag(Tag {
            name,
            attributes,
            dynamic_attributes,
            object_ref,
            value,
            parse,
            self_closing,
            line: line_no,
            children,
        }))
    }

    /// Capture a balanced `open`…`close` group starting at `chars[*i]`,
    /// pulling continuation lines as long as the group stays open. Returns
    /// the trimmed inner text and leaves `*i` just past the closing
    /// delimiter.
    fn scan_group(
        &mut self,
        chars: &mut Vec<char>,
        i: &mut usize,
        open: char,
        close: char,
        line_no: usize,
    ) -> ParseResult<String> {
        *i += 1;
        let start = *i;
        let mut nesting = 1usize;
        loop {
            if *i >= chars.len() {
                self.pull_line(chars, line_no)?;
                continue;
            }
            let c = chars[*i];
            if c == '"' || c == '\'' {
                self.skip_string(chars, i, line_no)?;
                continue;
            }
            if c == open {
                nesting += 1;
            } else if c == close {
                nesting -= 1;
                if nesting == 0 {
                    let inner: String = chars[start..*i].iter().collect();
                    *i += 1;
                    return Ok(inner.trim().to_string());
                }
            }
            *i += 1;
        }
    }

    /// Skip a string literal starting at the quote under `chars[*i]`.
    /// Double-quoted strings may contain `#{…}` interpolation, which nests
    /// braces and further strings of its own.
    fn skip_string(
        &mut self,
        chars: &mut Vec<char>,
        i: &mut usize,
        line_no: usize,
    ) -> ParseResult<()> {
        let quote = chars[*i];
        *i += 1;
        loop {
            if *i >= chars.len() {
                self.pull_line(chars, line_no)?;
                continue;
            }
            let c = chars[*i];
            if c == '\\' {
                *i += 2;
            } else if c == quote {
                *i += 1;
                return Ok(());
            } else if quote == '"' && c == '#' && chars.get(*i + 1) == Some(&'{') {
                *i += 2;
                self.skip_interpolation(chars, i, line_no)?;
            } else {
                *i += 1;
            }
        }
    }

    /// Skip an interpolation body; `*i` sits just past the opening `#{`.
    fn skip_interpolation(
        &mut self,
        chars: &mut Vec<char>,
        i: &mut usize,
        line_no: usize,
    ) -> ParseResult<()> {
        let mut nesting = 1usize;
        loop {
            if *i >= chars.len() {
                self.pull_line(chars, line_no)?;
                continue;
            }
            let c = chars[*i];
            if c == '"' || c == '\'' {
                self.skip_string(chars, i, line_no)?;
                continue;
            }
            if c == '{' {
                nesting += 1;
            } else if c == '}' {
                nesting -= 1;
                if nesting == 0 {
                    *i += 1;
                    return Ok(());
                }
            }
            *i += 1;
        }
    }

    /// Merge the next source line into the logical line being scanned.
    fn pull_line(&mut self, chars: &mut Vec<char>, line_no: usize) -> ParseResult<()> {
        if self.pos >= self.lines.len() {
            return Err(HamlError::UnclosedAttributes { line: line_no });
        }
        chars.push(' ');
        chars.extend(self.lines[self.pos].trim().chars());
        self.pos += 1;
        Ok(())
    }

    /// Parse an indented child block, if one follows.
    fn parse_children(&mut self, depth: usize) -> ParseResult<Vec<Node>> {
        match self.peek_depth()? {
            Some((_, line_depth)) if line_depth > depth => self.parse_nodes(depth + 1),
            _ => Ok(Vec::new()),
        }
    }

    /// Error out if an indented block follows a node that can't take one.
    fn ensure_no_children(&mut self, depth: usize, what: &str) -> ParseResult<()> {
        if let Some((idx, line_depth)) = self.peek_depth()? {
            if line_depth > depth {
                return Err(HamlError::IllegalNesting {
                    message: format!("nesting within {} is illegal", what),
                    line: idx + 1,
                });
            }
        }
        Ok(())
    }

    /// Consume an indented block without interpreting it (`-#` bodies).
    fn skip_block(&mut self, depth: usize) {
        while self.pos < self.lines.len() {
            let line = self.lines[self.pos];
            if !line.trim().is_empty() && leading_spaces(line) <= depth * 2 {
                break;
            }
            self.pos += 1;
        }
    }

    /// Capture a raw filter body: every following line deeper than the
    /// filter marker, dedented one level past it. Interior blank lines are
    /// preserved; trailing blank lines are dropped.
    fn capture_filter_body(&mut self, depth: usize) -> String {
        let dedent = (depth + 1) * 2;
        let mut body: Vec<String> = Vec::new();
        while self.pos < self.lines.len() {
            let line = self.lines[self.pos];
            if line.trim().is_empty() {
                body.push(String::new());
                self.pos += 1;
                continue;
            }
            let spaces = leading_spaces(line);
            if spaces <= depth * 2 {
                break;
            }
            body.push(line[spaces.min(dedent)..].to_string());
            self.pos += 1;
        }
        while body.last().is_some_and(|l| l.is_empty()) {
            body.pop();
        }
        body.join("\n")
    }

    /// Find the next non-blank line and its depth, without consuming it.
    fn peek_depth(&self) -> ParseResult<Option<(usize, usize)>> {
        let mut idx = self.pos;
        while idx < self.lines.len() {
            let line = self.lines[idx];
            if line.trim().is_empty() {
                idx += 1;
                continue;
            }
            return Ok(Some((idx, self.depth_of(idx)?)));
        }
        Ok(None)
    }

    /// Indentation depth of a non-blank line, validating the two-space rule.
    fn depth_of(&self, idx: usize) -> ParseResult<usize> {
        let line = self.lines[idx];
        let mut spaces = 0;
        for ch in line.chars() {
            match ch {
                ' ' => spaces += 1,
                '\t' => {
                    return Err(HamlError::Indentation {
                        message: "tabs are not allowed for indentation".to_string(),
                        line: idx + 1,
                    });
                }
                _ => break,
            }
        }
        if spaces % 2 != 0 {
            return Err(HamlError::Indentation {
                message: format!("{} space(s) is not a whole number of two-space levels", spaces),
                line: idx + 1,
            });
        }
        Ok(spaces / 2)
    }
}

fn control_keyword(text: &str) -> Option<String> {
    let word = text.split_whitespace().next()?;
    CONTROL_KEYWORDS
        .contains(&word)
        .then(|| word.to_string())
}

fn is_tag_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_' || c == ':'
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_'
}

fn leading_spaces(line: &str) -> usize {
    line.chars().take_while(|&c| c == ' ').count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_one(source: &str) -> Node {
        let doc = parse(source).unwrap();
        assert_eq!(doc.children.len(), 1, "expected exactly one root node");
        doc.children.into_iter().next().unwrap()
    }

    fn as_tag(node: Node) -> Tag {
        match node {
            Node::Tag(tag) => tag,
            other => panic!("expected Tag, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_simple_tag() {
        let tag = as_tag(parse_one("%div"));
        assert_eq!(tag.name, "div");
        assert!(tag.attributes.is_empty());
        assert!(!tag.self_closing);
        assert!(tag.children.is_empty());
    }

    #[test]
    fn test_parse_shorthand_folds_into_attributes() {
        let tag = as_tag(parse_one("%div.foo.bar#baz"));
        assert_eq!(tag.attributes.get("class").map(String::as_str), Some("foo bar"));
        assert_eq!(tag.attributes.get("id").map(String::as_str), Some("baz"));
    }

    #[test]
    fn test_implicit_div() {
        let tag = as_tag(parse_one(".card"));
        assert_eq!(tag.name, "div");
        assert_eq!(tag.attributes.get("class").map(String::as_str), Some("card"));
    }

    #[test]
    fn test_last_id_wins() {
        let tag = as_tag(parse_one("%div#one#two"));
        assert_eq!(tag.attributes.get("id").map(String::as_str), Some("two"));
    }

    #[test]
    fn test_attribute_hash_captured_verbatim() {
        let tag = as_tag(parse_one("%div{ data: { action: \"x\" }, id: dom_id }"));
        assert_eq!(
            tag.dynamic_attributes.old.as_deref(),
            Some("data: { action: \"x\" }, id: dom_id")
        );
        assert!(tag.dynamic_attributes.new.is_none());
    }

    #[test]
    fn test_multiline_attribute_hash() {
        let tag = as_tag(parse_one("%div{ a: 1,\n      b: 2 }"));
        assert_eq!(tag.dynamic_attributes.old.as_deref(), Some("a: 1, b: 2"));
    }

    #[test]
    fn test_brace_inside_string_does_not_close_hash() {
        let tag = as_tag(parse_one("%div{ title: \"a } b\" }"));
        assert_eq!(tag.dynamic_attributes.old.as_deref(), Some("title: \"a } b\""));
    }

    #[test]
    fn test_interpolation_inside_attribute_string() {
        let tag = as_tag(parse_one("%div{ title: \"x#{f(\"}\")}\" }"));
        assert_eq!(
            tag.dynamic_attributes.old.as_deref(),
            Some("title: \"x#{f(\"}\")}\"")
        );
    }

    #[test]
    fn test_object_reference() {
        let tag = as_tag(parse_one("%tr[@item, :row]"));
        assert_eq!(tag.object_ref.as_deref(), Some("@item, :row"));
    }

    #[test]
    fn test_self_closing_marker() {
        let tag = as_tag(parse_one("%br/"));
        assert!(tag.self_closing);
    }

    #[test]
    fn test_inline_value_and_script_value() {
        let tag = as_tag(parse_one("%p hello"));
        assert_eq!(tag.value.as_deref(), Some("hello"));
        assert!(!tag.parse);

        let tag = as_tag(parse_one("%p= user.name"));
        assert_eq!(tag.value.as_deref(), Some("user.name"));
        assert!(tag.parse);
    }

    #[test]
    fn test_nesting() {
        let doc = parse("%ul\n  %li one\n  %li two").unwrap();
        let tag = as_tag(doc.children.into_iter().next().unwrap());
        assert_eq!(tag.children.len(), 2);
    }

    #[test]
    fn test_else_reparented_under_if() {
        let doc = parse("- if a\n  %p A\n- else\n  %p B").unwrap();
        assert_eq!(doc.children.len(), 1);
        let Node::SilentScript(opener) = &doc.children[0] else {
            panic!("expected silent script");
        };
        assert_eq!(opener.keyword.as_deref(), Some("if"));
        // %p A plus the re-parented else.
        assert_eq!(opener.children.len(), 2);
        let Node::SilentScript(cont) = &opener.children[1] else {
            panic!("expected re-parented else");
        };
        assert_eq!(cont.keyword.as_deref(), Some("else"));
        assert_eq!(cont.children.len(), 1);
    }

    #[test]
    fn test_else_without_opener_is_error() {
        let err = parse("- else\n  %p B").unwrap_err();
        assert!(matches!(err, HamlError::Syntax { line: 1, .. }));
    }

    #[test]
    fn test_filter_body_dedented() {
        let doc = parse(":javascript\n  alert(1);\n    nested();\n%p after").unwrap();
        let Node::Filter(filter) = &doc.children[0] else {
            panic!("expected filter");
        };
        assert_eq!(filter.name, "javascript");
        assert_eq!(filter.text, "alert(1);\n  nested();");
        assert!(matches!(doc.children[1], Node::Tag(_)));
    }

    #[test]
    fn test_haml_comment_swallows_block() {
        let doc = parse("-# note\n  %p hidden\n%p shown").unwrap();
        assert_eq!(doc.children.len(), 2);
        assert!(matches!(doc.children[0], Node::HamlComment));
        assert!(matches!(doc.children[1], Node::Tag(_)));
    }

    #[test]
    fn test_doctype_forms() {
        let Node::Doctype(d) = parse_one("!!! XML") else {
            panic!()
        };
        assert_eq!(d.kind, DoctypeKind::Xml { encoding: None });

        let Node::Doctype(d) = parse_one("!!! XML iso-8859-1") else {
            panic!()
        };
        assert_eq!(
            d.kind,
            DoctypeKind::Xml {
                encoding: Some("iso-8859-1".to_string())
            }
        );

        let Node::Doctype(d) = parse_one("!!! Strict") else {
            panic!()
        };
        assert_eq!(d.kind, DoctypeKind::Html);
    }

    #[test]
    fn test_escaped_leading_character() {
        let Node::Plain(plain) = parse_one("\\= not code") else {
            panic!("expected plain text");
        };
        assert_eq!(plain.text, "= not code");
    }

    #[test]
    fn test_tab_indentation_rejected() {
        let err = parse("%ul\n\t%li one").unwrap_err();
        assert!(matches!(err, HamlError::Indentation { line: 2, .. }));
    }

    #[test]
    fn test_odd_indentation_rejected() {
        let err = parse("%ul\n   %li one").unwrap_err();
        assert!(matches!(err, HamlError::Indentation { line: 2, .. }));
    }

    #[test]
    fn test_over_indentation_rejected() {
        let err = parse("%ul\n    %li one").unwrap_err();
        assert!(matches!(err, HamlError::Indentation { line: 2, .. }));
    }

    #[test]
    fn test_inline_content_with_children_rejected() {
        let err = parse("%p hello\n  %span nested").unwrap_err();
        assert!(matches!(err, HamlError::IllegalNesting { line: 2, .. }));
    }

    #[test]
    fn test_unclosed_attributes_rejected() {
        let err = parse("%div{ a: 1").unwrap_err();
        assert!(matches!(err, HamlError::UnclosedAttributes { line: 1 }));
    }

    #[test]
    fn test_comment_with_children() {
        let doc = parse("/\n  %p hidden from old browsers").unwrap();
        let Node::Comment(comment) = &doc.children[0] else {
            panic!("expected comment");
        };
        assert!(comment.text.is_empty());
        assert_eq!(comment.children.len(), 1);
    }
}

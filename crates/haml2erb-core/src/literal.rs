/*
 * literal.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Recognizer for the fully-static subset of Ruby literals that can appear
//! in an attribute hash.
//!
//! `parse_hash` and `parse_value` return `None` for anything that needs
//! runtime evaluation: method calls, variables, ternaries, interpolated
//! strings, splats — and `nil`, deliberately, so nil-omission is decided per
//! key by the fallback scanner rather than for the hash as a whole. A parse
//! failure is never an error here; "not static" is a normal answer.

/// A fully-resolved literal value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Str(String),
    Symbol(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Seq(Vec<Value>),
    Map(Vec<(Key, Value)>),
}

/// A hash key. Symbol keys get underscore-to-hyphen normalization when they
/// become attribute names; string keys are emitted verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct Key {
    pub name: String,
    pub symbol: bool,
}

impl Value {
    /// The text form of a scalar, or `None` for sequences and maps.
    pub fn as_scalar_text(&self) -> Option<String> {
        match self {
            Value::Str(s) => Some(s.clone()),
            Value::Symbol(s) => Some(s.clone()),
            Value::Int(i) => Some(i.to_string()),
            Value::Float(f) => Some(f.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Seq(_) | Value::Map(_) => None,
        }
    }

    /// JSON rendering used for non-class array attribute values.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Str(s) | Value::Symbol(s) => serde_json::Value::String(s.clone()),
            Value::Int(i) => serde_json::Value::from(*i),
            Value::Float(f) => {
                serde_json::Number::from_f64(*f).map_or(serde_json::Value::Null, serde_json::Value::Number)
            }
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Seq(items) => serde_json::Value::Array(items.iter().map(Value::to_json).collect()),
            Value::Map(entries) => serde_json::Value::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.name.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }
}

/// Parse a whole hash fragment (the text between `{` and `}`, braces
/// optional). `None` means the fragment is not fully static.
pub fn parse_hash(text: &str) -> Option<Vec<(Key, Value)>> {
    let mut cur = Cursor::new(text);
    cur.skip_ws();
    let wrapped = cur.eat('{');
    let entries = hash_entries(&mut cur, wrapped.then_some('}'))?;
    if wrapped && !cur.eat('}') {
        return None;
    }
    cur.skip_ws();
    cur.done().then_some(entries)
}

/// Parse a single trimmed value fragment. `None` means dynamic.
pub fn parse_value(text: &str) -> Option<Value> {
    let mut cur = Cursor::new(text);
    let value = value(&mut cur)?;
    cur.skip_ws();
    cur.done().then_some(value)
}

struct Cursor {
    chars: Vec<char>,
    pos: usize,
}

impl Cursor {
    fn new(text: &str) -> Self {
        Self {
            chars: text.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.pos += 1;
        }
    }

    fn done(&self) -> bool {
        self.pos >= self.chars.len()
    }

    /// A scalar must be followed by whitespace, a separator or the end.
    fn at_boundary(&self) -> bool {
        match self.peek() {
            None => true,
            Some(',') | Some('}') | Some(']') => true,
            Some(c) => c.is_whitespace(),
        }
    }
}

fn hash_entries(cur: &mut Cursor, terminator: Option<char>) -> Option<Vec<(Key, Value)>> {
    let mut entries = Vec::new();
    loop {
        cur.skip_ws();
        match (terminator, cur.peek()) {
            (Some(t), Some(c)) if c == t => break,
            (None, None) => break,
            (Some(_), None) => return None,
            _ => {}
        }
        let key = key(cur)?;
        let val = value(cur)?;
        entries.push((key, val));
        cur.skip_ws();
        if cur.eat(',') {
            continue;
        }
        match (terminator, cur.peek()) {
            (Some(t), Some(c)) if c == t => {}
            (None, None) => {}
            _ => return None,
        }
    }
    Some(entries)
}

fn key(cur: &mut Cursor) -> Option<Key> {
    match cur.peek()? {
        ':' => {
            cur.bump();
            let name = if matches!(cur.peek(), Some('"') | Some('\'')) {
                string_content(cur)?
            } else {
                ident(cur)?
            };
            expect_arrow(cur)?;
            Some(Key { name, symbol: true })
        }
        '"' | '\'' => {
            let name = string_content(cur)?;
            // Either `"key" => v` or the quoted shorthand `"key": v`; both
            // keep the key string-typed (no underscore rewriting).
            if cur.eat(':') {
                Some(Key {
                    name,
                    symbol: false,
                })
            } else {
                expect_arrow(cur)?;
                Some(Key {
                    name,
                    symbol: false,
                })
            }
        }
        c if c.is_ascii_alphabetic() || c == '_' => {
            let name = ident(cur)?;
            // New-style `key: value`; the colon binds without whitespace.
            cur.eat(':').then_some(Key { name, symbol: true })
        }
        _ => None,
    }
}

fn expect_arrow(cur: &mut Cursor) -> Option<()> {
    cur.skip_ws();
    (cur.eat('=') && cur.eat('>')).then_some(())
}

fn value(cur: &mut Cursor) -> Option<Value> {
    cur.skip_ws();
    match cur.peek()? {
        '{' => {
            cur.bump();
            let entries = hash_entries(cur, Some('}'))?;
            cur.eat('}').then_some(Value::Map(entries))
        }
        '[' => {
            cur.bump();
            let mut items = Vec::new();
            loop {
                cur.skip_ws();
                if cur.eat(']') {
                    break;
                }
                if !items.is_empty() {
                    if !cur.eat(',') {
                        return None;
                    }
                    cur.skip_ws();
                    if cur.eat(']') {
                        break;
                    }
                }
                items.push(value(cur)?);
            }
            Some(Value::Seq(items))
        }
        '"' | '\'' => {
            let content = string_content(cur)?;
            cur.at_boundary().then_some(Value::Str(content))
        }
        ':' => {
            cur.bump();
            let name = if matches!(cur.peek(), Some('"') | Some('\'')) {
                string_content(cur)?
            } else {
                ident(cur)?
            };
            cur.at_boundary().then_some(Value::Symbol(name))
        }
        c if c == '-' || c.is_ascii_digit() => number(cur),
        c if c.is_ascii_alphabetic() || c == '_' => {
            let word = ident(cur)?;
            if !cur.at_boundary() {
                return None;
            }
            match word.as_str() {
                "true" => Some(Value::Bool(true)),
                "false" => Some(Value::Bool(false)),
                // nil and every other bare word need runtime treatment.
                _ => None,
            }
        }
        _ => None,
    }
}

/// Consume a string literal and return its unescaped content. Only `\"`,
/// `\'` and `\\` are rewritten; other escape sequences pass through raw. A
/// `#{` anywhere makes the string dynamic.
fn string_content(cur: &mut Cursor) -> Option<String> {
    let quote = cur.bump()?;
    let mut out = String::new();
    loop {
        let c = cur.bump()?;
        if c == '\\' {
            let next = cur.bump()?;
            match next {
                '"' if quote == '"' => out.push('"'),
                '\'' if quote == '\'' => out.push('\''),
                '\\' => out.push('\\'),
                other => {
                    out.push('\\');
                    out.push(other);
                }
            }
        } else if c == quote {
            return Some(out);
        } else if c == '#' && cur.peek() == Some('{') {
            return None;
        } else {
            out.push(c);
        }
    }
}

fn ident(cur: &mut Cursor) -> Option<String> {
    let mut out = String::new();
    match cur.peek()? {
        c if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return None,
    }
    while let Some(c) = cur.peek() {
        if c.is_ascii_alphanumeric() || c == '_' {
            out.push(c);
            cur.bump();
        } else {
            break;
        }
    }
    if matches!(cur.peek(), Some('?') | Some('!')) {
        out.push(cur.bump().unwrap());
    }
    Some(out)
}

fn number(cur: &mut Cursor) -> Option<Value> {
    let mut text = String::new();
    if cur.peek() == Some('-') {
        text.push(cur.bump().unwrap());
    }
    while let Some(c) = cur.peek() {
        if c.is_ascii_digit() || c == '_' || c == '.' {
            text.push(c);
            cur.bump();
        } else {
            break;
        }
    }
    if !cur.at_boundary() {
        return None;
    }
    let cleaned = text.replace('_', "");
    if cleaned.contains('.') {
        cleaned.parse::<f64>().ok().map(Value::Float)
    } else {
        cleaned.parse::<i64>().ok().map(Value::Int)
    }
}

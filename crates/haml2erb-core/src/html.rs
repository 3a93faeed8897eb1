/*
 * html.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! HTML vocabulary shared by the emitter and the attribute builder.

/// Elements that never take a closing tag.
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Attributes that render as a bare name when true and disappear when false.
pub const BOOLEAN_ATTRIBUTES: &[&str] = &[
    "allowfullscreen",
    "async",
    "autofocus",
    "autoplay",
    "checked",
    "controls",
    "default",
    "defer",
    "disabled",
    "formnovalidate",
    "hidden",
    "inert",
    "ismap",
    "itemscope",
    "loop",
    "multiple",
    "muted",
    "nomodule",
    "novalidate",
    "open",
    "playsinline",
    "readonly",
    "required",
    "reversed",
    "scoped",
    "seamless",
    "selected",
];

pub fn is_void_element(name: &str) -> bool {
    VOID_ELEMENTS.contains(&name)
}

pub fn is_boolean_attribute(name: &str) -> bool {
    BOOLEAN_ATTRIBUTES.contains(&name)
}

/// Escape a double-quoted attribute value. Only `&` and `"` are encoded:
/// HTML5 permits `<` and `>` inside quoted attribute values, and action
/// strings like `change->form#submit` must stay readable.
pub fn escape_attribute(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '&' => "&amp;".to_string(),
            '"' => "&quot;".to_string(),
            _ => c.to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_attribute() {
        assert_eq!(escape_attribute("a & \"b\""), "a &amp; &quot;b&quot;");
        assert_eq!(escape_attribute("change->form#submit"), "change->form#submit");
    }

    #[test]
    fn test_void_elements() {
        assert!(is_void_element("br"));
        assert!(is_void_element("input"));
        assert!(!is_void_element("div"));
    }

    #[test]
    fn test_boolean_attributes() {
        assert!(is_boolean_attribute("disabled"));
        assert!(!is_boolean_attribute("aria-expanded"));
        assert!(!is_boolean_attribute("value"));
    }
}

//! Minimal tag/attribute scanner for directive blocks.
//!
//! A directive is written in markdown with square brackets:
//!
//! ```text
//! [pic src="istanbul/IMG_1850.jpg" alt="Ferry" ratio="4:3" eager]
//! ```
//!
//! [`normalize_delimiters`] turns the brackets into angle brackets, and
//! [`scan_tag`] then reads the first `<pic ...>` tag it finds as an SGML-style
//! start tag. The scanner understands exactly what a directive needs:
//!
//! - a bare tag name (matched ASCII case-insensitively),
//! - `name="value"`, `name='value'` and `name=value` attributes,
//! - bare attributes such as `eager`, which map to the empty string,
//! - character references in values (`&amp;`, `&quot;`, `&#39;`, `&#x27;`, ...).
//!
//! There is no nesting and no comment or CDATA handling. Attribute names are
//! kept as written; when a name repeats, the last value wins.

use std::collections::BTreeMap;

/// Attributes of one directive, keyed by attribute name.
pub type AttributeMap = BTreeMap<String, String>;

/// Replace directive brackets with angle brackets.
///
/// Brackets inside quoted attribute values are left alone, so
/// `[pic alt="a [b]"]` becomes `<pic alt="a [b]">`.
pub fn normalize_delimiters(block: &str) -> String {
    let mut out = String::with_capacity(block.len());
    let mut quote: Option<char> = None;
    for c in block.chars() {
        match (quote, c) {
            (Some(q), c) if c == q => {
                quote = None;
                out.push(c);
            }
            (Some(_), c) => out.push(c),
            (None, '"' | '\'') => {
                quote = Some(c);
                out.push(c);
            }
            (None, '[') => out.push('<'),
            (None, ']') => out.push('>'),
            (None, c) => out.push(c),
        }
    }
    out
}

/// Byte offset just past the `]` that closes a directive opening `block`.
///
/// Brackets inside quoted values do not count. Returns `None` when `block`
/// does not start with `[` or the directive is never closed.
pub fn directive_end(block: &str) -> Option<usize> {
    if !block.starts_with('[') {
        return None;
    }
    let mut quote: Option<char> = None;
    for (i, c) in block.char_indices().skip(1) {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, ']') => return Some(i + 1),
            (None, _) => {}
        }
    }
    None
}

/// Find the first `<tag ...>` in `text` and return its attributes.
///
/// Returns `None` when no start tag with that name exists. A tag whose name
/// merely starts with `tag` (e.g. `<picture>` when looking for `pic`) does
/// not match.
pub fn scan_tag(text: &str, tag: &str) -> Option<AttributeMap> {
    let mut cursor = Cursor::new(text);
    while cursor.skip_past('<') {
        let name = cursor.take_while(is_name_char);
        if !name.is_empty() && name.eq_ignore_ascii_case(tag) {
            return Some(cursor.attributes());
        }
    }
    None
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':' | '.')
}

fn is_attr_name_char(c: char) -> bool {
    !c.is_whitespace() && !matches!(c, '=' | '>' | '/' | '"' | '\'')
}

struct Cursor<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(text: &'a str) -> Self {
        Self { text, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.text[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    /// Advance past the next occurrence of `c`. Returns false at end of input.
    fn skip_past(&mut self, c: char) -> bool {
        match self.rest().find(c) {
            Some(offset) => {
                self.pos += offset + c.len_utf8();
                true
            }
            None => {
                self.pos = self.text.len();
                false
            }
        }
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if !pred(c) {
                break;
            }
            self.pos += c.len_utf8();
        }
        &self.text[start..self.pos]
    }

    fn skip_whitespace(&mut self) {
        self.take_while(char::is_whitespace);
    }

    /// Read attributes up to the closing `>` (or end of input).
    fn attributes(&mut self) -> AttributeMap {
        let mut attrs = AttributeMap::new();
        loop {
            self.skip_whitespace();
            match self.peek() {
                None | Some('>') => break,
                Some('/') => {
                    self.bump();
                    continue;
                }
                _ => {}
            }
            let name = self.take_while(is_attr_name_char);
            if name.is_empty() {
                // Stray quote or '=' with no name in front of it.
                self.bump();
                continue;
            }
            self.skip_whitespace();
            let value = if self.peek() == Some('=') {
                self.bump();
                self.skip_whitespace();
                self.value()
            } else {
                String::new()
            };
            attrs.insert(name.to_string(), value);
        }
        attrs
    }

    fn value(&mut self) -> String {
        let raw = match self.peek() {
            Some(q @ ('"' | '\'')) => {
                self.bump();
                let raw = self.take_while(|c| c != q);
                self.bump();
                raw
            }
            _ => self.take_while(|c| !c.is_whitespace() && c != '>'),
        };
        unescape(raw)
    }
}

/// Decode the character references a directive value may contain.
///
/// Unknown or malformed references are kept verbatim.
fn unescape(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_string();
    }
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let candidate = &rest[amp..];
        match candidate.find(';').and_then(|end| {
            decode_reference(&candidate[1..end]).map(|c| (c, end))
        }) {
            Some((c, end)) => {
                out.push(c);
                rest = &candidate[end + 1..];
            }
            None => {
                out.push('&');
                rest = &candidate[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_reference(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => {
            let code = if let Some(hex) = name.strip_prefix("#x").or(name.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok()?
            } else {
                name.strip_prefix('#')?.parse::<u32>().ok()?
            };
            char::from_u32(code)
        }
    }
}

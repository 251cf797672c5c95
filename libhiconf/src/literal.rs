//! Scalar coercion and quote-aware text helpers shared by all parsers.

use crate::value::{Node, Provenance};

/// Turn raw source text into a typed value.
///
/// Strict JSON literals win (`true`, `42`, `"quoted"`, `[1, 2]`); otherwise
/// a single- or double-quoted string is unquoted; anything else stays a raw
/// string.
pub fn coerce_value(raw: &str, provenance: &Provenance) -> Node {
    let raw = raw.trim();
    if let Ok(json) = serde_json::from_str::<serde_json::Value>(raw) {
        return Node::from_json(&json, provenance);
    }
    match unquote(raw) {
        Some(inner) => Node::string(inner, provenance),
        None => Node::string(raw, provenance),
    }
}

/// Strip matching outer quotes, unescaping `\<quote>` and `\\`.
pub fn unquote(s: &str) -> Option<String> {
    let quote = s.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    if s.len() < 2 || !s.ends_with(quote) {
        return None;
    }

    let inner = &s[1..s.len() - 1];
    let mut result = String::with_capacity(inner.len());
    let mut chars = inner.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.peek() {
                Some(&next) if next == quote || next == '\\' => {
                    result.push(next);
                    chars.next();
                }
                _ => result.push('\\'),
            }
        } else {
            result.push(c);
        }
    }
    Some(result)
}

/// Tracks whether a scan is inside a quoted run.
///
/// A quote only opens a run at the start of a token, so the apostrophe in
/// `Tom's` is plain text.
#[derive(Default)]
struct QuoteState {
    in_double: bool,
    in_single: bool,
    escape: bool,
    prev: Option<char>,
}

impl QuoteState {
    /// Feed one character; returns `true` if it is outside any quotes and
    /// is not itself a quote or escape.
    fn outside(&mut self, c: char) -> bool {
        let token_start = self
            .prev
            .map_or(true, |p| p.is_whitespace() || matches!(p, '[' | '{' | ',' | ':'));
        self.prev = Some(c);

        if self.escape {
            self.escape = false;
            return false;
        }
        if self.in_double || self.in_single {
            match c {
                '\\' => self.escape = true,
                '"' if self.in_double => self.in_double = false,
                '\'' if self.in_single => self.in_single = false,
                _ => {}
            }
            return false;
        }
        match c {
            '"' if token_start => {
                self.in_double = true;
                false
            }
            '\'' if token_start => {
                self.in_single = true;
                false
            }
            _ => true,
        }
    }
}

/// Strip a trailing `# comment` that sits outside quotes. The `#` must
/// start the text or follow whitespace, so `a#b` is kept whole.
pub fn strip_inline_comment(s: &str) -> &str {
    let mut state = QuoteState::default();
    let mut prev_is_space = true;
    for (i, c) in s.char_indices() {
        if state.outside(c) && c == '#' && prev_is_space {
            return s[..i].trim_end();
        }
        prev_is_space = c.is_whitespace();
    }
    s
}

/// Byte offset of the `key: value` separator: the first colon outside
/// quotes that is followed by whitespace or ends the line.
pub fn find_key_colon(s: &str) -> Option<usize> {
    let mut state = QuoteState::default();
    let mut iter = s.char_indices().peekable();
    while let Some((i, c)) = iter.next() {
        if state.outside(c) && c == ':' {
            match iter.peek() {
                None => return Some(i),
                Some((_, next)) if next.is_whitespace() => return Some(i),
                _ => {}
            }
        }
    }
    None
}

/// Extract a key name, removing surrounding quotes.
pub fn parse_key_name(s: &str) -> String {
    let s = s.trim();
    unquote(s).unwrap_or_else(|| s.to_string())
}

/// Split flow-list content on commas outside quotes and nested brackets.
pub fn split_flow_items(s: &str) -> Vec<&str> {
    let mut items = Vec::new();
    let mut state = QuoteState::default();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in s.char_indices() {
        if !state.outside(c) {
            continue;
        }
        match c {
            '[' | '{' => depth += 1,
            ']' | '}' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                items.push(s[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    items.push(s[start..].trim());
    items.retain(|item| !item.is_empty());
    items
}

/// Byte offset of the first `]` outside quotes that closes a flow list
/// whose opening bracket has already been consumed.
pub fn find_closing_bracket(s: &str) -> Option<usize> {
    let mut state = QuoteState::default();
    let mut depth = 0usize;
    for (i, c) in s.char_indices() {
        if !state.outside(c) {
            continue;
        }
        match c {
            '[' => depth += 1,
            ']' if depth == 0 => return Some(i),
            ']' => depth -= 1,
            _ => {}
        }
    }
    None
}

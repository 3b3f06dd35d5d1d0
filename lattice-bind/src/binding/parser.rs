//! Directive-table parser.
//!
//! Splits a directive table such as `text: name, css: {active: on}` into
//! ordered key/expression entries without understanding the expressions.
//! Literals and bracketed groups are first swapped out for `@ko_token_N@`
//! placeholders so their commas and colons are not mistaken for structure,
//! then the flat string is split on commas and each piece on its first
//! colon.

use smallvec::SmallVec;
use tracing::warn;

const PLACEHOLDER_PREFIX: &str = "@ko_token_";

type Tokens = SmallVec<[String; 8]>;

/// One entry of a parsed directive table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedEntry {
    /// `key: expression`, key unquoted and both halves trimmed.
    KeyValue { key: String, value: String },
    /// A piece with no usable colon, such as a bare flag name.
    Unknown(String),
}

impl ParsedEntry {
    pub fn key_value(key: impl Into<String>, value: impl Into<String>) -> Self {
        ParsedEntry::KeyValue {
            key: key.into(),
            value: value.into(),
        }
    }

    /// The entry's key, or the whole text of an unknown entry.
    pub fn key(&self) -> &str {
        match self {
            ParsedEntry::KeyValue { key, .. } => key,
            ParsedEntry::Unknown(text) => text,
        }
    }

    pub fn value(&self) -> Option<&str> {
        match self {
            ParsedEntry::KeyValue { value, .. } => Some(value),
            ParsedEntry::Unknown(_) => None,
        }
    }
}

/// Parse a directive table into its entries, in source order.
///
/// Parsing never fails. Unterminated literals and unbalanced brackets are
/// left in place and logged, which yields a best-effort split.
pub fn parse_object_literal(text: &str) -> Vec<ParsedEntry> {
    let mut text = text.trim();
    if text.len() < 3 {
        return Vec::new();
    }
    if let Some(inner) = text.strip_prefix('{') {
        text = inner.strip_suffix('}').unwrap_or(inner);
    }

    let mut tokens = Tokens::new();
    let flat = capture_literals(text, &mut tokens);
    let flat = capture_groups(&flat, &mut tokens);

    let mut entries = Vec::new();
    for piece in flat.split(',') {
        let colon = piece.find(':').filter(|&pos| pos > 0 && pos < piece.len() - 1);
        match colon {
            Some(pos) => {
                let key = strip_quotes(&restore(&piece[..pos], &tokens));
                let value = restore(&piece[pos + 1..], &tokens);
                entries.push(ParsedEntry::KeyValue { key, value });
            }
            None => {
                let bare = strip_quotes(&restore(piece, &tokens));
                if bare.is_empty() {
                    continue;
                }
                if !is_simple_name(&bare) {
                    warn!(entry = %bare, table = %text, "directive table entry has no key");
                }
                entries.push(ParsedEntry::Unknown(bare));
            }
        }
    }
    entries
}

/// True if an entry with `key` is present.
pub fn entries_contain_key(entries: &[ParsedEntry], key: &str) -> bool {
    entries.iter().any(|entry| entry.key() == key)
}

fn placeholder(index: usize) -> String {
    format!("{PLACEHOLDER_PREFIX}{index}@")
}

/// Swap quoted strings and slash-delimited runs for placeholders.
fn capture_literals(text: &str, tokens: &mut Tokens) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if !matches!(c, '"' | '\'' | '/') {
            out.push(c);
            i += 1;
            continue;
        }
        let end = (i + 1..chars.len()).find(|&j| chars[j] == c && chars[j - 1] != '\\');
        match end {
            Some(end) => {
                out.push_str(&placeholder(tokens.len()));
                tokens.push(chars[i..=end].iter().collect());
                i = end + 1;
            }
            None => {
                // A lone slash is division; only an open quote is suspect.
                if c != '/' {
                    warn!(table = %text, offset = i, "unterminated string literal in directive table");
                }
                out.extend(&chars[i..]);
                break;
            }
        }
    }
    out
}

fn closing_bracket(c: char) -> Option<char> {
    match c {
        '{' => Some('}'),
        '(' => Some(')'),
        '[' => Some(']'),
        _ => None,
    }
}

/// Swap balanced bracket groups for placeholders.
fn capture_groups(text: &str, tokens: &mut Tokens) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    while i < chars.len() {
        let open = chars[i];
        let Some(close) = closing_bracket(open) else {
            out.push(open);
            i += 1;
            continue;
        };
        let mut depth = 0usize;
        let mut end = None;
        for (j, &c) in chars.iter().enumerate().skip(i) {
            if c == open {
                depth += 1;
            } else if c == close {
                depth -= 1;
                if depth == 0 {
                    end = Some(j);
                    break;
                }
            }
        }
        match end {
            Some(end) => {
                out.push_str(&placeholder(tokens.len()));
                tokens.push(chars[i..=end].iter().collect());
                i = end + 1;
            }
            None => {
                warn!(table = %text, bracket = %open, "unbalanced bracket in directive table");
                out.extend(&chars[i..]);
                break;
            }
        }
    }
    out
}

/// Put captured tokens back, repeating until nothing changes, then trim.
fn restore(text: &str, tokens: &[String]) -> String {
    let mut current = text.to_string();
    // Each pass resolves one nesting level; a token can never need more
    // passes than there are tokens.
    for _ in 0..=tokens.len() {
        let next = replace_placeholders(&current, tokens);
        if next == current {
            break;
        }
        current = next;
    }
    current.trim().to_string()
}

fn replace_placeholders(text: &str, tokens: &[String]) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find(PLACEHOLDER_PREFIX) {
        out.push_str(&rest[..start]);
        let after = &rest[start + PLACEHOLDER_PREFIX.len()..];
        let digits = after
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(after.len());
        let token = after[..digits]
            .parse::<usize>()
            .ok()
            .and_then(|index| tokens.get(index));
        match (token, after[digits..].strip_prefix('@')) {
            (Some(token), Some(tail)) => {
                out.push_str(token);
                rest = tail;
            }
            _ => {
                out.push_str(PLACEHOLDER_PREFIX);
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

fn strip_quotes(text: &str) -> String {
    for quote in ['\'', '"'] {
        if let Some(inner) = text
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner.to_string();
        }
    }
    text.to_string()
}

fn is_simple_name(text: &str) -> bool {
    text.chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '_' | '$' | '.' | '-'))
}

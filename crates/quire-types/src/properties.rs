//! Text format of `key=value` property files.
//!
//! The format follows the classic Java properties conventions: `#` and `!`
//! start comments, keys end at the first unescaped `=`, `:` or whitespace,
//! a trailing backslash continues a logical line, and `\t`, `\n`, `\r`,
//! `\f` and `\uXXXX` escapes are understood. Files are UTF-8; non-ASCII
//! characters are written as-is rather than `\u`-escaped.

use crate::metadata::Metadata;

/// Parse property-file text into a map. Later duplicates win.
pub fn parse(text: &str) -> Metadata {
    let mut map = Metadata::new();
    let mut pending = String::new();
    let mut continuing = false;

    for raw in text.lines() {
        let line = raw.trim_start_matches([' ', '\t', '\u{c}']);
        if !continuing && (line.is_empty() || line.starts_with('#') || line.starts_with('!')) {
            continue;
        }

        if ends_with_continuation(line) {
            pending.push_str(&line[..line.len() - 1]);
            continuing = true;
            continue;
        }

        pending.push_str(line);
        continuing = false;
        let (key, value) = split_pair(&pending);
        map.insert(key, value);
        pending.clear();
    }

    // A continuation on the final line still yields a pair.
    if continuing && !pending.is_empty() {
        let (key, value) = split_pair(&pending);
        map.insert(key, value);
    }

    map
}

/// Render a map as property-file text, one `key=value` pair per line.
pub fn render(map: &Metadata) -> String {
    let mut out = String::new();
    for (key, value) in map {
        escape_into(&mut out, key, true);
        out.push('=');
        escape_into(&mut out, value, false);
        out.push('\n');
    }
    out
}

fn ends_with_continuation(line: &str) -> bool {
    let slashes = line.bytes().rev().take_while(|b| *b == b'\\').count();
    slashes % 2 == 1
}

fn split_pair(logical: &str) -> (String, String) {
    let mut chars = logical.char_indices();
    let mut key_end = logical.len();

    while let Some((i, c)) = chars.next() {
        match c {
            '\\' => {
                chars.next();
            }
            '=' | ':' | ' ' | '\t' | '\u{c}' => {
                key_end = i;
                break;
            }
            _ => {}
        }
    }

    let key = &logical[..key_end];
    let rest = logical[key_end..].trim_start_matches([' ', '\t', '\u{c}']);
    let rest = rest
        .strip_prefix('=')
        .or_else(|| rest.strip_prefix(':'))
        .unwrap_or(rest);
    let value = rest.trim_start_matches([' ', '\t', '\u{c}']);

    (unescape(key), unescape(value))
}

fn unescape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('f') => out.push('\u{c}'),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(decoded) => out.push(decoded),
                    None => {
                        out.push_str("\\u");
                        out.push_str(&hex);
                    }
                }
            }
            Some(other) => out.push(other),
            None => {}
        }
    }

    out
}

fn escape_into(out: &mut String, input: &str, is_key: bool) {
    for (i, c) in input.chars().enumerate() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{c}' => out.push_str("\\f"),
            '=' | ':' | '#' | '!' => {
                out.push('\\');
                out.push(c);
            }
            ' ' if is_key || i == 0 => out.push_str("\\ "),
            _ => out.push(c),
        }
    }
}

//! Flat-file content layouts.
//!
//! Each kind has a fixed line order and decoding is positional: a blank
//! line still occupies its field's slot.
//!
//! | kind      | lines                                              |
//! |-----------|----------------------------------------------------|
//! | entry     | title, body...                                     |
//! | comment   | author, email, url, body...                        |
//! | trackback | title, excerpt, url, blog name (extra lines ignored) |
//! | pingback  | title, url, blog name, excerpt...                  |
//!
//! Fields that must fit on one line have embedded line breaks replaced by
//! spaces on encode.

use quire_types::{Comment, EntryRef, Pingback, Trackback};

const NL: char = '\n';

fn single_line(value: &str) -> String {
    value.replace("\r\n", " ").replace(['\r', '\n'], " ")
}

fn normalize(text: &str) -> String {
    text.replace("\r\n", "\n")
}

/// Split into the first `fixed` lines plus whatever remains (one trailing
/// newline removed). Missing lines decode as empty strings.
fn split_fields(text: &str, fixed: usize) -> (Vec<String>, String) {
    let mut parts = text.splitn(fixed + 1, NL);
    let mut fields = Vec::with_capacity(fixed);
    for _ in 0..fixed {
        fields.push(parts.next().unwrap_or("").to_string());
    }
    let rest = parts.next().unwrap_or("");
    let rest = rest.strip_suffix(NL).unwrap_or(rest);
    (fields, rest.to_string())
}

// ---------------------------------------------------------------------------
// Entry
// ---------------------------------------------------------------------------

/// An entry without a title is stored as its body alone.
pub fn encode_entry(title: &str, body: &str) -> String {
    if title.is_empty() {
        body.to_string()
    } else {
        format!("{}{NL}{}", single_line(title), body)
    }
}

/// Returns `(title, body)`. The first line is always read as the title.
pub fn decode_entry(text: &str) -> (String, String) {
    let text = normalize(text);
    match text.split_once(NL) {
        Some((title, body)) => (title.to_string(), body.to_string()),
        None => (text, String::new()),
    }
}

// ---------------------------------------------------------------------------
// Comment
// ---------------------------------------------------------------------------

pub fn encode_comment(comment: &Comment) -> String {
    let mut out = String::new();
    for field in [&comment.author, &comment.author_email, &comment.author_url] {
        out.push_str(&single_line(field.trim()));
        out.push(NL);
    }
    out.push_str(comment.body.trim());
    out.push(NL);
    out
}

pub fn decode_comment(entry: EntryRef, text: &str) -> Comment {
    let (fields, body) = split_fields(&normalize(text), 3);
    let [author, email, url]: [String; 3] = fields.try_into().unwrap_or_default();
    Comment::new(entry, author, email, url, body)
}

// ---------------------------------------------------------------------------
// Trackback
// ---------------------------------------------------------------------------

pub fn encode_trackback(trackback: &Trackback) -> String {
    let mut out = String::new();
    for field in [
        &trackback.title,
        &trackback.excerpt,
        &trackback.url,
        &trackback.blog_name,
    ] {
        out.push_str(&single_line(field));
        out.push(NL);
    }
    out
}

pub fn decode_trackback(entry: EntryRef, text: &str) -> Trackback {
    let (fields, _ignored) = split_fields(&normalize(text), 4);
    let [title, excerpt, url, blog_name]: [String; 4] = fields.try_into().unwrap_or_default();
    Trackback::new(entry, title, excerpt, url, blog_name)
}

// ---------------------------------------------------------------------------
// Pingback
// ---------------------------------------------------------------------------

pub fn encode_pingback(pingback: &Pingback) -> String {
    let mut out = String::new();
    for field in [&pingback.title, &pingback.url, &pingback.blog_name] {
        out.push_str(&single_line(field));
        out.push(NL);
    }
    out.push_str(&pingback.excerpt);
    out.push(NL);
    out
}

pub fn decode_pingback(entry: EntryRef, text: &str) -> Pingback {
    let (fields, excerpt) = split_fields(&normalize(text), 3);
    let [title, url, blog_name]: [String; 3] = fields.try_into().unwrap_or_default();
    Pingback::new(entry, title, url, blog_name, excerpt)
}

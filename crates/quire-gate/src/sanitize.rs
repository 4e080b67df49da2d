//! Comment text cleanup.
//!
//! The body is HTML-escaped in full first. A second pass then looks for
//! escaped tags (`&lt;b&gt;`) that are on the allow-list and turns only
//! those back into live markup. Anything not matched stays escaped, so a
//! tag missing from the list can never come out live. Malformed or
//! overlapping tags are not repaired.

use crate::config::GateConfig;

const LT: &str = "&lt;";
const GT: &str = "&gt;";

/// Escape the five HTML-significant characters.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

/// Drop CR and LF.
pub fn strip_line_terminators(input: &str) -> String {
    input.chars().filter(|c| *c != '\r' && *c != '\n').collect()
}

/// Author name or e-mail: trimmed, single line, escaped.
pub fn clean_field(input: &str) -> String {
    escape_html(strip_line_terminators(input).trim())
}

/// Author URL: trimmed, single line, given `http://` when it has no scheme.
pub fn normalize_url(input: &str) -> String {
    let url = strip_line_terminators(input);
    let url = url.trim();
    if url.is_empty() {
        return String::new();
    }
    let lower = url.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        escape_html(url)
    } else {
        escape_html(&format!("http://{url}"))
    }
}

/// Replace each newline with `<br />`. Runs before escaping, so the break
/// survives only if `br` is allowed.
pub fn autoformat(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\n', "<br />")
}

/// One entry of the allow-list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AllowedTag {
    /// `<tag>` and `</tag>`, no attributes.
    Balanced(String),
    /// `<tag>`, `<tag/>` or `<tag />`, emitted as `<tag />`.
    Unbalanced(String),
    /// `<a href=...>` with a single attribute, and `</a>`.
    Link,
}

impl AllowedTag {
    /// Live markup for the escaped tag body `inner` (the text between
    /// `&lt;` and `&gt;`), if this entry allows it.
    fn restore(&self, inner: &str) -> Option<String> {
        match self {
            Self::Balanced(tag) => {
                if inner.eq_ignore_ascii_case(tag) {
                    Some(format!("<{tag}>"))
                } else if inner.strip_prefix('/').is_some_and(|rest| rest.eq_ignore_ascii_case(tag)) {
                    Some(format!("</{tag}>"))
                } else {
                    None
                }
            }
            Self::Unbalanced(tag) => {
                let rest = strip_prefix_ignore_case(inner, tag)?;
                rest.trim_start()
                    .chars()
                    .all(|c| c == '/')
                    .then(|| format!("<{tag} />"))
            }
            Self::Link => {
                if inner.eq_ignore_ascii_case("/a") {
                    return Some("</a>".to_string());
                }
                let target = strip_prefix_ignore_case(inner, "a href=")?;
                if target.is_empty() || target.chars().any(char::is_whitespace) {
                    return None;
                }
                Some(format!("<a href={target}>"))
            }
        }
    }
}

fn strip_prefix_ignore_case<'a>(input: &'a str, prefix: &str) -> Option<&'a str> {
    let head = input.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix).then(|| &input[prefix.len()..])
}

/// The escape-then-restore filter.
#[derive(Clone, Debug)]
pub struct Sanitizer {
    allowed: Vec<AllowedTag>,
}

impl Default for Sanitizer {
    fn default() -> Self {
        Self::new(&GateConfig::default())
    }
}

impl Sanitizer {
    pub fn new(config: &GateConfig) -> Self {
        let mut allowed: Vec<AllowedTag> = config
            .allowed_balanced_tags
            .iter()
            .map(|t| AllowedTag::Balanced(t.to_ascii_lowercase()))
            .collect();
        allowed.extend(
            config
                .allowed_unbalanced_tags
                .iter()
                .map(|t| AllowedTag::Unbalanced(t.to_ascii_lowercase())),
        );
        if config.allow_links {
            allowed.push(AllowedTag::Link);
        }
        Self { allowed }
    }

    pub fn allowed(&self) -> &[AllowedTag] {
        &self.allowed
    }

    /// Escape `input` and restore allowed tags.
    pub fn sanitize(&self, input: &str) -> String {
        let restored = self.restore(&escape_html(input));
        restored
            .replace("&amp;lt;", "&lt;")
            .replace("&amp;gt;", "&gt;")
            .replace("&amp;#", "&#")
    }

    fn restore(&self, escaped: &str) -> String {
        let mut out = String::with_capacity(escaped.len());
        let mut rest = escaped;
        while let Some(pos) = rest.find(LT) {
            out.push_str(&rest[..pos]);
            let after = &rest[pos + LT.len()..];
            match self.match_tag(after) {
                Some((markup, consumed)) => {
                    out.push_str(&markup);
                    rest = &after[consumed..];
                }
                None => {
                    out.push_str(LT);
                    rest = after;
                }
            }
        }
        out.push_str(rest);
        out
    }

    fn match_tag(&self, after: &str) -> Option<(String, usize)> {
        let end = after.find(GT)?;
        let inner = &after[..end];
        if inner.contains(LT) || inner.contains('\n') {
            return None;
        }
        self.allowed
            .iter()
            .find_map(|tag| tag.restore(inner))
            .map(|markup| (markup, end + GT.len()))
    }
}

//! Telegram HTML helpers: escaping, tag-safe truncation, and the inverse
//! operations used to clean inbound directive text.

use std::fmt::Write as _;
use std::sync::LazyLock;

use regex::Regex;

/// Escape text for safe inclusion in Telegram HTML.
///
/// Escapes `&`, `<`, `>`, `"`, and `'` so the output is safe in both text
/// content and attributes.
#[must_use]
pub fn html_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Decode HTML entities (named basics plus decimal and hex references).
/// Unknown entities are left untouched.
#[must_use]
pub fn html_unescape(text: &str) -> String {
    static ENTITY: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"&(#[xX][0-9a-fA-F]{1,6}|#[0-9]{1,7}|[a-zA-Z]{2,6});").expect("invalid regex")
    });

    ENTITY
        .replace_all(text, |caps: &regex::Captures<'_>| {
            let body = &caps[1];
            let decoded = if let Some(hex) = body.strip_prefix("#x").or_else(|| body.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
            } else if let Some(dec) = body.strip_prefix('#') {
                dec.parse::<u32>().ok().and_then(char::from_u32)
            } else {
                match body {
                    "amp" => Some('&'),
                    "lt" => Some('<'),
                    "gt" => Some('>'),
                    "quot" => Some('"'),
                    "apos" => Some('\''),
                    "nbsp" => Some('\u{a0}'),
                    _ => None,
                }
            };
            decoded.map_or_else(|| caps[0].to_owned(), String::from)
        })
        .into_owned()
}

/// Remove every `<...>` tag, keeping inner text.
#[must_use]
pub fn strip_tags(text: &str) -> String {
    static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").expect("invalid regex"));
    TAG.replace_all(text, "").into_owned()
}

/// Shorten plain text to `keep` characters plus `marker` when it is longer
/// than `limit` characters.
#[must_use]
pub fn clip(text: &str, limit: usize, keep: usize, marker: &str) -> String {
    if text.chars().count() <= limit {
        return text.to_owned();
    }
    let mut out: String = text.chars().take(keep).collect();
    out.push_str(marker);
    out
}

/// Keep at most `max` characters of plain text.
#[must_use]
pub fn take_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

/// Byte offset of the `n`th character, or the string length.
fn char_offset(text: &str, n: usize) -> usize {
    text.char_indices().nth(n).map_or(text.len(), |(i, _)| i)
}

/// Find a safe truncation boundary in an HTML string at or before `max_len`
/// bytes.
///
/// Walks backwards from the char boundary until we're not inside a tag or
/// entity.
pub(crate) fn find_safe_html_boundary(html: &str, max_len: usize) -> usize {
    let mut boundary = html.floor_char_boundary(max_len.min(html.len()));

    while boundary > 0 {
        let bytes = &html.as_bytes()[..boundary];
        let last_open = bytes.iter().rposition(|&b| b == b'<');
        let last_close = bytes.iter().rposition(|&b| b == b'>');
        let inside_tag = match (last_open, last_close) {
            (Some(lt), Some(gt)) => lt > gt,
            (Some(_), None) => true,
            _ => false,
        };
        let last_amp = bytes.iter().rposition(|&b| b == b'&');
        let last_semi = bytes.iter().rposition(|&b| b == b';');
        let inside_entity = match (last_amp, last_semi) {
            (Some(amp), Some(semi)) => amp > semi,
            (Some(_), None) => true,
            _ => false,
        };

        if !inside_tag && !inside_entity {
            break;
        }
        boundary = html.floor_char_boundary(boundary.saturating_sub(1));
    }

    boundary
}

/// Close any unclosed HTML tags in a truncated HTML fragment.
pub(crate) fn close_open_tags(html: &str) -> String {
    static TAG_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"<(/?)(\w+)[^>]*>").expect("invalid regex"));

    let mut open_tags: Vec<String> = Vec::new();
    for cap in TAG_RE.captures_iter(html) {
        let is_close = &cap[1] == "/";
        let tag_name = cap[2].to_lowercase();
        if is_close {
            if let Some(pos) = open_tags.iter().rposition(|t| *t == tag_name) {
                open_tags.remove(pos);
            }
        } else {
            open_tags.push(tag_name);
        }
    }

    let mut result = html.to_string();
    for tag in open_tags.into_iter().rev() {
        let _ = write!(result, "</{tag}>");
    }
    result
}

/// Marker appended to text cut by [`truncate_html`].
pub const ELLIPSIS: char = '…';

/// Truncate Telegram HTML to at most `max_chars` characters without cutting
/// through a tag or entity, closing any tags left open.
///
/// A cut result always ends with [`ELLIPSIS`], placed after the closing tags.
#[must_use]
pub fn truncate_html(html: &str, max_chars: usize) -> String {
    if html.chars().count() <= max_chars {
        return html.to_owned();
    }
    if max_chars == 0 {
        return String::new();
    }

    let budget = max_chars.saturating_sub(1);
    let mut limit = budget;
    loop {
        let boundary = find_safe_html_boundary(html, char_offset(html, limit));
        let mut closed = close_open_tags(&html[..boundary]);
        let len = closed.chars().count();
        if len <= budget || limit == 0 {
            closed.push(ELLIPSIS);
            return closed;
        }
        // Leave room for the closing tags and try again.
        limit = limit.saturating_sub(len.saturating_sub(max_chars).max(1));
    }
}

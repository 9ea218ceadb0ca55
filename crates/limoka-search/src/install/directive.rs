//! Install directive parsing.

use std::sync::LazyLock;

use limoka_crypto::Signature;
use regex::Regex;

use crate::error::DirectiveError;
use crate::format::{html_unescape, strip_tags};

/// Hex length of an ed25519 signature.
pub const SIGNATURE_HEX_LEN: usize = 128;

static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"#limoka:([^\s"'<>]+)"#).expect("invalid regex"));

/// A parsed `#limoka:<path>:<signature>` tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallDirective {
    /// Normalised module path as written by the publisher.
    pub path: String,
    /// Publisher signature.
    pub signature: Signature,
}

/// Undo HTML markup residue when the message carries formatting entities.
#[must_use]
pub fn clean_text(text: &str, has_entities: bool) -> String {
    if has_entities {
        strip_tags(&html_unescape(text))
    } else {
        text.to_owned()
    }
}

/// Content of the first `#limoka:` tag.
#[must_use]
pub fn extract_tag(text: &str) -> Option<&str> {
    TAG_RE
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Strip quote and angle-bracket residue and a leading `href=`.
#[must_use]
pub fn normalize_path(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, '<' | '>' | '"' | '\''))
        .collect();
    let cleaned = cleaned.trim();
    cleaned
        .strip_prefix("href=")
        .unwrap_or(cleaned)
        .trim()
        .to_owned()
}

/// Parse tag content `path:signature`.
///
/// # Errors
///
/// Returns [`DirectiveError::InvalidFormat`] when the separator is missing,
/// either part is empty, or the signature is not 128 hex characters.
pub fn parse(tag: &str) -> Result<InstallDirective, DirectiveError> {
    let (path, signature) = tag.split_once(':').ok_or(DirectiveError::InvalidFormat)?;
    let path = normalize_path(path);
    if path.is_empty()
        || signature.len() != SIGNATURE_HEX_LEN
        || !signature.bytes().all(|b| b.is_ascii_hexdigit())
    {
        return Err(DirectiveError::InvalidFormat);
    }
    let signature = Signature::from_hex(signature).map_err(|_| DirectiveError::InvalidFormat)?;
    Ok(InstallDirective { path, signature })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sig() -> String {
        "ab".repeat(64)
    }

    #[test]
    fn extracts_first_tag() {
        let text = format!("install #limoka:tools/ping.py:{} and #limoka:x:y", sig());
        assert_eq!(
            extract_tag(&text),
            Some(format!("tools/ping.py:{}", sig()).as_str())
        );
        assert_eq!(extract_tag("nothing here"), None);
    }

    #[test]
    fn tag_stops_at_markup() {
        assert_eq!(extract_tag(r##"<a href="#limoka:a.py:ff">x</a>"##), Some("a.py:ff"));
    }

    #[test]
    fn clean_text_only_with_entities() {
        let raw = "<b>#limoka:a&#47;b.py:ff</b>";
        assert_eq!(clean_text(raw, false), raw);
        assert_eq!(clean_text(raw, true), "#limoka:a/b.py:ff");
    }

    #[test]
    fn parses_valid_directive() {
        let directive = parse(&format!("tools/ping.py:{}", sig())).unwrap();
        assert_eq!(directive.path, "tools/ping.py");
        assert_eq!(directive.signature.to_hex(), sig());
    }

    #[test]
    fn uppercase_signature_accepted() {
        assert!(parse(&format!("a.py:{}", sig().to_uppercase())).is_ok());
    }

    #[test]
    fn rejects_bad_shapes() {
        for tag in [
            "tools/ping.py".to_owned(),
            format!(":{}", sig()),
            "tools/ping.py:".to_owned(),
            format!("tools/ping.py:{}", &sig()[..126]),
            format!("tools/ping.py:{}zz", &sig()[..126]),
            format!("tools/ping.py:{}00", sig()),
        ] {
            assert!(
                matches!(parse(&tag), Err(DirectiveError::InvalidFormat)),
                "{tag}"
            );
        }
    }

    #[test]
    fn signature_split_on_first_colon_only() {
        // The path never contains ':' so extra colons end up in the signature.
        assert!(parse(&format!("a.py:{}:x", sig())).is_err());
    }

    #[test]
    fn normalizes_href_residue() {
        assert_eq!(normalize_path(r#"href="tools/ping.py"#), "tools/ping.py");
        assert_eq!(normalize_path(" 'a/b.py' "), "a/b.py");
    }
}

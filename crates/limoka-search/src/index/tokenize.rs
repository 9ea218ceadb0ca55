//! Text normalisation shared by indexing and querying.

/// Lowercase `text` and split it on every non-alphanumeric character.
pub(crate) fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Canonical form of a whole query for the wildcard and fuzzy stages:
/// its tokens joined by single spaces.
pub(crate) fn normalize(text: &str) -> String {
    tokenize(text).join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_punctuation_and_lowercases() {
        assert_eq!(
            tokenize("Ping-Pong: send_PING!"),
            vec!["ping", "pong", "send", "ping"]
        );
    }

    #[test]
    fn keeps_unicode_letters() {
        assert_eq!(tokenize("Привет мир"), vec!["привет", "мир"]);
    }

    #[test]
    fn empty_and_symbols_only() {
        assert!(tokenize("").is_empty());
        assert!(tokenize("  -- !! ").is_empty());
    }

    #[test]
    fn normalize_collapses() {
        assert_eq!(normalize("  Weather   Bot "), "weather bot");
    }
}

//! Query parsing: bare terms and double-quoted phrases.

use crate::error::QueryError;
use crate::index::tokenize::tokenize;

/// A parsed query. Each term and each phrase is one matchable unit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct ParsedQuery {
    pub(crate) terms: Vec<String>,
    pub(crate) phrases: Vec<Vec<String>>,
}

impl ParsedQuery {
    /// Parse `raw`. Quoted segments with a single token degrade to terms.
    pub(crate) fn parse(raw: &str) -> Result<Self, QueryError> {
        if raw.chars().filter(|&c| c == '"').count() % 2 != 0 {
            return Err(QueryError::UnbalancedQuote);
        }

        let mut parsed = Self::default();
        for (i, segment) in raw.split('"').enumerate() {
            let tokens = tokenize(segment);
            if i % 2 == 1 && tokens.len() > 1 {
                if !parsed.phrases.contains(&tokens) {
                    parsed.phrases.push(tokens);
                }
                continue;
            }
            for token in tokens {
                if !parsed.terms.contains(&token) {
                    parsed.terms.push(token);
                }
            }
        }
        Ok(parsed)
    }

    /// Number of matchable units.
    pub(crate) fn unit_count(&self) -> usize {
        self.terms.len().saturating_add(self.phrases.len())
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.unit_count() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terms_are_deduplicated() {
        let q = ParsedQuery::parse("ping Ping pong").unwrap();
        assert_eq!(q.terms, vec!["ping", "pong"]);
        assert!(q.phrases.is_empty());
    }

    #[test]
    fn phrases_are_extracted() {
        let q = ParsedQuery::parse(r#"weather "current temperature" bot"#).unwrap();
        assert_eq!(q.terms, vec!["weather", "bot"]);
        assert_eq!(q.phrases, vec![vec!["current", "temperature"]]);
        assert_eq!(q.unit_count(), 3);
    }

    #[test]
    fn single_token_phrase_becomes_term() {
        let q = ParsedQuery::parse(r#""ping""#).unwrap();
        assert_eq!(q.terms, vec!["ping"]);
        assert!(q.phrases.is_empty());
    }

    #[test]
    fn unbalanced_quote_is_rejected() {
        assert_eq!(
            ParsedQuery::parse(r#"ping "pong"#),
            Err(QueryError::UnbalancedQuote)
        );
    }

    #[test]
    fn punctuation_only_is_empty() {
        assert!(ParsedQuery::parse("!!! ???").unwrap().is_empty());
    }
}

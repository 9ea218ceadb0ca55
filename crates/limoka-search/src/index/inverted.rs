//! Inverted index over catalog documents and its three query stages.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::catalog::Catalog;
use crate::index::fuzzy::levenshtein_within;
use crate::index::query::ParsedQuery;
use crate::index::tokenize::{normalize, tokenize};

const BM25_K1: f64 = 1.2;
const BM25_B: f64 = 0.75;
/// Extra weight per additional matched unit (soft AND).
const COORDINATION: f64 = 0.8;
const TITLE_BOOST: f64 = 1.5;

/// Which stage of the fallback chain produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStage {
    /// BM25 over terms and phrases.
    Ranked,
    /// Substring match over the vocabulary or document text.
    Wildcard,
    /// Bounded edit distance over the vocabulary.
    Fuzzy,
}

/// Ordered, deduplicated result of one query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchHits {
    /// Stage that produced the hits; `None` when nothing matched.
    pub stage: Option<MatchStage>,
    /// Module paths, best first.
    pub paths: Vec<String>,
}

/// Limits applied to a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchOptions {
    /// Maximum number of paths returned.
    pub max_results: usize,
    /// Maximum edit distance of the fuzzy stage.
    pub fuzzy_max_distance: usize,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            max_results: 50,
            fuzzy_max_distance: 2,
        }
    }
}

impl From<&limoka_config::SearchSection> for SearchOptions {
    fn from(section: &limoka_config::SearchSection) -> Self {
        Self {
            max_results: section.max_results,
            fuzzy_max_distance: section.fuzzy_max_distance,
        }
    }
}

/// One indexed document. An entry contributes one document for itself and
/// one per command, all pointing at the entry's path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Document {
    path: String,
    title: String,
    content: String,
    len: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Posting {
    doc: usize,
    positions: Vec<usize>,
    in_title: bool,
}

/// Token → postings map with per-document statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InvertedIndex {
    docs: Vec<Document>,
    postings: BTreeMap<String, Vec<Posting>>,
    avg_len: f64,
}

impl InvertedIndex {
    /// Build the index for every entry of `catalog`.
    #[must_use]
    pub fn build(catalog: &Catalog) -> Self {
        let mut index = Self::default();
        for entry in catalog.iter() {
            index.add(&entry.path, &entry.name, join(&entry.name, entry.description.as_deref()));
            for command in &entry.commands {
                index.add(
                    &entry.path,
                    &entry.name,
                    join(&command.name, command.description.as_deref()),
                );
            }
        }

        let total: usize = index.docs.iter().map(|d| d.len).sum();
        index.avg_len = if index.docs.is_empty() {
            0.0
        } else {
            to_f64(total) / to_f64(index.docs.len())
        };
        index
    }

    fn add(&mut self, path: &str, title: &str, content: String) {
        let doc = self.docs.len();
        let title_tokens = tokenize(title);
        let tokens = tokenize(&content);

        let mut positions: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
        for (pos, token) in tokens.iter().enumerate() {
            positions.entry(token.as_str()).or_default().push(pos);
        }
        for (token, positions) in positions {
            let in_title = title_tokens.iter().any(|t| t == token);
            self.postings
                .entry(token.to_owned())
                .or_default()
                .push(Posting {
                    doc,
                    positions,
                    in_title,
                });
        }

        self.docs.push(Document {
            path: path.to_owned(),
            title: title.to_owned(),
            content,
            len: tokens.len(),
        });
    }

    /// Number of documents.
    #[must_use]
    pub fn document_count(&self) -> usize {
        self.docs.len()
    }

    /// Number of distinct tokens.
    #[must_use]
    pub fn term_count(&self) -> usize {
        self.postings.len()
    }

    /// Whether every catalog entry owns at least one document and every
    /// document points at a catalog entry.
    #[must_use]
    pub fn covers(&self, catalog: &Catalog) -> bool {
        self.docs.iter().all(|d| catalog.contains(&d.path))
            && catalog
                .iter()
                .all(|e| self.docs.iter().any(|d| d.path == e.path))
    }

    /// Run the fallback chain: ranked, then wildcard, then fuzzy.
    ///
    /// Malformed and empty queries yield no hits. Paths not present in
    /// `catalog` are dropped.
    #[must_use]
    pub fn search(&self, query: &str, catalog: &Catalog, options: SearchOptions) -> SearchHits {
        let Ok(parsed) = ParsedQuery::parse(query) else {
            tracing::debug!(query, "malformed query");
            return SearchHits::default();
        };
        let normalized = normalize(query);
        if parsed.is_empty() || normalized.is_empty() {
            return SearchHits::default();
        }

        let ranked = self.ranked(&parsed);
        let paths = self.rank_paths(ranked, catalog, options.max_results);
        if !paths.is_empty() {
            return SearchHits {
                stage: Some(MatchStage::Ranked),
                paths,
            };
        }

        let wildcard = self.wildcard(&normalized);
        let paths = self.rank_paths(wildcard, catalog, options.max_results);
        if !paths.is_empty() {
            return SearchHits {
                stage: Some(MatchStage::Wildcard),
                paths,
            };
        }

        let fuzzy = self.fuzzy(&normalized, options.fuzzy_max_distance);
        let paths = self.rank_paths(fuzzy, catalog, options.max_results);
        SearchHits {
            stage: (!paths.is_empty()).then_some(MatchStage::Fuzzy),
            paths,
        }
    }

    fn idf(&self, doc_freq: usize) -> f64 {
        let n = to_f64(self.docs.len());
        let df = to_f64(doc_freq);
        ((n - df + 0.5) / (df + 0.5)).ln_1p().max(0.0)
    }

    fn term_score(&self, idf: f64, posting: &Posting) -> f64 {
        let Some(doc) = self.docs.get(posting.doc) else {
            return 0.0;
        };
        let tf = to_f64(posting.positions.len());
        let length_norm = BM25_B.mul_add(to_f64(doc.len) / self.avg_len.max(1.0), 1.0 - BM25_B);
        let denom = BM25_K1.mul_add(length_norm, tf);
        if denom <= 0.0 {
            return 0.0;
        }
        let score = idf * (tf * (BM25_K1 + 1.0) / denom);
        if posting.in_title {
            score * TITLE_BOOST
        } else {
            score
        }
    }

    /// Stage 1: BM25 with a coordination factor over matched units.
    fn ranked(&self, query: &ParsedQuery) -> Vec<(usize, f64)> {
        let mut acc: HashMap<usize, (f64, usize)> = HashMap::new();
        let mut credit = |doc: usize, score: f64| {
            let slot = acc.entry(doc).or_insert((0.0, 0));
            slot.0 += score;
            slot.1 = slot.1.saturating_add(1);
        };

        for term in &query.terms {
            let Some(postings) = self.postings.get(term) else {
                continue;
            };
            let idf = self.idf(postings.len());
            for posting in postings {
                credit(posting.doc, self.term_score(idf, posting));
            }
        }

        for phrase in &query.phrases {
            let lists: Option<Vec<&Vec<Posting>>> =
                phrase.iter().map(|t| self.postings.get(t)).collect();
            let Some(lists) = lists else {
                continue;
            };
            let Some((head, tail)) = lists.split_first() else {
                continue;
            };
            for first in head.iter() {
                let rest: Vec<&Posting> = tail
                    .iter()
                    .filter_map(|list| {
                        list.binary_search_by_key(&first.doc, |p| p.doc)
                            .ok()
                            .and_then(|i| list.get(i))
                    })
                    .collect();
                if rest.len() != tail.len() || !consecutive(first, &rest) {
                    continue;
                }
                let score: f64 = std::iter::once(first)
                    .chain(rest.iter().copied())
                    .zip(lists.iter())
                    .map(|(posting, list)| self.term_score(self.idf(list.len()), posting))
                    .sum();
                credit(first.doc, score);
            }
        }

        acc.into_iter()
            .map(|(doc, (sum, matched))| {
                let extra = to_f64(matched.saturating_sub(1));
                (doc, sum * COORDINATION.mul_add(extra, 1.0))
            })
            .collect()
    }

    /// Stage 2: `*query*` over the vocabulary (one token) or the document
    /// text (several tokens).
    fn wildcard(&self, normalized: &str) -> Vec<(usize, f64)> {
        let mut scored = Vec::new();
        if normalized.contains(' ') {
            for (doc, document) in self.docs.iter().enumerate() {
                if normalize(&document.content).contains(normalized) {
                    scored.push((doc, 1.0));
                }
            }
            return scored;
        }

        let query_len = to_f64(normalized.chars().count());
        for (term, postings) in &self.postings {
            if !term.contains(normalized) {
                continue;
            }
            // Tighter matches rank higher.
            let closeness = query_len / to_f64(term.chars().count()).max(1.0);
            scored.extend(postings.iter().map(|p| (p.doc, closeness)));
        }
        scored
    }

    /// Stage 3: vocabulary terms sharing the first character and within
    /// `max_distance` edits.
    fn fuzzy(&self, normalized: &str, max_distance: usize) -> Vec<(usize, f64)> {
        let Some(first) = normalized.chars().next() else {
            return Vec::new();
        };
        let mut scored = Vec::new();
        for (term, postings) in &self.postings {
            if term.chars().next() != Some(first) {
                continue;
            }
            if let Some(distance) = levenshtein_within(normalized, term, max_distance) {
                let score = 1.0 / (1.0 + to_f64(distance));
                scored.extend(postings.iter().map(|p| (p.doc, score)));
            }
        }
        scored
    }

    /// Collapse document scores to paths (best document wins), order by
    /// score then path, and cap.
    fn rank_paths(&self, scored: Vec<(usize, f64)>, catalog: &Catalog, limit: usize) -> Vec<String> {
        let mut best: HashMap<&str, f64> = HashMap::new();
        for (doc, score) in scored {
            let Some(document) = self.docs.get(doc) else {
                continue;
            };
            if !catalog.contains(&document.path) {
                continue;
            }
            let slot = best.entry(document.path.as_str()).or_insert(f64::MIN);
            if score > *slot {
                *slot = score;
            }
        }

        let mut ranked: Vec<(&str, f64)> = best.into_iter().collect();
        ranked.sort_by(|a, b| score_ordering(*a, *b));
        ranked
            .into_iter()
            .take(limit)
            .map(|(path, _)| path.to_owned())
            .collect()
    }
}

fn score_ordering(a: (&str, f64), b: (&str, f64)) -> Ordering {
    b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0))
}

fn join(head: &str, tail: Option<&str>) -> String {
    match tail {
        Some(tail) => format!("{head} {tail}"),
        None => head.to_owned(),
    }
}

/// Whether `rest[k]` has a position `p + k + 1` for some position `p` of
/// `first`.
fn consecutive(first: &Posting, rest: &[&Posting]) -> bool {
    first.positions.iter().any(|&start| {
        rest.iter().enumerate().all(|(k, posting)| {
            start
                .checked_add(k)
                .and_then(|p| p.checked_add(1))
                .is_some_and(|expected| posting.positions.contains(&expected))
        })
    })
}

#[allow(
    clippy::cast_precision_loss,
    reason = "ranking scores are lossy floating-point values"
)]
const fn to_f64(value: usize) -> f64 {
    value as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"{
        "tools/ping.py": {
            "name": "Ping",
            "description": "Measure round trip latency to Telegram",
            "commands": [{"pingcmd": "Send a ping"}],
            "category": ["tools"]
        },
        "fun/weather.py": {
            "name": "Weather",
            "description": "Current temperature and forecast",
            "commands": [{"weathercmd": "Show the weather for a city"}],
            "category": ["fun", "info"]
        },
        "fun/dice.py": {
            "name": "Dice",
            "description": "Roll a dice with custom sides",
            "category": ["fun"]
        },
        "info/forecast.py": {
            "name": "Forecast Pro",
            "description": "Weekly forecast in the weather channel style",
            "category": ["info"]
        }
    }"#;

    fn setup() -> (Catalog, InvertedIndex) {
        let catalog = Catalog::from_manifest(MANIFEST.as_bytes()).unwrap();
        let index = InvertedIndex::build(&catalog);
        (catalog, index)
    }

    fn search(query: &str) -> SearchHits {
        let (catalog, index) = setup();
        index.search(query, &catalog, SearchOptions::default())
    }

    #[test]
    fn one_document_per_entry_and_command() {
        let (catalog, index) = setup();
        assert_eq!(index.document_count(), 6);
        assert!(index.covers(&catalog));
    }

    #[test]
    fn exact_name_is_first_and_alone() {
        let hits = search("ping");
        assert_eq!(hits.stage, Some(MatchStage::Ranked));
        assert_eq!(hits.paths, vec!["tools/ping.py"]);
    }

    #[test]
    fn every_name_finds_its_path() {
        let (catalog, index) = setup();
        for entry in catalog.iter() {
            let hits = index.search(&entry.name, &catalog, SearchOptions::default());
            assert!(hits.paths.contains(&entry.path), "{} not found", entry.name);
        }
    }

    #[test]
    fn title_match_outranks_description_match() {
        // "weather" is the title of fun/weather.py and only description
        // text of info/forecast.py.
        let hits = search("weather");
        assert_eq!(hits.paths.first().map(String::as_str), Some("fun/weather.py"));
        assert!(hits.paths.contains(&"info/forecast.py".to_owned()));
    }

    #[test]
    fn full_match_outranks_partial() {
        let hits = search("weekly forecast");
        assert_eq!(hits.paths.first().map(String::as_str), Some("info/forecast.py"));
        assert!(hits.paths.contains(&"fun/weather.py".to_owned()));
    }

    #[test]
    fn phrase_requires_adjacency() {
        let hits = search(r#""custom sides""#);
        assert_eq!(hits.paths, vec!["fun/dice.py"]);
        let hits = search(r#""sides custom""#);
        assert_ne!(hits.stage, Some(MatchStage::Ranked));
    }

    #[test]
    fn command_description_surfaces_owner() {
        let hits = search("city");
        assert_eq!(hits.paths, vec!["fun/weather.py"]);
    }

    #[test]
    fn wildcard_single_token() {
        let hits = search("emperat");
        assert_eq!(hits.stage, Some(MatchStage::Wildcard));
        assert_eq!(hits.paths, vec!["fun/weather.py"]);
    }

    #[test]
    fn wildcard_multi_token_substring() {
        let hits = search("ound tri");
        assert_eq!(hits.stage, Some(MatchStage::Wildcard));
        assert_eq!(hits.paths, vec!["tools/ping.py"]);
    }

    #[test]
    fn fuzzy_catches_typos() {
        let hits = search("wether");
        assert_eq!(hits.stage, Some(MatchStage::Fuzzy));
        assert_eq!(hits.paths.first().map(String::as_str), Some("fun/weather.py"));
    }

    #[test]
    fn fuzzy_requires_same_first_letter() {
        assert!(search("qing").paths.is_empty());
    }

    #[test]
    fn no_match_is_empty_not_error() {
        let hits = search("zzzzzzzz");
        assert_eq!(hits, SearchHits::default());
    }

    #[test]
    fn malformed_and_blank_queries_are_empty() {
        assert!(search(r#"ping "unterminated"#).paths.is_empty());
        assert!(search("   ").paths.is_empty());
        assert!(search("!!!").paths.is_empty());
    }

    #[test]
    fn results_are_capped_and_deterministic() {
        let (catalog, index) = setup();
        let options = SearchOptions {
            max_results: 1,
            ..SearchOptions::default()
        };
        let a = index.search("fun", &catalog, options);
        assert!(a.paths.len() <= 1);
        let b = index.search("fun", &catalog, options);
        assert_eq!(a, b);
    }

    #[test]
    fn stale_paths_are_dropped() {
        let (_, index) = setup();
        let other = Catalog::from_manifest(br#"{"fun/dice.py": {"name": "Dice"}}"#).unwrap();
        let hits = index.search("ping", &other, SearchOptions::default());
        assert!(hits.paths.iter().all(|p| other.contains(p)));
    }
}

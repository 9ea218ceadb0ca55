//! Typed catalog of installable modules.
//!
//! The remote manifest is a JSON object keyed by module path. Each value is
//! validated into a [`CatalogEntry`] at ingestion time; defaults for missing
//! fields are resolved once here so no other layer has to look them up.

use std::collections::BTreeMap;

use limoka_crypto::ContentDigest;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::CatalogError;

/// Developer shown when the manifest names none.
pub const UNKNOWN_DEVELOPER: &str = "Unknown";

/// Category assigned to entries without any.
pub const DEFAULT_CATEGORY: &str = "uncategorized";

/// Number of fingerprint hex characters carried in control payloads.
pub const SHORT_FINGERPRINT_LEN: usize = 8;

/// One command exposed by a module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleCommand {
    /// Command name as listed in the manifest.
    pub name: String,
    /// Human description, if any.
    pub description: Option<String>,
}

impl ModuleCommand {
    /// Command name without the trailing `cmd` suffix used by the host's
    /// naming convention (`pingcmd` → `ping`).
    #[must_use]
    pub fn display_name(&self) -> &str {
        match self.name.strip_suffix("cmd") {
            Some(stripped) if !stripped.is_empty() => stripped,
            _ => &self.name,
        }
    }
}

/// A validated catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Unique module path, relative to the catalog base URL.
    pub path: String,
    /// Display name.
    pub name: String,
    /// Description, if any.
    pub description: Option<String>,
    /// Developer handle.
    pub developer: String,
    /// Claimed banner image URL, if any.
    pub banner: Option<String>,
    /// Commands in manifest order.
    pub commands: Vec<ModuleCommand>,
    /// Category labels; never empty.
    pub categories: Vec<String>,
}

impl CatalogEntry {
    /// Whether the entry carries any of `selected` categories.
    #[must_use]
    pub fn matches_any<'a>(&self, selected: impl IntoIterator<Item = &'a String>) -> bool {
        selected
            .into_iter()
            .any(|c| self.categories.iter().any(|own| own == c))
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawMeta {
    #[serde(default)]
    developer: Option<String>,
    #[serde(default)]
    banner: Option<String>,
}

/// One object of the manifest's `commands` list, in document order.
#[derive(Debug, Default)]
struct CommandGroup(Vec<(String, Option<String>)>);

impl<'de> Deserialize<'de> for CommandGroup {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct GroupVisitor;

        impl<'de> serde::de::Visitor<'de> for GroupVisitor {
            type Value = CommandGroup;

            fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str("an object of command names to descriptions")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: serde::de::MapAccess<'de>,
            {
                let mut commands = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some(entry) = map.next_entry::<String, Option<String>>()? {
                    commands.push(entry);
                }
                Ok(CommandGroup(commands))
            }
        }

        deserializer.deserialize_map(GroupVisitor)
    }
}

#[derive(Debug, Deserialize)]
struct RawEntry {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    meta: Option<RawMeta>,
    #[serde(default)]
    commands: Option<Vec<CommandGroup>>,
    #[serde(default)]
    category: Option<Vec<String>>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

fn file_stem(path: &str) -> String {
    let file = path.rsplit(['/', '\\']).next().unwrap_or(path);
    match file.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem.to_owned(),
        _ => file.to_owned(),
    }
}

impl RawEntry {
    fn into_entry(self, path: &str) -> CatalogEntry {
        let meta = self.meta.unwrap_or_default();

        let commands = self
            .commands
            .unwrap_or_default()
            .into_iter()
            .flat_map(|group| group.0)
            .map(|(name, description)| ModuleCommand {
                name,
                description: non_empty(description),
            })
            .collect();

        let mut categories: Vec<String> = Vec::new();
        for label in self.category.unwrap_or_default() {
            let label = label.trim();
            if !label.is_empty() && !categories.iter().any(|c| c == label) {
                categories.push(label.to_owned());
            }
        }
        if categories.is_empty() {
            categories.push(DEFAULT_CATEGORY.to_owned());
        }

        CatalogEntry {
            path: path.to_owned(),
            name: non_empty(self.name).unwrap_or_else(|| file_stem(path)),
            description: non_empty(self.description),
            developer: non_empty(meta.developer).unwrap_or_else(|| UNKNOWN_DEVELOPER.to_owned()),
            banner: non_empty(meta.banner),
            commands,
            categories,
        }
    }
}

/// An immutable catalog snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    entries: BTreeMap<String, CatalogEntry>,
    fingerprint: ContentDigest,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::from_entries(Vec::new())
    }
}

impl Catalog {
    /// Parse and validate a raw manifest.
    ///
    /// Entries that are not objects or carry wrongly typed fields are skipped
    /// with a warning; the rest of the catalog is kept.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Parse`] for invalid JSON and
    /// [`CatalogError::NotAnObject`] when the top level is not an object.
    pub fn from_manifest(bytes: &[u8]) -> Result<Self, CatalogError> {
        let value: serde_json::Value =
            serde_json::from_slice(bytes).map_err(|e| CatalogError::Parse(e.to_string()))?;
        let serde_json::Value::Object(map) = value else {
            return Err(CatalogError::NotAnObject);
        };

        let mut entries = Vec::with_capacity(map.len());
        for (path, raw) in map {
            if path.trim().is_empty() {
                warn!("skipping catalog entry with empty path");
                continue;
            }
            match serde_json::from_value::<RawEntry>(raw) {
                Ok(raw) => entries.push(raw.into_entry(&path)),
                Err(e) => warn!(path = %path, error = %e, "skipping malformed catalog entry"),
            }
        }

        Ok(Self::from_entries(entries))
    }

    /// Build a catalog from already validated entries.
    #[must_use]
    pub fn from_entries(entries: impl IntoIterator<Item = CatalogEntry>) -> Self {
        let entries: BTreeMap<String, CatalogEntry> = entries
            .into_iter()
            .map(|e| (e.path.clone(), e))
            .collect();
        let fingerprint = Self::compute_fingerprint(&entries);
        Self {
            entries,
            fingerprint,
        }
    }

    fn compute_fingerprint(entries: &BTreeMap<String, CatalogEntry>) -> ContentDigest {
        // BTreeMap and struct field order make the encoding canonical.
        let canonical = serde_json::to_vec(entries).unwrap_or_default();
        ContentDigest::sha256(&canonical)
    }

    /// Recompute the fingerprint and compare it with the stored one.
    #[must_use]
    pub fn fingerprint_is_consistent(&self) -> bool {
        Self::compute_fingerprint(&self.entries) == self.fingerprint
    }

    /// Snapshot fingerprint.
    #[must_use]
    pub fn fingerprint(&self) -> &ContentDigest {
        &self.fingerprint
    }

    /// Abbreviated fingerprint carried in control payloads.
    #[must_use]
    pub fn short_fingerprint(&self) -> String {
        self.fingerprint.short_hex(SHORT_FINGERPRINT_LEN)
    }

    /// Look up an entry by exact path.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&CatalogEntry> {
        self.entries.get(path)
    }

    /// Whether `path` is a catalog key.
    #[must_use]
    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in path order.
    pub fn iter(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.entries.values()
    }

    /// Every category label in the catalog, sorted and deduplicated.
    #[must_use]
    pub fn categories(&self) -> Vec<String> {
        let mut all: Vec<String> = self
            .entries
            .values()
            .flat_map(|e| e.categories.iter().cloned())
            .collect();
        all.sort();
        all.dedup();
        all
    }

    /// Resolve a possibly mangled module path to a catalog entry.
    ///
    /// An exact key wins. Otherwise every key that contains `path`, or is
    /// contained in it, is a candidate; the longest candidate wins and ties
    /// go to the lexicographically smallest key.
    #[must_use]
    pub fn resolve(&self, path: &str) -> Option<&CatalogEntry> {
        if path.is_empty() {
            return None;
        }
        if let Some(entry) = self.entries.get(path) {
            return Some(entry);
        }

        let mut best: Option<&CatalogEntry> = None;
        for (key, entry) in &self.entries {
            if !(key.contains(path) || path.contains(key.as_str())) {
                continue;
            }
            // Keys iterate in ascending order, so only a strictly longer key
            // replaces the current best.
            if best.is_none_or(|b| key.len() > b.path.len()) {
                best = Some(entry);
            }
        }
        best
    }
}

//! Environment variable fallbacks.
//!
//! Environment variables only fill fields that no config file set. They never
//! override a value written in a file.

use std::collections::HashMap;

use crate::merge::{ConfigLayer, FieldSources};

/// Environment variables consulted, in `(variable, dotted field)` order.
/// Earlier variables win when several map to the same field.
const ENV_FALLBACKS: &[(&str, &str)] = &[
    ("LIMOKA_BOT_TOKEN", "telegram.bot_token"),
    ("TELOXIDE_TOKEN", "telegram.bot_token"),
    ("LIMOKA_URL", "catalog.base_url"),
    ("LIMOKA_LOG", "logging.level"),
    ("LIMOKA_DATA_DIR", "storage.data_dir"),
];

/// Snapshot the relevant environment variables.
#[must_use]
pub fn collect_env_vars() -> HashMap<String, String> {
    std::env::vars()
        .filter(|(k, _)| k.starts_with("LIMOKA_") || k == "TELOXIDE_TOKEN")
        .collect()
}

/// Apply fallbacks for fields not set by a file layer.
///
/// Returns the number of fields filled.
pub fn apply_env_fallbacks(
    merged: &mut toml::Value,
    sources: &mut FieldSources,
    env: &HashMap<String, String>,
) -> usize {
    let mut applied = 0usize;
    for (var, field) in ENV_FALLBACKS {
        let Some(value) = env.get(*var).map(|v| v.trim()).filter(|v| !v.is_empty()) else {
            continue;
        };
        let already_set = matches!(
            sources.get(*field),
            Some(ConfigLayer::User | ConfigLayer::Explicit | ConfigLayer::Environment)
        );
        if already_set {
            continue;
        }
        if set_path(merged, field, toml::Value::String(value.to_owned())) {
            sources.insert((*field).to_owned(), ConfigLayer::Environment);
            applied = applied.saturating_add(1);
        }
    }
    applied
}

/// Set a dotted path, creating intermediate tables.
fn set_path(root: &mut toml::Value, dotted: &str, value: toml::Value) -> bool {
    let mut parts: Vec<&str> = dotted.split('.').collect();
    let Some(leaf) = parts.pop() else {
        return false;
    };
    let mut cursor = root;
    for part in parts {
        let Some(table) = cursor.as_table_mut() else {
            return false;
        };
        cursor = table
            .entry(part)
            .or_insert_with(|| toml::Value::Table(toml::map::Map::new()));
    }
    match cursor.as_table_mut() {
        Some(table) => {
            table.insert(leaf.to_owned(), value);
            true
        },
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[test]
    fn fills_unset_token() {
        let mut merged: toml::Value = toml::from_str("[telegram]\npayload_ttl_secs = 5").unwrap();
        let mut sources = FieldSources::new();
        let n = apply_env_fallbacks(
            &mut merged,
            &mut sources,
            &env(&[("TELOXIDE_TOKEN", "1:abc")]),
        );
        assert_eq!(n, 1);
        assert_eq!(merged["telegram"]["bot_token"].as_str(), Some("1:abc"));
    }

    #[test]
    fn limoka_token_wins_over_teloxide_token() {
        let mut merged: toml::Value = toml::from_str("").unwrap();
        let mut sources = FieldSources::new();
        apply_env_fallbacks(
            &mut merged,
            &mut sources,
            &env(&[("LIMOKA_BOT_TOKEN", "1:limoka"), ("TELOXIDE_TOKEN", "1:tel")]),
        );
        assert_eq!(merged["telegram"]["bot_token"].as_str(), Some("1:limoka"));
    }

    #[test]
    fn file_value_is_not_overridden() {
        let mut merged: toml::Value =
            toml::from_str("[catalog]\nbase_url = \"https://mirror.example/\"").unwrap();
        let mut sources = FieldSources::new();
        sources.insert("catalog.base_url".to_owned(), ConfigLayer::User);
        apply_env_fallbacks(
            &mut merged,
            &mut sources,
            &env(&[("LIMOKA_URL", "https://other.example/")]),
        );
        assert_eq!(
            merged["catalog"]["base_url"].as_str(),
            Some("https://mirror.example/")
        );
    }

    #[test]
    fn default_value_is_replaced() {
        let mut merged: toml::Value = toml::from_str("[logging]\nlevel = \"info\"").unwrap();
        let mut sources = FieldSources::new();
        sources.insert("logging.level".to_owned(), ConfigLayer::Defaults);
        apply_env_fallbacks(&mut merged, &mut sources, &env(&[("LIMOKA_LOG", "debug")]));
        assert_eq!(merged["logging"]["level"].as_str(), Some("debug"));
        assert_eq!(sources.get("logging.level"), Some(&ConfigLayer::Environment));
    }

    #[test]
    fn blank_values_are_ignored() {
        let mut merged: toml::Value = toml::from_str("").unwrap();
        let mut sources = FieldSources::new();
        let n = apply_env_fallbacks(&mut merged, &mut sources, &env(&[("LIMOKA_URL", "  ")]));
        assert_eq!(n, 0);
    }
}

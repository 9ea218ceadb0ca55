use super::{ConfigLayer, FieldSources};

/// Recursively deep-merge `overlay` into `base`.
///
/// - Tables merge recursively per-field.
/// - Scalars and arrays from the overlay **replace** the base value.
pub fn deep_merge(base: &mut toml::Value, overlay: &toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                if let Some(base_val) = base_table.get_mut(key) {
                    deep_merge(base_val, overlay_val);
                } else {
                    base_table.insert(key.clone(), overlay_val.clone());
                }
            }
        },
        (base, overlay) => {
            *base = overlay.clone();
        },
    }
}

/// Deep-merge `overlay` into `base`, recording which layer set each leaf.
pub fn deep_merge_tracking(
    base: &mut toml::Value,
    overlay: &toml::Value,
    prefix: &str,
    layer: ConfigLayer,
    sources: &mut FieldSources,
) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let path = join(prefix, key);
                if let Some(base_val) = base_table.get_mut(key) {
                    if overlay_val.is_table() {
                        deep_merge_tracking(base_val, overlay_val, &path, layer, sources);
                    } else {
                        *base_val = overlay_val.clone();
                        sources.insert(path, layer);
                    }
                } else {
                    base_table.insert(key.clone(), overlay_val.clone());
                    record_leaves(overlay_val, &path, layer, sources);
                }
            }
        },
        (base, overlay) => {
            *base = overlay.clone();
            sources.insert(prefix.to_owned(), layer);
        },
    }
}

/// Record every leaf under `val` as coming from `layer`.
pub(crate) fn record_leaves(
    val: &toml::Value,
    prefix: &str,
    layer: ConfigLayer,
    sources: &mut FieldSources,
) {
    if let toml::Value::Table(table) = val {
        for (key, child) in table {
            record_leaves(child, &join(prefix, key), layer, sources);
        }
    } else {
        sources.insert(prefix.to_owned(), layer);
    }
}

fn join(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_owned()
    } else {
        format!("{prefix}.{key}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> toml::Value {
        toml::from_str(s).unwrap()
    }

    #[test]
    fn tables_merge_scalars_replace() {
        let mut base = parse(
            r#"
            [catalog]
            base_url = "https://a/"
            refresh_interval_secs = 10
            "#,
        );
        deep_merge(
            &mut base,
            &parse(
                r#"
                [catalog]
                base_url = "https://b/"
                "#,
            ),
        );
        assert_eq!(base["catalog"]["base_url"].as_str(), Some("https://b/"));
        assert_eq!(base["catalog"]["refresh_interval_secs"].as_integer(), Some(10));
    }

    #[test]
    fn arrays_are_replaced_not_appended() {
        let mut base = parse(r#"logging = { directives = ["a=debug", "b=warn"] }"#);
        deep_merge(&mut base, &parse(r#"logging = { directives = ["c=info"] }"#));
        let dirs = base["logging"]["directives"].as_array().unwrap();
        assert_eq!(dirs.len(), 1);
    }

    #[test]
    fn tracking_records_overlay_leaves() {
        let mut base = parse(
            r#"
            [search]
            max_results = 50
            "#,
        );
        let mut sources = FieldSources::new();
        deep_merge_tracking(
            &mut base,
            &parse(
                r#"
                [search]
                max_results = 20
                [telegram]
                payload_ttl_secs = 60
                "#,
            ),
            "",
            ConfigLayer::User,
            &mut sources,
        );
        assert_eq!(sources.get("search.max_results"), Some(&ConfigLayer::User));
        assert_eq!(
            sources.get("telegram.payload_ttl_secs"),
            Some(&ConfigLayer::User)
        );
        assert_eq!(base["search"]["max_results"].as_integer(), Some(20));
    }
}

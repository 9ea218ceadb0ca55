//! Post-merge configuration validation.

use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;

/// Validate a fully-merged and deserialized configuration.
///
/// # Errors
///
/// Returns the first validation error found.
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_catalog(config)?;
    validate_search(config)?;
    validate_display(config)?;
    validate_install(config)?;
    validate_logging(config)?;
    Ok(())
}

fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.to_owned(),
        message: message.into(),
    }
}

fn validate_http_url(field: &str, raw: &str) -> ConfigResult<url::Url> {
    let parsed = url::Url::parse(raw).map_err(|e| invalid(field, format!("'{raw}' is not a URL: {e}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(invalid(
            field,
            format!("unsupported scheme '{}'; expected http or https", parsed.scheme()),
        ));
    }
    Ok(parsed)
}

fn validate_catalog(config: &Config) -> ConfigResult<()> {
    let c = &config.catalog;
    validate_http_url("catalog.base_url", &c.base_url)?;
    if !c.base_url.ends_with('/') {
        return Err(invalid(
            "catalog.base_url",
            "must end with '/' (plugin paths are appended verbatim)",
        ));
    }
    if c.manifest.trim().is_empty() {
        return Err(invalid("catalog.manifest", "must not be empty"));
    }
    if c.fetch_timeout_secs == 0 {
        return Err(invalid("catalog.fetch_timeout_secs", "must be at least 1"));
    }
    Ok(())
}

fn validate_search(config: &Config) -> ConfigResult<()> {
    let s = &config.search;
    if s.max_results == 0 {
        return Err(invalid("search.max_results", "must be at least 1"));
    }
    if s.fuzzy_max_distance > 3 {
        return Err(invalid(
            "search.fuzzy_max_distance",
            format!("{} is too permissive; must be 0-3", s.fuzzy_max_distance),
        ));
    }
    if s.history_limit == 0 {
        return Err(invalid("search.history_limit", "must be at least 1"));
    }
    Ok(())
}

fn validate_display(config: &Config) -> ConfigResult<()> {
    let d = &config.display;
    validate_http_url("display.fallback_banner_url", &d.fallback_banner_url)?;
    if d.banner_timeout_secs == 0 {
        return Err(invalid("display.banner_timeout_secs", "must be at least 1"));
    }
    if d.banner_cache_limit == 0 {
        return Err(invalid("display.banner_cache_limit", "must be at least 1"));
    }
    if d.global_list_limit == 0 || d.global_list_limit > 50 {
        return Err(invalid("display.global_list_limit", "must be between 1 and 50"));
    }
    if d.install_command.trim().is_empty() {
        return Err(invalid("display.install_command", "must not be empty"));
    }
    Ok(())
}

fn validate_install(config: &Config) -> ConfigResult<()> {
    if config.install.download_timeout_secs == 0 {
        return Err(invalid("install.download_timeout_secs", "must be at least 1"));
    }
    Ok(())
}

fn validate_logging(config: &Config) -> ConfigResult<()> {
    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_levels.contains(&config.logging.level.as_str()) {
        return Err(invalid(
            "logging.level",
            format!(
                "unsupported log level '{}'; expected one of: {}",
                config.logging.level,
                valid_levels.join(", ")
            ),
        ));
    }

    let valid_formats = ["pretty", "compact", "json", "full"];
    if !valid_formats.contains(&config.logging.format.as_str()) {
        return Err(invalid(
            "logging.format",
            format!(
                "unsupported log format '{}'; expected one of: {}",
                config.logging.format,
                valid_formats.join(", ")
            ),
        ));
    }

    Ok(())
}

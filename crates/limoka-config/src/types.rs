//! Configuration types.
//!
//! Every struct implements [`Default`] with production values so that a bare
//! `[section]` header in TOML produces a working configuration. The embedded
//! `defaults.toml` mirrors these values.

use std::path::PathBuf;

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize};

/// Public catalog location used when nothing else is configured.
pub const DEFAULT_BASE_URL: &str = "https://raw.githubusercontent.com/MuRuLOSE/limoka/refs/heads/main/";

/// Banner shown when a plugin has no usable image of its own.
pub const DEFAULT_FALLBACK_BANNER: &str =
    "https://raw.githubusercontent.com/MuRuLOSE/limoka/refs/heads/main/assets/limoka404.png";

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where the catalog lives and how often it is refreshed.
    pub catalog: CatalogSection,
    /// Query engine limits.
    pub search: SearchSection,
    /// Rendering knobs (banners, install hint).
    pub display: DisplaySection,
    /// Remote install pipeline switches.
    pub install: InstallSection,
    /// Persistent state location.
    pub storage: StorageSection,
    /// Telegram frontend settings.
    pub telegram: TelegramSection,
    /// Logging level, format and per-crate directives.
    pub logging: LoggingSection,
}

// ---------------------------------------------------------------------------
// CatalogSection
// ---------------------------------------------------------------------------

/// Remote catalog settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogSection {
    /// Base URL of the catalog repository. Must end with `/`; plugin paths
    /// and the manifest name are appended to it verbatim.
    pub base_url: String,
    /// Manifest file name relative to `base_url`.
    pub manifest: String,
    /// Timeout for fetching the manifest and plugin sources.
    pub fetch_timeout_secs: u64,
    /// Interval between background refreshes. `0` disables refreshing.
    pub refresh_interval_secs: u64,
}

impl Default for CatalogSection {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            manifest: "modules.json".to_owned(),
            fetch_timeout_secs: 10,
            refresh_interval_secs: 3600,
        }
    }
}

impl CatalogSection {
    /// Full URL of the manifest.
    #[must_use]
    pub fn manifest_url(&self) -> String {
        format!("{}{}", self.base_url, self.manifest)
    }
}

// ---------------------------------------------------------------------------
// SearchSection
// ---------------------------------------------------------------------------

/// Query engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSection {
    /// Maximum number of paths a query returns.
    pub max_results: usize,
    /// Maximum Levenshtein distance of the fuzzy fallback stage.
    pub fuzzy_max_distance: usize,
    /// Number of past queries kept per user.
    pub history_limit: usize,
}

impl Default for SearchSection {
    fn default() -> Self {
        Self {
            max_results: 50,
            fuzzy_max_distance: 2,
            history_limit: 10,
        }
    }
}

// ---------------------------------------------------------------------------
// DisplaySection
// ---------------------------------------------------------------------------

/// Rendering settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplaySection {
    /// Image used when a result has no valid banner and no filter is active.
    pub fallback_banner_url: String,
    /// Timeout of the banner `HEAD` probe.
    pub banner_timeout_secs: u64,
    /// Size at which the invalid-banner cache is reset.
    pub banner_cache_limit: usize,
    /// Number of entries in the global results list.
    pub global_list_limit: usize,
    /// Command prefix shown in the install hint (e.g. `.`).
    pub command_prefix: String,
    /// Loader command shown in the install hint (e.g. `dlm`).
    pub install_command: String,
}

impl Default for DisplaySection {
    fn default() -> Self {
        Self {
            fallback_banner_url: DEFAULT_FALLBACK_BANNER.to_owned(),
            banner_timeout_secs: 5,
            banner_cache_limit: 4096,
            global_list_limit: 15,
            command_prefix: ".".to_owned(),
            install_command: "dlm".to_owned(),
        }
    }
}

// ---------------------------------------------------------------------------
// InstallSection
// ---------------------------------------------------------------------------

/// Remote install pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallSection {
    /// Whether signed directives from the publisher are honoured at all.
    pub external_install_allowed: bool,
    /// Timeout for downloading plugin bytes.
    pub download_timeout_secs: u64,
    /// Delay before deleting the triggering message after a critical error.
    pub error_grace_secs: u64,
    /// Directory installed plugins are written to. `None` uses
    /// `<data_dir>/plugins`.
    pub plugin_dir: Option<String>,
}

impl Default for InstallSection {
    fn default() -> Self {
        Self {
            external_install_allowed: true,
            download_timeout_secs: 10,
            error_grace_secs: 5,
            plugin_dir: None,
        }
    }
}

// ---------------------------------------------------------------------------
// StorageSection
// ---------------------------------------------------------------------------

/// Persistent state settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    /// Data directory (index snapshot, KV file, plugins). `None` uses the
    /// platform data directory.
    pub data_dir: Option<String>,
}

// ---------------------------------------------------------------------------
// TelegramSection
// ---------------------------------------------------------------------------

/// Telegram bot frontend configuration.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct TelegramSection {
    /// Telegram Bot API token (from `@BotFather`).
    /// Prefer environment variables over storing this in a file.
    pub bot_token: Option<String>,
    /// Lifetime of callback payloads too large to embed in a button.
    pub payload_ttl_secs: u64,
    /// Users allowed to flip the external install switch. Empty allows
    /// everyone.
    pub admin_user_ids: Vec<u64>,
}

impl Default for TelegramSection {
    fn default() -> Self {
        Self {
            bot_token: None,
            payload_ttl_secs: 1800,
            admin_user_ids: Vec::new(),
        }
    }
}

impl TelegramSection {
    /// Whether `user_id` may use admin commands.
    #[must_use]
    pub fn is_admin(&self, user_id: u64) -> bool {
        self.admin_user_ids.is_empty() || self.admin_user_ids.contains(&user_id)
    }
}

impl std::fmt::Debug for TelegramSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramSection")
            .field("has_bot_token", &self.bot_token.is_some())
            .field("payload_ttl_secs", &self.payload_ttl_secs)
            .field("admin_user_ids", &self.admin_user_ids)
            .finish()
    }
}

impl Serialize for TelegramSection {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("TelegramSection", 2)?;
        state.serialize_field("payload_ttl_secs", &self.payload_ttl_secs)?;
        state.serialize_field("admin_user_ids", &self.admin_user_ids)?;
        state.end()
    }
}

// ---------------------------------------------------------------------------
// LoggingSection
// ---------------------------------------------------------------------------

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Global log level filter (`"trace"`, `"debug"`, `"info"`, `"warn"`,
    /// `"error"`).
    pub level: String,
    /// Output format: `"pretty"`, `"compact"`, `"json"` or `"full"`.
    pub format: String,
    /// Per-crate tracing directives (e.g. `["limoka_search=debug",
    /// "reqwest=warn"]`).
    pub directives: Vec<String>,
    /// Directory for daily-rotated log files. `None` logs to stderr.
    pub directory: Option<String>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: "compact".to_owned(),
            directives: Vec::new(),
            directory: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Derived paths
// ---------------------------------------------------------------------------

impl Config {
    /// Resolve the data directory: `storage.data_dir`, else the platform data
    /// directory, else `~/.limoka/data`, else `./.limoka`.
    #[must_use]
    pub fn data_dir(&self) -> PathBuf {
        if let Some(dir) = &self.storage.data_dir {
            return PathBuf::from(dir);
        }
        if let Some(dirs) = directories::ProjectDirs::from("", "", "limoka") {
            return dirs.data_dir().to_path_buf();
        }
        directories::BaseDirs::new().map_or_else(
            || PathBuf::from(".limoka"),
            |d| d.home_dir().join(".limoka").join("data"),
        )
    }

    /// Where the catalog snapshot and its index are persisted.
    #[must_use]
    pub fn index_path(&self) -> PathBuf {
        self.data_dir().join("search").join("index.json")
    }

    /// Where per-user state is persisted.
    #[must_use]
    pub fn kv_path(&self) -> PathBuf {
        self.data_dir().join("state.json")
    }

    /// Where installed plugins are written.
    #[must_use]
    pub fn plugin_dir(&self) -> PathBuf {
        self.install
            .plugin_dir
            .as_ref()
            .map_or_else(|| self.data_dir().join("plugins"), PathBuf::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_url_joins_base() {
        let section = CatalogSection::default();
        assert_eq!(
            section.manifest_url(),
            format!("{DEFAULT_BASE_URL}modules.json")
        );
    }

    #[test]
    fn telegram_debug_hides_token() {
        let section = TelegramSection {
            bot_token: Some("123:secret".to_owned()),
            ..TelegramSection::default()
        };
        let debug = format!("{section:?}");
        assert!(!debug.contains("123:secret"));
        assert!(debug.contains("has_bot_token: true"));
    }

    #[test]
    fn telegram_serialize_omits_token() {
        let section = TelegramSection {
            bot_token: Some("123:secret".to_owned()),
            ..TelegramSection::default()
        };
        let json = serde_json::to_string(&section).unwrap();
        assert!(!json.contains("secret"));
        assert!(!json.contains("bot_token"));
    }

    #[test]
    fn empty_admin_list_allows_everyone() {
        let mut section = TelegramSection::default();
        assert!(section.is_admin(7));
        section.admin_user_ids = vec![1];
        assert!(section.is_admin(1));
        assert!(!section.is_admin(7));
    }

    #[test]
    fn derived_paths_follow_data_dir() {
        let mut config = Config::default();
        config.storage.data_dir = Some("/srv/limoka".to_owned());
        assert_eq!(
            config.index_path(),
            PathBuf::from("/srv/limoka/search/index.json")
        );
        assert_eq!(config.kv_path(), PathBuf::from("/srv/limoka/state.json"));
        assert_eq!(config.plugin_dir(), PathBuf::from("/srv/limoka/plugins"));

        config.install.plugin_dir = Some("/opt/plugins".to_owned());
        assert_eq!(config.plugin_dir(), PathBuf::from("/opt/plugins"));
    }

    #[test]
    fn bare_sections_deserialize_to_defaults() {
        let config: Config = toml::from_str("[catalog]\n[install]\n").unwrap();
        assert_eq!(config.catalog.refresh_interval_secs, 3600);
        assert!(config.install.external_install_allowed);
    }
}

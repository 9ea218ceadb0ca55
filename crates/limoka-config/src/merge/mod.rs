//! Layered configuration merging with source tracking.

mod deep;

pub use deep::{deep_merge, deep_merge_tracking};

use std::collections::HashMap;

/// Where a configuration value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigLayer {
    /// Embedded `defaults.toml`.
    Defaults,
    /// `~/.limoka/config.toml` or `$LIMOKA_HOME/config.toml`.
    User,
    /// A file passed explicitly (e.g. `--config`).
    Explicit,
    /// An environment variable fallback.
    Environment,
}

/// Dotted field path to the layer that last set it.
pub type FieldSources = HashMap<String, ConfigLayer>;

/// Mark every leaf of the defaults tree with [`ConfigLayer::Defaults`].
pub(crate) fn record_defaults(val: &toml::Value, sources: &mut FieldSources) {
    deep::record_leaves(val, "", ConfigLayer::Defaults, sources);
}

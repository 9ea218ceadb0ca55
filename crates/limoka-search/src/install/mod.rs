//! Signed remote installs.
//!
//! A trusted publisher account posts `#limoka:<path>:<signature>` into a
//! chat the host reads. The pipeline resolves the path against the live
//! catalog, downloads the plugin, checks the ed25519 signature over
//! `"<path>|<sha256>"` and only then hands the bytes to the
//! [`PluginLoader`](crate::loader::PluginLoader).
//!
//! Messages from anyone else are ignored before any parsing or network
//! activity.

pub mod directive;
mod pipeline;

use async_trait::async_trait;
use limoka_crypto::{CryptoResult, PublicKey};

use crate::error::DirectiveError;

pub use directive::InstallDirective;
pub use pipeline::{InstallPipeline, PipelineTimings};

/// Account id of the official catalog publisher.
pub const OFFICIAL_SENDER_ID: i64 = 8_581_621_390;

/// Publisher verification key, base64 ed25519 `SubjectPublicKeyInfo`.
pub const OFFICIAL_PUBLIC_KEY: &str = "MCowBQYDK2VwAyEA1ltSnqtf3pGBuctuAYqHivCXsaRtKOVxavai7yin7ZE=";

/// Who may push installs, and the key their signatures must verify under.
#[derive(Debug, Clone, Copy)]
pub struct TrustAnchor {
    /// Only messages from this account are considered.
    pub sender_id: i64,
    /// Key the install signatures are checked against.
    pub public_key: PublicKey,
}

impl TrustAnchor {
    /// The production publisher.
    ///
    /// # Errors
    ///
    /// Returns a crypto error if the embedded key fails to decode.
    pub fn official() -> CryptoResult<Self> {
        Ok(Self {
            sender_id: OFFICIAL_SENDER_ID,
            public_key: PublicKey::from_spki_base64(OFFICIAL_PUBLIC_KEY)?,
        })
    }
}

/// A chat message as seen by the install watcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Message id within its chat.
    pub id: i64,
    /// Chat the message was posted in.
    pub chat_id: i64,
    /// Author, when known.
    pub sender_id: Option<i64>,
    /// Raw text or caption.
    pub text: Option<String>,
    /// Whether the text carries formatting entities (and so may contain
    /// markup residue around the tag).
    pub has_entities: bool,
}

/// Chat operations the pipeline needs.
#[async_trait]
pub trait DirectiveChat: Send + Sync {
    /// Reply to `message` with Telegram HTML.
    async fn reply(&self, message: &InboundMessage, html: &str) -> Result<(), DirectiveError>;

    /// Delete `message`.
    async fn delete(&self, message: &InboundMessage) -> Result<(), DirectiveError>;

    /// Send plain `text` privately to `user_id`.
    async fn notify(&self, user_id: i64, text: &str) -> Result<(), DirectiveError>;
}

/// What happened to one inbound message.
#[derive(Debug)]
pub enum InstallOutcome {
    /// Not from the trusted sender, no text, or installs are switched off.
    Ignored,
    /// No `#limoka:` tag in the text.
    NoDirective,
    /// The directive was refused; the reason was posted as a reply and the
    /// message kept.
    Rejected(DirectiveError),
    /// The loader accepted the plugin.
    Installed {
        /// Catalog path that was installed.
        path: String,
    },
    /// Verification passed but the loader failed.
    Failed {
        /// Catalog path that failed to install.
        path: String,
    },
    /// An unexpected error or panic was caught at the pipeline boundary.
    Crashed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn official_anchor_decodes() {
        let anchor = TrustAnchor::official().unwrap();
        assert_eq!(anchor.sender_id, 8_581_621_390);
        assert_eq!(anchor.public_key.as_bytes().len(), 32);
    }
}

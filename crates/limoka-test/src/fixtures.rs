//! Test fixtures: a sample catalog and a publisher.

use limoka_crypto::{ContentDigest, KeyPair, install_payload};
use limoka_search::{InboundMessage, TrustAnchor};

/// Base URL the sample catalog is served from.
pub const TEST_BASE_URL: &str = "https://catalog.test/";

/// Telegram id of the test publisher.
pub const TEST_PUBLISHER_ID: i64 = 4242;

/// Source of `tools/ping.py`.
pub const PING_SOURCE: &[u8] =
    b"from .. import loader\n\nclass PingMod(loader.Module):\n    \"\"\"Measure latency\"\"\"\n";

/// Banner of `tools/ping.py` (served as `image/png`).
pub const PING_BANNER: &str = "https://cdn.catalog.test/ping.png";

/// Sample manifest.
///
/// Only `tools/ping.py` mentions "ping"; three entries mention "music"; no
/// entry matching "ping" or "music" carries the `fun` category.
pub const SAMPLE_MANIFEST: &str = r#"{
    "tools/ping.py": {
        "name": "Ping",
        "description": "Measure the bot response latency",
        "meta": {"developer": "@limoka_dev", "banner": "https://cdn.catalog.test/ping.png"},
        "commands": [{"ping": "Show latency"}],
        "category": ["tools"]
    },
    "music/player.py": {
        "name": "Music Player",
        "description": "Play music from links",
        "meta": {"developer": "@tunes"},
        "commands": [{"play": "Play a track"}, {"stop": null}],
        "category": ["music"]
    },
    "music/lyrics.py": {
        "name": "Lyrics",
        "description": "Find song lyrics for the current music track",
        "meta": {"developer": "@tunes", "banner": "https://cdn.catalog.test/missing.png"},
        "category": ["music"]
    },
    "music/radio.py": {
        "name": "Radio",
        "description": "Stream internet music radio",
        "category": ["music", "media"]
    },
    "fun/dice.py": {
        "name": "Dice",
        "description": "Roll a dice",
        "commands": [{"dice": "Roll"}],
        "category": ["fun"]
    },
    "chat/translator.py": {
        "name": "Translator",
        "description": "Translate messages between languages",
        "category": ["chat", "tools"]
    },
    "admin/purge.py": {
        "name": "Purge",
        "description": "Delete messages in bulk"
    }
}"#;

/// Catalog paths of [`SAMPLE_MANIFEST`].
pub const SAMPLE_PATHS: &[&str] = &[
    "tools/ping.py",
    "music/player.py",
    "music/lyrics.py",
    "music/radio.py",
    "fun/dice.py",
    "chat/translator.py",
    "admin/purge.py",
];

/// Display names of [`SAMPLE_MANIFEST`], in [`SAMPLE_PATHS`] order.
pub const SAMPLE_NAMES: &[&str] = &[
    "Ping",
    "Music Player",
    "Lyrics",
    "Radio",
    "Dice",
    "Translator",
    "Purge",
];

/// A publisher key pair with its trust anchor.
pub struct TestPublisher {
    /// Signing key.
    pub keypair: KeyPair,
    /// Sender id the anchor trusts.
    pub sender_id: i64,
}

impl TestPublisher {
    /// A fresh publisher with [`TEST_PUBLISHER_ID`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            keypair: KeyPair::generate(),
            sender_id: TEST_PUBLISHER_ID,
        }
    }

    /// Trust anchor for this publisher.
    #[must_use]
    pub fn anchor(&self) -> TrustAnchor {
        TrustAnchor {
            sender_id: self.sender_id,
            public_key: self.keypair.export_public_key(),
        }
    }

    /// Hex signature over `path` and `source`.
    #[must_use]
    pub fn sign(&self, path: &str, source: &[u8]) -> String {
        sign_install(&self.keypair, path, source)
    }

    /// A directive message from this publisher.
    #[must_use]
    pub fn directive(&self, id: i64, path: &str, source: &[u8]) -> InboundMessage {
        message(
            id,
            Some(self.sender_id),
            &format!("#limoka:{path}:{}", self.sign(path, source)),
        )
    }
}

impl Default for TestPublisher {
    fn default() -> Self {
        Self::new()
    }
}

/// Sign an install of `source` at `path`, hex encoded.
#[must_use]
pub fn sign_install(keypair: &KeyPair, path: &str, source: &[u8]) -> String {
    keypair
        .sign(&install_payload(path, &ContentDigest::sha256(source)))
        .to_hex()
}

/// A plain-text inbound message in chat `-100`.
#[must_use]
pub fn message(id: i64, sender_id: Option<i64>, text: &str) -> InboundMessage {
    InboundMessage {
        id,
        chat_id: -100,
        sender_id,
        text: Some(text.to_owned()),
        has_entities: false,
    }
}

//! Install signature verification.
//!
//! A publisher signs the UTF-8 string `"<path>|<sha256-hex>"`, which binds the
//! signature to both the catalog path and the exact plugin bytes. Moving a
//! valid signature to another path, or changing a single byte of content,
//! makes verification fail.

use crate::digest::ContentDigest;
use crate::error::CryptoResult;
use crate::keypair::PublicKey;
use crate::signature::Signature;

/// Separator between the path and the content digest in the signed payload.
pub const INSTALL_PAYLOAD_SEPARATOR: &str = "|";

/// Build the byte string a publisher signs for an install directive.
#[must_use]
pub fn install_payload(path: &str, digest: &ContentDigest) -> Vec<u8> {
    format!("{path}{INSTALL_PAYLOAD_SEPARATOR}{}", digest.to_hex()).into_bytes()
}

/// Verifies install signatures against a single trusted publisher key.
///
/// # Example
///
/// ```
/// use limoka_crypto::{ContentDigest, InstallVerifier, KeyPair, install_payload};
///
/// let publisher = KeyPair::generate();
/// let digest = ContentDigest::sha256(b"plugin source");
/// let sig = publisher.sign(&install_payload("a/b.py", &digest));
///
/// let verifier = InstallVerifier::new(publisher.export_public_key());
/// assert!(verifier.verify("a/b.py", &digest, &sig).is_ok());
/// ```
#[derive(Debug, Clone, Copy)]
pub struct InstallVerifier {
    publisher: PublicKey,
}

impl InstallVerifier {
    /// Create a verifier trusting `publisher`.
    #[must_use]
    pub const fn new(publisher: PublicKey) -> Self {
        Self { publisher }
    }

    /// The trusted publisher key.
    #[must_use]
    pub const fn public_key(&self) -> &PublicKey {
        &self.publisher
    }

    /// Verify `signature` over `path` and `digest`.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::SignatureVerificationFailed`](crate::CryptoError::SignatureVerificationFailed)
    /// when the signature does not match.
    pub fn verify(
        &self,
        path: &str,
        digest: &ContentDigest,
        signature: &Signature,
    ) -> CryptoResult<()> {
        self.publisher
            .verify(&install_payload(path, digest), signature)
    }

    /// Digest `content` and verify `signature` over `path` and the digest.
    ///
    /// # Errors
    ///
    /// Same as [`verify`](Self::verify).
    pub fn verify_content(
        &self,
        path: &str,
        content: &[u8],
        signature: &Signature,
    ) -> CryptoResult<ContentDigest> {
        let digest = ContentDigest::sha256(content);
        self.verify(path, &digest, signature)?;
        Ok(digest)
    }
}

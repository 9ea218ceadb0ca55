//! Limoka Crypto - signature primitives for the secure install pipeline.
//!
//! This crate provides:
//! - Ed25519 key pairs with secure memory handling (publisher side, tests)
//! - Ed25519 public keys and signatures, including SPKI DER decoding
//! - SHA-256 content digests for downloaded plugin bytes
//! - [`InstallVerifier`], which binds a signature to a module path and the
//!   digest of its content
//!
//! # Example
//!
//! ```
//! use limoka_crypto::{ContentDigest, InstallVerifier, KeyPair, install_payload};
//!
//! let publisher = KeyPair::generate();
//! let source = b"class Ping: ...";
//! let digest = ContentDigest::sha256(source);
//!
//! let signature = publisher.sign(&install_payload("tools/ping.py", &digest));
//!
//! let verifier = InstallVerifier::new(publisher.export_public_key());
//! assert!(verifier.verify("tools/ping.py", &digest, &signature).is_ok());
//! assert!(verifier.verify("tools/pong.py", &digest, &signature).is_err());
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod digest;
mod error;
mod keypair;
mod signature;
mod verifier;

pub use digest::ContentDigest;
pub use error::{CryptoError, CryptoResult};
pub use keypair::{KeyPair, PublicKey};
pub use signature::Signature;
pub use verifier::{INSTALL_PAYLOAD_SEPARATOR, InstallVerifier, install_payload};

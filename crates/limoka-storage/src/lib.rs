//! Limoka Storage - namespaced key-value persistence.
//!
//! The [`KvStore`] trait provides byte-level `get`/`set`/`delete` operations
//! with namespaced keys. Backends:
//!
//! - [`MemoryKvStore`]: ephemeral, for tests and throwaway sessions
//! - [`JsonFileKvStore`]: a single JSON document on disk, replaced atomically
//!   on every write
//!
//! Per-user state (search history) lives under namespaces such as
//! `limoka:<user-id>`. Use [`ScopedKvStore`] to pre-bind a namespace and get
//! typed [`get_json`](ScopedKvStore::get_json) /
//! [`set_json`](ScopedKvStore::set_json) access.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod error;
pub mod kv;

pub use error::{StorageError, StorageResult};
pub use kv::{JsonFileKvStore, KvStore, MemoryKvStore, ScopedKvStore};

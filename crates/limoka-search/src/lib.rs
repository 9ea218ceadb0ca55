//! Limoka Search - plugin discovery and signed remote installs.
//!
//! This crate provides:
//! - [`Catalog`]: the validated remote manifest, fingerprinted per snapshot
//! - [`SearchEngine`]: a persistent inverted index with a ranked, wildcard
//!   and fuzzy fallback chain, published through an atomic snapshot swap
//! - [`nav`]: stateless result navigation driven by compact control payloads
//! - [`BannerResolver`]: image URL validation with a negative cache
//! - [`install`]: the signature-checked install pipeline
//! - [`LimokaService`]: the owner of all of the above, shared with a chat
//!   frontend

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod banner;
pub mod catalog;
pub mod error;
pub mod fetcher;
pub mod format;
pub mod history;
pub mod http;
pub mod index;
pub mod install;
pub mod loader;
pub mod nav;
pub mod service;

pub use banner::BannerResolver;
pub use catalog::{Catalog, CatalogEntry, ModuleCommand};
pub use error::{
    CatalogError, DirectiveError, HttpError, IndexError, LoaderError, NavError, QueryError,
    SearchError, SearchResult,
};
pub use fetcher::CatalogFetcher;
pub use history::SearchHistory;
pub use http::{HttpClient, HttpResponse, ReqwestClient};
pub use index::{SearchEngine, SearchOptions, Snapshot};
pub use install::{DirectiveChat, InboundMessage, InstallOutcome, InstallPipeline, TrustAnchor};
pub use loader::{FsPluginLoader, PluginLoader};
pub use nav::{NavOutcome, QueryMode, View};
pub use service::LimokaService;

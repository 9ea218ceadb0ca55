//! Limoka Test - shared test utilities.
//!
//! Scripted implementations of the network, loader and chat seams plus a
//! sample catalog and a publisher key, so that crates can exercise search,
//! navigation and installs without touching the network.
//!
//! ```rust,ignore
//! use limoka_test::TestHarness;
//!
//! #[tokio::test]
//! async fn finds_ping() {
//!     let harness = TestHarness::new().await;
//!     assert_eq!(harness.service.engine().search("ping"), vec!["tools/ping.py"]);
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod fixtures;
pub mod harness;
pub mod mocks;

pub use fixtures::*;
pub use harness::*;
pub use mocks::*;

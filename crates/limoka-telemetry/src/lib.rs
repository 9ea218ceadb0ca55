//! Limoka Telemetry - logging and request correlation.
//!
//! This crate provides:
//! - Configurable `tracing` subscriber setup (pretty, compact, JSON, full)
//! - File logging with daily rotation
//! - [`RequestContext`], a per-interaction span with a correlation id
//!
//! # Example
//!
//! ```rust,no_run
//! use limoka_telemetry::{LogConfig, LogFormat, setup_logging, RequestContext};
//!
//! # fn main() -> Result<(), limoka_telemetry::TelemetryError> {
//! let config = LogConfig::new("info")
//!     .with_format(LogFormat::Compact)
//!     .with_directive("limoka_search=debug");
//! setup_logging(&config)?;
//!
//! let ctx = RequestContext::new("telegram")
//!     .with_operation("callback")
//!     .with_user(42);
//! let span = ctx.span();
//! let _guard = span.enter();
//! tracing::info!("handling callback");
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod context;
mod error;
mod logging;

pub use context::RequestContext;
pub use error::{TelemetryError, TelemetryResult};
pub use logging::{LogConfig, LogFormat, LogTarget, setup_default_logging, setup_logging};

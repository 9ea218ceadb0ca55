//! Interactive result navigation.
//!
//! Every control carries its full state in a compact payload (see
//! [`params`]); handling a control decodes the payload, checks it against the
//! live catalog fingerprint, and renders the next [`View`](view::View).

mod machine;
pub mod params;
pub(crate) mod render;
pub(crate) mod strings;
pub mod view;

pub(crate) use machine::Navigator;
pub use params::{NavParams, Op};
pub use view::{Button, Keyboard, NavOutcome, QueryMode, View};

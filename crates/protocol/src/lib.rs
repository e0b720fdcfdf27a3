//! Shared wire and domain types for ChatVault.
//!
//! The host app (a third-party web messaging application) is driven through
//! a browser; this crate holds the types every other crate agrees on: the
//! client-facing event envelope, channel lookup results, and the constants
//! of the automated UI (origin, data-store names, default timeouts).

pub mod constants;
mod envelope;
mod types;

pub use envelope::{ClientEvent, EventKind};
pub use types::{ChannelInfo, Identity, PageKind, UserProfile, derive_channel_name};

//! Session resolution and channel management for the host app.
//!
//! The host app is driven through two injected capabilities: a
//! [`PageAutomation`] surface (one controllable browser page) and a
//! [`DataLookup`] surface (the app's client-side key-value store). The
//! [`SessionResolver`] walks the page to an authenticated, identity-known
//! state; [`ChannelOps`] finds or creates the user's dedicated channel on
//! top of it.
//!
//! The controllable page is a serialized resource: every page-driving
//! operation goes through one internal async mutex, so callers may share a
//! resolver freely but their operations never interleave on the page.

mod capabilities;
mod channel;
mod flow;
mod resolver;
pub mod selectors;
mod wait;

#[cfg(test)]
pub(crate) mod fakes;

pub use capabilities::{DataLookup, LookupError, LookupOutcome, PageAutomation, PageError, SearchHit};
pub use channel::ChannelOps;
pub use flow::login_flow;
pub use resolver::{EnsureOptions, SessionConfig, SessionPhase, SessionResolver};
pub use wait::wait_for_quiescence;

/// Errors produced by session and channel operations.
///
/// Bounded waits get dedicated kinds so callers can tell "host app slow"
/// from "user never logged in". Expected negative branches (channel not
/// found during search, auth marker absent) are values, not errors.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("host app page did not become ready in time")]
    NavigationTimeout,

    #[error("authentication lookup timed out")]
    AuthCheckTimeout,

    #[error("user did not log in before the deadline")]
    LoginTimeout,

    #[error("persisted identity record missing or malformed")]
    IdentityNotFound,

    #[error("channel \"{0}\" does not exist")]
    ChannelMissing(String),

    #[error("page automation failed: {0}")]
    Page(#[from] PageError),

    #[error("data lookup failed: {0}")]
    Lookup(#[from] LookupError),

    #[error("malformed host-app state: {0}")]
    Malformed(String),

    #[error("session has been shut down")]
    Shutdown,
}

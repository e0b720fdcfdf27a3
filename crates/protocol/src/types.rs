use serde::{Deserialize, Serialize};

use crate::constants::CHANNEL_NAME_PREFIX;

/// Which of the host app's two web front-ends to drive.
///
/// The front-ends live under different path segments of the same origin and
/// differ in markup; selectors are written against `K`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageKind {
    K,
    A,
}

impl PageKind {
    /// Path segment of this front-end under the host app origin.
    pub fn path_segment(self) -> &'static str {
        match self {
            PageKind::K => "k",
            PageKind::A => "a",
        }
    }
}

/// Identity of the signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: String,
}

/// Result of looking up a channel by name in the host app.
///
/// Absence is an expected branch, not a fault, so this is a sum type rather
/// than an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ChannelInfo {
    Exists { name: String, peer_id: String },
    NotFound,
}

impl ChannelInfo {
    /// Returns `true` for the `Exists` variant.
    pub fn exists(&self) -> bool {
        matches!(self, ChannelInfo::Exists { .. })
    }
}

/// Profile record of a host-app user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub first_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
}

impl UserProfile {
    /// Formats the display name, dropping a missing or empty last name.
    pub fn full_name(&self) -> String {
        match self.last_name.as_deref() {
            Some(last) if !last.trim().is_empty() => {
                format!("{} {}", self.first_name.trim(), last.trim())
            }
            _ => self.first_name.trim().to_string(),
        }
    }
}

/// Derives the dedicated channel name for a user id.
///
/// Pure and total: the same id always yields the same name, and distinct
/// ids yield distinct names.
pub fn derive_channel_name(user_id: &str) -> String {
    format!("{CHANNEL_NAME_PREFIX}-{user_id}")
}

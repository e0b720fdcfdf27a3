use serde::{Deserialize, Serialize};

/// Kind of an event sent to a UI client.
///
/// The login flow collapses every internal outcome into exactly these:
/// `login` prompts the client that an interactive sign-in has started, and
/// the other four are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Login,
    AlreadySigned,
    Error,
    Timeout,
    LoginSuccess,
}

/// Envelope for all events toward a UI client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientEvent {
    #[serde(rename = "type")]
    pub kind: EventKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl ClientEvent {
    /// Creates an event with no payload.
    pub fn new(kind: EventKind) -> Self {
        Self { kind, data: None }
    }

    /// Creates an event carrying a serialized payload.
    pub fn with_data<T: Serialize>(kind: EventKind, data: &T) -> Result<Self, serde_json::Error> {
        Ok(Self {
            kind,
            data: Some(serde_json::to_value(data)?),
        })
    }

    /// Creates an `error` event with a human-readable message.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: EventKind::Error,
            data: Some(serde_json::json!({ "message": message.into() })),
        }
    }

    /// Deserializes the payload into the given type.
    pub fn parse_data<T: for<'de> Deserialize<'de>>(&self) -> Result<Option<T>, serde_json::Error> {
        match &self.data {
            Some(value) => Ok(Some(serde_json::from_value(value.clone())?)),
            None => Ok(None),
        }
    }
}

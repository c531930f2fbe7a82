//! Application-level chat messages carried inside text frames.
//!
//! Two message families, both tagged by a `type` field:
//!
//! - **[`ClientMessage`]**: what a client may send (`join`, `chat`).
//! - **[`ServerMessage`]**: what the server emits (`system`, `status`,
//!   `chat`, `error`, `users`).
//!
//! Messages are transient — each exists only for the duration of one frame's
//! processing and is never persisted. Missing `name`/`text` fields
//! deserialize as empty strings so that validation, not parsing, decides
//! their fate.

use serde::{Deserialize, Serialize};

/// A message sent by a client.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientMessage {
    /// Claim a display name.
    Join {
        /// Requested display name, validated and capped by the router.
        #[serde(default)]
        name: String,
    },

    /// Say something to the room.
    Chat {
        /// Message body.
        #[serde(default)]
        text: String,
    },
}

/// A message emitted by the server.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerMessage {
    /// Private notice to one client (e.g. the join welcome).
    System {
        /// Human-readable notice.
        message: String,
    },

    /// Room-wide lifecycle announcement (joins, departures).
    Status {
        /// Human-readable announcement.
        message: String,
    },

    /// A relayed chat line.
    Chat {
        /// Display name of the sender.
        from: String,
        /// Message body, already trimmed.
        text: String,
        /// Server clock at relay time, Unix milliseconds.
        timestamp: i64,
    },

    /// Rejection of a client message; the connection stays open.
    Error {
        /// Why the message was rejected.
        message: String,
    },

    /// Current roster of named participants.
    Users {
        /// Display names, order unspecified.
        names: Vec<String>,
    },
}

impl ServerMessage {
    /// The welcome sent to a client that just claimed `name`.
    pub fn welcome(name: &str) -> Self {
        Self::System {
            message: format!("Welcome, {name}!"),
        }
    }

    /// The room-wide announcement that `name` joined.
    pub fn joined(name: &str) -> Self {
        Self::Status {
            message: format!("{name} joined the chat."),
        }
    }

    /// The room-wide announcement that `name` left.
    pub fn left(name: &str) -> Self {
        Self::Status {
            message: format!("{name} left the chat."),
        }
    }
}

//! Text-frame dispatch: the chat semantics.
//!
//! The router interprets decoded text-frame payloads as [`ClientMessage`]s,
//! mutates the room, and fans [`ServerMessage`]s back out. Parsing is
//! two-stage on purpose: a body that is not JSON at all earns the sender an
//! `error` frame, while well-formed JSON with an unknown or missing `type`
//! is silently ignored.

use std::sync::Arc;

use bytes::Bytes;
use metrics::counter;
use parlor_core::ids::ConnId;
use parlor_core::messages::{ClientMessage, ServerMessage};
use parlor_core::text::normalize_name;
use parlor_proto::frame::{self, Opcode};
use serde_json::Value;
use tracing::{info, warn};

use crate::metrics::{CHAT_JOINS_TOTAL, CHAT_MESSAGES_TOTAL};
use crate::names::NameSink;
use crate::ws::registry::ChatRoom;

/// Routes decoded text frames into room mutations and broadcasts.
pub struct Router {
    room: Arc<ChatRoom>,
    names: Option<Arc<dyn NameSink>>,
}

impl Router {
    /// Build a router over a room, optionally recording joined names into
    /// `names` (fire-and-forget; its failures never reach the chat flow).
    pub fn new(room: Arc<ChatRoom>, names: Option<Arc<dyn NameSink>>) -> Self {
        Self { room, names }
    }

    /// The room this router mutates.
    pub fn room(&self) -> &Arc<ChatRoom> {
        &self.room
    }

    /// Handle one text-frame payload from `sender`.
    pub async fn handle_text(&self, sender: ConnId, payload: &[u8]) {
        let Ok(value) = serde_json::from_slice::<Value>(payload) else {
            self.send(sender, &ServerMessage::Error {
                message: "Invalid message format.".into(),
            })
            .await;
            return;
        };

        // Unknown or missing `type`, or fields of the wrong shape: ignore.
        let Ok(message) = serde_json::from_value::<ClientMessage>(value) else {
            return;
        };

        match message {
            ClientMessage::Join { name } => self.handle_join(sender, &name).await,
            ClientMessage::Chat { text } => self.handle_chat(sender, &text).await,
        }
    }

    /// Departure path, shared by close frames, EOF, and transport errors.
    ///
    /// Removes the connection; if it had joined, announces the departure
    /// and the shrunken roster to the remaining room.
    pub async fn handle_disconnect(&self, sender: ConnId) {
        if let Some(name) = self.room.remove(sender).await {
            info!(conn_id = %sender, %name, "peer left");
            self.broadcast(&ServerMessage::left(&name)).await;
            self.broadcast_roster().await;
        }
    }

    async fn handle_join(&self, sender: ConnId, requested: &str) {
        let name = normalize_name(requested);
        if name.is_empty() {
            self.send(sender, &ServerMessage::Error {
                message: "Name is required to join.".into(),
            })
            .await;
            return;
        }

        self.room.set_name(sender, name.clone()).await;
        counter!(CHAT_JOINS_TOTAL).increment(1);
        info!(conn_id = %sender, %name, "peer joined");

        self.send(sender, &ServerMessage::welcome(&name)).await;
        self.broadcast(&ServerMessage::joined(&name)).await;
        self.broadcast_roster().await;

        if let Some(sink) = &self.names {
            sink.record(&name);
        }
    }

    async fn handle_chat(&self, sender: ConnId, text: &str) {
        let Some(from) = self.room.name_of(sender).await else {
            self.send(sender, &ServerMessage::Error {
                message: "Set your name before chatting.".into(),
            })
            .await;
            return;
        };

        let text = text.trim();
        if text.is_empty() {
            return;
        }

        counter!(CHAT_MESSAGES_TOTAL).increment(1);
        self.broadcast(&ServerMessage::Chat {
            from,
            text: text.to_owned(),
            timestamp: now_ms(),
        })
        .await;
    }

    async fn send(&self, to: ConnId, message: &ServerMessage) {
        if let Some(frame) = encode_message(message) {
            self.room.send_to(to, frame).await;
        }
    }

    async fn broadcast(&self, message: &ServerMessage) {
        if let Some(frame) = encode_message(message) {
            self.room.broadcast(frame).await;
        }
    }

    async fn broadcast_roster(&self) {
        let names = self.room.names().await;
        self.broadcast(&ServerMessage::Users { names }).await;
    }
}

/// Serialize a server message and wrap it in a text frame, once, so a
/// broadcast shares the same bytes across every recipient.
fn encode_message(message: &ServerMessage) -> Option<Bytes> {
    match serde_json::to_vec(message) {
        Ok(json) => Some(Bytes::from(frame::encode(&json, Opcode::Text))),
        Err(e) => {
            warn!(error = %e, "failed to serialize server message");
            None
        }
    }
}

/// Server clock in Unix milliseconds, stamped onto relayed chat lines.
fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

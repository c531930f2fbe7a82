//! The chat room: the single shared mutable state of the service.
//!
//! Maps every live connection to an optional display name and owns frame
//! fan-out. Connection tasks run concurrently on the runtime, so the map
//! sits behind an async `RwLock`; mutation and full-room broadcast
//! iteration never race.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use bytes::Bytes;
use metrics::counter;
use parlor_core::ids::ConnId;
use tokio::sync::RwLock;
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

use crate::metrics::CHAT_BROADCASTS_TOTAL;

/// Registry value: the peer's outbound channel and chosen name.
struct Peer {
    /// Display name; absent until a successful join.
    name: Option<String>,
    /// Outbound channel carrying already-encoded frames. The receiving end
    /// is drained by the connection's writer task.
    tx: UnboundedSender<Bytes>,
}

/// Live connections and their chosen names.
///
/// All operations are O(1) expected apart from the enumerating ones. None
/// of them errors for an unknown connection: lookups report absence and
/// writes toward departed peers are no-ops.
pub struct ChatRoom {
    peers: RwLock<HashMap<ConnId, Peer>>,
    /// Tracks the map size without read-locking for count queries.
    active: AtomicUsize,
}

impl ChatRoom {
    /// Create an empty room.
    pub fn new() -> Self {
        Self {
            peers: RwLock::new(HashMap::new()),
            active: AtomicUsize::new(0),
        }
    }

    /// Register a connection, unnamed. Registering the same connection
    /// twice is a no-op that keeps the existing entry (and any name).
    pub async fn add(&self, id: ConnId, tx: UnboundedSender<Bytes>) {
        let mut peers = self.peers.write().await;
        if let std::collections::hash_map::Entry::Vacant(entry) = peers.entry(id) {
            let _ = entry.insert(Peer { name: None, tx });
            let _ = self.active.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Set (or overwrite) a connection's display name.
    pub async fn set_name(&self, id: ConnId, name: String) {
        let mut peers = self.peers.write().await;
        if let Some(peer) = peers.get_mut(&id) {
            peer.name = Some(name);
        }
    }

    /// The connection's display name, if it has joined.
    pub async fn name_of(&self, id: ConnId) -> Option<String> {
        let peers = self.peers.read().await;
        peers.get(&id).and_then(|p| p.name.clone())
    }

    /// Deregister a connection, returning the name it had immediately
    /// before deletion. Unknown connections report `None`.
    pub async fn remove(&self, id: ConnId) -> Option<String> {
        let mut peers = self.peers.write().await;
        let peer = peers.remove(&id)?;
        let _ = self.active.fetch_sub(1, Ordering::Relaxed);
        peer.name
    }

    /// Display names of every joined connection, order unspecified.
    pub async fn names(&self) -> Vec<String> {
        let peers = self.peers.read().await;
        peers.values().filter_map(|p| p.name.clone()).collect()
    }

    /// Every registered connection, joined or not.
    pub async fn connections(&self) -> Vec<ConnId> {
        let peers = self.peers.read().await;
        peers.keys().copied().collect()
    }

    /// Number of registered connections.
    pub fn len(&self) -> usize {
        self.active.load(Ordering::Relaxed)
    }

    /// Whether the room is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Send one encoded frame to one connection. A departed or unknown
    /// peer is a guarded no-op, not an error.
    pub async fn send_to(&self, id: ConnId, frame: Bytes) {
        let peers = self.peers.read().await;
        if let Some(peer) = peers.get(&id) {
            if peer.tx.send(frame).is_err() {
                debug!(conn_id = %id, "send to closed connection dropped");
            }
        }
    }

    /// Fan one encoded frame out to every registered connection.
    pub async fn broadcast(&self, frame: Bytes) {
        let peers = self.peers.read().await;
        counter!(CHAT_BROADCASTS_TOTAL).increment(1);
        for (id, peer) in peers.iter() {
            if peer.tx.send(frame.clone()).is_err() {
                debug!(conn_id = %id, "broadcast to closed connection dropped");
            }
        }
    }
}

impl Default for ChatRoom {
    fn default() -> Self {
        Self::new()
    }
}

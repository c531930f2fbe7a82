//! Branded connection identifiers.
//!
//! A [`ConnId`] identifies one live transport for the duration of its
//! membership in the chat room. IDs are minted from a process-wide atomic
//! counter, so they are unique within a server run and cheap to copy, hash,
//! and log.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

static NEXT_CONN_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque identity of one connected transport.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConnId(u64);

impl ConnId {
    /// Mint the next connection ID.
    pub fn next() -> Self {
        Self(NEXT_CONN_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Construct a specific ID. Intended for tests.
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// The underlying counter value.
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn_{}", self.0)
    }
}

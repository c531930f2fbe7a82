//! # parlor-proto
//!
//! The wire-protocol layer of the parlor chat service, implemented from
//! RFC 6455 primitives rather than a WebSocket framework.
//!
//! ## Submodules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | `frame` | Frame encode/decode: opcodes, length tiers, client masking |
//! | `http` | Minimal HTTP/1.1 request-head parsing for the upgrade path |
//! | `handshake` | Upgrade validation and the `Sec-WebSocket-Accept` response |
//!
//! ## Layering
//!
//! `http` parses the inbound request head → `handshake` validates it and
//! produces the `101 Switching Protocols` response → every later byte on the
//! transport goes through `frame`.

#![deny(unsafe_code)]

pub mod frame;
pub mod handshake;
pub mod http;

pub use frame::{Decoded, Frame, Opcode, apply_mask, decode, encode};
pub use handshake::{HandshakeError, accept_key, negotiate};
pub use http::{HttpParseError, RequestHead, find_head_end};

//! WebSocket opening handshake (RFC 6455 §4, server side).
//!
//! Validates an upgrade request head and produces the
//! `101 Switching Protocols` response that flips the transport into frame
//! mode. No extension or subprotocol negotiation. A violating request gets
//! no response at all — the caller drops the transport silently.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use sha1::{Digest, Sha1};
use thiserror::Error;

use crate::http::RequestHead;

/// Fixed GUID appended to the client key before hashing, per RFC 6455.
pub const ACCEPT_GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

/// Why an upgrade request was refused.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HandshakeError {
    /// The `Upgrade` header was absent or not `websocket`.
    #[error("Upgrade header missing or not 'websocket'")]
    NotWebsocket,
    /// The `Sec-WebSocket-Key` header was absent.
    #[error("missing Sec-WebSocket-Key header")]
    MissingKey,
}

/// Compute the `Sec-WebSocket-Accept` value for a client key:
/// `base64(SHA1(key ++ ACCEPT_GUID))`.
pub fn accept_key(client_key: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(client_key.as_bytes());
    hasher.update(ACCEPT_GUID.as_bytes());
    BASE64.encode(hasher.finalize())
}

/// Validate an upgrade request and build the switching response.
///
/// On success the returned bytes are the complete `101` response, blank-line
/// terminated; once written, every further byte on the transport belongs to
/// the frame layer.
pub fn negotiate(head: &RequestHead) -> Result<Vec<u8>, HandshakeError> {
    let upgrade = head.header("Upgrade").ok_or(HandshakeError::NotWebsocket)?;
    if !upgrade.eq_ignore_ascii_case("websocket") {
        return Err(HandshakeError::NotWebsocket);
    }
    let key = head
        .header("Sec-WebSocket-Key")
        .ok_or(HandshakeError::MissingKey)?;

    let response = format!(
        "HTTP/1.1 101 Switching Protocols\r\n\
         Upgrade: websocket\r\n\
         Connection: Upgrade\r\n\
         Sec-WebSocket-Accept: {}\r\n\
         \r\n",
        accept_key(key)
    );
    Ok(response.into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn head(raw: &[u8]) -> RequestHead {
        RequestHead::parse(raw).unwrap()
    }

    #[test]
    fn accept_key_matches_rfc_worked_example() {
        // RFC 6455 §1.3 uses this key/accept pair.
        assert_eq!(
            accept_key("dGhlIHNhbXBsZSBub25jZQ=="),
            "s3pPLMBiTxaQ9kYGzzhZRbK+xOo="
        );
    }

    #[test]
    fn negotiate_emits_switching_response() {
        let h = head(
            b"GET / HTTP/1.1\r\n\
              Upgrade: websocket\r\n\
              Connection: Upgrade\r\n\
              Sec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\n\
              \r\n",
        );
        let response = String::from_utf8(negotiate(&h).unwrap()).unwrap();
        assert!(response.starts_with("HTTP/1.1 101 Switching Protocols\r\n"));
        assert!(response.contains("Upgrade: websocket\r\n"));
        assert!(response.contains("Connection: Upgrade\r\n"));
        assert!(response.contains("Sec-WebSocket-Accept: s3pPLMBiTxaQ9kYGzzhZRbK+xOo=\r\n"));
        assert!(response.ends_with("\r\n\r\n"));
    }

    #[test]
    fn upgrade_header_is_case_insensitive() {
        let h = head(
            b"GET / HTTP/1.1\r\n\
              Upgrade: WebSocket\r\n\
              Sec-WebSocket-Key: abc123==\r\n\
              \r\n",
        );
        assert!(negotiate(&h).is_ok());
    }

    #[test]
    fn missing_upgrade_header_refused() {
        let h = head(b"GET / HTTP/1.1\r\nHost: x\r\n\r\n");
        assert_eq!(negotiate(&h), Err(HandshakeError::NotWebsocket));
    }

    #[test]
    fn wrong_upgrade_value_refused() {
        let h = head(b"GET / HTTP/1.1\r\nUpgrade: h2c\r\nSec-WebSocket-Key: k\r\n\r\n");
        assert_eq!(negotiate(&h), Err(HandshakeError::NotWebsocket));
    }

    #[test]
    fn missing_key_refused() {
        let h = head(b"GET / HTTP/1.1\r\nUpgrade: websocket\r\n\r\n");
        assert_eq!(negotiate(&h), Err(HandshakeError::MissingKey));
    }
}

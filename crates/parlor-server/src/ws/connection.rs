//! Per-connection read/write loops.
//!
//! Each upgraded transport gets a reader (this task) and a writer task
//! draining the peer's outbound channel. The reader accumulates raw bytes
//! in a buffer and re-attempts frame decoding as more data arrives, so a
//! frame split across TCP segments is reassembled instead of lost.
//!
//! Close frames, end-of-stream, and transport errors all converge on one
//! departure path guarded by a once-only flag; writer failures trigger the
//! same path independently.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use bytes::{Bytes, BytesMut};
use metrics::counter;
use parlor_core::ids::ConnId;
use parlor_proto::frame::{self, Opcode};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::metrics::{WS_CONNECTIONS_TOTAL, WS_DISCONNECTIONS_TOTAL};
use crate::ws::router::Router;

/// Cap on accumulated not-yet-decodable input per connection. A peer whose
/// single frame would exceed this is disconnected.
pub const MAX_BUFFERED_INPUT: usize = 1024 * 1024;

/// The once-only departure path for one connection.
///
/// Close, end-of-stream, and error events can all fire for the same
/// transport; whichever arrives first wins and the rest are no-ops.
struct Departure {
    router: Arc<Router>,
    id: ConnId,
    done: AtomicBool,
}

impl Departure {
    fn new(router: Arc<Router>, id: ConnId) -> Arc<Self> {
        Arc::new(Self {
            router,
            id,
            done: AtomicBool::new(false),
        })
    }

    async fn run_once(&self) {
        if self.done.swap(true, Ordering::SeqCst) {
            return;
        }
        counter!(WS_DISCONNECTIONS_TOTAL).increment(1);
        self.router.handle_disconnect(self.id).await;
    }
}

/// Drive one upgraded transport until it ends.
///
/// `initial` carries any bytes that arrived together with the handshake
/// head; they may already be frame data. The connection is registered
/// unnamed before any frame is processed.
pub async fn run<S>(stream: S, initial: BytesMut, router: Arc<Router>)
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let id = ConnId::next();
    let room = Arc::clone(router.room());
    let (tx, mut rx) = mpsc::unbounded_channel::<Bytes>();
    room.add(id, tx).await;
    counter!(WS_CONNECTIONS_TOTAL).increment(1);
    debug!(conn_id = %id, "connection registered");

    let (mut reader, mut writer) = tokio::io::split(stream);

    let departure = Departure::new(Arc::clone(&router), id);

    let writer_departure = Arc::clone(&departure);
    let _ = tokio::spawn(async move {
        while let Some(outbound) = rx.recv().await {
            if writer.write_all(&outbound).await.is_err() {
                writer_departure.run_once().await;
                break;
            }
        }
    });

    let mut buf = initial;
    'transport: loop {
        while let Some(decoded) = frame::decode(&buf) {
            let _ = buf.split_to(decoded.consumed);
            match decoded.frame.opcode {
                Opcode::Close => {
                    debug!(conn_id = %id, "close frame received");
                    break 'transport;
                }
                Opcode::Ping => {
                    let pong = Bytes::from(frame::encode(&decoded.frame.payload, Opcode::Pong));
                    room.send_to(id, pong).await;
                }
                Opcode::Text => router.handle_text(id, &decoded.frame.payload).await,
                Opcode::Binary | Opcode::Continuation | Opcode::Pong => {}
            }
        }

        if buf.len() > MAX_BUFFERED_INPUT {
            warn!(conn_id = %id, buffered = buf.len(), "input exceeds frame cap, disconnecting");
            break;
        }

        match reader.read_buf(&mut buf).await {
            Ok(0) => {
                debug!(conn_id = %id, "end of stream");
                break;
            }
            Ok(_) => {}
            Err(e) => {
                debug!(conn_id = %id, error = %e, "transport error");
                break;
            }
        }
    }

    departure.run_once().await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ws::registry::ChatRoom;
    use serde_json::Value;
    use std::time::Duration;
    use tokio::io::DuplexStream;
    use tokio::sync::mpsc::UnboundedReceiver;
    use tokio::time::timeout;

    const TICK: Duration = Duration::from_secs(2);

    struct TestSetup {
        router: Arc<Router>,
        room: Arc<ChatRoom>,
        client: DuplexStream,
    }

    /// Spawn `run` over an in-memory duplex transport.
    fn spawn_connection() -> TestSetup {
        let room = Arc::new(ChatRoom::new());
        let router = Arc::new(Router::new(Arc::clone(&room), None));
        let (client, server) = tokio::io::duplex(64 * 1024);
        let _ = tokio::spawn(run(server, BytesMut::new(), Arc::clone(&router)));
        TestSetup { router, room, client }
    }

    /// Register an observer peer that receives broadcasts without a transport.
    async fn observer(room: &ChatRoom, raw: u64) -> UnboundedReceiver<Bytes> {
        let (tx, rx) = mpsc::unbounded_channel();
        room.add(ConnId::from_raw(raw), tx).await;
        rx
    }

    async fn recv_json(rx: &mut UnboundedReceiver<Bytes>) -> Value {
        let bytes = timeout(TICK, rx.recv()).await.expect("timed out").unwrap();
        let decoded = frame::decode(&bytes).unwrap();
        serde_json::from_slice(&decoded.frame.payload).unwrap()
    }

    async fn wait_for_room_len(room: &ChatRoom, len: usize) {
        let deadline = tokio::time::Instant::now() + TICK;
        while room.len() != len {
            assert!(tokio::time::Instant::now() < deadline, "room never reached {len}");
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    #[tokio::test]
    async fn text_frame_reaches_router() {
        let mut setup = spawn_connection();
        let mut rx = observer(&setup.room, 9001).await;
        wait_for_room_len(&setup.room, 2).await;

        let join = frame::encode(br#"{"type":"join","name":"Alice"}"#, Opcode::Text);
        setup.client.write_all(&join).await.unwrap();

        // The observer sees the join status broadcast.
        let status = recv_json(&mut rx).await;
        assert_eq!(status["message"], "Alice joined the chat.");
    }

    #[tokio::test]
    async fn frame_split_across_reads_is_reassembled() {
        let mut setup = spawn_connection();
        let mut rx = observer(&setup.room, 9001).await;
        wait_for_room_len(&setup.room, 2).await;

        let join = frame::encode(br#"{"type":"join","name":"Alice"}"#, Opcode::Text);
        let (first, second) = join.split_at(7);
        setup.client.write_all(first).await.unwrap();
        setup.client.flush().await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        setup.client.write_all(second).await.unwrap();

        let status = recv_json(&mut rx).await;
        assert_eq!(status["message"], "Alice joined the chat.");
    }

    #[tokio::test]
    async fn two_frames_in_one_write_both_dispatch() {
        let mut setup = spawn_connection();
        let mut rx = observer(&setup.room, 9001).await;
        wait_for_room_len(&setup.room, 2).await;

        let mut bytes = frame::encode(br#"{"type":"join","name":"Alice"}"#, Opcode::Text);
        bytes.extend_from_slice(&frame::encode(br#"{"type":"chat","text":"hi"}"#, Opcode::Text));
        setup.client.write_all(&bytes).await.unwrap();

        let status = recv_json(&mut rx).await;
        assert_eq!(status["message"], "Alice joined the chat.");
        let users = recv_json(&mut rx).await;
        assert_eq!(users["type"], "users");
        let chat = recv_json(&mut rx).await;
        assert_eq!(chat["type"], "chat");
        assert_eq!(chat["text"], "hi");
    }

    #[tokio::test]
    async fn ping_is_answered_with_pong_payload() {
        let mut setup = spawn_connection();
        wait_for_room_len(&setup.room, 1).await;

        let ping = frame::encode(b"beat-7", Opcode::Ping);
        setup.client.write_all(&ping).await.unwrap();

        let mut response = vec![0u8; 64];
        let n = timeout(TICK, setup.client.read(&mut response)).await.unwrap().unwrap();
        let decoded = frame::decode(&response[..n]).unwrap();
        assert_eq!(decoded.frame.opcode, Opcode::Pong);
        assert_eq!(decoded.frame.payload, b"beat-7");
    }

    #[tokio::test]
    async fn close_frame_deregisters() {
        let mut setup = spawn_connection();
        wait_for_room_len(&setup.room, 1).await;

        let close = frame::encode(&[], Opcode::Close);
        setup.client.write_all(&close).await.unwrap();

        wait_for_room_len(&setup.room, 0).await;
    }

    #[tokio::test]
    async fn dropped_transport_announces_departure_once() {
        let mut setup = spawn_connection();
        let mut rx = observer(&setup.room, 9001).await;
        wait_for_room_len(&setup.room, 2).await;

        let join = frame::encode(br#"{"type":"join","name":"Bob"}"#, Opcode::Text);
        setup.client.write_all(&join).await.unwrap();
        let _status = recv_json(&mut rx).await;
        let _users = recv_json(&mut rx).await;

        drop(setup.client);

        let left = recv_json(&mut rx).await;
        assert_eq!(left["message"], "Bob left the chat.");
        let roster = recv_json(&mut rx).await;
        assert_eq!(roster["names"], serde_json::json!([]));

        // No second departure announcement.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(rx.try_recv().is_err());
        let _ = setup.router;
    }

    #[tokio::test]
    async fn binary_frames_are_ignored() {
        let mut setup = spawn_connection();
        let mut rx = observer(&setup.room, 9001).await;
        wait_for_room_len(&setup.room, 2).await;

        setup
            .client
            .write_all(&frame::encode(b"\x01\x02", Opcode::Binary))
            .await
            .unwrap();
        let join = frame::encode(br#"{"type":"join","name":"Alice"}"#, Opcode::Text);
        setup.client.write_all(&join).await.unwrap();

        // The binary frame produced nothing; the next broadcast is the join.
        let status = recv_json(&mut rx).await;
        assert_eq!(status["message"], "Alice joined the chat.");
    }

    #[tokio::test]
    async fn oversized_frame_disconnects() {
        let mut setup = spawn_connection();
        wait_for_room_len(&setup.room, 1).await;

        // Declare a payload just past the cap; send only the header.
        let mut header = vec![0x81, 127];
        header.extend_from_slice(&((MAX_BUFFERED_INPUT as u64 + 1) * 2).to_be_bytes());
        setup.client.write_all(&header).await.unwrap();
        // Keep feeding until the cap trips.
        let chunk = vec![0u8; 64 * 1024];
        loop {
            match timeout(TICK, setup.client.write_all(&chunk)).await {
                Ok(Ok(())) => {
                    if setup.room.is_empty() {
                        break;
                    }
                }
                _ => break, // peer hung up
            }
        }
        wait_for_room_len(&setup.room, 0).await;
    }
}

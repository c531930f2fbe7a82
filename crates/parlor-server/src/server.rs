//! TCP accept loop: one listener, three surfaces.
//!
//! Each accepted connection reads a request head, then routes: upgrade
//! requests go through the WebSocket handshake into the frame loop,
//! `GET /metrics` renders the Prometheus recorder, and everything else is
//! answered by the static file collaborator with `Connection: close`
//! semantics. A handshake violation gets no response bytes at all.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::BytesMut;
use metrics::counter;
use metrics_exporter_prometheus::PrometheusHandle;
use parlor_proto::handshake;
use parlor_proto::http::{RequestHead, find_head_end};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info};

use crate::config::Config;
use crate::metrics::{HTTP_REQUESTS_TOTAL, WS_HANDSHAKE_FAILURES_TOTAL};
use crate::static_files::{StaticFiles, StaticResponse};
use crate::ws::{self, router::Router};

/// Upper bound on a request head; longer heads abort the connection.
const MAX_HEAD_BYTES: usize = 16 * 1024;

/// The listening server.
pub struct Server {
    listener: TcpListener,
    router: Arc<Router>,
    assets: Arc<StaticFiles>,
    metrics_handle: Option<PrometheusHandle>,
}

impl Server {
    /// Bind the configured address. With port 0 the OS picks one; see
    /// [`Server::local_addr`].
    pub async fn bind(
        cfg: &Config,
        router: Arc<Router>,
        metrics_handle: Option<PrometheusHandle>,
    ) -> io::Result<Self> {
        let listener = TcpListener::bind(cfg.bind).await?;
        Ok(Self {
            listener,
            router,
            assets: Arc::new(StaticFiles::new(cfg.public_dir.clone())),
            metrics_handle,
        })
    }

    /// The address actually bound.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections forever.
    pub async fn run(self) -> io::Result<()> {
        loop {
            let (stream, peer) = self.listener.accept().await?;
            debug!(%peer, "accepted connection");
            let router = Arc::clone(&self.router);
            let assets = Arc::clone(&self.assets);
            let metrics_handle = self.metrics_handle.clone();
            let _ = tokio::spawn(handle_connection(stream, router, assets, metrics_handle));
        }
    }
}

async fn handle_connection(
    mut stream: TcpStream,
    router: Arc<Router>,
    assets: Arc<StaticFiles>,
    metrics_handle: Option<PrometheusHandle>,
) {
    let (head_bytes, leftover) = match read_head(&mut stream).await {
        Ok(pair) => pair,
        Err(e) => {
            debug!(error = %e, "failed to read request head");
            return;
        }
    };
    let head = match RequestHead::parse(&head_bytes) {
        Ok(head) => head,
        Err(e) => {
            debug!(error = %e, "unparseable request head");
            return;
        }
    };

    if head.header("Upgrade").is_some() {
        match handshake::negotiate(&head) {
            Ok(response) => {
                if stream.write_all(&response).await.is_err() {
                    return;
                }
                info!(path = %head.target, "websocket established");
                ws::connection::run(stream, leftover, router).await;
            }
            Err(e) => {
                // Silent abort: drop the transport without a response.
                counter!(WS_HANDSHAKE_FAILURES_TOTAL).increment(1);
                debug!(error = %e, "handshake refused");
            }
        }
        return;
    }

    counter!(HTTP_REQUESTS_TOTAL).increment(1);
    let response = if head.path() == "/metrics" && metrics_handle.is_some() {
        let body = metrics_handle
            .as_ref()
            .map(crate::metrics::render)
            .unwrap_or_default();
        http_response(200, "OK", "text/plain; charset=utf-8", body.as_bytes())
    } else {
        match assets.resolve(head.path()).await {
            StaticResponse::Found { bytes, content_type } => {
                http_response(200, "OK", content_type, &bytes)
            }
            StaticResponse::Forbidden => {
                http_response(403, "Forbidden", "text/plain; charset=utf-8", b"Forbidden")
            }
            StaticResponse::NotFound => {
                http_response(404, "Not Found", "text/plain; charset=utf-8", b"Not found")
            }
        }
    };
    let _ = stream.write_all(&response).await;
    let _ = stream.shutdown().await;
}

/// Read up to and including the head terminator.
///
/// Returns the head bytes and whatever arrived after the blank line —
/// possibly the beginning of frame data on an upgrade.
async fn read_head<S>(stream: &mut S) -> io::Result<(BytesMut, BytesMut)>
where
    S: AsyncRead + Unpin,
{
    let mut buf = BytesMut::with_capacity(1024);
    loop {
        if let Some(end) = find_head_end(&buf) {
            let leftover = buf.split_off(end);
            return Ok((buf, leftover));
        }
        if buf.len() > MAX_HEAD_BYTES {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "request head too large",
            ));
        }
        let n = stream.read_buf(&mut buf).await?;
        if n == 0 {
            return Err(io::ErrorKind::UnexpectedEof.into());
        }
    }
}

fn http_response(status: u16, reason: &str, content_type: &str, body: &[u8]) -> Vec<u8> {
    let mut response = format!(
        "HTTP/1.1 {status} {reason}\r\n\
         Content-Type: {content_type}\r\n\
         Content-Length: {}\r\n\
         Connection: close\r\n\
         \r\n",
        body.len()
    )
    .into_bytes();
    response.extend_from_slice(body);
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn read_head_preserves_leftover_bytes() {
        let (mut client, mut server) = tokio::io::duplex(4096);
        client
            .write_all(b"GET / HTTP/1.1\r\nHost: x\r\n\r\n\x81\x02hi")
            .await
            .unwrap();

        let (head, leftover) = read_head(&mut server).await.unwrap();
        assert!(head.ends_with(b"\r\n\r\n"));
        assert_eq!(&leftover[..], b"\x81\x02hi");
    }

    #[tokio::test]
    async fn read_head_waits_for_terminator_across_writes() {
        let (mut client, mut server) = tokio::io::duplex(4096);
        let reader = tokio::spawn(async move { read_head(&mut server).await });
        client.write_all(b"GET / HTTP/1.1\r\n").await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        client.write_all(b"Host: x\r\n\r\n").await.unwrap();

        let (head, leftover) = reader.await.unwrap().unwrap();
        assert_eq!(&head[..], b"GET / HTTP/1.1\r\nHost: x\r\n\r\n");
        assert!(leftover.is_empty());
    }

    #[tokio::test]
    async fn read_head_errors_on_eof_before_terminator() {
        let (mut client, mut server) = tokio::io::duplex(4096);
        client.write_all(b"GET / HTTP/1.1\r\n").await.unwrap();
        drop(client);
        assert!(read_head(&mut server).await.is_err());
    }

    #[test]
    fn http_response_shape() {
        let response = String::from_utf8(http_response(
            404,
            "Not Found",
            "text/plain; charset=utf-8",
            b"Not found",
        ))
        .unwrap();
        assert!(response.starts_with("HTTP/1.1 404 Not Found\r\n"));
        assert!(response.contains("Content-Length: 9\r\n"));
        assert!(response.contains("Connection: close\r\n"));
        assert!(response.ends_with("\r\n\r\nNot found"));
    }
}

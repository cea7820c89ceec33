//! Newline-delimited JSON transport for live chat clients.
//!
//! 1. client → `{"user": UUID, "name": str, "group": UUID, "html": bool}`
//! 2. server → `{"type": "ready", "connection": ULID}`
//! 3. client → `{"text": str}` posts to the group, any number of times
//! 4. server → one line per message broadcast to the group
//!
//! Closing the socket deregisters the connection.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::net::TcpStream;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::mpsc;
use tokio_util::codec::{FramedRead, LinesCodec, LinesCodecError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::fanout::{ChatHub, LiveConnection, PayloadFormat, RegistryError, Transport, TransportError};
use crate::limits::*;
use crate::model::*;

#[derive(Debug)]
pub enum WireError {
    Io(std::io::Error),
    LineTooLong,
    HandshakeTimeout,
    BadHandshake(String),
    Registry(RegistryError),
    Transport(TransportError),
}

impl std::fmt::Display for WireError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WireError::Io(e) => write!(f, "I/O error: {e}"),
            WireError::LineTooLong => write!(f, "line exceeds {MAX_LINE_BYTES} bytes"),
            WireError::HandshakeTimeout => write!(f, "no handshake within {HANDSHAKE_TIMEOUT_MS}ms"),
            WireError::BadHandshake(e) => write!(f, "bad handshake: {e}"),
            WireError::Registry(e) => write!(f, "registration refused: {e}"),
            WireError::Transport(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for WireError {}

impl From<std::io::Error> for WireError {
    fn from(e: std::io::Error) -> Self {
        WireError::Io(e)
    }
}

impl From<LinesCodecError> for WireError {
    fn from(e: LinesCodecError) -> Self {
        match e {
            LinesCodecError::MaxLineLengthExceeded => WireError::LineTooLong,
            LinesCodecError::Io(e) => WireError::Io(e),
        }
    }
}

impl From<RegistryError> for WireError {
    fn from(e: RegistryError) -> Self {
        WireError::Registry(e)
    }
}

impl From<TransportError> for WireError {
    fn from(e: TransportError) -> Self {
        WireError::Transport(e)
    }
}

// ── Frames ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hello {
    pub user: UserId,
    pub name: String,
    pub group: ChatGroup,
    #[serde(default)]
    pub html: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Reply {
    Ready { connection: ConnectionId },
    Error { message: String },
}

impl Reply {
    fn frame(&self) -> Bytes {
        // Reply has no maps or non-string keys; serialization can't fail.
        Bytes::from(serde_json::to_vec(self).unwrap_or_default())
    }
}

// ── Transport ────────────────────────────────────────────────────

/// Bounded FIFO to a writer task that owns the socket's write half.
/// A full queue means the client isn't reading; that counts as a failed write.
pub struct LineTransport {
    tx: mpsc::Sender<Bytes>,
    cancel: CancellationToken,
}

impl LineTransport {
    pub fn spawn(writer: OwnedWriteHalf, queue: usize) -> Arc<Self> {
        let (tx, rx) = mpsc::channel(queue.max(1));
        let cancel = CancellationToken::new();
        tokio::spawn(writer_loop(BufWriter::new(writer), rx, cancel.clone()));
        Arc::new(Self { tx, cancel })
    }

    pub fn closed(&self) -> tokio_util::sync::WaitForCancellationFuture<'_> {
        self.cancel.cancelled()
    }
}

#[async_trait]
impl Transport for LineTransport {
    async fn send(&self, frame: Bytes) -> Result<(), TransportError> {
        if self.cancel.is_cancelled() {
            return Err(TransportError::Closed);
        }
        self.tx.try_send(frame).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => TransportError::Backpressure,
            mpsc::error::TrySendError::Closed(_) => TransportError::Closed,
        })
    }

    async fn close(&self) {
        self.cancel.cancel();
    }
}

async fn writer_loop(mut writer: BufWriter<OwnedWriteHalf>, mut rx: mpsc::Receiver<Bytes>, cancel: CancellationToken) {
    let mut stalled = false;
    loop {
        let frame = tokio::select! {
            frame = rx.recv() => match frame {
                Some(frame) => frame,
                None => break,
            },
            _ = cancel.cancelled() => break,
        };
        // Flush once the queue is drained rather than per frame.
        let flush = rx.is_empty();
        // A write that completes without blocking wins over a concurrent close.
        let result = tokio::select! {
            biased;
            result = write_frame(&mut writer, &frame, flush) => result,
            _ = cancel.cancelled() => {
                stalled = true;
                break;
            }
        };
        if let Err(e) = result {
            debug!("writer stopped: {e}");
            break;
        }
    }
    cancel.cancel();
    if stalled {
        debug!("closed while blocked on a write, queued frames dropped");
        return;
    }

    // Deliver what was already queued, but never wait on a peer that stopped reading.
    let drain = async {
        while let Ok(frame) = rx.try_recv() {
            if write_frame(&mut writer, &frame, false).await.is_err() {
                return;
            }
        }
        let _ = writer.flush().await;
        let _ = writer.shutdown().await;
    };
    if tokio::time::timeout(Duration::from_millis(CLOSE_DRAIN_MS), drain).await.is_err() {
        debug!("queued frames not drained within {CLOSE_DRAIN_MS}ms, dropped");
    }
}

async fn write_frame(writer: &mut BufWriter<OwnedWriteHalf>, frame: &[u8], flush: bool) -> std::io::Result<()> {
    writer.write_all(frame).await?;
    writer.write_all(b"\n").await?;
    if flush {
        writer.flush().await?;
    }
    Ok(())
}

// ── Connection ───────────────────────────────────────────────────

/// Serve one client socket until it disconnects.
pub async fn process_connection(socket: TcpStream, hub: Arc<ChatHub>, outbound_queue: usize) -> Result<(), WireError> {
    let (read_half, write_half) = socket.into_split();
    let mut lines = FramedRead::new(read_half, LinesCodec::new_with_max_length(MAX_LINE_BYTES));
    let transport = LineTransport::spawn(write_half, outbound_queue);

    let hello = match read_hello(&mut lines).await {
        Ok(hello) => hello,
        Err(e) => {
            metrics::counter!(crate::observability::HANDSHAKE_FAILURES_TOTAL).increment(1);
            reject(&transport, &e).await;
            return Err(e);
        }
    };

    let format = if hello.html {
        PayloadFormat::Html
    } else {
        PayloadFormat::Json
    };
    let conn = LiveConnection::new(hello.user, hello.group, format, transport.clone());

    // Reserved connections are skipped by broadcasts, so `ready` is always
    // the first frame the client sees.
    if let Err(e) = hub.reserve(&conn) {
        let e = WireError::from(e);
        reject(&transport, &e).await;
        return Err(e);
    }
    let opened = match transport.send(Reply::Ready { connection: conn.id }.frame()).await {
        Ok(()) => hub.activate(&conn).map_err(WireError::from),
        Err(e) => Err(WireError::from(e)),
    };
    if let Err(e) = opened {
        hub.deregister(&conn);
        transport.close().await;
        return Err(e);
    }
    info!("{} joined group {} as {}", hello.user, hello.group, conn.id);

    let result = serve(&mut lines, &hub, &conn, &hello, &transport).await;

    hub.deregister(&conn);
    transport.close().await;
    info!("{} left group {}", conn.id, hello.group);
    result
}

async fn read_hello(lines: &mut FramedRead<tokio::net::tcp::OwnedReadHalf, LinesCodec>) -> Result<Hello, WireError> {
    let line = tokio::time::timeout(Duration::from_millis(HANDSHAKE_TIMEOUT_MS), lines.next())
        .await
        .map_err(|_| WireError::HandshakeTimeout)?
        .ok_or_else(|| WireError::BadHandshake("connection closed".into()))??;

    let hello: Hello = serde_json::from_str(&line).map_err(|e| WireError::BadHandshake(e.to_string()))?;
    if hello.name.trim().is_empty() || hello.name.len() > MAX_NAME_BYTES {
        return Err(WireError::BadHandshake("invalid display name".into()));
    }
    Ok(hello)
}

async fn serve(
    lines: &mut FramedRead<tokio::net::tcp::OwnedReadHalf, LinesCodec>,
    hub: &ChatHub,
    conn: &LiveConnection,
    hello: &Hello,
    transport: &LineTransport,
) -> Result<(), WireError> {
    loop {
        let line = tokio::select! {
            line = lines.next() => match line {
                Some(line) => line?,
                None => return Ok(()),
            },
            // Evicted by a failed broadcast.
            _ = transport.closed() => return Ok(()),
        };

        let post: Post = match serde_json::from_str(&line) {
            Ok(post) => post,
            Err(e) => {
                send_error(transport, format!("bad frame: {e}")).await;
                continue;
            }
        };
        let text = post.text.trim();
        if text.is_empty() {
            continue;
        }
        if text.len() > MAX_MESSAGE_BYTES {
            send_error(transport, format!("message exceeds {MAX_MESSAGE_BYTES} bytes")).await;
            continue;
        }

        let message = ChatMessage::new(conn.group, conn.user, hello.name.clone(), text, now_ms());
        hub.post(&message).await;
    }
}

async fn send_error(transport: &LineTransport, message: String) {
    let _ = transport.send(Reply::Error { message }.frame()).await;
}

async fn reject(transport: &LineTransport, e: &WireError) {
    send_error(transport, e.to_string()).await;
    transport.close().await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hello_defaults_to_json() {
        let user = UserId::new();
        let group = ChatGroup::new();
        let line = format!(r#"{{"user":"{}","name":"sam","group":"{}"}}"#, user.0, group.0);
        let hello: Hello = serde_json::from_str(&line).unwrap();
        assert_eq!(hello.user, user);
        assert_eq!(hello.group, group);
        assert!(!hello.html);
    }

    #[test]
    fn reply_wire_shape() {
        let id = ConnectionId::new();
        let json: serde_json::Value = serde_json::from_slice(&Reply::Ready { connection: id }.frame()).unwrap();
        assert_eq!(json["type"], "ready");
        assert_eq!(json["connection"], id.0.to_string());

        let json: serde_json::Value =
            serde_json::from_slice(&Reply::Error { message: "nope".into() }.frame()).unwrap();
        assert_eq!(json["type"], "error");
        assert_eq!(json["message"], "nope");
    }

    #[tokio::test]
    async fn close_stops_a_writer_blocked_on_a_stalled_peer() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let _client = TcpStream::connect(listener.local_addr().unwrap()).await.unwrap();
        let (socket, _) = listener.accept().await.unwrap();
        let (_read_half, write_half) = socket.into_split();
        let transport = LineTransport::spawn(write_half, 256);

        // Far more than the socket buffers hold; the client never reads.
        let frame = Bytes::from(vec![b'x'; 64 * 1024]);
        for _ in 0..200 {
            let _ = transport.send(frame.clone()).await;
            tokio::task::yield_now().await;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!transport.tx.is_closed());

        transport.close().await;
        let exited = tokio::time::timeout(Duration::from_secs(2), async {
            while !transport.tx.is_closed() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await;
        assert!(exited.is_ok(), "writer task outlived close()");
        assert_eq!(transport.send(frame).await, Err(TransportError::Closed));
    }

    #[test]
    fn codec_errors_map() {
        assert!(matches!(
            WireError::from(LinesCodecError::MaxLineLengthExceeded),
            WireError::LineTooLong
        ));
    }
}

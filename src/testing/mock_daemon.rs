//! Scripted mock adbd speaking the ADB transport over loopback TCP.

use super::shared_identity;
use crate::protocol::crypto::TlsIdentity;
use crate::protocol::wire::{
    AdbMessage, Command, MessageHeader, WireCodec, AUTH_RSAPUBLICKEY, AUTH_SIGNATURE, AUTH_TOKEN,
    CONNECT_VERSION, HEADER_LEN, MAX_PAYLOAD, STLS_VERSION,
};
use rand::RngCore;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadBuf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, RwLock};

/// How the mock answers the connect handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthPolicy {
    /// Reply `CNXN` immediately (no authentication)
    None,
    /// One `AUTH` token round; any signature is accepted
    AcceptSignature,
    /// Demand the public key after the signature, then accept
    RequirePublicKey,
    /// Demand signature and public key, then close the socket
    Reject,
}

/// Configuration for the mock daemon.
#[derive(Debug, Clone)]
pub struct MockDaemonConfig {
    /// Authentication script
    pub auth: AuthPolicy,
    /// Request an STLS upgrade before anything else
    pub use_stls: bool,
    /// Banner sent in the daemon `CNXN`
    pub banner: String,
    /// Canned output per `shell:`/`exec:` command
    pub shell_outputs: HashMap<String, Vec<u8>>,
    /// Files served to sync `RECV` requests
    pub files: HashMap<String, Vec<u8>>,
    /// Answer every `RECV` with `FAIL` and this reason
    pub sync_fail: Option<String>,
    /// Re-split the sync packet stream into `WRTE` frames of this size
    pub sync_frame_len: Option<usize>,
    /// Maximum payload per `DATA` packet
    pub sync_data_chunk: usize,
    /// Close the sync stream after the `DATA` packets without `DONE`
    pub early_close_sync: bool,
    /// Interleave a foreign-stream `WRTE` before each service reply
    pub inject_foreign_wrte: bool,
    /// Hold each `shell:`/`exec:` open-acknowledgement for this long
    pub shell_delay: Option<std::time::Duration>,
    /// Drop the connection after serving this many `OPEN`s
    pub close_after_services: Option<usize>,
}

impl Default for MockDaemonConfig {
    fn default() -> Self {
        Self {
            auth: AuthPolicy::None,
            use_stls: false,
            banner: "device::ro.product.name=mock;".to_string(),
            shell_outputs: HashMap::new(),
            files: HashMap::new(),
            sync_fail: None,
            sync_frame_len: None,
            sync_data_chunk: 64 * 1024,
            early_close_sync: false,
            inject_foreign_wrte: false,
            shell_delay: None,
            close_after_services: None,
        }
    }
}

/// Observable daemon-side state.
#[derive(Debug, Default)]
struct DaemonState {
    /// Public key received via `AUTH(RSAPUBLICKEY)`
    received_public_key: Option<Vec<u8>>,
    /// Service strings the client opened
    opened_services: Vec<String>,
}

/// A mock adbd instance.
pub struct MockDaemon {
    config: MockDaemonConfig,
    state: Arc<RwLock<DaemonState>>,
    shutdown: Option<mpsc::Sender<()>>,
    address: Option<SocketAddr>,
}

impl MockDaemon {
    /// Creates a mock daemon with the given script.
    #[must_use]
    pub fn new(config: MockDaemonConfig) -> Self {
        Self {
            config,
            state: Arc::new(RwLock::new(DaemonState::default())),
            shutdown: None,
            address: None,
        }
    }

    /// Starts listening on an ephemeral loopback port.
    ///
    /// # Errors
    ///
    /// Returns an error if the TCP listener cannot be bound.
    pub async fn start(&mut self) -> Result<SocketAddr, std::io::Error> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        self.address = Some(addr);

        let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);
        self.shutdown = Some(shutdown_tx);

        let state = self.state.clone();
        let config = self.config.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    result = listener.accept() => {
                        match result {
                            Ok((stream, _)) => {
                                let state = state.clone();
                                let config = config.clone();
                                tokio::spawn(async move {
                                    if let Err(e) = handle_connection(stream, state, config).await {
                                        tracing::debug!("mock daemon connection ended: {e}");
                                    }
                                });
                            }
                            Err(e) => {
                                tracing::error!("accept error: {e}");
                            }
                        }
                    }
                    _ = shutdown_rx.recv() => break,
                }
            }
        });

        Ok(addr)
    }

    /// Stops the accept loop.
    pub async fn stop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(()).await;
        }
    }

    /// The bound address.
    #[must_use]
    pub fn address(&self) -> Option<SocketAddr> {
        self.address
    }

    /// The public key the client offered, if any.
    pub async fn received_public_key(&self) -> Option<Vec<u8>> {
        self.state.read().await.received_public_key.clone()
    }

    /// Every service string the client opened, in order.
    pub async fn opened_services(&self) -> Vec<String> {
        self.state.read().await.opened_services.clone()
    }
}

impl Drop for MockDaemon {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.try_send(());
        }
    }
}

/// The daemon-side transport (plain or TLS-upgraded).
enum ServerStream {
    Plain(TcpStream),
    Tls(Box<tokio_rustls::server::TlsStream<TcpStream>>),
}

impl AsyncRead for ServerStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            Self::Plain(s) => Pin::new(s).poll_read(cx, buf),
            Self::Tls(s) => Pin::new(s.as_mut()).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for ServerStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        match self.get_mut() {
            Self::Plain(s) => Pin::new(s).poll_write(cx, buf),
            Self::Tls(s) => Pin::new(s.as_mut()).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            Self::Plain(s) => Pin::new(s).poll_flush(cx),
            Self::Tls(s) => Pin::new(s.as_mut()).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            Self::Plain(s) => Pin::new(s).poll_shutdown(cx),
            Self::Tls(s) => Pin::new(s.as_mut()).poll_shutdown(cx),
        }
    }
}

async fn handle_connection(
    tcp: TcpStream,
    state: Arc<RwLock<DaemonState>>,
    config: MockDaemonConfig,
) -> std::io::Result<()> {
    let mut stream = ServerStream::Plain(tcp);
    let mut codec = WireCodec::new();

    if config.use_stls {
        // Exact-length reads here: the client's TLS ClientHello follows its
        // STLS ack immediately, and a greedy read would swallow it.
        let Some(hello) = read_message_exact(&mut stream).await? else {
            return Ok(());
        };
        if hello.command != Command::Cnxn {
            return Ok(());
        }

        send(&mut stream, &AdbMessage::new(Command::Stls, STLS_VERSION, 0, bytes::Bytes::new()))
            .await?;

        let Some(reply) = read_message_exact(&mut stream).await? else {
            return Ok(());
        };
        if reply.command != Command::Stls {
            return Ok(());
        }

        let ServerStream::Plain(tcp) = stream else {
            return Ok(());
        };
        let identity = shared_identity();
        let tls_identity = TlsIdentity::from_identity(&identity)
            .map_err(|e| std::io::Error::other(e.to_string()))?;
        let acceptor = tokio_rustls::TlsAcceptor::from(
            tls_identity
                .server_config()
                .map_err(|e| std::io::Error::other(e.to_string()))?,
        );
        stream = ServerStream::Tls(Box::new(acceptor.accept(tcp).await?));
        codec.reset();

        // TLS handshake is the authentication in this branch.
        send_banner(&mut stream, &config).await?;
    } else {
        let Some(hello) = read_message(&mut stream, &mut codec).await? else {
            return Ok(());
        };
        if hello.command != Command::Cnxn {
            return Ok(());
        }

        run_auth_script(&mut stream, &mut codec, &state, &config).await?;
        if config.auth == AuthPolicy::Reject {
            return Ok(());
        }
    }

    // Service loop.
    let mut next_remote_id = 1000u32;
    let mut served = 0usize;
    loop {
        if config.close_after_services.is_some_and(|n| served >= n) {
            return Ok(());
        }

        let Some(msg) = read_message(&mut stream, &mut codec).await? else {
            return Ok(());
        };

        match msg.command {
            Command::Open => {
                served += 1;
                let service = String::from_utf8_lossy(&msg.payload)
                    .trim_end_matches('\0')
                    .to_string();
                state.write().await.opened_services.push(service.clone());

                let client_id = msg.arg0;
                let remote_id = next_remote_id;
                next_remote_id += 1;

                if config.inject_foreign_wrte {
                    // A frame for a stream this client never opened; it must
                    // answer courteously and carry on.
                    send(
                        &mut stream,
                        &AdbMessage::wrte(0xDEAD, client_id.wrapping_add(7), &b"noise"[..]),
                    )
                    .await?;
                }

                if let Some(cmd) = service
                    .strip_prefix("shell:")
                    .or_else(|| service.strip_prefix("exec:"))
                {
                    serve_command(&mut stream, &mut codec, &config, cmd, remote_id, client_id)
                        .await?;
                } else if service == "sync:" {
                    serve_sync(&mut stream, &mut codec, &config, remote_id, client_id).await?;
                } else {
                    send(&mut stream, &AdbMessage::clse(remote_id, client_id)).await?;
                }
            }
            // Courtesy replies and stray acks from the client.
            Command::Okay | Command::Clse => {}
            _ => {}
        }
    }
}

async fn run_auth_script(
    stream: &mut ServerStream,
    codec: &mut WireCodec,
    state: &Arc<RwLock<DaemonState>>,
    config: &MockDaemonConfig,
) -> std::io::Result<()> {
    if config.auth == AuthPolicy::None {
        return send_banner(stream, config).await;
    }

    let mut token = [0u8; 20];
    rand::rngs::OsRng.fill_bytes(&mut token);
    send(
        stream,
        &AdbMessage::new(Command::Auth, AUTH_TOKEN, 0, token.to_vec()),
    )
    .await?;

    let Some(signature) = read_message(stream, codec).await? else {
        return Ok(());
    };
    if signature.command != Command::Auth || signature.arg0 != AUTH_SIGNATURE {
        return Ok(());
    }

    if config.auth == AuthPolicy::AcceptSignature {
        return send_banner(stream, config).await;
    }

    // RequirePublicKey and Reject both challenge again.
    send(
        stream,
        &AdbMessage::new(Command::Auth, AUTH_TOKEN, 0, token.to_vec()),
    )
    .await?;

    let Some(offered) = read_message(stream, codec).await? else {
        return Ok(());
    };
    if offered.command != Command::Auth || offered.arg0 != AUTH_RSAPUBLICKEY {
        return Ok(());
    }
    state.write().await.received_public_key = Some(offered.payload.to_vec());

    if config.auth == AuthPolicy::Reject {
        // Closing here is what the client reports as AuthRejected.
        return Ok(());
    }

    send_banner(stream, config).await
}

async fn serve_command(
    stream: &mut ServerStream,
    codec: &mut WireCodec,
    config: &MockDaemonConfig,
    command: &str,
    remote_id: u32,
    client_id: u32,
) -> std::io::Result<()> {
    if let Some(delay) = config.shell_delay {
        tokio::time::sleep(delay).await;
    }
    send(stream, &AdbMessage::okay(remote_id, client_id)).await?;

    let output = config
        .shell_outputs
        .get(command)
        .cloned()
        .unwrap_or_default();

    if !output.is_empty() {
        send(stream, &AdbMessage::wrte(remote_id, client_id, output)).await?;
        // Client acks every WRTE.
        wait_for_okay(stream, codec).await?;
    }

    send(stream, &AdbMessage::clse(remote_id, client_id)).await
}

async fn serve_sync(
    stream: &mut ServerStream,
    codec: &mut WireCodec,
    config: &MockDaemonConfig,
    remote_id: u32,
    client_id: u32,
) -> std::io::Result<()> {
    send(stream, &AdbMessage::okay(remote_id, client_id)).await?;

    // The RECV request arrives as one WRTE.
    let request = loop {
        let Some(msg) = read_message(stream, codec).await? else {
            return Ok(());
        };
        match msg.command {
            Command::Wrte => break msg,
            Command::Okay => {}
            _ => return Ok(()),
        }
    };
    send(stream, &AdbMessage::okay(remote_id, client_id)).await?;

    let path = parse_recv_path(&request.payload);

    let mut response = Vec::new();
    if let Some(reason) = &config.sync_fail {
        push_sync_packet(&mut response, b"FAIL", reason.as_bytes());
    } else if let Some(content) = path.as_ref().and_then(|p| config.files.get(p)) {
        for chunk in content.chunks(config.sync_data_chunk) {
            push_sync_packet(&mut response, b"DATA", chunk);
        }
        if !config.early_close_sync {
            response.extend_from_slice(b"DONE");
            response.extend_from_slice(&0u32.to_le_bytes());
        }
    } else {
        push_sync_packet(&mut response, b"FAIL", b"No such file or directory");
    }

    // Packet boundaries deliberately do not align with WRTE frames.
    let frame_len = config.sync_frame_len.unwrap_or(response.len().max(1));
    for frame in response.chunks(frame_len) {
        send(
            stream,
            &AdbMessage::wrte(remote_id, client_id, frame.to_vec()),
        )
        .await?;
        wait_for_okay(stream, codec).await?;
    }

    if config.early_close_sync || config.sync_fail.is_some() {
        send(stream, &AdbMessage::clse(remote_id, client_id)).await?;
        return Ok(());
    }

    // On DONE the client closes first; mirror it.
    loop {
        let Some(msg) = read_message(stream, codec).await? else {
            return Ok(());
        };
        if msg.command == Command::Clse {
            return send(stream, &AdbMessage::clse(remote_id, client_id)).await;
        }
    }
}

fn parse_recv_path(payload: &[u8]) -> Option<String> {
    if payload.len() < 8 || &payload[..4] != b"RECV" {
        return None;
    }
    let len = u32::from_le_bytes([payload[4], payload[5], payload[6], payload[7]]) as usize;
    if payload.len() < 8 + len {
        return None;
    }
    Some(String::from_utf8_lossy(&payload[8..8 + len]).into_owned())
}

fn push_sync_packet(buf: &mut Vec<u8>, id: &[u8; 4], payload: &[u8]) {
    buf.extend_from_slice(id);
    #[allow(clippy::cast_possible_truncation)]
    buf.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    buf.extend_from_slice(payload);
}

async fn wait_for_okay(stream: &mut ServerStream, codec: &mut WireCodec) -> std::io::Result<()> {
    loop {
        let Some(msg) = read_message(stream, codec).await? else {
            return Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "closed before OKAY",
            ));
        };
        if msg.command == Command::Okay {
            return Ok(());
        }
    }
}

async fn send_banner(stream: &mut ServerStream, config: &MockDaemonConfig) -> std::io::Result<()> {
    let mut banner = config.banner.clone().into_bytes();
    banner.push(0);
    send(
        stream,
        &AdbMessage::new(Command::Cnxn, CONNECT_VERSION, MAX_PAYLOAD, banner),
    )
    .await
}

async fn send(stream: &mut ServerStream, msg: &AdbMessage) -> std::io::Result<()> {
    stream.write_all(&msg.encode()).await?;
    stream.flush().await
}

/// Read one message with exact-length reads, leaving any following bytes
/// (e.g. a TLS ClientHello) untouched on the socket.
async fn read_message_exact(stream: &mut ServerStream) -> std::io::Result<Option<AdbMessage>> {
    let mut header_bytes = [0u8; HEADER_LEN];
    match stream.read_exact(&mut header_bytes).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e),
    }

    let header =
        MessageHeader::decode(&header_bytes).map_err(|e| std::io::Error::other(e.to_string()))?;

    let mut payload = vec![0u8; header.data_len as usize];
    stream.read_exact(&mut payload).await?;

    AdbMessage::from_parts(header, payload.into())
        .map(Some)
        .map_err(|e| std::io::Error::other(e.to_string()))
}

async fn read_message(
    stream: &mut ServerStream,
    codec: &mut WireCodec,
) -> std::io::Result<Option<AdbMessage>> {
    let mut buf = [0u8; 4096];
    loop {
        if let Some(msg) = codec
            .decode()
            .map_err(|e| std::io::Error::other(e.to_string()))?
        {
            return Ok(Some(msg));
        }

        let n = stream.read(&mut buf).await?;
        if n == 0 {
            return Ok(None);
        }
        codec.feed(&buf[..n]);
    }
}

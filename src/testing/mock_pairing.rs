//! Mock pairing daemon: TLS + the server side of the SPAKE2 exchange.

use super::shared_identity;
use crate::protocol::crypto::{
    export_keying_material, CryptoError, Spake2Context, Spake2Role, TlsIdentity,
};
use crate::protocol::pairing::{
    FrameHeader, FrameKind, FRAME_HEADER_LEN, PEER_INFO_RSA_PUB_KEY, PEER_INFO_SIZE,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, RwLock};

/// The daemon side of a pairing exchange, with a configurable code.
pub struct MockPairingDaemon {
    code: String,
    state: Arc<RwLock<PairingDaemonState>>,
    shutdown: Option<mpsc::Sender<()>>,
    address: Option<SocketAddr>,
}

#[derive(Debug, Default)]
struct PairingDaemonState {
    /// The ADB public key extracted from the client's peer-info record,
    /// present only when the codes matched.
    provisioned_key: Option<Vec<u8>>,
}

impl MockPairingDaemon {
    /// Create a daemon that will accept the given pairing code.
    #[must_use]
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            state: Arc::new(RwLock::new(PairingDaemonState::default())),
            shutdown: None,
            address: None,
        }
    }

    /// Start listening on an ephemeral loopback port.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener cannot be bound or the TLS config
    /// cannot be built.
    pub async fn start(&mut self) -> Result<SocketAddr, std::io::Error> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        self.address = Some(addr);

        let identity = shared_identity();
        let tls_identity = TlsIdentity::from_identity(&identity)
            .map_err(|e| std::io::Error::other(e.to_string()))?;
        let acceptor = tokio_rustls::TlsAcceptor::from(
            tls_identity
                .server_config()
                .map_err(|e| std::io::Error::other(e.to_string()))?,
        );

        let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);
        self.shutdown = Some(shutdown_tx);

        let state = self.state.clone();
        let code = self.code.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    result = listener.accept() => {
                        match result {
                            Ok((stream, _)) => {
                                let state = state.clone();
                                let code = code.clone();
                                let acceptor = acceptor.clone();
                                tokio::spawn(async move {
                                    if let Err(e) =
                                        handle_pairing(stream, acceptor, state, code).await
                                    {
                                        tracing::debug!("mock pairing ended: {e}");
                                    }
                                });
                            }
                            Err(e) => tracing::error!("accept error: {e}"),
                        }
                    }
                    _ = shutdown_rx.recv() => break,
                }
            }
        });

        Ok(addr)
    }

    /// Stop the accept loop.
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

    /// The key the client provisioned, when pairing succeeded.
    pub async fn provisioned_key(&self) -> Option<Vec<u8>> {
        self.state.read().await.provisioned_key.clone()
    }
}

impl Drop for MockPairingDaemon {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.try_send(());
        }
    }
}

async fn handle_pairing(
    tcp: TcpStream,
    acceptor: tokio_rustls::TlsAcceptor,
    state: Arc<RwLock<PairingDaemonState>>,
    code: String,
) -> std::io::Result<()> {
    tcp.set_nodelay(true)?;
    let mut stream = acceptor.accept(tcp).await?;

    let keying_material = {
        let (_, connection) = stream.get_ref();
        export_keying_material(&**connection)
            .map_err(|e| std::io::Error::other(e.to_string()))?
    };

    let mut password = Vec::with_capacity(code.len() + keying_material.len());
    password.extend_from_slice(code.as_bytes());
    password.extend_from_slice(&keying_material);

    let spake2 = Spake2Context::new(Spake2Role::Server, &password)
        .map_err(|e| std::io::Error::other(e.to_string()))?;

    // SPAKE2 message exchange: client first.
    let client_msg = read_frame(&mut stream, FrameKind::Spake2Msg).await?;
    write_frame(&mut stream, FrameKind::Spake2Msg, spake2.our_message()).await?;

    let mut cipher = spake2
        .derive_cipher(&client_msg)
        .map_err(|e| std::io::Error::other(e.to_string()))?;

    // Peer info: read the client's record, send ours regardless so the
    // client gets to observe the decrypt failure on a code mismatch.
    let client_sealed = read_frame(&mut stream, FrameKind::PeerInfo).await?;

    let identity = shared_identity();
    let public_key = identity
        .adb_public_key()
        .map_err(|e| std::io::Error::other(e.to_string()))?;
    let mut record = vec![0u8; PEER_INFO_SIZE];
    record[0] = PEER_INFO_RSA_PUB_KEY;
    record[1..=public_key.len()].copy_from_slice(&public_key);

    let sealed = cipher
        .encrypt(&record)
        .map_err(|e| std::io::Error::other(e.to_string()))?;
    write_frame(&mut stream, FrameKind::PeerInfo, &sealed).await?;

    match cipher.decrypt(&client_sealed) {
        Ok(plain) if plain.len() == PEER_INFO_SIZE && plain[0] == PEER_INFO_RSA_PUB_KEY => {
            let key: Vec<u8> = plain[1..]
                .iter()
                .copied()
                .take_while(|&b| b != 0)
                .collect();
            state.write().await.provisioned_key = Some(key);
        }
        Ok(_) => {}
        Err(CryptoError::DecryptionFailed(_)) => {
            tracing::debug!("client peer info failed to decrypt (code mismatch)");
        }
        Err(e) => return Err(std::io::Error::other(e.to_string())),
    }

    let _ = stream.shutdown().await;
    Ok(())
}

async fn read_frame(
    stream: &mut tokio_rustls::server::TlsStream<TcpStream>,
    expected: FrameKind,
) -> std::io::Result<Vec<u8>> {
    let mut header_bytes = [0u8; FRAME_HEADER_LEN];
    stream.read_exact(&mut header_bytes).await?;

    let header = FrameHeader::decode(&header_bytes)
        .map_err(|e| std::io::Error::other(e.to_string()))?;
    if header.kind != expected {
        return Err(std::io::Error::other(format!(
            "expected {expected:?}, got {:?}",
            header.kind
        )));
    }

    let mut payload = vec![0u8; header.payload_len];
    stream.read_exact(&mut payload).await?;
    Ok(payload)
}

async fn write_frame(
    stream: &mut tokio_rustls::server::TlsStream<TcpStream>,
    kind: FrameKind,
    payload: &[u8],
) -> std::io::Result<()> {
    let header = FrameHeader::encode(kind, payload.len())
        .map_err(|e| std::io::Error::other(e.to_string()))?;
    stream.write_all(&header).await?;
    stream.write_all(payload).await?;
    stream.flush().await
}

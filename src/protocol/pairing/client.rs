use super::frame::{FrameHeader, FrameKind, FRAME_HEADER_LEN};
use super::{PairingState, PEER_INFO_RSA_PUB_KEY, PEER_INFO_SIZE};
use crate::error::AdbLinkError;
use crate::protocol::crypto::{
    export_keying_material, AdbIdentity, CryptoError, Spake2Context, Spake2Role, TlsIdentity,
};
use crate::types::AdbLinkConfig;
use rustls::pki_types::ServerName;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;

/// One-shot pairing client.
///
/// Connects to the pairing endpoint, runs the SPAKE2 exchange keyed on the
/// pairing code and the TLS exported keying material, then trades encrypted
/// peer-info records. On success the daemon has stored our public key.
pub struct PairingClient {
    identity: Arc<AdbIdentity>,
    config: AdbLinkConfig,
    state: PairingState,
}

impl PairingClient {
    /// Create a pairing client for the given identity.
    #[must_use]
    pub fn new(identity: Arc<AdbIdentity>, config: AdbLinkConfig) -> Self {
        Self {
            identity,
            config,
            state: PairingState::Ready,
        }
    }

    /// Current position in the pairing state machine.
    #[must_use]
    pub fn state(&self) -> PairingState {
        self.state
    }

    /// Pair with the daemon at `host:port` using the displayed code.
    ///
    /// # Errors
    ///
    /// - `Network` / `Timeout` for transport failures
    /// - `TlsExport` when keying material cannot be exported
    /// - `InvalidPairingCode` when the peer-info record fails to decrypt
    /// - `Protocol` for malformed frames or a wrong-sized peer-info record
    pub async fn pair(
        &mut self,
        host: IpAddr,
        port: u16,
        code: &str,
    ) -> Result<(), AdbLinkError> {
        let result = self.pair_inner(host, port, code).await;
        self.state = PairingState::Stopped;
        result
    }

    async fn pair_inner(
        &mut self,
        host: IpAddr,
        port: u16,
        code: &str,
    ) -> Result<(), AdbLinkError> {
        tracing::debug!("pairing with {host}:{port}");

        let tcp = tokio::time::timeout(
            self.config.connect_timeout,
            TcpStream::connect((host, port)),
        )
        .await
        .map_err(|_| AdbLinkError::Timeout {
            duration: self.config.connect_timeout,
        })??;
        tcp.set_nodelay(true)?;

        let tls_identity = TlsIdentity::from_identity(&self.identity)?;
        let connector = TlsConnector::from(tls_identity.client_config()?);
        let mut stream = connector.connect(ServerName::from(host), tcp).await?;

        // RFC 5705 export binds the SPAKE2 password to this TLS session.
        let keying_material = {
            let (_, connection) = stream.get_ref();
            export_keying_material(&**connection)?
        };

        let mut password = Vec::with_capacity(code.len() + keying_material.len());
        password.extend_from_slice(code.as_bytes());
        password.extend_from_slice(&keying_material);

        let spake2 = Spake2Context::new(Spake2Role::Client, &password)?;

        self.state = PairingState::ExchangingMsgs;
        write_frame(&mut stream, FrameKind::Spake2Msg, spake2.our_message()).await?;

        let peer_msg = self
            .read_frame(&mut stream, FrameKind::Spake2Msg)
            .await?;
        let mut cipher = spake2.derive_cipher(&peer_msg)?;
        tracing::debug!("SPAKE2 exchange complete");

        self.state = PairingState::ExchangingPeerInfo;
        let sealed = cipher.encrypt(&self.peer_info()?)?;
        write_frame(&mut stream, FrameKind::PeerInfo, &sealed).await?;

        let peer_sealed = self.read_frame(&mut stream, FrameKind::PeerInfo).await?;
        let peer_info = match cipher.decrypt(&peer_sealed) {
            Ok(plain) => plain,
            // The AEAD tag is the only place a code mismatch shows up.
            Err(CryptoError::DecryptionFailed(_)) => {
                tracing::warn!("peer-info decrypt failed; pairing code mismatch");
                return Err(AdbLinkError::InvalidPairingCode);
            }
            Err(e) => return Err(e.into()),
        };

        if peer_info.len() != PEER_INFO_SIZE {
            return Err(AdbLinkError::protocol(format!(
                "peer info is {} bytes, expected {PEER_INFO_SIZE}",
                peer_info.len()
            )));
        }

        tracing::info!("pairing complete; key provisioned as {:?}", self.identity.name());
        let _ = stream.shutdown().await;
        Ok(())
    }

    /// Our peer-info record: type byte plus the zero-padded public key.
    fn peer_info(&self) -> Result<Vec<u8>, AdbLinkError> {
        let public_key = self.identity.adb_public_key()?;
        if public_key.len() >= PEER_INFO_SIZE {
            return Err(AdbLinkError::protocol(format!(
                "public key of {} bytes does not fit a peer-info record",
                public_key.len()
            )));
        }

        let mut record = vec![0u8; PEER_INFO_SIZE];
        record[0] = PEER_INFO_RSA_PUB_KEY;
        record[1..=public_key.len()].copy_from_slice(&public_key);
        Ok(record)
    }

    async fn read_frame<S>(
        &self,
        stream: &mut S,
        expected: FrameKind,
    ) -> Result<Vec<u8>, AdbLinkError>
    where
        S: AsyncRead + Unpin,
    {
        let mut header_bytes = [0u8; FRAME_HEADER_LEN];
        read_exact_timed(stream, &mut header_bytes, self.config.read_timeout).await?;
        let header = FrameHeader::decode(&header_bytes)?;

        if header.kind != expected {
            return Err(AdbLinkError::protocol(format!(
                "expected {expected:?} frame, got {:?}",
                header.kind
            )));
        }

        let mut payload = vec![0u8; header.payload_len];
        read_exact_timed(stream, &mut payload, self.config.read_timeout).await?;
        Ok(payload)
    }
}

async fn write_frame<S>(stream: &mut S, kind: FrameKind, payload: &[u8]) -> Result<(), AdbLinkError>
where
    S: AsyncWrite + Unpin,
{
    let header = FrameHeader::encode(kind, payload.len())?;
    stream.write_all(&header).await?;
    stream.write_all(payload).await?;
    stream.flush().await?;
    Ok(())
}

async fn read_exact_timed<S>(
    stream: &mut S,
    buf: &mut [u8],
    deadline: Duration,
) -> Result<(), AdbLinkError>
where
    S: AsyncRead + Unpin,
{
    tokio::time::timeout(deadline, stream.read_exact(buf))
        .await
        .map_err(|_| AdbLinkError::Timeout { duration: deadline })??;
    Ok(())
}

//! A connected, authenticated ADB transport.

use super::sink::StreamSink;
use crate::error::AdbLinkError;
use crate::net::AdbStream;
use crate::protocol::crypto::{AdbIdentity, TlsIdentity};
use crate::protocol::sync::{self, SyncDecoder, SyncPacket};
use crate::protocol::wire::{AdbMessage, Command, WireCodec, AUTH_TOKEN};
use rustls::pki_types::ServerName;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;

/// A live session with the daemon.
///
/// All methods take `&mut self`: exclusive access is the write lock. The
/// session manager wraps the session in a mutex, which serializes both
/// message writes and whole service invocations.
#[derive(Debug)]
pub struct AdbSession {
    stream: AdbStream,
    codec: WireCodec,
    next_local_id: u32,
    read_timeout: Duration,
    peer_banner: String,
}

impl AdbSession {
    /// Connect and authenticate.
    ///
    /// Performs the `CNXN` exchange, following an `STLS` upgrade when the
    /// daemon requests one and answering `AUTH` challenges with the
    /// identity's signature and, if needed, its public key.
    ///
    /// # Errors
    ///
    /// - `Network` / `Timeout` for transport failures
    /// - `AuthRejected` when the daemon closes after seeing both the
    ///   signature and the public key
    /// - `Protocol` for anything off-script
    pub async fn connect(
        host: IpAddr,
        port: u16,
        identity: &Arc<AdbIdentity>,
        connect_timeout: Duration,
        read_timeout: Duration,
    ) -> Result<Self, AdbLinkError> {
        tracing::debug!("connecting to adbd at {host}:{port}");

        let tcp = tokio::time::timeout(connect_timeout, TcpStream::connect((host, port)))
            .await
            .map_err(|_| AdbLinkError::Timeout {
                duration: connect_timeout,
            })??;
        tcp.set_nodelay(true)?;

        let mut stream = AdbStream::Plain(tcp);
        let mut codec = WireCodec::new();

        send_message(&mut stream, &AdbMessage::cnxn()).await?;

        let peer_banner = loop {
            let Some(msg) = read_message(&mut stream, &mut codec, read_timeout).await? else {
                return Err(AdbLinkError::network("daemon closed during handshake"));
            };

            match msg.command {
                Command::Stls => {
                    send_message(&mut stream, &AdbMessage::stls()).await?;
                    stream = upgrade_tls(stream, host, identity).await?;
                    // Any cleartext residue is stale after the upgrade.
                    codec.reset();
                    tracing::debug!("transport upgraded to TLS");
                }

                Command::Auth if msg.arg0 == AUTH_TOKEN => {
                    let signature = identity.sign_token(&msg.payload)?;
                    send_message(&mut stream, &AdbMessage::auth_signature(signature)).await?;

                    let Some(next) = read_message(&mut stream, &mut codec, read_timeout).await?
                    else {
                        return Err(AdbLinkError::AuthRejected);
                    };

                    if next.command == Command::Cnxn {
                        break banner_of(&next);
                    }

                    // Signature alone was not enough; offer the public key.
                    // The daemon prompts the user the first time it sees it.
                    let public_key = identity.adb_public_key()?;
                    send_message(&mut stream, &AdbMessage::auth_public_key(public_key)).await?;

                    match read_message(&mut stream, &mut codec, read_timeout).await? {
                        Some(m) if m.command == Command::Cnxn => break banner_of(&m),
                        Some(m) => {
                            return Err(AdbLinkError::protocol(format!(
                                "expected CNXN after public key, got {:?}",
                                m.command
                            )))
                        }
                        None => return Err(AdbLinkError::AuthRejected),
                    }
                }

                Command::Cnxn => break banner_of(&msg),

                other => {
                    return Err(AdbLinkError::protocol(format!(
                        "unexpected {other:?} during handshake"
                    )))
                }
            }
        };

        tracing::info!("session established: {peer_banner}");

        Ok(Self {
            stream,
            codec,
            next_local_id: 0,
            read_timeout,
            peer_banner,
        })
    }

    /// The daemon's `CNXN` banner (system identity string).
    #[must_use]
    pub fn peer_banner(&self) -> &str {
        &self.peer_banner
    }

    /// Whether the transport was upgraded to TLS.
    #[must_use]
    pub fn is_tls(&self) -> bool {
        self.stream.is_tls()
    }

    /// Run `shell:<command>` and forward output chunks to `sink`.
    ///
    /// # Errors
    ///
    /// `Protocol` when the daemon refuses the stream; transport errors
    /// leave the session unusable.
    pub async fn open_shell(
        &mut self,
        command: &str,
        sink: &mut dyn StreamSink,
    ) -> Result<(), AdbLinkError> {
        self.run_service(&format!("shell:{command}"), sink).await
    }

    /// Run `exec:<command>` and collect the raw binary output.
    ///
    /// # Errors
    ///
    /// Same contract as [`open_shell`](Self::open_shell).
    pub async fn open_exec(&mut self, command: &str) -> Result<Vec<u8>, AdbLinkError> {
        let mut output = Vec::new();
        self.run_service(&format!("exec:{command}"), &mut output)
            .await?;
        Ok(output)
    }

    /// Pull a file via the sync sub-protocol.
    ///
    /// # Errors
    ///
    /// - `SyncFailed` when the daemon answers `FAIL`
    /// - `Protocol` on a truncated stream or an empty close without `DONE`
    pub async fn pull_file(&mut self, path: &str) -> Result<Vec<u8>, AdbLinkError> {
        let (local_id, remote_id) = self.open_stream("sync:").await?;

        self.send(&AdbMessage::wrte(
            local_id,
            remote_id,
            sync::recv_request(path),
        ))
        .await?;

        let mut decoder = SyncDecoder::new();
        let mut content = Vec::new();
        let mut saw_data = false;

        loop {
            let msg = self.read_stream_message(local_id).await?;
            match msg.command {
                Command::Okay => {}

                Command::Wrte => {
                    decoder.feed(&msg.payload);
                    self.send(&AdbMessage::okay(local_id, remote_id)).await?;

                    while let Some(packet) = decoder
                        .decode()
                        .map_err(|e| AdbLinkError::protocol(e.to_string()))?
                    {
                        match packet {
                            SyncPacket::Data(chunk) => {
                                saw_data = true;
                                content.extend_from_slice(&chunk);
                            }
                            SyncPacket::Done => {
                                // Some daemon versions delay their CLSE;
                                // close eagerly instead of waiting.
                                self.send(&AdbMessage::clse(local_id, remote_id)).await?;
                                return Ok(content);
                            }
                            SyncPacket::Fail(message) => {
                                let _ = self.send(&AdbMessage::clse(local_id, remote_id)).await;
                                return Err(AdbLinkError::SyncFailed { message });
                            }
                        }
                    }
                }

                Command::Clse => {
                    self.send(&AdbMessage::clse(local_id, remote_id)).await?;
                    // Early close: partial content is still useful, but an
                    // empty close without DONE is a broken transfer.
                    if saw_data && !content.is_empty() {
                        return Ok(content);
                    }
                    return Err(AdbLinkError::protocol(
                        "sync stream closed before DONE with no content",
                    ));
                }

                other => {
                    return Err(AdbLinkError::protocol(format!(
                        "unexpected {other:?} on sync stream"
                    )))
                }
            }
        }
    }

    /// Shut the transport down. The session is unusable afterwards.
    pub async fn close(&mut self) {
        let _ = self.stream.shutdown().await;
    }

    /// Open a stream and forward `WRTE` payloads to the sink until the
    /// daemon closes it.
    async fn run_service(
        &mut self,
        service: &str,
        sink: &mut dyn StreamSink,
    ) -> Result<(), AdbLinkError> {
        let (local_id, remote_id) = self.open_stream(service).await?;

        loop {
            let msg = self.read_stream_message(local_id).await?;
            match msg.command {
                Command::Wrte => {
                    sink.push(&msg.payload);
                    self.send(&AdbMessage::okay(local_id, remote_id)).await?;
                }
                Command::Okay => {}
                Command::Clse => {
                    self.send(&AdbMessage::clse(local_id, remote_id)).await?;
                    return Ok(());
                }
                other => {
                    return Err(AdbLinkError::protocol(format!(
                        "unexpected {other:?} on open stream"
                    )))
                }
            }
        }
    }

    /// Send `OPEN` and wait for the daemon's `OKAY`.
    async fn open_stream(&mut self, service: &str) -> Result<(u32, u32), AdbLinkError> {
        let local_id = self.alloc_local_id();
        tracing::debug!("OPEN {service:?} as stream {local_id}");
        self.send(&AdbMessage::open(local_id, service)).await?;

        loop {
            let msg = self.read_stream_message(local_id).await?;
            match msg.command {
                Command::Okay => return Ok((local_id, msg.arg0)),
                Command::Clse => {
                    return Err(AdbLinkError::protocol(format!(
                        "daemon refused service {service:?}"
                    )))
                }
                other => {
                    return Err(AdbLinkError::protocol(format!(
                        "expected OKAY for {service:?}, got {other:?}"
                    )))
                }
            }
        }
    }

    /// Read the next message routed to `local_id`, answering foreign
    /// streams courteously (the daemon may interleave streams during sync).
    async fn read_stream_message(&mut self, local_id: u32) -> Result<AdbMessage, AdbLinkError> {
        loop {
            let Some(msg) = read_message(&mut self.stream, &mut self.codec, self.read_timeout)
                .await?
            else {
                return Err(AdbLinkError::network("daemon closed the connection"));
            };

            if msg.arg1 == local_id {
                return Ok(msg);
            }

            tracing::debug!(
                "foreign stream message {:?} ({} -> {})",
                msg.command,
                msg.arg0,
                msg.arg1
            );
            match msg.command {
                Command::Wrte => {
                    self.send(&AdbMessage::okay(msg.arg1, msg.arg0)).await?;
                }
                Command::Clse => {
                    self.send(&AdbMessage::clse(msg.arg1, msg.arg0)).await?;
                }
                _ => {}
            }
        }
    }

    fn alloc_local_id(&mut self) -> u32 {
        self.next_local_id = next_local_id(self.next_local_id);
        self.next_local_id
    }

    async fn send(&mut self, msg: &AdbMessage) -> Result<(), AdbLinkError> {
        send_message(&mut self.stream, msg).await
    }
}

/// Stream ids are monotonic, wrap from `u32::MAX` to 1, and are never 0.
fn next_local_id(current: u32) -> u32 {
    if current == u32::MAX {
        1
    } else {
        current + 1
    }
}

fn banner_of(msg: &AdbMessage) -> String {
    String::from_utf8_lossy(&msg.payload)
        .trim_end_matches('\0')
        .to_string()
}

async fn send_message(stream: &mut AdbStream, msg: &AdbMessage) -> Result<(), AdbLinkError> {
    stream.write_all(&msg.encode()).await?;
    stream.flush().await?;
    Ok(())
}

/// Read one message, or `None` on a clean peer close.
async fn read_message(
    stream: &mut AdbStream,
    codec: &mut WireCodec,
    deadline: Duration,
) -> Result<Option<AdbMessage>, AdbLinkError> {
    let mut buf = [0u8; 4096];

    loop {
        if let Some(msg) = codec.decode()? {
            return Ok(Some(msg));
        }

        let n = tokio::time::timeout(deadline, stream.read(&mut buf))
            .await
            .map_err(|_| AdbLinkError::Timeout { duration: deadline })??;

        if n == 0 {
            return Ok(None);
        }
        codec.feed(&buf[..n]);
    }
}

async fn upgrade_tls(
    stream: AdbStream,
    host: IpAddr,
    identity: &Arc<AdbIdentity>,
) -> Result<AdbStream, AdbLinkError> {
    let AdbStream::Plain(tcp) = stream else {
        return Err(AdbLinkError::protocol("daemon requested STLS twice"));
    };

    let tls_identity = TlsIdentity::from_identity(identity)?;
    let connector = TlsConnector::from(tls_identity.client_config()?);
    let tls = connector.connect(ServerName::from(host), tcp).await?;
    Ok(AdbStream::Tls(Box::new(tls)))
}

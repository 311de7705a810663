//! Process-wide session manager.
//!
//! Exactly one session may be active at a time. Service dispatch is
//! serialized by a timed lock; the active-session slot is guarded
//! separately so `disconnect()` can proceed while other callers are still
//! queued on the dispatch lock.

use crate::client::AdbSession;
use crate::error::AdbLinkError;
use crate::protocol::crypto::AdbIdentity;
use crate::types::AdbLinkConfig;
use std::net::IpAddr;
use std::sync::Arc;
use tokio::sync::Mutex;

/// One serialized service invocation. Every operation reduces to bytes.
enum Op<'a> {
    Shell(&'a str),
    Exec(&'a str),
    Pull(&'a str),
}

impl Op<'_> {
    async fn run(&self, session: &mut AdbSession) -> Result<Vec<u8>, AdbLinkError> {
        match self {
            Op::Shell(command) => {
                let mut output = Vec::new();
                session.open_shell(command, &mut output).await?;
                Ok(output)
            }
            Op::Exec(command) => session.open_exec(command).await,
            Op::Pull(path) => session.pull_file(path).await,
        }
    }
}

/// What `system/info` reports about the ADB link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStatus {
    /// Whether a session is currently connected
    pub connected: bool,
    /// Whether the transport was STLS-upgraded
    pub tls: bool,
    /// The daemon's `CNXN` banner, when connected
    pub banner: Option<String>,
}

/// A `(success, message)` pair for adapter layers that cannot carry a typed
/// error across their boundary.
#[derive(Debug, Clone)]
pub struct DispatchOutcome {
    /// Whether the dispatch succeeded
    pub success: bool,
    /// Command output on success, error text on failure
    pub message: String,
}

struct CachedEndpoint {
    host: IpAddr,
    port: u16,
    keep_alive: bool,
}

/// Owner of the single active session.
pub struct SessionManager {
    config: AdbLinkConfig,
    identity: Arc<AdbIdentity>,
    /// The active-session slot. Held only for the duration of one service
    /// invocation (or a connect/disconnect).
    active: Mutex<Option<AdbSession>>,
    /// Dispatch serialization. Acquired with a 300 ms budget; losing the
    /// race surfaces as `Busy` rather than queuing indefinitely.
    dispatch_lock: Mutex<()>,
    /// Last endpoint, for reconnect-on-demand.
    endpoint: Mutex<Option<CachedEndpoint>>,
}

impl SessionManager {
    /// Create a manager around an identity.
    #[must_use]
    pub fn new(identity: Arc<AdbIdentity>, config: AdbLinkConfig) -> Self {
        Self {
            config,
            identity,
            active: Mutex::new(None),
            dispatch_lock: Mutex::new(()),
            endpoint: Mutex::new(None),
        }
    }

    /// Connect to the daemon, replacing any existing session.
    ///
    /// With `keep_alive`, a later dispatch that fails on transport is
    /// retried once over a fresh connection to the same endpoint.
    ///
    /// # Errors
    ///
    /// Propagates the session handshake errors.
    pub async fn connect(
        &self,
        host: IpAddr,
        port: u16,
        keep_alive: bool,
    ) -> Result<(), AdbLinkError> {
        let session = AdbSession::connect(
            host,
            port,
            &self.identity,
            self.config.connect_timeout,
            self.config.read_timeout,
        )
        .await?;

        *self.endpoint.lock().await = Some(CachedEndpoint {
            host,
            port,
            keep_alive,
        });

        let mut slot = self.active.lock().await;
        if let Some(mut old) = slot.replace(session) {
            tracing::debug!("replacing existing session");
            old.close().await;
        }

        Ok(())
    }

    /// Close the active session and clear the slot.
    pub async fn disconnect(&self) {
        let mut slot = self.active.lock().await;
        if let Some(mut session) = slot.take() {
            session.close().await;
            tracing::info!("session closed");
        }
        *self.endpoint.lock().await = None;
    }

    /// Whether a session is currently held.
    pub async fn is_connected(&self) -> bool {
        self.active.lock().await.is_some()
    }

    /// Link status for diagnostics surfaces.
    pub async fn status(&self) -> SessionStatus {
        let slot = self.active.lock().await;
        match slot.as_ref() {
            Some(session) => SessionStatus {
                connected: true,
                tls: session.is_tls(),
                banner: Some(session.peer_banner().to_string()),
            },
            None => SessionStatus {
                connected: false,
                tls: false,
                banner: None,
            },
        }
    }

    /// Run a shell command, returning trimmed UTF-8 output.
    ///
    /// # Errors
    ///
    /// `Busy` when another dispatch holds the lock past the wait budget;
    /// `NoActiveSession` without a connection; transport errors otherwise.
    pub async fn execute_shell(&self, command: &str) -> Result<String, AdbLinkError> {
        Ok(self.execute_shell_raw(command).await?.trim().to_string())
    }

    /// Run a shell command, returning the output exactly as received.
    ///
    /// # Errors
    ///
    /// Same contract as [`execute_shell`](Self::execute_shell).
    pub async fn execute_shell_raw(&self, command: &str) -> Result<String, AdbLinkError> {
        let bytes = self.dispatch(Op::Shell(command)).await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Run an `exec:` command, returning the raw byte stream.
    ///
    /// # Errors
    ///
    /// Same contract as [`execute_shell`](Self::execute_shell).
    pub async fn execute_exec_raw(&self, command: &str) -> Result<Vec<u8>, AdbLinkError> {
        self.dispatch(Op::Exec(command)).await
    }

    /// Pull a file as bytes.
    ///
    /// # Errors
    ///
    /// `SyncFailed` from the daemon, plus the dispatch contract above.
    pub async fn pull_file_bytes(&self, path: &str) -> Result<Vec<u8>, AdbLinkError> {
        self.dispatch(Op::Pull(path)).await
    }

    /// Pull a file as lossy UTF-8 text.
    ///
    /// # Errors
    ///
    /// Same contract as [`pull_file_bytes`](Self::pull_file_bytes).
    pub async fn pull_file_text(&self, path: &str) -> Result<String, AdbLinkError> {
        let bytes = self.pull_file_bytes(path).await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Shell dispatch folded to a `(success, message)` pair.
    pub async fn dispatch_shell(&self, command: &str) -> DispatchOutcome {
        match self.execute_shell(command).await {
            Ok(output) => DispatchOutcome {
                success: true,
                message: output,
            },
            Err(e) => DispatchOutcome {
                success: false,
                message: e.to_string(),
            },
        }
    }

    /// Serialize one service invocation against the active session.
    ///
    /// When the cached endpoint was connected with `keep_alive`, a
    /// transport failure drops the dead session and retries once over a
    /// fresh connection.
    async fn dispatch(&self, op: Op<'_>) -> Result<Vec<u8>, AdbLinkError> {
        let _guard = tokio::time::timeout(self.config.shell_wait, self.dispatch_lock.lock())
            .await
            .map_err(|_| AdbLinkError::Busy)?;

        let mut slot = self.active.lock().await;
        let session = slot.as_mut().ok_or(AdbLinkError::NoActiveSession)?;

        match op.run(session).await {
            Err(e @ (AdbLinkError::Network { .. } | AdbLinkError::Timeout { .. })) => {
                let endpoint = self.endpoint.lock().await;
                let Some(cached) = endpoint.as_ref().filter(|c| c.keep_alive) else {
                    return Err(e);
                };

                tracing::warn!("dispatch failed ({e}); reconnecting to {}", cached.host);
                if let Some(mut dead) = slot.take() {
                    dead.close().await;
                }
                let mut fresh = AdbSession::connect(
                    cached.host,
                    cached.port,
                    &self.identity,
                    self.config.connect_timeout,
                    self.config.read_timeout,
                )
                .await?;

                let result = op.run(&mut fresh).await;
                *slot = Some(fresh);
                result
            }
            result => result,
        }
    }
}

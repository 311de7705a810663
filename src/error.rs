//! Error types

use std::time::Duration;

/// Main error type for ADB client operations.
#[derive(Debug, thiserror::Error)]
pub enum AdbLinkError {
    /// Transport establishment or socket I/O failed.
    #[error("network error: {message}")]
    Network {
        /// Human-readable description
        message: String,
        /// Underlying cause, if any
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A read deadline was exceeded. The session is left in an
    /// indeterminate state; callers should disconnect and reconnect.
    #[error("read timed out after {duration:?}")]
    Timeout {
        /// The deadline that was exceeded
        duration: Duration,
    },

    /// The TLS stack cannot export RFC 5705 keying material. Pairing is
    /// impossible without it.
    #[error("TLS keying material export unavailable")]
    TlsExport,

    /// The pairing peer-info record failed to decrypt, which means the
    /// SPAKE2 passwords did not match.
    #[error("pairing code rejected by device")]
    InvalidPairingCode,

    /// Malformed frame, unexpected command, or a truncated sub-protocol
    /// packet.
    #[error("protocol error: {message}")]
    Protocol {
        /// What was violated
        message: String,
    },

    /// The daemon closed the connection after both the signature and the
    /// public key were offered.
    #[error("authentication rejected by daemon")]
    AuthRejected,

    /// An operation required an active session but none is connected.
    #[error("no active session")]
    NoActiveSession,

    /// Another shell command is in flight and the dispatch lock was not
    /// acquired within the wait budget.
    #[error("shell dispatch busy")]
    Busy,

    /// The daemon answered a sync request with a `FAIL` packet.
    #[error("sync failed: {message}")]
    SyncFailed {
        /// UTF-8 reason carried by the `FAIL` payload
        message: String,
    },

    /// mDNS browsing could not be started or produced an error.
    #[error("discovery failed: {message}")]
    DiscoveryFailed {
        /// Human-readable description
        message: String,
    },

    /// Wire-level encode/decode failure.
    #[error("wire error: {0}")]
    Wire(#[from] crate::protocol::wire::WireError),

    /// Cryptographic failure in the identity or pairing layer.
    #[error("crypto error: {0}")]
    Crypto(#[from] crate::protocol::crypto::CryptoError),

    /// Identity persistence failure.
    #[error("storage error: {0}")]
    Storage(#[from] crate::protocol::crypto::StorageError),
}

impl AdbLinkError {
    /// Wrap a transport error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
            source: None,
        }
    }

    /// Wrap a protocol violation.
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Whether reconnecting may clear the error.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Network { .. } | Self::Timeout { .. } | Self::Busy | Self::NoActiveSession
        )
    }
}

impl From<std::io::Error> for AdbLinkError {
    fn from(e: std::io::Error) -> Self {
        Self::Network {
            message: e.to_string(),
            source: Some(Box::new(e)),
        }
    }
}

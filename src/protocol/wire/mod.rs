//! ADB wire format: 24-byte little-endian message headers plus payload.

mod codec;
mod message;

#[cfg(test)]
mod tests;

pub use codec::WireCodec;
pub use message::{AdbMessage, Command, MessageHeader, checksum, HEADER_LEN};

/// Protocol version sent in the client `CNXN`.
pub const CONNECT_VERSION: u32 = 0x0100_0001;

/// Version sent in the client `STLS` reply.
pub const STLS_VERSION: u32 = 0x0100_0000;

/// Maximum payload the client advertises in `CNXN`.
pub const MAX_PAYLOAD: u32 = 0x10_0000;

/// System identity banner sent in the client `CNXN` payload.
pub const CONNECT_BANNER: &[u8] = b"host::\0";

/// `AUTH` arg0: the daemon sent a challenge token.
pub const AUTH_TOKEN: u32 = 1;

/// `AUTH` arg0: the client answers with a token signature.
pub const AUTH_SIGNATURE: u32 = 2;

/// `AUTH` arg0: the client offers its public key.
pub const AUTH_RSAPUBLICKEY: u32 = 3;

/// Errors during wire encode/decode
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    /// Header failed the magic or checksum verification, or named an
    /// unknown command.
    #[error("bad message: {reason}")]
    BadMessage {
        /// What failed to verify
        reason: String,
    },

    /// Declared payload exceeds the negotiated maximum.
    #[error("payload too large: {size} bytes")]
    PayloadTooLarge {
        /// Declared `data_len`
        size: usize,
    },
}

impl WireError {
    pub(crate) fn bad(reason: impl Into<String>) -> Self {
        Self::BadMessage {
            reason: reason.into(),
        }
    }
}

//! Wireless-debugging pairing: TLS + SPAKE2 + encrypted peer-info exchange.
//!
//! Pairing provisions our public key into the daemon's authorized-keys list.
//! It runs once against the ephemeral `_adb-tls-pairing._tcp.` endpoint; all
//! later sessions authenticate with the signing key alone.

mod client;
mod frame;

#[cfg(test)]
mod tests;

pub use client::PairingClient;
pub use frame::{FrameKind, FrameHeader, MAX_FRAME_PAYLOAD, FRAME_HEADER_LEN, PROTOCOL_VERSION};

/// Total size of a peer-info record.
pub const PEER_INFO_SIZE: usize = 8192;

/// Peer-info type tag for an ADB RSA public key.
pub const PEER_INFO_RSA_PUB_KEY: u8 = 0;

/// Pairing session state. Linear; terminal on success or any error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairingState {
    /// Connected, nothing exchanged yet
    Ready,
    /// SPAKE2 messages in flight
    ExchangingMsgs,
    /// Encrypted peer-info records in flight
    ExchangingPeerInfo,
    /// Finished (successfully or not)
    Stopped,
}

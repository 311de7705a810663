//! Pairing record framing: a 6-byte header in front of every payload.

use crate::error::AdbLinkError;
use byteorder::{BigEndian, ByteOrder};

/// Header length on the wire.
pub const FRAME_HEADER_LEN: usize = 6;

/// Only protocol version in existence.
pub const PROTOCOL_VERSION: u8 = 1;

/// Upper bound on a framed payload.
pub const MAX_FRAME_PAYLOAD: usize = 16384;

/// What a frame carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FrameKind {
    /// A SPAKE2 group element
    Spake2Msg = 0,
    /// An encrypted peer-info record
    PeerInfo = 1,
}

impl FrameKind {
    fn from_u8(value: u8) -> Result<Self, AdbLinkError> {
        match value {
            0 => Ok(Self::Spake2Msg),
            1 => Ok(Self::PeerInfo),
            other => Err(AdbLinkError::protocol(format!(
                "unknown pairing frame type {other}"
            ))),
        }
    }
}

/// Decoded frame header: `version:u8, type:u8, payload_len:u32 BE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Protocol version (always 1)
    pub version: u8,
    /// Payload type
    pub kind: FrameKind,
    /// Payload length in bytes
    pub payload_len: usize,
}

impl FrameHeader {
    /// Serialize a header for `payload_len` bytes of `kind`.
    ///
    /// # Errors
    ///
    /// Returns `Protocol` when the payload exceeds the frame bound.
    pub fn encode(kind: FrameKind, payload_len: usize) -> Result<[u8; FRAME_HEADER_LEN], AdbLinkError> {
        if payload_len > MAX_FRAME_PAYLOAD {
            return Err(AdbLinkError::protocol(format!(
                "pairing payload of {payload_len} bytes exceeds {MAX_FRAME_PAYLOAD}"
            )));
        }

        let mut header = [0u8; FRAME_HEADER_LEN];
        header[0] = PROTOCOL_VERSION;
        header[1] = kind as u8;
        #[allow(clippy::cast_possible_truncation)]
        BigEndian::write_u32(&mut header[2..6], payload_len as u32);
        Ok(header)
    }

    /// Parse and validate a received header.
    ///
    /// # Errors
    ///
    /// Returns `Protocol` on a version or type we do not speak, or a length
    /// beyond the frame bound.
    pub fn decode(bytes: &[u8; FRAME_HEADER_LEN]) -> Result<Self, AdbLinkError> {
        let version = bytes[0];
        if version != PROTOCOL_VERSION {
            return Err(AdbLinkError::protocol(format!(
                "unsupported pairing protocol version {version}"
            )));
        }

        let kind = FrameKind::from_u8(bytes[1])?;
        let payload_len = BigEndian::read_u32(&bytes[2..6]) as usize;
        if payload_len > MAX_FRAME_PAYLOAD {
            return Err(AdbLinkError::protocol(format!(
                "pairing frame declares {payload_len} bytes"
            )));
        }

        Ok(Self {
            version,
            kind,
            payload_len,
        })
    }
}

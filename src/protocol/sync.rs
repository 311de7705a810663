//! Sync sub-protocol framing for file pull.
//!
//! After an `OPEN sync:` stream is acknowledged, the daemon speaks a nested
//! packet format inside `WRTE` payloads: `id:4-ASCII || len:u32 LE ||
//! payload`. Packet boundaries do not align with the `WRTE` frames carrying
//! them, so decoding accumulates a tail buffer and re-splits on every frame.

use bytes::{Buf, Bytes, BytesMut};

/// Sync request identifier for a file pull.
pub const RECV: &[u8; 4] = b"RECV";

/// File content chunk.
pub const DATA: &[u8; 4] = b"DATA";

/// End of file. The length word carries the file mtime, not a payload size.
pub const DONE: &[u8; 4] = b"DONE";

/// Server-side failure; payload is a UTF-8 reason.
pub const FAIL: &[u8; 4] = b"FAIL";

/// Largest payload a sync packet may declare.
const MAX_SYNC_PAYLOAD: usize = super::wire::MAX_PAYLOAD as usize;

/// Build the `RECV` request payload for a path.
#[must_use]
pub fn recv_request(path: &str) -> Vec<u8> {
    let path_bytes = path.as_bytes();
    let mut request = Vec::with_capacity(8 + path_bytes.len());
    request.extend_from_slice(RECV);
    #[allow(clippy::cast_possible_truncation)]
    request.extend_from_slice(&(path_bytes.len() as u32).to_le_bytes());
    request.extend_from_slice(path_bytes);
    request
}

/// One decoded sync packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncPacket {
    /// A chunk of file content
    Data(Bytes),
    /// File transfer complete
    Done,
    /// Transfer failed with the given reason
    Fail(String),
}

/// Errors while re-framing sync packets
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// The packet id was not one of `DATA`/`DONE`/`FAIL`.
    #[error("unexpected sync id {0:?}")]
    UnexpectedId([u8; 4]),

    /// A packet declared more payload than the stream allows.
    #[error("sync payload too large: {size} bytes")]
    PayloadTooLarge {
        /// Declared length
        size: usize,
    },
}

/// Incremental decoder for the `RECV` response stream.
///
/// Feed each `WRTE` payload with `feed()` and drain packets with `decode()`.
#[derive(Debug, Default)]
pub struct SyncDecoder {
    buffer: BytesMut,
}

impl SyncDecoder {
    /// Create an empty decoder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the payload of one `WRTE` frame.
    pub fn feed(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Try to decode the next packet.
    ///
    /// # Errors
    ///
    /// Returns `UnexpectedId` for unknown packet ids and `PayloadTooLarge`
    /// for absurd length words; both indicate a corrupted stream.
    pub fn decode(&mut self) -> Result<Option<SyncPacket>, SyncError> {
        if self.buffer.len() < 8 {
            return Ok(None);
        }

        let mut id = [0u8; 4];
        id.copy_from_slice(&self.buffer[..4]);
        let len = u32::from_le_bytes([
            self.buffer[4],
            self.buffer[5],
            self.buffer[6],
            self.buffer[7],
        ]) as usize;

        match &id {
            DONE => {
                // The length word is the file mtime; no payload follows.
                self.buffer.advance(8);
                Ok(Some(SyncPacket::Done))
            }
            DATA | FAIL => {
                if len > MAX_SYNC_PAYLOAD {
                    return Err(SyncError::PayloadTooLarge { size: len });
                }
                if self.buffer.len() < 8 + len {
                    return Ok(None);
                }
                self.buffer.advance(8);
                let payload = self.buffer.split_to(len).freeze();

                if &id == DATA {
                    Ok(Some(SyncPacket::Data(payload)))
                } else {
                    Ok(Some(SyncPacket::Fail(
                        String::from_utf8_lossy(&payload).into_owned(),
                    )))
                }
            }
            other => Err(SyncError::UnexpectedId(*other)),
        }
    }

    /// Bytes held in the tail buffer.
    #[must_use]
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }
}

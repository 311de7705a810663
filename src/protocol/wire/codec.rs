use super::message::{AdbMessage, MessageHeader, HEADER_LEN};
use super::WireError;
use bytes::{Buf, BytesMut};

/// Sans-IO incremental decoder for ADB messages.
///
/// Feed raw socket bytes with `feed()`, then drain complete messages with
/// `decode()`. Header verification (magic, known command) happens as soon as
/// 24 bytes are available; the payload byte-sum is verified once the full
/// payload has arrived.
#[derive(Debug)]
pub struct WireCodec {
    buffer: BytesMut,
    /// Largest payload this codec will accept.
    max_payload: usize,
    state: ParseState,
}

#[derive(Debug)]
enum ParseState {
    /// Waiting for a full 24-byte header
    Header,
    /// Header verified, waiting for `data_len` payload bytes
    Payload(MessageHeader),
}

impl WireCodec {
    /// Create a codec with the protocol's negotiated payload ceiling.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(4096),
            max_payload: super::MAX_PAYLOAD as usize,
            state: ParseState::Header,
        }
    }

    /// Append raw bytes from the transport.
    pub fn feed(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Try to decode a complete message.
    ///
    /// Returns `Ok(Some(message))` when one is available, `Ok(None)` when
    /// more bytes are needed.
    ///
    /// # Errors
    ///
    /// Returns `BadMessage` on magic/checksum/command verification failure
    /// and `PayloadTooLarge` when the header declares more than the
    /// negotiated maximum.
    pub fn decode(&mut self) -> Result<Option<AdbMessage>, WireError> {
        loop {
            match &self.state {
                ParseState::Header => {
                    if self.buffer.len() < HEADER_LEN {
                        return Ok(None);
                    }

                    let mut header_bytes = [0u8; HEADER_LEN];
                    header_bytes.copy_from_slice(&self.buffer[..HEADER_LEN]);
                    let header = MessageHeader::decode(&header_bytes)?;

                    if header.data_len as usize > self.max_payload {
                        return Err(WireError::PayloadTooLarge {
                            size: header.data_len as usize,
                        });
                    }

                    self.buffer.advance(HEADER_LEN);
                    self.state = ParseState::Payload(header);
                }

                ParseState::Payload(header) => {
                    let needed = header.data_len as usize;
                    if self.buffer.len() < needed {
                        return Ok(None);
                    }

                    let payload = self.buffer.split_to(needed).freeze();
                    let message = AdbMessage::from_parts(*header, payload)?;
                    self.state = ParseState::Header;
                    return Ok(Some(message));
                }
            }
        }
    }

    /// Bytes currently buffered but not yet decoded.
    #[must_use]
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Drop buffered bytes and reset to expecting a header.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.state = ParseState::Header;
    }
}

impl Default for WireCodec {
    fn default() -> Self {
        Self::new()
    }
}

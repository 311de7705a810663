use super::WireError;
use byteorder::{ByteOrder, LittleEndian};
use bytes::Bytes;

/// Fixed header length in bytes.
pub const HEADER_LEN: usize = 24;

/// The historical ADB "checksum": a byte-sum modulo 2^32, not CRC-32 in the
/// mathematical sense. The field name is kept for wire compatibility.
#[must_use]
pub fn checksum(payload: &[u8]) -> u32 {
    payload
        .iter()
        .fold(0u32, |acc, &b| acc.wrapping_add(u32::from(b)))
}

/// Commands accepted on an ADB transport. Values are the ASCII tetragraphs
/// read as little-endian `u32`s.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum Command {
    /// Connection banner exchange
    Cnxn = 0x4E58_4E43,
    /// Authentication (token, signature, public key)
    Auth = 0x4854_5541,
    /// TLS upgrade request/acknowledgement
    Stls = 0x534C_5453,
    /// Open a logical stream
    Open = 0x4E45_504F,
    /// Acknowledge an `OPEN` or a `WRTE`
    Okay = 0x5941_4B4F,
    /// Payload on an open stream
    Wrte = 0x4554_5257,
    /// Close a logical stream
    Clse = 0x4553_4C43,
}

impl Command {
    /// Decode from the wire value.
    pub fn from_u32(value: u32) -> Result<Self, WireError> {
        match value {
            0x4E58_4E43 => Ok(Self::Cnxn),
            0x4854_5541 => Ok(Self::Auth),
            0x534C_5453 => Ok(Self::Stls),
            0x4E45_504F => Ok(Self::Open),
            0x5941_4B4F => Ok(Self::Okay),
            0x4554_5257 => Ok(Self::Wrte),
            0x4553_4C43 => Ok(Self::Clse),
            other => Err(WireError::bad(format!("unknown command 0x{other:08X}"))),
        }
    }

    /// The wire value.
    #[must_use]
    pub fn as_u32(self) -> u32 {
        self as u32
    }
}

/// Decoded 24-byte message header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageHeader {
    /// Verified command
    pub command: Command,
    /// First argument (meaning depends on command)
    pub arg0: u32,
    /// Second argument (stream routing uses this as the local id)
    pub arg1: u32,
    /// Payload length in bytes
    pub data_len: u32,
    /// Byte-sum of the payload
    pub data_crc32: u32,
}

impl MessageHeader {
    /// Parse and verify a 24-byte header.
    ///
    /// # Errors
    ///
    /// Returns `BadMessage` when the magic does not equal the command's
    /// bitwise complement or the command is unknown.
    pub fn decode(buf: &[u8; HEADER_LEN]) -> Result<Self, WireError> {
        let raw_command = LittleEndian::read_u32(&buf[0..4]);
        let arg0 = LittleEndian::read_u32(&buf[4..8]);
        let arg1 = LittleEndian::read_u32(&buf[8..12]);
        let data_len = LittleEndian::read_u32(&buf[12..16]);
        let data_crc32 = LittleEndian::read_u32(&buf[16..20]);
        let magic = LittleEndian::read_u32(&buf[20..24]);

        if raw_command ^ magic != 0xFFFF_FFFF {
            return Err(WireError::bad(format!(
                "magic 0x{magic:08X} does not complement command 0x{raw_command:08X}"
            )));
        }

        let command = Command::from_u32(raw_command)?;

        Ok(Self {
            command,
            arg0,
            arg1,
            data_len,
            data_crc32,
        })
    }
}

/// A complete ADB message: header plus verified payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdbMessage {
    /// Message command
    pub command: Command,
    /// First argument
    pub arg0: u32,
    /// Second argument
    pub arg1: u32,
    /// Payload bytes
    pub payload: Bytes,
}

impl AdbMessage {
    /// Build a message from parts.
    #[must_use]
    pub fn new(command: Command, arg0: u32, arg1: u32, payload: impl Into<Bytes>) -> Self {
        Self {
            command,
            arg0,
            arg1,
            payload: payload.into(),
        }
    }

    /// Client connection banner.
    #[must_use]
    pub fn cnxn() -> Self {
        Self::new(
            Command::Cnxn,
            super::CONNECT_VERSION,
            super::MAX_PAYLOAD,
            super::CONNECT_BANNER,
        )
    }

    /// Client acknowledgement of a TLS upgrade.
    #[must_use]
    pub fn stls() -> Self {
        Self::new(Command::Stls, super::STLS_VERSION, 0, Bytes::new())
    }

    /// `AUTH` reply carrying a token signature.
    #[must_use]
    pub fn auth_signature(signature: impl Into<Bytes>) -> Self {
        Self::new(Command::Auth, super::AUTH_SIGNATURE, 0, signature)
    }

    /// `AUTH` reply offering the client public key.
    #[must_use]
    pub fn auth_public_key(key: impl Into<Bytes>) -> Self {
        Self::new(Command::Auth, super::AUTH_RSAPUBLICKEY, 0, key)
    }

    /// Open a logical stream for a service. The service string is sent
    /// NUL-terminated.
    #[must_use]
    pub fn open(local_id: u32, service: &str) -> Self {
        let mut payload = Vec::with_capacity(service.len() + 1);
        payload.extend_from_slice(service.as_bytes());
        payload.push(0);
        Self::new(Command::Open, local_id, 0, payload)
    }

    /// Acknowledge the peer's last frame on a stream.
    #[must_use]
    pub fn okay(local_id: u32, remote_id: u32) -> Self {
        Self::new(Command::Okay, local_id, remote_id, Bytes::new())
    }

    /// Stream payload.
    #[must_use]
    pub fn wrte(local_id: u32, remote_id: u32, payload: impl Into<Bytes>) -> Self {
        Self::new(Command::Wrte, local_id, remote_id, payload)
    }

    /// Close a stream.
    #[must_use]
    pub fn clse(local_id: u32, remote_id: u32) -> Self {
        Self::new(Command::Clse, local_id, remote_id, Bytes::new())
    }

    /// Serialize to header + payload bytes.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = vec![0u8; HEADER_LEN + self.payload.len()];
        let command = self.command.as_u32();

        LittleEndian::write_u32(&mut buf[0..4], command);
        LittleEndian::write_u32(&mut buf[4..8], self.arg0);
        LittleEndian::write_u32(&mut buf[8..12], self.arg1);
        #[allow(clippy::cast_possible_truncation)]
        LittleEndian::write_u32(&mut buf[12..16], self.payload.len() as u32);
        LittleEndian::write_u32(&mut buf[16..20], checksum(&self.payload));
        LittleEndian::write_u32(&mut buf[20..24], command ^ 0xFFFF_FFFF);
        buf[HEADER_LEN..].copy_from_slice(&self.payload);

        buf
    }

    /// Attach a payload to a verified header.
    ///
    /// # Errors
    ///
    /// Returns `BadMessage` when the payload length or byte-sum disagrees
    /// with the header.
    pub fn from_parts(header: MessageHeader, payload: Bytes) -> Result<Self, WireError> {
        if payload.len() != header.data_len as usize {
            return Err(WireError::bad(format!(
                "payload length {} != declared {}",
                payload.len(),
                header.data_len
            )));
        }

        if header.data_len > 0 {
            let actual = checksum(&payload);
            if actual != header.data_crc32 {
                return Err(WireError::bad(format!(
                    "checksum 0x{actual:08X} != declared 0x{:08X}",
                    header.data_crc32
                )));
            }
        }

        Ok(Self {
            command: header.command,
            arg0: header.arg0,
            arg1: header.arg1,
            payload,
        })
    }
}

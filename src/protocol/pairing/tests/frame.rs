use crate::error::AdbLinkError;
use crate::protocol::pairing::{FrameHeader, FrameKind, MAX_FRAME_PAYLOAD, PROTOCOL_VERSION};

#[test]
fn header_layout_is_version_type_len_be() {
    let header = FrameHeader::encode(FrameKind::Spake2Msg, 65).unwrap();
    assert_eq!(header, [1, 0, 0, 0, 0, 65]);

    let header = FrameHeader::encode(FrameKind::PeerInfo, 8208).unwrap();
    assert_eq!(header[0], PROTOCOL_VERSION);
    assert_eq!(header[1], 1);
    assert_eq!(u32::from_be_bytes([header[2], header[3], header[4], header[5]]), 8208);
}

#[test]
fn round_trip() {
    let encoded = FrameHeader::encode(FrameKind::PeerInfo, 1234).unwrap();
    let decoded = FrameHeader::decode(&encoded).unwrap();
    assert_eq!(decoded.kind, FrameKind::PeerInfo);
    assert_eq!(decoded.payload_len, 1234);
    assert_eq!(decoded.version, PROTOCOL_VERSION);
}

#[test]
fn oversized_payloads_are_refused_on_both_sides() {
    assert!(FrameHeader::encode(FrameKind::Spake2Msg, MAX_FRAME_PAYLOAD + 1).is_err());

    let mut bytes = FrameHeader::encode(FrameKind::Spake2Msg, 1).unwrap();
    bytes[2..6].copy_from_slice(&0x0001_0000u32.to_be_bytes());
    assert!(matches!(
        FrameHeader::decode(&bytes),
        Err(AdbLinkError::Protocol { .. })
    ));
}

#[test]
fn unknown_version_and_type_are_protocol_errors() {
    let mut bytes = FrameHeader::encode(FrameKind::Spake2Msg, 0).unwrap();
    bytes[0] = 2;
    assert!(FrameHeader::decode(&bytes).is_err());

    let mut bytes = FrameHeader::encode(FrameKind::Spake2Msg, 0).unwrap();
    bytes[1] = 9;
    assert!(FrameHeader::decode(&bytes).is_err());
}

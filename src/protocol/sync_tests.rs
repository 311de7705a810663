use super::sync::{recv_request, SyncDecoder, SyncError, SyncPacket};

fn packet(id: &[u8; 4], len: u32, payload: &[u8]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(8 + payload.len());
    bytes.extend_from_slice(id);
    bytes.extend_from_slice(&len.to_le_bytes());
    bytes.extend_from_slice(payload);
    bytes
}

#[test]
fn recv_request_layout() {
    let request = recv_request("/sdcard/window_dump.xml");
    assert_eq!(&request[..4], b"RECV");
    assert_eq!(
        u32::from_le_bytes([request[4], request[5], request[6], request[7]]),
        23
    );
    assert_eq!(&request[8..], b"/sdcard/window_dump.xml");
}

#[test]
fn data_then_done() {
    let mut decoder = SyncDecoder::new();
    decoder.feed(&packet(b"DATA", 3, b"abc"));
    decoder.feed(&packet(b"DONE", 0x6650_0000, b""));

    assert_eq!(
        decoder.decode().unwrap(),
        Some(SyncPacket::Data(bytes::Bytes::from_static(b"abc")))
    );
    // DONE's length word is an mtime and must not be read as a payload size.
    assert_eq!(decoder.decode().unwrap(), Some(SyncPacket::Done));
    assert_eq!(decoder.decode().unwrap(), None);
}

#[test]
fn packets_resplit_across_write_frames() {
    let mut stream = packet(b"DATA", 3, b"abc");
    stream.extend_from_slice(&packet(b"DATA", 5, b"defgh"));
    stream.extend_from_slice(&packet(b"DONE", 0, b""));

    // Feed in frame sizes that straddle every packet boundary.
    let mut decoder = SyncDecoder::new();
    let mut collected = Vec::new();
    let mut done = false;
    for frame in stream.chunks(7) {
        decoder.feed(frame);
        while let Some(pkt) = decoder.decode().unwrap() {
            match pkt {
                SyncPacket::Data(data) => collected.extend_from_slice(&data),
                SyncPacket::Done => done = true,
                SyncPacket::Fail(reason) => panic!("unexpected FAIL: {reason}"),
            }
        }
    }

    assert!(done);
    assert_eq!(collected, b"abcdefgh");
    assert_eq!(decoder.buffered_len(), 0);
}

#[test]
fn split_header_is_buffered() {
    let bytes = packet(b"DATA", 4, b"wxyz");
    let mut decoder = SyncDecoder::new();

    decoder.feed(&bytes[..5]); // id + one length byte
    assert_eq!(decoder.decode().unwrap(), None);
    decoder.feed(&bytes[5..]);
    assert_eq!(
        decoder.decode().unwrap(),
        Some(SyncPacket::Data(bytes::Bytes::from_static(b"wxyz")))
    );
}

#[test]
fn fail_carries_utf8_reason() {
    let mut decoder = SyncDecoder::new();
    decoder.feed(&packet(b"FAIL", 20, b"open failed: ENOENT "));

    match decoder.decode().unwrap() {
        Some(SyncPacket::Fail(reason)) => assert!(reason.contains("ENOENT")),
        other => panic!("expected FAIL, got {other:?}"),
    }
}

#[test]
fn unknown_id_is_an_error() {
    let mut decoder = SyncDecoder::new();
    decoder.feed(&packet(b"STAT", 0, b""));
    assert!(matches!(
        decoder.decode(),
        Err(SyncError::UnexpectedId(_))
    ));
}

#[test]
fn absurd_length_is_rejected() {
    let mut decoder = SyncDecoder::new();
    decoder.feed(&packet(b"DATA", 0x7FFF_FFFF, b""));
    assert!(matches!(
        decoder.decode(),
        Err(SyncError::PayloadTooLarge { .. })
    ));
}

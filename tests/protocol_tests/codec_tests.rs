//! Codec Tests
//!
//! Tests for command and response encoding/decoding.

use std::io::Cursor;

use logkv::protocol::{
    decode_command, decode_entries, decode_response, encode_command, encode_entries,
    encode_response, read_command, read_response, write_command, write_response, Command,
    Response, Status, HEADER_SIZE, MAX_PAYLOAD_SIZE,
};
use logkv::KvError;

// =============================================================================
// Command Encoding/Decoding Tests
// =============================================================================

#[test]
fn test_encode_get_layout() {
    let encoded = encode_command(&Command::Get {
        key: "hello".to_string(),
    });

    assert_eq!(encoded[0], 0x01);
    assert_eq!(&encoded[1..5], &9u32.to_be_bytes());
    assert_eq!(&encoded[5..9], &5u32.to_be_bytes());
    assert_eq!(&encoded[9..], b"hello");
}

#[test]
fn test_encode_decode_put() {
    let cmd = Command::Put {
        key: "my,key".to_string(),
        value: "my value\nwith newline".to_string(),
    };

    assert_eq!(decode_command(&encode_command(&cmd)).unwrap(), cmd);
}

#[test]
fn test_decode_commands_without_payload() {
    for cmd in [Command::Enumerate, Command::Size, Command::Ping] {
        let encoded = encode_command(&cmd);
        assert_eq!(encoded.len(), HEADER_SIZE);
        assert_eq!(decode_command(&encoded).unwrap(), cmd);
    }
}

#[test]
fn test_decode_unknown_command() {
    let bytes = [0x7f, 0, 0, 0, 0];

    assert!(matches!(decode_command(&bytes), Err(KvError::Protocol(_))));
}

#[test]
fn test_decode_incomplete_header() {
    assert!(matches!(decode_command(&[0x01, 0]), Err(KvError::Protocol(_))));
}

#[test]
fn test_decode_incomplete_payload() {
    let mut encoded = encode_command(&Command::Delete {
        key: "abc".to_string(),
    });
    encoded.pop();

    assert!(matches!(decode_command(&encoded), Err(KvError::Protocol(_))));
}

#[test]
fn test_decode_payload_too_large() {
    let mut bytes = vec![0x01];
    bytes.extend_from_slice(&(MAX_PAYLOAD_SIZE + 1).to_be_bytes());

    assert!(matches!(decode_command(&bytes), Err(KvError::Protocol(_))));
}

#[test]
fn test_decode_key_length_overflows_payload() {
    let mut bytes = vec![0x01];
    bytes.extend_from_slice(&6u32.to_be_bytes());
    bytes.extend_from_slice(&100u32.to_be_bytes());
    bytes.extend_from_slice(b"ab");

    assert!(matches!(decode_command(&bytes), Err(KvError::Protocol(_))));
}

#[test]
fn test_decode_rejects_payload_on_ping() {
    let bytes = [0x04, 0, 0, 0, 1, b'x'];

    assert!(matches!(decode_command(&bytes), Err(KvError::Protocol(_))));
}

#[test]
fn test_decode_rejects_invalid_utf8_key() {
    let mut bytes = vec![0x01];
    bytes.extend_from_slice(&6u32.to_be_bytes());
    bytes.extend_from_slice(&2u32.to_be_bytes());
    bytes.extend_from_slice(&[0xff, 0xfe]);

    assert!(matches!(decode_command(&bytes), Err(KvError::Protocol(_))));
}

// =============================================================================
// Response Encoding/Decoding Tests
// =============================================================================

#[test]
fn test_encode_decode_responses() {
    let responses = [
        Response::ok(Some(b"value".to_vec())),
        Response::ok(None),
        Response::not_found(),
        Response::error("bad request"),
        Response::unavailable("engine is closed"),
    ];

    for response in responses {
        assert_eq!(decode_response(&encode_response(&response)).unwrap(), response);
    }
}

#[test]
fn test_response_status_bytes() {
    assert_eq!(encode_response(&Response::not_found())[0], 0x01);
    assert_eq!(encode_response(&Response::unavailable("x"))[0], 0x03);
    assert_eq!(Response::error("oops").status, Status::Error);
    assert_eq!(Response::error("oops").text(), "oops");
}

#[test]
fn test_decode_unknown_status() {
    assert!(matches!(
        decode_response(&[0x09, 0, 0, 0, 0]),
        Err(KvError::Protocol(_))
    ));
}

// =============================================================================
// Entries Payload Tests
// =============================================================================

#[test]
fn test_entries_payload() {
    let entries = vec![
        ("a".to_string(), "1".to_string()),
        ("b,c".to_string(), String::new()),
    ];

    assert_eq!(decode_entries(&encode_entries(&entries)).unwrap(), entries);
    assert_eq!(decode_entries(&encode_entries(&[])).unwrap(), vec![]);
}

#[test]
fn test_entries_payload_truncated() {
    let mut payload = encode_entries(&[("key".to_string(), "value".to_string())]);
    payload.truncate(payload.len() - 2);

    assert!(decode_entries(&payload).is_err());
    assert!(decode_entries(&[]).is_err());
}

// =============================================================================
// Stream Tests
// =============================================================================

#[test]
fn test_stream_multiple_commands() {
    let commands = vec![
        Command::Put {
            key: "k".to_string(),
            value: "v".to_string(),
        },
        Command::Get { key: "k".to_string() },
        Command::Enumerate,
    ];

    let mut buf = Vec::new();
    for cmd in &commands {
        write_command(&mut buf, cmd).unwrap();
    }

    let mut cursor = Cursor::new(buf);
    for cmd in &commands {
        assert_eq!(&read_command(&mut cursor).unwrap(), cmd);
    }
    assert!(matches!(read_command(&mut cursor), Err(KvError::Io(_))));
}

#[test]
fn test_stream_response() {
    let mut buf = Vec::new();
    write_response(&mut buf, &Response::ok(Some(b"PONG".to_vec()))).unwrap();

    let response = read_response(&mut Cursor::new(buf)).unwrap();

    assert_eq!(response.status, Status::Ok);
    assert_eq!(response.text(), "PONG");
}

//! Tests for the log record codec
//!
//! These tests verify:
//! - Exact line layout for put and delete records
//! - Escaping of delimiters inside fields
//! - Every decode failure class

use logkv::wal::{DecodeError, Record};

// =============================================================================
// Encoding Tests
// =============================================================================

#[test]
fn test_encode_put() {
    assert_eq!(Record::put("name", "alice").encode(), "PUT,name,alice\n");
}

#[test]
fn test_encode_delete() {
    assert_eq!(Record::delete("name").encode(), "DEL,name\n");
}

#[test]
fn test_encode_escapes_delimiters() {
    let record = Record::put("a,b", "line1\nline2\\");

    assert_eq!(record.encode(), "PUT,a\\,b,line1\\nline2\\\\\n");
}

#[test]
fn test_encode_empty_fields() {
    assert_eq!(Record::put("", "").encode(), "PUT,,\n");
    assert_eq!(Record::delete("").encode(), "DEL,\n");
}

#[test]
fn test_encoded_line_has_single_newline() {
    let line = Record::put("k\n\n", "\r\n\r\n").encode();

    assert_eq!(line.matches('\n').count(), 1);
    assert!(line.ends_with('\n'));
}

// =============================================================================
// Decoding Tests
// =============================================================================

#[test]
fn test_decode_put() {
    assert_eq!(
        Record::decode("PUT,name,alice").unwrap(),
        Record::put("name", "alice")
    );
}

#[test]
fn test_decode_delete() {
    assert_eq!(Record::decode("DEL,name").unwrap(), Record::delete("name"));
}

#[test]
fn test_decode_escaped_fields() {
    let line = Record::put("a,b\\c", "x\ny\rz").encode();

    let decoded = Record::decode(line.trim_end_matches('\n')).unwrap();

    assert_eq!(decoded, Record::put("a,b\\c", "x\ny\rz"));
    assert_eq!(decoded.key(), "a,b\\c");
}

#[test]
fn test_decode_tolerates_trailing_cr() {
    assert_eq!(Record::decode("DEL,name\r").unwrap(), Record::delete("name"));
}

#[test]
fn test_decode_empty_line() {
    assert_eq!(Record::decode(""), Err(DecodeError::TooFewFields(1)));
}

#[test]
fn test_decode_opcode_only() {
    assert_eq!(Record::decode("PUT"), Err(DecodeError::TooFewFields(1)));
}

#[test]
fn test_decode_unknown_opcode() {
    assert_eq!(
        Record::decode("SET,k,v"),
        Err(DecodeError::UnknownOpcode("SET".to_string()))
    );
    // Opcodes are case sensitive
    assert!(matches!(
        Record::decode("put,k,v"),
        Err(DecodeError::UnknownOpcode(_))
    ));
}

#[test]
fn test_decode_put_with_one_field() {
    assert_eq!(
        Record::decode("PUT,onlyonefield"),
        Err(DecodeError::FieldCount {
            opcode: "PUT",
            expected: 3,
            found: 2
        })
    );
}

#[test]
fn test_decode_put_with_unescaped_comma_in_value() {
    assert!(matches!(
        Record::decode("PUT,k,a,b"),
        Err(DecodeError::FieldCount { found: 4, .. })
    ));
}

#[test]
fn test_decode_delete_with_value() {
    assert_eq!(
        Record::decode("DEL,k,v"),
        Err(DecodeError::FieldCount {
            opcode: "DEL",
            expected: 2,
            found: 3
        })
    );
}

#[test]
fn test_decode_invalid_escape() {
    assert_eq!(Record::decode("PUT,k,\\x"), Err(DecodeError::InvalidEscape(6)));
}

#[test]
fn test_decode_dangling_escape() {
    assert!(matches!(
        Record::decode("PUT,k,v\\"),
        Err(DecodeError::InvalidEscape(_))
    ));
}

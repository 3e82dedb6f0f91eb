//! Codec Tests
//!
//! Tests for request parsing and reply encoding.

use std::io::{Cursor, ErrorKind};

use atlasid::error::AtlasError;
use atlasid::protocol::{
    encode_reply, encode_request, read_reply, read_request, write_reply, Reply, Request,
};
use bytes::{Bytes, BytesMut};

// =============================================================================
// Helper Functions
// =============================================================================

fn parse(raw: &[u8]) -> Result<Request, AtlasError> {
    read_request(&mut Cursor::new(raw.to_vec()))
}

fn encode(reply: &Reply) -> Vec<u8> {
    let mut buf = BytesMut::new();
    encode_reply(reply, &mut buf);
    buf.to_vec()
}

fn assert_protocol_error(result: Result<Request, AtlasError>) {
    match result {
        Err(AtlasError::Protocol(_)) => {}
        other => panic!("Expected protocol error, got {:?}", other),
    }
}

// =============================================================================
// Request Parsing Tests
// =============================================================================

#[test]
fn test_request_round_trip() {
    let request = Request::new("SET", ["orders", "100"]);
    let encoded = encode_request(&request);

    assert_eq!(
        &encoded[..],
        b"*3\r\n$3\r\nSET\r\n$6\r\norders\r\n$3\r\n100\r\n"
    );

    let decoded = parse(&encoded).unwrap();
    assert_eq!(decoded, request);
    assert_eq!(decoded.command, "SET");
    assert_eq!(decoded.arguments, vec![Bytes::from("orders"), Bytes::from("100")]);
}

#[test]
fn test_command_is_case_folded() {
    let request = parse(b"*2\r\n$3\r\nget\r\n$6\r\norders\r\n").unwrap();
    assert_eq!(request.command, "GET");
    assert_eq!(&request.arguments[0][..], b"orders");
}

#[test]
fn test_arguments_are_kept_raw() {
    let request = parse(b"*2\r\n$3\r\nSET\r\n$4\r\na\r\nb\r\n").unwrap();
    assert_eq!(&request.arguments[0][..], b"a\r\nb");
}

#[test]
fn test_empty_argument() {
    let request = parse(b"*2\r\n$3\r\nGET\r\n$0\r\n\r\n").unwrap();
    assert!(request.arguments[0].is_empty());
}

#[test]
fn test_consecutive_requests_on_one_stream() {
    let mut stream = Cursor::new(
        b"*2\r\n$3\r\nGET\r\n$1\r\na\r\n*2\r\n$6\r\nEXISTS\r\n$1\r\nb\r\n".to_vec(),
    );

    let first = read_request(&mut stream).unwrap();
    let second = read_request(&mut stream).unwrap();

    assert_eq!(first.command, "GET");
    assert_eq!(second.command, "EXISTS");
    assert_eq!(&second.arguments[0][..], b"b");
}

#[test]
fn test_clean_eof_is_io_error() {
    match parse(b"") {
        Err(AtlasError::Io(e)) => assert_eq!(e.kind(), ErrorKind::UnexpectedEof),
        other => panic!("Expected EOF, got {:?}", other),
    }
}

// =============================================================================
// Malformed Request Tests
// =============================================================================

#[test]
fn test_missing_second_element() {
    assert_protocol_error(parse(b"*2\r\n$3\r\nGET\r\n"));
}

#[test]
fn test_missing_array_marker() {
    assert_protocol_error(parse(b"GET orders\r\n"));
}

#[test]
fn test_zero_elements() {
    assert_protocol_error(parse(b"*0\r\n"));
}

#[test]
fn test_short_element_body() {
    let err = parse(b"*1\r\n$10\r\nGET\r\n").unwrap_err();
    match err {
        AtlasError::Protocol(message) => {
            assert!(message.contains("argument length 5 does not match 10"), "{}", message)
        }
        other => panic!("Expected protocol error, got {:?}", other),
    }
}

#[test]
fn test_missing_crlf_after_element() {
    assert_protocol_error(parse(b"*1\r\n$3\r\nGETxx"));
}

#[test]
fn test_negative_element_length() {
    assert_protocol_error(parse(b"*1\r\n$-1\r\n"));
}

#[test]
fn test_header_without_cr() {
    assert_protocol_error(parse(b"*1\n$3\r\nGET\r\n"));
}

// =============================================================================
// Reply Encoding Tests
// =============================================================================

#[test]
fn test_encode_status() {
    assert_eq!(encode(&Reply::ok()), b"+OK\r\n");
}

#[test]
fn test_encode_integer() {
    assert_eq!(encode(&Reply::integer(1)), b":1\r\n");
    assert_eq!(encode(&Reply::integer(-7)), b":-7\r\n");
}

#[test]
fn test_encode_bulk() {
    assert_eq!(encode(&Reply::bulk("101")), b"$3\r\n101\r\n");
}

#[test]
fn test_encode_nil_and_empty_bulk_are_identical() {
    assert_eq!(encode(&Reply::nil()), b"$-1\r\n");
    assert_eq!(encode(&Reply::bulk(Bytes::new())), b"$-1\r\n");
}

#[test]
fn test_encode_multi_bulk() {
    let reply = Reply::MultiBulk(vec![Some(Bytes::from("a")), None, Some(Bytes::from("bc"))]);
    assert_eq!(encode(&reply), b"*3\r\n$1\r\na\r\n$-1\r\n$2\r\nbc\r\n");
    assert_eq!(encode(&Reply::MultiBulk(vec![])), b"*0\r\n");
}

#[test]
fn test_encode_error() {
    assert_eq!(
        encode(&Reply::error("Method is not supported")),
        b"-ERROR Method is not supported\r\n"
    );
}

// =============================================================================
// Reply Reading Tests (client side)
// =============================================================================

#[test]
fn test_read_reply_sequence() {
    let mut wire = Vec::new();
    for reply in [
        Reply::ok(),
        Reply::bulk("102"),
        Reply::nil(),
        Reply::integer(0),
        Reply::error("no key for set"),
        Reply::MultiBulk(vec![Some(Bytes::from("x")), None]),
    ] {
        write_reply(&mut wire, &reply).unwrap();
    }

    let mut stream = Cursor::new(wire);
    assert_eq!(read_reply(&mut stream).unwrap(), Reply::ok());
    assert_eq!(read_reply(&mut stream).unwrap(), Reply::bulk("102"));
    assert_eq!(read_reply(&mut stream).unwrap(), Reply::nil());
    assert_eq!(read_reply(&mut stream).unwrap(), Reply::integer(0));
    assert_eq!(read_reply(&mut stream).unwrap(), Reply::error("no key for set"));
    assert_eq!(
        read_reply(&mut stream).unwrap(),
        Reply::MultiBulk(vec![Some(Bytes::from("x")), None])
    );
}

#[test]
fn test_read_reply_unknown_type() {
    let result = read_reply(&mut Cursor::new(b"?what\r\n".to_vec()));
    assert!(matches!(result, Err(AtlasError::Protocol(_))));
}

use bytes::BytesMut;
use resp::ParseError;
use resp::Reply;
use resp::ReplyParseResult;
use resp::ReplyParser;

#[test]
fn test_one_shot_parse_incomplete() {
	let mut buf = BytesMut::new();
	buf.extend_from_slice(b"+HEL");

	let result = resp::parse(&mut buf);
	assert!(matches!(result, Err(ParseError::UnexpectedEOF)));

	buf.extend_from_slice(b"LO\r\n");
	let result = resp::parse(&mut buf);
	match result {
		Ok(Reply::Status(s)) => assert_eq!(s, "HELLO"),
		_ => panic!("Expected Status(HELLO), got {:?}", result),
	}
}

#[test]
fn test_streaming_parse_success() {
	let mut parser = ReplyParser::new();
	let mut buf = BytesMut::new();

	buf.extend_from_slice(b"+HEL");
	let result = parser.parse(&mut buf);
	assert!(matches!(result, ReplyParseResult::Incomplete));

	// Partial status lines are never consumed
	assert_eq!(&buf[..], b"+HEL");

	buf.extend_from_slice(b"LO\r\n");
	let result = parser.parse(&mut buf);
	if let ReplyParseResult::Complete(Reply::Status(s)) = result {
		assert_eq!(s, "HELLO");
	} else {
		panic!("Expected Complete(Status), got {:?}", result);
	}
}

#[test]
fn test_streaming_array_split() {
	let mut parser = ReplyParser::new();
	let mut buf = BytesMut::new();

	buf.extend_from_slice(b"*2\r\n");
	buf.extend_from_slice(b"$3\r\nf");

	let result = parser.parse(&mut buf);
	assert!(matches!(result, ReplyParseResult::Incomplete));
	assert!(parser.is_mid_reply());

	buf.extend_from_slice(b"oo\r\n");

	// Still incomplete because the second element is missing
	let result = parser.parse(&mut buf);
	assert!(matches!(result, ReplyParseResult::Incomplete));

	buf.extend_from_slice(b"$3\r\nbar\r\n");

	let result = parser.parse(&mut buf);
	if let ReplyParseResult::Complete(Reply::Array(Some(arr))) = result {
		assert_eq!(arr, vec![Reply::bulk("foo"), Reply::bulk("bar")]);
	} else {
		panic!("Expected Complete(Array), got {:?}", result);
	}
	assert!(!parser.is_mid_reply());
}

#[test]
fn test_streaming_byte_by_byte() {
	let wire = b"*3\r\n+OK\r\n$-1\r\n*2\r\n:7\r\n$2\r\nhi\r\n:99\r\n";
	let mut parser = ReplyParser::new();
	let mut buf = BytesMut::new();
	let mut replies = Vec::new();

	for &byte in wire.iter() {
		buf.extend_from_slice(&[byte]);
		while let ReplyParseResult::Complete(reply) = parser.parse(&mut buf) {
			replies.push(reply);
		}
	}

	assert_eq!(
		replies,
		vec![
			Reply::array(vec![
				Reply::ok(),
				Reply::null_bulk(),
				Reply::array(vec![Reply::integer(7), Reply::bulk("hi")]),
			]),
			Reply::integer(99),
		]
	);
	assert!(buf.is_empty());
}

#[test]
fn test_pipelined_replies_in_one_buffer() {
	let mut parser = ReplyParser::new();
	let mut buf = BytesMut::from(&b"+OK\r\n+QUEUED\r\n+QUEUED\r\n*2\r\n:1\r\n:2\r\n"[..]);

	let mut next = || match parser.parse(&mut buf) {
		ReplyParseResult::Complete(reply) => reply,
		other => panic!("Expected Complete, got {:?}", other),
	};

	assert_eq!(next(), Reply::ok());
	assert!(next().is_queued());
	assert!(next().is_queued());
	assert_eq!(
		next(),
		Reply::array(vec![Reply::integer(1), Reply::integer(2)])
	);
}

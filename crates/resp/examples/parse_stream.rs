use bytes::BytesMut;
use resp::ReplyParseResult;
use resp::ReplyParser;

fn main() {
	println!("--- RESP Streaming Reply Example ---");

	// Replies to a pipelined MULTI / SET / INCR / EXEC, split into uneven
	// chunks the way they might arrive from a socket.
	let data_chunks = vec![
		b"+O".as_slice(),
		b"K\r\n+QUEU".as_slice(),
		b"ED\r\n+QUEUED\r".as_slice(),
		b"\n*2\r\n+OK\r\n:".as_slice(),
		b"4".as_slice(),
		b"2\r\n".as_slice(),
	];

	let mut parser = ReplyParser::new();
	let mut buffer = BytesMut::new();

	for (i, chunk) in data_chunks.iter().enumerate() {
		println!(
			"\n[Stream] Received Chunk {}: {:?}",
			i,
			String::from_utf8_lossy(chunk)
		);

		buffer.extend_from_slice(chunk);

		loop {
			match parser.parse(&mut buffer) {
				ReplyParseResult::Complete(reply) => {
					println!("[Parser] Complete: {:?}", reply);
				}
				ReplyParseResult::Incomplete => {
					println!("[Parser] Incomplete, waiting for more data...");
					break;
				}
				ReplyParseResult::Error(e) => {
					eprintln!("[Parser] Error: {:?}", e);
					break;
				}
			}
		}
	}
}

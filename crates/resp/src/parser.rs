//! Resumable RESP2 reply parser.
//!
//! The parser works on a caller-owned [`BytesMut`] that is refilled from
//! the network between calls. Complete scalar replies are consumed from
//! the buffer as soon as they are recognised; arrays that are still
//! missing elements are kept on an explicit frame stack, so a partially
//! received reply survives across calls and deep nesting never turns into
//! deep recursion.

use bytes::Buf;
use bytes::BytesMut;
use log::warn;

use crate::error::ParseError;
use crate::types::OK;
use crate::types::PONG;
use crate::types::QUEUED;
use crate::types::Reply;
use crate::utils::*;

/// Largest bulk string a server may send (512 MiB).
pub const MAX_BULK_LEN: usize = 512 * 1024 * 1024;

/// Upper bound on the capacity reserved up front for an array; larger
/// arrays grow as their elements arrive.
const MAX_PREALLOC_ELEMENTS: usize = 1024;

/// Result of a parsing attempt.
#[derive(Debug)]
pub enum ReplyParseResult {
	/// A complete reply was parsed.
	Complete(Reply),
	/// The buffer does not contain enough data to finish the reply.
	Incomplete,
	/// The input is not valid RESP2. The parser has been reset and the
	/// stream position is lost.
	Error(ParseError),
}

/// A stateful reply parser that supports streaming.
#[derive(Debug, Default)]
pub struct ReplyParser {
	frames: Vec<Frame>,
}

#[derive(Debug)]
struct Frame {
	expected: usize,
	elements: Vec<Reply>,
}

enum ParsedItem {
	Value(Reply),
	FramePushed,
}

impl ReplyParser {
	pub fn new() -> Self {
		Self { frames: Vec::new() }
	}

	/// Whether a reply has been started but not finished.
	pub fn is_mid_reply(&self) -> bool {
		!self.frames.is_empty()
	}

	/// Parse one reply from `buf`.
	///
	/// On `Complete`, the reply's bytes have been consumed. On
	/// `Incomplete`, every byte belonging to already finished elements has
	/// been consumed and the rest is left in place; call again once more
	/// data has been appended.
	pub fn parse(&mut self, buf: &mut BytesMut) -> ReplyParseResult {
		loop {
			match self.parse_step(buf) {
				Ok(Some(ParsedItem::FramePushed)) => continue,
				Ok(Some(ParsedItem::Value(value))) => {
					if let Some(reply) = self.absorb(value) {
						return ReplyParseResult::Complete(reply);
					}
				}
				Ok(None) => return ReplyParseResult::Incomplete,
				Err(e) => {
					self.frames.clear();
					return ReplyParseResult::Error(e);
				}
			}
		}
	}

	/// Push a finished value into the innermost open array, closing every
	/// array it completes. Returns the root reply once nothing is left
	/// open.
	fn absorb(&mut self, mut value: Reply) -> Option<Reply> {
		loop {
			let Some(frame) = self.frames.last_mut() else {
				return Some(value);
			};
			frame.elements.push(value);
			if frame.elements.len() < frame.expected {
				return None;
			}
			let elements = std::mem::take(&mut frame.elements);
			self.frames.pop();
			value = Reply::Array(Some(elements));
		}
	}

	fn parse_step(&mut self, buf: &mut BytesMut) -> Result<Option<ParsedItem>, ParseError> {
		let Some(&type_marker) = buf.first() else {
			return Ok(None);
		};

		match type_marker {
			STATUS | ERROR => self.parse_line(buf, type_marker),
			INTEGER => self.parse_integer(buf),
			BULK_STRING => self.parse_bulk_string(buf),
			ARRAY => self.start_array(buf),
			_ => Err(ParseError::InvalidTypeMarker(type_marker)),
		}
	}

	fn parse_line(
		&mut self,
		buf: &mut BytesMut,
		marker: u8,
	) -> Result<Option<ParsedItem>, ParseError> {
		let Some((line, consumed, end)) = peek_status_line(&buf[1..]) else {
			return Ok(None);
		};
		if end != LineEnd::Crlf {
			warn!(
				"Accepting {:?} as end of line after {:?}",
				end,
				String::from_utf8_lossy(line)
			);
		}

		let len = line.len();
		let reply = if marker == STATUS {
			match line {
				OK => Some(Reply::ok()),
				PONG => Some(Reply::pong()),
				QUEUED => Some(Reply::queued()),
				_ => None,
			}
		} else {
			None
		};

		buf.advance(1);
		let reply = match reply {
			Some(shared) => {
				buf.advance(len);
				shared
			}
			None => {
				let line = buf.split_to(len).freeze();
				if marker == STATUS {
					Reply::Status(line)
				} else {
					Reply::Error(line)
				}
			}
		};
		// Only the terminator is left; a bare CR leaves the byte after it in
		// place for the next reply.
		buf.advance(consumed - len);
		Ok(Some(ParsedItem::Value(reply)))
	}

	fn parse_integer(&mut self, buf: &mut BytesMut) -> Result<Option<ParsedItem>, ParseError> {
		let Some((line, consumed)) = peek_line(&buf[1..])? else {
			return Ok(None);
		};
		let value = parse_integer(line)?;
		buf.advance(1 + consumed);
		Ok(Some(ParsedItem::Value(Reply::Integer(value))))
	}

	fn parse_bulk_string(&mut self, buf: &mut BytesMut) -> Result<Option<ParsedItem>, ParseError> {
		// $6\r\nfoobar\r\n
		let Some((line, header_len)) = peek_line(&buf[1..])? else {
			return Ok(None);
		};
		let length = parse_integer(line)?;

		if length == -1 {
			buf.advance(1 + header_len);
			return Ok(Some(ParsedItem::Value(Reply::Bulk(None))));
		}
		let length = match usize::try_from(length) {
			Ok(l) if l <= MAX_BULK_LEN => l,
			_ => return Err(ParseError::InvalidBulkStringLength(length)),
		};

		let data_start = 1 + header_len;
		let total_needed = data_start + length + 2;
		if buf.len() < total_needed {
			buf.reserve(total_needed - buf.len());
			return Ok(None);
		}
		if &buf[data_start + length..total_needed] != CRLF {
			return Err(ParseError::InvalidFormat(
				"Missing CRLF after bulk string".to_string(),
			));
		}

		buf.advance(data_start);
		let data = buf.split_to(length).freeze();
		buf.advance(2);
		Ok(Some(ParsedItem::Value(Reply::Bulk(Some(data)))))
	}

	fn start_array(&mut self, buf: &mut BytesMut) -> Result<Option<ParsedItem>, ParseError> {
		let Some((line, header_len)) = peek_line(&buf[1..])? else {
			return Ok(None);
		};
		let length = parse_integer(line)?;

		if length == -1 {
			buf.advance(1 + header_len);
			return Ok(Some(ParsedItem::Value(Reply::Array(None))));
		}
		let Ok(length) = usize::try_from(length) else {
			return Err(ParseError::InvalidArrayLength(length));
		};
		buf.advance(1 + header_len);

		if length == 0 {
			return Ok(Some(ParsedItem::Value(Reply::Array(Some(Vec::new())))));
		}

		self.frames.push(Frame {
			expected: length,
			elements: Vec::with_capacity(length.min(MAX_PREALLOC_ELEMENTS)),
		});
		Ok(Some(ParsedItem::FramePushed))
	}
}

/// Convenience function for one-off parsing.
///
/// Creates a temporary parser and parses exactly one reply. Input that
/// stops short of a complete reply is an error here; use [`ReplyParser`]
/// directly for streaming.
pub fn parse(buf: &mut BytesMut) -> Result<Reply, ParseError> {
	let mut parser = ReplyParser::new();
	match parser.parse(buf) {
		ReplyParseResult::Complete(reply) => Ok(reply),
		ReplyParseResult::Incomplete => Err(ParseError::UnexpectedEOF),
		ReplyParseResult::Error(e) => Err(e),
	}
}

//! Error types for RESP reply decoding.

use thiserror::Error;

/// Errors that can occur while decoding a reply from the wire.
///
/// Every variant means the byte stream no longer lines up with reply
/// boundaries; callers reading from a live connection must not attempt to
/// resynchronise after one of these.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
	/// The input ended before a complete reply was read
	#[error("Unexpected end of input")]
	UnexpectedEOF,

	/// The first byte of a reply is not one of `+ - : $ *`
	#[error("Invalid type marker: 0x{0:02X}")]
	InvalidTypeMarker(u8),

	/// A line or payload is framed incorrectly
	#[error("Invalid format: {0}")]
	InvalidFormat(String),

	/// An integer line holds something other than an optionally signed
	/// decimal number that fits in 64 bits
	#[error("Invalid integer: {0}")]
	InvalidInteger(String),

	/// Bulk string length below -1
	#[error("Invalid bulk string length: {0}")]
	InvalidBulkStringLength(i64),

	/// Array length below -1
	#[error("Invalid array length: {0}")]
	InvalidArrayLength(i64),
}

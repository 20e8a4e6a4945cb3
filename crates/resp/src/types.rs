//! Reply representation.

use bytes::Bytes;

pub(crate) const OK: &[u8] = b"OK";
pub(crate) const PONG: &[u8] = b"PONG";
pub(crate) const QUEUED: &[u8] = b"QUEUED";

/// A reply read from a RESP2 server.
///
/// Replies are plain values: they own their payload and hold no reference
/// to the stream they were decoded from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Reply {
	/// Status line: `+OK\r\n`
	Status(Bytes),

	/// Server error: `-ERR message\r\n`
	Error(Bytes),

	/// Integer: `:1000\r\n`
	Integer(i64),

	/// Bulk string: `$6\r\nfoobar\r\n`, `None` for `$-1\r\n`
	Bulk(Option<Bytes>),

	/// Array: `*2\r\n:1\r\n:2\r\n`, `None` for `*-1\r\n`
	Array(Option<Vec<Reply>>),
}

impl Reply {
	/// Check if the reply is a server error
	pub fn is_error(&self) -> bool {
		matches!(self, Reply::Error(_))
	}

	/// Check if the reply is a null bulk string or a null array
	pub fn is_null(&self) -> bool {
		matches!(self, Reply::Bulk(None) | Reply::Array(None))
	}

	/// Check if the reply is the `QUEUED` placeholder returned for commands
	/// issued inside a transaction
	pub fn is_queued(&self) -> bool {
		matches!(self, Reply::Status(s) if s.as_ref() == QUEUED)
	}

	/// Try to view a status, error or bulk payload as UTF-8
	pub fn as_str(&self) -> Option<&str> {
		self.as_bytes().and_then(|b| std::str::from_utf8(b).ok())
	}

	/// Try to view a status, error or bulk payload as raw bytes
	pub fn as_bytes(&self) -> Option<&Bytes> {
		match self {
			Reply::Status(b) | Reply::Error(b) | Reply::Bulk(Some(b)) => Some(b),
			_ => None,
		}
	}

	/// Try to convert to integer
	pub fn as_integer(&self) -> Option<i64> {
		match self {
			Reply::Integer(i) => Some(*i),
			_ => None,
		}
	}

	/// Try to view a non-null array
	pub fn as_array(&self) -> Option<&[Reply]> {
		match self {
			Reply::Array(Some(items)) => Some(items),
			_ => None,
		}
	}

	/// Try to consume a non-null array
	pub fn into_array(self) -> Option<Vec<Reply>> {
		match self {
			Reply::Array(Some(items)) => Some(items),
			_ => None,
		}
	}

	/// Convert a status, error or bulk payload to String with lossy UTF-8
	/// conversion
	pub fn to_string_lossy(&self) -> Option<String> {
		self.as_bytes()
			.map(|b| String::from_utf8_lossy(b).into_owned())
	}

	// Shared well-known statuses. These never allocate.

	pub fn ok() -> Self {
		Reply::Status(Bytes::from_static(OK))
	}

	pub fn pong() -> Self {
		Reply::Status(Bytes::from_static(PONG))
	}

	pub fn queued() -> Self {
		Reply::Status(Bytes::from_static(QUEUED))
	}

	// Convenience constructors

	pub fn status(s: impl Into<Bytes>) -> Self {
		Reply::Status(s.into())
	}

	pub fn error(e: impl Into<Bytes>) -> Self {
		Reply::Error(e.into())
	}

	pub fn integer(i: i64) -> Self {
		Reply::Integer(i)
	}

	pub fn bulk(b: impl Into<Bytes>) -> Self {
		Reply::Bulk(Some(b.into()))
	}

	pub fn null_bulk() -> Self {
		Reply::Bulk(None)
	}

	pub fn array(items: impl IntoIterator<Item = Reply>) -> Self {
		Reply::Array(Some(items.into_iter().collect()))
	}

	pub fn null_array() -> Self {
		Reply::Array(None)
	}
}

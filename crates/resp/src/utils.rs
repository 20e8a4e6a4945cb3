//! Utility functions and constants for RESP protocol.

use bytes::BufMut;
use bytes::BytesMut;
use memchr::memchr2;

use crate::error::ParseError;

/// CRLF line ending
pub const CRLF: &[u8] = b"\r\n";

/// Type markers for RESP2
pub const STATUS: u8 = b'+';
pub const ERROR: u8 = b'-';
pub const INTEGER: u8 = b':';
pub const BULK_STRING: u8 = b'$';
pub const ARRAY: u8 = b'*';

/// Number of values served from [`SMALL_INTS`].
pub const SMALL_INT_COUNT: usize = 256;

/// Decimal form of a small non-negative integer followed by CRLF.
#[derive(Clone, Copy)]
pub struct SmallInt {
	bytes: [u8; 5],
	len: u8,
}

impl SmallInt {
	/// Digits only, e.g. `b"42"`
	#[inline]
	pub fn digits(&self) -> &[u8] {
		&self.bytes[..self.len as usize - 2]
	}

	/// Digits and line ending, e.g. `b"42\r\n"`
	#[inline]
	pub fn with_crlf(&self) -> &[u8] {
		&self.bytes[..self.len as usize]
	}
}

const fn small_int(n: usize) -> SmallInt {
	let mut bytes = [0u8; 5];
	let mut len = 0;
	if n >= 100 {
		bytes[len] = b'0' + (n / 100) as u8;
		len += 1;
	}
	if n >= 10 {
		bytes[len] = b'0' + (n / 10 % 10) as u8;
		len += 1;
	}
	bytes[len] = b'0' + (n % 10) as u8;
	bytes[len + 1] = b'\r';
	bytes[len + 2] = b'\n';
	SmallInt {
		bytes,
		len: (len + 3) as u8,
	}
}

/// Precomputed ASCII for `0..256`. Argument counts and lengths in
/// pipelined traffic almost always land here.
pub static SMALL_INTS: [SmallInt; SMALL_INT_COUNT] = {
	let mut table = [SmallInt {
		bytes: [0; 5],
		len: 0,
	}; SMALL_INT_COUNT];
	let mut i = 0;
	while i < SMALL_INT_COUNT {
		table[i] = small_int(i);
		i += 1;
	}
	table
};

/// Write `marker`, the decimal `length` and CRLF.
#[inline]
pub fn put_length(buf: &mut BytesMut, marker: u8, length: usize) {
	buf.put_u8(marker);
	if length < SMALL_INT_COUNT {
		buf.put_slice(SMALL_INTS[length].with_crlf());
	} else {
		let mut digits = itoa::Buffer::new();
		buf.put_slice(digits.format(length).as_bytes());
		buf.put_slice(CRLF);
	}
}

/// Write `marker`, a signed decimal and CRLF.
#[inline]
pub fn put_signed(buf: &mut BytesMut, marker: u8, value: i64) {
	buf.put_u8(marker);
	put_decimal(buf, value);
	buf.put_slice(CRLF);
}

/// Write the decimal digits of `value`, with a leading `-` when negative.
#[inline]
pub fn put_decimal(buf: &mut BytesMut, value: i64) {
	if (0..SMALL_INT_COUNT as i64).contains(&value) {
		buf.put_slice(SMALL_INTS[value as usize].digits());
	} else {
		let mut digits = itoa::Buffer::new();
		buf.put_slice(digits.format(value).as_bytes());
	}
}

/// How a status or error line was terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineEnd {
	Crlf,
	/// A `\n` with no preceding `\r`
	BareLf,
	/// A `\r` followed by something other than `\n`; that byte is not part
	/// of the line and is left for the next read
	BareCr,
}

/// Find a status/error line in `buf`.
///
/// Returns the line (without terminator), the number of bytes consumed and
/// how the line ended, or `None` if more input is needed.
#[inline]
pub fn peek_status_line(buf: &[u8]) -> Option<(&[u8], usize, LineEnd)> {
	let pos = memchr2(b'\r', b'\n', buf)?;
	if buf[pos] == b'\n' {
		return Some((&buf[..pos], pos + 1, LineEnd::BareLf));
	}
	match buf.get(pos + 1) {
		None => None,
		Some(b'\n') => Some((&buf[..pos], pos + 2, LineEnd::Crlf)),
		Some(_) => Some((&buf[..pos], pos + 1, LineEnd::BareCr)),
	}
}

/// Find a CRLF terminated line in `buf`.
///
/// Integer and length lines must end in exactly CRLF; a bare `\r` or `\n`
/// is a framing error.
#[inline]
pub fn peek_line(buf: &[u8]) -> Result<Option<(&[u8], usize)>, ParseError> {
	let Some(pos) = memchr2(b'\r', b'\n', buf) else {
		return Ok(None);
	};
	if buf[pos] == b'\n' {
		return Err(ParseError::InvalidFormat(
			"Line terminated by LF without CR".to_string(),
		));
	}
	match buf.get(pos + 1) {
		None => Ok(None),
		Some(b'\n') => Ok(Some((&buf[..pos], pos + 2))),
		Some(&other) => Err(ParseError::InvalidFormat(format!(
			"Expected LF after CR, found 0x{:02X}",
			other
		))),
	}
}

/// Parse an optionally negative decimal integer.
///
/// Only ASCII digits are accepted after the sign; the value must fit in
/// an `i64`.
#[inline]
pub fn parse_integer(buf: &[u8]) -> Result<i64, ParseError> {
	let invalid = || ParseError::InvalidInteger(String::from_utf8_lossy(buf).into_owned());

	let (negative, digits) = match buf {
		[b'-', rest @ ..] => (true, rest),
		_ => (false, buf),
	};
	if digits.is_empty() {
		return Err(invalid());
	}

	let mut value: i64 = 0;
	for &b in digits {
		if !b.is_ascii_digit() {
			return Err(invalid());
		}
		let digit = (b - b'0') as i64;
		value = value
			.checked_mul(10)
			.and_then(|v| {
				if negative {
					v.checked_sub(digit)
				} else {
					v.checked_add(digit)
				}
			})
			.ok_or_else(invalid)?;
	}
	Ok(value)
}

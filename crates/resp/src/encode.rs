use bytes::BufMut;
use bytes::Bytes;
use bytes::BytesMut;

use crate::Reply;
use crate::utils::ARRAY;
use crate::utils::BULK_STRING;
use crate::utils::CRLF;
use crate::utils::ERROR;
use crate::utils::INTEGER;
use crate::utils::STATUS;
use crate::utils::put_length;
use crate::utils::put_signed;

const NULL_BULK: &[u8] = b"$-1\r\n";
const NULL_ARRAY: &[u8] = b"*-1\r\n";

/// Trait for writing values in their RESP reply form.
pub trait RespEncoder {
	fn encode_to(&self, buf: &mut BytesMut);

	fn encode(&self) -> Bytes {
		let mut buf = BytesMut::new();
		self.encode_to(&mut buf);
		buf.freeze()
	}
}

impl RespEncoder for Reply {
	fn encode_to(&self, buf: &mut BytesMut) {
		match self {
			Reply::Status(s) => encode_line(buf, STATUS, s),
			Reply::Error(e) => encode_line(buf, ERROR, e),
			Reply::Integer(i) => put_signed(buf, INTEGER, *i),
			Reply::Bulk(Some(b)) => encode_bulk(buf, b),
			Reply::Bulk(None) => buf.put_slice(NULL_BULK),
			Reply::Array(Some(items)) => encode_array(buf, items),
			Reply::Array(None) => buf.put_slice(NULL_ARRAY),
		}
	}
}

#[inline]
fn encode_line(buf: &mut BytesMut, marker: u8, line: &Bytes) {
	buf.put_u8(marker);
	buf.put_slice(line);
	buf.put_slice(CRLF);
}

#[inline]
fn encode_bulk(buf: &mut BytesMut, b: &Bytes) {
	put_length(buf, BULK_STRING, b.len());
	buf.put_slice(b);
	buf.put_slice(CRLF);
}

fn encode_array(buf: &mut BytesMut, items: &[Reply]) {
	put_length(buf, ARRAY, items.len());
	for item in items {
		item.encode_to(buf);
	}
}

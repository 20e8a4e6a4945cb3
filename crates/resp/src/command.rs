//! Command argument vectors and their wire encoding.

use bytes::BufMut;
use bytes::Bytes;
use bytes::BytesMut;

use crate::utils::ARRAY;
use crate::utils::BULK_STRING;
use crate::utils::CRLF;
use crate::utils::SMALL_INT_COUNT;
use crate::utils::SMALL_INTS;
use crate::utils::put_length;

/// One argument of a command.
///
/// Text is carried as its UTF-8 bytes. Every variant is sent as a bulk
/// string; `Null` is sent as an empty one, since commands cannot carry
/// null bulks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Arg {
	Bytes(Bytes),
	Integer(i64),
	Null,
}

impl From<&str> for Arg {
	fn from(s: &str) -> Self {
		Arg::Bytes(Bytes::copy_from_slice(s.as_bytes()))
	}
}

impl From<String> for Arg {
	fn from(s: String) -> Self {
		Arg::Bytes(Bytes::from(s))
	}
}

impl From<&String> for Arg {
	fn from(s: &String) -> Self {
		Arg::from(s.as_str())
	}
}

impl From<&[u8]> for Arg {
	fn from(b: &[u8]) -> Self {
		Arg::Bytes(Bytes::copy_from_slice(b))
	}
}

impl<const N: usize> From<&[u8; N]> for Arg {
	fn from(b: &[u8; N]) -> Self {
		Arg::Bytes(Bytes::copy_from_slice(b))
	}
}

impl From<Vec<u8>> for Arg {
	fn from(v: Vec<u8>) -> Self {
		Arg::Bytes(Bytes::from(v))
	}
}

impl From<Bytes> for Arg {
	fn from(b: Bytes) -> Self {
		Arg::Bytes(b)
	}
}

impl From<&Bytes> for Arg {
	fn from(b: &Bytes) -> Self {
		Arg::Bytes(b.clone())
	}
}

impl From<i64> for Arg {
	fn from(i: i64) -> Self {
		Arg::Integer(i)
	}
}

impl From<i32> for Arg {
	fn from(i: i32) -> Self {
		Arg::Integer(i as i64)
	}
}

impl From<u32> for Arg {
	fn from(i: u32) -> Self {
		Arg::Integer(i as i64)
	}
}

impl From<u64> for Arg {
	fn from(i: u64) -> Self {
		match i64::try_from(i) {
			Ok(i) => Arg::Integer(i),
			Err(_) => Arg::Bytes(Bytes::from(i.to_string())),
		}
	}
}

impl From<usize> for Arg {
	fn from(i: usize) -> Self {
		Arg::from(i as u64)
	}
}

impl<T: Into<Arg>> From<Option<T>> for Arg {
	fn from(o: Option<T>) -> Self {
		match o {
			Some(v) => v.into(),
			None => Arg::Null,
		}
	}
}

/// An ordered argument vector, the first element being the command name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Command {
	args: Vec<Arg>,
}

impl Command {
	pub fn new(name: impl Into<Arg>) -> Self {
		Self {
			args: vec![name.into()],
		}
	}

	pub fn from_args<I, A>(args: I) -> Self
	where
		I: IntoIterator<Item = A>,
		A: Into<Arg>,
	{
		Self {
			args: args.into_iter().map(Into::into).collect(),
		}
	}

	/// Append one argument
	pub fn arg(mut self, arg: impl Into<Arg>) -> Self {
		self.args.push(arg.into());
		self
	}

	/// Append several arguments
	pub fn args<I, A>(mut self, args: I) -> Self
	where
		I: IntoIterator<Item = A>,
		A: Into<Arg>,
	{
		self.args.extend(args.into_iter().map(Into::into));
		self
	}

	pub fn push(&mut self, arg: impl Into<Arg>) {
		self.args.push(arg.into());
	}

	pub fn as_args(&self) -> &[Arg] {
		&self.args
	}

	pub fn len(&self) -> usize {
		self.args.len()
	}

	pub fn is_empty(&self) -> bool {
		self.args.is_empty()
	}

	/// Write this command as a RESP array of bulk strings
	pub fn encode_to(&self, buf: &mut BytesMut) {
		encode_command(&self.args, buf);
	}

	pub fn encode(&self) -> Bytes {
		let mut buf = BytesMut::with_capacity(self.encoded_len());
		self.encode_to(&mut buf);
		buf.freeze()
	}

	/// Exact number of bytes [`Command::encode_to`] writes.
	pub fn encoded_len(&self) -> usize {
		let mut len = 1 + decimal_len(self.args.len() as i64) + 2;
		for arg in &self.args {
			let payload = match arg {
				Arg::Bytes(b) => b.len(),
				Arg::Integer(i) => decimal_len(*i),
				Arg::Null => 0,
			};
			len += 1 + decimal_len(payload as i64) + 2 + payload + 2;
		}
		len
	}
}

impl<A: Into<Arg>> FromIterator<A> for Command {
	fn from_iter<I: IntoIterator<Item = A>>(iter: I) -> Self {
		Command::from_args(iter)
	}
}

/// Build a [`Command`] from a list of arguments of mixed types.
///
/// ```
/// let cmd = resp::cmd!("SET", "key", 42);
/// assert_eq!(&cmd.encode()[..], b"*3\r\n$3\r\nSET\r\n$3\r\nkey\r\n$2\r\n42\r\n");
/// ```
#[macro_export]
macro_rules! cmd {
	($($arg:expr),+ $(,)?) => {{
		let mut command = $crate::Command::default();
		$(command.push($arg);)+
		command
	}};
}

/// Encode `args` as `*<N>\r\n` followed by one `$<len>\r\n<bytes>\r\n` per
/// argument.
pub fn encode_command(args: &[Arg], buf: &mut BytesMut) {
	put_length(buf, ARRAY, args.len());
	for arg in args {
		match arg {
			Arg::Bytes(b) => {
				put_length(buf, BULK_STRING, b.len());
				buf.put_slice(b);
			}
			Arg::Integer(i) => {
				if (0..SMALL_INT_COUNT as i64).contains(i) {
					let digits = SMALL_INTS[*i as usize].digits();
					put_length(buf, BULK_STRING, digits.len());
					buf.put_slice(digits);
				} else {
					let mut digits = itoa::Buffer::new();
					let digits = digits.format(*i).as_bytes();
					put_length(buf, BULK_STRING, digits.len());
					buf.put_slice(digits);
				}
			}
			Arg::Null => put_length(buf, BULK_STRING, 0),
		}
		buf.put_slice(CRLF);
	}
}

fn decimal_len(value: i64) -> usize {
	let mut digits = itoa::Buffer::new();
	digits.format(value).len()
}

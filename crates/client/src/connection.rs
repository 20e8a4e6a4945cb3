use std::io;
use std::io::Read;
use std::io::Write;
use std::net::TcpStream;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use bytes::BytesMut;
use log::debug;
use log::trace;
use log::warn;
use resp::Command;
use resp::ParseError;
use resp::Reply;
use resp::ReplyParseResult;
use resp::ReplyParser;

use crate::ClientError;
use crate::Result;
use crate::transport::Transport;

/// Bytes requested from the stream per read.
const READ_CHUNK: usize = 8 * 1024;

/// Encoded commands are pushed to the stream once this many bytes pile up,
/// even without an explicit flush.
const WRITE_HIGH_WATER: usize = 64 * 1024;

struct ReadHalf {
	stream: Box<dyn Read + Send>,
	/// Undecoded bytes
	buffer: BytesMut,
	/// Landing area for one read, reused across reads
	scratch: Box<[u8]>,
	parser: ReplyParser,
}

impl ReadHalf {
	fn fill(&mut self) -> io::Result<usize> {
		let n = loop {
			match self.stream.read(&mut self.scratch) {
				Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
				other => break other?,
			}
		};
		self.buffer.extend_from_slice(&self.scratch[..n]);
		Ok(n)
	}

	fn next_reply(&mut self) -> Result<Reply> {
		loop {
			match self.parser.parse(&mut self.buffer) {
				ReplyParseResult::Complete(reply) => return Ok(reply),
				ReplyParseResult::Error(e) => return Err(e.into()),
				ReplyParseResult::Incomplete => {
					if self.fill()? == 0 {
						return Err(ParseError::UnexpectedEOF.into());
					}
				}
			}
		}
	}
}

struct WriteHalf {
	stream: Box<dyn Write + Send>,
	buffer: BytesMut,
}

impl WriteHalf {
	fn drain(&mut self) -> io::Result<()> {
		if !self.buffer.is_empty() {
			self.stream.write_all(&self.buffer)?;
			self.buffer.clear();
		}
		Ok(())
	}
}

/// One duplex byte stream to a server.
///
/// Commands are encoded into a write buffer; replies are decoded from a
/// read buffer in arrival order. The two halves are locked independently,
/// so one thread can block on a reply while another keeps writing.
///
/// Any transport or protocol error marks the connection failed. A failed
/// connection rejects every later send and receive with
/// [`ClientError::ConnectionFailed`] without touching the stream.
pub struct Connection {
	reader: Mutex<ReadHalf>,
	writer: Mutex<WriteHalf>,
	transport: Box<dyn Transport>,
	pending: AtomicUsize,
	failed: AtomicBool,
	closed: AtomicBool,
}

impl Connection {
	pub fn new(
		reader: impl Read + Send + 'static,
		writer: impl Write + Send + 'static,
		transport: impl Transport + 'static,
	) -> Self {
		Self {
			reader: Mutex::new(ReadHalf {
				stream: Box::new(reader),
				buffer: BytesMut::with_capacity(READ_CHUNK),
				scratch: vec![0; READ_CHUNK].into_boxed_slice(),
				parser: ReplyParser::new(),
			}),
			writer: Mutex::new(WriteHalf {
				stream: Box::new(writer),
				buffer: BytesMut::with_capacity(READ_CHUNK),
			}),
			transport: Box::new(transport),
			pending: AtomicUsize::new(0),
			failed: AtomicBool::new(false),
			closed: AtomicBool::new(false),
		}
	}

	/// Wrap a connected TCP stream.
	pub fn from_tcp(stream: TcpStream) -> io::Result<Self> {
		let reader = stream.try_clone()?;
		let writer = stream.try_clone()?;
		Ok(Self::new(reader, writer, stream))
	}

	/// Encode `command` into the write buffer.
	///
	/// The bytes reach the stream on the next [`flush`](Self::flush), on the
	/// next receive, or once the buffer grows past its high-water mark.
	pub fn send(&self, command: &Command) -> Result<()> {
		self.ensure_usable()?;
		let mut writer = lock(&self.writer);
		command.encode_to(&mut writer.buffer);
		self.pending.fetch_add(1, Ordering::AcqRel);
		trace!(
			"Queued {} byte(s) for write, {} pending",
			writer.buffer.len(),
			self.pending_count()
		);
		if writer.buffer.len() >= WRITE_HIGH_WATER {
			writer.drain().map_err(|e| self.fail(e.into()))?;
		}
		Ok(())
	}

	/// Push all buffered commands to the stream.
	pub fn flush(&self) -> Result<()> {
		self.ensure_usable()?;
		let mut writer = lock(&self.writer);
		writer
			.drain()
			.and_then(|_| writer.stream.flush())
			.map_err(|e| self.fail(e.into()))
	}

	/// Read exactly one reply, flushing outstanding commands first.
	///
	/// Blocks until a complete reply has arrived.
	pub fn receive(&self) -> Result<Reply> {
		self.flush()?;
		let mut reader = lock(&self.reader);
		// Another reader may have failed the stream while this one waited.
		self.ensure_usable()?;
		let reply = reader.next_reply().map_err(|e| self.fail(e))?;
		let _ = self
			.pending
			.fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));
		Ok(reply)
	}

	/// Commands written whose replies have not been read yet.
	pub fn pending_count(&self) -> usize {
		self.pending.load(Ordering::Acquire)
	}

	pub fn is_failed(&self) -> bool {
		self.failed.load(Ordering::Acquire)
	}

	/// Whether the connection can still carry commands.
	pub fn is_connected(&self) -> bool {
		!self.closed.load(Ordering::Acquire) && !self.is_failed() && self.transport.is_open()
	}

	/// Shut the transport down. Closing twice is a no-op.
	pub fn close(&self) -> Result<()> {
		if self.closed.swap(true, Ordering::AcqRel) {
			return Ok(());
		}
		debug!("Closing connection, {} repl(ies) unread", self.pending_count());
		self.transport.close()?;
		Ok(())
	}

	/// Mark the connection failed and hand `err` back for propagation.
	pub(crate) fn fail(&self, err: ClientError) -> ClientError {
		if !self.failed.swap(true, Ordering::AcqRel) {
			warn!("Connection failed: {}", err);
		}
		err
	}

	fn ensure_usable(&self) -> Result<()> {
		if self.is_failed() || self.closed.load(Ordering::Acquire) {
			return Err(ClientError::ConnectionFailed);
		}
		Ok(())
	}
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
	mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

//! Transport setup: the control half of a duplex stream and TCP connect.

use std::io;
use std::net::Shutdown;
use std::net::TcpStream;
use std::net::ToSocketAddrs;
use std::time::Duration;

use log::debug;
use socket2::SockRef;

/// Default connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Lifecycle control of the stream behind a [`crate::Connection`].
///
/// The read and write halves are handed to the connection separately; this
/// is the handle used to shut the stream down and to probe it.
pub trait Transport: Send + Sync {
	/// Shut the stream down. Closing an already closed stream succeeds.
	fn close(&self) -> io::Result<()>;

	/// Whether the stream still looks usable.
	fn is_open(&self) -> bool;
}

impl Transport for TcpStream {
	fn close(&self) -> io::Result<()> {
		match self.shutdown(Shutdown::Both) {
			Err(e) if e.kind() == io::ErrorKind::NotConnected => Ok(()),
			other => other,
		}
	}

	fn is_open(&self) -> bool {
		self.peer_addr().is_ok()
	}
}

/// Socket options applied when connecting.
#[derive(Debug, Clone)]
pub struct ConnectOptions {
	pub connect_timeout: Duration,
	/// Enable TCP keep-alive probes
	pub keepalive: bool,
	/// Disable Nagle's algorithm
	pub nodelay: bool,
	/// Reset the connection on close instead of lingering
	pub linger_zero: bool,
}

impl Default for ConnectOptions {
	fn default() -> Self {
		Self {
			connect_timeout: DEFAULT_CONNECT_TIMEOUT,
			keepalive: true,
			nodelay: true,
			linger_zero: true,
		}
	}
}

/// Resolve `host:port` and connect to the first address that answers
/// within the timeout.
pub fn connect(host: &str, port: u16, options: &ConnectOptions) -> io::Result<TcpStream> {
	let mut last_err = None;
	for addr in (host, port).to_socket_addrs()? {
		match TcpStream::connect_timeout(&addr, options.connect_timeout) {
			Ok(stream) => {
				configure(&stream, options)?;
				debug!("Connected to {}", addr);
				return Ok(stream);
			}
			Err(e) => {
				debug!("Connect to {} failed: {}", addr, e);
				last_err = Some(e);
			}
		}
	}
	Err(last_err.unwrap_or_else(|| {
		io::Error::new(
			io::ErrorKind::InvalidInput,
			format!("No addresses resolved for {}:{}", host, port),
		)
	}))
}

fn configure(stream: &TcpStream, options: &ConnectOptions) -> io::Result<()> {
	stream.set_nodelay(options.nodelay)?;
	let socket = SockRef::from(stream);
	socket.set_keepalive(options.keepalive)?;
	if options.linger_zero {
		socket.set_linger(Some(Duration::ZERO))?;
	}
	Ok(())
}

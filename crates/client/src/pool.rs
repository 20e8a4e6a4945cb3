use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::MutexGuard;

use log::debug;
use log::info;
use resp::Reply;

use crate::Client;
use crate::Result;
use crate::transport::ConnectOptions;

/// Default number of idle clients kept by a [`Pool`].
pub const DEFAULT_POOL_CAPACITY: usize = 100;

#[derive(Debug, Clone)]
pub struct PoolConfig {
	pub host: String,
	pub port: u16,
	/// Idle clients kept at most; extra released clients are closed
	pub capacity: usize,
	/// Validate idle clients with a PING before handing them out
	pub test_on_borrow: bool,
	pub connect: ConnectOptions,
}

impl PoolConfig {
	pub fn new(host: impl Into<String>, port: u16) -> Self {
		Self {
			host: host.into(),
			port,
			capacity: DEFAULT_POOL_CAPACITY,
			test_on_borrow: false,
			connect: ConnectOptions::default(),
		}
	}
}

/// Bounded set of idle clients to one server.
///
/// `borrow` hands out an idle client when a valid one is available and
/// connects a new one otherwise.
pub struct Pool {
	config: PoolConfig,
	idle: Mutex<VecDeque<Client>>,
}

impl Pool {
	pub fn new(config: PoolConfig) -> Self {
		info!(
			"Pool for {}:{} created (capacity {}, test_on_borrow {})",
			config.host, config.port, config.capacity, config.test_on_borrow
		);
		Self {
			config,
			idle: Mutex::new(VecDeque::new()),
		}
	}

	fn lock_idle(&self) -> MutexGuard<'_, VecDeque<Client>> {
		self.idle.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
	}

	pub fn borrow(&self) -> Result<Client> {
		loop {
			let candidate = self.lock_idle().pop_front();
			let Some(client) = candidate else {
				break;
			};
			if self.is_valid(&client) {
				return Ok(client);
			}
			discard(client, "idle client failed validation");
		}
		Client::connect(&self.config.host, self.config.port, &self.config.connect)
	}

	/// Return a client. Broken clients, and clients beyond capacity, are
	/// closed instead of kept.
	pub fn release(&self, client: Client) {
		if !self.is_valid(&client) {
			discard(client, "released client failed validation");
			return;
		}

		let mut idle = self.lock_idle();
		if idle.len() >= self.config.capacity {
			drop(idle);
			discard(client, "pool is full");
			return;
		}
		idle.push_back(client);
	}

	/// Close every idle client. Returns the first close error, after
	/// closing all of them.
	pub fn flush(&self) -> Result<()> {
		let drained: Vec<Client> = self.lock_idle().drain(..).collect();
		debug!("Flushing {} idle client(s)", drained.len());
		let mut first_err = None;
		for client in drained {
			if let Err(e) = client.close() {
				first_err.get_or_insert(e);
			}
		}
		first_err.map_or(Ok(()), Err)
	}

	/// Number of idle clients.
	pub fn size(&self) -> usize {
		self.lock_idle().len()
	}

	fn is_valid(&self, client: &Client) -> bool {
		if !client.is_connected() {
			return false;
		}
		if !self.config.test_on_borrow {
			return true;
		}
		matches!(client.ping().and_then(|h| h.get()), Ok(reply) if reply == Reply::pong())
	}
}

/// Close a client the pool will not keep.
fn discard(client: Client, reason: &str) {
	debug!("Closing client: {}", reason);
	if let Err(e) = client.close() {
		debug!("Failed to close discarded client: {}", e);
	}
}

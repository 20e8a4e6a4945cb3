use std::collections::HashMap;
use std::collections::VecDeque;
use std::net::TcpStream;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use bytes::Bytes;
use log::debug;
use log::error;
use log::trace;
use log::warn;
use resp::Arg;
use resp::Command;
use resp::Reply;
use resp::cmd;

use crate::ClientError;
use crate::Connection;
use crate::ReplyHandle;
use crate::Result;
use crate::pending::PendingReply;
use crate::pending::ReplyState;
use crate::transport;
use crate::transport::ConnectOptions;

/// Once more than this many replies are unread, the next send first drains
/// the pipeline.
pub const PIPELINE_HIGH_WATER_MARK: usize = 128;

struct ClientState {
	/// Newest node of the pending chain
	tail: Option<Arc<PendingReply>>,
	/// Nodes of raw sends not yet claimed by `await_next`, oldest first
	unclaimed: VecDeque<Arc<PendingReply>>,
	/// Script source to server-side SHA1 digest
	scripts: HashMap<String, Bytes>,
}

/// Pipelining client over one connection.
///
/// Commands are written without waiting for their replies; each
/// [`enqueue`](Client::enqueue) returns a [`ReplyHandle`] that reads its
/// reply on demand. Replies are always matched to commands in send order,
/// whichever handle is waited on first.
///
/// All operations are serialized on one internal lock, so a `Client` can be
/// shared between threads.
pub struct Client {
	conn: Arc<Connection>,
	state: Mutex<ClientState>,
}

impl Client {
	pub fn new(conn: Connection) -> Self {
		Self {
			conn: Arc::new(conn),
			state: Mutex::new(ClientState {
				tail: None,
				unclaimed: VecDeque::new(),
				scripts: HashMap::new(),
			}),
		}
	}

	/// Wrap a connected TCP stream.
	pub fn from_tcp(stream: TcpStream) -> Result<Self> {
		Ok(Self::new(Connection::from_tcp(stream)?))
	}

	/// Open a TCP connection to `host:port`.
	pub fn connect(host: &str, port: u16, options: &ConnectOptions) -> Result<Self> {
		let stream = transport::connect(host, port, options)?;
		Self::from_tcp(stream)
	}

	fn lock_state(&self) -> MutexGuard<'_, ClientState> {
		self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
	}

	/// Write a command without handing back its reply.
	///
	/// The reply still takes its place in the chain; claim it later with
	/// [`await_next`](Client::await_next). Replies drained before they are
	/// claimed are kept until then.
	pub fn send(&self, command: &Command) -> Result<()> {
		let mut state = self.lock_state();
		self.send_locked(&state, command)?;
		let node = self.push_tail(&mut state);
		state.unclaimed.push_back(node);
		Ok(())
	}

	/// Write a command and return a handle to its reply.
	pub fn enqueue(&self, command: &Command) -> Result<ReplyHandle> {
		let mut state = self.lock_state();
		self.enqueue_locked(&mut state, command)
	}

	/// Same as [`enqueue`](Client::enqueue).
	pub fn pipeline(&self, command: &Command) -> Result<ReplyHandle> {
		self.enqueue(command)
	}

	/// Claim the reply of the oldest command written with
	/// [`send`](Client::send) that has not been claimed yet.
	///
	/// Without such a command, the handle takes the next reply slot after
	/// everything sent so far.
	pub fn await_next(&self) -> ReplyHandle {
		let mut state = self.lock_state();
		let node = match state.unclaimed.pop_front() {
			Some(node) => node,
			None => self.push_tail(&mut state),
		};
		ReplyHandle::new(node)
	}

	pub fn ping(&self) -> Result<ReplyHandle> {
		self.enqueue(&cmd!("PING"))
	}

	fn send_locked(&self, state: &ClientState, command: &Command) -> Result<()> {
		let pending = self.conn.pending_count();
		if pending > PIPELINE_HIGH_WATER_MARK {
			if let Some(tail) = &state.tail {
				trace!("{} replies unread, draining pipeline", pending);
				tail.realize()?;
			}
		}
		self.conn.send(command)
	}

	fn enqueue_locked(&self, state: &mut ClientState, command: &Command) -> Result<ReplyHandle> {
		self.send_locked(state, command)?;
		Ok(ReplyHandle::new(self.push_tail(state)))
	}

	fn push_tail(&self, state: &mut ClientState) -> Arc<PendingReply> {
		// A tail already holding its final value has nothing left to order
		// against.
		let prev = state
			.tail
			.take()
			.filter(|tail| tail.state() != ReplyState::Final);
		let node = PendingReply::new(self.conn.clone(), prev);
		state.tail = Some(node.clone());
		node
	}

	/// Run `script` by digest, loading it into the server's script cache
	/// the first time this client sees it.
	///
	/// The load is waited on before returning, so the pipeline is drained
	/// on a cache miss. If the server rejects the script, its error reply
	/// comes back in an already realized handle and nothing is cached.
	pub fn eval_script<K, A>(
		&self,
		script: &str,
		keys: impl IntoIterator<Item = K>,
		args: impl IntoIterator<Item = A>,
	) -> Result<ReplyHandle>
	where
		K: Into<Arg>,
		A: Into<Arg>,
	{
		let mut state = self.lock_state();
		let digest = match state.scripts.get(script) {
			Some(digest) => digest.clone(),
			None => {
				debug!("Loading script of {} byte(s)", script.len());
				let load = self.enqueue_locked(&mut state, &cmd!("SCRIPT", "LOAD", script))?;
				match load.get()? {
					Reply::Bulk(Some(digest)) => {
						state.scripts.insert(script.to_string(), digest.clone());
						digest
					}
					reply @ Reply::Error(_) => {
						warn!("Script load rejected: {}", reply.to_string_lossy().unwrap_or_default());
						return Ok(ReplyHandle::new(PendingReply::ready(self.conn.clone(), reply)));
					}
					other => {
						return Err(ClientError::UnexpectedReply(format!(
							"SCRIPT LOAD returned {:?}",
							other
						)));
					}
				}
			}
		};

		let keys: Vec<Arg> = keys.into_iter().map(Into::into).collect();
		let command = Command::new("EVALSHA")
			.arg(digest)
			.arg(keys.len())
			.args(keys)
			.args(args);
		self.enqueue_locked(&mut state, &command)
	}

	/// Send `EXEC` and hand every queued command's handle its real result.
	///
	/// Commands enqueued after `MULTI` are acknowledged with `QUEUED`; once
	/// the transaction commits, those handles hold the entries of the
	/// `EXEC` array instead. The raw `EXEC` reply is returned as well.
	///
	/// An aborted transaction (error or null reply) leaves the handles at
	/// `QUEUED`. If the results cannot be matched one-to-one with the
	/// queued handles, the connection is failed with
	/// [`ClientError::Consistency`].
	pub fn execute_transaction_and_resolve(&self) -> Result<Reply> {
		let mut state = self.lock_state();
		let last_queued = state.tail.clone();
		let exec = self.enqueue_locked(&mut state, &cmd!("EXEC"))?;
		let reply = exec.get()?;

		match &reply {
			Reply::Array(Some(results)) => {
				debug!("Transaction committed {} command(s)", results.len());
				self.reconcile(last_queued, results)?;
			}
			Reply::Error(_) | Reply::Array(None) => {
				warn!("Transaction aborted: {:?}", reply);
				release_placeholders(last_queued);
			}
			other => {
				return Err(ClientError::UnexpectedReply(format!(
					"EXEC returned {:?}",
					other
				)));
			}
		}
		Ok(reply)
	}

	/// Walk back from the last queued node, overwriting one placeholder per
	/// result, newest result first.
	fn reconcile(&self, last_queued: Option<Arc<PendingReply>>, results: &[Reply]) -> Result<()> {
		let mut cursor = last_queued;
		for (index, result) in results.iter().enumerate().rev() {
			let Some(node) = cursor else {
				return Err(self.consistency_fault(format!(
					"EXEC returned {} result(s) but only {} command(s) were queued",
					results.len(),
					results.len() - index - 1
				)));
			};
			cursor = node
				.resolve(result.clone())
				.map_err(|reason| self.consistency_fault(format!("result {}: {}", index, reason)))?;
		}

		if let Some(node) = cursor {
			if node.state() == ReplyState::Placeholder {
				return Err(self.consistency_fault(format!(
					"more commands were queued than the {} result(s) EXEC returned",
					results.len()
				)));
			}
		}
		Ok(())
	}

	fn consistency_fault(&self, reason: String) -> ClientError {
		error!("Transaction results out of step with queued commands: {}", reason);
		self.conn.fail(ClientError::Consistency(reason))
	}

	/// Shut the connection down.
	pub fn close(&self) -> Result<()> {
		self.conn.close()
	}

	pub fn is_connected(&self) -> bool {
		self.conn.is_connected()
	}

	/// Commands written whose replies have not been read yet.
	pub fn pending_count(&self) -> usize {
		self.conn.pending_count()
	}
}

/// Drop the links between the placeholders of an aborted transaction so
/// they do not take part in a later one.
fn release_placeholders(last_queued: Option<Arc<PendingReply>>) {
	let mut cursor = last_queued;
	while let Some(node) = cursor {
		if node.state() != ReplyState::Placeholder {
			break;
		}
		cursor = node.detach();
	}
}

use std::fmt;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use resp::Reply;

use crate::Connection;
use crate::Result;

/// Where a node stands in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ReplyState {
	/// Not read from the connection yet
	Pending,
	/// Read, and the value is the `QUEUED` acknowledgement of a command
	/// inside a transaction
	Placeholder,
	/// Read, and the value is final
	Final,
}

struct Slot {
	/// The reply expected right before this one. Kept until this node is
	/// realized and then dropped, unless the predecessor is a transaction
	/// placeholder.
	prev: Option<Arc<PendingReply>>,
	value: Option<Reply>,
}

/// One expected reply in the pipeline.
///
/// Nodes form a singly linked chain from newest to oldest. A node may only
/// read from the connection after every older node has read its reply, which
/// keeps reply `k` matched with command `k`.
pub(crate) struct PendingReply {
	conn: Arc<Connection>,
	slot: Mutex<Slot>,
}

impl PendingReply {
	pub(crate) fn new(conn: Arc<Connection>, prev: Option<Arc<PendingReply>>) -> Arc<Self> {
		Arc::new(Self {
			conn,
			slot: Mutex::new(Slot { prev, value: None }),
		})
	}

	/// A node that already holds its value and never reads.
	pub(crate) fn ready(conn: Arc<Connection>, value: Reply) -> Arc<Self> {
		Arc::new(Self {
			conn,
			slot: Mutex::new(Slot {
				prev: None,
				value: Some(value),
			}),
		})
	}

	fn lock(&self) -> MutexGuard<'_, Slot> {
		self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
	}

	pub(crate) fn state(&self) -> ReplyState {
		match &self.lock().value {
			None => ReplyState::Pending,
			Some(value) if value.is_queued() => ReplyState::Placeholder,
			Some(_) => ReplyState::Final,
		}
	}

	pub(crate) fn peek(&self) -> Option<Reply> {
		self.lock().value.clone()
	}

	/// Return the reply, reading it (and every older unread reply) from the
	/// connection first if needed.
	///
	/// Older nodes are realized oldest first, so a long backlog costs no
	/// stack depth. Only one node lock is held while reading, plus the lock
	/// of its direct predecessor for the moment it takes to check it.
	pub(crate) fn realize(&self) -> Result<Reply> {
		if let Some(value) = self.peek() {
			return Ok(value);
		}

		let mut backlog = Vec::new();
		let mut cursor = self.lock().prev.clone();
		while let Some(node) = cursor {
			let slot = node.lock();
			if slot.value.is_some() {
				break;
			}
			let next = slot.prev.clone();
			drop(slot);
			backlog.push(node);
			cursor = next;
		}

		for node in backlog.iter().rev() {
			node.realize_next()?;
		}
		self.realize_next()
	}

	/// Read this node's reply, assuming older nodes are done or about to be.
	fn realize_next(&self) -> Result<Reply> {
		let mut slot = self.lock();
		if let Some(value) = &slot.value {
			return Ok(value.clone());
		}

		if let Some(prev) = &slot.prev {
			let mut state = prev.state();
			if state == ReplyState::Pending {
				prev.realize()?;
				state = prev.state();
			}
			if state == ReplyState::Final {
				slot.prev = None;
			}
		}

		let reply = self.conn.receive()?;
		slot.value = Some(reply.clone());
		Ok(reply)
	}

	/// Replace a `QUEUED` placeholder with the real result of its command
	/// and detach from the predecessor, which is returned.
	///
	/// Fails without touching the node if it holds anything else.
	pub(crate) fn resolve(
		&self,
		result: Reply,
	) -> std::result::Result<Option<Arc<PendingReply>>, String> {
		let mut slot = self.lock();
		match &slot.value {
			Some(value) if value.is_queued() => {}
			Some(value) => return Err(format!("expected a QUEUED placeholder, found {:?}", value)),
			None => return Err("queued command was never acknowledged".to_string()),
		}
		slot.value = Some(result);
		Ok(slot.prev.take())
	}

	/// Detach from the predecessor, returning it.
	pub(crate) fn detach(&self) -> Option<Arc<PendingReply>> {
		self.lock().prev.take()
	}
}

// Unlink iteratively so dropping a long unread chain does not recurse once
// per node.
impl Drop for PendingReply {
	fn drop(&mut self) {
		let mut next = take_prev(&mut self.slot);
		while let Some(node) = next {
			next = match Arc::try_unwrap(node) {
				Ok(mut node) => take_prev(&mut node.slot),
				Err(_) => None,
			};
		}
	}
}

fn take_prev(slot: &mut Mutex<Slot>) -> Option<Arc<PendingReply>> {
	match slot.get_mut() {
		Ok(slot) => slot.prev.take(),
		Err(poisoned) => poisoned.into_inner().prev.take(),
	}
}

/// Handle to a reply that may not have been read yet.
///
/// Cloning is cheap; every clone observes the same value. [`get`] blocks
/// until the reply is available and returns the same value every time.
///
/// [`get`]: ReplyHandle::get
#[derive(Clone)]
pub struct ReplyHandle {
	node: Arc<PendingReply>,
}

impl ReplyHandle {
	pub(crate) fn new(node: Arc<PendingReply>) -> Self {
		Self { node }
	}

	/// Wait for the reply.
	///
	/// Reads every older unread reply first. Server errors come back as
	/// [`Reply::Error`] values; `Err` means the connection itself broke.
	pub fn get(&self) -> Result<Reply> {
		self.node.realize()
	}

	/// The reply if it has been read already.
	pub fn try_get(&self) -> Option<Reply> {
		self.node.peek()
	}

	pub fn is_realized(&self) -> bool {
		self.node.state() != ReplyState::Pending
	}
}

impl fmt::Debug for ReplyHandle {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ReplyHandle")
			.field("value", &self.try_get())
			.finish()
	}
}

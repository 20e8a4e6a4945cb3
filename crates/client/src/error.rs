use std::io;

use resp::ParseError;
use thiserror::Error;

/// Errors raised while talking to a server.
///
/// Server-side errors (`-ERR ...` replies) are not in here: they are
/// ordinary [`resp::Reply::Error`] values handed back to the caller.
#[derive(Error, Debug)]
pub enum ClientError {
	/// Reading from or writing to the transport failed. The connection is
	/// now failed.
	#[error("Transport error: {0}")]
	Transport(#[from] io::Error),

	/// The server sent bytes that are not a valid reply. The connection is
	/// now failed.
	#[error("Protocol error: {0}")]
	Protocol(#[from] ParseError),

	/// Transaction results do not line up with the queued commands. The
	/// connection is now failed.
	#[error("Consistency fault: {0}")]
	Consistency(String),

	/// The connection already failed earlier; nothing more is read from or
	/// written to it.
	#[error("Connection has failed and can no longer be used")]
	ConnectionFailed,

	/// The server answered a client-issued command with a reply of the
	/// wrong shape.
	#[error("Unexpected reply: {0}")]
	UnexpectedReply(String),
}

pub type Result<T> = std::result::Result<T, ClientError>;

//! # RESP - Redis Serialization Protocol codec
//!
//! The client half of RESP2: commands are written as arrays of bulk
//! strings, replies are read back as one of the five RESP2 reply shapes.
//!
//! ## Features
//!
//! - **Streaming decode**: [`ReplyParser`] resumes across partial reads and
//!   keeps nested arrays on an explicit stack
//! - **Zero-copy payloads**: bulk strings and status lines are split out of
//!   the receive buffer as `Bytes`
//! - **Cheap encoding**: lengths below 256 come from a precomputed table,
//!   everything else is formatted on the stack
//!
//! ## Example
//!
//! ```rust
//! use bytes::BytesMut;
//! use resp::Reply;
//!
//! let cmd = resp::cmd!("SET", "k", "v");
//! assert_eq!(&cmd.encode()[..], b"*3\r\n$3\r\nSET\r\n$1\r\nk\r\n$1\r\nv\r\n");
//!
//! let mut buf = BytesMut::from(&b"+OK\r\n"[..]);
//! let reply = resp::parse(&mut buf).unwrap();
//! assert_eq!(reply, Reply::ok());
//! ```

mod command;
mod encode;
mod error;
mod parser;
mod types;
mod utils;

pub use command::Arg;
pub use command::Command;
pub use command::encode_command;
pub use encode::RespEncoder;
pub use error::ParseError;
pub use parser::MAX_BULK_LEN;
pub use parser::ReplyParseResult;
pub use parser::ReplyParser;
pub use parser::parse;
pub use types::Reply;

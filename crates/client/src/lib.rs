//! Pipelining RESP2 client.
//!
//! A [`Client`] writes commands without waiting for replies and hands back a
//! [`ReplyHandle`] per command. Waiting on any handle reads every older
//! reply first, so replies always pair with commands in send order.
//! Transactions are reconciled so that handles of commands queued inside
//! `MULTI` end up holding their real results after `EXEC`.
//!
//! ```no_run
//! use client::Client;
//! use client::ConnectOptions;
//! use resp::cmd;
//!
//! let client = Client::connect("127.0.0.1", 6379, &ConnectOptions::default())?;
//! client.enqueue(&cmd!("MULTI"))?;
//! let incr = client.enqueue(&cmd!("INCR", "visits"))?;
//! client.execute_transaction_and_resolve()?;
//! println!("{:?}", incr.get()?);
//! # Ok::<(), client::ClientError>(())
//! ```

mod client;
mod connection;
mod error;
mod pending;
mod pool;
pub mod transport;

pub use client::Client;
pub use client::PIPELINE_HIGH_WATER_MARK;
pub use connection::Connection;
pub use error::ClientError;
pub use error::Result;
pub use pending::ReplyHandle;
pub use pool::DEFAULT_POOL_CAPACITY;
pub use pool::Pool;
pub use pool::PoolConfig;
pub use transport::ConnectOptions;
pub use transport::Transport;

//! A small in-process RESP server for integration tests.
//!
//! It understands just enough commands to exercise pipelining, transactions
//! and script caching: PING, ECHO, SET, GET, INCR, DEL, MULTI, EXEC,
//! DISCARD, SCRIPT LOAD and EVALSHA. Scripts are never run; EVALSHA answers
//! with its keys followed by its args.

#![allow(dead_code)]

use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::Hash;
use std::hash::Hasher;
use std::io::Read;
use std::io::Write;
use std::net::Shutdown;
use std::net::TcpListener;
use std::net::TcpStream;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::thread;

use bytes::Bytes;
use bytes::BytesMut;
use client::Client;
use client::ConnectOptions;
use resp::Reply;
use resp::ReplyParseResult;
use resp::ReplyParser;
use resp::RespEncoder;

#[derive(Default)]
struct Shared {
	data: Mutex<HashMap<Bytes, Bytes>>,
	scripts: Mutex<HashMap<String, Bytes>>,
	script_loads: AtomicUsize,
	commands: AtomicUsize,
	connections: AtomicUsize,
}

pub struct FakeServer {
	port: u16,
	shared: Arc<Shared>,
}

impl FakeServer {
	pub fn start() -> Self {
		let listener = TcpListener::bind("127.0.0.1:0").unwrap();
		let port = listener.local_addr().unwrap().port();
		let shared = Arc::new(Shared::default());

		let accept_shared = shared.clone();
		thread::spawn(move || {
			for stream in listener.incoming() {
				let Ok(stream) = stream else { break };
				accept_shared.connections.fetch_add(1, Ordering::SeqCst);
				let session_shared = accept_shared.clone();
				thread::spawn(move || Session::new(session_shared).run(stream));
			}
		});

		Self { port, shared }
	}

	pub fn port(&self) -> u16 {
		self.port
	}

	pub fn client(&self) -> Client {
		Client::connect("127.0.0.1", self.port, &ConnectOptions::default()).unwrap()
	}

	/// SCRIPT LOAD commands seen so far
	pub fn script_loads(&self) -> usize {
		self.shared.script_loads.load(Ordering::SeqCst)
	}

	pub fn commands(&self) -> usize {
		self.shared.commands.load(Ordering::SeqCst)
	}

	pub fn connections(&self) -> usize {
		self.shared.connections.load(Ordering::SeqCst)
	}

	/// Forget every loaded script, as SCRIPT FLUSH would.
	pub fn flush_scripts(&self) {
		self.shared.scripts.lock().unwrap().clear();
	}
}

pub fn digest(script: &str) -> String {
	let mut hasher = DefaultHasher::new();
	script.hash(&mut hasher);
	format!("{:040x}", hasher.finish())
}

struct Session {
	shared: Arc<Shared>,
	queued: Option<Vec<Vec<Bytes>>>,
}

impl Session {
	fn new(shared: Arc<Shared>) -> Self {
		Self {
			shared,
			queued: None,
		}
	}

	fn run(mut self, mut stream: TcpStream) {
		let mut parser = ReplyParser::new();
		let mut buffer = BytesMut::new();
		let mut chunk = [0u8; 4096];
		loop {
			let mut out = BytesMut::new();
			loop {
				match parser.parse(&mut buffer) {
					ReplyParseResult::Complete(frame) => {
						let args = frame_args(frame);
						if args.first().is_some_and(|name| name.eq_ignore_ascii_case(b"QUIT")) {
							Reply::ok().encode_to(&mut out);
							let _ = stream.write_all(&out);
							let _ = stream.shutdown(Shutdown::Write);
							// Swallow whatever the client still sends so the
							// close is a clean FIN rather than a reset.
							while matches!(stream.read(&mut chunk), Ok(n) if n > 0) {}
							return;
						}
						self.dispatch(args).encode_to(&mut out);
					}
					ReplyParseResult::Incomplete => break,
					ReplyParseResult::Error(_) => return,
				}
			}
			if !out.is_empty() && stream.write_all(&out).is_err() {
				return;
			}
			match stream.read(&mut chunk) {
				Ok(0) | Err(_) => return,
				Ok(n) => buffer.extend_from_slice(&chunk[..n]),
			}
		}
	}

	fn dispatch(&mut self, args: Vec<Bytes>) -> Reply {
		self.shared.commands.fetch_add(1, Ordering::SeqCst);
		let name = upper(&args[0]);
		match (name.as_str(), self.queued.is_some()) {
			("MULTI", true) => Reply::error("ERR MULTI calls can not be nested"),
			("MULTI", false) => {
				self.queued = Some(Vec::new());
				Reply::ok()
			}
			("EXEC", true) => {
				let queued = self.queued.take().unwrap_or_default();
				Reply::array(queued.into_iter().map(|cmd| self.execute(cmd)))
			}
			("EXEC", false) => Reply::error("ERR EXEC without MULTI"),
			("DISCARD", true) => {
				self.queued = None;
				Reply::ok()
			}
			(_, true) => {
				if let Some(queued) = self.queued.as_mut() {
					queued.push(args);
				}
				Reply::queued()
			}
			(_, false) => self.execute(args),
		}
	}

	fn execute(&mut self, args: Vec<Bytes>) -> Reply {
		let name = upper(&args[0]);
		let arity_error =
			|| Reply::error(format!("ERR wrong number of arguments for '{}'", name.to_lowercase()));
		match name.as_str() {
			"PING" => Reply::pong(),
			"ECHO" => match args.get(1) {
				Some(message) => Reply::bulk(message.clone()),
				None => arity_error(),
			},
			"SET" => match (args.get(1), args.get(2)) {
				(Some(key), Some(value)) => {
					self.shared.data.lock().unwrap().insert(key.clone(), value.clone());
					Reply::ok()
				}
				_ => arity_error(),
			},
			"GET" => match args.get(1) {
				Some(key) => match self.shared.data.lock().unwrap().get(key) {
					Some(value) => Reply::bulk(value.clone()),
					None => Reply::null_bulk(),
				},
				None => arity_error(),
			},
			"DEL" => {
				let mut data = self.shared.data.lock().unwrap();
				let removed = args[1..].iter().filter(|key| data.remove(*key).is_some()).count();
				Reply::integer(removed as i64)
			}
			"INCR" => match args.get(1) {
				Some(key) => {
					let mut data = self.shared.data.lock().unwrap();
					let current = data
						.get(key)
						.map(|v| String::from_utf8_lossy(v).parse::<i64>())
						.unwrap_or(Ok(0));
					match current {
						Ok(n) => {
							data.insert(key.clone(), Bytes::from((n + 1).to_string()));
							Reply::integer(n + 1)
						}
						Err(_) => Reply::error("ERR value is not an integer or out of range"),
					}
				}
				None => arity_error(),
			},
			"SCRIPT" if args.len() == 3 && upper(&args[1]) == "LOAD" => {
				self.shared.script_loads.fetch_add(1, Ordering::SeqCst);
				let source = String::from_utf8_lossy(&args[2]).into_owned();
				if source.contains("syntax error") {
					return Reply::error("ERR Error compiling script");
				}
				let sha = Bytes::from(digest(&source));
				self.shared.scripts.lock().unwrap().insert(source, sha.clone());
				Reply::bulk(sha)
			}
			"EVALSHA" => {
				let known = args.get(1).is_some_and(|sha| {
					self.shared.scripts.lock().unwrap().values().any(|s| s == sha)
				});
				if !known {
					return Reply::error("NOSCRIPT No matching script. Please use EVAL.");
				}
				let numkeys = args
					.get(2)
					.and_then(|n| String::from_utf8_lossy(n).parse::<usize>().ok());
				match numkeys {
					Some(n) if args.len() >= 3 + n => {
						Reply::array(args[3..].iter().cloned().map(Reply::bulk))
					}
					_ => Reply::error("ERR Number of keys can't be greater than number of args"),
				}
			}
			other => Reply::error(format!("ERR unknown command '{}'", other.to_lowercase())),
		}
	}
}

fn upper(name: &Bytes) -> String {
	String::from_utf8_lossy(name).to_uppercase()
}

fn frame_args(frame: Reply) -> Vec<Bytes> {
	frame
		.into_array()
		.unwrap_or_default()
		.into_iter()
		.filter_map(|arg| arg.as_bytes().cloned())
		.collect()
}

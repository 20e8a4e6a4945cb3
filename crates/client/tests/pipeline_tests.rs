mod common;

use std::sync::Arc;
use std::thread;

use client::ClientError;
use client::PIPELINE_HIGH_WATER_MARK;
use common::FakeServer;
use resp::Reply;
use resp::cmd;

#[test]
fn test_ping() {
	let server = FakeServer::start();
	let client = server.client();
	assert_eq!(client.ping().unwrap().get().unwrap(), Reply::pong());
	assert!(client.is_connected());
}

#[test]
fn test_out_of_order_waits_keep_pairing() {
	let server = FakeServer::start();
	let client = server.client();

	let handles: Vec<_> = (0..10)
		.map(|i| client.enqueue(&cmd!("ECHO", format!("msg-{}", i))).unwrap())
		.collect();

	for i in [7, 2, 9, 0, 5, 1, 8, 3, 6, 4] {
		assert_eq!(
			handles[i].get().unwrap(),
			Reply::bulk(format!("msg-{}", i)),
			"handle {} got someone else's reply",
			i
		);
	}
	assert_eq!(client.pending_count(), 0);
}

#[test]
fn test_repeated_get_returns_same_value() {
	let server = FakeServer::start();
	let client = server.client();

	let incr = client.enqueue(&cmd!("INCR", "counter")).unwrap();
	let first = incr.get().unwrap();
	let second = incr.get().unwrap();
	assert_eq!(first, Reply::integer(1));
	assert_eq!(first, second);
	// Nothing was read twice.
	assert_eq!(
		client.enqueue(&cmd!("INCR", "counter")).unwrap().get().unwrap(),
		Reply::integer(2)
	);
}

#[test]
fn test_server_error_does_not_break_pipeline() {
	let server = FakeServer::start();
	let client = server.client();

	let bogus = client.enqueue(&cmd!("NOSUCHCOMMAND")).unwrap();
	let ping = client.ping().unwrap();
	assert!(bogus.get().unwrap().is_error());
	assert_eq!(ping.get().unwrap(), Reply::pong());
	assert!(client.is_connected());
}

#[test]
fn test_large_pipeline_drains_at_high_water_mark() {
	let server = FakeServer::start();
	let client = server.client();

	let total = PIPELINE_HIGH_WATER_MARK * 8;
	let handles: Vec<_> = (0..total)
		.map(|_| {
			let handle = client.enqueue(&cmd!("INCR", "n")).unwrap();
			assert!(client.pending_count() <= PIPELINE_HIGH_WATER_MARK + 1);
			handle
		})
		.collect();

	for (i, handle) in handles.iter().enumerate() {
		assert_eq!(handle.get().unwrap(), Reply::integer(i as i64 + 1));
	}
}

#[test]
fn test_send_and_await_next() {
	let server = FakeServer::start();
	let client = server.client();

	client.send(&cmd!("SET", "k", "v")).unwrap();
	let set = client.await_next();
	let get = client.enqueue(&cmd!("GET", "k")).unwrap();

	assert_eq!(get.get().unwrap(), Reply::bulk("v"));
	assert_eq!(set.try_get(), Some(Reply::ok()));
}

#[test]
fn test_null_argument_and_missing_key() {
	let server = FakeServer::start();
	let client = server.client();

	client.enqueue(&cmd!("SET", "empty", None::<&str>)).unwrap();
	let empty = client.enqueue(&cmd!("GET", "empty")).unwrap();
	let missing = client.enqueue(&cmd!("GET", "missing")).unwrap();

	assert_eq!(missing.get().unwrap(), Reply::null_bulk());
	assert_eq!(empty.get().unwrap(), Reply::bulk(""));
}

#[test]
fn test_shared_between_threads() {
	let server = FakeServer::start();
	let client = Arc::new(server.client());

	let workers: Vec<_> = (0..4)
		.map(|t| {
			let client = client.clone();
			thread::spawn(move || {
				for i in 0..50 {
					let value = format!("{}-{}", t, i);
					let echo = client.enqueue(&cmd!("ECHO", value.as_str())).unwrap();
					assert_eq!(echo.get().unwrap(), Reply::bulk(value));
				}
			})
		})
		.collect();
	for worker in workers {
		worker.join().unwrap();
	}
	assert_eq!(server.commands(), 200);
}

#[test]
fn test_readers_share_handles_while_writer_enqueues() {
	let server = FakeServer::start();
	let client = Arc::new(server.client());

	for round in 0..20 {
		let handles: Arc<Vec<_>> = Arc::new(
			(0..300)
				.map(|i| client.enqueue(&cmd!("ECHO", format!("{}-{}", round, i))).unwrap())
				.collect(),
		);

		let readers: Vec<_> = (0..4)
			.map(|_| {
				let handles = handles.clone();
				thread::spawn(move || {
					for (i, handle) in handles.iter().enumerate().rev() {
						assert_eq!(handle.get().unwrap(), Reply::bulk(format!("{}-{}", round, i)));
					}
				})
			})
			.collect();
		let writer = {
			let client = client.clone();
			thread::spawn(move || {
				(0..50)
					.map(|i| {
						let value = format!("w{}-{}", round, i);
						(client.enqueue(&cmd!("ECHO", value.as_str())).unwrap(), value)
					})
					.collect::<Vec<_>>()
			})
		};

		for reader in readers {
			reader.join().unwrap();
		}
		for (handle, value) in writer.join().unwrap() {
			assert_eq!(handle.get().unwrap(), Reply::bulk(value));
		}
		assert_eq!(client.pending_count(), 0);
	}
}

#[test]
fn test_closed_server_fails_every_handle() {
	let server = FakeServer::start();
	let client = server.client();

	let before = client.ping().unwrap();
	client.send(&cmd!("QUIT")).unwrap();
	let quit = client.await_next();
	let after = client.ping().unwrap();

	assert_eq!(before.get().unwrap(), Reply::pong());
	assert_eq!(quit.get().unwrap(), Reply::ok());
	let err = after.get().unwrap_err();
	assert!(matches!(err, ClientError::Protocol(_) | ClientError::Transport(_)));
	assert!(!client.is_connected());
	assert!(matches!(after.get(), Err(ClientError::ConnectionFailed)));
	assert!(matches!(client.ping(), Err(ClientError::ConnectionFailed)));
}

#[test]
fn test_close() {
	let server = FakeServer::start();
	let client = server.client();
	client.close().unwrap();
	client.close().unwrap();
	assert!(!client.is_connected());
	assert!(matches!(client.ping(), Err(ClientError::ConnectionFailed)));
}

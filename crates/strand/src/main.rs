mod output;
mod runner;

use client::ConnectOptions;
use client::Pool;
use client::PoolConfig;
use config::Cli;
use config::ClientConfig;
use config::Parser;
use log::debug;
use log::error;
use runner::Mode;

fn pool_config(config: &ClientConfig) -> PoolConfig {
	PoolConfig {
		capacity: config.pool_size,
		test_on_borrow: config.test_on_borrow,
		connect: ConnectOptions {
			connect_timeout: config.connect_timeout(),
			..ConnectOptions::default()
		},
		..PoolConfig::new(config.host.clone(), config.port)
	}
}

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
	let args = Cli::parse();
	let config = config::setup(&args)?;

	let pool = Pool::new(pool_config(&config));
	let client = pool.borrow()?;
	debug!("Connected to {}:{}", config.host, config.port);

	let mode = Mode::from_cli(&args);
	let result = runner::run(&client, &mode, &args.words);
	pool.release(client);
	if let Err(e) = pool.flush() {
		error!("Failed to close connection: {}", e);
	}

	for reply in result? {
		println!("{}", output::render(&reply));
	}
	Ok(())
}

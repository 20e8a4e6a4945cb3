use client::Client;
use client::ClientError;
use client::ReplyHandle;
use config::Cli;
use log::debug;
use resp::Command;
use resp::Reply;
use resp::cmd;

/// What the command line asked for.
#[derive(Debug, PartialEq, Eq)]
pub enum Mode {
	/// Pipeline the command `repeat` times
	Plain { repeat: u32 },
	/// Pipeline the command `repeat` times inside MULTI/EXEC
	Transaction { repeat: u32 },
	/// Run a script with the leading `keys` words as keys
	Script { script: String, keys: usize },
}

impl Mode {
	pub fn from_cli(args: &Cli) -> Self {
		match &args.eval {
			Some(script) => Mode::Script {
				script: script.clone(),
				keys: args.keys.unwrap_or(0),
			},
			None if args.multi => Mode::Transaction {
				repeat: args.repeat,
			},
			None => Mode::Plain {
				repeat: args.repeat,
			},
		}
	}
}

/// Execute `words` against `client` and return the replies to print, in
/// command order.
pub fn run(client: &Client, mode: &Mode, words: &[String]) -> Result<Vec<Reply>, ClientError> {
	match mode {
		Mode::Plain { repeat } => {
			let command = Command::from_args(words);
			let handles = (0..*repeat)
				.map(|_| client.enqueue(&command))
				.collect::<Result<Vec<_>, _>>()?;
			collect(&handles)
		}
		Mode::Transaction { repeat } => {
			let command = Command::from_args(words);
			let multi = client.enqueue(&cmd!("MULTI"))?;
			let handles = (0..*repeat)
				.map(|_| client.enqueue(&command))
				.collect::<Result<Vec<_>, _>>()?;
			let commit = client.execute_transaction_and_resolve()?;
			debug!("MULTI answered {:?}", multi.get()?);
			// An aborted transaction leaves the handles at QUEUED; report
			// the commit reply instead.
			if commit.as_array().is_none() {
				return Ok(vec![commit]);
			}
			collect(&handles)
		}
		Mode::Script { script, keys } => {
			let split = (*keys).min(words.len());
			let (keys, args) = words.split_at(split);
			let handle = client.eval_script(script, keys, args)?;
			Ok(vec![handle.get()?])
		}
	}
}

fn collect(handles: &[ReplyHandle]) -> Result<Vec<Reply>, ClientError> {
	handles.iter().map(ReplyHandle::get).collect()
}

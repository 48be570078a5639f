use anyhow::{Context, Result};

use shellish::config::{Args, Config};
use shellish::input::{self, LineSource};
use shellish::{logging, Status};

fn main() -> Result<()> {
	let args: Args = argh::from_env();
	let config = Config::resolve(&args);
	logging::init(&config.log_filter);
	shellish::eval::ignore_interrupts().context("ignoring SIGINT")?;
	tracing::debug!(chat_dir = %config.chat_dir.display(), "starting");

	if let Some(ref line) = args.command {
		shellish::process(&config, line);
		return Ok(());
	}

	let mut source = LineSource::new();
	loop {
		let line = source.read_line(&input::prompt()).context("reading input")?;
		let line = match line {
			Some(line) => line,
			None => break,
		};
		if shellish::process(&config, &line) == Status::Exit {
			break;
		}
	}
	println!();
	Ok(())
}

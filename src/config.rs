use std::env;
use std::path::PathBuf;

use argh::FromArgs;

pub const CHAT_DIR_KEY: &str = "SHELLISH_CHAT_DIR";
pub const LOG_KEY: &str = "SHELLISH_LOG";
const DEFAULT_CHAT_DIR: &str = "/tmp/shellish-chat";
const DEFAULT_LOG_FILTER: &str = "warn";

#[derive(FromArgs, Debug, Default)]
/// Interactive command interpreter with pipelines, redirection and named-pipe chat rooms.
pub struct Args {
	#[argh(option)]
	/// base directory holding one subdirectory per chat room.
	pub chat_dir: Option<PathBuf>,

	#[argh(option)]
	/// log filter directive, e.g. `debug` or `shellish=trace`.
	pub log: Option<String>,

	#[argh(option, short = 'c')]
	/// run a single command line and exit.
	pub command: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
	pub chat_dir: PathBuf,
	pub log_filter: String,
}

impl Config {
	/// Flags take precedence over the environment, which takes precedence
	/// over the built-in defaults.
	pub fn resolve(args: &Args) -> Config {
		let chat_dir = args.chat_dir.clone()
			.or_else(|| env::var_os(CHAT_DIR_KEY).filter(|v| !v.is_empty()).map(PathBuf::from))
			.unwrap_or_else(|| PathBuf::from(DEFAULT_CHAT_DIR));
		let log_filter = args.log.clone()
			.or_else(|| env::var(LOG_KEY).ok().filter(|v| !v.is_empty()))
			.unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());
		Config { chat_dir, log_filter }
	}
}

impl Default for Config {
	fn default() -> Config {
		Config::resolve(&Args::default())
	}
}

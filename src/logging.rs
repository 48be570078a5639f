use std::io::{self, IsTerminal};

use tracing_subscriber::EnvFilter;

/// Installs the global subscriber. Diagnostics go to standard error so they
/// never mix with a pipeline's data on standard output.
pub fn init(directive: &str) {
	let filter = EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new("warn"));
	let _ = tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(io::stderr)
		.with_target(false)
		.with_ansi(io::stderr().is_terminal())
		.try_init();
}

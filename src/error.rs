use std::{ffi, fmt, io};
use std::path::PathBuf;

use crate::parser::ParseError;

pub const SYSNAME: &str = "shellish";

/// Exit status of a stage whose program could not be located.
pub const EXIT_NOT_FOUND: i32 = 127;
/// Exit status of a stage whose program was located but could not be executed.
pub const EXIT_EXEC_FAILED: i32 = 126;
pub const EXIT_USAGE: i32 = 2;
pub const EXIT_FAILURE: i32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum ShellError {
	#[error(transparent)]
	Parse(#[from] ParseError),
	#[error("{0}")]
	Nix(#[from] nix::Error),
	#[error("{0}")]
	Io(#[from] io::Error),
	#[error("{}: {source}", .path.display())]
	Open { path: PathBuf, source: io::Error },
	#[error("{0}: command not found")]
	NotFound(String),
	#[error("{name}: {source}")]
	Exec { name: String, source: nix::Error },
	#[error("nul char in argument: {0}")]
	Nul(#[from] ffi::NulError),
	#[error("{0}")]
	Usage(String),
	#[error("pinfo: {pid}: {source}")]
	NoProcess { pid: i32, source: io::Error },
}

impl ShellError {
	pub fn usage<S: Into<String>>(message: S) -> ShellError {
		ShellError::Usage(message.into())
	}

	/// Status a spawned stage terminates with after this failure.
	pub fn exit_code(&self) -> i32 {
		match *self {
			ShellError::NotFound(..) => EXIT_NOT_FOUND,
			ShellError::Exec { .. } => EXIT_EXEC_FAILED,
			ShellError::Usage(..) => EXIT_USAGE,
			_ => EXIT_FAILURE,
		}
	}
}

/// Prints a user-facing diagnostic on standard error.
pub fn report<E: fmt::Display + ?Sized>(e: &E) {
	use std::io::Write;
	let stderr = io::stderr();
	let mut stderr = stderr.lock();
	let _ = writeln!(stderr, "-{}: {}", SYSNAME, e);
	let _ = stderr.flush();
}

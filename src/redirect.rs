use std::fs;
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::{IntoRawFd, RawFd};
use std::path::Path;

use nix::unistd;

use crate::error::ShellError;
use crate::types::{RedirectType, Redirects};

const CREATE_MODE: u32 = 0o644;

pub fn open_target(path: &Path, typ: RedirectType) -> Result<fs::File, ShellError> {
	let mut oopt = fs::OpenOptions::new();
	let _ = match typ {
		RedirectType::Input => oopt.read(true),
		RedirectType::Output => oopt.write(true).create(true).truncate(true).mode(CREATE_MODE),
		RedirectType::Append => oopt.append(true).create(true).mode(CREATE_MODE),
	};
	oopt.open(path).map_err(|e| ShellError::Open { path: path.to_owned(), source: e })
}

/// Moves `file` onto descriptor `to`, releasing the original descriptor.
fn bind(file: fs::File, to: RawFd) -> Result<(), ShellError> {
	let fd = file.into_raw_fd();
	if fd != to {
		let r = unistd::dup2(fd, to);
		let _ = unistd::close(fd);
		r?;
	}
	Ok(())
}

/// Binds the stage's redirection targets onto standard input and output.
/// Runs in the spawned process after pipe wiring, so an explicit target
/// replaces the pipe on that side.
pub fn apply(redirects: &Redirects) -> Result<(), ShellError> {
	if let Some(ref path) = redirects.input {
		bind(open_target(path, RedirectType::Input)?, libc::STDIN_FILENO)?;
	}
	if let Some((path, typ)) = redirects.stdout_target() {
		bind(open_target(path, typ)?, libc::STDOUT_FILENO)?;
	}
	Ok(())
}

use std::env;
use std::io::{self, IsTerminal, Write};
use std::os::unix::io::RawFd;

use nix::errno::Errno;
use nix::unistd;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use crate::error::SYSNAME;

/// Reads one line straight from `fd`, one byte at a time, so nothing past
/// the newline is taken from a descriptor that children inherit. The
/// terminator is stripped. `None` means end of input.
pub fn read_line_raw(fd: RawFd) -> io::Result<Option<String>> {
	let mut line: Vec<u8> = vec![];
	let mut byte = [0u8; 1];
	loop {
		match unistd::read(fd, &mut byte) {
			Ok(0) => {
				if line.is_empty() {
					return Ok(None);
				}
				break;
			},
			Ok(_) => {
				if byte[0] == b'\n' {
					break;
				}
				line.push(byte[0]);
			},
			Err(Errno::EINTR) => continue,
			Err(e) => return Err(e.into()),
		}
	}
	if line.last() == Some(&b'\r') {
		line.pop();
	}
	Ok(Some(String::from_utf8_lossy(&line).into_owned()))
}

pub fn prompt() -> String {
	let user = env::var("USER").unwrap_or_default();
	let host = unistd::gethostname().map(|h| h.to_string_lossy().into_owned()).unwrap_or_default();
	let cwd = env::current_dir().map(|d| d.display().to_string()).unwrap_or_default();
	format!("{}@{}:{} {}$ ", user, host, cwd, SYSNAME)
}

/// Where interpreter lines come from: a line editor with its own history on
/// a terminal, raw descriptor reads otherwise.
pub enum LineSource {
	Editor(DefaultEditor),
	Raw,
}

impl LineSource {
	pub fn new() -> LineSource {
		if io::stdin().is_terminal() {
			match DefaultEditor::new() {
				Ok(editor) => return LineSource::Editor(editor),
				Err(e) => tracing::warn!(error = %e, "line editor unavailable, reading raw input"),
			}
		}
		LineSource::Raw
	}

	pub fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>> {
		match *self {
			LineSource::Editor(ref mut editor) => match editor.readline(prompt) {
				Ok(line) => {
					if !line.trim().is_empty() {
						let _ = editor.add_history_entry(line.as_str());
					}
					Ok(Some(line))
				},
				Err(ReadlineError::Interrupted) => Ok(Some(String::new())),
				Err(ReadlineError::Eof) => Ok(None),
				Err(ReadlineError::Io(e)) => Err(e),
				Err(e) => Err(io::Error::new(io::ErrorKind::Other, e.to_string())),
			},
			LineSource::Raw => {
				let mut stdout = io::stdout();
				let _ = stdout.write_all(prompt.as_bytes());
				let _ = stdout.flush();
				read_line_raw(libc::STDIN_FILENO)
			},
		}
	}
}

//! `chatroom <room> <user>`: multi-party chat over named pipes.
//!
//! A room is a directory under the configured base directory; every
//! participant owns one FIFO in it, named after the user. Membership is never
//! cached: each outgoing message re-reads the directory. A forked reader
//! relays whatever arrives on the participant's own FIFO to standard output,
//! while the session process reads lines from standard input. Each message is
//! handed to one short-lived sender process per recipient, which opens the
//! recipient's FIFO without blocking, so an absent or slow reader never
//! stalls the sender.

use std::fs::{self, DirBuilder, OpenOptions};
use std::io::{self, Read, Write};
use std::os::unix::fs::{DirBuilderExt, FileTypeExt, OpenOptionsExt};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use nix::errno::Errno;
use nix::sys::signal::{self, Signal};
use nix::sys::stat::Mode;
use nix::unistd::{self, ForkResult, Pid};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{report, ShellError};
use crate::eval;
use crate::input;
use crate::job;

/// A line equal to this leaves the room without being sent.
pub const EXIT_SENTINEL: &str = "/exit";
const READ_BACKOFF: Duration = Duration::from_millis(50);
const ROOM_MODE: u32 = 0o777;
const PIPE_MODE: u32 = 0o666;

pub fn format_message(room: &str, user: &str, text: &str) -> String {
	format!("[{}] {}: {}\n", room, user, text)
}

fn validate_name(kind: &str, name: &str) -> Result<(), ShellError> {
	if name.is_empty() || name == "." || name == ".." || name.contains('/') {
		return Err(ShellError::usage(format!("chatroom: invalid {} name '{}'", kind, name)));
	}
	Ok(())
}

/// A room directory, discovered on demand.
#[derive(Debug, Clone)]
pub struct Room {
	name: String,
	dir: PathBuf,
}

impl Room {
	/// Makes sure the room directory exists under `base`.
	pub fn open(base: &Path, name: &str) -> io::Result<Room> {
		let dir = base.join(name);
		DirBuilder::new().recursive(true).mode(ROOM_MODE).create(&dir)?;
		Ok(Room { name: name.to_string(), dir })
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn dir(&self) -> &Path {
		&self.dir
	}

	pub fn pipe_path(&self, user: &str) -> PathBuf {
		self.dir.join(user)
	}

	/// Current participants: every FIFO in the room directory.
	pub fn members(&self) -> io::Result<Vec<String>> {
		let mut members = vec![];
		for entry in fs::read_dir(&self.dir)? {
			let entry = entry?;
			if !entry.file_type()?.is_fifo() {
				continue;
			}
			if let Ok(name) = entry.file_name().into_string() {
				members.push(name);
			}
		}
		members.sort();
		Ok(members)
	}

	/// Creates the participant's FIFO; one that already exists is reused.
	pub fn create_pipe(&self, user: &str) -> Result<PathBuf, ShellError> {
		let path = self.pipe_path(user);
		match unistd::mkfifo(path.as_path(), Mode::from_bits_truncate(PIPE_MODE)) {
			Ok(()) | Err(Errno::EEXIST) => Ok(path),
			Err(e) => Err(ShellError::Nix(e)),
		}
	}
}

/// Writes `message` into the FIFO at `path` without ever blocking. Fails with
/// `ENXIO` when nobody has the FIFO open for reading.
pub fn deliver(path: &Path, message: &[u8]) -> io::Result<()> {
	let mut fifo = OpenOptions::new()
		.write(true)
		.custom_flags(libc::O_NONBLOCK)
		.open(path)?;
	fifo.write_all(message)
}

/// Copies everything arriving on the FIFO at `path` to `out`. Returns only on error.
fn relay<W: Write>(path: &Path, out: &mut W) -> io::Result<()> {
	let mut fifo = OpenOptions::new()
		.read(true)
		.custom_flags(libc::O_NONBLOCK)
		.open(path)?;
	let mut buf = [0u8; 4096];
	loop {
		match fifo.read(&mut buf) {
			Ok(0) => thread::sleep(READ_BACKOFF),
			Ok(n) => {
				out.write_all(&buf[..n])?;
				out.flush()?;
			},
			Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => thread::sleep(READ_BACKOFF),
			Err(ref e) if e.kind() == io::ErrorKind::Interrupted => {},
			Err(e) => return Err(e),
		}
	}
}

fn exit_child(code: i32) -> ! {
	let _ = io::stdout().flush();
	unsafe { libc::_exit(code) }
}

fn spawn_reader(path: &Path) -> Result<Pid, ShellError> {
	match job::fork()? {
		ForkResult::Parent { child } => Ok(child),
		ForkResult::Child => {
			let stdout = io::stdout();
			let r = relay(path, &mut stdout.lock());
			if let Err(e) = r {
				report(&format_args!("chatroom: {}: {}", path.display(), e));
			}
			exit_child(1)
		},
	}
}

/// One participant's presence in a room, from join until drop.
pub struct Session {
	room: Room,
	user: String,
	pipe: PathBuf,
	reader: Option<Pid>,
}

impl Session {
	pub fn join(base: &Path, room: &str, user: &str) -> Result<Session, ShellError> {
		validate_name("room", room)?;
		validate_name("user", user)?;
		let room = Room::open(base, room)?;
		let pipe = room.create_pipe(user)?;
		let mut session = Session { room, user: user.to_string(), pipe, reader: None };
		session.reader = Some(spawn_reader(&session.pipe)?);
		info!(room = session.room.name(), user, "joined chat room");
		Ok(session)
	}

	/// Sends `text` to every other current member. Returns how many sender
	/// processes were started.
	pub fn broadcast(&self, text: &str) -> Result<usize, ShellError> {
		let message = format_message(self.room.name(), &self.user, text);
		let mut sent = 0;
		for member in self.room.members()? {
			if member == self.user {
				continue;
			}
			let path = self.room.pipe_path(&member);
			match job::fork() {
				Ok(ForkResult::Child) => {
					let code = match deliver(&path, message.as_bytes()) {
						Ok(()) => 0,
						Err(_) => 1,
					};
					exit_child(code)
				},
				Ok(ForkResult::Parent { child }) => {
					debug!(pid = child.as_raw(), to = member.as_str(), "sender spawned");
					sent += 1;
				},
				Err(e) => warn!(error = %e, to = member.as_str(), "could not spawn sender"),
			}
		}
		Ok(sent)
	}

	/// Reads lines from standard input until the exit sentinel or end of input.
	pub fn converse(&self) -> Result<(), ShellError> {
		loop {
			let reaped = job::reap_finished();
			if reaped > 0 {
				debug!(reaped, "reaped chat senders");
			}
			let line = match input::read_line_raw(libc::STDIN_FILENO)? {
				Some(line) => line,
				None => return Ok(()),
			};
			if line == EXIT_SENTINEL {
				return Ok(());
			}
			if let Err(e) = self.broadcast(&line) {
				report(&e);
			}
		}
	}

	fn leave(&mut self) {
		if let Some(reader) = self.reader.take() {
			let _ = signal::kill(reader, Signal::SIGTERM);
			job::wait_pid(reader);
		}
		match fs::remove_file(&self.pipe) {
			Ok(()) => {},
			Err(ref e) if e.kind() == io::ErrorKind::NotFound => {},
			Err(e) => warn!(error = %e, pipe = %self.pipe.display(), "could not remove chat pipe"),
		}
		job::reap_finished();
		info!(room = self.room.name(), user = self.user.as_str(), "left chat room");
	}
}

impl Drop for Session {
	fn drop(&mut self) {
		self.leave();
	}
}

pub fn builtin_chatroom(config: &Config, args: &[String]) -> Result<i32, ShellError> {
	let (room, user) = match args {
		[room, user] => (room.as_str(), user.as_str()),
		_ => return Err(ShellError::usage("usage: chatroom <room> <user>")),
	};
	// An interrupt must not skip the pipe cleanup; /exit or end of input leaves.
	eval::ignore_interrupts()?;
	let session = Session::join(&config.chat_dir, room, user)?;
	println!("Welcome to {}! Type {} to leave.", room, EXIT_SENTINEL);
	session.converse()?;
	Ok(0)
}

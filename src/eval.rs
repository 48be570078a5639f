use std::ffi::CString;
use std::io::{self, Write};
use std::os::unix::ffi::OsStringExt;
use std::os::unix::io::{AsRawFd, OwnedFd};

use nix::fcntl::OFlag;
use nix::sys::signal::{self, SigHandler, Signal};
use nix::unistd::{self, ForkResult};
use tracing::{debug, warn};

use crate::builtin::{self, Builtin, Placement};
use crate::config::Config;
use crate::error::{report, ShellError};
use crate::job;
use crate::parser;
use crate::redirect;
use crate::search;
use crate::types::{Command, Pipeline, Stage};

/// What the interpreter loop does after a line.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Status {
	Continue,
	Exit,
	/// The line could not be understood; the reason was reported.
	Unknown,
}

/// How `eval` returned.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Outcome {
	/// Every stage of the pipeline has terminated.
	Waited,
	/// Returned without waiting; launched stages run on their own.
	Detached,
}

/// Keeps an interrupt aimed at a foreground pipeline from ending the
/// interpreter. Spawned stages restore the default disposition.
pub fn ignore_interrupts() -> nix::Result<()> {
	unsafe { signal::signal(Signal::SIGINT, SigHandler::SigIgn) }?;
	Ok(())
}

/// Connects the stage to its neighbours' pipe ends. Every original
/// descriptor is released when this returns.
fn wire_pipes(stdin: Option<OwnedFd>, pipe: Option<(OwnedFd, OwnedFd)>) -> Result<(), ShellError> {
	if let Some(read) = stdin {
		unistd::dup2(read.as_raw_fd(), libc::STDIN_FILENO)?;
	}
	if let Some((_read, write)) = pipe {
		unistd::dup2(write.as_raw_fd(), libc::STDOUT_FILENO)?;
	}
	Ok(())
}

fn do_exec_stage(config: &Config, command: &Command, stage: Stage,
                 stdin: Option<OwnedFd>, pipe: Option<(OwnedFd, OwnedFd)>) -> Result<i32, ShellError> {
	for sig in [Signal::SIGINT, Signal::SIGPIPE] {
		unsafe { signal::signal(sig, SigHandler::SigDfl) }?;
	}
	wire_pipes(stdin, pipe)?;
	redirect::apply(&command.redirects)?;

	if let Some(b) = builtin::match_builtin(&command.name).and_then(Builtin::stage) {
		return builtin::run_in_stage(b, config, command, stage);
	}

	let path = match search::resolve(&command.name) {
		Some(path) => path,
		None => return Err(ShellError::NotFound(command.name.clone())),
	};
	let path = CString::new(path.into_os_string().into_vec())?;
	let argv = command.argv()?;
	match unistd::execv(&path, &argv) {
		Ok(never) => match never {},
		Err(e) => Err(ShellError::Exec { name: command.name.clone(), source: e }),
	}
}

/// Body of a forked stage. Never returns.
fn exec_stage(config: &Config, command: &Command, stage: Stage,
              stdin: Option<OwnedFd>, pipe: Option<(OwnedFd, OwnedFd)>) -> ! {
	let s = do_exec_stage(config, command, stage, stdin, pipe).unwrap_or_else(|e| {
		report(&e);
		e.exit_code()
	});
	let _ = io::stdout().flush();
	unsafe { libc::_exit(s) }
}

/// Forks one process per stage, wiring neighbours with pipes. On failure the
/// remaining stages are not launched; the ones already running are left alone.
fn spawn_commands(config: &Config, pipeline: &Pipeline, job: &mut job::Job) -> Result<(), ShellError> {
	let count = pipeline.commands.len();
	let mut prev_read: Option<OwnedFd> = None;
	for (index, command) in pipeline.commands.iter().enumerate() {
		let stage = Stage { index, count };
		let pipe = if stage.is_last() { None } else { Some(unistd::pipe2(OFlag::O_CLOEXEC)?) };
		match job.push_fork()? {
			ForkResult::Child => exec_stage(config, command, stage, prev_read, pipe),
			ForkResult::Parent { child } => {
				debug!(pid = child.as_raw(), stage = index, name = command.name.as_str(), "spawned stage");
				prev_read = pipe.map(|(read, _write)| read);
			},
		}
	}
	Ok(())
}

/// Runs a pipeline and applies the job-control policy: wait for every stage
/// in the foreground, or sweep finished children and return in the background.
pub fn eval(config: &Config, pipeline: &Pipeline) -> Outcome {
	let mut job = job::Job::new(pipeline.commands.len());
	if let Err(e) = spawn_commands(config, pipeline, &mut job) {
		report(&e);
		warn!(launched = job.len(), total = pipeline.commands.len(), "pipeline launch aborted");
		return Outcome::Detached;
	}
	if pipeline.is_background {
		let reaped = job::reap_finished();
		debug!(pids = ?job.pids(), reaped, "pipeline detached");
		Outcome::Detached
	} else {
		job.wait();
		Outcome::Waited
	}
}

/// Handles one input line.
pub fn process(config: &Config, line: &str) -> Status {
	let pipeline = match parser::parse(line) {
		Ok(Some(pipeline)) => pipeline,
		Ok(None) => return Status::Continue,
		Err(e) => {
			report(&e);
			return Status::Unknown;
		},
	};
	let head = pipeline.head();
	match builtin::match_builtin(&head.name).map(|b| (b, b.placement())) {
		Some((_, Placement::Session)) => return Status::Exit,
		Some((b, Placement::Parent)) => {
			if pipeline.commands.len() > 1 {
				debug!(builtin = b.name(), stages = pipeline.commands.len(), "builtin heads a pipeline; other stages ignored");
			}
			if let Err(e) = builtin::builtin_cd(&head.arguments) {
				report(&e);
			}
			return Status::Continue;
		},
		_ => {},
	}
	eval(config, &pipeline);
	Status::Continue
}

use std::io::{self, Write};

use nix::errno::Errno;
use nix::sys::wait::{self, WaitPidFlag, WaitStatus};
use nix::unistd::{self, ForkResult, Pid};

/// Forks after flushing buffered standard output, so the child never
/// repeats output the parent had not yet written.
pub fn fork() -> nix::Result<ForkResult> {
	let _ = io::stdout().flush();
	unsafe { unistd::fork() }
}

/// The processes launched for one pipeline, in stage order.
#[derive(Debug)]
pub struct Job {
	pids: Vec<Pid>,
}

impl Job {
	pub fn new(size_hint: usize) -> Job {
		Job { pids: Vec::with_capacity(size_hint) }
	}

	/// Forks one stage and records its pid on the parent side.
	pub fn push_fork(&mut self) -> nix::Result<ForkResult> {
		let r = fork()?;
		if let ForkResult::Parent { child } = r {
			self.pids.push(child);
		}
		Ok(r)
	}

	pub fn pids(&self) -> &[Pid] {
		&self.pids
	}

	pub fn len(&self) -> usize {
		self.pids.len()
	}

	/// Blocks until every recorded process has terminated. Statuses are discarded.
	pub fn wait(self) {
		for pid in self.pids {
			wait_pid(pid);
		}
	}
}

pub fn wait_pid(pid: Pid) {
	loop {
		match wait::waitpid(pid, None) {
			Err(Errno::EINTR) => continue,
			Ok(WaitStatus::StillAlive) => continue,
			_ => return,
		}
	}
}

/// Reaps every child that has already terminated without blocking, whichever
/// job it belonged to. Returns how many were reaped.
pub fn reap_finished() -> usize {
	let mut reaped = 0;
	loop {
		match wait::waitpid(Pid::from_raw(-1), Some(WaitPidFlag::WNOHANG)) {
			Ok(WaitStatus::StillAlive) | Err(_) => return reaped,
			Ok(_) => reaped += 1,
		}
	}
}

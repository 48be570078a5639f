use std::ffi::{CString, NulError};
use std::path::{Path, PathBuf};

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum RedirectType { Input, Output, Append }

/// Per-stage redirection targets. Each kind holds at most one path; a later
/// token of the same kind replaces an earlier one.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Redirects {
	pub input: Option<PathBuf>,
	pub output: Option<PathBuf>,
	pub append: Option<PathBuf>,
}

impl Redirects {
	pub fn set(&mut self, typ: RedirectType, target: PathBuf) {
		let slot = match typ {
			RedirectType::Input => &mut self.input,
			RedirectType::Output => &mut self.output,
			RedirectType::Append => &mut self.append,
		};
		*slot = Some(target);
	}

	/// Where standard output goes. Append wins over truncate when both are set.
	pub fn stdout_target(&self) -> Option<(&Path, RedirectType)> {
		if let Some(ref path) = self.append {
			Some((path.as_path(), RedirectType::Append))
		} else if let Some(ref path) = self.output {
			Some((path.as_path(), RedirectType::Output))
		} else {
			None
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
	pub name: String,
	pub arguments: Vec<String>,
	pub redirects: Redirects,
}

impl Command {
	/// Argument vector for process replacement: the name at position 0, then
	/// the arguments. `execv` appends the terminating null pointer.
	pub fn argv(&self) -> Result<Vec<CString>, NulError> {
		let mut argv = Vec::with_capacity(self.arguments.len() + 1);
		argv.push(CString::new(self.name.as_str())?);
		for arg in &self.arguments {
			argv.push(CString::new(arg.as_str())?);
		}
		Ok(argv)
	}
}

/// A parsed line. `commands` is never empty; the job-control flags come from
/// the end of the whole line and therefore apply to the pipeline as a unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
	pub commands: Vec<Command>,
	pub is_background: bool,
	pub is_autocomplete: bool,
}

impl Pipeline {
	pub fn head(&self) -> &Command {
		&self.commands[0]
	}
}

/// Position of a spawned stage inside its pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stage {
	pub index: usize,
	pub count: usize,
}

impl Stage {
	pub fn is_first(self) -> bool {
		self.index == 0
	}

	pub fn is_last(self) -> bool {
		self.index + 1 == self.count
	}
}

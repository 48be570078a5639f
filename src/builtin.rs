use std::env;
use std::io;
use std::path::PathBuf;

use crate::chat;
use crate::config::Config;
use crate::cut;
use crate::error::ShellError;
use crate::pinfo;
use crate::types::{Command, Stage};

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Builtin { Exit, Cd, Cut, Pinfo, Chatroom }

/// The builtins that run inside a spawned stage.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum StageBuiltin { Cut, Pinfo, Chatroom }

/// Where a builtin has to run.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Placement {
	/// Handled by the interpreter loop itself; never spawned.
	Session,
	/// Runs in the interpreter process before anything is spawned.
	Parent,
	/// Runs inside a spawned stage, under the stage's pipes and redirections.
	Stage,
}

impl Builtin {
	pub fn name(self) -> &'static str {
		match self {
			Builtin::Exit => "exit",
			Builtin::Cd => "cd",
			Builtin::Cut => "cut",
			Builtin::Pinfo => "pinfo",
			Builtin::Chatroom => "chatroom",
		}
	}

	pub fn placement(self) -> Placement {
		match self {
			Builtin::Exit => Placement::Session,
			Builtin::Cd => Placement::Parent,
			Builtin::Cut | Builtin::Pinfo | Builtin::Chatroom => Placement::Stage,
		}
	}

	pub fn stage(self) -> Option<StageBuiltin> {
		match self {
			Builtin::Exit | Builtin::Cd => None,
			Builtin::Cut => Some(StageBuiltin::Cut),
			Builtin::Pinfo => Some(StageBuiltin::Pinfo),
			Builtin::Chatroom => Some(StageBuiltin::Chatroom),
		}
	}
}

pub fn match_builtin(name: &str) -> Option<Builtin> {
	match name {
		"exit" => Some(Builtin::Exit),
		"cd" => Some(Builtin::Cd),
		"cut" => Some(Builtin::Cut),
		"pinfo" => Some(Builtin::Pinfo),
		"chatroom" => Some(Builtin::Chatroom),
		_ => None,
	}
}

pub fn builtin_cd(args: &[String]) -> Result<(), ShellError> {
	let target = match args.first() {
		Some(dir) => PathBuf::from(dir),
		None => match env::var_os("HOME") {
			Some(home) => PathBuf::from(home),
			None => return Err(ShellError::usage("cd: HOME not set")),
		},
	};
	env::set_current_dir(&target)
		.map_err(|e| ShellError::usage(format!("cd: {}: {}", target.display(), e)))
}

/// Runs a spawn-safe builtin inside its stage and yields the stage's exit status.
pub fn run_in_stage(builtin: StageBuiltin, config: &Config, command: &Command, stage: Stage) -> Result<i32, ShellError> {
	match builtin {
		StageBuiltin::Cut => cut::builtin_cut(&command.arguments),
		StageBuiltin::Pinfo => pinfo::builtin_pinfo(&command.arguments, io::stdout()),
		StageBuiltin::Chatroom => {
			if !(stage.is_first() && stage.is_last()) {
				return Err(ShellError::usage("chatroom: cannot be used inside a pipeline"));
			}
			chat::builtin_chatroom(config, &command.arguments)
		},
	}
}

use std::fs;
use std::io::Write;

use crate::error::ShellError;

const RECOGNIZED: [&str; 5] = ["Name", "State", "PPid", "VmSize", "VmRSS"];

pub fn parse_pid(arg: &str) -> Result<i32, ShellError> {
	match arg.parse::<i32>() {
		Ok(pid) if pid > 0 => Ok(pid),
		_ => Err(ShellError::usage(format!("pinfo: invalid process id '{}'", arg))),
	}
}

/// Picks the recognized `Key:\tvalue` lines out of a status file, in file
/// order, stopping after the fifth.
pub fn select_fields(status: &str) -> Vec<(&str, &str)> {
	status.lines()
		.filter_map(|line| {
			let (key, value) = line.split_once(':')?;
			if RECOGNIZED.contains(&key) { Some((key, value.trim())) } else { None }
		})
		.take(RECOGNIZED.len())
		.collect()
}

pub fn read_status(pid: i32) -> Result<String, ShellError> {
	fs::read_to_string(format!("/proc/{}/status", pid))
		.map_err(|e| ShellError::NoProcess { pid, source: e })
}

pub fn builtin_pinfo<W: Write>(args: &[String], mut out: W) -> Result<i32, ShellError> {
	let pid = match args {
		[arg] => parse_pid(arg)?,
		_ => return Err(ShellError::usage("usage: pinfo <pid>")),
	};
	let status = read_status(pid)?;
	for (key, value) in select_fields(&status) {
		writeln!(out, "{}: {}", key, value)?;
	}
	out.flush()?;
	Ok(0)
}

use std::env;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use nix::unistd::{self, AccessFlags};

const PATH_KEY: &str = "PATH";

fn is_executable(candidate: &Path) -> bool {
	unistd::access(candidate, AccessFlags::X_OK).is_ok() && !candidate.is_dir()
}

/// Looks `name` up in `search_path`, left to right. A name containing a path
/// separator is taken literally.
pub fn resolve_in(name: &str, search_path: Option<&OsStr>) -> Option<PathBuf> {
	if name.contains('/') {
		return Some(PathBuf::from(name));
	}
	if name.is_empty() {
		return None;
	}
	env::split_paths(search_path?)
		.map(|dir| dir.join(name))
		.find(|candidate| is_executable(candidate))
}

pub fn resolve(name: &str) -> Option<PathBuf> {
	resolve_in(name, env::var_os(PATH_KEY).as_deref())
}

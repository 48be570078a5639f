use std::fs;
use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::{self, Child, Output, Stdio};
use std::thread::sleep;
use std::time::{Duration, Instant};

use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;

const BIN: &str = env!("CARGO_BIN_EXE_shellish");

fn sleep_little() {
	sleep(Duration::from_millis(400));
}

struct ShellHandler {
	child: Child,
}

impl ShellHandler {
	fn new(cwd: &Path, chat_dir: &Path) -> ShellHandler {
		ShellHandler::spawn(process::Command::new(BIN), cwd, chat_dir)
	}

	/// Starts the interpreter with its descriptor table capped at `limit`.
	fn with_fd_limit(cwd: &Path, limit: u32) -> ShellHandler {
		let mut command = process::Command::new("sh");
		command.arg("-c").arg(format!("ulimit -n {}; exec \"$0\"", limit)).arg(BIN);
		ShellHandler::spawn(command, cwd, cwd)
	}

	fn spawn(mut command: process::Command, cwd: &Path, chat_dir: &Path) -> ShellHandler {
		let child = command
			.current_dir(cwd)
			.env("SHELLISH_CHAT_DIR", chat_dir)
			.env("SHELLISH_LOG", "off")
			.stdin(Stdio::piped())
			.stdout(Stdio::piped())
			.stderr(Stdio::piped())
			.spawn()
			.unwrap();
		ShellHandler { child }
	}

	fn input(&mut self, line: &str) {
		let stdin = self.child.stdin.as_mut().unwrap();
		stdin.write_all(line.as_bytes()).unwrap();
		stdin.write_all(b"\n").unwrap();
		stdin.flush().unwrap();
	}

	fn interrupt(&self) {
		signal::kill(Pid::from_raw(self.child.id() as i32), Signal::SIGINT).unwrap();
	}

	fn finish(mut self) -> Output {
		drop(self.child.stdin.take());
		self.child.wait_with_output().unwrap()
	}
}

fn run_line(cwd: &Path, line: &str) -> Output {
	process::Command::new(BIN)
		.current_dir(cwd)
		.env("SHELLISH_LOG", "off")
		.args(["-c", line])
		.stdin(Stdio::null())
		.output()
		.unwrap()
}

fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
	let path = dir.join(name);
	fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
	fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
	path
}

fn read(path: &Path) -> String {
	fs::read_to_string(path).unwrap()
}

fn stderr(output: &Output) -> String {
	String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn pipeline_to_file() {
	let dir = tempfile::tempdir().unwrap();
	let out = run_line(dir.path(), "echo hello world | tr a-z A-Z | cat >out.txt");
	assert!(out.status.success());
	assert_eq!(read(&dir.path().join("out.txt")), "HELLO WORLD\n");
}

#[test]
fn append_wins_over_truncate() {
	let dir = tempfile::tempdir().unwrap();
	run_line(dir.path(), "echo x >t.txt >>a.txt");
	run_line(dir.path(), "echo y >t.txt >>a.txt");
	assert_eq!(read(&dir.path().join("a.txt")), "x\ny\n");
	assert!(!dir.path().join("t.txt").exists());
}

#[test]
fn truncate_replaces_content() {
	let dir = tempfile::tempdir().unwrap();
	fs::write(dir.path().join("t.txt"), "something longer\n").unwrap();
	run_line(dir.path(), "echo new >t.txt");
	assert_eq!(read(&dir.path().join("t.txt")), "new\n");
}

#[test]
fn redirection_overrides_pipe_wiring() {
	let dir = tempfile::tempdir().unwrap();
	run_line(dir.path(), "echo hi >mid.txt | cat >end.txt");
	assert_eq!(read(&dir.path().join("mid.txt")), "hi\n");
	assert_eq!(read(&dir.path().join("end.txt")), "");
}

#[test]
fn input_redirection_overrides_pipe_wiring() {
	let dir = tempfile::tempdir().unwrap();
	fs::write(dir.path().join("in.txt"), "from-file\n").unwrap();
	run_line(dir.path(), "echo from-pipe | cat <in.txt | cat >o.txt");
	assert_eq!(read(&dir.path().join("o.txt")), "from-file\n");
}

#[test]
fn missing_input_file_is_reported() {
	let dir = tempfile::tempdir().unwrap();
	let out = run_line(dir.path(), "cat <nope.txt");
	assert!(out.status.success());
	assert!(stderr(&out).contains("-shellish: nope.txt: "));
}

#[test]
fn cut_selects_fields() {
	let dir = tempfile::tempdir().unwrap();
	fs::write(dir.path().join("in.txt"), "a:b:c\nd:e:f\n").unwrap();
	run_line(dir.path(), "cut -d : -f 3,1 <in.txt >out.txt");
	assert_eq!(read(&dir.path().join("out.txt")), "c:a\nf:d\n");
}

#[test]
fn cut_preserves_missing_newline() {
	let dir = tempfile::tempdir().unwrap();
	run_line(dir.path(), "printf 'a:b:c' | cut -d: -f1,3 >out.txt");
	assert_eq!(read(&dir.path().join("out.txt")), "a:c");
}

#[test]
fn cut_without_fields_writes_nothing() {
	let dir = tempfile::tempdir().unwrap();
	fs::write(dir.path().join("in.txt"), "a:b:c\nd:e:f\n").unwrap();
	run_line(dir.path(), "cut -d : <in.txt >out.txt");
	assert_eq!(read(&dir.path().join("out.txt")), "");
}

#[test]
fn foreground_waits_for_every_stage() {
	let dir = tempfile::tempdir().unwrap();
	script(dir.path(), "slow.sh", "sleep 0.5\necho slow >slow.txt");
	script(dir.path(), "quick.sh", "echo quick >quick.txt");
	let out = run_line(dir.path(), "./slow.sh | ./quick.sh | true");
	assert!(out.status.success());
	assert_eq!(read(&dir.path().join("slow.txt")), "slow\n");
	assert_eq!(read(&dir.path().join("quick.txt")), "quick\n");
}

#[test]
fn background_returns_immediately() {
	let dir = tempfile::tempdir().unwrap();
	script(dir.path(), "sleepy.sh", "sleep 2\necho done >>done.txt");
	let start = Instant::now();
	let status = process::Command::new(BIN)
		.current_dir(dir.path())
		.args(["-c", "./sleepy.sh | ./sleepy.sh | ./sleepy.sh &"])
		.stdin(Stdio::null())
		.stdout(Stdio::null())
		.stderr(Stdio::null())
		.status()
		.unwrap();
	assert!(status.success());
	assert!(start.elapsed() < Duration::from_millis(1500));
	assert!(!dir.path().join("done.txt").exists());
}

#[test]
fn launch_failure_skips_remaining_stages() {
	let dir = tempfile::tempdir().unwrap();
	let mut sh = ShellHandler::with_fd_limit(dir.path(), 5);
	sh.input("echo a | cat | cat | cat >o.txt");
	sh.input("echo alive >alive.txt");
	let out = sh.finish();
	assert!(out.status.success());
	let err = stderr(&out);
	assert!(err.contains("-shellish: EMFILE"), "{}", err);
	assert_eq!(err.matches("-shellish: ").count(), 1, "{}", err);
	assert!(!dir.path().join("o.txt").exists());
	assert_eq!(read(&dir.path().join("alive.txt")), "alive\n");
}

#[test]
fn interrupt_does_not_end_the_session() {
	let dir = tempfile::tempdir().unwrap();
	let mut sh = ShellHandler::new(dir.path(), dir.path());
	sh.input("sleep 1");
	sleep_little();
	sh.interrupt();
	sh.input("echo alive >a.txt");
	let out = sh.finish();
	assert!(out.status.success());
	assert_eq!(read(&dir.path().join("a.txt")), "alive\n");
}

#[test]
fn stages_start_with_default_signal_dispositions() {
	let dir = tempfile::tempdir().unwrap();
	run_line(dir.path(), "grep SigIgn /proc/self/status >ign.txt");
	let line = read(&dir.path().join("ign.txt"));
	let mask = u64::from_str_radix(line.trim_start_matches("SigIgn:").trim(), 16).unwrap();
	assert_eq!(mask & (1 << (libc::SIGINT - 1)), 0, "{}", line);
	assert_eq!(mask & (1 << (libc::SIGPIPE - 1)), 0, "{}", line);
}

#[test]
fn log_output_is_plain_when_piped() {
	let dir = tempfile::tempdir().unwrap();
	let out = process::Command::new(BIN)
		.current_dir(dir.path())
		.args(["--log", "debug", "-c", "true"])
		.stdin(Stdio::null())
		.output()
		.unwrap();
	let err = stderr(&out);
	assert!(err.contains("starting"), "{}", err);
	assert!(!err.contains('\x1b'), "{:?}", err);
}

#[test]
fn unknown_command_is_not_fatal() {
	let dir = tempfile::tempdir().unwrap();
	let mut sh = ShellHandler::new(dir.path(), dir.path());
	sh.input("definitely-not-a-command-xyz --flag");
	sh.input("echo still here >alive.txt");
	sh.input("exit");
	let out = sh.finish();
	assert!(out.status.success());
	assert!(stderr(&out).contains("-shellish: definitely-not-a-command-xyz: command not found"));
	assert_eq!(read(&dir.path().join("alive.txt")), "still here\n");
}

#[test]
fn unexecutable_file_is_an_exec_failure() {
	let dir = tempfile::tempdir().unwrap();
	fs::write(dir.path().join("plain.txt"), "not a program\n").unwrap();
	let out = run_line(dir.path(), "./plain.txt");
	let err = stderr(&out);
	assert!(err.contains("-shellish: ./plain.txt: "));
	assert!(!err.contains("command not found"));
}

#[test]
fn parse_errors_are_reported_and_skipped() {
	let dir = tempfile::tempdir().unwrap();
	let mut sh = ShellHandler::new(dir.path(), dir.path());
	sh.input("ls |");
	sh.input("echo ok >ok.txt");
	let out = sh.finish();
	assert!(stderr(&out).contains("-shellish: empty command"));
	assert_eq!(read(&dir.path().join("ok.txt")), "ok\n");
}

#[test]
fn cd_changes_the_interpreter_directory() {
	let dir = tempfile::tempdir().unwrap();
	fs::create_dir(dir.path().join("sub")).unwrap();
	let mut sh = ShellHandler::new(dir.path(), dir.path());
	sh.input("cd sub");
	sh.input("pwd >here.txt");
	sh.input("cd missing-dir");
	let out = sh.finish();
	let here = read(&dir.path().join("sub").join("here.txt"));
	assert!(here.trim_end().ends_with("/sub"));
	assert!(stderr(&out).contains("-shellish: cd: missing-dir: "));
}

#[test]
fn exit_ends_the_session_while_input_is_open() {
	let dir = tempfile::tempdir().unwrap();
	let mut sh = ShellHandler::new(dir.path(), dir.path());
	sh.input("exit");
	let status = sh.child.wait().unwrap();
	assert!(status.success());
}

#[test]
fn pinfo_prints_process_status() {
	let dir = tempfile::tempdir().unwrap();
	let line = format!("pinfo {} >p.txt", process::id());
	run_line(dir.path(), &line);
	let info = read(&dir.path().join("p.txt"));
	assert!(info.starts_with("Name: "));
	assert!(info.lines().count() <= 5);

	let out = run_line(dir.path(), "pinfo abc");
	assert!(out.status.success());
	assert!(stderr(&out).contains("invalid process id 'abc'"));
}

#[test]
fn chatroom_is_refused_in_a_pipeline() {
	let dir = tempfile::tempdir().unwrap();
	let out = run_line(dir.path(), "chatroom lobby me | cat");
	assert!(stderr(&out).contains("chatroom: cannot be used inside a pipeline"));
	assert!(!dir.path().join("lobby").exists());
}

#[test]
fn chat_between_two_participants() {
	let cwd = tempfile::tempdir().unwrap();
	let rooms = tempfile::tempdir().unwrap();
	let room = rooms.path().join("lobby");

	let mut u2 = ShellHandler::new(cwd.path(), rooms.path());
	u2.input("chatroom lobby u2");
	sleep_little();
	let mut u1 = ShellHandler::new(cwd.path(), rooms.path());
	u1.input("chatroom lobby u1");
	sleep_little();
	assert!(room.join("u1").exists());
	assert!(room.join("u2").exists());

	u1.input("hello from one");
	sleep_little();
	u1.input("/exit");
	u1.input("exit");
	let out1 = u1.finish();
	assert!(!room.join("u1").exists());

	u2.input("/exit");
	u2.input("exit");
	let out2 = u2.finish();
	assert!(!room.join("u2").exists());

	let seen_by_u2 = String::from_utf8_lossy(&out2.stdout);
	let seen_by_u1 = String::from_utf8_lossy(&out1.stdout);
	assert!(seen_by_u2.contains("[lobby] u1: hello from one"), "{}", seen_by_u2);
	assert!(!seen_by_u1.contains("u1: hello from one"), "{}", seen_by_u1);
	assert!(seen_by_u1.contains("Welcome to lobby!"));
}

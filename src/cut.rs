//! `cut`: field extraction over standard input.
//!
//! Each line is split on a single delimiter byte (TAB unless `-d` says
//! otherwise) and the fields named by `-f` are written in the order given,
//! joined by the same delimiter. Indices are 1-based; repeats and reordering
//! are honored and an index past the end of a line is skipped. A line's
//! terminator is kept exactly as it came in. Without `-f` nothing at all is
//! written.

use std::io::{self, BufRead, Write};

use argh::{EarlyExit, FromArgs};

use crate::error::ShellError;

const DEFAULT_DELIMITER: u8 = b'\t';

#[derive(FromArgs, Debug, PartialEq)]
/// Print selected delimiter-separated fields of each input line.
pub struct Cut {
	#[argh(option, short = 'd')]
	/// single-byte field delimiter; TAB when omitted.
	pub delimiter: Option<String>,

	#[argh(option, short = 'f')]
	/// comma-separated list of 1-based field indices.
	pub fields: Option<String>,
}

/// Splits the attached forms `-d:` and `-f1,3` into flag and value.
fn normalize_args(args: &[String]) -> Vec<String> {
	let mut out = Vec::with_capacity(args.len());
	for arg in args {
		match arg.as_str() {
			a if a.len() > 2 && (a.starts_with("-d") || a.starts_with("-f")) => {
				out.push(a[..2].to_string());
				out.push(a[2..].to_string());
			},
			a => out.push(a.to_string()),
		}
	}
	out
}

pub fn parse_delimiter(spec: &str) -> Result<u8, ShellError> {
	match spec.as_bytes() {
		[b] => Ok(*b),
		b"\\t" => Ok(b'\t'),
		_ => Err(ShellError::usage(format!("cut: the delimiter must be a single character: '{}'", spec))),
	}
}

pub fn parse_fields(spec: &str) -> Result<Vec<usize>, ShellError> {
	spec.split(',')
		.map(|f| match f.trim().parse::<usize>() {
			Ok(n) if n > 0 => Ok(n),
			_ => Err(ShellError::usage(format!("cut: invalid field value '{}'", f))),
		})
		.collect()
}

/// Appends the selected fields of `line` (terminator included, if any) to `out`.
pub fn cut_line(line: &[u8], delimiter: u8, fields: &[usize], out: &mut Vec<u8>) {
	let (body, terminated) = match line.split_last() {
		Some((b'\n', body)) => (body, true),
		_ => (line, false),
	};
	let parts: Vec<&[u8]> = body.split(|&b| b == delimiter).collect();
	let mut first = true;
	for &index in fields {
		if let Some(part) = parts.get(index - 1) {
			if !first {
				out.push(delimiter);
			}
			out.extend_from_slice(part);
			first = false;
		}
	}
	if terminated {
		out.push(b'\n');
	}
}

/// Filters `input` into `output` line by line. With no field list the input
/// is drained and nothing is written.
pub fn cut_stream<R: BufRead, W: Write>(mut input: R, mut output: W, delimiter: u8, fields: Option<&[usize]>) -> io::Result<()> {
	let mut line: Vec<u8> = vec![];
	let mut out: Vec<u8> = vec![];
	loop {
		line.clear();
		if input.read_until(b'\n', &mut line)? == 0 {
			break;
		}
		if let Some(fields) = fields {
			out.clear();
			cut_line(&line, delimiter, fields, &mut out);
			output.write_all(&out)?;
		}
	}
	output.flush()
}

impl Cut {
	pub fn from_arguments(args: &[String]) -> Result<Cut, EarlyExit> {
		let args = normalize_args(args);
		let args: Vec<&str> = args.iter().map(String::as_str).collect();
		Cut::from_args(&["cut"], &args)
	}

	pub fn run<R: BufRead, W: Write>(self, input: R, output: W) -> Result<i32, ShellError> {
		let delimiter = match self.delimiter {
			Some(ref d) => parse_delimiter(d)?,
			None => DEFAULT_DELIMITER,
		};
		let fields = match self.fields {
			Some(ref f) => Some(parse_fields(f)?),
			None => None,
		};
		cut_stream(input, output, delimiter, fields.as_deref())?;
		Ok(0)
	}
}

pub fn builtin_cut(args: &[String]) -> Result<i32, ShellError> {
	let cut = match Cut::from_arguments(args) {
		Ok(cut) => cut,
		Err(EarlyExit { output, status: Ok(()) }) => {
			print!("{}", output);
			return Ok(0);
		},
		Err(EarlyExit { output, status: Err(()) }) => {
			return Err(ShellError::usage(output.trim_end().to_string()));
		},
	};
	let stdin = io::stdin();
	let stdout = io::stdout();
	cut.run(stdin.lock(), stdout.lock())
}

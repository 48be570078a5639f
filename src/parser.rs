use std::path::PathBuf;

use crate::types::*;

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
	#[error("empty command")]
	EmptyCommand,
	#[error("empty redirect after '{0}'")]
	EmptyRedirect(&'static str),
}

pub type ParseResult<T> = Result<T, ParseError>;

fn is_whitespace(c: char) -> bool {
	matches!(c, ' ' | '\t' | '\n' | '\r')
}

fn trim(s: &str) -> &str {
	s.trim_matches(is_whitespace)
}

/// Strips one pair of matching quotes from a token of three or more bytes.
fn unquote(token: &str) -> &str {
	let bytes = token.as_bytes();
	if bytes.len() > 2 {
		let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
		if (first == b'"' || first == b'\'') && first == last {
			return &token[1 .. token.len() - 1];
		}
	}
	token
}

struct Parser<I> {
	tokens: I,
}

impl<'a, I: Iterator<Item = &'a str>> Parser<I> {
	fn parse_redirect(token: &str) -> ParseResult<Option<(RedirectType, PathBuf)>> {
		let (typ, op, target) = if let Some(rest) = token.strip_prefix(">>") {
			(RedirectType::Append, ">>", rest)
		} else if let Some(rest) = token.strip_prefix('>') {
			(RedirectType::Output, ">", rest)
		} else if let Some(rest) = token.strip_prefix('<') {
			(RedirectType::Input, "<", rest)
		} else {
			return Ok(None);
		};
		if target.is_empty() {
			return Err(ParseError::EmptyRedirect(op));
		}
		Ok(Some((typ, PathBuf::from(target))))
	}

	/// Parses one stage. The flag tells whether a `|` ended it.
	fn parse_command(&mut self) -> ParseResult<(Command, bool)> {
		let mut name: Option<String> = None;
		let mut arguments: Vec<String> = vec![];
		let mut redirects = Redirects::default();
		let mut piped = false;

		while let Some(token) = self.tokens.next() {
			let token = trim(token);
			match token {
				"" | "&" => continue,
				"|" => {
					piped = true;
					break;
				},
				_ => {},
			}
			if let Some((typ, target)) = Self::parse_redirect(token)? {
				redirects.set(typ, target);
				continue;
			}
			let word = unquote(token).to_owned();
			if name.is_none() {
				name = Some(word);
			} else {
				arguments.push(word);
			}
		}

		let name = name.ok_or(ParseError::EmptyCommand)?;
		Ok((Command { name, arguments, redirects }, piped))
	}

	fn parse_pipeline(&mut self, is_background: bool, is_autocomplete: bool) -> ParseResult<Pipeline> {
		let mut commands: Vec<Command> = vec![];
		loop {
			let (command, piped) = self.parse_command()?;
			commands.push(command);
			if !piped {
				break;
			}
		}
		Ok(Pipeline { commands, is_background, is_autocomplete })
	}
}

/// Parses one input line. A blank line yields `Ok(None)`.
pub fn parse(line: &str) -> ParseResult<Option<Pipeline>> {
	let mut line = trim(line);
	let mut is_autocomplete = false;
	let mut is_background = false;
	if let Some(rest) = line.strip_suffix('?') {
		is_autocomplete = true;
		line = rest;
	} else if let Some(rest) = line.strip_suffix('&') {
		is_background = true;
		line = rest;
	}
	if trim(line).is_empty() {
		return Ok(None);
	}

	let mut parser = Parser { tokens: line.split(is_whitespace) };
	parser.parse_pipeline(is_background, is_autocomplete).map(Some)
}

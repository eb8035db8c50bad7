use crate::affy::{AffyError, Result};

/// Line reader over a text buffer with one-line pushback.
///
/// Accepts `\n`, `\r\n`, and bare `\r` terminators, trims surrounding
/// whitespace, and never yields blank lines.
#[derive(Debug)]
pub struct LineReader<'a> {
	text: &'a str,
	pos: usize,
	line_no: usize,
	last: Option<&'a str>,
	pushed_back: bool,
}

impl<'a> LineReader<'a> {
	/// Start reading at the beginning of `text`.
	pub fn new(text: &'a str) -> Self {
		Self {
			text,
			pos: 0,
			line_no: 0,
			last: None,
			pushed_back: false,
		}
	}

	/// One-based number of the physical line most recently returned.
	pub fn line_no(&self) -> usize {
		self.line_no
	}

	fn next_raw(&mut self) -> Option<&'a str> {
		if self.pos >= self.text.len() {
			return None;
		}

		let rest = &self.text[self.pos..];
		let (line, consumed) = match rest.find(['\n', '\r']) {
			Some(end) => {
				let crlf = rest[end..].starts_with("\r\n");
				(&rest[..end], end + if crlf { 2 } else { 1 })
			}
			None => (rest, rest.len()),
		};
		self.pos += consumed;
		self.line_no += 1;
		Some(line)
	}

	/// Next non-blank trimmed line, or `None` at end of input.
	pub fn next_line(&mut self) -> Option<&'a str> {
		if self.pushed_back {
			self.pushed_back = false;
			return self.last;
		}

		while let Some(raw) = self.next_raw() {
			let line = raw.trim();
			if !line.is_empty() {
				self.last = Some(line);
				return Some(line);
			}
		}
		None
	}

	/// Push the most recently returned line back, so the next read yields it again.
	///
	/// Only one line of pushback is kept; a second unget without an
	/// intervening read is rejected.
	pub fn unget(&mut self) -> Result<()> {
		if self.pushed_back {
			return Err(AffyError::invalid_argument("line reader already holds a pushed-back line"));
		}
		if self.last.is_none() {
			return Err(AffyError::invalid_argument("no line to push back"));
		}
		self.pushed_back = true;
		Ok(())
	}

	/// Discard lines until one starting with `[`, push it back, and return it.
	pub fn skip_to_next_header(&mut self) -> Option<&'a str> {
		while let Some(line) = self.next_line() {
			if line.starts_with('[') {
				self.pushed_back = true;
				return Some(line);
			}
		}
		None
	}
}

/// Split `key=value`, trimming both halves.
pub fn split_key_value(line: &str) -> Result<(&str, &str)> {
	let (key, value) = line.split_once('=').ok_or_else(|| AffyError::BadKeyValue { line: line.to_owned() })?;
	Ok((key.trim(), value.trim()))
}

/// Read the next line as `key=value`, requiring the given key (case-insensitive).
pub fn expect_key<'a>(reader: &mut LineReader<'a>, key: &str) -> Result<&'a str> {
	let line = reader.next_line().ok_or_else(|| AffyError::Missing { what: format!("{key}= line") })?;
	let (found, value) = split_key_value(line)?;
	if !found.eq_ignore_ascii_case(key) {
		return Err(AffyError::malformed("key-value line", format!("expected {key}=, found {found}=")));
	}
	Ok(value)
}

#[cfg(test)]
mod tests {
	use super::{LineReader, split_key_value};
	use crate::affy::ErrorKind;

	#[test]
	fn handles_every_line_ending_and_skips_blanks() {
		let mut reader = LineReader::new("a\r\nb\rc\n\n  \r\n d  \n");
		let lines: Vec<&str> = std::iter::from_fn(|| reader.next_line()).collect();
		assert_eq!(lines, vec!["a", "b", "c", "d"]);
	}

	#[test]
	fn unget_is_one_line_deep() {
		let mut reader = LineReader::new("first\nsecond\n");
		assert_eq!(reader.next_line(), Some("first"));
		reader.unget().expect("first unget");
		let err = reader.unget().expect_err("second unget");
		assert_eq!(err.kind(), ErrorKind::InvalidArgument);
		assert_eq!(reader.next_line(), Some("first"));
		assert_eq!(reader.next_line(), Some("second"));
		assert_eq!(reader.next_line(), None);
	}

	#[test]
	fn unget_before_any_read_is_rejected() {
		let mut reader = LineReader::new("x\n");
		assert!(reader.unget().is_err());
	}

	#[test]
	fn skip_to_next_header_pushes_header_back() {
		let mut reader = LineReader::new("junk=1\nmore\n[MASKS]\nNumberCells=0\n");
		assert_eq!(reader.skip_to_next_header(), Some("[MASKS]"));
		assert_eq!(reader.next_line(), Some("[MASKS]"));
		assert_eq!(reader.next_line(), Some("NumberCells=0"));
		assert_eq!(reader.skip_to_next_header(), None);
	}

	#[test]
	fn key_value_split_requires_equals() {
		assert_eq!(split_key_value("Cols = 712").expect("split"), ("Cols", "712"));
		assert_eq!(split_key_value("Cols 712").expect_err("no equals").kind(), ErrorKind::Format);
	}
}

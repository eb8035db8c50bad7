use std::path::Path;

use tracing::debug;

use crate::affy::{AffyError, Result};

/// Read a single-column name list, keeping the first tab-separated field of
/// each non-blank line, sorted for binary search.
pub fn load_name_list(path: impl AsRef<Path>) -> Result<Vec<String>> {
	let path = path.as_ref();
	let text = std::fs::read_to_string(path).map_err(|err| match err.kind() {
		std::io::ErrorKind::NotFound => AffyError::NotFound {
			what: format!("name list {}", path.display()),
		},
		_ => AffyError::Io(err),
	})?;

	let mut names: Vec<String> = text
		.lines()
		.filter_map(|line| line.split('\t').next())
		.map(str::trim)
		.filter(|name| !name.is_empty())
		.map(str::to_owned)
		.collect();
	names.sort_unstable();
	debug!(path = %path.display(), count = names.len(), "name list loaded");
	Ok(names)
}

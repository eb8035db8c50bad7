use affyio::affy::{AffyError, Result};

/// Print `value` as pretty JSON on stdout.
pub(crate) fn emit_json<T: serde::Serialize>(value: &T) -> Result<()> {
	let text = serde_json::to_string_pretty(value).map_err(|err| AffyError::InvalidArgument {
		reason: format!("json encoding failed: {err}"),
	})?;
	println!("{text}");
	Ok(())
}

/// Parse `AxB` (or `A,B`) into two unsigned integers.
pub(crate) fn parse_pair(value: &str) -> Result<(usize, usize)> {
	let bad = || AffyError::InvalidArgument {
		reason: format!("expected two integers like 10x20, got {value:?}"),
	};
	let (left, right) = value.split_once(['x', 'X', ',']).ok_or_else(bad)?;
	let left = left.trim().parse().map_err(|_| bad())?;
	let right = right.trim().parse().map_err(|_| bad())?;
	Ok((left, right))
}

/// Render an optional label, `-` when absent.
pub(crate) fn or_dash(value: Option<&str>) -> &str {
	value.unwrap_or("-")
}

#[cfg(test)]
mod tests {
	use super::parse_pair;

	#[test]
	fn pairs_accept_both_separators() {
		assert_eq!(parse_pair("712x712").expect("x separator"), (712, 712));
		assert_eq!(parse_pair("3, 4").expect("comma separator"), (3, 4));
		assert!(parse_pair("12").is_err());
		assert!(parse_pair("ax2").is_err());
	}
}

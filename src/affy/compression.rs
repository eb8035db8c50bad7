use std::fs;
use std::io::Read;
use std::path::Path;

use crate::affy::{AffyError, Result};

/// Default ceiling for transparently decompressed inputs.
pub const MAX_DECOMPRESSED_BYTES: usize = 1024 * 1024 * 1024;
/// zstd frame magic.
pub const ZSTD_MAGIC: [u8; 4] = [0x28, 0xB5, 0x2F, 0xFD];

/// Compression mode detected for a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
	/// Raw uncompressed stream.
	None,
	/// zstd-compressed stream.
	Zstd,
}

impl Compression {
	/// Render compression mode as a stable lowercase label.
	pub fn as_str(self) -> &'static str {
		match self {
			Self::None => "none",
			Self::Zstd => "zstd",
		}
	}
}

/// Read a whole file, decompressing it when it carries a zstd frame.
pub fn read_source(path: impl AsRef<Path>, limit: usize) -> Result<(Compression, Vec<u8>)> {
	let raw = fs::read(path)?;
	decode_bytes(raw, limit)
}

/// Detect and decode compression, returning `(mode, decoded_bytes)`.
pub fn decode_bytes(raw: Vec<u8>, limit: usize) -> Result<(Compression, Vec<u8>)> {
	if raw.starts_with(&ZSTD_MAGIC) {
		let out = decode_zstd(&raw, limit)?;
		return Ok((Compression::Zstd, out));
	}

	Ok((Compression::None, raw))
}

fn decode_zstd(raw: &[u8], limit: usize) -> Result<Vec<u8>> {
	let mut decoder = zstd::stream::read::Decoder::new(raw)?;
	let mut out = Vec::new();
	let mut buf = [0_u8; 8192];

	loop {
		let read = decoder.read(&mut buf)?;
		if read == 0 {
			break;
		}

		if out.len() + read > limit {
			return Err(AffyError::DecompressedTooLarge { limit });
		}

		out.extend_from_slice(&buf[..read]);
	}

	Ok(out)
}

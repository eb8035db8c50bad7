use crate::affy::{AffyError, Result};

/// Byte order applied to a multi-byte read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endianness {
	/// Least-significant byte first.
	Little,
	/// Most-significant byte first.
	Big,
	/// Host order, no swapping.
	Native,
}

/// Simple bounded cursor over an immutable byte slice.
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
	bytes: &'a [u8],
	pos: usize,
}

macro_rules! read_number {
	($(#[$doc:meta] $name:ident -> $ty:ty),* $(,)?) => {
		$(
			#[$doc]
			pub fn $name(&mut self, endianness: Endianness) -> Result<$ty> {
				let buf = self.read_array()?;
				Ok(match endianness {
					Endianness::Little => <$ty>::from_le_bytes(buf),
					Endianness::Big => <$ty>::from_be_bytes(buf),
					Endianness::Native => <$ty>::from_ne_bytes(buf),
				})
			}
		)*
	};
}

impl<'a> Cursor<'a> {
	/// Create a cursor at position 0.
	pub fn new(bytes: &'a [u8]) -> Self {
		Self { bytes, pos: 0 }
	}

	/// Return current byte offset.
	pub fn pos(&self) -> usize {
		self.pos
	}

	/// Total length of the underlying slice.
	pub fn len(&self) -> usize {
		self.bytes.len()
	}

	/// True when the underlying slice is empty.
	pub fn is_empty(&self) -> bool {
		self.bytes.is_empty()
	}

	/// Return remaining unread bytes.
	pub fn remaining(&self) -> usize {
		self.bytes.len().saturating_sub(self.pos)
	}

	/// Move to an absolute offset. Seeking to the end is allowed.
	pub fn seek_to(&mut self, pos: usize) -> Result<()> {
		if pos > self.bytes.len() {
			return Err(AffyError::SeekOutOfRange {
				at: self.pos,
				offset: i64::try_from(pos).unwrap_or(i64::MAX),
				len: self.bytes.len(),
			});
		}
		self.pos = pos;
		Ok(())
	}

	/// Move by a signed displacement relative to the current offset.
	pub fn seek_by(&mut self, offset: i64) -> Result<()> {
		let target = i64::try_from(self.pos).ok().and_then(|pos| pos.checked_add(offset));
		match target.and_then(|target| usize::try_from(target).ok()) {
			Some(target) if target <= self.bytes.len() => {
				self.pos = target;
				Ok(())
			}
			_ => Err(AffyError::SeekOutOfRange {
				at: self.pos,
				offset,
				len: self.bytes.len(),
			}),
		}
	}

	/// Skip `n` bytes, failing like a read when fewer remain.
	pub fn skip(&mut self, n: usize) -> Result<()> {
		let _ = self.read_exact(n)?;
		Ok(())
	}

	/// Read exactly `n` bytes and advance cursor.
	pub fn read_exact(&mut self, n: usize) -> Result<&'a [u8]> {
		if n > self.remaining() {
			return Err(AffyError::UnexpectedEof {
				at: self.pos,
				need: n,
				rem: self.remaining(),
			});
		}

		let start = self.pos;
		self.pos += n;
		Ok(&self.bytes[start..self.pos])
	}

	fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
		let raw = self.read_exact(N)?;
		let mut out = [0_u8; N];
		out.copy_from_slice(raw);
		Ok(out)
	}

	/// Read one byte.
	pub fn read_u8(&mut self) -> Result<u8> {
		let [byte] = self.read_array()?;
		Ok(byte)
	}

	/// Read a little-endian `i32`.
	pub fn read_i32_le(&mut self) -> Result<i32> {
		self.read_i32(Endianness::Little)
	}

	/// Read a big-endian `i32`.
	pub fn read_i32_be(&mut self) -> Result<i32> {
		self.read_i32(Endianness::Big)
	}

	/// Read a big-endian `u32`.
	pub fn read_u32_be(&mut self) -> Result<u32> {
		self.read_u32(Endianness::Big)
	}

	read_number! {
		/// Read a `u16` using the selected endianness.
		read_u16 -> u16,
		/// Read an `i16` using the selected endianness.
		read_i16 -> i16,
		/// Read a `u32` using the selected endianness.
		read_u32 -> u32,
		/// Read an `i32` using the selected endianness.
		read_i32 -> i32,
		/// Read a `u64` using the selected endianness.
		read_u64 -> u64,
		/// Read an `f32` using the selected endianness.
		read_f32 -> f32,
		/// Read an `f64` using the selected endianness.
		read_f64 -> f64,
	}
}

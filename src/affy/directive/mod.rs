//! Scanf-like decoder for packed binary records.
//!
//! A directive string such as `"%2Dl%hl"` is parsed once into a list of
//! [`Directive`] values and then interpreted against a [`Cursor`]:
//!
//! - `%[*|N]{c,h,d,f,D}[l|b]` reads 1/2/4/8-byte values (`D` reads a 4-byte
//!   float and widens it), little- or big-endian, or host order without a suffix.
//! - `N` fills N separate destinations, `*` fills one destination with a count
//!   taken from the next runtime argument.
//! - `%x` seeks relative to the current offset by the next runtime argument.

use std::fmt;
use std::str::FromStr;

use crate::affy::bytes::{Cursor, Endianness};
use crate::affy::{AffyError, Result};

/// Primitive width of one value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Width {
	/// `c`: one byte.
	Byte,
	/// `h`: two bytes.
	Short,
	/// `d` or `D`: four bytes.
	Int,
	/// `f`: eight bytes.
	Long,
}

impl Width {
	/// Size in bytes.
	pub fn bytes(self) -> usize {
		match self {
			Self::Byte => 1,
			Self::Short => 2,
			Self::Int => 4,
			Self::Long => 8,
		}
	}
}

/// How many values one directive produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Repeat {
	/// Single value.
	One,
	/// `N` values, each its own destination.
	Fixed(usize),
	/// Count supplied by the next runtime argument, one array destination.
	Runtime,
}

/// What a directive does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectiveKind {
	/// Read typed values.
	Read {
		/// Stored width.
		width: Width,
		/// Byte order on disk.
		endian: Endianness,
		/// Read a 4-byte float, produce an 8-byte float.
		widen: bool,
	},
	/// Relative seek by a runtime argument.
	Seek,
}

/// One parsed directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Directive {
	/// Operation.
	pub kind: DirectiveKind,
	/// Repeat specification.
	pub repeat: Repeat,
}

/// Parsed directive sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directives {
	source: String,
	items: Vec<Directive>,
}

impl Directives {
	/// Parse a directive string.
	pub fn parse(source: &str) -> Result<Self> {
		let chars: Vec<char> = source.chars().collect();
		let mut items = Vec::new();
		let mut pos = 0;
		let bad = |pos: usize| AffyError::InvalidDirective {
			directive: source.to_owned(),
			pos,
		};

		while pos < chars.len() {
			if chars[pos].is_whitespace() {
				pos += 1;
				continue;
			}
			if chars[pos] != '%' {
				return Err(bad(pos));
			}
			pos += 1;

			let mut repeat = Repeat::One;
			if chars.get(pos) == Some(&'*') {
				repeat = Repeat::Runtime;
				pos += 1;
			} else {
				let start = pos;
				while chars.get(pos).is_some_and(char::is_ascii_digit) {
					pos += 1;
				}
				if pos > start {
					let digits: String = chars[start..pos].iter().collect();
					let count = digits.parse::<usize>().map_err(|_| bad(start))?;
					if count == 0 {
						return Err(bad(start));
					}
					repeat = Repeat::Fixed(count);
				}
			}

			let (width, widen) = match chars.get(pos) {
				Some('c') => (Width::Byte, false),
				Some('h') => (Width::Short, false),
				Some('d') => (Width::Int, false),
				Some('f') => (Width::Long, false),
				Some('D') => (Width::Int, true),
				Some('x') if repeat == Repeat::One => {
					items.push(Directive {
						kind: DirectiveKind::Seek,
						repeat,
					});
					pos += 1;
					continue;
				}
				_ => return Err(bad(pos)),
			};
			pos += 1;

			let endian = match chars.get(pos) {
				Some('l') => {
					pos += 1;
					Endianness::Little
				}
				Some('b') => {
					pos += 1;
					Endianness::Big
				}
				_ => Endianness::Native,
			};

			items.push(Directive {
				kind: DirectiveKind::Read { width, endian, widen },
				repeat,
			});
		}

		Ok(Self {
			source: source.to_owned(),
			items,
		})
	}

	/// Number of directives.
	pub fn len(&self) -> usize {
		self.items.len()
	}

	/// True when the string held no directives.
	pub fn is_empty(&self) -> bool {
		self.items.is_empty()
	}

	/// Iterate parsed directives.
	pub fn iter(&self) -> impl Iterator<Item = &Directive> {
		self.items.iter()
	}

	/// Original directive string.
	pub fn source(&self) -> &str {
		&self.source
	}
}

impl FromStr for Directives {
	type Err = AffyError;

	fn from_str(source: &str) -> Result<Self> {
		Self::parse(source)
	}
}

impl fmt::Display for Directives {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.source)
	}
}

/// Raw decoded primitive, interpreted by the caller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Field {
	/// One byte.
	Byte(u8),
	/// Two bytes.
	Short(u16),
	/// Four bytes.
	Int(u32),
	/// Eight bytes.
	Long(u64),
	/// Four-byte float widened to eight bytes.
	Widened(f64),
}

impl Field {
	/// Encode an `i16`.
	pub fn from_i16(value: i16) -> Self {
		Self::Short(value as u16)
	}

	/// Encode an `i32`.
	pub fn from_i32(value: i32) -> Self {
		Self::Int(value as u32)
	}

	/// Encode an `f32` bit pattern.
	pub fn from_f32(value: f32) -> Self {
		Self::Int(value.to_bits())
	}

	/// Encode an `f64` bit pattern.
	pub fn from_f64(value: f64) -> Self {
		Self::Long(value.to_bits())
	}

	/// Stored width.
	pub fn width(self) -> Width {
		match self {
			Self::Byte(_) => Width::Byte,
			Self::Short(_) => Width::Short,
			Self::Int(_) | Self::Widened(_) => Width::Int,
			Self::Long(_) => Width::Long,
		}
	}

	/// Byte as unsigned.
	pub fn as_u8(self) -> Option<u8> {
		match self {
			Self::Byte(v) => Some(v),
			_ => None,
		}
	}

	/// Two bytes as unsigned.
	pub fn as_u16(self) -> Option<u16> {
		match self {
			Self::Short(v) => Some(v),
			_ => None,
		}
	}

	/// Two bytes as signed.
	pub fn as_i16(self) -> Option<i16> {
		self.as_u16().map(|v| v as i16)
	}

	/// Four bytes as unsigned.
	pub fn as_u32(self) -> Option<u32> {
		match self {
			Self::Int(v) => Some(v),
			_ => None,
		}
	}

	/// Four bytes as signed.
	pub fn as_i32(self) -> Option<i32> {
		self.as_u32().map(|v| v as i32)
	}

	/// Four bytes as a float.
	pub fn as_f32(self) -> Option<f32> {
		self.as_u32().map(f32::from_bits)
	}

	/// Eight-byte float, or a widened four-byte float.
	pub fn as_f64(self) -> Option<f64> {
		match self {
			Self::Long(v) => Some(f64::from_bits(v)),
			Self::Widened(v) => Some(v),
			_ => None,
		}
	}
}

/// One destination filled by a directive.
#[derive(Debug, Clone, PartialEq)]
pub enum Slot {
	/// Scalar destination.
	Value(Field),
	/// Array destination filled by a `*` directive.
	Array(Vec<Field>),
}

/// Result of one decoder call.
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
	/// Directives processed; equals the directive count on success.
	pub processed: usize,
	slots: Vec<Slot>,
}

impl Decoded {
	/// Destinations in directive order.
	pub fn slots(&self) -> &[Slot] {
		&self.slots
	}

	/// Sequential typed reader over all destinations.
	pub fn fields(&self) -> FieldReader<'_> {
		FieldReader { slots: &self.slots, next: 0 }
	}
}

/// Typed sequential access to decoded destinations.
pub struct FieldReader<'a> {
	slots: &'a [Slot],
	next: usize,
}

macro_rules! take_scalar {
	($(#[$doc:meta] $name:ident => $conv:ident -> $ty:ty),* $(,)?) => {
		$(
			#[$doc]
			pub fn $name(&mut self) -> Result<$ty> {
				let index = self.next;
				match self.slots.get(index) {
					Some(Slot::Value(field)) => {
						self.next += 1;
						field.$conv().ok_or_else(|| AffyError::DirectiveValueMismatch {
							index,
							got: format!("{field:?}"),
						})
					}
					other => Err(AffyError::DirectiveValueMismatch {
						index,
						got: format!("{other:?}"),
					}),
				}
			}
		)*
	};
}

impl FieldReader<'_> {
	take_scalar! {
		/// Next destination as `u8`.
		u8 => as_u8 -> u8,
		/// Next destination as `u16`.
		u16 => as_u16 -> u16,
		/// Next destination as `i16`.
		i16 => as_i16 -> i16,
		/// Next destination as `u32`.
		u32 => as_u32 -> u32,
		/// Next destination as `i32`.
		i32 => as_i32 -> i32,
		/// Next destination as `f32`.
		f32 => as_f32 -> f32,
		/// Next destination as `f64`.
		f64 => as_f64 -> f64,
	}

	/// Next destination as an array.
	pub fn array(&mut self) -> Result<&[Field]> {
		let index = self.next;
		match self.slots.get(index) {
			Some(Slot::Array(items)) => {
				self.next += 1;
				Ok(items)
			}
			other => Err(AffyError::DirectiveValueMismatch {
				index,
				got: format!("{other:?}"),
			}),
		}
	}
}

fn runtime_arg(args: &[i64], next_arg: &mut usize, index: usize) -> Result<i64> {
	let value = args.get(*next_arg).copied().ok_or(AffyError::MissingDirectiveArg { index })?;
	*next_arg += 1;
	Ok(value)
}

fn runtime_count(args: &[i64], next_arg: &mut usize, index: usize) -> Result<usize> {
	let value = runtime_arg(args, next_arg, index)?;
	usize::try_from(value).map_err(|_| AffyError::invalid_argument(format!("directive {index} got negative count {value}")))
}

fn read_field(cur: &mut Cursor<'_>, width: Width, endian: Endianness, widen: bool) -> Result<Field> {
	if widen {
		return Ok(Field::Widened(f64::from(cur.read_f32(endian)?)));
	}
	Ok(match width {
		Width::Byte => Field::Byte(cur.read_u8()?),
		Width::Short => Field::Short(cur.read_u16(endian)?),
		Width::Int => Field::Int(cur.read_u32(endian)?),
		Width::Long => Field::Long(cur.read_u64(endian)?),
	})
}

/// Interpret `directives` against `cur`, consuming `args` for `*` and `x`.
///
/// A short read aborts the call with the cursor rewound to the start of the
/// failing directive; no partially-read values are returned.
pub fn decode(cur: &mut Cursor<'_>, directives: &Directives, args: &[i64]) -> Result<Decoded> {
	let mut slots = Vec::new();
	let mut next_arg = 0;

	for (index, directive) in directives.iter().enumerate() {
		let start = cur.pos();
		let step = decode_one(cur, directive, index, args, &mut next_arg, &mut slots);
		if let Err(err) = step {
			cur.seek_to(start)?;
			return Err(err);
		}
	}

	Ok(Decoded {
		processed: directives.len(),
		slots,
	})
}

fn decode_one(cur: &mut Cursor<'_>, directive: &Directive, index: usize, args: &[i64], next_arg: &mut usize, slots: &mut Vec<Slot>) -> Result<()> {
	let DirectiveKind::Read { width, endian, widen } = directive.kind else {
		let offset = runtime_arg(args, next_arg, index)?;
		return cur.seek_by(offset);
	};

	match directive.repeat {
		Repeat::One => slots.push(Slot::Value(read_field(cur, width, endian, widen)?)),
		Repeat::Fixed(count) => {
			ensure_available(cur, count, width)?;
			let mut staged = Vec::with_capacity(count);
			for _ in 0..count {
				staged.push(Slot::Value(read_field(cur, width, endian, widen)?));
			}
			slots.extend(staged);
		}
		Repeat::Runtime => {
			let count = runtime_count(args, next_arg, index)?;
			ensure_available(cur, count, width)?;
			let mut items = Vec::with_capacity(count);
			for _ in 0..count {
				items.push(read_field(cur, width, endian, widen)?);
			}
			slots.push(Slot::Array(items));
		}
	}
	Ok(())
}

/// Reject a repeat whose fields cannot all fit in the rest of the buffer.
fn ensure_available(cur: &Cursor<'_>, count: usize, width: Width) -> Result<()> {
	let need = count.checked_mul(width.bytes()).unwrap_or(usize::MAX);
	if need > cur.remaining() {
		return Err(AffyError::UnexpectedEof {
			at: cur.pos(),
			need,
			rem: cur.remaining(),
		});
	}
	Ok(())
}

/// Parse and interpret a directive string in one call.
pub fn decode_str(cur: &mut Cursor<'_>, directives: &str, args: &[i64]) -> Result<Decoded> {
	decode(cur, &Directives::parse(directives)?, args)
}

fn write_field(out: &mut Vec<u8>, index: usize, field: Field, width: Width, endian: Endianness, widen: bool) -> Result<()> {
	let mismatch = || AffyError::DirectiveValueMismatch {
		index,
		got: format!("{field:?}"),
	};

	macro_rules! put {
		($value:expr) => {
			out.extend_from_slice(&match endian {
				Endianness::Little => $value.to_le_bytes(),
				Endianness::Big => $value.to_be_bytes(),
				Endianness::Native => $value.to_ne_bytes(),
			})
		};
	}

	match (field, width, widen) {
		(Field::Widened(v), Width::Int, true) => put!(v as f32),
		(Field::Byte(v), Width::Byte, false) => out.push(v),
		(Field::Short(v), Width::Short, false) => put!(v),
		(Field::Int(v), Width::Int, false) => put!(v),
		(Field::Long(v), Width::Long, false) => put!(v),
		_ => return Err(mismatch()),
	}
	Ok(())
}

/// Encode `values` with the same directive language the decoder reads.
///
/// `x` directives emit zero padding of the runtime argument's length.
/// Returns the number of directives processed.
pub fn encode(out: &mut Vec<u8>, directives: &Directives, args: &[i64], values: &[Field]) -> Result<usize> {
	let mut next_arg = 0;
	let mut next_value = 0;
	let mut take = |index: usize| -> Result<Field> {
		let value = values.get(next_value).copied().ok_or_else(|| AffyError::DirectiveValueMismatch {
			index,
			got: "no value".to_owned(),
		})?;
		next_value += 1;
		Ok(value)
	};

	for (index, directive) in directives.iter().enumerate() {
		let DirectiveKind::Read { width, endian, widen } = directive.kind else {
			let pad = runtime_count(args, &mut next_arg, index)?;
			out.try_reserve(pad)
				.map_err(|_| AffyError::invalid_argument(format!("directive {index} padding of {pad} bytes cannot be allocated")))?;
			out.resize(out.len() + pad, 0);
			continue;
		};

		let count = match directive.repeat {
			Repeat::One => 1,
			Repeat::Fixed(count) => count,
			Repeat::Runtime => runtime_count(args, &mut next_arg, index)?,
		};
		for _ in 0..count {
			write_field(out, index, take(index)?, width, endian, widen)?;
		}
	}

	Ok(directives.len())
}

/// Parse and encode a directive string in one call.
pub fn encode_str(out: &mut Vec<u8>, directives: &str, args: &[i64], values: &[Field]) -> Result<usize> {
	encode(out, &Directives::parse(directives)?, args, values)
}

#[cfg(test)]
mod tests;

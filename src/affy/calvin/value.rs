use crate::affy::bytes::{Cursor, Endianness};
use crate::affy::{AffyError, Result};

/// Column and parameter value types, indexed by their on-disk type code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
	/// Signed 8-bit integer.
	Int8,
	/// Unsigned 8-bit integer.
	UInt8,
	/// Signed 16-bit integer.
	Int16,
	/// Unsigned 16-bit integer.
	UInt16,
	/// Signed 32-bit integer.
	Int32,
	/// Unsigned 32-bit integer.
	UInt32,
	/// 32-bit float.
	Float,
	/// 64-bit float.
	Double,
	/// Length-prefixed single-byte text.
	Text,
	/// Length-prefixed UTF-16 text.
	WideText,
}

impl ValueType {
	const TABLE: [(Self, Option<&'static str>); 10] = [
		(Self::Int8, Some("text/x-calvin-integer-8")),
		(Self::UInt8, Some("text/x-calvin-unsigned-integer-8")),
		(Self::Int16, Some("text/x-calvin-integer-16")),
		(Self::UInt16, Some("text/x-calvin-unsigned-integer-16")),
		(Self::Int32, Some("text/x-calvin-integer-32")),
		(Self::UInt32, Some("text/x-calvin-unsigned-integer-32")),
		(Self::Float, Some("text/x-calvin-float")),
		(Self::Double, None),
		(Self::Text, Some("text/ascii")),
		(Self::WideText, Some("text/plain")),
	];

	/// Resolve a column type code.
	pub fn from_code(code: u8) -> Result<Self> {
		Self::TABLE
			.get(usize::from(code))
			.map(|(kind, _)| *kind)
			.ok_or_else(|| AffyError::malformed("calvin column", format!("unknown type code {code}")))
	}

	/// On-disk type code.
	pub fn code(self) -> u8 {
		Self::TABLE.iter().position(|(kind, _)| *kind == self).unwrap_or_default() as u8
	}

	/// Resolve a parameter MIME label; unknown labels yield `None`.
	pub fn from_label(label: &str) -> Option<Self> {
		Self::TABLE.iter().find(|(_, item)| *item == Some(label)).map(|(kind, _)| *kind)
	}

	/// MIME label written next to parameters of this type.
	pub fn label(self) -> Option<&'static str> {
		Self::TABLE.iter().find(|(kind, _)| *kind == self).and_then(|(_, label)| *label)
	}

	/// Byte width of fixed-size types.
	pub fn fixed_size(self) -> Option<usize> {
		match self {
			Self::Int8 | Self::UInt8 => Some(1),
			Self::Int16 | Self::UInt16 => Some(2),
			Self::Int32 | Self::UInt32 | Self::Float => Some(4),
			Self::Double => Some(8),
			Self::Text | Self::WideText => None,
		}
	}

	/// True for the numeric types.
	pub fn is_numeric(self) -> bool {
		self.fixed_size().is_some()
	}
}

/// Decoded parameter value.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(untagged)]
pub enum ParamValue {
	/// Signed 8-bit integer.
	Int8(i8),
	/// Unsigned 8-bit integer.
	UInt8(u8),
	/// Signed 16-bit integer.
	Int16(i16),
	/// Unsigned 16-bit integer.
	UInt16(u16),
	/// Signed 32-bit integer.
	Int32(i32),
	/// Unsigned 32-bit integer.
	UInt32(u32),
	/// 32-bit float.
	Float(f32),
	/// 64-bit float.
	Double(f64),
	/// Text of either encoding.
	Text(String),
	/// Value whose MIME label is not recognized; raw bytes kept.
	Unknown(Vec<u8>),
}

impl ParamValue {
	/// Borrow as text.
	pub fn as_str(&self) -> Option<&str> {
		match self {
			Self::Text(text) => Some(text),
			_ => None,
		}
	}

	/// Widen any integer variant.
	pub fn as_i64(&self) -> Option<i64> {
		match *self {
			Self::Int8(v) => Some(i64::from(v)),
			Self::UInt8(v) => Some(i64::from(v)),
			Self::Int16(v) => Some(i64::from(v)),
			Self::UInt16(v) => Some(i64::from(v)),
			Self::Int32(v) => Some(i64::from(v)),
			Self::UInt32(v) => Some(i64::from(v)),
			_ => None,
		}
	}

	/// Widen any numeric variant.
	pub fn as_f64(&self) -> Option<f64> {
		match *self {
			Self::Float(v) => Some(f64::from(v)),
			Self::Double(v) => Some(v),
			_ => self.as_i64().map(|v| v as f64),
		}
	}
}

/// Read one big-endian numeric value of `kind`.
pub(crate) fn read_number(cur: &mut Cursor<'_>, kind: ValueType) -> Result<ParamValue> {
	let be = Endianness::Big;
	Ok(match kind {
		ValueType::Int8 => ParamValue::Int8(cur.read_u8()? as i8),
		ValueType::UInt8 => ParamValue::UInt8(cur.read_u8()?),
		ValueType::Int16 => ParamValue::Int16(cur.read_i16(be)?),
		ValueType::UInt16 => ParamValue::UInt16(cur.read_u16(be)?),
		ValueType::Int32 => ParamValue::Int32(cur.read_i32(be)?),
		ValueType::UInt32 => ParamValue::UInt32(cur.read_u32(be)?),
		ValueType::Float => ParamValue::Float(cur.read_f32(be)?),
		ValueType::Double => ParamValue::Double(cur.read_f64(be)?),
		ValueType::Text | ValueType::WideText => {
			return Err(AffyError::invalid_argument("text value read as a number"));
		}
	})
}

fn length(cur: &mut Cursor<'_>, what: &'static str) -> Result<usize> {
	let at = cur.pos();
	let len = cur.read_i32_be()?;
	usize::try_from(len).map_err(|_| AffyError::malformed(what, format!("negative length {len} at offset {at}")))
}

fn trim_nul(text: &str) -> &str {
	text.trim_end_matches('\0')
}

/// Single-byte text prefixed by a big-endian byte count.
pub(crate) fn read_string(cur: &mut Cursor<'_>) -> Result<String> {
	let len = length(cur, "calvin string")?;
	let raw = cur.read_exact(len)?;
	Ok(trim_nul(&String::from_utf8_lossy(raw)).to_owned())
}

/// UTF-16BE text prefixed by a big-endian character count.
///
/// A short read yields an empty string so truncated files stay loadable.
pub(crate) fn read_wstring(cur: &mut Cursor<'_>) -> Result<String> {
	let len = length(cur, "calvin wide string")?;
	match len.checked_mul(2).map(|bytes| cur.read_exact(bytes)) {
		Some(Ok(raw)) => Ok(decode_utf16(raw)),
		_ => {
			let rest = cur.remaining();
			cur.skip(rest)?;
			Ok(String::new())
		}
	}
}

pub(crate) fn decode_utf16(raw: &[u8]) -> String {
	let units: Vec<u16> = raw.chunks_exact(2).map(|pair| u16::from_be_bytes([pair[0], pair[1]])).collect();
	trim_nul(&String::from_utf16_lossy(&units)).to_owned()
}

/// Decode a parameter value blob according to its MIME label.
pub(crate) fn decode_param(raw: &[u8], label: &str) -> Result<ParamValue> {
	match ValueType::from_label(label) {
		Some(ValueType::Text) => Ok(ParamValue::Text(trim_nul(&String::from_utf8_lossy(raw)).to_owned())),
		Some(ValueType::WideText) => Ok(ParamValue::Text(decode_utf16(raw))),
		Some(kind) => read_number(&mut Cursor::new(raw), kind),
		None => Ok(ParamValue::Unknown(raw.to_vec())),
	}
}

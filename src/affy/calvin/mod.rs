use std::fmt;
use std::path::Path;

use tracing::{debug, warn};

use crate::affy::bytes::Cursor;
use crate::affy::compression::{MAX_DECOMPRESSED_BYTES, read_source};
use crate::affy::{AffyError, Result};

mod value;

/// Parameter and column value types.
pub use value::{ParamValue, ValueType};

use value::{read_string, read_wstring};

/// One-byte magic opening a generic container file.
pub const CALVIN_MAGIC: u8 = 59;

/// Offset of the top-level data header.
const DATA_HEADER_OFFSET: usize = 10;

/// Parent chains deeper than this are treated as corrupt.
const MAX_PARENT_DEPTH: usize = 64;

/// Named, typed parameter.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Param {
	/// Parameter name.
	pub name: String,
	/// MIME type label as written in the file.
	pub type_label: String,
	/// Decoded value.
	pub value: ParamValue,
}

fn find_in<'a>(params: &'a [Param], name: &str) -> Option<&'a Param> {
	params.iter().find(|param| param.name.eq_ignore_ascii_case(name))
}

/// Data header with its parameter dictionary and parent headers.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct DataHeader {
	/// Type GUID.
	pub type_identifier: String,
	/// File GUID.
	pub file_identifier: String,
	/// Creation timestamp.
	pub timestamp: String,
	/// Locale tag.
	pub locale: String,
	/// Parameter dictionary.
	pub params: Vec<Param>,
	/// Headers of the files this one was derived from.
	pub parents: Vec<DataHeader>,
}

impl DataHeader {
	/// Case-insensitive parameter lookup in this header only.
	pub fn find_param(&self, name: &str) -> Option<&Param> {
		find_in(&self.params, name)
	}
}

/// Column descriptor inside a data set.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Column {
	/// Column name.
	pub name: String,
	/// Value type.
	pub kind: ValueType,
	/// Width of the column in each row, in bytes.
	pub size: usize,
}

/// Data set metadata. Row payload stays in the file buffer.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct DataSet {
	/// Data set name.
	pub name: String,
	/// Parameter dictionary.
	pub params: Vec<Param>,
	/// Column layout of one row.
	pub columns: Vec<Column>,
	/// Number of rows.
	pub num_rows: usize,
	/// Absolute offset of the first row.
	pub data_offset: usize,
}

impl DataSet {
	/// Bytes per row.
	pub fn row_len(&self) -> usize {
		self.columns.iter().map(|column| column.size).sum()
	}

	/// Case-insensitive parameter lookup.
	pub fn find_param(&self, name: &str) -> Option<&Param> {
		find_in(&self.params, name)
	}

	/// Case-insensitive column lookup returning the index and byte offset within a row.
	pub fn find_column(&self, name: &str) -> Option<(usize, usize)> {
		let mut offset = 0;
		for (index, column) in self.columns.iter().enumerate() {
			if column.name.eq_ignore_ascii_case(name) {
				return Some((index, offset));
			}
			offset += column.size;
		}
		None
	}
}

/// Group of data sets.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct DataGroup {
	/// Group name.
	pub name: String,
	/// Declared data set count.
	pub declared_datasets: usize,
	/// Data sets that could be read.
	pub datasets: Vec<DataSet>,
}

/// Parsed generic container.
#[derive(Clone)]
pub struct CalvinFile {
	/// Container version byte.
	pub version: u8,
	/// Declared data group count.
	pub num_datagroups: usize,
	/// Top-level data header.
	pub header: DataHeader,
	/// Data groups in file order.
	pub groups: Vec<DataGroup>,
	bytes: Vec<u8>,
}

impl fmt::Debug for CalvinFile {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("CalvinFile")
			.field("version", &self.version)
			.field("num_datagroups", &self.num_datagroups)
			.field("header", &self.header)
			.field("groups", &self.groups)
			.finish_non_exhaustive()
	}
}

impl CalvinFile {
	/// Parse container metadata from a borrowed buffer.
	pub fn parse(bytes: &[u8]) -> Result<Self> {
		Self::from_vec(bytes.to_vec())
	}

	/// Parse container metadata, keeping the buffer for row reads.
	pub fn from_vec(bytes: Vec<u8>) -> Result<Self> {
		let mut cur = Cursor::new(&bytes);

		let magic = cur.read_u8()?;
		if magic != CALVIN_MAGIC {
			return Err(AffyError::BadMagic {
				format: "calvin container",
				magic: u32::from(magic),
			});
		}
		let version = cur.read_u8()?;
		let num_datagroups = cur.read_i32_be()?;
		let num_datagroups = usize::try_from(num_datagroups).map_err(|_| AffyError::malformed("calvin file header", format!("negative data group count {num_datagroups}")))?;
		let first_group = cur.read_u32_be()? as usize;

		cur.seek_to(DATA_HEADER_OFFSET)?;
		let header = read_data_header(&mut cur, 0)?;

		let mut groups = Vec::with_capacity(num_datagroups.min(64));
		let mut offset = first_group;
		for index in 0..num_datagroups {
			let (group, next) = read_group(&mut cur, offset)?;
			debug!(index, name = %group.name, datasets = group.datasets.len(), "calvin data group");
			groups.push(group);
			offset = next;
		}

		Ok(Self {
			version,
			num_datagroups,
			header,
			groups,
			bytes,
		})
	}

	/// Raw file buffer.
	pub fn bytes(&self) -> &[u8] {
		&self.bytes
	}

	/// Case-insensitive parameter lookup in the top-level header, then its parents.
	pub fn find_param(&self, name: &str) -> Option<&Param> {
		fn walk<'a>(header: &'a DataHeader, name: &str) -> Option<&'a Param> {
			header.find_param(name).or_else(|| header.parents.iter().find_map(|parent| walk(parent, name)))
		}
		walk(&self.header, name)
	}

	/// Case-insensitive data set lookup within group `group`.
	///
	/// A data set lost to truncation is reported as absent.
	pub fn find_dataset(&self, group: usize, name: &str) -> Option<&DataSet> {
		self.groups.get(group)?.datasets.iter().find(|dataset| dataset.name.eq_ignore_ascii_case(name))
	}

	/// Read one numeric column of every row, widened to `f64`.
	pub fn read_column(&self, dataset: &DataSet, column: &str) -> Result<Vec<f64>> {
		let rows = self.read_mapped_rows(dataset, 0, dataset.num_rows, &[column])?;
		Ok(rows.into_iter().flatten().collect())
	}

	/// Read `count` rows starting at `first_row`, projecting the named numeric columns.
	///
	/// Each output row holds one value per requested column, in request order.
	pub fn read_mapped_rows(&self, dataset: &DataSet, first_row: usize, count: usize, columns: &[&str]) -> Result<Vec<Vec<f64>>> {
		let mut mapped = Vec::with_capacity(columns.len());
		for name in columns {
			let (index, offset) = dataset.find_column(name).ok_or_else(|| AffyError::Missing {
				what: format!("column {name} in data set {}", dataset.name),
			})?;
			let kind = dataset.columns[index].kind;
			if !kind.is_numeric() {
				return Err(AffyError::malformed("calvin column", format!("{}/{name} holds {kind:?}, not numbers", dataset.name)));
			}
			mapped.push((offset, kind));
		}

		let end = first_row.checked_add(count).filter(|end| *end <= dataset.num_rows).ok_or_else(|| {
			AffyError::invalid_argument(format!("rows {first_row}..{} exceed {} rows in {}", first_row.saturating_add(count), dataset.num_rows, dataset.name))
		})?;

		let row_len = dataset.row_len();
		let mut cur = Cursor::new(&self.bytes);
		let mut out = Vec::with_capacity(count);
		for row in first_row..end {
			let base = dataset.data_offset + row * row_len;
			let mut values = Vec::with_capacity(mapped.len());
			for &(offset, kind) in &mapped {
				cur.seek_to(base + offset)?;
				let value = value::read_number(&mut cur, kind)?;
				values.push(value.as_f64().unwrap_or_default());
			}
			out.push(values);
		}
		Ok(out)
	}

	/// Generic heterogeneous row extraction is not provided.
	pub fn read_rows(&self, dataset: &DataSet) -> Result<Vec<Vec<ParamValue>>> {
		Err(AffyError::Unsupported {
			what: format!("generic row extraction for data set {}", dataset.name),
		})
	}
}

fn count(cur: &mut Cursor<'_>, what: &'static str) -> Result<usize> {
	let value = cur.read_i32_be()?;
	usize::try_from(value).map_err(|_| AffyError::malformed(what, format!("negative count {value}")))
}

fn read_param(cur: &mut Cursor<'_>) -> Result<Param> {
	let name = read_wstring(cur)?;
	let len = count(cur, "calvin parameter")?;
	let raw = cur.read_exact(len)?;
	let type_label = read_wstring(cur)?;
	let value = value::decode_param(raw, &type_label)?;
	Ok(Param { name, type_label, value })
}

fn read_params(cur: &mut Cursor<'_>, what: &'static str) -> Result<Vec<Param>> {
	let n = count(cur, what)?;
	let mut params = Vec::with_capacity(n.min(1024));
	for _ in 0..n {
		params.push(read_param(cur)?);
	}
	Ok(params)
}

fn read_data_header(cur: &mut Cursor<'_>, depth: usize) -> Result<DataHeader> {
	if depth > MAX_PARENT_DEPTH {
		return Err(AffyError::malformed("calvin data header", format!("parent chain deeper than {MAX_PARENT_DEPTH}")));
	}

	let type_identifier = read_string(cur)?;
	let file_identifier = read_string(cur)?;
	let timestamp = read_wstring(cur)?;
	let locale = read_wstring(cur)?;
	let params = read_params(cur, "calvin data header")?;

	let num_parents = count(cur, "calvin data header")?;
	let mut parents = Vec::with_capacity(num_parents.min(64));
	for _ in 0..num_parents {
		parents.push(read_data_header(cur, depth + 1)?);
	}

	Ok(DataHeader {
		type_identifier,
		file_identifier,
		timestamp,
		locale,
		params,
		parents,
	})
}

fn read_group(cur: &mut Cursor<'_>, offset: usize) -> Result<(DataGroup, usize)> {
	cur.seek_to(offset)?;
	let next = cur.read_u32_be()? as usize;
	let first_dataset = cur.read_u32_be()? as usize;
	let declared = cur.read_i32_be()?;
	if declared <= 0 {
		return Err(AffyError::malformed("calvin data group", format!("empty data group at offset {offset}")));
	}
	let declared = declared as usize;
	let name = read_wstring(cur)?;

	let mut datasets = Vec::with_capacity(declared.min(64));
	let mut at = first_dataset;
	for index in 0..declared {
		match read_dataset(cur, at) {
			Ok((dataset, next_dataset)) => {
				datasets.push(dataset);
				at = next_dataset;
			}
			Err(err) => {
				warn!(group = %name, index, declared, error = %err, "calvin data set unreadable, container likely truncated");
				break;
			}
		}
	}

	Ok((
		DataGroup {
			name,
			declared_datasets: declared,
			datasets,
		},
		next,
	))
}

fn read_dataset(cur: &mut Cursor<'_>, offset: usize) -> Result<(DataSet, usize)> {
	cur.seek_to(offset)?;
	let data_offset = cur.read_u32_be()? as usize;
	let next = cur.read_u32_be()? as usize;
	let name = read_wstring(cur)?;
	let params = read_params(cur, "calvin data set")?;

	let num_cols = cur.read_u32_be()? as usize;
	let mut columns = Vec::with_capacity(num_cols.min(256));
	for _ in 0..num_cols {
		let name = read_wstring(cur)?;
		let kind = ValueType::from_code(cur.read_u8()?)?;
		let size = count(cur, "calvin column")?;
		columns.push(Column { name, kind, size });
	}
	let num_rows = cur.read_u32_be()? as usize;

	let row_len: usize = columns.iter().map(|column| column.size).sum();
	let end = row_len.checked_mul(num_rows).and_then(|len| len.checked_add(data_offset));
	if end.is_none_or(|end| end > cur.len()) {
		return Err(AffyError::malformed("calvin data set", format!("{name}: {num_rows} rows of {row_len} bytes overrun the file")));
	}

	Ok((
		DataSet {
			name,
			params,
			columns,
			num_rows,
			data_offset,
		},
		next,
	))
}

/// Load and parse a container file from disk.
pub fn load_calvin_file(path: impl AsRef<Path>) -> Result<CalvinFile> {
	let (_, bytes) = read_source(path, MAX_DECOMPRESSED_BYTES)?;
	CalvinFile::from_vec(bytes)
}

#[cfg(test)]
mod tests;

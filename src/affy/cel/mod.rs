use std::path::Path;

use tracing::debug;

use crate::affy::calvin::{CALVIN_MAGIC, CalvinFile};
use crate::affy::compression::read_source;
use crate::affy::textio::{LineReader, split_key_value};
use crate::affy::{AffyError, Grid, LoadOptions, NoProgress, Progress, Result};

mod binary;
mod calvin;
mod section;
mod text;
mod write;

/// Section-level outcome and policy types.
pub use section::{RecordPolicy, Section, SectionOutcome, SectionPolicy, section_policy};
/// Variant A writer.
pub use write::{encode_binary_cel, write_binary_cel_file};

/// Magic number opening a legacy binary intensity file.
pub const BINARY_CEL_MAGIC: i32 = 64;
/// Version written by the binary encoder.
pub const BINARY_CEL_VERSION: i32 = 4;

/// Per-cell QC measurements, kept only when requested.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellQc {
	/// Standard deviation of the cell's pixels.
	pub stddev: f64,
	/// Number of pixels contributing to the cell.
	pub numpixels: i16,
}

/// One intensity record.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Cell {
	/// Mean intensity.
	pub value: f64,
	/// QC fields, when the variant carries them and retention is enabled.
	pub qc: Option<CellQc>,
}

/// On-disk encoding of an intensity file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CelFormat {
	/// Variant A: legacy little-endian binary.
	Binary,
	/// Variant B: bracketed plain text.
	Text,
	/// Variant C: generic chunked container.
	Calvin,
}

impl CelFormat {
	/// Pick the variant from leading magic bytes.
	///
	/// The one-byte container magic wins over the four-byte binary magic;
	/// anything else is treated as text.
	pub fn sniff(bytes: &[u8]) -> Self {
		if bytes.first() == Some(&CALVIN_MAGIC) {
			return Self::Calvin;
		}
		let magic = bytes.get(..4).map(|raw| i32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]));
		if magic == Some(BINARY_CEL_MAGIC) {
			return Self::Binary;
		}
		Self::Text
	}

	/// Render as a stable lowercase label.
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Binary => "binary",
			Self::Text => "text",
			Self::Calvin => "calvin",
		}
	}
}

/// Parsed intensity file.
#[derive(Debug, Clone, PartialEq)]
pub struct CelFile {
	/// Source path or label.
	pub filename: String,
	/// Variant the file was decoded from.
	pub format: CelFormat,
	/// Format version recorded in the header.
	pub version: i32,
	/// Array type named by the header, when present.
	pub array_type: Option<String>,
	/// Set when a section was truncated by salvage.
	pub corrupt: bool,
	data: Grid<Cell>,
	mask: Grid<bool>,
	outlier: Grid<bool>,
	nummasks: usize,
	numoutliers: usize,
}

impl CelFile {
	/// Allocate an empty `cols` x `rows` intensity file.
	pub fn new(filename: impl Into<String>, format: CelFormat, cols: usize, rows: usize) -> Result<Self> {
		if cols == 0 || rows == 0 {
			return Err(AffyError::InvalidDimensions {
				cols: cols as i64,
				rows: rows as i64,
			});
		}
		Ok(Self {
			filename: filename.into(),
			format,
			version: 0,
			array_type: None,
			corrupt: false,
			data: Grid::filled(cols, rows, Cell::default())?,
			mask: Grid::filled(cols, rows, false)?,
			outlier: Grid::filled(cols, rows, false)?,
			nummasks: 0,
			numoutliers: 0,
		})
	}

	/// Column count.
	pub fn numcols(&self) -> usize {
		self.data.cols()
	}

	/// Row count.
	pub fn numrows(&self) -> usize {
		self.data.rows()
	}

	/// Number of accepted mask entries. Repeated coordinates count each time;
	/// [`CelFile::mask_coords`] holds the distinct cells.
	pub fn nummasks(&self) -> usize {
		self.nummasks
	}

	/// Number of accepted outlier entries, repeats included.
	pub fn numoutliers(&self) -> usize {
		self.numoutliers
	}

	/// Intensity grid.
	pub fn cells(&self) -> &Grid<Cell> {
		&self.data
	}

	/// Bounds-checked cell lookup.
	pub fn cell(&self, x: usize, y: usize) -> Result<&Cell> {
		self.data.get(x, y).ok_or_else(|| self.out_of_range("cell", x as i64, y as i64))
	}

	/// Bounds-checked mutable cell lookup.
	pub fn cell_mut(&mut self, x: usize, y: usize) -> Result<&mut Cell> {
		let err = self.out_of_range("cell", x as i64, y as i64);
		self.data.get_mut(x, y).ok_or(err)
	}

	/// True when `(x, y)` is masked. Out-of-range coordinates are never masked.
	pub fn is_masked(&self, x: usize, y: usize) -> bool {
		self.mask.get(x, y).copied().unwrap_or(false)
	}

	/// True when `(x, y)` is an outlier. Out-of-range coordinates never are.
	pub fn is_outlier(&self, x: usize, y: usize) -> bool {
		self.outlier.get(x, y).copied().unwrap_or(false)
	}

	/// Masked coordinates, `x` outer and `y` inner.
	pub fn mask_coords(&self) -> Vec<(usize, usize)> {
		column_major(&self.mask)
	}

	/// Outlier coordinates, `x` outer and `y` inner.
	pub fn outlier_coords(&self) -> Vec<(usize, usize)> {
		column_major(&self.outlier)
	}

	/// Mark `(x, y)` as masked, rejecting out-of-range coordinates.
	pub fn set_mask(&mut self, x: i64, y: i64) -> Result<()> {
		self.flag(Section::Masks, x, y)
	}

	/// Mark `(x, y)` as an outlier, rejecting out-of-range coordinates.
	pub fn set_outlier(&mut self, x: i64, y: i64) -> Result<()> {
		self.flag(Section::Outliers, x, y)
	}

	fn flag(&mut self, section: Section, x: i64, y: i64) -> Result<()> {
		if !self.data.contains(x, y) {
			return Err(self.out_of_range(section.label(), x, y));
		}
		let (grid, count) = match section {
			Section::Outliers => (&mut self.outlier, &mut self.numoutliers),
			_ => (&mut self.mask, &mut self.nummasks),
		};
		if let Some(slot) = grid.get_mut(x as usize, y as usize) {
			*slot = true;
			*count += 1;
		}
		Ok(())
	}

	/// Dense copy of the values, indexed `[y][x]`.
	pub fn matrix(&self) -> Vec<Vec<f64>> {
		(0..self.numrows())
			.map(|y| self.data.row(y).unwrap_or(&[]).iter().map(|cell| cell.value).collect())
			.collect()
	}

	fn out_of_range(&self, section: &'static str, x: i64, y: i64) -> AffyError {
		AffyError::CoordinateOutOfRange {
			section,
			x,
			y,
			cols: self.numcols(),
			rows: self.numrows(),
		}
	}
}

fn column_major(grid: &Grid<bool>) -> Vec<(usize, usize)> {
	let mut out = Vec::new();
	for x in 0..grid.cols() {
		for y in 0..grid.rows() {
			if grid.get(x, y).copied().unwrap_or(false) {
				out.push((x, y));
			}
		}
	}
	out
}

/// Load an intensity file of any variant from disk.
pub fn load_cel_file(path: impl AsRef<Path>, options: &LoadOptions) -> Result<CelFile> {
	load_cel_file_with_progress(path, options, &mut NoProgress)
}

/// Load an intensity file, reporting progress to `progress`.
pub fn load_cel_file_with_progress(path: impl AsRef<Path>, options: &LoadOptions, progress: &mut dyn Progress) -> Result<CelFile> {
	let path = path.as_ref();
	let (_, bytes) = read_source(path, options.max_decompressed_bytes).map_err(|err| match err {
		AffyError::Io(io) if io.kind() == std::io::ErrorKind::NotFound => AffyError::NotFound {
			what: format!("intensity file {}", path.display()),
		},
		other => other,
	})?;
	parse_cel(&path.display().to_string(), &bytes, options, progress)
}

/// Decode an intensity file already held in memory.
pub fn parse_cel(filename: &str, bytes: &[u8], options: &LoadOptions, progress: &mut dyn Progress) -> Result<CelFile> {
	let format = CelFormat::sniff(bytes);
	debug!(filename, format = format.as_str(), "decoding intensity file");
	match format {
		CelFormat::Binary => binary::parse(filename, bytes, options, progress),
		CelFormat::Text => text::parse(filename, bytes, options, progress),
		CelFormat::Calvin => calvin::parse(filename, bytes, options, progress),
	}
}

/// Extract the array-type token preceding `.1sq` in a header string.
///
/// The token starts after the nearest preceding space or `0x14` byte.
pub fn array_type_from_header(header: &str) -> Result<String> {
	let end = header.find(".1sq").ok_or(AffyError::ArrayTypeNotFound)?;
	let head = &header[..end];
	let start = head.rfind([' ', '\u{14}']).map_or(0, |idx| idx + 1);
	Ok(head[start..].to_owned())
}

/// Read the declared array type of an intensity file held in memory.
pub fn get_array_type(bytes: &[u8]) -> Result<String> {
	match CelFormat::sniff(bytes) {
		CelFormat::Binary => array_type_from_header(&binary::header_text(bytes)?),
		CelFormat::Calvin => {
			let container = CalvinFile::parse(bytes)?;
			container
				.header
				.find_param("affymetrix-array-type")
				.and_then(|param| param.value.as_str().map(str::to_owned))
				.ok_or_else(|| AffyError::Missing {
					what: "affymetrix-array-type parameter".to_owned(),
				})
		}
		CelFormat::Text => {
			let text = String::from_utf8_lossy(bytes);
			let mut reader = LineReader::new(&text);
			while let Some(line) = reader.next_line() {
				if line.starts_with("DatHeader=") {
					let (_, value) = split_key_value(line)?;
					return array_type_from_header(value);
				}
			}
			Err(AffyError::ArrayTypeNotFound)
		}
	}
}

/// Read the declared array type of an intensity file on disk.
pub fn get_array_type_from_path(path: impl AsRef<Path>, options: &LoadOptions) -> Result<String> {
	let (_, bytes) = read_source(path, options.max_decompressed_bytes)?;
	get_array_type(&bytes)
}

#[cfg(test)]
mod tests;

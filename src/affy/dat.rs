use std::path::Path;

use tracing::{debug, info};

use crate::affy::bytes::Cursor;
use crate::affy::compression::read_source;
use crate::affy::directive::decode_str;
use crate::affy::{AffyError, Grid, LoadOptions, Result};

/// One-byte magic opening a pixel-image file.
pub const DAT_MAGIC: u8 = 0xFC;

const FIELD_START: &[u8] = b"\x14 ";
const ARRAY_TYPE_END: &[u8] = b".1sq";

/// Image position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
pub struct Point {
	/// Column.
	pub x: i64,
	/// Row.
	pub y: i64,
}

/// Grid corner positions located by the scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
pub struct GridCorners {
	/// Upper left.
	pub upper_left: Point,
	/// Upper right.
	pub upper_right: Point,
	/// Lower right.
	pub lower_right: Point,
	/// Lower left.
	pub lower_left: Point,
}

/// Scanner metadata preceding the pixel array.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct DatHeader {
	/// Pixels per line.
	pub numcols: usize,
	/// Number of lines.
	pub numrows: usize,
	/// Declared pixel count.
	pub numpixels: usize,
	/// Minimum pixel intensity.
	pub minpixel: u32,
	/// Maximum pixel intensity.
	pub maxpixel: u32,
	/// Mean pixel intensity.
	pub meanpixel: f64,
	/// Standard deviation of pixel intensity.
	pub std_dev_pixel: f64,
	/// Pixel width.
	pub pixel_width: u32,
	/// Pixel height.
	pub pixel_height: u32,
	/// Scan speed.
	pub scanspeed: u32,
	/// Temperature in degrees C.
	pub temperature: f64,
	/// Laser power reading.
	pub laser_power: f64,
	/// Time of scan.
	pub timestamp: String,
	/// Scanner id.
	pub scanner_id: String,
	/// Probe array type.
	pub array_type: String,
	/// Average DC offset.
	pub avg_dc_offset: f64,
	/// Standard deviation of the DC offset.
	pub std_dev_dc_offset: f64,
	/// Number of DC offset samples.
	pub numsamples_dc_offset: u32,
	/// Grid corners.
	pub grid: GridCorners,
	/// Cell margin.
	pub cellmargin: u16,
	/// Experiment name.
	pub experiment_name: String,
}

/// Rectangle of image pixels covering one cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelRegion {
	/// Top-left pixel of the region.
	pub origin: Point,
	/// Region width.
	pub numcols: usize,
	/// Region height.
	pub numrows: usize,
	/// Pixels, row-major.
	pub pixels: Vec<u16>,
}

/// Parsed pixel-image file.
#[derive(Debug, Clone, PartialEq)]
pub struct DatFile {
	/// Header metadata.
	pub header: DatHeader,
	/// Pixel image.
	pub pixels: Grid<u16>,
}

fn ascii_field<'a>(cur: &mut Cursor<'a>, width: usize) -> Result<&'a [u8]> {
	cur.read_exact(width)
}

fn text(raw: &[u8]) -> String {
	let end = raw.iter().position(|byte| *byte == 0).unwrap_or(raw.len());
	String::from_utf8_lossy(&raw[..end]).trim().to_owned()
}

/// Leading unsigned integer after skipping `skip` bytes, `0` when absent.
fn leading_uint(raw: &[u8], skip: usize) -> u32 {
	let digits = raw.get(skip..).unwrap_or_default();
	let digits = digits.trim_ascii_start();
	let end = digits.iter().position(|byte| !byte.is_ascii_digit()).unwrap_or(digits.len());
	std::str::from_utf8(&digits[..end]).ok().and_then(|item| item.parse().ok()).unwrap_or(0)
}

/// Leading decimal number, `0.0` when absent.
fn leading_float(raw: &[u8]) -> f64 {
	let body = text(raw);
	let end = body
		.char_indices()
		.find(|(_, ch)| !(ch.is_ascii_digit() || matches!(ch, '.' | '-' | '+' | 'e' | 'E')))
		.map_or(body.len(), |(idx, _)| idx);
	body[..end].parse().unwrap_or(0.0)
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
	haystack.windows(needle.len()).position(|window| window == needle)
}

/// Split the variable-width block into scanner id and array type.
fn split_identity(block: &[u8]) -> Result<(String, String)> {
	let bad = || AffyError::malformed("DAT header", "array type block lacks field markers");
	let first = find(block, FIELD_START).ok_or_else(bad)?;
	let scanner_id = text(&block[..first]);

	let rest = &block[first + 1..];
	let second = find(rest, FIELD_START).ok_or_else(bad)?;
	let rest = &rest[second + FIELD_START.len()..];
	let end = find(rest, ARRAY_TYPE_END).ok_or(AffyError::ArrayTypeNotFound)?;
	Ok((scanner_id, text(&rest[..end])))
}

fn point(x: i16, y: i16) -> Point {
	Point {
		x: i64::from(x),
		y: i64::from(y),
	}
}

impl DatFile {
	/// Decode a pixel-image file held in memory.
	pub fn parse(bytes: &[u8]) -> Result<Self> {
		let mut cur = Cursor::new(bytes);
		let magic = cur.read_u8()?;
		if magic != DAT_MAGIC {
			return Err(AffyError::BadMagic {
				format: "DAT",
				magic: u32::from(magic),
			});
		}

		let stats = decode_str(&mut cur, "%2hl%3dl%2fl%x", &[18])?;
		let mut fields = stats.fields();
		let numcols = usize::from(fields.u16()?);
		let numrows = usize::from(fields.u16()?);
		let numpixels = fields.u32()? as usize;
		let minpixel = fields.u32()?;
		let maxpixel = fields.u32()?;
		let meanpixel = fields.f64()?;
		let std_dev_pixel = fields.f64()?;

		let pixel_width = leading_uint(ascii_field(&mut cur, 8)?, 4);
		let pixel_height = leading_uint(ascii_field(&mut cur, 8)?, 4);
		let scanspeed = leading_uint(ascii_field(&mut cur, 7)?, 3);
		let temperature = leading_float(ascii_field(&mut cur, 8)?);
		let laser_power = leading_float(ascii_field(&mut cur, 5)?);
		let timestamp = text(ascii_field(&mut cur, 18)?);
		let (scanner_id, array_type) = split_identity(ascii_field(&mut cur, 221)?)?;

		let tail = decode_str(&mut cur, "%2fl%dl%9hl", &[])?;
		let mut fields = tail.fields();
		let avg_dc_offset = fields.f64()?;
		let std_dev_dc_offset = fields.f64()?;
		let numsamples_dc_offset = fields.u32()?;
		let mut corners = [Point::default(); 4];
		for corner in &mut corners {
			*corner = point(fields.i16()?, fields.i16()?);
		}
		let cellmargin = fields.u16()?;
		let experiment_name = text(ascii_field(&mut cur, 155)?);

		if numpixels != numcols * numrows {
			return Err(AffyError::malformed("DAT header", format!("{numpixels} pixels declared for a {numcols}x{numrows} image")));
		}
		debug!(numcols, numrows, array_type = %array_type, "DAT header");

		let image = decode_str(&mut cur, "%*hl", &[numpixels as i64])?;
		let mut fields = image.fields();
		let values = fields.array()?.iter().map(|field| field.as_u16().unwrap_or_default()).collect();
		let pixels = Grid::from_vec(numcols, numrows, values)?;

		let [upper_left, upper_right, lower_right, lower_left] = corners;
		Ok(Self {
			header: DatHeader {
				numcols,
				numrows,
				numpixels,
				minpixel,
				maxpixel,
				meanpixel,
				std_dev_pixel,
				pixel_width,
				pixel_height,
				scanspeed,
				temperature,
				laser_power,
				timestamp,
				scanner_id,
				array_type,
				avg_dc_offset,
				std_dev_dc_offset,
				numsamples_dc_offset,
				grid: GridCorners {
					upper_left,
					upper_right,
					lower_right,
					lower_left,
				},
				cellmargin,
				experiment_name,
			},
			pixels,
		})
	}

	/// Map cell `(x, y)` of a `cols` x `rows` chip to image coordinates.
	///
	/// Bilinear interpolation between the grid corners corrects for image
	/// rotation; the result averages the cell's position with the one below
	/// it (for `x`) and to its right (for `y`).
	pub fn cell_to_pixel(&self, cols: usize, rows: usize, x: i64, y: i64) -> Point {
		let grid = &self.header.grid;
		let a = (grid.upper_left.x as f64, grid.upper_left.y as f64);
		let b = ((grid.upper_right.x + 1) as f64, grid.upper_right.y as f64);
		let c = (grid.lower_left.x as f64, (grid.lower_left.y + 1) as f64);
		let d = ((grid.lower_right.x + 1) as f64, (grid.lower_right.y + 1) as f64);
		let (cols, rows) = (cols as f64, rows as f64);

		let blend = |x: f64, y: f64, pick: fn((f64, f64)) -> f64| {
			pick(a) * ((cols - x) / cols) * ((rows - y) / rows) + pick(b) * (x / cols) * ((rows - y) / rows) + pick(c) * ((cols - x) / cols) * (y / rows) + pick(d) * (x / cols) * (y / rows)
		};
		let (fx, fy) = (x as f64, y as f64);
		let xn = blend(fx, fy, |p| p.0);
		let yn = blend(fx, fy, |p| p.1);
		let xp = blend(fx, fy + 1.0, |p| p.0);
		let yp = blend(fx + 1.0, fy, |p| p.1);

		Point {
			x: ((xn + xp) / 2.0 + 0.5) as i64,
			y: ((yn + yp) / 2.0 + 0.5) as i64,
		}
	}

	/// Pixels covering cell `(x, y)` of a `cols` x `rows` chip.
	pub fn pixel_region(&self, cols: usize, rows: usize, x: i64, y: i64) -> Result<PixelRegion> {
		let origin = self.cell_to_pixel(cols, rows, x, y);
		let right = self.cell_to_pixel(cols, rows, x + 1, y);
		let below = self.cell_to_pixel(cols, rows, x, y + 1);
		let numcols = usize::try_from(right.x - origin.x).unwrap_or(0);
		let numrows = usize::try_from(below.y - origin.y).unwrap_or(0);

		let mut pixels = Vec::with_capacity(numcols * numrows);
		for row in 0..numrows as i64 {
			let py = origin.y + row;
			let line = usize::try_from(py).ok().and_then(|py| self.pixels.row(py));
			let (start, end) = (origin.x, origin.x + numcols as i64);
			let span = line.and_then(|line| line.get(usize::try_from(start).ok()?..usize::try_from(end).ok()?));
			let Some(span) = span else {
				return Err(AffyError::CoordinateOutOfRange {
					section: "pixel",
					x: end,
					y: py,
					cols: self.pixels.cols(),
					rows: self.pixels.rows(),
				});
			};
			pixels.extend_from_slice(span);
		}

		Ok(PixelRegion {
			origin,
			numcols,
			numrows,
			pixels,
		})
	}
}

/// Load a pixel-image file from disk.
pub fn load_dat_file(path: impl AsRef<Path>, options: &LoadOptions) -> Result<DatFile> {
	let path = path.as_ref();
	let (_, bytes) = read_source(path, options.max_decompressed_bytes).map_err(|err| match err {
		AffyError::Io(io) if io.kind() == std::io::ErrorKind::NotFound => AffyError::NotFound {
			what: format!("DAT file {}", path.display()),
		},
		other => other,
	})?;
	let dat = DatFile::parse(&bytes)?;
	info!(path = %path.display(), cols = dat.header.numcols, rows = dat.header.numrows, "DAT file loaded");
	Ok(dat)
}

use tracing::{debug, info};

use crate::affy::bytes::Cursor;
use crate::affy::cel::section::{collect_coords, run_sections};
use crate::affy::cel::{BINARY_CEL_MAGIC, Cell, CellQc, CelFile, CelFormat, Section, SectionOutcome, array_type_from_header};
use crate::affy::directive::{Directives, decode, decode_str};
use crate::affy::progress::TICK_EVERY;
use crate::affy::{AffyError, LoadOptions, Progress, Result};

/// Offset of the first length-prefixed header block.
const HEADER_OFFSET: usize = 20;

const CELL_RECORD: &str = "%2Dl%hl";
const COORD_RECORD: &str = "%2hl";

/// Fixed-layout header of a Variant A file.
#[derive(Debug)]
struct BinaryHeader {
	version: i32,
	cols: usize,
	rows: usize,
	dat_header: String,
	nummasks: usize,
	numoutliers: usize,
}

fn read_block<'a>(cur: &mut Cursor<'a>) -> Result<&'a [u8]> {
	let at = cur.pos();
	let len = cur.read_i32_le()?;
	let len = usize::try_from(len).map_err(|_| AffyError::malformed("binary CEL header", format!("negative block length {len} at offset {at}")))?;
	cur.read_exact(len)
}

fn count(value: i32, what: &str) -> Result<usize> {
	usize::try_from(value).map_err(|_| AffyError::malformed("binary CEL header", format!("negative {what} count {value}")))
}

fn read_header(cur: &mut Cursor<'_>) -> Result<BinaryHeader> {
	let magic = cur.read_i32_le()?;
	if magic != BINARY_CEL_MAGIC {
		return Err(AffyError::BadMagic {
			format: "binary CEL",
			magic: magic as u32,
		});
	}

	// version, cols, rows, then the redundant total cell count
	let dims = decode_str(cur, "%3dl%x", &[4])?;
	let mut fields = dims.fields();
	let version = fields.i32()?;
	let (cols, rows) = (fields.i32()?, fields.i32()?);
	if cols <= 0 || rows <= 0 {
		return Err(AffyError::InvalidDimensions {
			cols: i64::from(cols),
			rows: i64::from(rows),
		});
	}

	let dat_header = String::from_utf8_lossy(read_block(cur)?).into_owned();
	let _algorithm = read_block(cur)?;
	let _parameters = read_block(cur)?;

	// cell margin is skipped, sub-grid count is skipped
	let counts = decode_str(cur, "%x%2dl%x", &[4, 4])?;
	let mut fields = counts.fields();
	let numoutliers = count(fields.i32()?, "outlier")?;
	let nummasks = count(fields.i32()?, "mask")?;

	Ok(BinaryHeader {
		version,
		cols: cols as usize,
		rows: rows as usize,
		dat_header,
		nummasks,
		numoutliers,
	})
}

/// Header text holding the `DatHeader=` line, for array-type detection.
pub(super) fn header_text(bytes: &[u8]) -> Result<String> {
	let mut cur = Cursor::new(bytes);
	cur.seek_to(HEADER_OFFSET)?;
	let block = String::from_utf8_lossy(read_block(&mut cur)?).into_owned();
	Ok(match block.find("DatHeader=") {
		Some(start) => block[start..].lines().next().unwrap_or_default().to_owned(),
		None => block,
	})
}

pub(super) fn parse(filename: &str, bytes: &[u8], options: &LoadOptions, progress: &mut dyn Progress) -> Result<CelFile> {
	let mut cur = Cursor::new(bytes);
	let header = read_header(&mut cur)?;
	info!(filename, version = header.version, cols = header.cols, rows = header.rows, "binary CEL header");

	let mut cel = CelFile::new(filename, CelFormat::Binary, header.cols, header.rows)?;
	cel.version = header.version;
	cel.array_type = array_type_from_header(&header.dat_header).ok();

	let cell_record = Directives::parse(CELL_RECORD)?;
	let coord_record = Directives::parse(COORD_RECORD)?;

	run_sections(
		&mut cel,
		&[Section::Intensity, Section::Masks, Section::Outliers, Section::Subgrids],
		|cel, section| match section {
			Section::Intensity => read_intensities(&mut cur, cel, &cell_record, options, &mut *progress),
			Section::Masks => collect_coords(cel, section, header.nummasks, || read_coord(&mut cur, &coord_record)),
			Section::Outliers => collect_coords(cel, section, header.numoutliers, || read_coord(&mut cur, &coord_record)),
			_ => {
				debug!(%section, "section not parsed");
				Ok(SectionOutcome::Complete)
			}
		},
	)?;

	Ok(cel)
}

fn read_intensities(cur: &mut Cursor<'_>, cel: &mut CelFile, record: &Directives, options: &LoadOptions, progress: &mut dyn Progress) -> Result<SectionOutcome> {
	let (cols, rows) = (cel.numcols(), cel.numrows());
	progress.begin("Loading intensities", cols * rows);

	// x varies fastest on disk
	for y in 0..rows {
		for x in 0..cols {
			let decoded = decode(cur, record, &[])?;
			let mut fields = decoded.fields();
			let value = fields.f64()?;
			let stddev = fields.f64()?;
			let numpixels = fields.i16()?;
			*cel.cell_mut(x, y)? = Cell {
				value,
				qc: options.retain_qc.then_some(CellQc { stddev, numpixels }),
			};

			if (y * cols + x + 1) % TICK_EVERY == 0 {
				progress.tick(TICK_EVERY);
			}
		}
	}

	progress.finish();
	Ok(SectionOutcome::Complete)
}

fn read_coord(cur: &mut Cursor<'_>, record: &Directives) -> Result<(i64, i64)> {
	let decoded = decode(cur, record, &[])?;
	let mut fields = decoded.fields();
	Ok((i64::from(fields.i16()?), i64::from(fields.i16()?)))
}

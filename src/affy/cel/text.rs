use tracing::{debug, info, warn};

use crate::affy::cel::{Cell, CellQc, CelFile, CelFormat, Section, array_type_from_header};
use crate::affy::progress::TICK_EVERY;
use crate::affy::textio::{LineReader, split_key_value};
use crate::affy::{AffyError, LoadOptions, Progress, Result};

/// Values gathered from `[CEL]` and `[HEADER]` before the grid exists.
#[derive(Debug, Default)]
struct TextHeader {
	version: i32,
	cols: Option<i64>,
	rows: Option<i64>,
	dat_header: Option<String>,
}

pub(super) fn parse(filename: &str, bytes: &[u8], options: &LoadOptions, progress: &mut dyn Progress) -> Result<CelFile> {
	let text = String::from_utf8_lossy(bytes);
	let mut reader = LineReader::new(&text);
	let mut header = TextHeader::default();
	let mut cel: Option<CelFile> = None;

	while let Some(line) = reader.next_line() {
		if !line.starts_with('[') {
			debug!(filename, line = reader.line_no(), "ignoring text outside any section");
			continue;
		}

		match line {
			"[CEL]" => read_cel_section(&mut reader, &mut header)?,
			"[HEADER]" => {
				read_header_section(&mut reader, &mut header)?;
				cel = Some(allocate(filename, &header)?);
			}
			"[INTENSITY]" => read_intensity_section(&mut reader, require(&mut cel)?, options, progress)?,
			"[MASKS]" => read_coord_section(&mut reader, require(&mut cel)?, Section::Masks)?,
			"[OUTLIERS]" => read_coord_section(&mut reader, require(&mut cel)?, Section::Outliers)?,
			other => {
				info!(filename, section = other, "skipping unrecognized section");
				if reader.skip_to_next_header().is_none() {
					break;
				}
			}
		}
	}

	cel.ok_or_else(|| AffyError::Missing {
		what: "[HEADER] section".to_owned(),
	})
}

fn require(cel: &mut Option<CelFile>) -> Result<&mut CelFile> {
	cel.as_mut().ok_or_else(|| AffyError::malformed("text CEL", "data section before [HEADER]"))
}

fn allocate(filename: &str, header: &TextHeader) -> Result<CelFile> {
	let (Some(cols), Some(rows)) = (header.cols, header.rows) else {
		return Err(AffyError::malformed("text CEL header", "missing Cols= or Rows="));
	};
	if cols <= 0 || rows <= 0 {
		return Err(AffyError::InvalidDimensions { cols, rows });
	}

	info!(filename, version = header.version, cols, rows, "text CEL header");
	let mut cel = CelFile::new(filename, CelFormat::Text, cols as usize, rows as usize)?;
	cel.version = header.version;
	cel.array_type = header.dat_header.as_deref().and_then(|value| array_type_from_header(value).ok());
	Ok(cel)
}

/// Next line belonging to the current section, leaving the following header unread.
fn section_line<'a>(reader: &mut LineReader<'a>) -> Result<Option<&'a str>> {
	match reader.next_line() {
		Some(line) if line.starts_with('[') => {
			reader.unget()?;
			Ok(None)
		}
		other => Ok(other),
	}
}

fn parse_int(key: &str, value: &str) -> Result<i64> {
	value
		.parse::<i64>()
		.map_err(|_| AffyError::malformed("text CEL header", format!("{key}={value} is not an integer")))
}

fn read_cel_section(reader: &mut LineReader<'_>, header: &mut TextHeader) -> Result<()> {
	while let Some(line) = section_line(reader)? {
		let (key, value) = split_key_value(line)?;
		if key == "Version" {
			header.version = i32::try_from(parse_int(key, value)?)
				.map_err(|_| AffyError::malformed("text CEL header", format!("{key}={value} out of range")))?;
		}
	}
	Ok(())
}

fn read_header_section(reader: &mut LineReader<'_>, header: &mut TextHeader) -> Result<()> {
	while let Some(line) = section_line(reader)? {
		let Ok((key, value)) = split_key_value(line) else {
			debug!(line = reader.line_no(), "header line without '='");
			continue;
		};
		match key {
			"Cols" => header.cols = Some(parse_int(key, value)?),
			"Rows" => header.rows = Some(parse_int(key, value)?),
			"DatHeader" => header.dat_header = Some(value.to_owned()),
			_ => {}
		}
	}
	Ok(())
}

/// Skip `key=value` lines up to and including `CellHeader=`.
fn skip_to_cell_header(reader: &mut LineReader<'_>, section: Section) -> Result<Option<i64>> {
	let mut declared = None;
	loop {
		let line = section_line(reader)?.ok_or_else(|| AffyError::Missing {
			what: format!("CellHeader= line in {section} section"),
		})?;
		let (key, value) = split_key_value(line)?;
		match key {
			"CellHeader" => return Ok(declared),
			"NumberCells" => declared = Some(parse_int(key, value)?),
			_ => {}
		}
	}
}

fn coord(field: Option<&str>, line: &str) -> Result<i64> {
	field
		.and_then(|item| item.parse::<i64>().ok())
		.ok_or_else(|| AffyError::malformed("text CEL record", format!("bad coordinate in {line:?}")))
}

/// One required numeric field of an intensity record.
fn number<T: std::str::FromStr>(field: Option<&str>, what: &str, line: &str) -> Result<T> {
	field
		.and_then(|item| item.parse::<T>().ok())
		.ok_or_else(|| AffyError::malformed("text CEL record", format!("bad {what} in {line:?}")))
}

fn read_intensity_section(reader: &mut LineReader<'_>, cel: &mut CelFile, options: &LoadOptions, progress: &mut dyn Progress) -> Result<()> {
	skip_to_cell_header(reader, Section::Intensity)?;

	let expected = cel.numcols() * cel.numrows();
	progress.begin("Loading intensities", expected);

	let mut read = 0_usize;
	while let Some(line) = section_line(reader)? {
		let mut fields = line.split_whitespace();
		let x = coord(fields.next(), line)?;
		let y = coord(fields.next(), line)?;
		let value = number::<f64>(fields.next(), "intensity", line)?;
		let stddev = number::<f64>(fields.next(), "standard deviation", line)?;
		let numpixels = number::<i16>(fields.next(), "pixel count", line)?;

		let qc = options.retain_qc.then_some(CellQc { stddev, numpixels });
		if !cel.cells().contains(x, y) {
			return Err(AffyError::CoordinateOutOfRange {
				section: Section::Intensity.label(),
				x,
				y,
				cols: cel.numcols(),
				rows: cel.numrows(),
			});
		}
		*cel.cell_mut(x as usize, y as usize)? = Cell { value, qc };

		read += 1;
		if read % TICK_EVERY == 0 {
			progress.tick(TICK_EVERY);
		}
	}
	progress.finish();

	if read < expected {
		return Err(AffyError::TruncatedSection {
			section: Section::Intensity.label(),
			expected,
			read,
		});
	}
	Ok(())
}

fn read_coord_section(reader: &mut LineReader<'_>, cel: &mut CelFile, section: Section) -> Result<()> {
	let declared = skip_to_cell_header(reader, section)?;

	let mut listed = 0_i64;
	while let Some(line) = section_line(reader)? {
		let mut fields = line.split_whitespace();
		let x = coord(fields.next(), line)?;
		let y = coord(fields.next(), line)?;
		match section {
			Section::Outliers => cel.set_outlier(x, y)?,
			_ => cel.set_mask(x, y)?,
		}
		listed += 1;
	}

	if declared.is_some_and(|declared| declared != listed) {
		warn!(filename = %cel.filename, %section, ?declared, listed, "NumberCells disagrees with listed {section} entries");
	}
	Ok(())
}

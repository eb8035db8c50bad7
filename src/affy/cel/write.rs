use std::path::Path;

use tracing::info;

use crate::affy::cel::{BINARY_CEL_MAGIC, BINARY_CEL_VERSION, CelFile};
use crate::affy::directive::{Directives, Field, encode, encode_str};
use crate::affy::{AffyError, Result, WriteOptions};

fn dim(value: usize, what: &str) -> Result<i32> {
	i32::try_from(value).map_err(|_| AffyError::invalid_argument(format!("{what} {value} does not fit a binary CEL header")))
}

fn coord(value: usize) -> Result<Field> {
	let value = i16::try_from(value).map_err(|_| AffyError::invalid_argument(format!("coordinate {value} does not fit a binary CEL record")))?;
	Ok(Field::from_i16(value))
}

fn push_block(out: &mut Vec<u8>, text: &str) -> Result<()> {
	encode_str(out, "%dl", &[], &[Field::from_i32(dim(text.len(), "header block length")?)])?;
	out.extend_from_slice(text.as_bytes());
	Ok(())
}

/// Encode `cel` as a version 4 binary intensity file.
///
/// Only the values and the mask/outlier sets are carried; header text is
/// reduced to the array-type marker, and QC fields fall back to the
/// placeholders in `options` when the file holds none.
pub fn encode_binary_cel(cel: &CelFile, array_type: &str, options: &WriteOptions) -> Result<Vec<u8>> {
	let (cols, rows) = (cel.numcols(), cel.numrows());
	let mut out = Vec::with_capacity(64 + cols * rows * 10);

	encode_str(
		&mut out,
		"%5dl",
		&[],
		&[
			Field::from_i32(BINARY_CEL_MAGIC),
			Field::from_i32(BINARY_CEL_VERSION),
			Field::from_i32(dim(cols, "column count")?),
			Field::from_i32(dim(rows, "row count")?),
			Field::from_i32(dim(cols * rows, "cell count")?),
		],
	)?;
	push_block(&mut out, &format!("DatHeader= {array_type}.1sq"))?;
	push_block(&mut out, "0")?;
	push_block(&mut out, "0")?;

	let (masks, outliers) = (cel.mask_coords(), cel.outlier_coords());

	// cell margin, then the two coordinate-list counts, then zero sub-grids
	encode_str(
		&mut out,
		"%4dl",
		&[],
		&[
			Field::from_i32(0),
			Field::from_i32(dim(outliers.len(), "outlier count")?),
			Field::from_i32(dim(masks.len(), "mask count")?),
			Field::from_i32(0),
		],
	)?;

	let cell_record = Directives::parse("%2Dl%hl")?;
	for y in 0..rows {
		for x in 0..cols {
			let cell = cel.cell(x, y)?;
			let (stddev, numpixels) = match cell.qc {
				Some(qc) => (qc.stddev, qc.numpixels),
				None => (f64::from(options.placeholder_stddev), options.placeholder_pixels),
			};
			encode(
				&mut out,
				&cell_record,
				&[],
				&[Field::Widened(cell.value), Field::Widened(stddev), Field::from_i16(numpixels)],
			)?;
		}
	}

	let coord_record = Directives::parse("%2hl")?;
	for (x, y) in masks.into_iter().chain(outliers) {
		encode(&mut out, &coord_record, &[], &[coord(x)?, coord(y)?])?;
	}

	Ok(out)
}

/// Encode `cel` and write it to `path`.
pub fn write_binary_cel_file(path: impl AsRef<Path>, cel: &CelFile, array_type: &str, options: &WriteOptions) -> Result<()> {
	let path = path.as_ref();
	let bytes = encode_binary_cel(cel, array_type, options)?;
	std::fs::write(path, &bytes)?;
	info!(path = %path.display(), bytes = bytes.len(), "binary CEL written");
	Ok(())
}

use tracing::{info, warn};

use crate::affy::calvin::{CalvinFile, DataSet};
use crate::affy::cel::section::{collect_coords, run_sections};
use crate::affy::cel::{CellQc, CelFile, CelFormat, Section, SectionOutcome};
use crate::affy::{AffyError, LoadOptions, Progress, Result};

const COLS_PARAM: &str = "affymetrix-cel-cols";
const ROWS_PARAM: &str = "affymetrix-cel-rows";
const ARRAY_TYPE_PARAM: &str = "affymetrix-array-type";

fn dimension(container: &CalvinFile, name: &str) -> Result<i64> {
	container
		.header
		.find_param(name)
		.and_then(|param| param.value.as_i64())
		.ok_or_else(|| AffyError::Missing { what: format!("{name} parameter") })
}

fn dataset_name(section: Section) -> &'static str {
	match section {
		Section::StdDev => "StdDev",
		Section::Pixels => "Pixel",
		Section::Masks => "Mask",
		Section::Outliers => "Outlier",
		_ => "Intensity",
	}
}

pub(super) fn parse(filename: &str, bytes: &[u8], options: &LoadOptions, progress: &mut dyn Progress) -> Result<CelFile> {
	let container = CalvinFile::parse(bytes)?;
	let cols = dimension(&container, COLS_PARAM)?;
	let rows = dimension(&container, ROWS_PARAM)?;
	if cols <= 0 || rows <= 0 {
		return Err(AffyError::InvalidDimensions { cols, rows });
	}
	info!(filename, version = container.version, cols, rows, "calvin CEL header");

	let mut cel = CelFile::new(filename, CelFormat::Calvin, cols as usize, rows as usize)?;
	cel.version = i32::from(container.version);
	cel.array_type = container.find_param(ARRAY_TYPE_PARAM).and_then(|param| param.value.as_str()).map(str::to_owned);

	let sections: &[Section] = if options.retain_qc {
		&[Section::Intensity, Section::StdDev, Section::Masks, Section::Pixels, Section::Outliers]
	} else {
		&[Section::Intensity, Section::Masks, Section::Outliers]
	};

	run_sections(&mut cel, sections, |cel, section| {
		let name = dataset_name(section);
		let Some(dataset) = container.find_dataset(0, name) else {
			if section == Section::Intensity {
				return Err(AffyError::Missing {
					what: "Intensity data set".to_owned(),
				});
			}
			warn!(filename = %cel.filename, dataset = name, "CORRUPT_CEL_FILE: {name} dataset not found");
			return Ok(SectionOutcome::Salvaged { kept: 0 });
		};
		match section {
			Section::Intensity | Section::StdDev | Section::Pixels => read_per_cell(&container, dataset, cel, section, &mut *progress),
			_ => {
				let mut row = 0;
				collect_coords(cel, section, dataset.num_rows, || {
					let values = container.read_mapped_rows(dataset, row, 1, &["X", "Y"])?;
					row += 1;
					match values.first().map(Vec::as_slice) {
						Some(&[x, y]) => Ok((x as i64, y as i64)),
						_ => Err(AffyError::malformed("calvin coordinate", format!("row {row} of {name} has no X/Y pair"))),
					}
				})
			}
		}
	})?;

	Ok(cel)
}

/// Fill one per-cell column; rows run `x` fastest.
fn read_per_cell(container: &CalvinFile, dataset: &DataSet, cel: &mut CelFile, section: Section, progress: &mut dyn Progress) -> Result<SectionOutcome> {
	let (cols, rows) = (cel.numcols(), cel.numrows());
	let expected = cols * rows;
	let name = dataset_name(section);

	let values = match container.read_column(dataset, name) {
		Ok(values) if values.len() >= expected => values,
		Ok(values) if section == Section::Intensity => {
			return Err(AffyError::TruncatedSection {
				section: section.label(),
				expected,
				read: values.len(),
			});
		}
		Err(err) if section == Section::Intensity => return Err(err),
		other => {
			let detail = other.map_or_else(|err| err.to_string(), |values| format!("{} of {expected} rows", values.len()));
			warn!(filename = %cel.filename, dataset = name, %detail, "CORRUPT_CEL_FILE: {name} dataset unreadable");
			return Ok(SectionOutcome::Salvaged { kept: 0 });
		}
	};

	progress.begin(&format!("Loading {section}"), expected);
	for (index, value) in values.into_iter().take(expected).enumerate() {
		let cell = cel.cell_mut(index % cols, index / cols)?;
		match section {
			Section::Intensity => cell.value = value,
			Section::StdDev => cell.qc.get_or_insert(CellQc { stddev: 0.0, numpixels: 0 }).stddev = value,
			_ => cell.qc.get_or_insert(CellQc { stddev: 0.0, numpixels: 0 }).numpixels = value as i16,
		}
	}
	progress.tick(expected);
	progress.finish();
	Ok(SectionOutcome::Complete)
}

use tracing::{debug, info};

use crate::affy::cdf::{AtomCell, LayoutBuilder};
use crate::affy::textio::{LineReader, split_key_value};
use crate::affy::{AffyError, Progress, Result};

/// Tab-separated column positions inside a unit block `CellN=` record.
const FIELD_PBASE: usize = 8;
const FIELD_TBASE: usize = 9;
const FIELD_ATOM: usize = 10;

/// Counts gathered from the `[Chip]` section.
#[derive(Debug, Default)]
struct ChipHeader {
	cols: i64,
	rows: i64,
	numqcunits: i64,
	numprobesets: i64,
}

pub(super) fn parse(bytes: &[u8], progress: &mut dyn Progress) -> Result<LayoutBuilder> {
	let text = String::from_utf8_lossy(bytes);
	let mut reader = LineReader::new(&text);
	let mut builder: Option<LayoutBuilder> = None;
	let mut started = false;

	while let Some(line) = reader.next_line() {
		if line == "[CDF]" {
			if let Some(next) = section_line(&mut reader)? {
				let (key, value) = split_key_value(next)?;
				if key == "Version" {
					info!(version = value, "text probe layout");
				}
			}
		} else if line == "[Chip]" {
			let chip = read_chip_section(&mut reader)?;
			let (cols, rows) = dimension(chip.cols, chip.rows)?;
			let mut fresh = LayoutBuilder::new(cols, rows)?;
			fresh.numqcunits = usize::try_from(chip.numqcunits).unwrap_or_default();
			debug!(cols = chip.cols, rows = chip.rows, numprobesets = chip.numprobesets, "text probe layout chip section");
			builder = Some(fresh);
		} else if let Some(rest) = line.strip_prefix("[QC") {
			let number = rest.trim_end_matches(']');
			if number.parse::<u32>().is_err() {
				return Err(AffyError::malformed("text probe layout", format!("bad QC unit header {line:?}")));
			}
			read_qc_section(&mut reader, require(&mut builder)?)?;
		} else if is_block_header(line) {
			let builder = require(&mut builder)?;
			if !started {
				progress.begin("Loading probe sets", 0);
				started = true;
			}
			read_block_section(&mut reader, builder)?;
			progress.tick(1);
		} else if line.starts_with('[') {
			debug!(section = line, "skipping probe layout section");
			if reader.skip_to_next_header().is_none() {
				break;
			}
		}
	}
	if started {
		progress.finish();
	}

	builder.ok_or_else(|| AffyError::Missing {
		what: "[Chip] section".to_owned(),
	})
}

fn dimension(cols: i64, rows: i64) -> Result<(usize, usize)> {
	if cols <= 0 || rows <= 0 {
		return Err(AffyError::InvalidDimensions { cols, rows });
	}
	Ok((cols as usize, rows as usize))
}

fn require(builder: &mut Option<LayoutBuilder>) -> Result<&mut LayoutBuilder> {
	builder.as_mut().ok_or_else(|| AffyError::malformed("text probe layout", "unit section before [Chip]"))
}

/// True for `[UnitN_BlockM]` headers.
fn is_block_header(line: &str) -> bool {
	let Some(inner) = line.strip_prefix("[Unit").and_then(|rest| rest.strip_suffix(']')) else {
		return false;
	};
	let Some((unit, block)) = inner.split_once("_Block") else {
		return false;
	};
	unit.parse::<i64>().is_ok() && block.parse::<i64>().is_ok()
}

fn section_line<'a>(reader: &mut LineReader<'a>) -> Result<Option<&'a str>> {
	match reader.next_line() {
		Some(line) if line.starts_with('[') => {
			reader.unget()?;
			Ok(None)
		}
		other => Ok(other),
	}
}

fn parse_int(what: &'static str, key: &str, value: &str) -> Result<i64> {
	value.parse::<i64>().map_err(|_| AffyError::malformed(what, format!("{key}={value} is not an integer")))
}

fn read_chip_section(reader: &mut LineReader<'_>) -> Result<ChipHeader> {
	let mut chip = ChipHeader::default();
	while let Some(line) = section_line(reader)? {
		let Ok((key, value)) = split_key_value(line) else {
			continue;
		};
		match key {
			"Rows" => chip.rows = parse_int("text probe layout chip section", key, value)?,
			"Cols" => chip.cols = parse_int("text probe layout chip section", key, value)?,
			"NumQCUnits" => chip.numqcunits = parse_int("text probe layout chip section", key, value)?,
			"NumberOfUnits" => chip.numprobesets = parse_int("text probe layout chip section", key, value)?,
			_ => {}
		}
	}
	Ok(chip)
}

/// Read `key=value` lines through `CellHeader=`, returning the interesting values.
fn read_block_keys(reader: &mut LineReader<'_>, what: &'static str) -> Result<Vec<(String, String)>> {
	let mut keys = Vec::new();
	loop {
		let line = section_line(reader)?.ok_or_else(|| AffyError::Missing {
			what: format!("CellHeader= line in {what}"),
		})?;
		let (key, value) = split_key_value(line)?;
		if key == "CellHeader" {
			return Ok(keys);
		}
		keys.push((key.to_owned(), value.to_owned()));
	}
}

fn cell_fields(line: &str) -> Result<Vec<&str>> {
	let (key, value) = split_key_value(line)?;
	if !key.starts_with("Cell") {
		return Err(AffyError::malformed("text probe layout cell", format!("expected CellN=, found {line:?}")));
	}
	Ok(value.split('\t').map(str::trim).collect())
}

fn int_field(fields: &[&str], index: usize, line: &str) -> Result<i64> {
	fields
		.get(index)
		.and_then(|item| item.parse::<i64>().ok())
		.ok_or_else(|| AffyError::malformed("text probe layout cell", format!("bad field {index} in {line:?}")))
}

fn base_field(fields: &[&str], index: usize, line: &str) -> Result<u8> {
	fields
		.get(index)
		.and_then(|item| item.bytes().next())
		.ok_or_else(|| AffyError::malformed("text probe layout cell", format!("missing base {index} in {line:?}")))
}

fn read_qc_section(reader: &mut LineReader<'_>, builder: &mut LayoutBuilder) -> Result<()> {
	let keys = read_block_keys(reader, "QC section")?;
	let numcells = match keys.iter().find(|(key, _)| key == "NumberCells") {
		Some((key, value)) => parse_int("text probe layout QC section", key, value)?,
		None => 0,
	};

	for _ in 0..numcells {
		let line = section_line(reader)?.ok_or_else(|| AffyError::malformed("text probe layout QC section", "fewer cells than NumberCells"))?;
		let fields = cell_fields(line)?;
		let x = int_field(&fields, 0, line)?;
		let y = int_field(&fields, 1, line)?;
		builder.mark_qc(x, y)?;
	}
	Ok(())
}

fn read_block_section(reader: &mut LineReader<'_>, builder: &mut LayoutBuilder) -> Result<()> {
	let keys = read_block_keys(reader, "unit block")?;
	let mut name = String::new();
	let mut numatoms = 0_i64;
	let mut numcells = 0_i64;
	for (key, value) in &keys {
		match key.as_str() {
			"Name" => name.clone_from(value),
			"NumAtoms" => numatoms = parse_int("text probe layout block", key, value)?,
			"NumCells" => numcells = parse_int("text probe layout block", key, value)?,
			_ => {}
		}
	}

	let mut atoms: Vec<(i64, Vec<AtomCell>)> = Vec::new();
	for _ in 0..numcells {
		let Some(line) = section_line(reader)? else {
			break;
		};
		let fields = cell_fields(line)?;
		let cell = AtomCell {
			x: int_field(&fields, 0, line)?,
			y: int_field(&fields, 1, line)?,
			pbase: base_field(&fields, FIELD_PBASE, line)?,
			tbase: base_field(&fields, FIELD_TBASE, line)?,
		};
		let atom = int_field(&fields, FIELD_ATOM, line)?;
		match atoms.last_mut() {
			Some((current, cells)) if *current == atom => cells.push(cell),
			_ => atoms.push((atom, vec![cell])),
		}
	}

	// a block without cells contributes no probe set
	if atoms.is_empty() {
		debug!(name, "empty unit block");
		return Ok(());
	}

	let set = builder.open_probeset(&name, true);
	let mut pm_count = 0_i64;
	for (_, cells) in &atoms {
		if builder.add_atom(set, cells)? {
			pm_count += 1;
		}
		if cells.len() < 2 {
			builder.no_mm = true;
		}
	}
	if pm_count != numatoms {
		return Err(AffyError::malformed("text probe layout block", format!("{name}: {pm_count} perfect-match cells for {numatoms} atoms")));
	}
	Ok(())
}

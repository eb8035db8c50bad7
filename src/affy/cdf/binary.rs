use tracing::{debug, info, warn};

use crate::affy::bytes::Cursor;
use crate::affy::cdf::{AtomCell, LayoutBuilder};
use crate::affy::directive::{Directives, decode, decode_str};
use crate::affy::{AffyError, Progress, Result};

/// Width of the fixed probe-set name fields.
const NAME_LEN: usize = 64;
/// Width of the block name field, including its terminator.
const BLOCK_NAME_LEN: usize = 65;

fn count(value: i32, what: &'static str) -> Result<usize> {
	usize::try_from(value).map_err(|_| AffyError::malformed(what, format!("negative count {value}")))
}

fn c_string(raw: &[u8]) -> String {
	let end = raw.iter().position(|byte| *byte == 0).unwrap_or(raw.len());
	String::from_utf8_lossy(&raw[..end]).into_owned()
}

/// Record layouts, parsed once per file.
struct Records {
	qc_unit: Directives,
	qc_cell: Directives,
	unit: Directives,
	block: Directives,
	cell: Directives,
}

impl Records {
	fn new() -> Result<Self> {
		Ok(Self {
			qc_unit: Directives::parse("%x%dl")?,
			qc_cell: Directives::parse("%2hl%x")?,
			unit: Directives::parse("%hl%x%dl%x")?,
			block: Directives::parse("%2dl%c%x")?,
			cell: Directives::parse("%dl%2hl%x%2c")?,
		})
	}
}

pub(super) fn parse(bytes: &[u8], progress: &mut dyn Progress) -> Result<LayoutBuilder> {
	let mut cur = Cursor::new(bytes);
	cur.skip(4)?;
	let version = cur.read_i32_le()?;
	info!(version, "binary probe layout");
	if version == 4 {
		return Err(AffyError::Unsupported {
			what: "binary probe layout version 4".to_owned(),
		});
	}

	let head = decode_str(&mut cur, "%2hl%3dl", &[])?;
	let mut fields = head.fields();
	let cols = usize::from(fields.u16()?);
	let rows = usize::from(fields.u16()?);
	let numprobesets = count(fields.i32()?, "binary probe layout header")?;
	let numqcunits = count(fields.i32()?, "binary probe layout header")?;
	let custom_len = count(fields.i32()?, "binary probe layout header")?;
	debug!(cols, rows, numprobesets, numqcunits, custom_len, "binary probe layout header");

	cur.skip(custom_len)?;
	// probe-set names are repeated in each block; file positions are not needed
	cur.skip(numprobesets * NAME_LEN)?;
	cur.skip(numqcunits * 4 + numprobesets * 4)?;

	let mut builder = LayoutBuilder::new(cols, rows)?;
	builder.numqcunits = numqcunits;
	let records = Records::new()?;

	progress.begin("Loading QC units", numqcunits);
	for _ in 0..numqcunits {
		let unit = decode(&mut cur, &records.qc_unit, &[2])?;
		let numcells = count(unit.fields().i32()?, "binary QC unit")?;
		for _ in 0..numcells {
			let cell = decode(&mut cur, &records.qc_cell, &[3])?;
			let mut fields = cell.fields();
			let (x, y) = (fields.u16()?, fields.u16()?);
			builder.mark_qc(i64::from(x), i64::from(y))?;
		}
		progress.tick(1);
	}
	progress.finish();

	progress.begin("Loading probe sets", numprobesets);
	for _ in 0..numprobesets {
		read_unit(&mut cur, &records, version, &mut builder)?;
		progress.tick(1);
	}
	progress.finish();

	Ok(builder)
}

fn read_unit(cur: &mut Cursor<'_>, records: &Records, version: i32, builder: &mut LayoutBuilder) -> Result<()> {
	let unit = decode(cur, &records.unit, &[5, 9])?;
	let mut fields = unit.fields();
	let _unit_type = fields.u16()?;
	let numblocks = count(fields.i32()?, "binary probe layout unit")?;

	let mut set = None;
	for _ in 0..numblocks {
		let block = decode(cur, &records.block, &[9])?;
		let mut fields = block.fields();
		let numatoms = count(fields.i32()?, "binary probe layout block")?;
		let numcells = count(fields.i32()?, "binary probe layout block")?;
		let cells_per_atom = fields.u8()?;
		if cells_per_atom < 2 {
			builder.no_mm = true;
		}

		let name = c_string(cur.read_exact(BLOCK_NAME_LEN)?);
		if (2..=5).contains(&version) {
			// wobble situation and allele code, then channel and rep type
			cur.skip(4)?;
			if version >= 3 {
				cur.skip(2)?;
			}
		}

		// blocks of one unit share its probe set
		let index = *set.get_or_insert_with(|| builder.open_probeset(&name, false));

		let mut atom: Option<(i32, Vec<AtomCell>)> = None;
		let mut added = 0_usize;
		for _ in 0..numcells {
			let record = decode(cur, &records.cell, &[4])?;
			let mut fields = record.fields();
			let number = fields.i32()?;
			let x = fields.u16()?;
			let y = fields.u16()?;
			let pbase = fields.u8()?;
			let tbase = fields.u8()?;
			if (2..=5).contains(&version) {
				cur.skip(4)?;
				if version == 5 {
					cur.skip(4)?;
				}
			}

			let cell = AtomCell {
				x: i64::from(x),
				y: i64::from(y),
				pbase,
				tbase,
			};
			match &mut atom {
				Some((current, cells)) if *current == number => cells.push(cell),
				_ => {
					if let Some((_, cells)) = atom.replace((number, vec![cell])) {
						builder.add_atom(index, &cells)?;
						added += 1;
					}
				}
			}
		}
		if let Some((_, cells)) = atom {
			builder.add_atom(index, &cells)?;
			added += 1;
		}

		if added != numatoms {
			warn!(probeset = builder.probeset_name(index).unwrap_or_default(), numatoms, added, "block atom count disagrees with its cells");
		}
	}
	Ok(())
}

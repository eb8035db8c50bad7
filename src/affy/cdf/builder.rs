use std::path::PathBuf;

use tracing::debug;

use crate::affy::cdf::{CdfFormat, CellCoord, CellType, Probe, ProbeLayout, ProbeRef, ProbeSet};
use crate::affy::{AffyError, Grid, Result};

/// One cell record as read from a layout file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct AtomCell {
	pub x: i64,
	pub y: i64,
	pub pbase: u8,
	pub tbase: u8,
}

impl AtomCell {
	/// Perfect-match cells have differing or non-letter probe/target bases.
	fn is_pm(self) -> bool {
		self.pbase != self.tbase || !self.pbase.is_ascii_alphabetic() || !self.tbase.is_ascii_alphabetic()
	}
}

/// Incremental probe-layout assembly shared by the binary and text parsers.
#[derive(Debug)]
pub(crate) struct LayoutBuilder {
	cell_type: Grid<CellType>,
	seen: Grid<u8>,
	lookup: Grid<Option<ProbeRef>>,
	probesets: Vec<ProbeSet>,
	probe_index: Vec<ProbeRef>,
	pub numqcunits: usize,
	pub no_mm: bool,
}

impl LayoutBuilder {
	pub fn new(cols: usize, rows: usize) -> Result<Self> {
		if cols == 0 || rows == 0 {
			return Err(AffyError::InvalidDimensions {
				cols: cols as i64,
				rows: rows as i64,
			});
		}
		Ok(Self {
			cell_type: Grid::filled(cols, rows, CellType::Normal)?,
			seen: Grid::filled(cols, rows, 0)?,
			lookup: Grid::filled(cols, rows, None)?,
			probesets: Vec::new(),
			probe_index: Vec::new(),
			numqcunits: 0,
			no_mm: false,
		})
	}

	fn check(&self, section: &'static str, x: i64, y: i64) -> Result<(usize, usize)> {
		if !self.cell_type.contains(x, y) {
			return Err(AffyError::CoordinateOutOfRange {
				section,
				x,
				y,
				cols: self.cell_type.cols(),
				rows: self.cell_type.rows(),
			});
		}
		Ok((x as usize, y as usize))
	}

	pub fn mark_qc(&mut self, x: i64, y: i64) -> Result<()> {
		let (x, y) = self.check("qc", x, y)?;
		self.cell_type.set(x, y, CellType::Qc)
	}

	/// Start a probe set, or continue the previous one when `merge` is set and the name repeats.
	pub fn open_probeset(&mut self, name: &str, merge: bool) -> usize {
		if merge {
			if let Some(last) = self.probesets.last().filter(|last| last.name == name) {
				debug!(name, "merging block into previous probe set");
				return last.index;
			}
		}
		let index = self.probesets.len();
		self.probesets.push(ProbeSet {
			index,
			name: name.to_owned(),
			probes: Vec::new(),
		});
		index
	}

	pub fn probeset_name(&self, index: usize) -> Option<&str> {
		self.probesets.get(index).map(|set| set.name.as_str())
	}

	/// Add one atom's cells as a probe; returns whether a perfect-match cell was present.
	///
	/// A single-cell atom is its own mismatch partner. The first probe to
	/// claim a cell keeps it in the coordinate lookup.
	pub fn add_atom(&mut self, set: usize, cells: &[AtomCell]) -> Result<bool> {
		let mut coords = Vec::with_capacity(cells.len());
		for cell in cells {
			let (x, y) = self.check("probe", cell.x, cell.y)?;
			coords.push(CellCoord { x, y });
		}
		let Some(&first) = coords.first() else {
			return Ok(false);
		};

		let pm = cells.iter().zip(&coords).find(|(cell, _)| cell.is_pm()).map(|(_, coord)| *coord);
		let mm = cells.iter().zip(&coords).find(|(cell, _)| !cell.is_pm()).map(|(_, coord)| *coord);
		let (pm, mm, has_pm) = match (cells.len(), pm, mm) {
			(1, _, _) => (first, first, true),
			(_, Some(pm), Some(mm)) => (pm, mm, true),
			(_, Some(pm), None) => (pm, pm, true),
			(_, None, Some(mm)) => (mm, mm, false),
			(_, None, None) => (first, first, false),
		};
		if pm == mm {
			self.no_mm = true;
		}

		let probeset = self.probesets.get_mut(set).ok_or_else(|| AffyError::invalid_argument(format!("probe set {set} not opened")))?;
		let at = ProbeRef {
			probeset: set,
			probe: probeset.probes.len(),
		};
		probeset.probes.push(Probe {
			index: self.probe_index.len(),
			probeset: set,
			pm,
			mm,
		});
		self.probe_index.push(at);

		for coord in coords {
			let (x, y) = (coord.x, coord.y);
			if let Some(seen) = self.seen.get_mut(x, y) {
				*seen = seen.saturating_add(1);
			}
			self.cell_type.set(x, y, CellType::Normal)?;
			if let Some(slot) = self.lookup.get_mut(x, y) {
				slot.get_or_insert(at);
			}
		}
		Ok(has_pm)
	}

	pub fn finish(self, array_type: &str, filename: Option<PathBuf>, format: CdfFormat) -> ProbeLayout {
		let duplicate_probes = self.seen.as_slice().iter().any(|count| *count > 1);
		ProbeLayout {
			array_type: array_type.to_owned(),
			filename,
			format,
			numqcunits: self.numqcunits,
			no_mm: self.no_mm,
			duplicate_probes,
			exclusions: Vec::new(),
			spikeins: Vec::new(),
			probesets: self.probesets,
			cell_type: self.cell_type,
			lookup: self.lookup,
			probe_index: self.probe_index,
		}
	}
}

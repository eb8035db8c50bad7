use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::affy::compression::read_source;
use crate::affy::{AffyError, Grid, LoadOptions, NoProgress, Progress, Result};

mod binary;
mod builder;
mod names;
mod text;

pub(crate) use builder::{AtomCell, LayoutBuilder};
/// Single-column name list loader.
pub use names::load_name_list;

/// Magic number opening a binary probe-layout file.
pub const CDF_BINARY_MAGIC: i32 = 67;

/// Array type given to synthesized layouts.
pub const GENERIC_ARRAY_TYPE: &str = "generic";

/// On-disk encoding of a probe-layout file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CdfFormat {
	/// Little-endian binary layout.
	Binary,
	/// Bracketed plain-text layout.
	Text,
	/// Synthesized without a backing file.
	Generic,
}

impl CdfFormat {
	/// Render as a stable lowercase label.
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Binary => "binary",
			Self::Text => "text",
			Self::Generic => "generic",
		}
	}
}

/// Classification of one physical cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CellType {
	/// Ordinary probe cell, or unused.
	#[default]
	Normal,
	/// Quality-control cell.
	Qc,
}

/// Column/row position on the chip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub struct CellCoord {
	/// Column.
	pub x: usize,
	/// Row.
	pub y: usize,
}

/// One probe: a perfect-match cell and its mismatch partner.
///
/// Layouts without mismatch probes repeat the perfect-match cell as `mm`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct Probe {
	/// Layout-wide probe index.
	pub index: usize,
	/// Index of the owning probe set.
	pub probeset: usize,
	/// Perfect-match cell.
	pub pm: CellCoord,
	/// Mismatch cell.
	pub mm: CellCoord,
}

/// Named group of probes.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ProbeSet {
	/// Position in the layout.
	pub index: usize,
	/// Probe set name.
	pub name: String,
	/// Probes in file order.
	pub probes: Vec<Probe>,
}

/// Address of a probe inside the layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeRef {
	/// Probe set index.
	pub probeset: usize,
	/// Probe index within the set.
	pub probe: usize,
}

/// Parsed chip geometry and probe map.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeLayout {
	/// Array type the layout describes.
	pub array_type: String,
	/// Source path, when loaded from disk.
	pub filename: Option<PathBuf>,
	/// Encoding the layout came from.
	pub format: CdfFormat,
	/// Number of QC units declared by the file.
	pub numqcunits: usize,
	/// Set when probes carry no true mismatch partner.
	pub no_mm: bool,
	/// Set when some cell is claimed by more than one probe.
	pub duplicate_probes: bool,
	/// Sorted exclusion names.
	pub exclusions: Vec<String>,
	/// Sorted spike-in names.
	pub spikeins: Vec<String>,
	pub(crate) probesets: Vec<ProbeSet>,
	pub(crate) cell_type: Grid<CellType>,
	pub(crate) lookup: Grid<Option<ProbeRef>>,
	pub(crate) probe_index: Vec<ProbeRef>,
}

impl ProbeLayout {
	/// Synthesize a layout of `numprobes` single-probe sets stacked in one column.
	///
	/// Each set holds one probe at `(0, i)` with `mm == pm`; names are left
	/// empty for the caller to assign.
	pub fn generic(numprobes: usize) -> Result<Self> {
		if numprobes == 0 {
			return Err(AffyError::invalid_argument("generic layout needs at least one probe"));
		}
		let mut builder = LayoutBuilder::new(1, numprobes)?;
		for y in 0..numprobes {
			let set = builder.open_probeset("", false);
			builder.add_atom(set, &[AtomCell { x: 0, y: y as i64, pbase: b'-', tbase: b'-' }])?;
		}
		Ok(builder.finish(GENERIC_ARRAY_TYPE, None, CdfFormat::Generic))
	}

	/// Column count.
	pub fn numcols(&self) -> usize {
		self.cell_type.cols()
	}

	/// Row count.
	pub fn numrows(&self) -> usize {
		self.cell_type.rows()
	}

	/// Number of probe sets.
	pub fn numprobesets(&self) -> usize {
		self.probesets.len()
	}

	/// Number of probes across all sets.
	pub fn numprobes(&self) -> usize {
		self.probe_index.len()
	}

	/// All probe sets in file order.
	pub fn probesets(&self) -> &[ProbeSet] {
		&self.probesets
	}

	/// Probe set by index.
	pub fn probeset(&self, index: usize) -> Option<&ProbeSet> {
		self.probesets.get(index)
	}

	/// First probe set with `name`.
	pub fn find_probeset(&self, name: &str) -> Option<&ProbeSet> {
		self.probesets.iter().find(|set| set.name == name)
	}

	/// Rename a probe set, as done for generic layouts.
	pub fn set_probeset_name(&mut self, index: usize, name: impl Into<String>) -> Result<()> {
		let count = self.probesets.len();
		let set = self
			.probesets
			.get_mut(index)
			.ok_or_else(|| AffyError::invalid_argument(format!("probe set {index} out of range ({count} sets)")))?;
		set.name = name.into();
		Ok(())
	}

	/// Probe by layout-wide index.
	pub fn probe(&self, index: usize) -> Option<&Probe> {
		let at = self.probe_index.get(index)?;
		self.probesets.get(at.probeset)?.probes.get(at.probe)
	}

	/// Probe owning cell `(x, y)`, either as its PM or MM cell.
	pub fn probe_at(&self, x: usize, y: usize) -> Option<&Probe> {
		let at = (*self.lookup.get(x, y)?)?;
		self.probesets.get(at.probeset)?.probes.get(at.probe)
	}

	/// Classification of cell `(x, y)`.
	pub fn cell_type(&self, x: usize, y: usize) -> Option<CellType> {
		self.cell_type.get(x, y).copied()
	}

	/// True when `name` appears in the exclusion list.
	pub fn is_excluded(&self, name: &str) -> bool {
		self.exclusions.binary_search_by(|item| item.as_str().cmp(name)).is_ok()
	}

	/// True when `name` appears in the spike-in list.
	pub fn is_spikein(&self, name: &str) -> bool {
		self.spikeins.binary_search_by(|item| item.as_str().cmp(name)).is_ok()
	}

	/// Replace the exclusion list with the names in `path`.
	pub fn load_exclusions(&mut self, path: impl AsRef<Path>) -> Result<()> {
		self.exclusions = load_name_list(path)?;
		Ok(())
	}

	/// Replace the spike-in list with the names in `path`.
	pub fn load_spikeins(&mut self, path: impl AsRef<Path>) -> Result<()> {
		self.spikeins = load_name_list(path)?;
		Ok(())
	}
}

/// Decode a probe layout held in memory, choosing binary or text by magic.
pub fn parse_cdf(array_type: &str, filename: Option<PathBuf>, bytes: &[u8], progress: &mut dyn Progress) -> Result<ProbeLayout> {
	let magic = bytes.get(..4).map(|raw| i32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]));
	let (format, builder) = if magic == Some(CDF_BINARY_MAGIC) {
		(CdfFormat::Binary, binary::parse(bytes, progress)?)
	} else {
		(CdfFormat::Text, text::parse(bytes, progress)?)
	};
	let layout = builder.finish(array_type, filename, format);
	info!(
		array_type,
		format = format.as_str(),
		probesets = layout.numprobesets(),
		probes = layout.numprobes(),
		no_mm = layout.no_mm,
		duplicate_probes = layout.duplicate_probes,
		"probe layout loaded"
	);
	Ok(layout)
}

/// Load a probe layout from an explicit path.
///
/// `array_type` defaults to the file stem.
pub fn load_cdf_file_byname(path: impl AsRef<Path>, array_type: Option<&str>, options: &LoadOptions) -> Result<ProbeLayout> {
	let path = path.as_ref();
	let (_, bytes) = read_source(path, options.max_decompressed_bytes).map_err(|err| match err {
		AffyError::Io(io) if io.kind() == std::io::ErrorKind::NotFound => AffyError::NotFound {
			what: format!("probe layout {}", path.display()),
		},
		other => other,
	})?;
	let stem = path.file_stem().map(|stem| stem.to_string_lossy().into_owned()).unwrap_or_default();
	parse_cdf(array_type.unwrap_or(&stem), Some(path.to_path_buf()), &bytes, &mut NoProgress)
}

/// Candidate paths for `array_type`, in search order.
pub fn cdf_search_paths(array_type: &str, hint: Option<&Path>) -> Vec<PathBuf> {
	let mut out = Vec::new();
	if let Some(hint) = hint {
		let explicit = hint.extension().is_some_and(|ext| ext == "CDF" || ext == "cdf");
		if explicit {
			out.push(hint.to_path_buf());
		}
		out.push(hint.join(format!("{array_type}.CDF")));
		out.push(hint.join(format!("{array_type}.cdf")));
	}
	out.push(PathBuf::from(format!("{array_type}.CDF")));
	out.push(PathBuf::from(format!("{array_type}.cdf")));
	out
}

/// Locate and load the probe layout for `array_type`.
///
/// Tries an explicit `.CDF`/`.cdf` hint, then `hint/{type}.CDF|cdf`, then
/// `./{type}.CDF|cdf`.
pub fn load_cdf_file(array_type: &str, hint: Option<&Path>, options: &LoadOptions) -> Result<ProbeLayout> {
	for candidate in cdf_search_paths(array_type, hint) {
		if candidate.is_file() {
			debug!(path = %candidate.display(), "probe layout found");
			return load_cdf_file_byname(&candidate, Some(array_type), options);
		}
	}
	Err(AffyError::NotFound {
		what: format!("probe layout for array type {array_type}"),
	})
}

#[cfg(test)]
mod tests;

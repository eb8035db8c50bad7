use std::fmt;

use tracing::{debug, warn};

use crate::affy::Result;
use crate::affy::cel::{CelFile, CelFormat};

/// Named section of an intensity file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
	/// Dimensions and header metadata.
	Header,
	/// Per-cell values.
	Intensity,
	/// Per-cell standard deviations (container variant).
	StdDev,
	/// Per-cell pixel counts (container variant).
	Pixels,
	/// Masked coordinate list.
	Masks,
	/// Outlier coordinate list.
	Outliers,
	/// Modified-cell list, never parsed.
	Modified,
	/// Trailing sub-grid records, never parsed.
	Subgrids,
}

impl Section {
	/// Stable lowercase label.
	pub fn label(self) -> &'static str {
		match self {
			Self::Header => "header",
			Self::Intensity => "intensity",
			Self::StdDev => "stddev",
			Self::Pixels => "pixel",
			Self::Masks => "mask",
			Self::Outliers => "outlier",
			Self::Modified => "modified",
			Self::Subgrids => "subgrid",
		}
	}
}

impl fmt::Display for Section {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.label())
	}
}

/// What to do with a bad record inside a section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordPolicy {
	/// Propagate the error and fail the whole load.
	Abort,
	/// Keep what was parsed, drop the rest of the section, flag the file corrupt.
	Salvage,
}

/// Per-section handling rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionPolicy {
	/// Reaction to a short read or out-of-range record.
	pub on_bad_record: RecordPolicy,
	/// Whether the section still runs once an earlier section was salvaged.
	pub runs_after_salvage: bool,
}

/// Result of one successfully handled section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionOutcome {
	/// Every declared record was read.
	Complete,
	/// Section was truncated after `kept` records.
	Salvaged {
		/// Records kept before truncation.
		kept: usize,
	},
}

/// Policy table keyed on variant and section.
///
/// Only the binary and container coordinate lists (plus the optional
/// container QC datasets) salvage; text sections have no record framing to
/// resynchronize on and always abort.
pub fn section_policy(format: CelFormat, section: Section) -> SectionPolicy {
	let on_bad_record = match (format, section) {
		(CelFormat::Binary | CelFormat::Calvin, Section::Masks | Section::Outliers) => RecordPolicy::Salvage,
		(CelFormat::Calvin, Section::StdDev | Section::Pixels) => RecordPolicy::Salvage,
		_ => RecordPolicy::Abort,
	};
	SectionPolicy {
		on_bad_record,
		runs_after_salvage: false,
	}
}

/// Run `sections` in order, consulting the policy table between them.
pub(crate) fn run_sections<F>(cel: &mut CelFile, sections: &[Section], mut parse: F) -> Result<()>
where
	F: FnMut(&mut CelFile, Section) -> Result<SectionOutcome>,
{
	for &section in sections {
		let policy = section_policy(cel.format, section);
		if cel.corrupt && !policy.runs_after_salvage {
			debug!(filename = %cel.filename, %section, "skipping section after salvage");
			continue;
		}
		if let SectionOutcome::Salvaged { kept } = parse(cel, section)? {
			debug!(filename = %cel.filename, %section, kept, "section salvaged");
			cel.corrupt = true;
		}
	}
	Ok(())
}

/// Record a declared-length coordinate list, applying the section's policy
/// to short reads and out-of-range entries.
pub(crate) fn collect_coords<F>(cel: &mut CelFile, section: Section, declared: usize, mut next: F) -> Result<SectionOutcome>
where
	F: FnMut() -> Result<(i64, i64)>,
{
	let policy = section_policy(cel.format, section).on_bad_record;

	for _ in 0..declared {
		let (x, y) = match next() {
			Ok(coord) => coord,
			Err(err) if policy == RecordPolicy::Salvage => {
				warn!(filename = %cel.filename, %section, error = %err, "CORRUPT_CEL_FILE: I/O error in {section} section");
				return Ok(SectionOutcome::Salvaged { kept: kept(cel, section) });
			}
			Err(err) => return Err(err),
		};

		match cel.flag(section, x, y) {
			Ok(()) => {}
			Err(_) if policy == RecordPolicy::Salvage => {
				warn!(filename = %cel.filename, %section, x, y, "CORRUPT_CEL_FILE: invalid {section} location");
				return Ok(SectionOutcome::Salvaged { kept: kept(cel, section) });
			}
			Err(err) => return Err(err),
		}
	}

	Ok(SectionOutcome::Complete)
}

fn kept(cel: &CelFile, section: Section) -> usize {
	match section {
		Section::Outliers => cel.numoutliers(),
		_ => cel.nummasks(),
	}
}

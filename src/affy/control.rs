use crate::affy::{ProbeLayout, ProbeSet};

/// True when a probe-set name follows the control-probe naming conventions.
///
/// Controls start with `AFFX`, mention `control`, or mention a spike-in
/// (`spikein`, `spike-in`, `spike_in`, `spike in`); matching ignores case
/// except for the `AFFX` prefix.
pub fn is_control_name(name: &str) -> bool {
	if name.starts_with("AFFX") {
		return true;
	}
	let lower = name.to_ascii_lowercase();
	if lower.contains("control") {
		return true;
	}
	lower.match_indices("spike").any(|(idx, _)| {
		let rest = &lower[idx + "spike".len()..];
		["in", "-in", "_in", " in"].iter().any(|sep| rest.starts_with(sep))
	})
}

impl ProbeSet {
	/// True when this set's name marks it as a control.
	pub fn is_control(&self) -> bool {
		is_control_name(&self.name)
	}
}

impl ProbeLayout {
	/// Probe sets whose names mark them as controls.
	pub fn control_probesets(&self) -> impl Iterator<Item = &ProbeSet> {
		self.probesets().iter().filter(|set| set.is_control())
	}
}

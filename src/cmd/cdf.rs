use std::path::PathBuf;

use affyio::affy::{LoadOptions, Probe, Result, load_cdf_file_byname};

use crate::cmd::util::emit_json;

#[derive(clap::Args)]
pub struct Args {
	pub path: PathBuf,
	#[arg(long)]
	pub json: bool,
	#[arg(long, default_value_t = 5)]
	pub probesets: usize,
	/// Array type to record instead of the file stem.
	#[arg(long)]
	pub array_type: Option<String>,
}

#[derive(serde::Serialize)]
struct CdfJson<'a> {
	array_type: &'a str,
	format: &'static str,
	cols: usize,
	rows: usize,
	numprobesets: usize,
	numprobes: usize,
	numqcunits: usize,
	no_mm: bool,
	duplicate_probes: bool,
	controls: usize,
	probesets: Vec<ProbeSetJson<'a>>,
}

#[derive(serde::Serialize)]
struct ProbeSetJson<'a> {
	index: usize,
	name: &'a str,
	control: bool,
	probes: &'a [Probe],
}

/// Print a probe layout's summary and its leading probe sets.
pub fn run(args: Args) -> Result<()> {
	let Args {
		path,
		json,
		probesets,
		array_type,
	} = args;

	let layout = load_cdf_file_byname(&path, array_type.as_deref(), &LoadOptions::default())?;

	let payload = CdfJson {
		array_type: &layout.array_type,
		format: layout.format.as_str(),
		cols: layout.numcols(),
		rows: layout.numrows(),
		numprobesets: layout.numprobesets(),
		numprobes: layout.numprobes(),
		numqcunits: layout.numqcunits,
		no_mm: layout.no_mm,
		duplicate_probes: layout.duplicate_probes,
		controls: layout.control_probesets().count(),
		probesets: layout
			.probesets()
			.iter()
			.take(probesets)
			.map(|set| ProbeSetJson {
				index: set.index,
				name: &set.name,
				control: set.is_control(),
				probes: &set.probes,
			})
			.collect(),
	};

	if json {
		return emit_json(&payload);
	}

	println!("array_type: {}", payload.array_type);
	println!("format: {}", payload.format);
	println!("dims: {}x{}", payload.cols, payload.rows);
	println!("probesets: {}", payload.numprobesets);
	println!("probes: {}", payload.numprobes);
	println!("qc_units: {}", payload.numqcunits);
	println!("no_mm: {}", payload.no_mm);
	println!("duplicate_probes: {}", payload.duplicate_probes);
	println!("controls: {}", payload.controls);
	for set in &payload.probesets {
		let marker = if set.control { " [control]" } else { "" };
		println!("  {} {} ({} probes){marker}", set.index, set.name, set.probes.len());
		for probe in set.probes {
			println!("    {}: pm=({}, {}) mm=({}, {})", probe.index, probe.pm.x, probe.pm.y, probe.mm.x, probe.mm.y);
		}
	}
	Ok(())
}

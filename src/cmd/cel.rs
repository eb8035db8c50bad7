use std::path::PathBuf;

use affyio::affy::{LoadOptions, Result, load_cel_file};

use crate::cmd::util::{emit_json, or_dash};

#[derive(clap::Args)]
pub struct Args {
	pub path: PathBuf,
	#[arg(long)]
	pub json: bool,
	#[arg(long, default_value_t = 8)]
	pub cells: usize,
	#[arg(long)]
	pub values_only: bool,
}

#[derive(serde::Serialize)]
struct CelJson {
	path: String,
	format: &'static str,
	version: i32,
	array_type: Option<String>,
	cols: usize,
	rows: usize,
	nummasks: usize,
	numoutliers: usize,
	corrupt: bool,
	masks: Vec<(usize, usize)>,
	outliers: Vec<(usize, usize)>,
	cells: Vec<CellJson>,
}

#[derive(serde::Serialize)]
struct CellJson {
	x: usize,
	y: usize,
	value: f64,
	stddev: Option<f64>,
	numpixels: Option<i16>,
	masked: bool,
	outlier: bool,
}

/// Print an intensity file's header, flag sets, and its leading cells.
pub fn run(args: Args) -> Result<()> {
	let Args {
		path,
		json,
		cells,
		values_only,
	} = args;

	let options = if values_only { LoadOptions::values_only() } else { LoadOptions::default() };
	let cel = load_cel_file(&path, &options)?;

	let listed: Vec<CellJson> = cel
		.cells()
		.iter()
		.take(cells)
		.map(|((x, y), cell)| CellJson {
			x,
			y,
			value: cell.value,
			stddev: cell.qc.map(|qc| qc.stddev),
			numpixels: cell.qc.map(|qc| qc.numpixels),
			masked: cel.is_masked(x, y),
			outlier: cel.is_outlier(x, y),
		})
		.collect();

	let payload = CelJson {
		path: path.display().to_string(),
		format: cel.format.as_str(),
		version: cel.version,
		array_type: cel.array_type.clone(),
		cols: cel.numcols(),
		rows: cel.numrows(),
		nummasks: cel.nummasks(),
		numoutliers: cel.numoutliers(),
		corrupt: cel.corrupt,
		masks: cel.mask_coords(),
		outliers: cel.outlier_coords(),
		cells: listed,
	};

	if json {
		return emit_json(&payload);
	}

	println!("path: {}", payload.path);
	println!("format: {}", payload.format);
	println!("version: {}", payload.version);
	println!("array_type: {}", or_dash(payload.array_type.as_deref()));
	println!("dims: {}x{}", payload.cols, payload.rows);
	println!("masks: {}", payload.nummasks);
	println!("outliers: {}", payload.numoutliers);
	println!("corrupt: {}", payload.corrupt);
	for cell in &payload.cells {
		let mut flags = String::new();
		if cell.masked {
			flags.push_str(" masked");
		}
		if cell.outlier {
			flags.push_str(" outlier");
		}
		match (cell.stddev, cell.numpixels) {
			(Some(stddev), Some(numpixels)) => println!("  ({}, {}) {:.1} sd={stddev:.2} n={numpixels}{flags}", cell.x, cell.y, cell.value),
			_ => println!("  ({}, {}) {:.1}{flags}", cell.x, cell.y, cell.value),
		}
	}
	Ok(())
}

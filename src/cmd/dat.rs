use std::path::PathBuf;

use affyio::affy::{AffyError, DatHeader, LoadOptions, Point, Result, load_dat_file};

use crate::cmd::util::{emit_json, parse_pair};

#[derive(clap::Args)]
pub struct Args {
	pub path: PathBuf,
	#[arg(long)]
	pub json: bool,
	/// Chip cell dimensions, as `COLSxROWS`.
	#[arg(long)]
	pub layout: Option<String>,
	/// Cell to locate in the image, as `X,Y`; requires `--layout`.
	#[arg(long)]
	pub cell: Option<String>,
}

#[derive(serde::Serialize)]
struct DatJson<'a> {
	path: String,
	header: &'a DatHeader,
	cell: Option<CellJson>,
}

#[derive(serde::Serialize)]
struct CellJson {
	x: usize,
	y: usize,
	pixel: Point,
	region_cols: usize,
	region_rows: usize,
	mean: Option<f64>,
}

/// Print a pixel image's header, optionally locating one cell in the image.
pub fn run(args: Args) -> Result<()> {
	let Args { path, json, layout, cell } = args;

	let dat = load_dat_file(&path, &LoadOptions::default())?;

	let located = match (layout, cell) {
		(Some(layout), Some(cell)) => {
			let (cols, rows) = parse_pair(&layout)?;
			let (x, y) = parse_pair(&cell)?;
			if x >= cols || y >= rows {
				return Err(AffyError::InvalidArgument {
					reason: format!("cell {x},{y} outside {cols}x{rows} layout"),
				});
			}
			let region = dat.pixel_region(cols, rows, x as i64, y as i64)?;
			let mean = (!region.pixels.is_empty()).then(|| region.pixels.iter().map(|&p| f64::from(p)).sum::<f64>() / region.pixels.len() as f64);
			Some(CellJson {
				x,
				y,
				pixel: region.origin,
				region_cols: region.numcols,
				region_rows: region.numrows,
				mean,
			})
		}
		(None, None) => None,
		_ => {
			return Err(AffyError::InvalidArgument {
				reason: "--layout and --cell must be given together".to_owned(),
			});
		}
	};

	let header = &dat.header;
	if json {
		return emit_json(&DatJson {
			path: path.display().to_string(),
			header,
			cell: located,
		});
	}

	println!("path: {}", path.display());
	println!("dims: {}x{}", header.numcols, header.numrows);
	println!("pixels: {}", header.numpixels);
	println!("range: {}..{}", header.minpixel, header.maxpixel);
	println!("mean: {:.2}", header.meanpixel);
	println!("std_dev: {:.2}", header.std_dev_pixel);
	println!("pixel_size: {}x{}", header.pixel_width, header.pixel_height);
	println!("scan_speed: {}", header.scanspeed);
	println!("timestamp: {}", header.timestamp);
	println!("scanner_id: {}", header.scanner_id);
	println!("array_type: {}", header.array_type);
	println!("cell_margin: {}", header.cellmargin);
	let grid = &header.grid;
	println!(
		"grid: ul=({}, {}) ur=({}, {}) lr=({}, {}) ll=({}, {})",
		grid.upper_left.x, grid.upper_left.y, grid.upper_right.x, grid.upper_right.y, grid.lower_right.x, grid.lower_right.y, grid.lower_left.x, grid.lower_left.y
	);
	if let Some(cell) = located {
		println!("cell ({}, {}): pixel=({}, {}) region={}x{}", cell.x, cell.y, cell.pixel.x, cell.pixel.y, cell.region_cols, cell.region_rows);
		if let Some(mean) = cell.mean {
			println!("cell_mean: {mean:.2}");
		}
	}
	Ok(())
}

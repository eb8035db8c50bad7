use std::path::PathBuf;

use affyio::affy::{DataGroup, DataHeader, Param, ParamValue, Result, load_calvin_file};

use crate::cmd::util::emit_json;

#[derive(clap::Args)]
pub struct Args {
	pub path: PathBuf,
	#[arg(long)]
	pub json: bool,
}

#[derive(serde::Serialize)]
struct CalvinJson<'a> {
	path: String,
	version: u8,
	num_datagroups: usize,
	header: &'a DataHeader,
	groups: &'a [DataGroup],
}

/// Print a generic container's headers, parameter dictionaries, and data set layout.
pub fn run(args: Args) -> Result<()> {
	let Args { path, json } = args;

	let container = load_calvin_file(&path)?;
	if json {
		return emit_json(&CalvinJson {
			path: path.display().to_string(),
			version: container.version,
			num_datagroups: container.num_datagroups,
			header: &container.header,
			groups: &container.groups,
		});
	}

	println!("path: {}", path.display());
	println!("version: {}", container.version);
	println!("datagroups: {}", container.num_datagroups);
	print_header(&container.header, 0);
	for group in &container.groups {
		println!("group {} ({} of {} datasets)", group.name, group.datasets.len(), group.declared_datasets);
		for dataset in &group.datasets {
			println!("  dataset {}: {} rows, row_len {}", dataset.name, dataset.num_rows, dataset.row_len());
			for column in &dataset.columns {
				println!("    column {}: {:?} ({} bytes)", column.name, column.kind, column.size);
			}
			for param in &dataset.params {
				println!("    {}", render_param(param));
			}
		}
	}
	Ok(())
}

fn print_header(header: &DataHeader, depth: usize) {
	let pad = "  ".repeat(depth);
	println!("{pad}header {}", header.type_identifier);
	println!("{pad}  file_id: {}", header.file_identifier);
	println!("{pad}  timestamp: {}", header.timestamp);
	println!("{pad}  locale: {}", header.locale);
	for param in &header.params {
		println!("{pad}  {}", render_param(param));
	}
	for parent in &header.parents {
		print_header(parent, depth + 1);
	}
}

fn render_param(param: &Param) -> String {
	let value = match &param.value {
		ParamValue::Text(text) => format!("{text:?}"),
		ParamValue::Unknown(raw) => format!("<{} raw bytes>", raw.len()),
		other => other.as_f64().map(|v| v.to_string()).unwrap_or_default(),
	};
	format!("{} = {value} [{}]", param.name, param.type_label)
}

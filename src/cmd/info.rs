use std::path::PathBuf;

use affyio::affy::{
	AffyError, CDF_BINARY_MAGIC, CalvinFile, CelFormat, DAT_MAGIC, DatFile, LoadOptions, NoProgress, Result, get_array_type, parse_cdf, parse_cel, read_source,
};

use crate::cmd::util::{emit_json, or_dash};

#[derive(clap::Args)]
pub struct Args {
	pub path: PathBuf,
	#[arg(long)]
	pub json: bool,
}

/// Which parser a file belongs to, judged from its leading bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileKind {
	Cel(CelFormat),
	CdfBinary,
	CdfText,
	Calvin,
	Dat,
}

impl FileKind {
	fn sniff(bytes: &[u8]) -> Option<Self> {
		if bytes.first() == Some(&DAT_MAGIC) {
			return Some(Self::Dat);
		}
		if bytes.get(..4) == Some(&CDF_BINARY_MAGIC.to_le_bytes()[..]) {
			return Some(Self::CdfBinary);
		}
		let head = String::from_utf8_lossy(&bytes[..bytes.len().min(64)]);
		let head = head.trim_start_matches('\u{feff}').trim_start();
		if head.starts_with("[CDF]") {
			return Some(Self::CdfText);
		}
		match CelFormat::sniff(bytes) {
			CelFormat::Calvin => Some(Self::Calvin),
			CelFormat::Text if !head.starts_with("[CEL]") => None,
			format => Some(Self::Cel(format)),
		}
	}

	fn label(self) -> &'static str {
		match self {
			Self::Cel(CelFormat::Binary) => "cel-binary",
			Self::Cel(CelFormat::Text) => "cel-text",
			Self::Cel(CelFormat::Calvin) | Self::Calvin => "calvin",
			Self::CdfBinary => "cdf-binary",
			Self::CdfText => "cdf-text",
			Self::Dat => "dat",
		}
	}
}

#[derive(serde::Serialize)]
struct InfoJson {
	path: String,
	compression: &'static str,
	format: &'static str,
	cols: Option<usize>,
	rows: Option<usize>,
	array_type: Option<String>,
	records: Option<usize>,
	records_label: Option<&'static str>,
}

/// Print the sniffed format, dimensions, and headline counts of any supported file.
pub fn run(args: Args) -> Result<()> {
	let Args { path, json } = args;

	let options = LoadOptions::values_only();
	let (compression, bytes) = read_source(&path, options.max_decompressed_bytes)?;
	let kind = FileKind::sniff(&bytes).ok_or_else(|| AffyError::Unsupported {
		what: format!("unrecognized file {}", path.display()),
	})?;
	let name = path.display().to_string();

	let mut info = InfoJson {
		path: name.clone(),
		compression: compression.as_str(),
		format: kind.label(),
		cols: None,
		rows: None,
		array_type: None,
		records: None,
		records_label: None,
	};

	match kind {
		FileKind::Cel(_) => {
			let cel = parse_cel(&name, &bytes, &options, &mut NoProgress)?;
			info.cols = Some(cel.numcols());
			info.rows = Some(cel.numrows());
			info.array_type = cel.array_type.clone();
			info.records = Some(cel.nummasks());
			info.records_label = Some("masks");
		}
		FileKind::CdfBinary | FileKind::CdfText => {
			let stem = path.file_stem().map(|stem| stem.to_string_lossy().into_owned()).unwrap_or_default();
			let layout = parse_cdf(&stem, Some(path.clone()), &bytes, &mut NoProgress)?;
			info.cols = Some(layout.numcols());
			info.rows = Some(layout.numrows());
			info.array_type = Some(layout.array_type.clone());
			info.records = Some(layout.numprobesets());
			info.records_label = Some("probesets");
		}
		FileKind::Calvin => {
			let container = CalvinFile::parse(&bytes)?;
			info.array_type = get_array_type(&bytes).ok();
			info.records = Some(container.groups.iter().map(|group| group.datasets.len()).sum());
			info.records_label = Some("datasets");
			let dimension = |key: &str| container.find_param(key).and_then(|param| param.value.as_i64()).and_then(|v| usize::try_from(v).ok());
			info.cols = dimension("affymetrix-cel-cols");
			info.rows = dimension("affymetrix-cel-rows");
		}
		FileKind::Dat => {
			let dat = DatFile::parse(&bytes)?;
			info.cols = Some(dat.header.numcols);
			info.rows = Some(dat.header.numrows);
			info.array_type = Some(dat.header.array_type.clone());
			info.records = Some(dat.header.numpixels);
			info.records_label = Some("pixels");
		}
	}

	if json {
		return emit_json(&info);
	}

	let number = |value: Option<usize>| value.map_or_else(|| "-".to_owned(), |v| v.to_string());
	println!("path: {}", info.path);
	println!("compression: {}", info.compression);
	println!("format: {}", info.format);
	println!("cols: {}", number(info.cols));
	println!("rows: {}", number(info.rows));
	println!("array_type: {}", or_dash(info.array_type.as_deref()));
	if let Some(label) = info.records_label {
		println!("{label}: {}", number(info.records));
	}
	Ok(())
}

//! Shared test helpers for workspace crates.
//!
//! Builders here synthesize byte-exact instrument files so tests never need
//! checked-in binary fixtures.

use std::path::{Path, PathBuf};

/// Write `bytes` to `dir/name` and return the path.
pub fn write_fixture(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
	let path = dir.join(name);
	std::fs::write(&path, bytes).expect("fixture written");
	path
}

/// Fresh temporary directory for on-disk fixtures.
pub fn temp_dir() -> tempfile::TempDir {
	tempfile::tempdir().expect("temporary directory")
}

/// Wrap `bytes` in a single zstd frame.
pub fn zstd_frame(bytes: &[u8]) -> Vec<u8> {
	zstd::stream::encode_all(bytes, 0).expect("zstd encode")
}

/// Parse command stdout as JSON.
pub fn stdout_json(output: &std::process::Output) -> serde_json::Value {
	assert!(output.status.success(), "command failed: {}", String::from_utf8_lossy(&output.stderr));
	serde_json::from_slice(&output.stdout).expect("stdout is JSON")
}

fn put_i32(out: &mut Vec<u8>, value: i32) {
	out.extend_from_slice(&value.to_le_bytes());
}

fn put_u16(out: &mut Vec<u8>, value: u16) {
	out.extend_from_slice(&value.to_le_bytes());
}

fn put_i16(out: &mut Vec<u8>, value: i16) {
	out.extend_from_slice(&value.to_le_bytes());
}

fn put_padded(out: &mut Vec<u8>, text: &str, width: usize) {
	let mut field = text.as_bytes().to_vec();
	field.resize(width, 0);
	out.extend_from_slice(&field);
}

/// Header text carrying the `.1sq` array-type marker, as scanners write it.
pub fn dat_header_line(array_type: &str) -> String {
	format!("[0..46114]  test:CLS=8176 RWS=8176 XIN=1  YIN=1  VE=30        2.0 05/14/14 10:10:10 50205710  M10   \u{14}  \u{14} {array_type}.1sq \u{14}  \u{14}  \u{14}  \u{14}  \u{14} 570 \u{14} 25356.509766 \u{14} 3.500000 \u{14} 0.7000 \u{14} 3")
}

/// One intensity record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CelRecord {
	/// Mean intensity.
	pub value: f32,
	/// Pixel standard deviation.
	pub stddev: f32,
	/// Pixel count.
	pub numpixels: i16,
}

/// Intensity-file content shared by the three variant encoders.
#[derive(Debug, Clone)]
pub struct CelFixture {
	/// Column count.
	pub cols: usize,
	/// Row count.
	pub rows: usize,
	/// Array type written into the header.
	pub array_type: String,
	/// Records, `x` fastest.
	pub records: Vec<CelRecord>,
	/// Mask coordinates.
	pub masks: Vec<(i16, i16)>,
	/// Outlier coordinates.
	pub outliers: Vec<(i16, i16)>,
	/// Mask count written to the binary header, when it should lie.
	pub declared_masks: Option<i32>,
}

impl CelFixture {
	/// `cols` x `rows` grid whose value at `(x, y)` is `100 * y + x`.
	pub fn new(cols: usize, rows: usize, array_type: &str) -> Self {
		let records = (0..rows)
			.flat_map(|y| {
				(0..cols).map(move |x| CelRecord {
					value: (100 * y + x) as f32,
					stddev: 1.5,
					numpixels: 16,
				})
			})
			.collect();
		Self {
			cols,
			rows,
			array_type: array_type.to_owned(),
			records,
			masks: Vec::new(),
			outliers: Vec::new(),
			declared_masks: None,
		}
	}

	/// Replace the values, `x` fastest.
	pub fn with_values(mut self, values: &[f32]) -> Self {
		for (record, value) in self.records.iter_mut().zip(values) {
			record.value = *value;
		}
		self
	}

	/// Set the mask list.
	pub fn with_masks(mut self, masks: &[(i16, i16)]) -> Self {
		self.masks = masks.to_vec();
		self
	}

	/// Set the outlier list.
	pub fn with_outliers(mut self, outliers: &[(i16, i16)]) -> Self {
		self.outliers = outliers.to_vec();
		self
	}

	/// Encode as a version 4 binary intensity file.
	pub fn encode_binary(&self) -> Vec<u8> {
		let mut out = Vec::new();
		put_i32(&mut out, 64);
		put_i32(&mut out, 4);
		put_i32(&mut out, self.cols as i32);
		put_i32(&mut out, self.rows as i32);
		put_i32(&mut out, (self.cols * self.rows) as i32);

		let header = format!("Cols={}\nRows={}\nTotalX={}\nTotalY={}\nDatHeader={}\n", self.cols, self.rows, self.cols, self.rows, dat_header_line(&self.array_type));
		for block in [header.as_str(), "Percentile", "Percentile:75;CellMargin:2"] {
			put_i32(&mut out, block.len() as i32);
			out.extend_from_slice(block.as_bytes());
		}

		put_i32(&mut out, 2);
		put_i32(&mut out, self.outliers.len() as i32);
		put_i32(&mut out, self.declared_masks.unwrap_or(self.masks.len() as i32));
		put_i32(&mut out, 0);

		for record in &self.records {
			out.extend_from_slice(&record.value.to_le_bytes());
			out.extend_from_slice(&record.stddev.to_le_bytes());
			put_i16(&mut out, record.numpixels);
		}
		for &(x, y) in self.masks.iter().chain(&self.outliers) {
			put_i16(&mut out, x);
			put_i16(&mut out, y);
		}
		out
	}

	/// Encode as a version 3 text intensity file.
	pub fn encode_text(&self) -> String {
		let mut out = String::new();
		out.push_str("[CEL]\r\nVersion=3\r\n\r\n[HEADER]\r\n");
		out.push_str(&format!("Cols={}\r\nRows={}\r\nTotalX={}\r\nTotalY={}\r\n", self.cols, self.rows, self.cols, self.rows));
		out.push_str(&format!("DatHeader={}\r\n", dat_header_line(&self.array_type)));
		out.push_str("Algorithm=Percentile\r\nAlgorithmParameters=Percentile:75;CellMargin:2\r\n\r\n");

		out.push_str(&format!("[INTENSITY]\r\nNumberCells={}\r\nCellHeader=X\tY\tMEAN\tSTDV\tNPIXELS\r\n", self.records.len()));
		for (index, record) in self.records.iter().enumerate() {
			let (x, y) = (index % self.cols, index / self.cols);
			out.push_str(&format!("{x:>3}\t{y:>3}\t{:.1}\t{:.1}\t{:>3}\r\n", record.value, record.stddev, record.numpixels));
		}

		for (header, coords) in [("MASKS", &self.masks), ("OUTLIERS", &self.outliers)] {
			out.push_str(&format!("\r\n[{header}]\r\nNumberCells={}\r\nCellHeader=X\tY\r\n", coords.len()));
			for (x, y) in coords {
				out.push_str(&format!("{x}\t{y}\r\n"));
			}
		}
		out.push_str("\r\n[MODIFIED]\r\nNumberCells=0\r\nCellHeader=X\tY\tORIGMEAN\r\n");
		out
	}

	/// Generic container holding this content as a CEL file.
	///
	/// `datasets` names which of `Intensity`, `StdDev`, `Pixel`, `Mask` and
	/// `Outlier` to include, in order.
	pub fn calvin(&self, datasets: &[&str]) -> CalvinFixture {
		let mut header = CalvinHeader::new("affymetrix-calvin-intensity");
		header.params = vec![
			CalvinParam::new("affymetrix-array-type", CalvinValue::Text(self.array_type.clone())),
			CalvinParam::new("affymetrix-cel-rows", CalvinValue::Int32(self.rows as i32)),
			CalvinParam::new("affymetrix-cel-cols", CalvinValue::Int32(self.cols as i32)),
		];

		let mut group = CalvinGroup::new("");
		for name in datasets {
			let dataset = match *name {
				"Intensity" => CalvinDataSet::floats(name, "Intensity", &self.records.iter().map(|r| r.value).collect::<Vec<_>>()),
				"StdDev" => CalvinDataSet::floats(name, "StdDev", &self.records.iter().map(|r| r.stddev).collect::<Vec<_>>()),
				"Pixel" => CalvinDataSet::shorts(name, "Pixel", &self.records.iter().map(|r| r.numpixels).collect::<Vec<_>>()),
				"Mask" => CalvinDataSet::points(name, &self.masks),
				"Outlier" => CalvinDataSet::points(name, &self.outliers),
				other => panic!("unknown CEL data set {other}"),
			};
			group.datasets.push(dataset);
		}

		CalvinFixture {
			version: 1,
			header,
			groups: vec![group],
		}
	}
}

/// Column type codes of the generic container.
pub mod calvin_type {
	/// Signed 16-bit integer.
	pub const INT16: u8 = 2;
	/// Signed 32-bit integer.
	pub const INT32: u8 = 4;
	/// 32-bit float.
	pub const FLOAT: u8 = 6;
	/// UTF-16 text.
	pub const WIDE_TEXT: u8 = 9;
}

/// Parameter value with its MIME label.
#[derive(Debug, Clone, PartialEq)]
pub enum CalvinValue {
	/// `text/x-calvin-integer-16`.
	Int16(i16),
	/// `text/x-calvin-integer-32`.
	Int32(i32),
	/// `text/x-calvin-unsigned-integer-8`.
	UInt8(u8),
	/// `text/x-calvin-float`.
	Float(f32),
	/// `text/ascii`.
	Ascii(String),
	/// `text/plain`, stored as UTF-16BE.
	Text(String),
	/// Arbitrary label and bytes.
	Raw(String, Vec<u8>),
}

impl CalvinValue {
	fn encode(&self) -> (Vec<u8>, &str) {
		match self {
			Self::Int16(v) => (v.to_be_bytes().to_vec(), "text/x-calvin-integer-16"),
			Self::Int32(v) => (v.to_be_bytes().to_vec(), "text/x-calvin-integer-32"),
			Self::UInt8(v) => (vec![*v], "text/x-calvin-unsigned-integer-8"),
			Self::Float(v) => (v.to_be_bytes().to_vec(), "text/x-calvin-float"),
			Self::Ascii(text) => (text.as_bytes().to_vec(), "text/ascii"),
			Self::Text(text) => (utf16be(text), "text/plain"),
			Self::Raw(label, raw) => (raw.clone(), label),
		}
	}
}

/// Named parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct CalvinParam {
	/// Parameter name.
	pub name: String,
	/// Parameter value.
	pub value: CalvinValue,
}

impl CalvinParam {
	/// Build a parameter.
	pub fn new(name: &str, value: CalvinValue) -> Self {
		Self { name: name.to_owned(), value }
	}
}

/// Data header with parents.
#[derive(Debug, Clone, PartialEq)]
pub struct CalvinHeader {
	/// Type GUID.
	pub type_identifier: String,
	/// File GUID.
	pub file_identifier: String,
	/// Timestamp.
	pub timestamp: String,
	/// Locale.
	pub locale: String,
	/// Parameters.
	pub params: Vec<CalvinParam>,
	/// Parent headers.
	pub parents: Vec<CalvinHeader>,
}

impl CalvinHeader {
	/// Header with the given type identifier and fixed remaining fields.
	pub fn new(type_identifier: &str) -> Self {
		Self {
			type_identifier: type_identifier.to_owned(),
			file_identifier: "0000065535-1400000000-0000000001-0000000001".to_owned(),
			timestamp: "2014-05-14T10:10:10Z".to_owned(),
			locale: "en-US".to_owned(),
			params: Vec::new(),
			parents: Vec::new(),
		}
	}
}

/// Column descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct CalvinColumn {
	/// Column name.
	pub name: String,
	/// Type code.
	pub code: u8,
	/// Byte width.
	pub size: i32,
}

/// Data set with raw big-endian row payload.
#[derive(Debug, Clone, PartialEq)]
pub struct CalvinDataSet {
	/// Data set name.
	pub name: String,
	/// Parameters.
	pub params: Vec<CalvinParam>,
	/// Columns.
	pub columns: Vec<CalvinColumn>,
	/// Row count.
	pub num_rows: u32,
	/// Row payload.
	pub data: Vec<u8>,
}

impl CalvinDataSet {
	/// Single float column.
	pub fn floats(name: &str, column: &str, values: &[f32]) -> Self {
		Self {
			name: name.to_owned(),
			params: Vec::new(),
			columns: vec![CalvinColumn {
				name: column.to_owned(),
				code: calvin_type::FLOAT,
				size: 4,
			}],
			num_rows: values.len() as u32,
			data: values.iter().flat_map(|v| v.to_be_bytes()).collect(),
		}
	}

	/// Single 16-bit integer column.
	pub fn shorts(name: &str, column: &str, values: &[i16]) -> Self {
		Self {
			name: name.to_owned(),
			params: Vec::new(),
			columns: vec![CalvinColumn {
				name: column.to_owned(),
				code: calvin_type::INT16,
				size: 2,
			}],
			num_rows: values.len() as u32,
			data: values.iter().flat_map(|v| v.to_be_bytes()).collect(),
		}
	}

	/// `X`/`Y` 16-bit coordinate pairs.
	pub fn points(name: &str, points: &[(i16, i16)]) -> Self {
		let column = |name: &str| CalvinColumn {
			name: name.to_owned(),
			code: calvin_type::INT16,
			size: 2,
		};
		Self {
			name: name.to_owned(),
			params: Vec::new(),
			columns: vec![column("X"), column("Y")],
			num_rows: points.len() as u32,
			data: points.iter().flat_map(|(x, y)| x.to_be_bytes().into_iter().chain(y.to_be_bytes())).collect(),
		}
	}
}

/// Group of data sets.
#[derive(Debug, Clone, PartialEq)]
pub struct CalvinGroup {
	/// Group name.
	pub name: String,
	/// Data sets.
	pub datasets: Vec<CalvinDataSet>,
}

impl CalvinGroup {
	/// Empty group.
	pub fn new(name: &str) -> Self {
		Self {
			name: name.to_owned(),
			datasets: Vec::new(),
		}
	}
}

/// Whole generic container.
#[derive(Debug, Clone, PartialEq)]
pub struct CalvinFixture {
	/// Version byte.
	pub version: u8,
	/// Top-level data header.
	pub header: CalvinHeader,
	/// Data groups.
	pub groups: Vec<CalvinGroup>,
}

fn be_i32(out: &mut Vec<u8>, value: i32) {
	out.extend_from_slice(&value.to_be_bytes());
}

fn be_u32(out: &mut Vec<u8>, value: u32) {
	out.extend_from_slice(&value.to_be_bytes());
}

fn patch_u32(out: &mut [u8], at: usize, value: usize) {
	out[at..at + 4].copy_from_slice(&(value as u32).to_be_bytes());
}

fn utf16be(text: &str) -> Vec<u8> {
	text.encode_utf16().flat_map(u16::to_be_bytes).collect()
}

fn put_string(out: &mut Vec<u8>, text: &str) {
	be_i32(out, text.len() as i32);
	out.extend_from_slice(text.as_bytes());
}

fn put_wstring(out: &mut Vec<u8>, text: &str) {
	be_i32(out, text.encode_utf16().count() as i32);
	out.extend_from_slice(&utf16be(text));
}

fn put_params(out: &mut Vec<u8>, params: &[CalvinParam]) {
	be_i32(out, params.len() as i32);
	for param in params {
		let (raw, label) = param.value.encode();
		put_wstring(out, &param.name);
		be_i32(out, raw.len() as i32);
		out.extend_from_slice(&raw);
		put_wstring(out, label);
	}
}

fn put_header(out: &mut Vec<u8>, header: &CalvinHeader) {
	put_string(out, &header.type_identifier);
	put_string(out, &header.file_identifier);
	put_wstring(out, &header.timestamp);
	put_wstring(out, &header.locale);
	put_params(out, &header.params);
	be_i32(out, header.parents.len() as i32);
	for parent in &header.parents {
		put_header(out, parent);
	}
}

impl CalvinFixture {
	/// Encode with every offset resolved.
	pub fn encode(&self) -> Vec<u8> {
		let mut out = vec![59, self.version];
		be_i32(&mut out, self.groups.len() as i32);
		be_u32(&mut out, 0);
		put_header(&mut out, &self.header);
		let len = out.len();
		patch_u32(&mut out, 6, len);

		for (group_index, group) in self.groups.iter().enumerate() {
			let group_at = out.len();
			be_u32(&mut out, 0);
			be_u32(&mut out, 0);
			be_i32(&mut out, group.datasets.len() as i32);
			put_wstring(&mut out, &group.name);
			let len = out.len();
			patch_u32(&mut out, group_at + 4, len);

			for (index, dataset) in group.datasets.iter().enumerate() {
				let dataset_at = out.len();
				be_u32(&mut out, 0);
				be_u32(&mut out, 0);
				put_wstring(&mut out, &dataset.name);
				put_params(&mut out, &dataset.params);
				be_u32(&mut out, dataset.columns.len() as u32);
				for column in &dataset.columns {
					put_wstring(&mut out, &column.name);
					out.push(column.code);
					be_i32(&mut out, column.size);
				}
				be_u32(&mut out, dataset.num_rows);
				let len = out.len();
				patch_u32(&mut out, dataset_at, len);
				out.extend_from_slice(&dataset.data);
				if index + 1 < group.datasets.len() {
					let len = out.len();
					patch_u32(&mut out, dataset_at + 4, len);
				}
			}
			if group_index + 1 < self.groups.len() {
				let len = out.len();
				patch_u32(&mut out, group_at, len);
			}
		}
		out
	}
}

/// One probe-layout cell record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CdfCell {
	/// Atom number grouping cells into probes.
	pub atom: i32,
	/// Column.
	pub x: u16,
	/// Row.
	pub y: u16,
	/// Probe base.
	pub pbase: u8,
	/// Target base.
	pub tbase: u8,
}

impl CdfCell {
	/// Perfect-match cell: probe base complements the target base.
	pub fn pm(atom: i32, x: u16, y: u16) -> Self {
		Self { atom, x, y, pbase: b'A', tbase: b'T' }
	}

	/// Mismatch cell: probe base equals the target base.
	pub fn mm(atom: i32, x: u16, y: u16) -> Self {
		Self { atom, x, y, pbase: b'T', tbase: b'T' }
	}
}

/// One block of a unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CdfBlock {
	/// Probe set name.
	pub name: String,
	/// Cells per atom.
	pub cells_per_atom: u8,
	/// Cells in file order.
	pub cells: Vec<CdfCell>,
}

impl CdfBlock {
	/// Distinct atoms in the block.
	pub fn numatoms(&self) -> usize {
		let mut atoms: Vec<i32> = self.cells.iter().map(|cell| cell.atom).collect();
		atoms.dedup();
		atoms.len()
	}
}

/// Probe-layout content shared by the binary and text encoders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CdfFixture {
	/// Binary format version.
	pub version: i32,
	/// Column count.
	pub cols: u16,
	/// Row count.
	pub rows: u16,
	/// QC units, each a cell list.
	pub qc_units: Vec<Vec<(u16, u16)>>,
	/// Units, each a block list.
	pub units: Vec<Vec<CdfBlock>>,
}

impl CdfFixture {
	/// Layout with one single-block unit per `(name, [(pm, mm)])` entry.
	pub fn paired(cols: u16, rows: u16, sets: &[(&str, &[((u16, u16), (u16, u16))])]) -> Self {
		let units = sets
			.iter()
			.map(|(name, probes)| {
				let cells = probes
					.iter()
					.enumerate()
					.flat_map(|(atom, ((px, py), (mx, my)))| [CdfCell::pm(atom as i32, *px, *py), CdfCell::mm(atom as i32, *mx, *my)])
					.collect();
				vec![CdfBlock {
					name: (*name).to_owned(),
					cells_per_atom: 2,
					cells,
				}]
			})
			.collect();
		Self {
			version: 1,
			cols,
			rows,
			qc_units: Vec::new(),
			units,
		}
	}

	/// Encode as a binary probe layout.
	pub fn encode_binary(&self) -> Vec<u8> {
		let mut out = Vec::new();
		put_i32(&mut out, 67);
		put_i32(&mut out, self.version);
		put_u16(&mut out, self.cols);
		put_u16(&mut out, self.rows);
		put_i32(&mut out, self.units.len() as i32);
		put_i32(&mut out, self.qc_units.len() as i32);
		put_i32(&mut out, 3);
		out.extend_from_slice(b"ref");

		for unit in &self.units {
			let name = unit.first().map(|block| block.name.as_str()).unwrap_or_default();
			put_padded(&mut out, name, 64);
		}
		for _ in 0..self.qc_units.len() + self.units.len() {
			put_i32(&mut out, 0);
		}

		for cells in &self.qc_units {
			put_u16(&mut out, 1);
			put_i32(&mut out, cells.len() as i32);
			for &(x, y) in cells {
				put_u16(&mut out, x);
				put_u16(&mut out, y);
				out.extend_from_slice(&[25, 0, 0]);
			}
		}

		for (index, unit) in self.units.iter().enumerate() {
			let numcells: usize = unit.iter().map(|block| block.cells.len()).sum();
			let numatoms: usize = unit.iter().map(CdfBlock::numatoms).sum();
			put_u16(&mut out, 3);
			out.push(1);
			put_i32(&mut out, numatoms as i32);
			put_i32(&mut out, unit.len() as i32);
			put_i32(&mut out, numcells as i32);
			put_i32(&mut out, 1000 + index as i32);
			out.push(unit.first().map_or(2, |block| block.cells_per_atom));

			for block in unit {
				put_i32(&mut out, block.numatoms() as i32);
				put_i32(&mut out, block.cells.len() as i32);
				out.push(block.cells_per_atom);
				out.push(1);
				put_i32(&mut out, 0);
				put_i32(&mut out, 0);
				put_padded(&mut out, &block.name, 65);
				if (2..=5).contains(&self.version) {
					put_i32(&mut out, 0);
					if self.version >= 3 {
						out.extend_from_slice(&[0, 0]);
					}
				}

				for (cell_index, cell) in block.cells.iter().enumerate() {
					put_i32(&mut out, cell.atom);
					put_u16(&mut out, cell.x);
					put_u16(&mut out, cell.y);
					put_i32(&mut out, cell_index as i32);
					out.push(cell.pbase);
					out.push(cell.tbase);
					if (2..=5).contains(&self.version) {
						put_i32(&mut out, 25);
						if self.version == 5 {
							put_i32(&mut out, 0);
						}
					}
				}
			}
		}
		out
	}

	/// Encode as a text probe layout.
	pub fn encode_text(&self) -> String {
		let mut out = String::new();
		out.push_str("[CDF]\nVersion=GC3.0\n\n[Chip]\nName=Test\n");
		out.push_str(&format!(
			"Rows={}\nCols={}\nNumberOfUnits={}\nMaxUnit={}\nNumQCUnits={}\nChipReference=\n\n",
			self.rows,
			self.cols,
			self.units.len(),
			1000 + self.units.len(),
			self.qc_units.len()
		));

		for (index, cells) in self.qc_units.iter().enumerate() {
			out.push_str(&format!(
				"[QC{}]\nType=1\nNumberCells={}\nCellHeader=X\tY\tPROBE\tPLEN\tATOM\tINDEX\tPMFLAG\tBACKGROUND\n",
				index + 1,
				cells.len()
			));
			for (cell, (x, y)) in cells.iter().enumerate() {
				out.push_str(&format!("Cell{}={x}\t{y}\tN\t25\t0\t0\t0\t0\n", cell + 1));
			}
			out.push('\n');
		}

		for (index, unit) in self.units.iter().enumerate() {
			let number = 1000 + index;
			out.push_str(&format!("[Unit{number}]\nName=NONE\nDirection=1\nNumAtoms=0\nUnitType=3\nNumberBlocks={}\n\n", unit.len()));
			for (block_index, block) in unit.iter().enumerate() {
				out.push_str(&format!(
					"[Unit{number}_Block{}]\nName={}\nBlockNumber={}\nNumAtoms={}\nNumCells={}\nStartPosition=0\nStopPosition=0\n",
					block_index + 1,
					block.name,
					block_index + 1,
					block.numatoms(),
					block.cells.len()
				));
				out.push_str("CellHeader=X\tY\tPROBE\tFEAT\tQUAL\tEXPOS\tPOS\tCBASE\tPBASE\tTBASE\tATOM\tINDEX\tCODONIND\tCODON\tREGIONTYPE\tREGION\n");
				for (cell_index, cell) in block.cells.iter().enumerate() {
					out.push_str(&format!(
						"Cell{}={}\t{}\tN\tcontrol\t{}\t0\t13\tA\t{}\t{}\t{}\t{}\t-1\t-1\t99\t\n",
						cell_index + 1,
						cell.x,
						cell.y,
						block.name,
						cell.pbase as char,
						cell.tbase as char,
						cell.atom,
						cell_index
					));
				}
				out.push('\n');
			}
		}
		out
	}
}

/// Raw pixel-image content.
#[derive(Debug, Clone, PartialEq)]
pub struct DatFixture {
	/// Image columns.
	pub cols: u16,
	/// Image rows.
	pub rows: u16,
	/// Array type embedded in the header block.
	pub array_type: String,
	/// Scanner id preceding the first field marker.
	pub scanner_id: String,
	/// Experiment name.
	pub experiment: String,
	/// Grid corners: upper-left, upper-right, lower-right, lower-left.
	pub grid: [(i16, i16); 4],
	/// Pixels, row-major.
	pub pixels: Vec<u16>,
}

impl DatFixture {
	/// `cols` x `rows` image whose pixel at `(x, y)` is `y * cols + x`, with a
	/// grid spanning the whole image.
	pub fn new(cols: u16, rows: u16, array_type: &str) -> Self {
		let (right, bottom) = (cols as i16 - 1, rows as i16 - 1);
		Self {
			cols,
			rows,
			array_type: array_type.to_owned(),
			scanner_id: "50205710".to_owned(),
			experiment: "experiment-1".to_owned(),
			grid: [(0, 0), (right, 0), (right, bottom), (0, bottom)],
			pixels: (0..u32::from(cols) * u32::from(rows)).map(|v| v as u16).collect(),
		}
	}

	/// Encode the image file.
	pub fn encode(&self) -> Vec<u8> {
		let mut out = vec![0xFC];
		put_u16(&mut out, self.cols);
		put_u16(&mut out, self.rows);
		put_i32(&mut out, self.pixels.len() as i32);
		put_i32(&mut out, i32::from(self.pixels.iter().copied().min().unwrap_or_default()));
		put_i32(&mut out, i32::from(self.pixels.iter().copied().max().unwrap_or_default()));
		out.extend_from_slice(&1234.5_f64.to_le_bytes());
		out.extend_from_slice(&56.25_f64.to_le_bytes());
		out.extend_from_slice(&[0; 18]);

		out.extend_from_slice(b"XIN=3   ");
		out.extend_from_slice(b"YIN=3   ");
		out.extend_from_slice(b"VE=30  ");
		out.extend_from_slice(b"21.5    ");
		out.extend_from_slice(b"2.0  ");
		put_padded(&mut out, "05/14/14 10:10:10", 18);

		let block = format!("{}\u{14} \u{14} {}.1sq \u{14}  \u{14} ", self.scanner_id, self.array_type);
		put_padded(&mut out, &block, 221);

		out.extend_from_slice(&10.0_f64.to_le_bytes());
		out.extend_from_slice(&0.5_f64.to_le_bytes());
		put_i32(&mut out, 400);
		for (x, y) in self.grid {
			put_i16(&mut out, x);
			put_i16(&mut out, y);
		}
		put_i16(&mut out, 2);
		put_padded(&mut out, &self.experiment, 155);

		for pixel in &self.pixels {
			put_u16(&mut out, *pixel);
		}
		out
	}
}

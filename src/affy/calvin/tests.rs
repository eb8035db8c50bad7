use affyio_testkit::{CalvinDataSet, CalvinFixture, CalvinGroup, CalvinHeader, CalvinParam, CalvinValue, calvin_type};

use crate::affy::calvin::{CalvinFile, ParamValue, ValueType};
use crate::affy::ErrorKind;

fn fixture() -> CalvinFixture {
	let mut header = CalvinHeader::new("affymetrix-calvin-intensity");
	header.params = vec![
		CalvinParam::new("affymetrix-array-type", CalvinValue::Text("TestChip".to_owned())),
		CalvinParam::new("affymetrix-cel-rows", CalvinValue::Int32(2)),
		CalvinParam::new("scan-count", CalvinValue::Int16(-3)),
		CalvinParam::new("channel", CalvinValue::UInt8(7)),
		CalvinParam::new("exposure", CalvinValue::Float(0.25)),
		CalvinParam::new("operator", CalvinValue::Ascii("lab".to_owned())),
		CalvinParam::new("blob", CalvinValue::Raw("application/x-blob".to_owned(), vec![1, 2, 3])),
	];
	let mut parent = CalvinHeader::new("affymetrix-calvin-scan-acquisition");
	parent.params = vec![CalvinParam::new("affymetrix-scanner-id", CalvinValue::Ascii("SCN-1".to_owned()))];
	header.parents = vec![parent];

	let mut group = CalvinGroup::new("Default Group");
	group.datasets.push(CalvinDataSet::floats("Intensity", "Intensity", &[1.5, 2.5, 3.5]));
	group.datasets.push(CalvinDataSet::points("Outlier", &[(1, 0), (0, 1)]));

	CalvinFixture {
		version: 1,
		header,
		groups: vec![group],
	}
}

fn parse() -> CalvinFile {
	CalvinFile::parse(&fixture().encode()).expect("container parses")
}

#[test]
fn header_parameters_decode_by_label() {
	let file = parse();
	assert_eq!(file.version, 1);
	assert_eq!(file.num_datagroups, 1);
	assert_eq!(file.header.type_identifier, "affymetrix-calvin-intensity");
	assert_eq!(file.header.locale, "en-US");

	let value = |name: &str| file.find_param(name).map(|param| param.value.clone());
	assert_eq!(value("affymetrix-array-type"), Some(ParamValue::Text("TestChip".to_owned())));
	assert_eq!(value("AFFYMETRIX-CEL-ROWS").and_then(|v| v.as_i64()), Some(2));
	assert_eq!(value("scan-count"), Some(ParamValue::Int16(-3)));
	assert_eq!(value("channel"), Some(ParamValue::UInt8(7)));
	assert_eq!(value("exposure").and_then(|v| v.as_f64()), Some(0.25));
	assert_eq!(value("operator").as_ref().and_then(ParamValue::as_str), Some("lab"));
	assert_eq!(value("blob"), Some(ParamValue::Unknown(vec![1, 2, 3])));
	assert_eq!(file.find_param("blob").map(|param| param.type_label.as_str()), Some("application/x-blob"));
}

#[test]
fn parameters_are_found_in_parent_headers() {
	let file = parse();
	assert_eq!(file.header.parents.len(), 1);
	assert!(file.header.find_param("affymetrix-scanner-id").is_none());
	let scanner = file.find_param("affymetrix-scanner-id").expect("parent param");
	assert_eq!(scanner.value.as_str(), Some("SCN-1"));
}

#[test]
fn data_set_metadata_and_columns_are_read() {
	let file = parse();
	let group = &file.groups[0];
	assert_eq!(group.name, "Default Group");
	assert_eq!(group.declared_datasets, 2);

	let intensity = file.find_dataset(0, "intensity").expect("case-insensitive lookup");
	assert_eq!(intensity.num_rows, 3);
	assert_eq!(intensity.columns[0].kind, ValueType::Float);
	assert_eq!(intensity.row_len(), 4);
	assert_eq!(file.read_column(intensity, "Intensity").expect("floats"), vec![1.5, 2.5, 3.5]);

	let outliers = file.find_dataset(0, "Outlier").expect("outliers");
	assert_eq!(outliers.find_column("y"), Some((1, 2)));
	let rows = file.read_mapped_rows(outliers, 1, 1, &["Y", "X"]).expect("one row");
	assert_eq!(rows, vec![vec![1.0, 0.0]]);
}

#[test]
fn bad_row_requests_are_rejected() {
	let file = parse();
	let intensity = file.find_dataset(0, "Intensity").expect("intensity");
	assert_eq!(file.read_mapped_rows(intensity, 2, 2, &["Intensity"]).expect_err("past end").kind(), ErrorKind::InvalidArgument);
	assert_eq!(file.read_column(intensity, "Missing").expect_err("no column").kind(), ErrorKind::Format);
	assert_eq!(file.read_rows(intensity).expect_err("generic rows").kind(), ErrorKind::Unsupported);
}

#[test]
fn truncated_trailing_data_set_is_dropped() {
	let mut bytes = fixture().encode();
	bytes.truncate(bytes.len() - 2);
	let file = CalvinFile::parse(&bytes).expect("truncated container still parses");
	assert_eq!(file.groups[0].declared_datasets, 2);
	assert_eq!(file.groups[0].datasets.len(), 1);
	assert!(file.find_dataset(0, "Outlier").is_none());
	assert!(file.find_dataset(0, "Intensity").is_some());
}

#[test]
fn wrong_magic_is_format_error() {
	let mut bytes = fixture().encode();
	bytes[0] = 60;
	assert_eq!(CalvinFile::parse(&bytes).expect_err("bad magic").kind(), ErrorKind::Format);
}

#[test]
fn value_type_codes_follow_container_table() {
	assert_eq!(ValueType::from_code(calvin_type::INT16).expect("int16"), ValueType::Int16);
	assert_eq!(ValueType::from_code(calvin_type::FLOAT).expect("float"), ValueType::Float);
	assert_eq!(ValueType::from_code(calvin_type::WIDE_TEXT).expect("wide text"), ValueType::WideText);
	assert_eq!(ValueType::Int32.code(), calvin_type::INT32);
	assert!(!ValueType::WideText.is_numeric());
	assert_eq!(ValueType::from_code(42).expect_err("unknown").kind(), ErrorKind::Format);
}

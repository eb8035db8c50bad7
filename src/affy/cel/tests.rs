use affyio_testkit::{CelFixture, temp_dir, write_fixture, zstd_frame};

use crate::affy::cel::{
	CelFile, CelFormat, RecordPolicy, Section, array_type_from_header, encode_binary_cel, get_array_type, load_cel_file, parse_cel, section_policy, write_binary_cel_file,
};
use crate::affy::{ErrorKind, LoadOptions, NoProgress, WriteOptions};

fn parse(bytes: &[u8]) -> CelFile {
	parse_cel("fixture", bytes, &LoadOptions::default(), &mut NoProgress).expect("intensity file parses")
}

fn two_by_two() -> CelFixture {
	CelFixture::new(2, 2, "TestChip").with_masks(&[(1, 0)])
}

fn assert_two_by_two(cel: &CelFile) {
	assert_eq!((cel.numcols(), cel.numrows()), (2, 2));
	assert!(cel.is_masked(1, 0));
	assert!(!cel.is_masked(0, 0));
	assert!(!cel.is_masked(0, 1));
	assert!(!cel.is_masked(1, 1));
	assert_eq!(cel.nummasks(), 1);
	assert_eq!(cel.numoutliers(), 0);
	assert!(!cel.corrupt);
	assert_eq!(cel.matrix(), vec![vec![0.0, 1.0], vec![100.0, 101.0]]);
	assert_eq!(cel.array_type.as_deref(), Some("TestChip"));
}

#[test]
fn every_variant_agrees_on_a_two_by_two_chip() {
	let fixture = two_by_two();

	let binary = parse(&fixture.encode_binary());
	assert_eq!(binary.format, CelFormat::Binary);
	assert_eq!(binary.version, 4);
	assert_two_by_two(&binary);

	let text = parse(fixture.encode_text().as_bytes());
	assert_eq!(text.format, CelFormat::Text);
	assert_eq!(text.version, 3);
	assert_two_by_two(&text);

	let calvin = parse(&fixture.calvin(&["Intensity", "StdDev", "Pixel", "Mask", "Outlier"]).encode());
	assert_eq!(calvin.format, CelFormat::Calvin);
	assert_two_by_two(&calvin);

	let qc = calvin.cell(1, 1).expect("cell").qc.expect("qc retained");
	assert_eq!((qc.stddev, qc.numpixels), (1.5, 16));
	assert_eq!(binary.cells(), text.cells());
	assert_eq!(binary.cells(), calvin.cells());
}

#[test]
fn qc_fields_are_dropped_when_not_retained() {
	let fixture = two_by_two();
	let options = LoadOptions::values_only();
	for bytes in [fixture.encode_binary(), fixture.encode_text().into_bytes(), fixture.calvin(&["Intensity", "StdDev", "Pixel", "Mask", "Outlier"]).encode()] {
		let cel = parse_cel("fixture", &bytes, &options, &mut NoProgress).expect("parses");
		assert!(cel.cells().iter().all(|(_, cell)| cell.qc.is_none()));
		assert!(!cel.corrupt);
	}
}

#[test]
fn binary_mask_truncated_mid_section_is_salvaged() {
	let mut bytes = CelFixture::new(2, 2, "TestChip").with_masks(&[(0, 0), (1, 1)]).encode_binary();
	bytes.truncate(bytes.len() - 2);

	let cel = parse(&bytes);
	assert!(cel.corrupt);
	assert_eq!(cel.nummasks(), 1);
	assert_eq!(cel.mask_coords(), vec![(0, 0)]);
	assert_eq!(cel.matrix()[1][1], 101.0);
}

#[test]
fn binary_out_of_range_mask_sets_corrupt_and_stops() {
	let fixture = CelFixture::new(2, 2, "TestChip").with_masks(&[(0, 1), (5, 0), (1, 1)]).with_outliers(&[(1, 0)]);
	let cel = parse(&fixture.encode_binary());
	assert!(cel.corrupt);
	assert_eq!(cel.mask_coords(), vec![(0, 1)]);
	assert!(!cel.is_masked(1, 1));
	assert_eq!(cel.numoutliers(), 0);
}

#[test]
fn binary_intensity_truncation_aborts() {
	let mut bytes = CelFixture::new(2, 2, "TestChip").encode_binary();
	bytes.truncate(bytes.len() - 5);
	let err = parse_cel("fixture", &bytes, &LoadOptions::default(), &mut NoProgress).expect_err("short intensity section");
	assert_eq!(err.kind(), ErrorKind::Io);
}

#[test]
fn declared_mask_count_beyond_records_is_salvaged() {
	let mut fixture = CelFixture::new(2, 2, "TestChip").with_masks(&[(1, 1)]);
	fixture.declared_masks = Some(3);
	let cel = parse(&fixture.encode_binary());
	assert!(cel.corrupt);
	assert_eq!(cel.nummasks(), 1);
}

#[test]
fn text_truncated_intensity_is_format_error() {
	let text = two_by_two().encode_text();
	let last = text.lines().find(|line| line.starts_with("  1\t  1\t")).expect("last record").to_owned();
	let truncated = text.replace(&format!("{last}\r\n"), "");
	assert_ne!(truncated, text);
	let err = parse_cel("fixture", truncated.as_bytes(), &LoadOptions::default(), &mut NoProgress).expect_err("truncated text");
	assert_eq!(err.kind(), ErrorKind::Format);
}

#[test]
fn text_intensity_record_needs_all_five_fields() {
	let text = two_by_two().encode_text();
	let full = text.lines().find(|line| line.starts_with("  1\t  0\t")).expect("record").to_owned();
	let short: String = full.split('\t').take(3).collect::<Vec<_>>().join("\t");
	let err = parse_cel("fixture", text.replace(&full, &short).as_bytes(), &LoadOptions::values_only(), &mut NoProgress).expect_err("three-field record");
	assert_eq!(err.kind(), ErrorKind::Format);
}

#[test]
fn text_version_outside_i32_is_format_error() {
	let text = two_by_two().encode_text().replacen("Version=3", "Version=99999999999", 1);
	let err = parse_cel("fixture", text.as_bytes(), &LoadOptions::default(), &mut NoProgress).expect_err("oversized version");
	assert_eq!(err.kind(), ErrorKind::Format);
}

#[test]
fn text_out_of_range_mask_is_format_error() {
	let text = CelFixture::new(2, 2, "TestChip").with_masks(&[(2, 0)]).encode_text();
	let err = parse_cel("fixture", text.as_bytes(), &LoadOptions::default(), &mut NoProgress).expect_err("mask outside grid");
	assert_eq!(err.kind(), ErrorKind::Format);
}

#[test]
fn text_mask_count_disagreement_only_warns() {
	let text = two_by_two().encode_text().replacen("[MASKS]\r\nNumberCells=1", "[MASKS]\r\nNumberCells=4", 1);
	let cel = parse(text.as_bytes());
	assert_eq!(cel.nummasks(), 1);
	assert!(!cel.corrupt);
}

#[test]
fn calvin_missing_optional_dataset_sets_corrupt() {
	let fixture = two_by_two();
	let cel = parse(&fixture.calvin(&["Intensity", "StdDev", "Pixel", "Outlier"]).encode());
	assert!(cel.corrupt);
	assert_eq!(cel.nummasks(), 0);
	assert_eq!(cel.matrix()[0][1], 1.0);

	let err = parse_cel("fixture", &fixture.calvin(&["Mask"]).encode(), &LoadOptions::default(), &mut NoProgress).expect_err("no intensities");
	assert_eq!(err.kind(), ErrorKind::Format);
}

#[test]
fn repeated_mask_entries_count_each_time() {
	let cel = parse(&CelFixture::new(2, 2, "TestChip").with_masks(&[(1, 0), (1, 0)]).encode_binary());
	assert!(!cel.corrupt);
	assert_eq!(cel.nummasks(), 2);
	assert_eq!(cel.mask_coords(), vec![(1, 0)]);

	let reread = parse(&encode_binary_cel(&cel, "TestChip", &WriteOptions::default()).expect("encode"));
	assert_eq!(reread.nummasks(), 1);
	assert_eq!(reread.mask_coords(), vec![(1, 0)]);
}

#[test]
fn binary_writer_round_trips_values_and_sets() {
	let fixture = CelFixture::new(3, 2, "TestChip").with_masks(&[(2, 1), (0, 0)]).with_outliers(&[(1, 1)]);
	let original = parse(&fixture.encode_binary());

	let bytes = encode_binary_cel(&original, "TestChip", &WriteOptions::default()).expect("encode");
	let reread = parse(&bytes);
	assert_eq!(reread.matrix(), original.matrix());
	assert_eq!(reread.cells(), original.cells());
	assert_eq!(reread.mask_coords(), vec![(0, 0), (2, 1)]);
	assert_eq!(reread.outlier_coords(), vec![(1, 1)]);
	assert_eq!(get_array_type(&bytes).expect("array type"), "TestChip");

	let again = encode_binary_cel(&reread, "TestChip", &WriteOptions::default()).expect("encode again");
	assert_eq!(again, bytes);
}

#[test]
fn writer_fills_placeholders_for_values_only_files() {
	let cel = parse_cel("fixture", &two_by_two().encode_binary(), &LoadOptions::values_only(), &mut NoProgress).expect("values only");
	let dir = temp_dir();
	let path = dir.path().join("out.CEL");
	write_binary_cel_file(&path, &cel, "TestChip", &WriteOptions::default()).expect("write");

	let reread = load_cel_file(&path, &LoadOptions::default()).expect("reload");
	let qc = reread.cell(0, 1).expect("cell").qc.expect("qc written");
	assert_eq!((qc.stddev, qc.numpixels), (0.0, 1));
	assert_eq!(reread.matrix(), cel.matrix());
}

#[test]
fn array_type_is_read_from_every_variant() {
	let fixture = two_by_two();
	assert_eq!(get_array_type(&fixture.encode_binary()).expect("binary"), "TestChip");
	assert_eq!(get_array_type(fixture.encode_text().as_bytes()).expect("text"), "TestChip");
	assert_eq!(get_array_type(&fixture.calvin(&["Intensity"]).encode()).expect("calvin"), "TestChip");

	let err = get_array_type(b"[CEL]\nVersion=3\n").expect_err("no header");
	assert_eq!(err.kind(), ErrorKind::Format);
}

#[test]
fn array_type_token_follows_last_delimiter() {
	assert_eq!(array_type_from_header("DatHeader= HG-U133A.1sq").expect("space"), "HG-U133A");
	assert_eq!(array_type_from_header("x\u{14} \u{14} Mouse430_2.1sq \u{14}").expect("marker"), "Mouse430_2");
	assert_eq!(array_type_from_header("no marker").expect_err("absent").kind(), ErrorKind::Format);
}

#[test]
fn sniffing_picks_variant_from_magic() {
	assert_eq!(CelFormat::sniff(&[59, 1, 0, 0]), CelFormat::Calvin);
	assert_eq!(CelFormat::sniff(&64_i32.to_le_bytes()), CelFormat::Binary);
	assert_eq!(CelFormat::sniff(b"[CEL]"), CelFormat::Text);
	assert_eq!(CelFormat::sniff(&[]), CelFormat::Text);
}

#[test]
fn salvage_policy_is_keyed_on_variant_and_section() {
	assert_eq!(section_policy(CelFormat::Binary, Section::Masks).on_bad_record, RecordPolicy::Salvage);
	assert_eq!(section_policy(CelFormat::Binary, Section::Intensity).on_bad_record, RecordPolicy::Abort);
	assert_eq!(section_policy(CelFormat::Text, Section::Masks).on_bad_record, RecordPolicy::Abort);
	assert_eq!(section_policy(CelFormat::Calvin, Section::StdDev).on_bad_record, RecordPolicy::Salvage);
}

#[test]
fn compressed_and_missing_files_on_disk() {
	let dir = temp_dir();
	let fixture = two_by_two();
	let path = write_fixture(dir.path(), "chip.CEL.zst", &zstd_frame(&fixture.encode_binary()));
	let cel = load_cel_file(&path, &LoadOptions::default()).expect("zstd input");
	assert_two_by_two(&cel);

	let err = load_cel_file(dir.path().join("absent.CEL"), &LoadOptions::default()).expect_err("missing file");
	assert_eq!(err.kind(), ErrorKind::NotFound);
}

use affyio_testkit::{CdfBlock, CdfCell, CdfFixture, temp_dir, write_fixture};

use crate::affy::cdf::{CdfFormat, CellCoord, CellType, ProbeLayout, cdf_search_paths, load_cdf_file, load_cdf_file_byname, parse_cdf};
use crate::affy::{ErrorKind, LoadOptions, NoProgress};

fn two_sets() -> CdfFixture {
	let mut fixture = CdfFixture::paired(4, 4, &[("set_a", &[((0, 0), (0, 1)), ((1, 0), (1, 1))]), ("AFFX-ctl", &[((2, 2), (2, 3))])]);
	fixture.qc_units = vec![vec![(3, 0), (3, 1)]];
	fixture
}

fn parse(bytes: &[u8]) -> ProbeLayout {
	parse_cdf("TestChip", None, bytes, &mut NoProgress).expect("layout parses")
}

fn assert_two_sets(layout: &ProbeLayout) {
	assert_eq!((layout.numcols(), layout.numrows()), (4, 4));
	assert_eq!(layout.numprobesets(), 2);
	assert_eq!(layout.numprobes(), 3);
	assert_eq!(layout.numqcunits, 1);
	assert!(!layout.no_mm);
	assert!(!layout.duplicate_probes);

	let set = layout.find_probeset("set_a").expect("set_a present");
	assert_eq!(set.probes.len(), 2);
	assert_eq!(set.probes[1].pm, CellCoord { x: 1, y: 0 });
	assert_eq!(set.probes[1].mm, CellCoord { x: 1, y: 1 });

	let owner = layout.probe_at(2, 3).expect("mm cell has an owner");
	assert_eq!(owner.probeset, 1);
	assert_eq!(layout.probe(2), Some(owner));
	assert!(layout.probe_at(3, 3).is_none());

	assert_eq!(layout.cell_type(3, 1), Some(CellType::Qc));
	assert_eq!(layout.cell_type(0, 0), Some(CellType::Normal));
}

#[test]
fn binary_layout_maps_probes_and_qc_cells() {
	let layout = parse(&two_sets().encode_binary());
	assert_eq!(layout.format, CdfFormat::Binary);
	assert_eq!(layout.array_type, "TestChip");
	assert_two_sets(&layout);
}

#[test]
fn binary_versions_with_trailing_record_fields_parse() {
	for version in [2, 3, 5] {
		let mut fixture = two_sets();
		fixture.version = version;
		let layout = parse(&fixture.encode_binary());
		assert_two_sets(&layout);
	}
}

#[test]
fn binary_version_four_is_unsupported() {
	let mut fixture = two_sets();
	fixture.version = 4;
	let err = parse_cdf("TestChip", None, &fixture.encode_binary(), &mut NoProgress).expect_err("version 4");
	assert_eq!(err.kind(), ErrorKind::Unsupported);
}

#[test]
fn text_layout_matches_binary_layout() {
	let fixture = two_sets();
	let text = parse(fixture.encode_text().as_bytes());
	assert_eq!(text.format, CdfFormat::Text);
	assert_two_sets(&text);

	let binary = parse(&fixture.encode_binary());
	assert_eq!(text.probesets(), binary.probesets());
}

#[test]
fn consecutive_text_blocks_with_one_name_merge() {
	let mut fixture = CdfFixture::paired(4, 4, &[]);
	fixture.units = vec![vec![
		CdfBlock {
			name: "split".to_owned(),
			cells_per_atom: 2,
			cells: vec![CdfCell::pm(0, 0, 0), CdfCell::mm(0, 0, 1)],
		},
		CdfBlock {
			name: "split".to_owned(),
			cells_per_atom: 2,
			cells: vec![CdfCell::pm(0, 1, 0), CdfCell::mm(0, 1, 1)],
		},
	]];

	let layout = parse(fixture.encode_text().as_bytes());
	assert_eq!(layout.numprobesets(), 1);
	assert_eq!(layout.probesets()[0].probes.len(), 2);

	let binary = parse(&fixture.encode_binary());
	assert_eq!(binary.numprobesets(), 1);
	assert_eq!(binary.probesets()[0].probes.len(), 2);
}

#[test]
fn single_cell_atoms_pair_with_themselves() {
	let mut fixture = CdfFixture::paired(2, 2, &[]);
	fixture.units = vec![vec![CdfBlock {
		name: "pm_only".to_owned(),
		cells_per_atom: 1,
		cells: vec![CdfCell::pm(0, 0, 0), CdfCell::pm(1, 1, 1)],
	}]];

	for bytes in [fixture.encode_binary(), fixture.encode_text().into_bytes()] {
		let layout = parse(&bytes);
		assert!(layout.no_mm);
		let probe = layout.probe(1).expect("second probe");
		assert_eq!(probe.pm, probe.mm);
		assert_eq!(probe.pm, CellCoord { x: 1, y: 1 });
	}
}

#[test]
fn reused_cells_keep_first_owner_and_flag_duplicates() {
	let fixture = CdfFixture::paired(2, 2, &[("first", &[((0, 0), (0, 1))]), ("second", &[((0, 0), (1, 1))])]);
	let layout = parse(&fixture.encode_binary());
	assert!(layout.duplicate_probes);
	assert_eq!(layout.probe_at(0, 0).expect("owner").probeset, 0);
	assert_eq!(layout.probe_at(1, 1).expect("owner").probeset, 1);
}

#[test]
fn text_atom_count_disagreement_is_format_error() {
	let fixture = two_sets();
	let text = fixture.encode_text().replacen("NumAtoms=2", "NumAtoms=3", 1);
	let err = parse_cdf("TestChip", None, text.as_bytes(), &mut NoProgress).expect_err("pm count mismatch");
	assert_eq!(err.kind(), ErrorKind::Format);
}

#[test]
fn text_qc_cell_outside_grid_is_format_error() {
	let mut fixture = two_sets();
	fixture.qc_units = vec![vec![(9, 0)]];
	let err = parse_cdf("TestChip", None, fixture.encode_text().as_bytes(), &mut NoProgress).expect_err("qc out of range");
	assert_eq!(err.kind(), ErrorKind::Format);
}

#[test]
fn text_without_chip_section_is_format_error() {
	let err = parse_cdf("TestChip", None, b"[CDF]\nVersion=GC3.0\n", &mut NoProgress).expect_err("no chip section");
	assert_eq!(err.kind(), ErrorKind::Format);
}

#[test]
fn generic_layout_stacks_single_probe_sets() {
	let mut layout = ProbeLayout::generic(3).expect("generic layout");
	assert_eq!(layout.format, CdfFormat::Generic);
	assert_eq!((layout.numcols(), layout.numrows()), (1, 3));
	assert!(layout.no_mm);
	for (index, set) in layout.probesets().iter().enumerate() {
		assert_eq!(set.name, "");
		assert_eq!(set.probes[0].pm, CellCoord { x: 0, y: index });
		assert_eq!(set.probes[0].mm, set.probes[0].pm);
	}

	layout.set_probeset_name(2, "gene_c").expect("rename");
	assert_eq!(layout.find_probeset("gene_c").map(|set| set.index), Some(2));
	assert_eq!(layout.set_probeset_name(3, "x").expect_err("out of range").kind(), ErrorKind::InvalidArgument);
	assert_eq!(ProbeLayout::generic(0).expect_err("empty").kind(), ErrorKind::InvalidArgument);
}

#[test]
fn name_lists_are_sorted_and_searchable() {
	let dir = temp_dir();
	let path = write_fixture(dir.path(), "exclude.txt", b"zeta\tnote\n\nalpha\n  \nmid\textra\tcols\n");

	let mut layout = ProbeLayout::generic(1).expect("generic layout");
	layout.load_exclusions(&path).expect("exclusions load");
	assert_eq!(layout.exclusions, vec!["alpha", "mid", "zeta"]);
	assert!(layout.is_excluded("mid"));
	assert!(!layout.is_excluded("note"));

	let err = layout.load_spikeins(dir.path().join("missing.txt")).expect_err("missing list");
	assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn search_order_prefers_explicit_path_then_hint_then_cwd() {
	let hinted = cdf_search_paths("Chip", Some(std::path::Path::new("/data/Chip.CDF")));
	assert_eq!(hinted[0], std::path::PathBuf::from("/data/Chip.CDF"));
	assert_eq!(hinted.last().map(|p| p.display().to_string()), Some("Chip.cdf".to_owned()));

	let dir_only = cdf_search_paths("Chip", Some(std::path::Path::new("/data")));
	assert_eq!(dir_only[0], std::path::PathBuf::from("/data/Chip.CDF"));
	assert_eq!(dir_only[1], std::path::PathBuf::from("/data/Chip.cdf"));
	assert_eq!(dir_only.len(), 4);
}

#[test]
fn load_by_hint_directory_and_by_name() {
	let dir = temp_dir();
	let path = write_fixture(dir.path(), "TestChip.cdf", &two_sets().encode_binary());

	let layout = load_cdf_file("TestChip", Some(dir.path()), &LoadOptions::default()).expect("hinted load");
	assert_eq!(layout.filename.as_deref(), Some(path.as_path()));
	assert_two_sets(&layout);

	let by_name = load_cdf_file_byname(&path, None, &LoadOptions::default()).expect("load by name");
	assert_eq!(by_name.array_type, "TestChip");

	let err = load_cdf_file("Other", Some(dir.path()), &LoadOptions::default()).expect_err("absent layout");
	assert_eq!(err.kind(), ErrorKind::NotFound);
}

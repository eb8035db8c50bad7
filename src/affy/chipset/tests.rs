use std::path::PathBuf;

use affyio_testkit::{CdfFixture, CelFixture, temp_dir, write_fixture};
use tempfile::TempDir;

use crate::affy::{Chip, ChipSet, ErrorKind, LoadOptions, create_collection};

struct Workspace {
	dir: TempDir,
	cels: Vec<PathBuf>,
}

fn workspace(types: &[&str]) -> Workspace {
	let dir = temp_dir();
	let layout = CdfFixture::paired(3, 2, &[("gene_a", &[((0, 0), (0, 1)), ((1, 0), (1, 1))]), ("AFFX-ctl", &[((2, 0), (2, 1))])]);
	write_fixture(dir.path(), "TestChip.CDF", &layout.encode_binary());

	let cels = types
		.iter()
		.enumerate()
		.map(|(index, array_type)| {
			let offset = index as f32 * 1000.0;
			let values: Vec<f32> = (0..6).map(|v| offset + v as f32).collect();
			let cel = CelFixture::new(3, 2, array_type).with_values(&values);
			write_fixture(dir.path(), &format!("chip{index}.CEL"), &cel.encode_binary())
		})
		.collect();
	Workspace { dir, cels }
}

fn collection(ws: &Workspace, capacity: usize, options: &LoadOptions) -> ChipSet {
	create_collection(capacity, "TestChip", Some(ws.dir.path()), options).expect("layout found through hint")
}

#[test]
fn loads_matching_chips_against_shared_layout() {
	let ws = workspace(&["TestChip", "TestChip"]);
	let mut set = collection(&ws, 2, &LoadOptions::default());
	assert!(set.owns_layout());
	assert_eq!(set.array_type(), "TestChip");

	assert_eq!(set.load_many(&ws.cels).expect("both load").loaded, vec![0, 1]);
	assert!(set.is_full());

	let chip = set.chip(1).expect("second chip");
	assert_eq!(chip.probe_values(1).expect("probe 1"), (1001.0, 1004.0));
	assert_eq!(chip.layout().expect("layout").numprobesets(), 2);
}

#[test]
fn mismatched_array_type_is_rejected_unless_tolerated() {
	let ws = workspace(&["OtherChip"]);
	let mut strict = collection(&ws, 2, &LoadOptions::default());
	let err = strict.load_single(&ws.cels[0]).expect_err("type mismatch");
	assert_eq!(err.kind(), ErrorKind::TypeMismatch);
	assert!(strict.is_empty());
	assert_eq!(strict.live_nodes(), 1);

	let mut tolerant = collection(&ws, 2, &LoadOptions::tolerant());
	assert_eq!(tolerant.load_single(&ws.cels[0]).expect("tolerated"), 0);
}

#[test]
fn full_collection_reports_limit_and_load_many_stops() {
	let ws = workspace(&["TestChip", "TestChip", "TestChip"]);
	let mut set = collection(&ws, 2, &LoadOptions::default());
	let report = set.load_many(&ws.cels).expect("loads up to capacity");
	assert_eq!(report.loaded.len(), 2);
	assert_eq!(report.skipped, 1);
	assert_eq!(set.len(), 2);

	let err = set.load_single(&ws.cels[2]).expect_err("full");
	assert_eq!(err.kind(), ErrorKind::LimitReached);
}

#[test]
fn load_many_moves_past_a_bad_file() {
	let ws = workspace(&["TestChip", "TestChip"]);
	let missing = ws.dir.path().join("absent.CEL");
	let garbage = write_fixture(ws.dir.path(), "garbage.CEL", &[64, 0, 0, 0, 4]);
	let paths = vec![ws.cels[0].clone(), missing.clone(), garbage.clone(), ws.cels[1].clone()];

	let mut set = collection(&ws, 3, &LoadOptions::default());
	let report = set.load_many(&paths).expect("batch completes");
	assert_eq!(report.loaded, vec![0, 1]);
	assert_eq!(report.skipped, 0);
	assert_eq!(report.failed.len(), 2);
	assert_eq!(report.failed[0].0, missing);
	assert_eq!(report.failed[0].1.kind(), ErrorKind::NotFound);
	assert_eq!(report.failed[1].0, garbage);

	assert_eq!(set.len(), 2);
	assert_eq!(set.chip(1).expect("last file").probe_values(0).expect("probe 0"), (1000.0, 1003.0));
}

#[test]
fn freeing_a_clone_keeps_the_original_layout() {
	let ws = workspace(&["TestChip"]);
	let mut set = collection(&ws, 1, &LoadOptions::default());
	set.load_single(&ws.cels[0]).expect("load");

	let mut clone = set.clone_chip(0).expect("clone chip");
	assert!(!clone.layout_ref().is_owner());
	clone.cel.cell_mut(0, 0).expect("cell").value = -1.0;
	drop(clone);

	let original = set.chip(0).expect("original");
	assert_eq!(original.cel.cell(0, 0).expect("cell").value, 0.0);
	assert_eq!(original.probe_values(0).expect("layout still resolves"), (0.0, 3.0));
	assert!(set.layout().expect("layout").find_probeset("gene_a").is_some());
}

#[test]
fn dropping_the_owner_invalidates_borrowed_layouts() {
	let ws = workspace(&["TestChip"]);
	let mut set = collection(&ws, 1, &LoadOptions::default());
	set.load_single(&ws.cels[0]).expect("load");

	let copy = set.clone_chipset().expect("clone collection");
	let chip: Chip = set.clone_chip(0).expect("clone chip");
	assert!(!copy.owns_layout());
	assert_eq!(copy.chip(0).expect("copied chip").probe_values(2).expect("borrowed layout"), (2.0, 5.0));

	drop(set);
	assert!(!chip.layout_ref().is_live());
	assert_eq!(chip.layout().expect_err("owner dropped").kind(), ErrorKind::NotFound);
	assert_eq!(copy.layout().expect_err("owner dropped").kind(), ErrorKind::NotFound);
	assert_eq!(copy.chip(0).expect("data survives").cel.cell(2, 1).expect("cell").value, 5.0);
}

#[test]
fn derived_storage_is_released_with_its_chip() {
	let ws = workspace(&["TestChip", "TestChip"]);
	let mut set = collection(&ws, 2, &LoadOptions::default());
	set.load_many(&ws.cels).expect("load");
	assert_eq!(set.live_nodes(), 3);

	let first = set.alloc_derived(0, 6).expect("derived for chip 0");
	set.alloc_derived(1, 4).expect("derived for chip 1");
	set.alloc_derived(1, 2).expect("second derived for chip 1");
	set.derived_mut(first).expect("derived")[5] = 7.5;
	assert_eq!(set.live_nodes(), 6);

	let single = set.clone_chipset_one_chip(0).expect("one-chip clone");
	assert_eq!(single.capacity(), 1);
	let copied = single.derived_nodes(0).expect("copied derived");
	assert_eq!(single.derived(copied[0]).expect("copy")[5], 7.5);

	set.resize(1).expect("shrink");
	assert_eq!(set.len(), 1);
	assert_eq!(set.live_nodes(), 3);
	assert_eq!(set.derived(first).expect("chip 0 storage kept")[5], 7.5);

	assert_eq!(set.free_derived(first).expect("free derived"), 1);
	assert_eq!(set.derived(first).expect_err("freed").kind(), ErrorKind::AlreadyFreed);
}

#[test]
fn generic_collection_accepts_any_array_type() {
	let ws = workspace(&["Anything"]);
	let mut set = ChipSet::generic(1, 6, LoadOptions::values_only()).expect("generic set");
	assert_eq!(set.load_single(&ws.cels[0]).expect("load"), 0);
	assert_eq!(set.chip(0).expect("chip").probe_values(0).expect("probe"), (0.0, 0.0));
}

#[test]
fn invalid_creation_requests_fail() {
	let ws = workspace(&[]);
	let err = create_collection(1, "Missing", Some(ws.dir.path()), &LoadOptions::default()).expect_err("no layout");
	assert_eq!(err.kind(), ErrorKind::NotFound);

	let err = ChipSet::generic(0, 1, LoadOptions::default()).expect_err("zero capacity");
	assert_eq!(err.kind(), ErrorKind::InvalidArgument);
}

#![allow(missing_docs)]

use std::path::PathBuf;

use affyio::affy::{Cursor, ErrorKind, LoadOptions, Pool, create_collection, decode_str, load_cel_file};
use affyio_testkit::{CdfFixture, CelFixture, temp_dir, write_fixture};

fn chip_files(dir: &std::path::Path, count: usize) -> Vec<PathBuf> {
	let layout = CdfFixture::paired(3, 2, &[("gene_a", &[((0, 0), (0, 1)), ((1, 0), (1, 1))]), ("AFFX-ctl", &[((2, 0), (2, 1))])]);
	write_fixture(dir, "TestChip.CDF", &layout.encode_binary());
	(0..count)
		.map(|index| write_fixture(dir, &format!("chip{index}.CEL"), &CelFixture::new(3, 2, "TestChip").encode_binary()))
		.collect()
}

#[test]
fn collection_loads_chips_and_reads_probe_pairs() {
	let dir = temp_dir();
	let paths = chip_files(dir.path(), 3);

	let mut set = create_collection(2, "TestChip", Some(dir.path()), &LoadOptions::default()).expect("collection");
	let report = set.load_many(&paths).expect("load");
	assert_eq!(report.loaded.len(), 2);
	assert!(report.failed.is_empty());
	assert_eq!(report.skipped, 1);
	assert!(set.is_full());

	let chip = set.chip(1).expect("second chip");
	assert_eq!(chip.probe_values(0).expect("probe 0"), (0.0, 100.0));
	assert_eq!(chip.probe_values(2).expect("probe 2"), (2.0, 102.0));
	assert_eq!(chip.probe_values(3).expect_err("past the end").kind(), ErrorKind::InvalidArgument);

	let err = set.load_single(&paths[2]).expect_err("full");
	assert_eq!(err.kind(), ErrorKind::LimitReached);
}

#[test]
fn cloned_collection_borrows_the_layout() {
	let dir = temp_dir();
	let paths = chip_files(dir.path(), 1);

	let mut set = create_collection(1, "TestChip", Some(dir.path()), &LoadOptions::default()).expect("collection");
	set.load_single(&paths[0]).expect("load");

	let copy = set.clone_chipset().expect("clone");
	assert!(!copy.owns_layout());
	assert_eq!(copy.layout().expect("shared layout").numprobesets(), 2);
	assert_eq!(copy.chip(0).expect("chip").cel.matrix(), set.chip(0).expect("chip").cel.matrix());

	drop(set);
	assert_eq!(copy.layout().expect_err("owner dropped").kind(), ErrorKind::NotFound);
	assert_eq!(copy.chip(0).expect("chip").cel.numcols(), 3);
}

#[test]
fn field_decoder_reads_an_intensity_file_prefix() {
	let dir = temp_dir();
	let path = write_fixture(dir.path(), "a.CEL", &CelFixture::new(3, 2, "TestChip").encode_binary());
	let bytes = std::fs::read(&path).expect("read back");

	let mut cur = Cursor::new(&bytes);
	let decoded = decode_str(&mut cur, "%5dl", &[]).expect("header integers");
	let mut fields = decoded.fields();
	let header: Vec<i32> = (0..5).map(|_| fields.i32().expect("integer")).collect();
	assert_eq!(header, vec![64, 4, 3, 2, 6]);
	assert_eq!(cur.pos(), 20);

	let cel = load_cel_file(&path, &LoadOptions::default()).expect("full parse");
	assert_eq!((cel.numcols(), cel.numrows()), (header[2] as usize, header[3] as usize));
}

#[test]
fn pool_frees_subtrees_with_their_parent() {
	let mut pool: Pool<f64> = Pool::new();
	let root = pool.allocate(0).expect("root");
	let chip = pool.suballoc(root, 4).expect("chip");
	let scratch = pool.suballoc(chip, 8).expect("scratch");
	pool.get_mut(scratch).expect("scratch")[0] = 1.5;
	assert_eq!(pool.live_nodes(), 3);

	let freed = pool.free(chip).expect("free chip");
	assert_eq!(freed, 2);
	assert!(!pool.is_live(scratch));
	assert_eq!(pool.free(scratch).expect_err("already freed").kind(), ErrorKind::AlreadyFreed);
	assert_eq!(pool.children(root).expect("root children"), Vec::new());
}

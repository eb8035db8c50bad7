use super::slot_index;
use crate::affy::{AffyError, ErrorKind, Pool};

#[test]
fn freeing_parent_releases_whole_subtree() {
	let mut pool = Pool::<u8>::new();
	let root = pool.allocate(4).expect("root");
	let child = pool.suballoc(root, 8).expect("child");
	let grandchild = pool.suballoc(child, 2).expect("grandchild");
	let sibling = pool.allocate(1).expect("unrelated root");

	assert_eq!(pool.free(root).expect("free root"), 3);
	assert!(!pool.is_live(root));
	assert!(!pool.is_live(child));
	assert!(!pool.is_live(grandchild));
	assert!(pool.is_live(sibling));
	assert_eq!(pool.live_nodes(), 1);
}

#[test]
fn attach_detaches_from_previous_parent() {
	let mut pool = Pool::<u8>::new();
	let p1 = pool.allocate(0).expect("p1");
	let p2 = pool.allocate(0).expect("p2");
	let n = pool.suballoc(p1, 16).expect("n under p1");

	pool.attach(n, p2).expect("reparent");
	assert_eq!(pool.parent(n).expect("parent"), Some(p2));
	assert!(pool.children(p1).expect("p1 children").is_empty());

	pool.free(p1).expect("free p1");
	assert!(pool.is_live(n), "freeing the old parent must not free n");

	pool.free(p2).expect("free p2");
	assert!(!pool.is_live(n), "freeing the new parent frees n");
}

#[test]
fn attach_under_current_parent_is_noop() {
	let mut pool = Pool::<u8>::new();
	let parent = pool.allocate(0).expect("parent");
	let child = pool.suballoc(parent, 1).expect("child");
	pool.attach(child, parent).expect("same parent");
	assert_eq!(pool.children(parent).expect("children"), vec![child]);
}

#[test]
fn attach_rejects_cycles() {
	let mut pool = Pool::<u8>::new();
	let root = pool.allocate(0).expect("root");
	let child = pool.suballoc(root, 1).expect("child");
	let err = pool.attach(root, child).expect_err("cycle");
	assert_eq!(err.kind(), ErrorKind::InvalidArgument);
	assert_eq!(pool.parent(root).expect("root parent"), None);
}

#[test]
fn zero_sized_zeroed_allocation_is_refused() {
	let mut pool = Pool::<f64>::new();
	let err = pool.allocate_zeroed(0).expect_err("zero count");
	assert_eq!(err.kind(), ErrorKind::InvalidArgument);

	let mut units = Pool::<()>::new();
	let err = units.allocate_zeroed(4).expect_err("zero-sized element");
	assert_eq!(err.kind(), ErrorKind::InvalidArgument);

	assert!(pool.allocate(0).is_ok(), "plain zero-length allocation is allowed");
}

#[test]
fn double_free_and_foreign_handles_are_checked() {
	let mut pool = Pool::<u8>::new();
	let mut other = Pool::<u8>::new();
	let node = pool.allocate(1).expect("node");
	let foreign = other.allocate(1).expect("foreign");

	pool.free(node).expect("first free");
	assert!(matches!(pool.free(node), Err(AffyError::AlreadyFreed { .. })));
	assert!(matches!(pool.free(foreign), Err(AffyError::NotOwned { .. })));
	assert!(matches!(pool.get(foreign), Err(AffyError::NotOwned { .. })));
}

#[test]
fn stale_handle_does_not_alias_reused_slot() {
	let mut pool = Pool::<u8>::new();
	let first = pool.allocate(1).expect("first");
	pool.free(first).expect("free first");
	let second = pool.allocate(1).expect("reuses slot");
	assert_ne!(first, second);
	assert_eq!(pool.get(first).expect_err("stale").kind(), ErrorKind::AlreadyFreed);
	assert!(pool.get(second).is_ok());
}

#[test]
fn reallocate_preserves_prefix_and_position() {
	let mut pool = Pool::<u16>::new();
	let parent = pool.allocate(0).expect("parent");
	let node = pool.suballoc(parent, 3).expect("node");
	let leaf = pool.suballoc(node, 1).expect("leaf");
	pool.get_mut(node).expect("data").copy_from_slice(&[7, 8, 9]);

	let grown = pool.reallocate(node, 5).expect("grow");
	assert_eq!(pool.get(grown).expect("grown"), &[7, 8, 9, 0, 0]);
	let shrunk = pool.reallocate(grown, 2).expect("shrink");
	assert_eq!(pool.get(shrunk).expect("shrunk"), &[7, 8]);

	assert_eq!(pool.parent(shrunk).expect("parent"), Some(parent));
	assert_eq!(pool.children(shrunk).expect("children"), vec![leaf]);
}

#[test]
fn slot_indices_stop_at_the_handle_width() {
	assert_eq!(slot_index(0).expect("first slot"), 0);
	assert_eq!(slot_index(u32::MAX as usize).expect("last slot"), u32::MAX);

	let err = slot_index(u32::MAX as usize + 1).expect_err("beyond u32");
	assert!(matches!(err, AffyError::LimitReached { what: "pool", .. }));
	assert_eq!(err.kind(), ErrorKind::LimitReached);
}

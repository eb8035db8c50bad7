use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::affy::{AffyError, Result};

static NEXT_POOL_ID: AtomicU32 = AtomicU32::new(1);

/// Handle to one allocation inside a [`Pool`].
///
/// Handles carry the owning pool and a generation, so stale or foreign
/// handles are reported instead of aliasing a reused slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
	pool: u32,
	index: u32,
	generation: u32,
}

impl fmt::Display for NodeId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}:{}@{}", self.pool, self.index, self.generation)
	}
}

#[derive(Debug)]
struct Node<T> {
	data: Vec<T>,
	parent: Option<u32>,
	children: Vec<u32>,
}

#[derive(Debug)]
struct Slot<T> {
	generation: u32,
	node: Option<Node<T>>,
}

/// Ownership-tree allocator.
///
/// Every allocation is a node that may be attached under a parent. Freeing a
/// node releases its whole subtree, children first.
#[derive(Debug)]
pub struct Pool<T> {
	id: u32,
	slots: Vec<Slot<T>>,
	free_slots: Vec<u32>,
	live: usize,
}

impl<T: Copy + Default> Default for Pool<T> {
	fn default() -> Self {
		Self::new()
	}
}

impl<T: Copy + Default> Pool<T> {
	/// Create an empty tree.
	pub fn new() -> Self {
		Self {
			id: NEXT_POOL_ID.fetch_add(1, Ordering::Relaxed),
			slots: Vec::new(),
			free_slots: Vec::new(),
			live: 0,
		}
	}

	/// Number of live nodes.
	pub fn live_nodes(&self) -> usize {
		self.live
	}

	/// Allocate a parentless block of `len` elements. Zero-length blocks are allowed.
	pub fn allocate(&mut self, len: usize) -> Result<NodeId> {
		let data = alloc_block(len)?;
		self.insert(data)
	}

	/// Allocate a zero-initialized parentless block.
	///
	/// Refuses zero counts and zero-sized element types.
	pub fn allocate_zeroed(&mut self, count: usize) -> Result<NodeId> {
		if count == 0 || size_of::<T>() == 0 {
			return Err(AffyError::invalid_argument("zero-sized allocation"));
		}
		self.allocate(count)
	}

	/// Allocate a zero-initialized block already attached under `parent`.
	pub fn suballoc(&mut self, parent: NodeId, count: usize) -> Result<NodeId> {
		self.resolve(parent)?;
		let node = self.allocate_zeroed(count)?;
		self.attach(node, parent)?;
		Ok(node)
	}

	/// Detach `child` from any current parent and relink it under `parent`.
	///
	/// Attaching under the current parent is a no-op. Attaching a node under
	/// itself or one of its own descendants is rejected.
	pub fn attach(&mut self, child: NodeId, parent: NodeId) -> Result<()> {
		let child_idx = self.resolve(child)?;
		let parent_idx = self.resolve(parent)?;

		if self.node(child_idx).parent == Some(parent_idx) {
			return Ok(());
		}

		let mut cursor = Some(parent_idx);
		while let Some(idx) = cursor {
			if idx == child_idx {
				return Err(AffyError::invalid_argument(format!("attaching {child} under {parent} would form a cycle")));
			}
			cursor = self.node(idx).parent;
		}

		self.unlink(child_idx);
		self.node_mut(child_idx).parent = Some(parent_idx);
		self.node_mut(parent_idx).children.push(child_idx);
		Ok(())
	}

	/// Detach a node from its parent, making it a root.
	pub fn detach(&mut self, node: NodeId) -> Result<()> {
		let idx = self.resolve(node)?;
		self.unlink(idx);
		Ok(())
	}

	/// Release `node` and every descendant. Returns the number of freed nodes.
	pub fn free(&mut self, node: NodeId) -> Result<usize> {
		let root = self.resolve(node)?;
		self.unlink(root);

		let mut order = Vec::new();
		let mut stack = vec![root];
		while let Some(idx) = stack.pop() {
			order.push(idx);
			stack.extend(self.node(idx).children.iter().copied());
		}

		// Reverse pre-order releases children before their parents.
		for idx in order.iter().rev() {
			let slot = &mut self.slots[*idx as usize];
			slot.node = None;
			slot.generation = slot.generation.wrapping_add(1);
			self.free_slots.push(*idx);
		}
		self.live -= order.len();
		Ok(order.len())
	}

	/// Resize a block in place in the tree, keeping the first `min(old, new)` elements.
	pub fn reallocate(&mut self, node: NodeId, new_len: usize) -> Result<NodeId> {
		let idx = self.resolve(node)?;
		let data = &mut self.node_mut(idx).data;
		if new_len > data.len() {
			data.try_reserve_exact(new_len - data.len()).map_err(|_| AffyError::OutOfMemory { requested: new_len })?;
		}
		data.resize(new_len, T::default());
		Ok(node)
	}

	/// Borrow a block's contents.
	pub fn get(&self, node: NodeId) -> Result<&[T]> {
		let idx = self.resolve(node)?;
		Ok(&self.node(idx).data)
	}

	/// Mutably borrow a block's contents.
	pub fn get_mut(&mut self, node: NodeId) -> Result<&mut [T]> {
		let idx = self.resolve(node)?;
		Ok(&mut self.node_mut(idx).data)
	}

	/// Current parent of a node.
	pub fn parent(&self, node: NodeId) -> Result<Option<NodeId>> {
		let idx = self.resolve(node)?;
		Ok(self.node(idx).parent.map(|parent| self.handle(parent)))
	}

	/// Direct children of a node in attachment order.
	pub fn children(&self, node: NodeId) -> Result<Vec<NodeId>> {
		let idx = self.resolve(node)?;
		Ok(self.node(idx).children.iter().map(|child| self.handle(*child)).collect())
	}

	/// True while `node` has not been freed.
	pub fn is_live(&self, node: NodeId) -> bool {
		self.resolve(node).is_ok()
	}

	fn insert(&mut self, data: Vec<T>) -> Result<NodeId> {
		let idx = match self.free_slots.pop() {
			Some(idx) => idx,
			None => slot_index(self.slots.len())?,
		};
		let node = Node {
			data,
			parent: None,
			children: Vec::new(),
		};
		self.live += 1;

		match self.slots.get_mut(idx as usize) {
			Some(slot) => slot.node = Some(node),
			None => self.slots.push(Slot { generation: 0, node: Some(node) }),
		}
		Ok(self.handle(idx))
	}

	fn handle(&self, index: u32) -> NodeId {
		NodeId {
			pool: self.id,
			index,
			generation: self.slots[index as usize].generation,
		}
	}

	fn resolve(&self, node: NodeId) -> Result<u32> {
		if node.pool != self.id {
			return Err(AffyError::NotOwned { node });
		}
		let Some(slot) = self.slots.get(node.index as usize) else {
			return Err(AffyError::NotOwned { node });
		};
		if slot.generation != node.generation || slot.node.is_none() {
			return Err(AffyError::AlreadyFreed { node });
		}
		Ok(node.index)
	}

	fn unlink(&mut self, idx: u32) {
		if let Some(parent) = self.node_mut(idx).parent.take() {
			self.node_mut(parent).children.retain(|child| *child != idx);
		}
	}

	fn node(&self, idx: u32) -> &Node<T> {
		match &self.slots[idx as usize].node {
			Some(node) => node,
			None => unreachable!("resolved slot {idx} is vacant"),
		}
	}

	fn node_mut(&mut self, idx: u32) -> &mut Node<T> {
		match &mut self.slots[idx as usize].node {
			Some(node) => node,
			None => unreachable!("resolved slot {idx} is vacant"),
		}
	}
}

fn alloc_block<T: Copy + Default>(len: usize) -> Result<Vec<T>> {
	let mut data = Vec::new();
	data.try_reserve_exact(len).map_err(|_| AffyError::OutOfMemory { requested: len })?;
	data.resize(len, T::default());
	Ok(data)
}

/// Slot index for the next fresh slot; handles address at most `u32::MAX + 1` slots.
fn slot_index(len: usize) -> Result<u32> {
	u32::try_from(len).map_err(|_| AffyError::LimitReached { what: "pool", capacity: len })
}

#[cfg(test)]
mod tests;

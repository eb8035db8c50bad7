use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use crate::affy::{
	AffyError, CdfFormat, Chip, LayoutRef, LoadOptions, NodeId, Pool, ProbeLayout, Result, get_array_type_from_path, load_cdf_file, load_cel_file,
};

/// Fixed-capacity ordered set of chips sharing one probe layout.
///
/// Per-chip derived arrays live in an ownership tree: the collection holds a
/// root node, every chip a node beneath it, and derived blocks hang under
/// their chip. Removing a chip releases its whole subtree.
#[derive(Debug)]
pub struct ChipSet {
	capacity: usize,
	array_type: String,
	layout: LayoutRef,
	options: LoadOptions,
	chips: Vec<Chip>,
	derived: Pool<f64>,
	root: NodeId,
	chip_nodes: Vec<NodeId>,
}

/// Outcome of [`ChipSet::load_many`].
#[derive(Debug, Default)]
pub struct LoadReport {
	/// Positions of the chips added, in input order.
	pub loaded: Vec<usize>,
	/// Files that failed to load, with their errors.
	pub failed: Vec<(PathBuf, AffyError)>,
	/// Files left unread because the collection filled up.
	pub skipped: usize,
}

/// Create an empty collection, loading the probe layout for `array_type`.
///
/// The layout is searched for through `hint`, then the current directory.
pub fn create_collection(capacity: usize, array_type: &str, hint: Option<&Path>, options: &LoadOptions) -> Result<ChipSet> {
	let layout = load_cdf_file(array_type, hint, options)?;
	ChipSet::with_layout(capacity, layout, options.clone())
}

impl ChipSet {
	/// Empty collection owning `layout`.
	pub fn with_layout(capacity: usize, layout: ProbeLayout, options: LoadOptions) -> Result<Self> {
		let array_type = layout.array_type.clone();
		Self::from_parts(capacity, array_type, LayoutRef::owned(layout), options)
	}

	/// Empty collection over a synthesized layout of `numprobes` single-probe sets.
	pub fn generic(capacity: usize, numprobes: usize, options: LoadOptions) -> Result<Self> {
		Self::with_layout(capacity, ProbeLayout::generic(numprobes)?, options)
	}

	fn from_parts(capacity: usize, array_type: String, layout: LayoutRef, options: LoadOptions) -> Result<Self> {
		if capacity == 0 {
			return Err(AffyError::invalid_argument("chipset capacity must be positive"));
		}
		let mut derived = Pool::new();
		let root = derived.allocate(0)?;
		Ok(Self {
			capacity,
			array_type,
			layout,
			options,
			chips: Vec::new(),
			derived,
			root,
			chip_nodes: Vec::new(),
		})
	}

	/// Maximum number of chips.
	pub fn capacity(&self) -> usize {
		self.capacity
	}

	/// Number of loaded chips.
	pub fn len(&self) -> usize {
		self.chips.len()
	}

	/// True when no chip is loaded.
	pub fn is_empty(&self) -> bool {
		self.chips.is_empty()
	}

	/// True when no more chips fit.
	pub fn is_full(&self) -> bool {
		self.chips.len() >= self.capacity
	}

	/// Array type shared by the collection.
	pub fn array_type(&self) -> &str {
		&self.array_type
	}

	/// Options used for every load into this collection.
	pub fn options(&self) -> &LoadOptions {
		&self.options
	}

	/// Resolve the shared layout.
	pub fn layout(&self) -> Result<Arc<ProbeLayout>> {
		self.layout.get()
	}

	/// True when this collection owns its layout rather than borrowing it.
	pub fn owns_layout(&self) -> bool {
		self.layout.is_owner()
	}

	/// Loaded chips in load order.
	pub fn chips(&self) -> &[Chip] {
		&self.chips
	}

	/// Chip by position.
	pub fn chip(&self, index: usize) -> Result<&Chip> {
		self.chips.get(index).ok_or_else(|| self.chip_out_of_range(index))
	}

	/// Load one intensity file and append it.
	///
	/// The file's declared array type must match the collection unless
	/// mismatches are tolerated; generic collections accept any type.
	/// Returns the new chip's position.
	pub fn load_single(&mut self, path: impl AsRef<Path>) -> Result<usize> {
		let path = path.as_ref();
		if self.is_full() {
			return Err(AffyError::LimitReached {
				what: "chipset",
				capacity: self.capacity,
			});
		}

		let layout = self.layout()?;
		if layout.format != CdfFormat::Generic {
			let found = get_array_type_from_path(path, &self.options)?;
			if found != self.array_type {
				warn!(path = %path.display(), expected = %self.array_type, found = %found, "array type mismatch");
				if !self.options.ignore_type_mismatch {
					return Err(AffyError::TypeMismatch {
						expected: self.array_type.clone(),
						found,
						path: path.display().to_string(),
					});
				}
			}
		}

		let cel = load_cel_file(path, &self.options)?;
		let node = self.derived.allocate(0)?;
		self.derived.attach(node, self.root)?;
		self.chips.push(Chip::new(cel, self.layout.borrow()));
		self.chip_nodes.push(node);
		info!(path = %path.display(), index = self.chips.len() - 1, "chip added");
		Ok(self.chips.len() - 1)
	}

	/// Load files in order until the collection is full.
	///
	/// A file that fails to load is logged and recorded in the report, and
	/// loading moves on to the next one. Only a released layout stops the
	/// whole batch.
	pub fn load_many<P: AsRef<Path>>(&mut self, paths: &[P]) -> Result<LoadReport> {
		self.layout()?;
		let mut report = LoadReport::default();
		for (attempted, path) in paths.iter().enumerate() {
			if self.is_full() {
				report.skipped = paths.len() - attempted;
				warn!(capacity = self.capacity, skipped = report.skipped, "chipset full");
				break;
			}
			let path = path.as_ref();
			match self.load_single(path) {
				Ok(index) => report.loaded.push(index),
				Err(err) => {
					warn!(path = %path.display(), error = %err, "chip not loaded");
					report.failed.push((path.to_path_buf(), err));
				}
			}
		}
		Ok(report)
	}

	/// Change the capacity, dropping chips past the new end.
	pub fn resize(&mut self, capacity: usize) -> Result<()> {
		if capacity == 0 {
			return Err(AffyError::invalid_argument("chipset capacity must be positive"));
		}
		while self.chips.len() > capacity {
			self.remove_chip(self.chips.len() - 1)?;
		}
		self.capacity = capacity;
		Ok(())
	}

	/// Remove one chip, releasing its derived storage.
	pub fn remove_chip(&mut self, index: usize) -> Result<Chip> {
		if index >= self.chips.len() {
			return Err(self.chip_out_of_range(index));
		}
		let node = self.chip_nodes.remove(index);
		self.derived.free(node)?;
		Ok(self.chips.remove(index))
	}

	/// Deep copy of one chip's intensity data, borrowing the layout.
	pub fn clone_chip(&self, index: usize) -> Result<Chip> {
		Ok(self.chip(index)?.clone_borrowed())
	}

	/// Copy of the whole collection that borrows the layout.
	///
	/// Intensity data and derived arrays are copied.
	pub fn clone_chipset(&self) -> Result<Self> {
		self.clone_with(self.capacity, 0..self.chips.len())
	}

	/// Capacity-one copy holding only the chip at `index`.
	pub fn clone_chipset_one_chip(&self, index: usize) -> Result<Self> {
		self.chip(index)?;
		self.clone_with(1, index..index + 1)
	}

	fn clone_with(&self, capacity: usize, range: std::ops::Range<usize>) -> Result<Self> {
		let mut out = Self::from_parts(capacity, self.array_type.clone(), self.layout.borrow(), self.options.clone())?;
		for index in range {
			let node = out.derived.allocate(0)?;
			out.derived.attach(node, out.root)?;
			for block in self.derived.children(self.chip_nodes[index])? {
				let values = self.derived.get(block)?;
				let copy = out.derived.allocate(values.len())?;
				out.derived.get_mut(copy)?.copy_from_slice(values);
				out.derived.attach(copy, node)?;
			}
			out.chips.push(self.chips[index].clone_borrowed());
			out.chip_nodes.push(node);
		}
		Ok(out)
	}

	/// Allocate a zeroed derived array of `len` values owned by chip `index`.
	pub fn alloc_derived(&mut self, index: usize, len: usize) -> Result<NodeId> {
		let chip = *self.chip_nodes.get(index).ok_or_else(|| self.chip_out_of_range(index))?;
		self.derived.suballoc(chip, len)
	}

	/// Derived arrays owned by chip `index`, in allocation order.
	pub fn derived_nodes(&self, index: usize) -> Result<Vec<NodeId>> {
		let chip = *self.chip_nodes.get(index).ok_or_else(|| self.chip_out_of_range(index))?;
		self.derived.children(chip)
	}

	/// Borrow a derived array.
	pub fn derived(&self, node: NodeId) -> Result<&[f64]> {
		self.derived.get(node)
	}

	/// Mutably borrow a derived array.
	pub fn derived_mut(&mut self, node: NodeId) -> Result<&mut [f64]> {
		self.derived.get_mut(node)
	}

	/// Release a derived array and anything attached beneath it.
	pub fn free_derived(&mut self, node: NodeId) -> Result<usize> {
		if self.chip_nodes.contains(&node) || node == self.root {
			return Err(AffyError::invalid_argument(format!("{node} is a chip or collection node, not derived storage")));
		}
		self.derived.free(node)
	}

	/// Live nodes in the ownership tree, including the root and chip nodes.
	pub fn live_nodes(&self) -> usize {
		self.derived.live_nodes()
	}

	fn chip_out_of_range(&self, index: usize) -> AffyError {
		AffyError::invalid_argument(format!("chip {index} out of range ({} loaded)", self.chips.len()))
	}
}

#[cfg(test)]
mod tests;

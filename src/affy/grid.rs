use crate::affy::{AffyError, Result};

/// Dense 2-D array addressed as `(x, y)`, column first.
///
/// Backed by one flat row-major buffer: `x` varies fastest, matching the
/// on-disk cell order of every intensity-file variant.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid<T> {
	cols: usize,
	rows: usize,
	cells: Vec<T>,
}

impl<T: Clone> Grid<T> {
	/// Allocate a `cols` x `rows` grid filled with `value`.
	pub fn filled(cols: usize, rows: usize, value: T) -> Result<Self> {
		let len = cols.checked_mul(rows).ok_or(AffyError::OutOfMemory { requested: usize::MAX })?;
		let mut cells = Vec::new();
		cells.try_reserve_exact(len).map_err(|_| AffyError::OutOfMemory { requested: len })?;
		cells.resize(len, value);
		Ok(Self { cols, rows, cells })
	}
}

impl<T> Grid<T> {
	/// Wrap a row-major buffer, checking its length.
	pub fn from_vec(cols: usize, rows: usize, cells: Vec<T>) -> Result<Self> {
		if cols.checked_mul(rows) != Some(cells.len()) {
			return Err(AffyError::invalid_argument(format!("{} cells do not fill a {cols}x{rows} grid", cells.len())));
		}
		Ok(Self { cols, rows, cells })
	}

	/// Column count.
	pub fn cols(&self) -> usize {
		self.cols
	}

	/// Row count.
	pub fn rows(&self) -> usize {
		self.rows
	}

	/// True when `(x, y)` lies inside the grid.
	pub fn contains(&self, x: i64, y: i64) -> bool {
		x >= 0 && y >= 0 && (x as u64) < self.cols as u64 && (y as u64) < self.rows as u64
	}

	fn offset(&self, x: usize, y: usize) -> Option<usize> {
		(x < self.cols && y < self.rows).then(|| y * self.cols + x)
	}

	/// Bounds-checked lookup.
	pub fn get(&self, x: usize, y: usize) -> Option<&T> {
		self.offset(x, y).map(|idx| &self.cells[idx])
	}

	/// Bounds-checked mutable lookup.
	pub fn get_mut(&mut self, x: usize, y: usize) -> Option<&mut T> {
		self.offset(x, y).map(|idx| &mut self.cells[idx])
	}

	/// Store `value` at `(x, y)`, reporting out-of-range writes.
	pub fn set(&mut self, x: usize, y: usize, value: T) -> Result<()> {
		let (cols, rows) = (self.cols, self.rows);
		let slot = self.get_mut(x, y).ok_or(AffyError::CoordinateOutOfRange {
			section: "grid",
			x: x as i64,
			y: y as i64,
			cols,
			rows,
		})?;
		*slot = value;
		Ok(())
	}

	/// One row, `x` ascending.
	pub fn row(&self, y: usize) -> Option<&[T]> {
		(y < self.rows).then(|| &self.cells[y * self.cols..(y + 1) * self.cols])
	}

	/// Flat row-major view.
	pub fn as_slice(&self) -> &[T] {
		&self.cells
	}

	/// Iterate `((x, y), value)` in storage order.
	pub fn iter(&self) -> impl Iterator<Item = ((usize, usize), &T)> {
		let cols = self.cols.max(1);
		self.cells.iter().enumerate().map(move |(idx, value)| ((idx % cols, idx / cols), value))
	}
}

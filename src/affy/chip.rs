use std::path::Path;
use std::sync::{Arc, Weak};

use tracing::debug;

use crate::affy::{AffyError, CelFile, LoadOptions, ProbeLayout, Result, load_cdf_file, load_cel_file};

/// Handle from a chip or collection to its probe layout.
///
/// The collection that loaded a layout owns it; clones only borrow, so
/// dropping a clone never releases the layout and dropping the owner makes
/// every borrowed handle report [`AffyError::LayoutReleased`]. `Clone`
/// always yields a borrowed handle.
#[derive(Debug)]
pub enum LayoutRef {
	/// Owning handle.
	Shared(Arc<ProbeLayout>),
	/// Borrowed handle held by clones.
	Borrowed(Weak<ProbeLayout>),
}

impl LayoutRef {
	/// Take ownership of a freshly loaded layout.
	pub fn owned(layout: ProbeLayout) -> Self {
		Self::Shared(Arc::new(layout))
	}

	/// Resolve the layout, failing once its owner is gone.
	pub fn get(&self) -> Result<Arc<ProbeLayout>> {
		match self {
			Self::Shared(layout) => Ok(Arc::clone(layout)),
			Self::Borrowed(layout) => layout.upgrade().ok_or(AffyError::LayoutReleased),
		}
	}

	/// Non-owning handle to the same layout.
	pub fn borrow(&self) -> Self {
		match self {
			Self::Shared(layout) => Self::Borrowed(Arc::downgrade(layout)),
			Self::Borrowed(layout) => Self::Borrowed(Weak::clone(layout)),
		}
	}

	/// True for the owning handle.
	pub fn is_owner(&self) -> bool {
		matches!(self, Self::Shared(_))
	}

	/// True while the layout is still reachable.
	pub fn is_live(&self) -> bool {
		match self {
			Self::Shared(_) => true,
			Self::Borrowed(layout) => layout.strong_count() > 0,
		}
	}
}

impl Clone for LayoutRef {
	fn clone(&self) -> Self {
		self.borrow()
	}
}

/// One intensity file paired with its probe layout.
///
/// Cloning copies the intensity data and borrows the layout.
#[derive(Debug)]
pub struct Chip {
	/// Intensity data.
	pub cel: CelFile,
	layout: LayoutRef,
}

impl Chip {
	/// Pair an intensity file with a layout handle.
	pub fn new(cel: CelFile, layout: LayoutRef) -> Self {
		Self { cel, layout }
	}

	/// Load an intensity file and the probe layout its header names.
	///
	/// The layout is searched for next to the intensity file, then in the
	/// current directory.
	pub fn load(path: impl AsRef<Path>, options: &LoadOptions) -> Result<Self> {
		let path = path.as_ref();
		let cel = load_cel_file(path, options)?;
		let array_type = cel.array_type.clone().ok_or(AffyError::ArrayTypeNotFound)?;
		let layout = load_cdf_file(&array_type, path.parent(), options)?;
		debug!(path = %path.display(), array_type = %array_type, "chip loaded");
		Ok(Self::new(cel, LayoutRef::owned(layout)))
	}

	/// Resolve this chip's layout.
	pub fn layout(&self) -> Result<Arc<ProbeLayout>> {
		self.layout.get()
	}

	/// Layout handle, owning or borrowed.
	pub fn layout_ref(&self) -> &LayoutRef {
		&self.layout
	}

	/// Deep copy of the intensity data that borrows the layout.
	pub fn clone_borrowed(&self) -> Self {
		Self {
			cel: self.cel.clone(),
			layout: self.layout.borrow(),
		}
	}

	/// PM and MM intensities of the probe with layout-wide `index`.
	pub fn probe_values(&self, index: usize) -> Result<(f64, f64)> {
		let layout = self.layout()?;
		let probe = layout
			.probe(index)
			.ok_or_else(|| AffyError::invalid_argument(format!("probe {index} out of range ({} probes)", layout.numprobes())))?;
		let pm = self.cel.cell(probe.pm.x, probe.pm.y)?.value;
		let mm = self.cel.cell(probe.mm.x, probe.mm.y)?.value;
		Ok((pm, mm))
	}
}

impl Clone for Chip {
	fn clone(&self) -> Self {
		self.clone_borrowed()
	}
}

/// Side-channel observer for long scans.
///
/// Implementations are notified at coarse intervals and must not influence
/// parsing; every loader works the same with [`NoProgress`].
pub trait Progress {
	/// A scan of `total` units named `label` is starting.
	fn begin(&mut self, label: &str, total: usize) {
		let _ = (label, total);
	}

	/// `done` more units were processed.
	fn tick(&mut self, done: usize) {
		let _ = done;
	}

	/// The current scan finished.
	fn finish(&mut self) {}
}

/// Observer that ignores every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl Progress for NoProgress {}

/// Tick interval used by loaders, in processed units.
pub(crate) const TICK_EVERY: usize = 4096;

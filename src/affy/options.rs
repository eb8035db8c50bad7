use crate::affy::compression::MAX_DECOMPRESSED_BYTES;

/// Switches shared by every loader.
#[derive(Debug, Clone)]
pub struct LoadOptions {
	/// Keep per-cell stddev and pixel-count fields.
	pub retain_qc: bool,
	/// Accept intensity files whose array type differs from their collection.
	pub ignore_type_mismatch: bool,
	/// Ceiling for transparently decompressed inputs.
	pub max_decompressed_bytes: usize,
}

impl Default for LoadOptions {
	fn default() -> Self {
		Self {
			retain_qc: true,
			ignore_type_mismatch: false,
			max_decompressed_bytes: MAX_DECOMPRESSED_BYTES,
		}
	}
}

impl LoadOptions {
	/// Preset for normalization runs that only need intensity values.
	pub fn values_only() -> Self {
		Self {
			retain_qc: false,
			..Self::default()
		}
	}

	/// Preset that accepts mixed array types in one collection.
	pub fn tolerant() -> Self {
		Self {
			ignore_type_mismatch: true,
			..Self::default()
		}
	}
}

/// Placeholders written for QC fields the model does not hold.
#[derive(Debug, Clone, Copy)]
pub struct WriteOptions {
	/// Standard deviation written when a cell has no QC data.
	pub placeholder_stddev: f32,
	/// Pixel count written when a cell has no QC data.
	pub placeholder_pixels: i16,
}

impl Default for WriteOptions {
	fn default() -> Self {
		Self {
			placeholder_stddev: 0.0,
			placeholder_pixels: 1,
		}
	}
}

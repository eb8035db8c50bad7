//! Public library API for reading microarray CEL, CDF and DAT files.

/// Intensity, probe-layout and pixel-image decoding plus chip assembly.
pub mod affy;

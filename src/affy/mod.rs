mod bytes;
mod calvin;
mod cdf;
mod cel;
mod chip;
mod chipset;
mod compression;
mod control;
mod dat;
mod directive;
mod error;
mod grid;
mod options;
mod pool;
mod progress;
mod textio;

/// Bounded little/big-endian byte cursor.
pub use bytes::{Cursor, Endianness};
/// Generic chunked container model and loader.
pub use calvin::{CALVIN_MAGIC, CalvinFile, Column, DataGroup, DataHeader, DataSet, Param, ParamValue, ValueType, load_calvin_file};
/// Probe layout model, parsers, and search.
pub use cdf::{
	CDF_BINARY_MAGIC, CdfFormat, CellCoord, CellType, GENERIC_ARRAY_TYPE, Probe, ProbeLayout, ProbeRef, ProbeSet, cdf_search_paths, load_cdf_file, load_cdf_file_byname, load_name_list,
	parse_cdf,
};
/// Intensity file model, variant parsers, sniffing, and writer.
pub use cel::{
	BINARY_CEL_MAGIC, BINARY_CEL_VERSION, Cell, CellQc, CelFile, CelFormat, RecordPolicy, Section, SectionOutcome, SectionPolicy, array_type_from_header, encode_binary_cel, get_array_type,
	get_array_type_from_path, load_cel_file, load_cel_file_with_progress, parse_cel, section_policy, write_binary_cel_file,
};
/// Intensity file paired with its layout.
pub use chip::{Chip, LayoutRef};
/// Fixed-capacity chip collection.
pub use chipset::{ChipSet, LoadReport, create_collection};
/// Transparent input decompression.
pub use compression::{Compression, MAX_DECOMPRESSED_BYTES, ZSTD_MAGIC, decode_bytes, read_source};
/// Control probe-set naming convention.
pub use control::is_control_name;
/// Raw pixel image model and loader.
pub use dat::{DAT_MAGIC, DatFile, DatHeader, GridCorners, PixelRegion, Point, load_dat_file};
/// Directive-driven field decoder and encoder.
pub use directive::{Decoded, Directive, DirectiveKind, Directives, Field, FieldReader, Repeat, Slot, Width, decode, decode_str, encode, encode_str};
/// Error and result aliases.
pub use error::{AffyError, ErrorKind, Result};
/// Bounds-checked 2-D view.
pub use grid::Grid;
/// Loader and writer switches.
pub use options::{LoadOptions, WriteOptions};
/// Ownership-tree allocator.
pub use pool::{NodeId, Pool};
/// Progress observer.
pub use progress::{NoProgress, Progress};
/// Line-oriented text reading helpers.
pub use textio::{LineReader, expect_key, split_key_value};

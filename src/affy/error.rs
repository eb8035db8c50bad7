use thiserror::Error;

use crate::affy::NodeId;

/// Crate-local result type.
pub type Result<T> = std::result::Result<T, AffyError>;

/// Coarse error classification shared by every fallible operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
	/// Stream read, write, open, or seek failure.
	Io,
	/// Structurally invalid record, bad magic, or unparsable line.
	Format,
	/// Allocation request could not be satisfied.
	OutOfMemory,
	/// Missing file or resource.
	NotFound,
	/// Array-type disagreement between a file and its collection.
	TypeMismatch,
	/// A chipset or pool is at capacity.
	LimitReached,
	/// Caller supplied an invalid argument.
	InvalidArgument,
	/// Operation is deliberately not implemented for this input.
	Unsupported,
	/// Ownership node was already released.
	AlreadyFreed,
	/// Ownership node does not belong to the tree it was used with.
	NotOwned,
}

impl ErrorKind {
	/// Render the kind as a stable lowercase label.
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Io => "io",
			Self::Format => "format",
			Self::OutOfMemory => "out_of_memory",
			Self::NotFound => "not_found",
			Self::TypeMismatch => "type_mismatch",
			Self::LimitReached => "limit_reached",
			Self::InvalidArgument => "invalid_argument",
			Self::Unsupported => "unsupported",
			Self::AlreadyFreed => "already_freed",
			Self::NotOwned => "not_owned",
		}
	}
}

/// Errors produced while reading, decoding, and assembling microarray data.
#[derive(Debug, Error)]
pub enum AffyError {
	/// Filesystem or stream IO failure.
	#[error("io: {0}")]
	Io(#[from] std::io::Error),
	/// Not enough bytes remained for a requested read.
	#[error("unexpected eof at offset {at}, need {need} bytes, remaining {rem}")]
	UnexpectedEof {
		/// Byte offset where the read was attempted.
		at: usize,
		/// Requested bytes.
		need: usize,
		/// Bytes still available.
		rem: usize,
	},
	/// Seek target fell outside the stream.
	#[error("seek by {offset} from offset {at} leaves stream of {len} bytes")]
	SeekOutOfRange {
		/// Offset the seek started from.
		at: usize,
		/// Requested relative or absolute displacement.
		offset: i64,
		/// Stream length.
		len: usize,
	},
	/// Decompression output exceeded configured safety limit.
	#[error("decompressed output exceeded limit {limit} bytes")]
	DecompressedTooLarge {
		/// Maximum allowed output bytes.
		limit: usize,
	},
	/// Leading magic did not match the expected format.
	#[error("bad {format} magic {magic:#x}")]
	BadMagic {
		/// Format being parsed.
		format: &'static str,
		/// Magic value read from the stream.
		magic: u32,
	},
	/// Field-decoder directive string could not be parsed.
	#[error("invalid directive {directive:?} at position {pos}")]
	InvalidDirective {
		/// Directive source string.
		directive: String,
		/// Character offset of the failure.
		pos: usize,
	},
	/// A `*` or `x` directive ran out of runtime arguments.
	#[error("directive {index} needs a runtime argument")]
	MissingDirectiveArg {
		/// Zero-based directive index.
		index: usize,
	},
	/// Value supplied to the encoder does not fit its directive.
	#[error("directive {index} cannot encode {got}")]
	DirectiveValueMismatch {
		/// Zero-based directive index.
		index: usize,
		/// Description of the offending value.
		got: String,
	},
	/// Structurally invalid record.
	#[error("malformed {what}: {detail}")]
	Malformed {
		/// Structure being parsed.
		what: &'static str,
		/// Human-readable failure detail.
		detail: String,
	},
	/// Declared grid dimensions are not positive.
	#[error("invalid dimensions: cols={cols}, rows={rows}")]
	InvalidDimensions {
		/// Declared column count.
		cols: i64,
		/// Declared row count.
		rows: i64,
	},
	/// Section ended before its declared record count.
	#[error("{section} section truncated: expected {expected} records, read {read}")]
	TruncatedSection {
		/// Section label.
		section: &'static str,
		/// Declared record count.
		expected: usize,
		/// Records actually read.
		read: usize,
	},
	/// Record addressed a cell outside the grid.
	#[error("{section} coordinate out of range: x={x}, y={y} (cols={cols}, rows={rows})")]
	CoordinateOutOfRange {
		/// Section label.
		section: &'static str,
		/// Column coordinate.
		x: i64,
		/// Row coordinate.
		y: i64,
		/// Grid column count.
		cols: usize,
		/// Grid row count.
		rows: usize,
	},
	/// Text line was expected to be `key=value`.
	#[error("unparsable key-value line: {line:?}")]
	BadKeyValue {
		/// Offending line.
		line: String,
	},
	/// Header payload carried no `.1sq` array-type marker.
	#[error("array type marker not found")]
	ArrayTypeNotFound,
	/// Required parameter, dataset, or column is absent.
	#[error("missing {what}")]
	Missing {
		/// Name of the absent item.
		what: String,
	},
	/// Allocation request could not be satisfied.
	#[error("out of memory allocating {requested} elements")]
	OutOfMemory {
		/// Requested element count.
		requested: usize,
	},
	/// File or resource could not be located.
	#[error("not found: {what}")]
	NotFound {
		/// Description of what was searched for.
		what: String,
	},
	/// Intensity file array type disagrees with its collection.
	#[error("array type mismatch for {path}: collection is {expected}, file is {found}")]
	TypeMismatch {
		/// Collection array type.
		expected: String,
		/// File array type.
		found: String,
		/// Offending file path.
		path: String,
	},
	/// A chipset or pool is full.
	#[error("{what} is full (capacity {capacity})")]
	LimitReached {
		/// Container that ran out of room.
		what: &'static str,
		/// Its capacity.
		capacity: usize,
	},
	/// Caller supplied an invalid argument.
	#[error("invalid argument: {reason}")]
	InvalidArgument {
		/// Why the argument was rejected.
		reason: String,
	},
	/// Operation deliberately left unimplemented.
	#[error("unsupported: {what}")]
	Unsupported {
		/// Description of the refused operation.
		what: String,
	},
	/// Ownership node was already released.
	#[error("ownership node {node} already freed")]
	AlreadyFreed {
		/// Stale node handle.
		node: NodeId,
	},
	/// Ownership node belongs to another tree.
	#[error("ownership node {node} is not owned by this tree")]
	NotOwned {
		/// Foreign node handle.
		node: NodeId,
	},
	/// Borrowed probe layout was dropped by its owner.
	#[error("probe layout was released by its owner")]
	LayoutReleased,
}

impl AffyError {
	/// Classify this error into one of the coarse kinds.
	pub fn kind(&self) -> ErrorKind {
		match self {
			Self::Io(_) | Self::UnexpectedEof { .. } | Self::SeekOutOfRange { .. } => ErrorKind::Io,
			Self::BadMagic { .. }
			| Self::InvalidDirective { .. }
			| Self::Malformed { .. }
			| Self::InvalidDimensions { .. }
			| Self::TruncatedSection { .. }
			| Self::CoordinateOutOfRange { .. }
			| Self::BadKeyValue { .. }
			| Self::ArrayTypeNotFound
			| Self::Missing { .. } => ErrorKind::Format,
			Self::DecompressedTooLarge { .. } | Self::OutOfMemory { .. } => ErrorKind::OutOfMemory,
			Self::NotFound { .. } | Self::LayoutReleased => ErrorKind::NotFound,
			Self::TypeMismatch { .. } => ErrorKind::TypeMismatch,
			Self::LimitReached { .. } => ErrorKind::LimitReached,
			Self::MissingDirectiveArg { .. } | Self::DirectiveValueMismatch { .. } | Self::InvalidArgument { .. } => ErrorKind::InvalidArgument,
			Self::Unsupported { .. } => ErrorKind::Unsupported,
			Self::AlreadyFreed { .. } => ErrorKind::AlreadyFreed,
			Self::NotOwned { .. } => ErrorKind::NotOwned,
		}
	}

	pub(crate) fn malformed(what: &'static str, detail: impl Into<String>) -> Self {
		Self::Malformed { what, detail: detail.into() }
	}

	pub(crate) fn invalid_argument(reason: impl Into<String>) -> Self {
		Self::InvalidArgument { reason: reason.into() }
	}
}

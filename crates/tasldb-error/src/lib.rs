use std::path::PathBuf;

use thiserror::Error;

/// Primary error type for tasldb operations.
///
/// Structured variants for common cases; storage-engine errors are carried
/// verbatim. Every variant is fatal to the operation that raised it and none
/// are retried automatically.
#[derive(Error, Debug)]
pub enum TaslError {
    // === Decode errors ===
    /// The chunk stream ended in the middle of a value.
    #[error("premature end of stream")]
    PrematureEnd,

    /// A zero-length chunk was pulled from the stream.
    #[error("empty chunk in stream")]
    EmptyChunk,

    /// A varint ran past the safe-integer ceiling.
    #[error("varint exceeds the safe integer range")]
    VarintTooLong,

    /// The stream had trailing data after the last expected element.
    #[error("stream not closed when expected")]
    StreamNotClosed,

    /// The instance header carried a version this library does not speak.
    #[error("unsupported encoding version {found} (expected {expected})")]
    UnsupportedVersion { found: u64, expected: u64 },

    /// A coproduct tag on the wire named a nonexistent option.
    #[error("coproduct option index {index} out of range for {arity} options")]
    OptionIndexOutOfRange { index: u64, arity: usize },

    /// The persisted schema blob failed to decode.
    #[error("corrupt schema blob: {detail}")]
    CorruptSchemaBlob { detail: String },

    /// Value bytes disagreed with the schema-directed layout.
    #[error("malformed value bytes: {detail}")]
    MalformedValue { detail: String },

    // === Type errors ===
    /// A value's shape disagrees with its declared type.
    #[error("expected a {expected} value, found {found}")]
    KindMismatch {
        expected: &'static str,
        found: &'static str,
    },

    /// A coproduct value was injected with an unknown option key.
    #[error("no option {key} in coproduct")]
    UnknownOption { key: String },

    /// A product value or expression omitted a declared component.
    #[error("missing product component {key}")]
    MissingComponent { key: String },

    /// A product value or projection named an undeclared component.
    #[error("no component {key} in product")]
    UnknownComponent { key: String },

    /// A match expression had no case for the selected option.
    #[error("missing case for option {key}")]
    MissingCase { key: String },

    /// A literal's datatype disagreed with the expected datatype.
    #[error("literal datatype mismatch: expected {expected}, found {found}")]
    DatatypeMismatch { expected: String, found: String },

    /// A value could not be structurally projected to the expected type.
    #[error("cannot project value: {detail}")]
    ProjectionMismatch { detail: String },

    /// A term or match referenced an identifier absent from the environment.
    #[error("unbound identifier {id}")]
    UnboundIdentifier { id: String },

    /// A schema failed structural validation at construction.
    #[error("invalid schema: {detail}")]
    InvalidSchema { detail: String },

    /// A literal's lexical form is not valid for its datatype.
    #[error("invalid lexical form for {datatype}: {value:?}")]
    InvalidLexical { datatype: String, value: String },

    // === Range errors ===
    /// An integer literal fell outside its datatype's value space.
    #[error("{datatype} value out of range: {value}")]
    IntegerOutOfRange { datatype: String, value: String },

    /// An element id exceeded the maximum safe id.
    #[error("id {id} exceeds the maximum safe id")]
    IdOutOfRange { id: u64 },

    /// The encoder was configured with a chunk size below the minimum.
    #[error("chunk size {size} is below the minimum of {min}")]
    ChunkSizeTooSmall { size: usize, min: usize },

    // === Lookup errors ===
    /// Point access on an id that is not present in the class.
    #[error("no element in {class} with id {id}")]
    NoElement { class: String, id: u64 },

    /// An operation named a class key absent from the schema.
    #[error("no class {key} in schema")]
    NoClass { key: String },

    // === Storage errors ===
    /// Underlying storage engine error, surfaced verbatim.
    #[error(transparent)]
    Storage(#[from] rusqlite::Error),

    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// `open` on a path with no database file behind it.
    #[error("database not found: '{path}'")]
    DatabaseNotFound { path: PathBuf },

    /// Write operation on a read-only handle.
    #[error("attempt to write a read-only database")]
    ReadOnly,

    /// An insert that should have returned the assigned id returned nothing.
    #[error("insert returned no row")]
    NoRowReturned,

    /// The encoder was written to after `close`.
    #[error("encoder is closed")]
    EncoderClosed,

    // === Schema mismatch ===
    /// Two schemas that must agree structurally did not.
    #[error("schema mismatch: {detail}")]
    SchemaMismatch { detail: String },
}

/// Coarse classification of a [`TaslError`], one bucket per failure family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed chunk stream or persisted blob.
    Decode,
    /// Value shape or expression disagreeing with a declared type.
    Type,
    /// Numeric value outside the representable range.
    Range,
    /// Missing element or unknown class key.
    Lookup,
    /// Underlying engine, file, or handle-state failure.
    Storage,
    /// Structural schema disagreement.
    SchemaMismatch,
}

impl TaslError {
    /// Classify this error into its [`ErrorKind`] bucket.
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::PrematureEnd
            | Self::EmptyChunk
            | Self::VarintTooLong
            | Self::StreamNotClosed
            | Self::UnsupportedVersion { .. }
            | Self::OptionIndexOutOfRange { .. }
            | Self::CorruptSchemaBlob { .. }
            | Self::MalformedValue { .. } => ErrorKind::Decode,
            Self::KindMismatch { .. }
            | Self::UnknownOption { .. }
            | Self::MissingComponent { .. }
            | Self::UnknownComponent { .. }
            | Self::MissingCase { .. }
            | Self::DatatypeMismatch { .. }
            | Self::ProjectionMismatch { .. }
            | Self::UnboundIdentifier { .. }
            | Self::InvalidSchema { .. }
            | Self::InvalidLexical { .. } => ErrorKind::Type,
            Self::IntegerOutOfRange { .. }
            | Self::IdOutOfRange { .. }
            | Self::ChunkSizeTooSmall { .. } => ErrorKind::Range,
            Self::NoElement { .. } | Self::NoClass { .. } => ErrorKind::Lookup,
            Self::Storage(_)
            | Self::Io(_)
            | Self::DatabaseNotFound { .. }
            | Self::ReadOnly
            | Self::NoRowReturned
            | Self::EncoderClosed => ErrorKind::Storage,
            Self::SchemaMismatch { .. } => ErrorKind::SchemaMismatch,
        }
    }

    /// Create a lookup error for a missing element.
    pub fn no_element(class: impl Into<String>, id: u64) -> Self {
        Self::NoElement {
            class: class.into(),
            id,
        }
    }

    /// Create a lookup error for an unknown class key.
    pub fn no_class(key: impl Into<String>) -> Self {
        Self::NoClass { key: key.into() }
    }

    /// Create a type error for a value whose variant disagrees with its type.
    pub const fn kind_mismatch(expected: &'static str, found: &'static str) -> Self {
        Self::KindMismatch { expected, found }
    }

    /// Create a decode error for malformed value bytes.
    pub fn malformed(detail: impl Into<String>) -> Self {
        Self::MalformedValue {
            detail: detail.into(),
        }
    }

    /// Create a decode error for a schema blob that failed to decode.
    pub fn corrupt_schema(detail: impl Into<String>) -> Self {
        Self::CorruptSchemaBlob {
            detail: detail.into(),
        }
    }

    /// Create a schema mismatch error.
    pub fn schema_mismatch(detail: impl Into<String>) -> Self {
        Self::SchemaMismatch {
            detail: detail.into(),
        }
    }

    /// Create a type error for a projection that cannot be performed.
    pub fn projection(detail: impl Into<String>) -> Self {
        Self::ProjectionMismatch {
            detail: detail.into(),
        }
    }

    /// Create a range error for an integer literal outside its value space.
    pub fn out_of_range(datatype: impl Into<String>, value: impl Into<String>) -> Self {
        Self::IntegerOutOfRange {
            datatype: datatype.into(),
            value: value.into(),
        }
    }

    /// Create a type error for a lexical form its datatype cannot parse.
    pub fn invalid_lexical(datatype: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidLexical {
            datatype: datatype.into(),
            value: value.into(),
        }
    }
}

/// Result type alias using [`TaslError`].
pub type Result<T> = std::result::Result<T, TaslError>;

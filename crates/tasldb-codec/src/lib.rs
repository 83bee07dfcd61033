//! Streaming codec for the self-delimiting binary instance format.
//!
//! A whole instance is `varint(version)` followed by, for each class in
//! schema order, `varint(count)` and `count` repetitions of
//! `varint(idDelta) || value-bytes`. The first id in a class equals the
//! first delta; each subsequent id is `previous + 1 + delta`. Value bytes
//! are schema-directed: uris and variable-width literals are
//! length-prefixed, fixed-width literals occupy exactly their datatype's
//! width big-endian, products concatenate their components, coproducts
//! prefix the selected option index, references are bare id varints.
//!
//! The [`Decoder`] is a pull state machine over a chunk iterator; the
//! [`Encoder`] pushes fixed-size chunks into a caller-supplied sink. Neither
//! ever materializes a whole instance.

pub mod decoder;
pub mod encoder;

pub use decoder::{Decoder, Elements};
pub use encoder::Encoder;

use tasldb_types::varint::{encoding_length, MAX_SAFE_ID};

/// Wire format version emitted and accepted by this library.
pub const WIRE_VERSION: u64 = 1;

/// Default encoder chunk size in bytes.
pub const DEFAULT_CHUNK_SIZE: usize = 1024;

/// Smallest legal encoder chunk size: one maximal varint must fit.
pub const MIN_CHUNK_SIZE: usize = encoding_length(MAX_SAFE_ID);

//! Schema, type, value, and mapping ASTs for tasldb.
//!
//! This crate is the typed vocabulary the rest of the workspace speaks:
//! algebraic [`Type`]s and [`Value`]s, ordered [`Schema`]s, the mapping
//! expression language, the LEB128 varint primitives shared by the wire
//! formats, and the canonical schema blob codec.

pub mod blob;
pub mod datatype;
pub mod mapping;
pub mod schema;
pub mod value;
pub mod varint;

pub use blob::{decode_schema, encode_schema, BLOB_VERSION};
pub use datatype::{Datatype, RDF_JSON, XSD};
pub use mapping::{Expr, Map, Mapping, MatchCase, PathSegment, Term};
pub use schema::{Schema, Type};
pub use value::Value;
pub use varint::{encoding_length, MAX_SAFE_ID, MAX_VARINT_LEN};

//! Embedded, schema-typed database for tasl instances.
//!
//! A schema declares named classes, each with an algebraic type built from
//! uris, typed literals, products, coproducts, and references. Elements are
//! stored under their class in a relational layout derived from the type,
//! and whole instances stream in and out of a compact self-delimiting
//! binary format.
//!
//! ```
//! use tasldb::{Database, Datatype, Schema, Type, Value};
//!
//! let schema = Schema::new([(
//!     "http://example.com/note",
//!     Type::product([
//!         ("text", Type::Literal(Datatype::String)),
//!         ("starred", Type::Literal(Datatype::Boolean)),
//!     ]),
//! )])?;
//! let db = Database::create(None, schema)?;
//! let id = db.push(
//!     "http://example.com/note",
//!     &Value::product([
//!         ("text", Value::literal("hello")),
//!         ("starred", Value::literal("true")),
//!     ]),
//! )?;
//! assert!(db.has("http://example.com/note", id)?);
//! # Ok::<(), tasldb::TaslError>(())
//! ```

pub use tasldb_codec::{DEFAULT_CHUNK_SIZE, MIN_CHUNK_SIZE, WIRE_VERSION};
pub use tasldb_core::{Database, Element, Entries, OpenOptions, Values};
pub use tasldb_error::{ErrorKind, Result, TaslError};
pub use tasldb_types::{
    decode_schema, encode_schema, Datatype, Expr, Map, Mapping, MatchCase, PathSegment, Schema,
    Term, Type, Value,
};

//! Database core: binds the compiled layouts, codec, and shredder to the
//! embedded storage engine and owns transaction boundaries.

pub mod database;
mod eval;
mod export;
mod import;
mod migrate;

pub use database::{Database, Element, Entries, OpenOptions, Values};

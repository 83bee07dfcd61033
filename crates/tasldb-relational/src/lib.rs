//! Relational materialization of algebraic schemas.
//!
//! Compiles each class type to a normalized table layout whose columns
//! preserve type semantics, and converts values between three shapes: tree
//! values, flat rows of cells, and raw wire bytes.

pub mod assemble;
pub mod cell;
pub mod layout;
pub mod literal;
pub mod naming;
pub mod rowdata;
pub mod shred;

pub use assemble::assemble;
pub use cell::Cell;
pub use layout::{column_width, compile_schema, Column, ColumnKind, SqlType, TableLayout};
pub use naming::{column_name, table_name, ID_COLUMN};
pub use rowdata::{decode_row_bytes, encode_row_value};
pub use shred::shred;

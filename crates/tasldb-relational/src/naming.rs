//! Canonical path and class naming.
//!
//! Both mappings are injective across valid inputs and never collide with
//! the reserved `id` column, so DDL regenerated from the same schema matches
//! existing tables byte-for-byte.

/// Reserved primary-key column present in every class table.
pub const ID_COLUMN: &str = "id";

/// Column identifier for a structural path.
///
/// The empty path is `e`; the path `[i₁, …, iₙ]` is `e_i₁_…_iₙ`.
pub fn column_name(path: &[usize]) -> String {
    let mut name = String::from("e");
    for index in path {
        name.push('_');
        name.push_str(&index.to_string());
    }
    name
}

/// Table identifier for a class index: `c<k>`.
pub fn table_name(class_index: usize) -> String {
    format!("c{class_index}")
}

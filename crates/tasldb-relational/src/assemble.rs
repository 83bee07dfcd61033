//! Reassembly: flat rows back into tree values.

use tasldb_error::{Result, TaslError};
use tasldb_types::{Type, Value};

use crate::cell::Cell;
use crate::layout::{column_width, TableLayout};
use crate::literal::decode_literal_cell;

/// Reassemble a stored row into a value conforming to `ty`.
///
/// Inverse of [`shred`]: coproducts read their tag cell and descend only
/// into the selected arm, so the nulls in sibling arm columns are never
/// touched.
///
/// [`shred`]: crate::shred::shred
pub fn assemble(layout: &TableLayout, ty: &Type, row: &[Cell]) -> Result<Value> {
    if row.len() != layout.columns.len() {
        return Err(TaslError::malformed(format!(
            "row has {} cells, table {} has {} columns",
            row.len(),
            layout.table,
            layout.columns.len()
        )));
    }
    assemble_at(ty, row, 0)
}

fn assemble_at(ty: &Type, row: &[Cell], col: usize) -> Result<Value> {
    match ty {
        Type::Uri => match &row[col] {
            Cell::Text(s) => Ok(Value::Uri(s.clone())),
            cell => Err(TaslError::malformed(format!(
                "uri stored as {} cell",
                cell.class_name()
            ))),
        },
        Type::Literal(dt) => Ok(Value::Literal(decode_literal_cell(dt, &row[col])?)),
        Type::Product(components) => {
            let mut cursor = col;
            let mut entries = Vec::with_capacity(components.len());
            for (key, child_ty) in components {
                entries.push((key.clone(), assemble_at(child_ty, row, cursor)?));
                cursor += column_width(child_ty);
            }
            Ok(Value::Product(entries))
        }
        Type::Coproduct(options) => {
            let index = match &row[col] {
                Cell::Integer(tag) if *tag >= 0 && (*tag as usize) < options.len() => {
                    *tag as usize
                }
                cell => {
                    return Err(TaslError::malformed(format!(
                        "coproduct tag cell is {}",
                        cell.class_name()
                    )))
                }
            };
            let (key, arm_ty) = &options[index];
            let arm_col = col
                + 1
                + options[..index]
                    .iter()
                    .map(|(_, t)| column_width(t))
                    .sum::<usize>();
            Ok(Value::Coproduct {
                key: key.clone(),
                value: Box::new(assemble_at(arm_ty, row, arm_col)?),
            })
        }
        Type::Reference(_) => match &row[col] {
            Cell::Integer(id) if *id >= 0 => Ok(Value::Reference(*id as u64)),
            cell => Err(TaslError::malformed(format!(
                "reference stored as {} cell",
                cell.class_name()
            ))),
        },
    }
}

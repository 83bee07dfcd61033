//! Shredding: tree values into flat rows.

use tasldb_error::{Result, TaslError};
use tasldb_types::varint::MAX_SAFE_ID;
use tasldb_types::{Type, Value};

use crate::cell::Cell;
use crate::layout::{column_width, TableLayout};
use crate::literal::encode_literal_cell;

/// Shred a value conforming to `ty` into a row of the class's layout.
///
/// Every cell starts as `Null`, so columns belonging to non-selected
/// coproduct arms end up null without being visited.
pub fn shred(layout: &TableLayout, ty: &Type, value: &Value) -> Result<Vec<Cell>> {
    let mut row = vec![Cell::Null; layout.columns.len()];
    shred_into(ty, value, &mut row, 0)?;
    Ok(row)
}

fn shred_into(ty: &Type, value: &Value, row: &mut [Cell], col: usize) -> Result<()> {
    match (ty, value) {
        (Type::Uri, Value::Uri(s)) => {
            row[col] = Cell::Text(s.clone());
            Ok(())
        }
        (Type::Literal(dt), Value::Literal(lexical)) => {
            row[col] = encode_literal_cell(dt, lexical)?;
            Ok(())
        }
        (Type::Product(components), Value::Product(entries)) => {
            let mut cursor = col;
            for (key, child_ty) in components {
                let child = entries
                    .iter()
                    .find(|(k, _)| k == key)
                    .map(|(_, v)| v)
                    .ok_or_else(|| TaslError::MissingComponent { key: key.clone() })?;
                shred_into(child_ty, child, row, cursor)?;
                cursor += column_width(child_ty);
            }
            if let Some((key, _)) = entries
                .iter()
                .find(|(k, _)| components.iter().all(|(ck, _)| ck != k))
            {
                return Err(TaslError::UnknownComponent { key: key.clone() });
            }
            Ok(())
        }
        (Type::Coproduct(options), Value::Coproduct { key, value }) => {
            let (index, arm_ty) = ty
                .option(key)
                .ok_or_else(|| TaslError::UnknownOption { key: key.clone() })?;
            row[col] = Cell::Integer(index as i64);
            let arm_col = col
                + 1
                + options[..index]
                    .iter()
                    .map(|(_, t)| column_width(t))
                    .sum::<usize>();
            shred_into(arm_ty, value, row, arm_col)
        }
        (Type::Reference(_), Value::Reference(id)) => {
            if *id > MAX_SAFE_ID {
                return Err(TaslError::IdOutOfRange { id: *id });
            }
            row[col] = Cell::Integer(*id as i64);
            Ok(())
        }
        (ty, value) => Err(TaslError::kind_mismatch(ty.kind_name(), value.kind_name())),
    }
}

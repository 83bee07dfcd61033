//! Row cells to and from raw wire value bytes.
//!
//! `decode_row_bytes` parses one element's wire bytes straight into a row,
//! skipping the tree-value intermediate; `encode_row_value` writes a stored
//! row back out through the chunk encoder. Together with the boundary scan
//! in the codec these keep import and export row-shaped end to end.

use tasldb_codec::Encoder;
use tasldb_error::{Result, TaslError};
use tasldb_types::varint::read_varint;
use tasldb_types::{Datatype, Type};

use crate::cell::Cell;
use crate::layout::{column_width, TableLayout};
use crate::literal::{cbor_to_json, json_to_cbor};

/// Parse one element's raw value bytes into a row of the class's layout.
pub fn decode_row_bytes(layout: &TableLayout, ty: &Type, bytes: &[u8]) -> Result<Vec<Cell>> {
    let mut row = vec![Cell::Null; layout.columns.len()];
    let mut pos = 0usize;
    decode_into(ty, bytes, &mut pos, &mut row, 0)?;
    if pos != bytes.len() {
        return Err(TaslError::malformed("trailing bytes after value"));
    }
    Ok(row)
}

fn decode_into(
    ty: &Type,
    bytes: &[u8],
    pos: &mut usize,
    row: &mut [Cell],
    col: usize,
) -> Result<()> {
    match ty {
        Type::Uri => {
            let slice = take_prefixed(bytes, pos)?;
            let s = std::str::from_utf8(slice)
                .map_err(|_| TaslError::malformed("uri is not utf-8"))?;
            row[col] = Cell::Text(s.to_owned());
            Ok(())
        }
        Type::Literal(dt) => {
            row[col] = decode_literal_bytes(dt, bytes, pos)?;
            Ok(())
        }
        Type::Product(components) => {
            let mut cursor = col;
            for (_, child) in components {
                decode_into(child, bytes, pos, row, cursor)?;
                cursor += column_width(child);
            }
            Ok(())
        }
        Type::Coproduct(options) => {
            let index = take_varint(bytes, pos)?;
            let (_, arm_ty) =
                options
                    .get(index as usize)
                    .ok_or(TaslError::OptionIndexOutOfRange {
                        index,
                        arity: options.len(),
                    })?;
            row[col] = Cell::Integer(index as i64);
            let arm_col = col
                + 1
                + options[..index as usize]
                    .iter()
                    .map(|(_, t)| column_width(t))
                    .sum::<usize>();
            decode_into(arm_ty, bytes, pos, row, arm_col)
        }
        Type::Reference(_) => {
            let id = take_varint(bytes, pos)?;
            row[col] = Cell::Integer(id as i64);
            Ok(())
        }
    }
}

fn take_varint(bytes: &[u8], pos: &mut usize) -> Result<u64> {
    let (value, consumed) =
        read_varint(&bytes[*pos..]).ok_or_else(|| TaslError::malformed("truncated varint"))?;
    *pos += consumed;
    Ok(value)
}

fn take_fixed<'a>(bytes: &'a [u8], pos: &mut usize, width: usize) -> Result<&'a [u8]> {
    let end = pos
        .checked_add(width)
        .filter(|&e| e <= bytes.len())
        .ok_or_else(|| TaslError::malformed("truncated fixed-width literal"))?;
    let slice = &bytes[*pos..end];
    *pos = end;
    Ok(slice)
}

fn take_array<const N: usize>(bytes: &[u8], pos: &mut usize) -> Result<[u8; N]> {
    let mut out = [0u8; N];
    out.copy_from_slice(take_fixed(bytes, pos, N)?);
    Ok(out)
}

fn take_prefixed<'a>(bytes: &'a [u8], pos: &mut usize) -> Result<&'a [u8]> {
    let len = take_varint(bytes, pos)? as usize;
    let end = pos
        .checked_add(len)
        .filter(|&e| e <= bytes.len())
        .ok_or_else(|| TaslError::malformed("truncated variable-width value"))?;
    let slice = &bytes[*pos..end];
    *pos = end;
    Ok(slice)
}

fn decode_literal_bytes(dt: &Datatype, bytes: &[u8], pos: &mut usize) -> Result<Cell> {
    match dt {
        Datatype::Boolean => match take_fixed(bytes, pos, 1)?[0] {
            0 => Ok(Cell::Integer(0)),
            1 => Ok(Cell::Integer(1)),
            other => Err(TaslError::malformed(format!("boolean byte {other}"))),
        },
        Datatype::Byte => {
            let b = take_fixed(bytes, pos, 1)?[0];
            Ok(Cell::Integer(i64::from(b as i8)))
        }
        Datatype::UnsignedByte => {
            let b = take_fixed(bytes, pos, 1)?[0];
            Ok(Cell::Integer(i64::from(b)))
        }
        Datatype::Short => {
            let raw = take_array::<2>(bytes, pos)?;
            Ok(Cell::Integer(i64::from(i16::from_be_bytes(raw))))
        }
        Datatype::UnsignedShort => {
            let raw = take_array::<2>(bytes, pos)?;
            Ok(Cell::Integer(i64::from(u16::from_be_bytes(raw))))
        }
        Datatype::Int => {
            let raw = take_array::<4>(bytes, pos)?;
            Ok(Cell::Integer(i64::from(i32::from_be_bytes(raw))))
        }
        Datatype::UnsignedInt => {
            let raw = take_array::<4>(bytes, pos)?;
            Ok(Cell::Integer(i64::from(u32::from_be_bytes(raw))))
        }
        Datatype::Long => {
            let raw = take_array::<8>(bytes, pos)?;
            Ok(Cell::Integer(i64::from_be_bytes(raw)))
        }
        Datatype::UnsignedLong => {
            let value = u64::from_be_bytes(take_array::<8>(bytes, pos)?);
            i64::try_from(value)
                .map(Cell::Integer)
                .map_err(|_| TaslError::out_of_range(dt.iri(), value.to_string()))
        }
        Datatype::Float => {
            let raw = take_array::<4>(bytes, pos)?;
            Ok(Cell::Real(f64::from(f32::from_be_bytes(raw))))
        }
        Datatype::Double => {
            let raw = take_array::<8>(bytes, pos)?;
            Ok(Cell::Real(f64::from_be_bytes(raw)))
        }
        Datatype::HexBinary => Ok(Cell::Blob(take_prefixed(bytes, pos)?.to_vec())),
        Datatype::Json => {
            let cbor = take_prefixed(bytes, pos)?;
            Ok(Cell::Text(cbor_to_json(cbor)?))
        }
        Datatype::String | Datatype::Other(_) => {
            let slice = take_prefixed(bytes, pos)?;
            let s = std::str::from_utf8(slice)
                .map_err(|_| TaslError::malformed("literal is not utf-8"))?;
            Ok(Cell::Text(s.to_owned()))
        }
    }
}

/// Write one stored row's value bytes through the chunk encoder.
pub fn encode_row_value<F>(
    encoder: &mut Encoder<F>,
    ty: &Type,
    row: &[Cell],
) -> Result<()>
where
    F: FnMut(Vec<u8>) -> Result<()>,
{
    encode_at(encoder, ty, row, 0)
}

fn encode_at<F>(encoder: &mut Encoder<F>, ty: &Type, row: &[Cell], col: usize) -> Result<()>
where
    F: FnMut(Vec<u8>) -> Result<()>,
{
    match ty {
        Type::Uri => match &row[col] {
            Cell::Text(s) => {
                encoder.write_varint(s.len() as u64)?;
                encoder.write_bytes(s.as_bytes())
            }
            cell => Err(stored_as("uri", cell)),
        },
        Type::Literal(dt) => encode_literal_bytes(encoder, dt, &row[col]),
        Type::Product(components) => {
            let mut cursor = col;
            for (_, child) in components {
                encode_at(encoder, child, row, cursor)?;
                cursor += column_width(child);
            }
            Ok(())
        }
        Type::Coproduct(options) => {
            let index = match &row[col] {
                Cell::Integer(tag) if *tag >= 0 && (*tag as usize) < options.len() => {
                    *tag as usize
                }
                cell => return Err(stored_as("coproduct tag", cell)),
            };
            encoder.write_varint(index as u64)?;
            let arm_col = col
                + 1
                + options[..index]
                    .iter()
                    .map(|(_, t)| column_width(t))
                    .sum::<usize>();
            encode_at(encoder, &options[index].1, row, arm_col)
        }
        Type::Reference(_) => match &row[col] {
            Cell::Integer(id) if *id >= 0 => encoder.write_varint(*id as u64),
            cell => Err(stored_as("reference", cell)),
        },
    }
}

fn stored_as(what: &str, cell: &Cell) -> TaslError {
    TaslError::malformed(format!("{what} stored as {} cell", cell.class_name()))
}

fn encode_literal_bytes<F>(encoder: &mut Encoder<F>, dt: &Datatype, cell: &Cell) -> Result<()>
where
    F: FnMut(Vec<u8>) -> Result<()>,
{
    match (dt, cell) {
        (Datatype::Boolean, Cell::Integer(v @ (0 | 1))) => encoder.write_bytes(&[*v as u8]),
        (Datatype::Byte, Cell::Integer(v)) => {
            let b = i8::try_from(*v).map_err(|_| range(dt, *v))?;
            encoder.write_bytes(&b.to_be_bytes())
        }
        (Datatype::UnsignedByte, Cell::Integer(v)) => {
            let b = u8::try_from(*v).map_err(|_| range(dt, *v))?;
            encoder.write_bytes(&b.to_be_bytes())
        }
        (Datatype::Short, Cell::Integer(v)) => {
            let b = i16::try_from(*v).map_err(|_| range(dt, *v))?;
            encoder.write_bytes(&b.to_be_bytes())
        }
        (Datatype::UnsignedShort, Cell::Integer(v)) => {
            let b = u16::try_from(*v).map_err(|_| range(dt, *v))?;
            encoder.write_bytes(&b.to_be_bytes())
        }
        (Datatype::Int, Cell::Integer(v)) => {
            let b = i32::try_from(*v).map_err(|_| range(dt, *v))?;
            encoder.write_bytes(&b.to_be_bytes())
        }
        (Datatype::UnsignedInt, Cell::Integer(v)) => {
            let b = u32::try_from(*v).map_err(|_| range(dt, *v))?;
            encoder.write_bytes(&b.to_be_bytes())
        }
        (Datatype::Long, Cell::Integer(v)) => encoder.write_bytes(&v.to_be_bytes()),
        (Datatype::UnsignedLong, Cell::Integer(v)) => {
            let b = u64::try_from(*v).map_err(|_| range(dt, *v))?;
            encoder.write_bytes(&b.to_be_bytes())
        }
        (Datatype::Float, Cell::Real(v)) => encoder.write_bytes(&(*v as f32).to_be_bytes()),
        (Datatype::Double, Cell::Real(v)) => encoder.write_bytes(&v.to_be_bytes()),
        (Datatype::HexBinary, Cell::Blob(bytes)) => {
            encoder.write_varint(bytes.len() as u64)?;
            encoder.write_bytes(bytes)
        }
        (Datatype::Json, Cell::Text(json)) => {
            let cbor = json_to_cbor(json)?;
            encoder.write_varint(cbor.len() as u64)?;
            encoder.write_bytes(&cbor)
        }
        (Datatype::String | Datatype::Other(_), Cell::Text(s)) => {
            encoder.write_varint(s.len() as u64)?;
            encoder.write_bytes(s.as_bytes())
        }
        (dt, cell) => Err(stored_as(&dt.iri(), cell)),
    }
}

fn range(dt: &Datatype, value: i64) -> TaslError {
    TaslError::out_of_range(dt.iri(), value.to_string())
}

//! Canonical schema blob encoding.
//!
//! The persisted form of a schema, stored at a well-known row of the
//! `schemas` table. The encoding is deterministic: encoding a decoded blob
//! reproduces the original bytes exactly, which is what lets regenerated DDL
//! and persisted metadata be compared byte-for-byte.
//!
//! ```text
//! blob    := varint(BLOB_VERSION) varint(classCount) class*
//! class   := string(key) type
//! type    := 0x00                            uri
//!          | 0x01 string(datatypeIri)        literal
//!          | 0x02 varint(n) (string type)*   product
//!          | 0x03 varint(n) (string type)*   coproduct
//!          | 0x04 varint(classIndex)         reference
//! string  := varint(byteLen) utf8-bytes
//! ```
//!
//! References are encoded positionally (by class index) so the blob never
//! embeds a class key twice.

use tasldb_error::{Result, TaslError};

use crate::datatype::Datatype;
use crate::schema::{Schema, Type};
use crate::varint::{read_varint, write_varint};

/// Version tag leading every schema blob.
pub const BLOB_VERSION: u64 = 1;

const TAG_URI: u8 = 0x00;
const TAG_LITERAL: u8 = 0x01;
const TAG_PRODUCT: u8 = 0x02;
const TAG_COPRODUCT: u8 = 0x03;
const TAG_REFERENCE: u8 = 0x04;

/// Encode a schema to its canonical blob.
pub fn encode_schema(schema: &Schema) -> Vec<u8> {
    let mut buf = Vec::new();
    write_varint(&mut buf, BLOB_VERSION);
    write_varint(&mut buf, schema.len() as u64);
    for (key, ty) in schema.classes() {
        write_string(&mut buf, key);
        write_type(&mut buf, schema, ty);
    }
    buf
}

fn write_string(buf: &mut Vec<u8>, s: &str) {
    write_varint(buf, s.len() as u64);
    buf.extend_from_slice(s.as_bytes());
}

fn write_type(buf: &mut Vec<u8>, schema: &Schema, ty: &Type) {
    match ty {
        Type::Uri => buf.push(TAG_URI),
        Type::Literal(dt) => {
            buf.push(TAG_LITERAL);
            write_string(buf, &dt.iri());
        }
        Type::Product(entries) => {
            buf.push(TAG_PRODUCT);
            write_entries(buf, schema, entries);
        }
        Type::Coproduct(entries) => {
            buf.push(TAG_COPRODUCT);
            write_entries(buf, schema, entries);
        }
        Type::Reference(key) => {
            buf.push(TAG_REFERENCE);
            // Schema construction validated the target, so the index exists.
            let index = schema.index_of(key).unwrap_or_default();
            write_varint(buf, index as u64);
        }
    }
}

fn write_entries(buf: &mut Vec<u8>, schema: &Schema, entries: &[(String, Type)]) {
    write_varint(buf, entries.len() as u64);
    for (key, child) in entries {
        write_string(buf, key);
        write_type(buf, schema, child);
    }
}

/// Decode a schema blob produced by [`encode_schema`].
pub fn decode_schema(blob: &[u8]) -> Result<Schema> {
    let mut r = Reader { buf: blob, pos: 0 };
    let version = r.varint()?;
    if version != BLOB_VERSION {
        return Err(TaslError::corrupt_schema(format!(
            "unknown blob version {version}"
        )));
    }
    let count = r.varint()? as usize;
    let mut keys = Vec::with_capacity(count);
    let mut raw_types = Vec::with_capacity(count);
    for _ in 0..count {
        keys.push(r.string()?);
        raw_types.push(r.raw_type()?);
    }
    if r.pos != blob.len() {
        return Err(TaslError::corrupt_schema("trailing bytes".to_owned()));
    }
    let classes: Vec<(String, Type)> = keys
        .iter()
        .cloned()
        .zip(raw_types.iter())
        .map(|(key, raw)| Ok((key, resolve(raw, &keys)?)))
        .collect::<Result<_>>()?;
    Schema::new(classes)
}

/// Decoded type with positional references, prior to key resolution.
enum RawType {
    Uri,
    Literal(Datatype),
    Product(Vec<(String, RawType)>),
    Coproduct(Vec<(String, RawType)>),
    Reference(usize),
}

fn resolve(raw: &RawType, keys: &[String]) -> Result<Type> {
    Ok(match raw {
        RawType::Uri => Type::Uri,
        RawType::Literal(dt) => Type::Literal(dt.clone()),
        RawType::Product(entries) => Type::Product(resolve_entries(entries, keys)?),
        RawType::Coproduct(entries) => Type::Coproduct(resolve_entries(entries, keys)?),
        RawType::Reference(index) => {
            let key = keys.get(*index).ok_or_else(|| {
                TaslError::corrupt_schema(format!("reference to class index {index}"))
            })?;
            Type::Reference(key.clone())
        }
    })
}

fn resolve_entries(entries: &[(String, RawType)], keys: &[String]) -> Result<Vec<(String, Type)>> {
    entries
        .iter()
        .map(|(k, raw)| Ok((k.clone(), resolve(raw, keys)?)))
        .collect()
}

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl Reader<'_> {
    fn varint(&mut self) -> Result<u64> {
        let (value, consumed) = read_varint(&self.buf[self.pos..])
            .ok_or_else(|| TaslError::corrupt_schema("truncated varint".to_owned()))?;
        self.pos += consumed;
        Ok(value)
    }

    fn byte(&mut self) -> Result<u8> {
        let b = *self
            .buf
            .get(self.pos)
            .ok_or_else(|| TaslError::corrupt_schema("unexpected end of blob".to_owned()))?;
        self.pos += 1;
        Ok(b)
    }

    fn string(&mut self) -> Result<String> {
        let len = self.varint()? as usize;
        let end = self.pos.checked_add(len).filter(|&e| e <= self.buf.len());
        let end =
            end.ok_or_else(|| TaslError::corrupt_schema("truncated string".to_owned()))?;
        let s = std::str::from_utf8(&self.buf[self.pos..end])
            .map_err(|_| TaslError::corrupt_schema("invalid utf-8".to_owned()))?
            .to_owned();
        self.pos = end;
        Ok(s)
    }

    fn raw_type(&mut self) -> Result<RawType> {
        match self.byte()? {
            TAG_URI => Ok(RawType::Uri),
            TAG_LITERAL => {
                let iri = self.string()?;
                Ok(RawType::Literal(Datatype::from_iri(&iri)))
            }
            TAG_PRODUCT => Ok(RawType::Product(self.raw_entries()?)),
            TAG_COPRODUCT => Ok(RawType::Coproduct(self.raw_entries()?)),
            TAG_REFERENCE => Ok(RawType::Reference(self.varint()? as usize)),
            tag => Err(TaslError::corrupt_schema(format!("unknown type tag {tag:#04x}"))),
        }
    }

    fn raw_entries(&mut self) -> Result<Vec<(String, RawType)>> {
        let count = self.varint()? as usize;
        let mut entries = Vec::with_capacity(count.min(64));
        for _ in 0..count {
            let key = self.string()?;
            let ty = self.raw_type()?;
            entries.push((key, ty));
        }
        Ok(entries)
    }
}

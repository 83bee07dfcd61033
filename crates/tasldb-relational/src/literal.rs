//! Literal lexical forms and their storage representations.
//!
//! Shredding turns canonical lexical strings into typed cells; reassembly
//! converts stored cells back to canonical lexical form. Canonical choices:
//! booleans are `true`/`false`, floats use the shortest round-trip decimal
//! with `NaN`/`INF`/`-INF` specials, hexBinary is uppercase, and `rdf:JSON`
//! is the compact serialization with sorted object keys.

use tasldb_error::{Result, TaslError};
use tasldb_types::Datatype;

use crate::cell::Cell;

/// Encode a literal's lexical form into its storage cell.
pub fn encode_literal_cell(dt: &Datatype, lexical: &str) -> Result<Cell> {
    match dt {
        Datatype::Boolean => match lexical {
            "true" | "1" => Ok(Cell::Integer(1)),
            "false" | "0" => Ok(Cell::Integer(0)),
            _ => Err(TaslError::invalid_lexical(dt.iri(), lexical)),
        },
        Datatype::Byte
        | Datatype::UnsignedByte
        | Datatype::Short
        | Datatype::UnsignedShort
        | Datatype::Int
        | Datatype::UnsignedInt
        | Datatype::Long
        | Datatype::UnsignedLong => {
            let value: i128 = lexical
                .parse()
                .map_err(|_| TaslError::invalid_lexical(dt.iri(), lexical))?;
            let (min, max) = dt.integer_bounds().unwrap_or((i64::MIN as i128, i64::MAX as i128));
            if value < min || value > max {
                return Err(TaslError::out_of_range(dt.iri(), lexical));
            }
            Ok(Cell::Integer(value as i64))
        }
        Datatype::Float => {
            let value = parse_float::<f32>(lexical)
                .ok_or_else(|| TaslError::invalid_lexical(dt.iri(), lexical))?;
            Ok(Cell::Real(f64::from(value)))
        }
        Datatype::Double => {
            let value = parse_float::<f64>(lexical)
                .ok_or_else(|| TaslError::invalid_lexical(dt.iri(), lexical))?;
            Ok(Cell::Real(value))
        }
        Datatype::HexBinary => Ok(Cell::Blob(decode_hex(lexical).ok_or_else(|| {
            TaslError::invalid_lexical(dt.iri(), lexical)
        })?)),
        Datatype::Json => Ok(Cell::Text(canonical_json(lexical)?)),
        Datatype::String | Datatype::Other(_) => Ok(Cell::Text(lexical.to_owned())),
    }
}

/// Decode a storage cell back to its canonical lexical form.
pub fn decode_literal_cell(dt: &Datatype, cell: &Cell) -> Result<String> {
    match (dt, cell) {
        (Datatype::Boolean, Cell::Integer(0)) => Ok("false".to_owned()),
        (Datatype::Boolean, Cell::Integer(1)) => Ok("true".to_owned()),
        (Datatype::Boolean, Cell::Integer(other)) => Err(TaslError::malformed(format!(
            "boolean cell holds {other}"
        ))),
        (_, Cell::Integer(value)) if dt.is_integer() => Ok(value.to_string()),
        (Datatype::Float, Cell::Real(value)) => Ok(format_float_f32(*value as f32)),
        (Datatype::Double, Cell::Real(value)) => Ok(format_float_f64(*value)),
        (Datatype::HexBinary, Cell::Blob(bytes)) => Ok(encode_hex(bytes)),
        (Datatype::Json | Datatype::String | Datatype::Other(_), Cell::Text(text)) => {
            Ok(text.clone())
        }
        (dt, cell) => Err(TaslError::malformed(format!(
            "{} literal stored as {} cell",
            dt.iri(),
            cell.class_name()
        ))),
    }
}

fn parse_float<T: std::str::FromStr>(lexical: &str) -> Option<T> {
    // XSD spells the specials NaN / INF / -INF; Rust's parser spells them
    // case-insensitively as nan / inf, so map before parsing.
    let mapped = match lexical {
        "INF" | "+INF" => "inf",
        "-INF" => "-inf",
        other => other,
    };
    mapped.parse().ok()
}

pub(crate) fn format_float_f32(value: f32) -> String {
    if value.is_nan() {
        "NaN".to_owned()
    } else if value.is_infinite() {
        if value > 0.0 { "INF".to_owned() } else { "-INF".to_owned() }
    } else {
        value.to_string()
    }
}

pub(crate) fn format_float_f64(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_owned()
    } else if value.is_infinite() {
        if value > 0.0 { "INF".to_owned() } else { "-INF".to_owned() }
    } else {
        value.to_string()
    }
}

/// Uppercase canonical hex encoding.
pub fn encode_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push_str(&format!("{byte:02X}"));
    }
    out
}

/// Decode a hex string, accepting either case. `None` on malformed input.
pub fn decode_hex(lexical: &str) -> Option<Vec<u8>> {
    if lexical.len() % 2 != 0 {
        return None;
    }
    lexical
        .as_bytes()
        .chunks(2)
        .map(|pair| {
            let s = std::str::from_utf8(pair).ok()?;
            u8::from_str_radix(s, 16).ok()
        })
        .collect()
}

/// Re-serialize a JSON document in canonical form (sorted keys, compact).
pub fn canonical_json(lexical: &str) -> Result<String> {
    let value: serde_json::Value = serde_json::from_str(lexical)
        .map_err(|_| TaslError::invalid_lexical(tasldb_types::RDF_JSON, lexical))?;
    serde_json::to_string(&value).map_err(|e| TaslError::malformed(format!("json: {e}")))
}

/// Encode a JSON document as canonical CBOR for the wire.
pub fn json_to_cbor(lexical: &str) -> Result<Vec<u8>> {
    let value: serde_json::Value = serde_json::from_str(lexical)
        .map_err(|_| TaslError::invalid_lexical(tasldb_types::RDF_JSON, lexical))?;
    serde_ipld_dagcbor::to_vec(&value).map_err(|e| TaslError::malformed(format!("cbor: {e}")))
}

/// Decode canonical CBOR back to the stored JSON serialization.
pub fn cbor_to_json(bytes: &[u8]) -> Result<String> {
    let value: serde_json::Value = serde_ipld_dagcbor::from_slice(bytes)
        .map_err(|e| TaslError::malformed(format!("cbor: {e}")))?;
    serde_json::to_string(&value).map_err(|e| TaslError::malformed(format!("json: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boolean_cells() {
        assert_eq!(
            encode_literal_cell(&Datatype::Boolean, "true").unwrap(),
            Cell::Integer(1)
        );
        assert_eq!(
            encode_literal_cell(&Datatype::Boolean, "false").unwrap(),
            Cell::Integer(0)
        );
        assert!(encode_literal_cell(&Datatype::Boolean, "maybe").is_err());
        assert_eq!(
            decode_literal_cell(&Datatype::Boolean, &Cell::Integer(1)).unwrap(),
            "true"
        );
    }

    #[test]
    fn integer_range_checks() {
        assert_eq!(
            encode_literal_cell(&Datatype::UnsignedByte, "255").unwrap(),
            Cell::Integer(255)
        );
        let err = encode_literal_cell(&Datatype::UnsignedByte, "256").unwrap_err();
        assert!(matches!(err, TaslError::IntegerOutOfRange { .. }));
        let err = encode_literal_cell(&Datatype::Byte, "-129").unwrap_err();
        assert!(matches!(err, TaslError::IntegerOutOfRange { .. }));
        // unsignedLong is capped at the INTEGER cell maximum, never truncated.
        let err =
            encode_literal_cell(&Datatype::UnsignedLong, "9223372036854775808").unwrap_err();
        assert!(matches!(err, TaslError::IntegerOutOfRange { .. }));
    }

    #[test]
    fn integer_lexical_round_trip() {
        for (dt, lexical) in [
            (Datatype::Byte, "-128"),
            (Datatype::Short, "32767"),
            (Datatype::Int, "-2147483648"),
            (Datatype::Long, "9223372036854775807"),
            (Datatype::UnsignedLong, "18446744073709551"),
        ] {
            let cell = encode_literal_cell(&dt, lexical).unwrap();
            assert_eq!(decode_literal_cell(&dt, &cell).unwrap(), lexical);
        }
    }

    #[test]
    fn float_specials() {
        for lexical in ["NaN", "INF", "-INF"] {
            let cell = encode_literal_cell(&Datatype::Double, lexical).unwrap();
            assert_eq!(decode_literal_cell(&Datatype::Double, &cell).unwrap(), lexical);
            let cell = encode_literal_cell(&Datatype::Float, lexical).unwrap();
            assert_eq!(decode_literal_cell(&Datatype::Float, &cell).unwrap(), lexical);
        }
    }

    #[test]
    fn float_round_trip() {
        let cell = encode_literal_cell(&Datatype::Double, "3.25").unwrap();
        assert_eq!(cell, Cell::Real(3.25));
        assert_eq!(decode_literal_cell(&Datatype::Double, &cell).unwrap(), "3.25");
        let cell = encode_literal_cell(&Datatype::Float, "0.5").unwrap();
        assert_eq!(decode_literal_cell(&Datatype::Float, &cell).unwrap(), "0.5");
    }

    #[test]
    fn hex_canonical_uppercase() {
        let cell = encode_literal_cell(&Datatype::HexBinary, "deadBEEF").unwrap();
        assert_eq!(cell, Cell::Blob(vec![0xDE, 0xAD, 0xBE, 0xEF]));
        assert_eq!(
            decode_literal_cell(&Datatype::HexBinary, &cell).unwrap(),
            "DEADBEEF"
        );
        assert!(encode_literal_cell(&Datatype::HexBinary, "abc").is_err());
        assert!(encode_literal_cell(&Datatype::HexBinary, "zz").is_err());
    }

    #[test]
    fn json_canonicalization() {
        let cell = encode_literal_cell(&Datatype::Json, r#"{"b": 1, "a": [true, null]}"#).unwrap();
        assert_eq!(cell, Cell::Text(r#"{"a":[true,null],"b":1}"#.to_owned()));
        assert!(encode_literal_cell(&Datatype::Json, "{oops").is_err());
    }

    #[test]
    fn json_cbor_round_trip() {
        let canonical = r#"{"a":[1,2.5,"x"],"b":null}"#;
        let cbor = json_to_cbor(canonical).unwrap();
        assert_eq!(cbor_to_json(&cbor).unwrap(), canonical);
    }

    #[test]
    fn mismatched_cell_class_is_malformed() {
        let err = decode_literal_cell(&Datatype::Boolean, &Cell::Text("true".into())).unwrap_err();
        assert!(matches!(err, TaslError::MalformedValue { .. }));
        let err = decode_literal_cell(&Datatype::Double, &Cell::Null).unwrap_err();
        assert!(matches!(err, TaslError::MalformedValue { .. }));
    }
}

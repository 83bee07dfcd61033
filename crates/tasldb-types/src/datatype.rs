//! The closed set of literal datatypes.
//!
//! tasl literal types carry an XSD or RDF datatype IRI. A fixed subset has a
//! fixed-width binary representation on the wire; everything else is
//! variable-width. Datatypes outside the known set are carried verbatim and
//! treated as UTF-8 strings.

use std::fmt;

/// XSD namespace prefix for the built-in datatypes.
pub const XSD: &str = "http://www.w3.org/2001/XMLSchema#";

/// IRI of the `rdf:JSON` datatype.
pub const RDF_JSON: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#JSON";

/// A literal datatype, identified by its IRI.
#[derive(Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Datatype {
    /// `xsd:boolean`, one byte on the wire.
    Boolean,
    /// `xsd:byte`, signed 8-bit.
    Byte,
    /// `xsd:unsignedByte`, unsigned 8-bit.
    UnsignedByte,
    /// `xsd:short`, signed 16-bit big-endian.
    Short,
    /// `xsd:unsignedShort`, unsigned 16-bit big-endian.
    UnsignedShort,
    /// `xsd:int`, signed 32-bit big-endian.
    Int,
    /// `xsd:unsignedInt`, unsigned 32-bit big-endian.
    UnsignedInt,
    /// `xsd:long`, signed 64-bit big-endian.
    Long,
    /// `xsd:unsignedLong`, unsigned 64-bit big-endian.
    UnsignedLong,
    /// `xsd:float`, IEEE 754 single precision, big-endian.
    Float,
    /// `xsd:double`, IEEE 754 double precision, big-endian.
    Double,
    /// `xsd:hexBinary`, variable-width binary.
    HexBinary,
    /// `xsd:string`, variable-width UTF-8.
    String,
    /// `rdf:JSON`, serialized as canonical CBOR on the wire.
    Json,
    /// Any other datatype IRI, treated as UTF-8 string content.
    Other(std::string::String),
}

impl Datatype {
    /// Resolve a datatype IRI to its variant.
    pub fn from_iri(iri: &str) -> Self {
        if iri == RDF_JSON {
            return Self::Json;
        }
        match iri.strip_prefix(XSD) {
            Some("boolean") => Self::Boolean,
            Some("byte") => Self::Byte,
            Some("unsignedByte") => Self::UnsignedByte,
            Some("short") => Self::Short,
            Some("unsignedShort") => Self::UnsignedShort,
            Some("int") => Self::Int,
            Some("unsignedInt") => Self::UnsignedInt,
            Some("long") => Self::Long,
            Some("unsignedLong") => Self::UnsignedLong,
            Some("float") => Self::Float,
            Some("double") => Self::Double,
            Some("hexBinary") => Self::HexBinary,
            Some("string") => Self::String,
            _ => Self::Other(iri.to_owned()),
        }
    }

    /// The datatype's IRI.
    pub fn iri(&self) -> std::string::String {
        match self {
            Self::Boolean => format!("{XSD}boolean"),
            Self::Byte => format!("{XSD}byte"),
            Self::UnsignedByte => format!("{XSD}unsignedByte"),
            Self::Short => format!("{XSD}short"),
            Self::UnsignedShort => format!("{XSD}unsignedShort"),
            Self::Int => format!("{XSD}int"),
            Self::UnsignedInt => format!("{XSD}unsignedInt"),
            Self::Long => format!("{XSD}long"),
            Self::UnsignedLong => format!("{XSD}unsignedLong"),
            Self::Float => format!("{XSD}float"),
            Self::Double => format!("{XSD}double"),
            Self::HexBinary => format!("{XSD}hexBinary"),
            Self::String => format!("{XSD}string"),
            Self::Json => RDF_JSON.to_owned(),
            Self::Other(iri) => iri.clone(),
        }
    }

    /// Wire width in bytes for fixed-width datatypes, `None` otherwise.
    pub const fn fixed_width(&self) -> Option<usize> {
        match self {
            Self::Boolean | Self::Byte | Self::UnsignedByte => Some(1),
            Self::Short | Self::UnsignedShort => Some(2),
            Self::Int | Self::UnsignedInt | Self::Float => Some(4),
            Self::Long | Self::UnsignedLong | Self::Double => Some(8),
            Self::HexBinary | Self::String | Self::Json | Self::Other(_) => None,
        }
    }

    /// Inclusive value bounds for the integer datatypes, `None` otherwise.
    pub const fn integer_bounds(&self) -> Option<(i128, i128)> {
        match self {
            Self::Byte => Some((i8::MIN as i128, i8::MAX as i128)),
            Self::UnsignedByte => Some((0, u8::MAX as i128)),
            Self::Short => Some((i16::MIN as i128, i16::MAX as i128)),
            Self::UnsignedShort => Some((0, u16::MAX as i128)),
            Self::Int => Some((i32::MIN as i128, i32::MAX as i128)),
            Self::UnsignedInt => Some((0, u32::MAX as i128)),
            Self::Long => Some((i64::MIN as i128, i64::MAX as i128)),
            // Capped at i64::MAX by the INTEGER cell representation.
            Self::UnsignedLong => Some((0, i64::MAX as i128)),
            _ => None,
        }
    }

    /// True for the integer datatypes (boolean excluded).
    pub const fn is_integer(&self) -> bool {
        self.integer_bounds().is_some()
    }
}

impl fmt::Display for Datatype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.iri())
    }
}

//! Streaming import: chunk stream in, populated database out.

use std::path::Path;

use tracing::{debug, info};

use tasldb_codec::{Decoder, WIRE_VERSION};
use tasldb_error::{Result, TaslError};
use tasldb_relational::decode_row_bytes;
use tasldb_types::Schema;

use crate::database::Database;

impl Database {
    /// Create a fresh database at `path` with `schema` and populate it from
    /// an encoded instance, consumed chunk by chunk.
    ///
    /// Foreign-key checks are deferred to the import's commit, so classes
    /// can reference classes that appear later in the stream; a dangling
    /// reference fails the commit and rolls every row back. A failed import
    /// leaves a partial file the caller should discard.
    pub fn import<I>(path: Option<&Path>, schema: Schema, chunks: I) -> Result<Self>
    where
        I: IntoIterator<Item = Result<Vec<u8>>>,
    {
        let db = Self::create(path, schema)?;
        db.import_stream(chunks.into_iter())?;
        Ok(db)
    }

    fn import_stream<I>(&self, chunks: I) -> Result<()>
    where
        I: Iterator<Item = Result<Vec<u8>>>,
    {
        let mut decoder = Decoder::new(chunks);
        let version = decoder.decode_varint()?;
        if version != WIRE_VERSION {
            return Err(TaslError::UnsupportedVersion {
                found: version,
                expected: WIRE_VERSION,
            });
        }
        let tx = self.conn.unchecked_transaction()?;
        tx.pragma_update(None, "defer_foreign_keys", true)?;
        for (index, (key, ty)) in self.schema().classes().enumerate() {
            let layout = &self.layouts[index];
            let mut imported = 0u64;
            let mut elements = decoder.elements(ty)?;
            while let Some(element) = elements.next() {
                let (id, bytes) = element?;
                let row = decode_row_bytes(layout, ty, &bytes)?;
                self.upsert_row(layout, id, &row)?;
                imported += 1;
            }
            debug!(class = key, elements = imported, "imported class");
        }
        decoder.end()?;
        tx.commit()?;
        info!(classes = self.schema().len(), "import complete");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tasldb_types::varint::write_varint;
    use tasldb_types::{Datatype, Type, Value};

    fn nano_schema() -> Schema {
        Schema::new([("http://example.com/foo", Type::Literal(Datatype::Boolean))]).unwrap()
    }

    /// version 1; one class with three booleans at ids 0, 1, 2.
    fn nano_instance() -> Vec<u8> {
        let mut bytes = Vec::new();
        write_varint(&mut bytes, WIRE_VERSION);
        write_varint(&mut bytes, 3);
        for (delta, value) in [(0u64, 1u8), (0, 0), (0, 1)] {
            write_varint(&mut bytes, delta);
            bytes.push(value);
        }
        bytes
    }

    fn as_chunks(bytes: &[u8], size: usize) -> Vec<Result<Vec<u8>>> {
        bytes.chunks(size).map(|c| Ok(c.to_vec())).collect()
    }

    #[test]
    fn imports_nano_instance() {
        let db =
            Database::import(None, nano_schema(), as_chunks(&nano_instance(), 3)).unwrap();
        let key = "http://example.com/foo";
        assert_eq!(db.count(key).unwrap(), 3);
        assert_eq!(db.get(key, 0).unwrap(), Value::literal("true"));
        assert_eq!(db.get(key, 1).unwrap(), Value::literal("false"));
        assert_eq!(db.get(key, 2).unwrap(), Value::literal("true"));
    }

    #[test]
    fn chunking_does_not_change_state() {
        let bytes = nano_instance();
        for size in 1..=bytes.len() {
            let db = Database::import(None, nano_schema(), as_chunks(&bytes, size)).unwrap();
            assert_eq!(db.count("http://example.com/foo").unwrap(), 3, "chunk {size}");
        }
    }

    #[test]
    fn version_mismatch_is_rejected() {
        let mut bytes = nano_instance();
        bytes[0] = 9;
        let err = Database::import(None, nano_schema(), as_chunks(&bytes, 4)).unwrap_err();
        assert!(matches!(
            err,
            TaslError::UnsupportedVersion { found: 9, expected: WIRE_VERSION }
        ));
    }

    #[test]
    fn trailing_data_is_rejected() {
        let mut bytes = nano_instance();
        bytes.push(0);
        let err = Database::import(None, nano_schema(), as_chunks(&bytes, 4)).unwrap_err();
        assert!(matches!(err, TaslError::StreamNotClosed));
    }

    #[test]
    fn truncated_stream_is_rejected() {
        let bytes = nano_instance();
        let err = Database::import(
            None,
            nano_schema(),
            as_chunks(&bytes[..bytes.len() - 1], 4),
        )
        .unwrap_err();
        assert!(matches!(err, TaslError::PrematureEnd));
    }

    #[test]
    fn upstream_error_aborts_import() {
        let chunks = vec![
            Ok(nano_instance()[..2].to_vec()),
            Err(TaslError::malformed("upstream failed")),
        ];
        let err = Database::import(None, nano_schema(), chunks).unwrap_err();
        assert!(matches!(err, TaslError::MalformedValue { .. }));
    }

    #[test]
    fn forward_references_import_cleanly() {
        // Class 0 references class 1, whose elements arrive later.
        let schema = Schema::new([
            (
                "http://example.com/a",
                Type::product([("to", Type::reference("http://example.com/b"))]),
            ),
            ("http://example.com/b", Type::unit()),
        ])
        .unwrap();
        let mut bytes = Vec::new();
        write_varint(&mut bytes, WIRE_VERSION);
        write_varint(&mut bytes, 1); // one element of a
        write_varint(&mut bytes, 0); // id 0
        write_varint(&mut bytes, 3); // reference to b/3
        write_varint(&mut bytes, 1); // one element of b
        write_varint(&mut bytes, 3); // id 3
        let db = Database::import(None, schema, as_chunks(&bytes, 2)).unwrap();
        assert_eq!(
            db.get("http://example.com/a", 0).unwrap(),
            Value::product([("to", Value::reference(3))])
        );
        assert!(db.has("http://example.com/b", 3).unwrap());
    }

    #[test]
    fn dangling_reference_fails_at_commit() {
        let schema = Schema::new([
            (
                "http://example.com/a",
                Type::product([("to", Type::reference("http://example.com/b"))]),
            ),
            ("http://example.com/b", Type::unit()),
        ])
        .unwrap();
        let mut bytes = Vec::new();
        write_varint(&mut bytes, WIRE_VERSION);
        write_varint(&mut bytes, 1); // one element of a
        write_varint(&mut bytes, 0); // id 0
        write_varint(&mut bytes, 3); // reference to b/3, never written
        write_varint(&mut bytes, 0); // b is empty
        let err = Database::import(None, schema, as_chunks(&bytes, 2)).unwrap_err();
        assert!(matches!(err, TaslError::Storage(_)));
    }
}

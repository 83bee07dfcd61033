//! Streaming export: database out, chunk stream in schema order.

use tracing::debug;

use tasldb_codec::{Encoder, DEFAULT_CHUNK_SIZE, WIRE_VERSION};
use tasldb_error::Result;
use tasldb_relational::{encode_row_value, Cell};

use crate::database::{sql_to_cell, Database};

impl Database {
    /// Encode the whole instance, pushing chunks of `chunk_size` bytes into
    /// `sink` as they fill.
    ///
    /// The entire export runs inside one read transaction, so concurrent
    /// handle reuse cannot tear the output. Ids are delta-encoded per class:
    /// the first delta is the first id, each later delta is
    /// `id − previous − 1`.
    pub fn export_into<F>(&self, chunk_size: usize, sink: F) -> Result<()>
    where
        F: FnMut(Vec<u8>) -> Result<()>,
    {
        let mut encoder = Encoder::new(chunk_size, sink)?;
        let tx = self.conn.unchecked_transaction()?;
        encoder.write_varint(WIRE_VERSION)?;
        for (index, (key, ty)) in self.schema().classes().enumerate() {
            let layout = &self.layouts[index];
            let width = layout.columns.len();
            let mut count_stmt = self.conn.prepare_cached(&layout.count_sql)?;
            let count: i64 = count_stmt.query_row([], |row| row.get(0))?;
            encoder.write_varint(count as u64)?;

            let mut scan = self.conn.prepare_cached(&layout.scan_sql)?;
            let mut rows = scan.query([])?;
            let mut prev: Option<u64> = None;
            while let Some(row) = rows.next()? {
                let id = row.get::<_, i64>(0)? as u64;
                let delta = match prev {
                    None => id,
                    Some(p) => id - p - 1,
                };
                encoder.write_varint(delta)?;
                let cells: Vec<Cell> = (0..width)
                    .map(|i| row.get(i + 1).map(sql_to_cell))
                    .collect::<rusqlite::Result<_>>()?;
                encode_row_value(&mut encoder, ty, &cells)?;
                prev = Some(id);
            }
            debug!(class = key, elements = count, "exported class");
        }
        encoder.close()?;
        tx.commit()?;
        Ok(())
    }

    /// Encode the whole instance into a list of chunks.
    pub fn export(&self, chunk_size: Option<usize>) -> Result<Vec<Vec<u8>>> {
        let mut chunks = Vec::new();
        self.export_into(chunk_size.unwrap_or(DEFAULT_CHUNK_SIZE), |chunk| {
            chunks.push(chunk);
            Ok(())
        })?;
        Ok(chunks)
    }
}

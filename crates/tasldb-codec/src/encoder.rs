//! Push encoder emitting fixed-size chunks.

use tasldb_error::{Result, TaslError};
use tasldb_types::varint::encoding_length;

use crate::MIN_CHUNK_SIZE;

/// Chunked byte encoder.
///
/// Owns one fixed-capacity buffer of `chunk_size` bytes. Small writes
/// (varints, fixed-width scalars) first ensure the buffer has room, flushing
/// it as a chunk if not, so they never straddle a chunk boundary themselves;
/// arbitrary byte slices fill and emit as many chunks as they need.
/// [`close`] emits the residual buffer and forbids further writes.
///
/// [`close`]: Encoder::close
pub struct Encoder<F> {
    buffer: Vec<u8>,
    chunk_size: usize,
    sink: F,
    closed: bool,
}

impl<F> Encoder<F>
where
    F: FnMut(Vec<u8>) -> Result<()>,
{
    /// Create an encoder emitting chunks of `chunk_size` bytes into `sink`.
    ///
    /// `chunk_size` must be at least [`MIN_CHUNK_SIZE`] so a maximal varint
    /// always fits in an empty buffer.
    pub fn new(chunk_size: usize, sink: F) -> Result<Self> {
        if chunk_size < MIN_CHUNK_SIZE {
            return Err(TaslError::ChunkSizeTooSmall {
                size: chunk_size,
                min: MIN_CHUNK_SIZE,
            });
        }
        Ok(Self {
            buffer: Vec::with_capacity(chunk_size),
            chunk_size,
            sink,
            closed: false,
        })
    }

    fn check_open(&self) -> Result<()> {
        if self.closed {
            return Err(TaslError::EncoderClosed);
        }
        Ok(())
    }

    /// Emit the buffered bytes as one chunk, if any.
    fn emit(&mut self) -> Result<()> {
        if !self.buffer.is_empty() {
            let chunk = std::mem::replace(&mut self.buffer, Vec::with_capacity(self.chunk_size));
            tracing::trace!(len = chunk.len(), "emit chunk");
            (self.sink)(chunk)?;
        }
        Ok(())
    }

    /// Flush the buffer unless `n` more bytes still fit.
    fn ensure(&mut self, n: usize) -> Result<()> {
        if self.buffer.len() + n > self.chunk_size {
            self.emit()?;
        }
        Ok(())
    }

    /// Write one LEB128 varint.
    pub fn write_varint(&mut self, value: u64) -> Result<()> {
        self.check_open()?;
        self.ensure(encoding_length(value))?;
        let mut v = value;
        while v >= 0x80 {
            self.buffer.push((v as u8 & 0x7F) | 0x80);
            v >>= 7;
        }
        self.buffer.push(v as u8);
        Ok(())
    }

    /// Write a byte slice, straddling as many chunks as needed.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.check_open()?;
        let mut rest = bytes;
        while !rest.is_empty() {
            let space = self.chunk_size - self.buffer.len();
            if space == 0 {
                self.emit()?;
                continue;
            }
            let take = space.min(rest.len());
            self.buffer.extend_from_slice(&rest[..take]);
            rest = &rest[take..];
        }
        Ok(())
    }

    /// Emit the residual buffer and seal the encoder.
    pub fn close(&mut self) -> Result<()> {
        self.check_open()?;
        self.emit()?;
        self.closed = true;
        Ok(())
    }
}

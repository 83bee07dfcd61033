//! Pull decoder over a chunk stream.

use std::collections::VecDeque;

use tasldb_error::{Result, TaslError};
use tasldb_types::varint::{MAX_SAFE_ID, MAX_VARINT_LEN};
use tasldb_types::Type;

/// Incremental decoder over an iterator of byte chunks.
///
/// Retains received chunks in arrival order and scans them through two
/// logical cursors: `start` marks the beginning of the value currently being
/// delimited, `end` the scan frontier. Reads advance `end` only; [`flush`]
/// discards fully-consumed chunks and rebases both cursors, so memory held
/// is bounded by the largest single value plus one chunk.
///
/// [`flush`]: Decoder::flush
pub struct Decoder<I> {
    source: I,
    chunks: VecDeque<Vec<u8>>,
    /// Total bytes across retained chunks.
    available: usize,
    start: usize,
    end: usize,
}

impl<I> Decoder<I>
where
    I: Iterator<Item = Result<Vec<u8>>>,
{
    /// Wrap a chunk source.
    pub fn new(source: I) -> Self {
        Self {
            source,
            chunks: VecDeque::new(),
            available: 0,
            start: 0,
            end: 0,
        }
    }

    /// Bytes between the two cursors: the length of the value being scanned.
    pub fn byte_length(&self) -> usize {
        self.end - self.start
    }

    /// Pull one chunk from the source into the retained list.
    fn pull(&mut self) -> Result<()> {
        match self.source.next() {
            None => Err(TaslError::PrematureEnd),
            Some(Err(e)) => Err(e),
            Some(Ok(chunk)) => {
                if chunk.is_empty() {
                    return Err(TaslError::EmptyChunk);
                }
                self.available += chunk.len();
                self.chunks.push_back(chunk);
                Ok(())
            }
        }
    }

    fn ensure(&mut self, upto: usize) -> Result<()> {
        while self.available < upto {
            self.pull()?;
        }
        Ok(())
    }

    fn byte_at(&self, logical: usize) -> u8 {
        let mut offset = logical;
        for chunk in &self.chunks {
            if offset < chunk.len() {
                return chunk[offset];
            }
            offset -= chunk.len();
        }
        unreachable!("byte_at past available bytes")
    }

    /// Read one LEB128 varint, advancing the scan frontier.
    ///
    /// Fails with [`TaslError::VarintTooLong`] once the encoding runs past
    /// the safe-integer ceiling (more than eight bytes, or a value above
    /// 2^53 − 1).
    pub fn read_varint(&mut self) -> Result<u64> {
        let mut value: u64 = 0;
        for i in 0.. {
            if i >= MAX_VARINT_LEN {
                return Err(TaslError::VarintTooLong);
            }
            self.ensure(self.end + 1)?;
            let byte = self.byte_at(self.end);
            self.end += 1;
            value |= u64::from(byte & 0x7F) << (7 * i);
            if byte & 0x80 == 0 {
                break;
            }
        }
        if value > MAX_SAFE_ID {
            return Err(TaslError::VarintTooLong);
        }
        Ok(value)
    }

    /// Advance the scan frontier by `n` bytes, pulling chunks as needed.
    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.ensure(self.end + n)?;
        self.end += n;
        Ok(())
    }

    /// Copy the live range `[start, end)` into a fresh contiguous buffer.
    pub fn collect(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.byte_length());
        let mut offset = self.start;
        let mut remaining = self.byte_length();
        for chunk in &self.chunks {
            if remaining == 0 {
                break;
            }
            if offset >= chunk.len() {
                offset -= chunk.len();
                continue;
            }
            let take = (chunk.len() - offset).min(remaining);
            out.extend_from_slice(&chunk[offset..offset + take]);
            remaining -= take;
            offset = 0;
        }
        out
    }

    /// Discard fully-consumed chunks and rebase the cursors.
    pub fn flush(&mut self) {
        self.start = self.end;
        while let Some(front) = self.chunks.front() {
            if front.len() > self.start {
                break;
            }
            let len = front.len();
            self.chunks.pop_front();
            self.available -= len;
            self.start -= len;
            self.end -= len;
        }
    }

    /// Read one varint and flush the consumed bytes.
    pub fn decode_varint(&mut self) -> Result<u64> {
        let value = self.read_varint()?;
        self.flush();
        Ok(value)
    }

    /// Advance past one value of type `ty` without copying.
    ///
    /// This is the schema-directed boundary scan: it walks the type and the
    /// wire in lock-step, so afterwards `[start, end)` delimits exactly the
    /// value's bytes.
    pub fn scan_value(&mut self, ty: &Type) -> Result<()> {
        match ty {
            Type::Uri => {
                let len = self.read_varint()?;
                self.skip(len as usize)
            }
            Type::Literal(dt) => match dt.fixed_width() {
                Some(width) => self.skip(width),
                None => {
                    let len = self.read_varint()?;
                    self.skip(len as usize)
                }
            },
            Type::Product(components) => {
                for (_, child) in components {
                    self.scan_value(child)?;
                }
                Ok(())
            }
            Type::Coproduct(options) => {
                let index = self.read_varint()?;
                let (_, child) = options
                    .get(index as usize)
                    .ok_or(TaslError::OptionIndexOutOfRange {
                        index,
                        arity: options.len(),
                    })?;
                self.scan_value(child)
            }
            Type::Reference(_) => self.read_varint().map(|_| ()),
        }
    }

    /// Decode one value of type `ty`, yielding its raw bytes.
    pub fn decode_element(&mut self, ty: &Type) -> Result<Vec<u8>> {
        self.scan_value(ty)?;
        let bytes = self.collect();
        self.flush();
        Ok(bytes)
    }

    /// Decode a class section header and iterate its `(id, bytes)` elements.
    pub fn elements<'a>(&'a mut self, ty: &'a Type) -> Result<Elements<'a, I>> {
        let count = self.decode_varint()?;
        Ok(Elements {
            decoder: self,
            ty,
            remaining: count,
            prev: None,
        })
    }

    /// Verify the stream is fully consumed and closed.
    ///
    /// Fails with [`TaslError::StreamNotClosed`] if retained bytes remain
    /// unread or the source yields another chunk.
    pub fn end(&mut self) -> Result<()> {
        if self.end < self.available {
            return Err(TaslError::StreamNotClosed);
        }
        match self.source.next() {
            None => Ok(()),
            Some(Err(e)) => Err(e),
            Some(Ok(_)) => Err(TaslError::StreamNotClosed),
        }
    }
}

/// Iterator over one class section's `(id, value-bytes)` pairs.
///
/// Ids are delta-decoded: the first id equals the first delta, each
/// subsequent id is `previous + 1 + delta`, so ids are strictly ascending by
/// construction.
pub struct Elements<'a, I> {
    decoder: &'a mut Decoder<I>,
    ty: &'a Type,
    remaining: u64,
    prev: Option<u64>,
}

impl<I> Elements<'_, I>
where
    I: Iterator<Item = Result<Vec<u8>>>,
{
    /// Declared element count of this class section.
    pub fn count(&self) -> u64 {
        self.remaining
    }

    fn next_element(&mut self) -> Result<(u64, Vec<u8>)> {
        let delta = self.decoder.decode_varint()?;
        let id = match self.prev {
            None => delta,
            Some(prev) => prev
                .checked_add(1)
                .and_then(|n| n.checked_add(delta))
                .filter(|&n| n <= MAX_SAFE_ID)
                .ok_or(TaslError::IdOutOfRange { id: delta })?,
        };
        self.prev = Some(id);
        let bytes = self.decoder.decode_element(self.ty)?;
        Ok((id, bytes))
    }
}

impl<I> Iterator for Elements<'_, I>
where
    I: Iterator<Item = Result<Vec<u8>>>,
{
    type Item = Result<(u64, Vec<u8>)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        Some(self.next_element())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tasldb_types::varint::write_varint;
    use tasldb_types::Datatype;

    fn chunked(bytes: &[u8], size: usize) -> impl Iterator<Item = Result<Vec<u8>>> {
        let chunks: Vec<Result<Vec<u8>>> = bytes
            .chunks(size.max(1))
            .map(|c| Ok(c.to_vec()))
            .collect();
        chunks.into_iter()
    }

    #[test]
    fn varint_across_chunk_boundary() {
        let mut bytes = Vec::new();
        write_varint(&mut bytes, 300);
        write_varint(&mut bytes, 5);
        for size in 1..=bytes.len() {
            let mut decoder = Decoder::new(chunked(&bytes, size));
            assert_eq!(decoder.decode_varint().unwrap(), 300, "chunk size {size}");
            assert_eq!(decoder.decode_varint().unwrap(), 5);
            decoder.end().unwrap();
        }
    }

    #[test]
    fn premature_end_is_reported() {
        let mut decoder = Decoder::new(chunked(&[0x80], 1));
        assert!(matches!(
            decoder.read_varint().unwrap_err(),
            TaslError::PrematureEnd
        ));
    }

    #[test]
    fn empty_chunk_is_rejected() {
        let chunks: Vec<Result<Vec<u8>>> = vec![Ok(vec![])];
        let mut decoder = Decoder::new(chunks.into_iter());
        assert!(matches!(
            decoder.read_varint().unwrap_err(),
            TaslError::EmptyChunk
        ));
    }

    #[test]
    fn oversized_varint_is_rejected() {
        let bytes = [0xFFu8; 9];
        let mut decoder = Decoder::new(chunked(&bytes, 3));
        assert!(matches!(
            decoder.read_varint().unwrap_err(),
            TaslError::VarintTooLong
        ));
    }

    #[test]
    fn trailing_bytes_fail_end() {
        let mut decoder = Decoder::new(chunked(&[0x01, 0x02], 2));
        assert_eq!(decoder.decode_varint().unwrap(), 1);
        assert!(matches!(
            decoder.end().unwrap_err(),
            TaslError::StreamNotClosed
        ));
    }

    #[test]
    fn trailing_chunk_fails_end() {
        let mut decoder = Decoder::new(chunked(&[0x01, 0x02], 1));
        assert_eq!(decoder.decode_varint().unwrap(), 1);
        assert!(matches!(
            decoder.end().unwrap_err(),
            TaslError::StreamNotClosed
        ));
    }

    #[test]
    fn scan_delimits_product_value() {
        // product { boolean, string }: 1 fixed byte + length-prefixed text.
        let ty = Type::product([
            ("flag", Type::Literal(Datatype::Boolean)),
            ("name", Type::Literal(Datatype::String)),
        ]);
        let mut bytes = vec![1u8];
        write_varint(&mut bytes, 3);
        bytes.extend_from_slice(b"ada");
        for size in 1..=bytes.len() {
            let mut decoder = Decoder::new(chunked(&bytes, size));
            let element = decoder.decode_element(&ty).unwrap();
            assert_eq!(element, bytes, "chunk size {size}");
            decoder.end().unwrap();
        }
    }

    #[test]
    fn scan_rejects_out_of_range_option() {
        let ty = Type::coproduct([("a", Type::unit()), ("b", Type::unit())]);
        let bytes = [5u8];
        let mut decoder = Decoder::new(chunked(&bytes, 1));
        assert!(matches!(
            decoder.decode_element(&ty).unwrap_err(),
            TaslError::OptionIndexOutOfRange { index: 5, arity: 2 }
        ));
    }

    #[test]
    fn elements_delta_decode_ids() {
        // count=3, deltas 4, 0, 2 -> ids 4, 5, 8; unit values are empty.
        let ty = Type::unit();
        let bytes = [3u8, 4, 0, 2];
        let mut decoder = Decoder::new(chunked(&bytes, 2));
        let ids: Vec<u64> = decoder
            .elements(&ty)
            .unwrap()
            .map(|r| r.map(|(id, _)| id))
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(ids, vec![4, 5, 8]);
        decoder.end().unwrap();
    }

    #[test]
    fn flush_bounds_retained_memory() {
        let mut bytes = Vec::new();
        for v in 0..100u64 {
            write_varint(&mut bytes, v);
        }
        let mut decoder = Decoder::new(chunked(&bytes, 7));
        for v in 0..100u64 {
            assert_eq!(decoder.decode_varint().unwrap(), v);
            assert!(decoder.chunks.len() <= 2);
        }
        decoder.end().unwrap();
    }
}
